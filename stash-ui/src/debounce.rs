//! Trailing-edge debounce for search-as-you-type.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet period before a typed query is searched.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Each [`push`](Debouncer::push) cancels the pending call and reschedules it
/// `delay` later with the newest value.
///
/// Fired calls run on their own task and are never cancelled, so two calls
/// for different values may complete in either order. Once the debouncer is
/// dropped the task waits for those calls, then runs any pending value
/// inline, so awaiting its `JoinHandle` means the last value has been handled.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Start the timer task. It exits once the debouncer is dropped and every
    /// fired call has finished.
    pub fn spawn<F, Fut>(delay: Duration, handler: F) -> (Self, JoinHandle<()>)
    where
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, delay, handler));
        (Self { tx }, task)
    }

    pub fn push(&self, value: T) {
        if self.tx.send(value).is_err() {
            tracing::warn!("debounce.task_gone");
        }
    }
}

async fn run<T, F, Fut>(mut rx: mpsc::UnboundedReceiver<T>, delay: Duration, handler: F)
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
    let mut last = None;
    while let Some(mut value) = rx.recv().await {
        let mut closed = false;
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(v) => value = v,
                    None => {
                        closed = true;
                        break;
                    }
                },
                _ = tokio::time::sleep(delay) => break,
            }
        }
        if closed {
            last = Some(value);
            break;
        }
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(tokio::spawn(handler(value)));
    }

    for fired in in_flight {
        if let Err(e) = fired.await {
            tracing::warn!(error = %e, "debounce.handler_failed");
        }
    }
    if let Some(value) = last {
        handler(value).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Instant, sleep, sleep_until};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once_with_last_value() {
        let start = Instant::now();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (deb, _task) = Debouncer::spawn(SEARCH_DEBOUNCE, move |q: String| {
            let out_tx = out_tx.clone();
            async move {
                let _ = out_tx.send((q, Instant::now()));
            }
        });

        for (at, value) in [(0, "r"), (100, "ru"), (150, "rus"), (320, "rust")] {
            sleep_until(start + ms(at)).await;
            deb.push(value.to_string());
        }

        let (query, fired_at) = out_rx.recv().await.unwrap();
        assert_eq!(query, "rust");
        // 300 ms after the last keystroke
        assert_eq!(fired_at - start, ms(620));

        sleep(ms(2_000)).await;
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn separated_inputs_fire_separately() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (deb, _task) = Debouncer::spawn(SEARCH_DEBOUNCE, move |q: &'static str| {
            let out_tx = out_tx.clone();
            async move {
                let _ = out_tx.send(q);
            }
        });

        deb.push("a");
        sleep(ms(400)).await;
        deb.push("b");
        assert_eq!(out_rx.recv().await, Some("a"));
        assert_eq!(out_rx.recv().await, Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_value_fires_on_drop() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (deb, task) = Debouncer::spawn(SEARCH_DEBOUNCE, move |q: u32| {
            let out_tx = out_tx.clone();
            async move {
                let _ = out_tx.send(q);
            }
        });
        deb.push(7);
        drop(deb);
        task.await.unwrap();
        assert_eq!(out_rx.recv().await, Some(7));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn join_waits_for_slow_handlers() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (deb, task) = Debouncer::spawn(ms(10), move |q: &'static str| {
            let out_tx = out_tx.clone();
            async move {
                sleep(ms(if q == "first" { 150 } else { 80 })).await;
                let _ = out_tx.send(q);
            }
        });

        deb.push("first");
        sleep(ms(40)).await;
        deb.push("last");
        drop(deb);
        task.await.unwrap();

        // both handlers completed before the task resolved, the pending one last
        assert_eq!(out_rx.try_recv(), Ok("first"));
        assert_eq!(out_rx.try_recv(), Ok("last"));
    }
}
