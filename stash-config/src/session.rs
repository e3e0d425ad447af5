//! In-process session: at most one bearer token, overwritten on login and
//! cleared on logout. Every view holds its own [`Session`] and keeps it in
//! step with the others by following [`StateStore`] broadcasts.
//!
//! [`StateStore`]: crate::StateStore

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
pub struct Session {
    token: Arc<watch::Sender<Option<String>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session with no token.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { token: Arc::new(tx) }
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.borrow().is_some()
    }

    /// Overwrite the token. An empty string counts as no token.
    pub fn set_token(&self, token: Option<String>) {
        let token = token.filter(|t| !t.is_empty());
        self.token.send_replace(token);
    }

    pub fn clear(&self) {
        self.set_token(None);
    }

    /// Observe this session's own changes (login/logout display toggle).
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.token.subscribe()
    }

    /// Adopt every change published on `changes` until the sender is dropped.
    ///
    /// The current value is adopted immediately.
    pub fn follow(&self, mut changes: watch::Receiver<Option<String>>) -> JoinHandle<()> {
        self.set_token(changes.borrow_and_update().clone());
        let session = self.clone();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let next = changes.borrow_and_update().clone();
                tracing::debug!(present = next.is_some(), "session.adopted");
                session.set_token(next);
            }
        })
    }
}
