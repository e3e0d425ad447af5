//! Sidebar chat. Single-turn: each question is sent on its own.

use crate::render::{MarkdownRenderer, Rendered, render_answer};
use stash_api::{BookmarkApi, BookmarkApiExt};
use stash_config::{Session, StateError, StateStore};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

pub const THINKING: &str = "Is thinking...";
pub const CHAT_DENIED: &str =
    "🚫 **Access Denied**: You are not authorized to use the chat in Pilot Mode.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub body: Rendered,
    pub pending: bool,
}

impl ChatMessage {
    fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            body: Rendered::plain(text),
            pending: false,
        }
    }

    fn thinking() -> Self {
        Self {
            role: Role::Assistant,
            body: Rendered::plain(THINKING),
            pending: true,
        }
    }
}

pub struct ChatController {
    api: Arc<dyn BookmarkApi>,
    session: Session,
    renderer: Option<Arc<dyn MarkdownRenderer>>,
    history: Arc<Mutex<Vec<ChatMessage>>>,
    follower: JoinHandle<()>,
}

impl ChatController {
    /// Adopt the stored token and keep following token changes made by
    /// other views. `session` must be the one `api` reads from.
    pub fn start(
        api: Arc<dyn BookmarkApi>,
        state: &StateStore,
        session: Session,
        renderer: Option<Arc<dyn MarkdownRenderer>>,
    ) -> Result<Self, StateError> {
        let follower = session.follow(state.subscribe_token());
        if let Some(token) = state.auth_token()? {
            session.set_token(Some(token));
        }
        Ok(Self {
            api,
            session,
            renderer,
            history: Arc::new(Mutex::new(Vec::new())),
            follower,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.history.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.lock().clone()
    }

    /// Ask `input`. Blank input is ignored and returns `None`; otherwise the
    /// finished assistant message.
    pub async fn send(&self, input: &str) -> Option<ChatMessage> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        let slot = {
            let mut history = self.lock();
            history.push(ChatMessage::user(text));
            history.push(ChatMessage::thinking());
            history.len() - 1
        };

        let reply = match self.api.ask(text).await {
            Ok(answer) => answer.answer,
            Err(e) if e.is_access_denied() => CHAT_DENIED.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "sidebar.chat_failed");
                format!("Sorry, something went wrong: {e}")
            }
        };
        let done = ChatMessage {
            role: Role::Assistant,
            body: render_answer(self.renderer.as_deref(), &reply),
            pending: false,
        };
        if let Some(msg) = self.lock().get_mut(slot) {
            *msg = done.clone();
        }
        Some(done)
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        self.follower.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use stash_api::ApiError;
    use stash_common::Bookmark;
    use stash_config::{LocalState, MemoryStorage};

    struct Answers(fn() -> Result<Value, ApiError>);

    #[async_trait]
    impl BookmarkApi for Answers {
        async fn save(&self, _: &Bookmark) -> Result<Value, ApiError> {
            unreachable!()
        }
        async fn search(&self, _: &str) -> Result<Value, ApiError> {
            unreachable!()
        }
        async fn chat(&self, _: &str) -> Result<Value, ApiError> {
            (self.0)()
        }
        async fn recent(&self, _: Option<u32>) -> Result<Value, ApiError> {
            unreachable!()
        }
        fn requires_auth(&self) -> bool {
            true
        }
    }

    fn chat(reply: fn() -> Result<Value, ApiError>) -> ChatController {
        let state = StateStore::open(Arc::new(MemoryStorage::new(LocalState {
            api_url: None,
            auth_token: Some("tok".into()),
        })))
        .unwrap();
        ChatController::start(Arc::new(Answers(reply)), &state, Session::new(), None).unwrap()
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let c = chat(|| Ok(json!({"answer": "a"})));
        assert_eq!(c.send("  \n").await, None);
        assert!(c.history().is_empty());
    }

    #[tokio::test]
    async fn pending_message_is_replaced_by_answer() {
        let c = chat(|| Ok(json!({"answer": "line1\nline2", "sources": []})));
        assert_eq!(c.session().token().as_deref(), Some("tok"));
        let done = c.send(" hi ").await.unwrap();
        assert_eq!(done.body.to_html(), "line1<br>line2");

        let h = c.history();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0], ChatMessage::user("hi"));
        assert_eq!(h[1].role, Role::Assistant);
        assert!(!h[1].pending);
        assert!(!h.iter().any(|m| m.body.text() == THINKING));
    }

    #[tokio::test]
    async fn access_denied_notice() {
        let c = chat(|| Err(ApiError::AccessDenied("Pilot Mode Access Denied".into())));
        let done = c.send("q").await.unwrap();
        assert_eq!(done.body.text(), CHAT_DENIED);
    }

    #[tokio::test]
    async fn other_errors_are_apologised_for() {
        let c = chat(|| Err(ApiError::Transport("connection refused".into())));
        let done = c.send("q").await.unwrap();
        assert_eq!(
            done.body.text(),
            "Sorry, something went wrong: network error: connection refused"
        );
    }
}
