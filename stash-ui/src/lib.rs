//! Controllers behind the popup, sidebar and options views.
//!
//! The controllers drive a [`BookmarkApi`](stash_api::BookmarkApi) and
//! publish view models ([`ListView`], [`SaveStatus`], [`ChatMessage`]) for a
//! front-end to draw. Views share one [`StateStore`](stash_config::StateStore)
//! and follow its token broadcasts, so a login or logout in one is seen by
//! the others.

pub mod auth;
pub mod debounce;
pub mod options;
pub mod popup;
pub mod render;
pub mod sidebar;
pub mod view;

pub use auth::{AuthError, authorize_url, parse_access_token};
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use options::OptionsController;
pub use popup::PopupController;
pub use render::{CmarkRenderer, MarkdownRenderer, Rendered, render_answer};
pub use sidebar::{ChatController, ChatMessage, Role};
pub use view::{Action, ListItem, ListView, SaveStatus, Screen, render_bookmarks};
