//! View models the controllers publish. A front-end draws these; it never
//! sees an [`ApiError`](stash_api::ApiError) directly.

use serde_json::Value;
use stash_api::{ApiError, decode};
use stash_common::BookmarkSummary;
use std::fmt;

pub const START_TYPING: &str = "Start typing to search...";
pub const SEARCHING: &str = "Searching...";
pub const NO_RESULTS: &str = "No results found";
pub const LOADING_RECENT: &str = "Loading recent...";
pub const NO_BOOKMARKS: &str = "No bookmarks saved yet.";
pub const RECENT_UNAVAILABLE: &str = "Recent bookmarks unavailable";
pub const LOGGED_IN_LOADING: &str = "Logged in! Loading...";

/// What the user was doing when the pilot-mode gate rejected them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Save,
    Search,
    Recent,
    Chat,
}

impl Action {
    /// In-place notice for a rejected action.
    pub fn denied_notice(self) -> &'static str {
        match self {
            Action::Save => "We are currently in Pilot Mode. Your email is not on the allowed list.",
            Action::Search => "You are not authorized to use the search in Pilot Mode.",
            Action::Recent => "You are not authorized to view bookmarks in Pilot Mode.",
            Action::Chat => "You are not authorized to use the chat in Pilot Mode.",
        }
    }
}

/// One clickable result. Opening it navigates to `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub label: String,
    pub url: String,
}

impl From<BookmarkSummary> for ListItem {
    fn from(b: BookmarkSummary) -> Self {
        Self {
            label: b.label().to_string(),
            url: b.url,
        }
    }
}

/// The popup's result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListView {
    /// A single status line (empty state, progress, or error).
    Message(String),
    Items(Vec<ListItem>),
    /// Pilot-mode gate hit while performing `0`.
    AccessDenied(Action),
    /// Logged out; the front-end shows its login affordance.
    LoginPrompt,
}

impl ListView {
    pub fn message(text: impl Into<String>) -> Self {
        ListView::Message(text.into())
    }

    pub fn error(err: &ApiError) -> Self {
        ListView::Message(format!("Error: {err}"))
    }

    /// Access-denied notice when `err` is the pilot-mode gate, else the
    /// generic error line.
    pub fn for_error(action: Action, err: &ApiError) -> Self {
        if err.is_access_denied() {
            ListView::AccessDenied(action)
        } else {
            ListView::error(err)
        }
    }
}

impl fmt::Display for ListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListView::Message(m) => f.write_str(m),
            ListView::Items(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}  <{}>", item.label, item.url)?;
                }
                Ok(())
            }
            ListView::AccessDenied(action) => {
                write!(f, "Access Denied\n{}", action.denied_notice())
            }
            ListView::LoginPrompt => f.write_str("Please login to save bookmarks."),
        }
    }
}

/// Render a bookmark sequence, with `empty` shown for an empty one.
pub fn render_bookmarks(results: Value, empty: &str) -> Result<ListView, ApiError> {
    let items: Vec<BookmarkSummary> = decode(results)?;
    if items.is_empty() {
        return Ok(ListView::message(empty));
    }
    Ok(ListView::Items(items.into_iter().map(ListItem::from).collect()))
}

/// Save button state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error(String),
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Idle => f.write_str("Save Current Page"),
            SaveStatus::Saving => f.write_str("Saving..."),
            SaveStatus::Saved => f.write_str("Saved!"),
            SaveStatus::Error(m) => write!(f, "Error: {m}"),
        }
    }
}

/// Top-level popup screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    LoggedOut,
    LoggedIn,
    /// A save hit the pilot-mode gate; the whole popup is replaced.
    AccessDenied,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_falls_back_to_url() {
        let view = render_bookmarks(
            json!([
                {"id": 1, "url": "https://a", "title": "A"},
                {"id": 2, "url": "https://b", "title": ""},
                {"id": 3, "url": "https://c"}
            ]),
            NO_RESULTS,
        )
        .unwrap();
        let ListView::Items(items) = view else {
            panic!("expected items");
        };
        let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["A", "https://b", "https://c"]);
        assert_eq!(items[1].url, "https://b");
    }

    #[test]
    fn empty_sequence_renders_message() {
        assert_eq!(
            render_bookmarks(json!([]), NO_BOOKMARKS).unwrap(),
            ListView::message(NO_BOOKMARKS)
        );
    }

    #[test]
    fn non_sequence_is_decode_error() {
        let err = render_bookmarks(json!({"detail": "x"}), NO_RESULTS).unwrap_err();
        assert!(matches!(err, ApiError::Decode(..)));
    }

    #[test]
    fn access_denied_matches_variant_and_message() {
        let v = ListView::for_error(Action::Search, &ApiError::AccessDenied("nope".into()));
        assert_eq!(v, ListView::AccessDenied(Action::Search));

        let legacy = ApiError::Unauthorized("Pilot Mode Access Denied".into());
        assert_eq!(
            ListView::for_error(Action::Recent, &legacy),
            ListView::AccessDenied(Action::Recent)
        );

        let plain = ApiError::Unauthorized("Token expired".into());
        assert_eq!(
            ListView::for_error(Action::Recent, &plain),
            ListView::message("Error: Token expired")
        );
    }

    #[test]
    fn save_status_labels() {
        assert_eq!(SaveStatus::Saved.to_string(), "Saved!");
        assert_eq!(SaveStatus::Error("boom".into()).to_string(), "Error: boom");
    }
}
