//! Common types and utilities shared across Stash crates.
//!
//! This crate defines the bookmark wire types and the observability helpers
//! used throughout the Stash workspace. It is intentionally lightweight so
//! that every crate can depend on it without pulling in the HTTP stack.
//!
//! # Overview
//!
//! - [`Bookmark`]: a page captured client-side, ready to be saved
//! - [`SavedBookmark`], [`SearchHit`], [`ChatAnswer`]: backend responses
//! - [`BookmarkSummary`]: the minimal `{url, title}` view used for list rendering
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use stash_common::Bookmark;
//!
//! let b = Bookmark::new("https://example.com", "Example")
//!     .with_tags(vec!["rust".into()]);
//! assert_eq!(b.content, "");
//! assert_eq!(b.tags, vec!["rust".to_string()]);
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Default backend base URL used when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost";

/// A page captured client-side. Once saved it is owned by the backend; the
/// client never mutates a saved bookmark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub url: String,
    pub title: String,
    /// Markup text produced by extraction.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Bookmark {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Split a comma separated tag input into trimmed, non-empty tags.
///
/// ```
/// assert_eq!(
///     stash_common::parse_tags(" rust, ,async ,"),
///     vec!["rust".to_string(), "async".to_string()]
/// );
/// ```
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Response of `POST /bookmarks` and items of `GET /recent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedBookmark {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// One item of `POST /search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Response of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Lenient `{url, title}` view shared by every bookmark-like response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookmarkSummary {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl BookmarkSummary {
    /// Title when present and non-empty, else the URL.
    pub fn label(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => &self.url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_label_prefers_title() {
        let s: BookmarkSummary =
            serde_json::from_value(json!({"url": "https://a", "title": "A"})).unwrap();
        assert_eq!(s.label(), "A");

        let s: BookmarkSummary =
            serde_json::from_value(json!({"url": "https://a", "title": ""})).unwrap();
        assert_eq!(s.label(), "https://a");

        let s: BookmarkSummary = serde_json::from_value(json!({"url": "https://a"})).unwrap();
        assert_eq!(s.label(), "https://a");
    }

    #[test]
    fn chat_answer_sources_default_to_empty() {
        let a: ChatAnswer = serde_json::from_value(json!({"answer": "hi"})).unwrap();
        assert!(a.sources.is_empty());
    }

    #[test]
    fn parse_tags_handles_empty_input() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ,").is_empty());
    }
}
