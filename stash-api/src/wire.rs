use crate::{DEFAULT_RECENT_LIMIT, SEARCH_LIMIT};
use serde::Serialize;
use stash_common::Bookmark;

pub(crate) const BOOKMARKS_PATH: &str = "/bookmarks";
pub(crate) const SEARCH_PATH: &str = "/search";
pub(crate) const CHAT_PATH: &str = "/chat";

/// Body of `POST /bookmarks`.
#[derive(Debug, Serialize)]
pub struct SaveRequest<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub content_markdown: &'a str,
    pub tags: &'a [String],
}

impl<'a> From<&'a Bookmark> for SaveRequest<'a> {
    fn from(b: &'a Bookmark) -> Self {
        Self {
            url: &b.url,
            title: &b.title,
            content_markdown: &b.content,
            tags: &b.tags,
        }
    }
}

/// Body of `POST /search`.
#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub limit: u32,
}

impl<'a> SearchRequest<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            limit: SEARCH_LIMIT,
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub query: &'a str,
}

/// `/recent?limit=N`.
///
/// ```
/// assert_eq!(stash_api::recent_path(None), "/recent?limit=10");
/// assert_eq!(stash_api::recent_path(Some(5)), "/recent?limit=5");
/// ```
pub fn recent_path(limit: Option<u32>) -> String {
    format!("/recent?limit={}", limit.unwrap_or(DEFAULT_RECENT_LIMIT))
}
