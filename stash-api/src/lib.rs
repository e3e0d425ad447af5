//! Bookmark backend operations: save, search, chat, recent.
//!
//! Two clients share one surface ([`BookmarkApi`]):
//!
//! - [`AuthClient`] requires a session token and rejects locally with
//!   [`ApiError::Unauthenticated`] when there is none. A 403 reads as
//!   pilot-mode [`ApiError::AccessDenied`].
//! - [`PublicClient`] sends no token and only distinguishes 401 from
//!   everything else.
//!
//! Both resolve the base URL from the [`StateStore`](stash_config::StateStore) on every call, so an
//! options change takes effect on the next request.

mod auth;
mod public;
mod wire;

pub use auth::AuthClient;
pub use public::PublicClient;
pub use stash_http::ApiError;
pub use wire::{ChatRequest, SaveRequest, SearchRequest, recent_path};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use stash_common::{Bookmark, ChatAnswer, SavedBookmark, SearchHit};
use stash_config::StateStore;

/// Results per search; not caller-adjustable.
pub const SEARCH_LIMIT: u32 = 10;
/// `recent` limit when none is given.
pub const DEFAULT_RECENT_LIMIT: u32 = 10;

/// The four backend operations. Responses are returned verbatim.
#[async_trait]
pub trait BookmarkApi: Send + Sync {
    /// `POST /bookmarks`.
    async fn save(&self, bookmark: &Bookmark) -> Result<Value, ApiError>;

    /// `POST /search` with a fixed limit of [`SEARCH_LIMIT`].
    async fn search(&self, query: &str) -> Result<Value, ApiError>;

    /// `POST /chat`; single turn.
    async fn chat(&self, query: &str) -> Result<Value, ApiError>;

    /// `GET /recent?limit=N`, `N` defaulting to [`DEFAULT_RECENT_LIMIT`].
    async fn recent(&self, limit: Option<u32>) -> Result<Value, ApiError>;

    /// Whether calls need a session token.
    fn requires_auth(&self) -> bool;
}

/// Typed views over [`BookmarkApi`] responses.
#[async_trait]
pub trait BookmarkApiExt: BookmarkApi {
    async fn save_bookmark(&self, bookmark: &Bookmark) -> Result<SavedBookmark, ApiError> {
        decode(self.save(bookmark).await?)
    }

    async fn search_hits(&self, query: &str) -> Result<Vec<SearchHit>, ApiError> {
        decode(self.search(query).await?)
    }

    async fn ask(&self, query: &str) -> Result<ChatAnswer, ApiError> {
        decode(self.chat(query).await?)
    }

    async fn recent_bookmarks(&self, limit: Option<u32>) -> Result<Vec<SavedBookmark>, ApiError> {
        decode(self.recent(limit).await?)
    }
}

impl<T: BookmarkApi + ?Sized> BookmarkApiExt for T {}

/// Current base URL. A store that cannot be read fails the call before any
/// request is built.
pub(crate) fn base_url(state: &StateStore) -> Result<String, ApiError> {
    state.api_url().map_err(|e| {
        tracing::warn!(error = %e, "api.base_url_unavailable");
        ApiError::Build(format!("state unavailable: {e}"))
    })
}

/// Deserialize a verbatim response into a typed view.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    let snippet = value.to_string();
    serde_json::from_value(value).map_err(|e| {
        let mut snippet = snippet;
        if snippet.len() > 200 {
            let mut cut = 200;
            while !snippet.is_char_boundary(cut) {
                cut -= 1;
            }
            snippet.truncate(cut);
        }
        ApiError::Decode(e.to_string(), snippet)
    })
}
