use crate::wire::{BOOKMARKS_PATH, CHAT_PATH, SEARCH_PATH};
use crate::{BookmarkApi, ChatRequest, SaveRequest, SearchRequest, recent_path};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use stash_common::Bookmark;
use stash_config::{Session, StateStore};
use stash_http::{ApiError, ErrorPolicy, HttpClient, RequestOpts};

/// Bearer-token client. Holds no token itself; it reads the [`Session`]
/// before every request.
#[derive(Clone)]
pub struct AuthClient {
    http: HttpClient,
    state: StateStore,
    session: Session,
}

impl AuthClient {
    pub fn new(state: StateStore, session: Session) -> Result<Self, ApiError> {
        Ok(Self {
            http: HttpClient::new()?,
            state,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Shared request primitive.
    ///
    /// Fails with [`ApiError::Unauthenticated`] before any I/O when the
    /// session has no token.
    pub async fn fetch<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        headers: Option<HeaderMap>,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let Some(token) = self.session.token() else {
            tracing::debug!(%endpoint, "api.unauthenticated");
            return Err(ApiError::Unauthenticated);
        };
        let base = crate::base_url(&self.state)?;

        let mut opts = RequestOpts::bearer(&token, ErrorPolicy::Authenticated);
        if let Some(h) = headers {
            opts = opts.with_headers(h);
        }
        self.http
            .request_json(method, &base, endpoint, body, opts)
            .await
    }
}

#[async_trait]
impl BookmarkApi for AuthClient {
    async fn save(&self, bookmark: &Bookmark) -> Result<Value, ApiError> {
        let body = SaveRequest::from(bookmark);
        self.fetch(Method::POST, BOOKMARKS_PATH, Some(&body), None)
            .await
    }

    async fn search(&self, query: &str) -> Result<Value, ApiError> {
        let body = SearchRequest::new(query);
        self.fetch(Method::POST, SEARCH_PATH, Some(&body), None)
            .await
    }

    async fn chat(&self, query: &str) -> Result<Value, ApiError> {
        let body = ChatRequest { query };
        self.fetch(Method::POST, CHAT_PATH, Some(&body), None).await
    }

    async fn recent(&self, limit: Option<u32>) -> Result<Value, ApiError> {
        self.fetch::<()>(Method::GET, &recent_path(limit), None, None)
            .await
    }

    fn requires_auth(&self) -> bool {
        true
    }
}
