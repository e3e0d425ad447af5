use crate::wire::{BOOKMARKS_PATH, CHAT_PATH, SEARCH_PATH};
use crate::{BookmarkApi, ChatRequest, SaveRequest, SearchRequest, recent_path};
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use stash_common::Bookmark;
use stash_config::StateStore;
use stash_http::{ApiError, ErrorPolicy, HttpClient, RequestOpts};

const SAVE_FAILED: &str = "Failed to save bookmark";
const SEARCH_FAILED: &str = "Failed to search bookmarks";
const CHAT_FAILED: &str = "Failed to get chat response";
const RECENT_FAILED: &str = "Failed to load recent bookmarks";

/// Token-less client for deployments without login.
#[derive(Clone)]
pub struct PublicClient {
    http: HttpClient,
    state: StateStore,
}

impl PublicClient {
    pub fn new(state: StateStore) -> Result<Self, ApiError> {
        Ok(Self {
            http: HttpClient::new()?,
            state,
        })
    }

    async fn fetch<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        fallback: &'static str,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let base = crate::base_url(&self.state)?;
        let opts = RequestOpts::anonymous(ErrorPolicy::Public { fallback });
        let res = self
            .http
            .request_json(method, &base, endpoint, body, opts)
            .await;
        if let Err(e) = &res {
            tracing::error!(%endpoint, error = %e, "api.public.failed");
        }
        res
    }
}

#[async_trait]
impl BookmarkApi for PublicClient {
    async fn save(&self, bookmark: &Bookmark) -> Result<Value, ApiError> {
        let body = SaveRequest::from(bookmark);
        self.fetch(Method::POST, BOOKMARKS_PATH, Some(&body), SAVE_FAILED)
            .await
    }

    async fn search(&self, query: &str) -> Result<Value, ApiError> {
        let body = SearchRequest::new(query);
        self.fetch(Method::POST, SEARCH_PATH, Some(&body), SEARCH_FAILED)
            .await
    }

    async fn chat(&self, query: &str) -> Result<Value, ApiError> {
        let body = ChatRequest { query };
        self.fetch(Method::POST, CHAT_PATH, Some(&body), CHAT_FAILED)
            .await
    }

    async fn recent(&self, limit: Option<u32>) -> Result<Value, ApiError> {
        self.fetch::<()>(Method::GET, &recent_path(limit), None, RECENT_FAILED)
            .await
    }

    fn requires_auth(&self) -> bool {
        false
    }
}
