//! Popup: save the current page, search, recent bookmarks, login/logout.

use crate::auth::{AuthError, authorize_url, parse_access_token};
use crate::debounce::{Debouncer, SEARCH_DEBOUNCE};
use crate::view::{
    Action, LOADING_RECENT, LOGGED_IN_LOADING, ListView, NO_BOOKMARKS, NO_RESULTS,
    RECENT_UNAVAILABLE, START_TYPING, SEARCHING, SaveStatus, Screen, render_bookmarks,
};
use stash_api::{ApiError, BookmarkApi, DEFAULT_RECENT_LIMIT};
use stash_common::{Bookmark, parse_tags};
use stash_config::{OAuthConfig, Session, StateError, StateStore};
use stash_extract::{Extraction, Extractor, Page};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cheap to clone; clones share views and state.
#[derive(Clone)]
pub struct PopupController {
    api: Arc<dyn BookmarkApi>,
    state: StateStore,
    session: Session,
    extractor: Arc<Extractor>,
    oauth: OAuthConfig,
    list: Arc<watch::Sender<ListView>>,
    screen: Arc<watch::Sender<Screen>>,
    save_status: Arc<watch::Sender<SaveStatus>>,
}

impl PopupController {
    /// `session` must be the one `api` reads its token from.
    pub fn new(
        api: Arc<dyn BookmarkApi>,
        state: StateStore,
        session: Session,
        extractor: Arc<Extractor>,
        oauth: OAuthConfig,
    ) -> Self {
        Self {
            api,
            state,
            session,
            extractor,
            oauth,
            list: Arc::new(watch::channel(ListView::message(START_TYPING)).0),
            screen: Arc::new(watch::channel(Screen::LoggedOut).0),
            save_status: Arc::new(watch::channel(SaveStatus::Idle).0),
        }
    }

    pub fn list(&self) -> ListView {
        self.list.borrow().clone()
    }

    pub fn subscribe_list(&self) -> watch::Receiver<ListView> {
        self.list.subscribe()
    }

    pub fn screen(&self) -> Screen {
        self.screen.borrow().clone()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.save_status.borrow().clone()
    }

    fn show(&self, view: ListView) {
        self.list.send_replace(view);
    }

    /// Initial state. A stored token is adopted and recent bookmarks load;
    /// without one the login prompt shows. The public client skips login.
    pub async fn open(&self) -> Result<Screen, StateError> {
        self.open_recent(None).await
    }

    /// [`open`](Self::open), listing `limit` recent bookmarks instead of the
    /// default count.
    pub async fn open_recent(&self, limit: Option<u32>) -> Result<Screen, StateError> {
        if !self.api.requires_auth() {
            self.screen.send_replace(Screen::LoggedIn);
            self.load_recent(limit).await;
            return Ok(Screen::LoggedIn);
        }
        match self.state.auth_token()? {
            Some(token) => {
                self.session.set_token(Some(token));
                self.screen.send_replace(Screen::LoggedIn);
                self.load_recent(limit).await;
            }
            None => self.show_login(),
        }
        Ok(self.screen())
    }

    fn show_login(&self) {
        self.screen.send_replace(Screen::LoggedOut);
        self.show(ListView::LoginPrompt);
    }

    /// `None` asks for the default count.
    pub async fn load_recent(&self, limit: Option<u32>) -> ListView {
        self.show(ListView::message(LOADING_RECENT));
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        let view = match self.api.recent(Some(limit)).await {
            Ok(v) => render_bookmarks(v, NO_BOOKMARKS)
                .unwrap_or_else(|e| ListView::for_error(Action::Recent, &e)),
            Err(e) if !self.api.requires_auth() => {
                tracing::warn!(error = %e, "popup.recent_unavailable");
                ListView::message(RECENT_UNAVAILABLE)
            }
            Err(e) => {
                tracing::warn!(error = %e, "popup.recent_failed");
                ListView::for_error(Action::Recent, &e)
            }
        };
        self.show(view.clone());
        view
    }

    /// Search immediately. Blank queries never reach the backend.
    pub async fn search(&self, query: &str) -> ListView {
        if query.trim().is_empty() {
            let view = ListView::message(START_TYPING);
            self.show(view.clone());
            return view;
        }
        self.show(ListView::message(SEARCHING));
        let view = match self.api.search(query).await {
            Ok(v) => render_bookmarks(v, NO_RESULTS)
                .unwrap_or_else(|e| ListView::for_error(Action::Search, &e)),
            Err(e) => {
                tracing::warn!(error = %e, "popup.search_failed");
                ListView::for_error(Action::Search, &e)
            }
        };
        self.show(view.clone());
        view
    }

    /// Search-as-you-type input: push every keystroke's full text.
    ///
    /// In-flight searches are not cancelled; whichever finishes last owns
    /// the list.
    pub fn search_input(&self) -> (Debouncer<String>, JoinHandle<()>) {
        let this = self.clone();
        Debouncer::spawn(SEARCH_DEBOUNCE, move |query: String| {
            let this = this.clone();
            async move {
                this.search(&query).await;
            }
        })
    }

    /// Extract `page`, then save it with the comma-separated `tags_input`.
    pub async fn save(&self, page: &Page, tags_input: &str) -> SaveStatus {
        self.save_status.send_replace(SaveStatus::Saving);
        let extraction = self.extractor.extract(page);
        if let Some(err) = &extraction.error {
            tracing::warn!(url = %extraction.url, error = %err, "popup.extraction_degraded");
        }
        let status = match self.save_extraction(extraction, tags_input).await {
            Ok(()) => SaveStatus::Saved,
            Err(e) => {
                tracing::warn!(error = %e, "popup.save_failed");
                if e.is_access_denied() {
                    self.screen.send_replace(Screen::AccessDenied);
                }
                SaveStatus::Error(e.to_string())
            }
        };
        self.save_status.send_replace(status.clone());
        status
    }

    async fn save_extraction(&self, ex: Extraction, tags_input: &str) -> Result<(), ApiError> {
        let tags = parse_tags(tags_input);
        tracing::info!(
            url = %ex.url,
            method = %ex.extraction_method,
            tags = tags.len(),
            "popup.save"
        );
        let bookmark = Bookmark::new(ex.url, ex.title)
            .with_content(ex.content)
            .with_tags(tags);
        self.api.save(&bookmark).await.map(drop)
    }

    /// Where to send the user to log in.
    pub fn login_url(&self) -> Result<String, AuthError> {
        authorize_url(&self.oauth)
    }

    /// Finish login from the OAuth redirect URL.
    pub async fn complete_login(&self, redirect: &str) -> Result<(), AuthError> {
        let res = match parse_access_token(redirect) {
            Ok(token) => self.adopt_token(token).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &res {
            tracing::warn!(error = %e, "popup.login_failed");
            self.show(ListView::message(format!("Authentication Failed: {e}")));
        }
        res
    }

    /// Persist and broadcast `token`, then load recent bookmarks.
    pub async fn adopt_token(&self, token: String) -> Result<(), AuthError> {
        self.state.set_auth_token(Some(token.clone()))?;
        self.session.set_token(Some(token));
        self.screen.send_replace(Screen::LoggedIn);
        self.show(ListView::message(LOGGED_IN_LOADING));
        self.load_recent(None).await;
        Ok(())
    }

    pub fn logout(&self) -> Result<(), StateError> {
        self.state.set_auth_token(None)?;
        self.session.clear();
        self.show_login();
        Ok(())
    }
}
