use anyhow::{Context, Result};
use stash_api::{AuthClient, BookmarkApi, PublicClient};
use stash_common::DEFAULT_API_URL;
use stash_config::{FileStorage, OAuthConfig, Session, StashConfig, StateStore, Variant};
use stash_extract::Extractor;
use stash_ui::{ChatController, CmarkRenderer, MarkdownRenderer, OptionsController, PopupController};
use std::sync::Arc;

/// Everything the views share: one state store, one session, one client.
pub struct Wiring {
    pub store: StateStore,
    pub session: Session,
    pub api: Arc<dyn BookmarkApi>,
    oauth: OAuthConfig,
    extractor: Arc<Extractor>,
}

pub fn build_from_config(cfg: &StashConfig) -> Result<Wiring> {
    let state_path = cfg.state_path();
    let store = StateStore::open(Arc::new(FileStorage::new(&state_path)))
        .with_context(|| format!("failed to open state file {}", state_path.display()))?
        .with_default_api_url(cfg.api_url.as_deref().unwrap_or(DEFAULT_API_URL));

    let session = Session::new();
    session.set_token(store.auth_token()?);

    let api: Arc<dyn BookmarkApi> = match cfg.variant {
        Variant::Authenticated => Arc::new(AuthClient::new(store.clone(), session.clone())?),
        Variant::Public => Arc::new(PublicClient::new(store.clone())?),
    };
    let api_url = store.api_url()?;
    tracing::debug!(
        state = %state_path.display(),
        %api_url,
        variant = ?cfg.variant,
        "wiring.ready"
    );

    Ok(Wiring {
        store,
        session,
        api,
        oauth: cfg.oauth.clone(),
        extractor: Arc::new(Extractor::default()),
    })
}

impl Wiring {
    pub fn popup(&self) -> PopupController {
        PopupController::new(
            self.api.clone(),
            self.store.clone(),
            self.session.clone(),
            self.extractor.clone(),
            self.oauth.clone(),
        )
    }

    pub fn chat(&self) -> Result<ChatController> {
        let renderer: Arc<dyn MarkdownRenderer> = Arc::new(CmarkRenderer);
        Ok(ChatController::start(
            self.api.clone(),
            &self.store,
            self.session.clone(),
            Some(renderer),
        )?)
    }

    pub fn options(&self) -> OptionsController {
        OptionsController::new(self.store.clone())
    }
}
