//! Persisted local state: the backend base URL and the auth token.
//!
//! Stored as a small JSON document with the same camelCase keys the browser
//! extensions keep in `storage.local`:
//!
//! ```json
//! { "apiUrl": "http://localhost", "authToken": "ya29..." }
//! ```
//!
//! [`StateStore`] broadcasts every `authToken` change so other views sharing
//! the store can adopt or clear their session without reloading.

use serde::{Deserialize, Serialize};
use stash_common::DEFAULT_API_URL;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("state encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

/// Where [`LocalState`] lives.
pub trait LocalStorage: Send + Sync {
    fn load(&self) -> Result<LocalState, StateError>;
    fn save(&self, state: &LocalState) -> Result<(), StateError>;
}

/// JSON file on disk. A missing file reads as empty state.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalStorage for FileStorage {
    fn load(&self) -> Result<LocalState, StateError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LocalState::default()),
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| StateError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, state: &LocalState) -> Result<(), StateError> {
        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

/// In-memory storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<LocalState>,
}

impl MemoryStorage {
    pub fn new(state: LocalState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl LocalStorage for MemoryStorage {
    fn load(&self) -> Result<LocalState, StateError> {
        Ok(self
            .state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone()))
    }

    fn save(&self, state: &LocalState) -> Result<(), StateError> {
        match self.state.lock() {
            Ok(mut guard) => *guard = state.clone(),
            Err(poisoned) => *poisoned.into_inner() = state.clone(),
        }
        Ok(())
    }
}

/// Strip one trailing `/`; an empty result falls back to the default.
///
/// ```
/// use stash_config::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://h:8000/"), "http://h:8000");
/// assert_eq!(normalize_base_url("/"), "http://localhost");
/// assert_eq!(normalize_base_url(""), "http://localhost");
/// ```
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if stripped.is_empty() {
        DEFAULT_API_URL.to_string()
    } else {
        stripped.to_string()
    }
}

/// Shared handle over [`LocalStorage`] with token-change broadcast.
#[derive(Clone)]
pub struct StateStore {
    storage: Arc<dyn LocalStorage>,
    default_api_url: String,
    token_tx: Arc<watch::Sender<Option<String>>>,
}

impl StateStore {
    /// Open a store. The current token (if any) seeds the broadcast channel.
    pub fn open(storage: Arc<dyn LocalStorage>) -> Result<Self, StateError> {
        let initial = storage.load()?.auth_token;
        let (token_tx, _) = watch::channel(initial);
        Ok(Self {
            storage,
            default_api_url: DEFAULT_API_URL.to_string(),
            token_tx: Arc::new(token_tx),
        })
    }

    /// Replace the built-in default base URL (e.g. from `stash.yaml`).
    pub fn with_default_api_url(mut self, url: &str) -> Self {
        self.default_api_url = normalize_base_url(url);
        self
    }

    /// Stored base URL, else the default. Read fresh on every call; an
    /// unreadable store is an error, never the default.
    pub fn api_url(&self) -> Result<String, StateError> {
        match self.storage.load()?.api_url {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Ok(self.default_api_url.clone()),
        }
    }

    /// Normalize and persist the base URL; returns what was stored.
    pub fn set_api_url(&self, raw: &str) -> Result<String, StateError> {
        let url = normalize_base_url(raw);
        let mut state = self.storage.load()?;
        state.api_url = Some(url.clone());
        self.storage.save(&state)?;
        tracing::info!(api_url = %url, "state.api_url.saved");
        Ok(url)
    }

    pub fn auth_token(&self) -> Result<Option<String>, StateError> {
        Ok(self.storage.load()?.auth_token)
    }

    /// Persist (or remove, with `None`) the token and broadcast the change.
    pub fn set_auth_token(&self, token: Option<String>) -> Result<(), StateError> {
        let mut state = self.storage.load()?;
        state.auth_token = token.clone();
        self.storage.save(&state)?;
        tracing::info!(present = token.is_some(), "state.auth_token.changed");
        self.token_tx.send_replace(token);
        Ok(())
    }

    /// Receive every subsequent `authToken` change.
    pub fn subscribe_token(&self) -> watch::Receiver<Option<String>> {
        self.token_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> StateStore {
        StateStore::open(Arc::new(MemoryStorage::default())).unwrap()
    }

    #[test]
    fn normalize_only_strips_one_slash() {
        assert_eq!(normalize_base_url("http://h//"), "http://h/");
        assert_eq!(normalize_base_url("http://h"), "http://h");
    }

    #[test]
    fn api_url_defaults_until_set() {
        let store = memory_store();
        assert_eq!(store.api_url().unwrap(), "http://localhost");
        assert_eq!(store.set_api_url("http://api.test/").unwrap(), "http://api.test");
        assert_eq!(store.api_url().unwrap(), "http://api.test");
    }

    #[test]
    fn configured_default_is_normalized() {
        let store = memory_store().with_default_api_url("http://cfg.test/");
        assert_eq!(store.api_url().unwrap(), "http://cfg.test");
    }

    #[test]
    fn token_changes_are_broadcast() {
        let store = memory_store();
        let mut rx = store.subscribe_token();
        assert_eq!(*rx.borrow_and_update(), None);

        store.set_auth_token(Some("abc".into())).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_deref(), Some("abc"));

        store.set_auth_token(None).unwrap();
        assert_eq!(*rx.borrow_and_update(), None);
        assert_eq!(store.auth_token().unwrap(), None);
    }

    #[test]
    fn api_url_and_token_are_independent() {
        let store = memory_store();
        store.set_auth_token(Some("t".into())).unwrap();
        store.set_api_url("http://x").unwrap();
        store.set_auth_token(None).unwrap();
        assert_eq!(store.api_url().unwrap(), "http://x");
    }

    #[test]
    fn unreadable_state_is_not_the_default_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::open(Arc::new(FileStorage::new(&path))).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(store.api_url().is_err());
    }
}
