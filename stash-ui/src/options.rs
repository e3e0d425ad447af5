//! Options page: the backend base URL.

use stash_config::{StateError, StateStore};

#[derive(Clone)]
pub struct OptionsController {
    state: StateStore,
}

impl OptionsController {
    pub fn new(state: StateStore) -> Self {
        Self { state }
    }

    /// Stored base URL, or the default.
    pub fn restore(&self) -> Result<String, StateError> {
        self.state.api_url()
    }

    /// Persist `input` with one trailing `/` removed; empty means the
    /// default. Returns the stored value.
    pub fn save(&self, input: &str) -> Result<String, StateError> {
        self.state.set_api_url(input)
    }
}
