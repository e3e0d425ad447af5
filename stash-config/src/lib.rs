//! Configuration for Stash: a YAML file with environment overlays, plus the
//! persisted local state (`apiUrl`, `authToken`) and the in-process session.
//!
//! Precedence, lowest first: built-in defaults, the YAML file, then
//! `STASH__`-prefixed environment variables (`STASH__OAUTH__CLIENT_ID`).
//! `${VAR}` references inside string values are expanded after merging.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use stash_common::observability::LogFormat;
use std::path::{Path, PathBuf};

pub mod session;
pub mod state;

pub use session::Session;
pub use state::{
    FileStorage, LocalState, LocalStorage, MemoryStorage, StateError, StateStore,
    normalize_base_url,
};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    /// Base URL used when the state file has none.
    pub api_url: Option<String>,
    /// Location of the persisted state file.
    pub state_path: Option<PathBuf>,
    pub variant: Variant,
    pub oauth: OAuthConfig,
    pub logging: LoggingConfig,
}

impl StashConfig {
    /// Configured state path, else `<data dir>/stash/state.json`.
    pub fn state_path(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("stash")
                .join("state.json")
        })
    }
}

/// Which client the front-end drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Bearer token required; 403 reads as pilot-mode access denial.
    #[default]
    Authenticated,
    /// No token; coarser error classification.
    Public,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub emit_stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: false,
            filter: "info".into(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct StashConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    files: Vec<(PathBuf, bool)>,
    inline: Vec<String>,
}

impl Default for StashConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl StashConfigLoader {
    /// Start with no files and `STASH__` env overrides.
    ///
    /// ```
    /// use stash_config::{StashConfigLoader, Variant};
    ///
    /// let cfg = StashConfigLoader::new()
    ///     .with_yaml_str("api_url: 'http://example.test'\nvariant: public")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.api_url.as_deref(), Some("http://example.test"));
    /// assert_eq!(cfg.variant, Variant::Public);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            files: Vec::new(),
            inline: Vec::new(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that may be absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self
    }

    /// Merge all sources and deserialize into [`StashConfig`].
    ///
    /// Environment variables are applied last so they win over files.
    pub fn load(self) -> Result<StashConfig, ConfigError> {
        let mut builder = self.builder;
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.inline {
            builder = builder.add_source(File::from_str(yaml, config::FileFormat::Yaml));
        }
        builder = builder.add_source(
            Environment::with_prefix("STASH")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: StashConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        tracing::debug!(
            variant = ?typed.variant,
            has_api_url = typed.api_url.is_some(),
            "config.loaded"
        );
        Ok(typed)
    }
}
