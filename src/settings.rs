//! Layered settings for the command line tool.
//!
//! Defaults, then the config file, then `CAREQUEST_*` environment variables,
//! then command line flags.

use std::path::{Path, PathBuf};

use carequest_api::ApiConfig;
use carequest_reconciler::{FailurePolicy, ReconcilerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Everything the tool needs to talk to the store and reconcile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiConfig,
    pub reconciler: ReconcilerSettings,
}

/// The `[reconciler]` section.
///
/// Unlike the library default, the tool refuses empty orders unless told
/// otherwise, in the file or with `--allow-empty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerSettings {
    pub failure_policy: FailurePolicy,
    pub require_non_empty: bool,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            require_non_empty: true,
        }
    }
}

impl ReconcilerSettings {
    /// Engine configuration for one run. `allow_empty` can only relax the
    /// configured check.
    pub const fn config(&self, allow_empty: bool) -> ReconcilerConfig {
        ReconcilerConfig {
            failure_policy: self.failure_policy,
            require_non_empty: self.require_non_empty && !allow_empty,
        }
    }
}

impl Settings {
    /// Load from an optional file, then overlay the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let base = path.map_or_else(|| Ok(Self::default()), Self::from_file)?;
        Ok(base.merge_vars(|key| std::env::var(key).ok()))
    }

    /// Read settings from a file: JSON by extension, TOML otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str(&content).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| SettingsError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Overlay environment-style variables onto the API settings.
    #[must_use]
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        self.api = self.api.merge_vars(lookup);
        self
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.api.base_url = Some(base_url);
        self
    }
}
