//! Configuration for the assignment API client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Environment variable naming the API base URL.
pub const ENV_API_URL: &str = "CAREQUEST_API_URL";
/// Environment variable holding a bearer token.
pub const ENV_API_TOKEN: &str = "CAREQUEST_API_TOKEN";
/// Environment variable overriding the request timeout, in seconds.
pub const ENV_API_TIMEOUT_SECS: &str = "CAREQUEST_API_TIMEOUT_SECS";

/// Configuration for `HttpAssignmentApi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the `/question-assignments` paths are resolved against.
    #[serde(default)]
    pub base_url: Option<Url>,

    /// Per-request deadline enforced by the transport.
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,

    /// Bearer token attached to every request. Token refresh is handled
    /// outside this crate.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// User-Agent header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_timeout(),
            auth_token: None,
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Create a config for the given base URL.
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url: Some(base_url),
            ..Default::default()
        }
    }

    /// Set the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Overlay values from a variable lookup onto this config.
    ///
    /// Unparseable values are ignored and the existing setting is kept.
    #[must_use]
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(parsed) = lookup(ENV_API_URL).and_then(|url| url.parse().ok()) {
            self.base_url = Some(parsed);
        }

        if let Some(token) = lookup(ENV_API_TOKEN).filter(|t| !t.is_empty()) {
            self.auth_token = Some(token);
        }

        if let Some(secs) = lookup(ENV_API_TIMEOUT_SECS).and_then(|s| s.trim().parse::<u64>().ok()) {
            self.timeout = Duration::from_secs(secs);
        }

        self
    }

    /// Resolve an API path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is configured or the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = self
            .base_url
            .clone()
            .ok_or_else(|| Error::config("no base URL configured"))?;
        // Keep any path prefix on the base URL (e.g. `/api/`).
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("carequest/{}", env!("CARGO_PKG_VERSION"))
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
