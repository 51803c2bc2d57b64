use crate::error::ConfigError;
use crate::revocation::DEFAULT_REVOKED_MESSAGE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding `base_url`.
pub const BASE_URL_ENV: &str = "CMS_API_BASE_URL";

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_profile_path() -> String {
    "/api/auth/profile".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_revoked_message() -> String {
    DEFAULT_REVOKED_MESSAGE.to_string()
}

/// Client configuration, usually read from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing path
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the profile endpoint returning `{ role: { name, permissions } }`
    #[serde(default = "default_profile_path")]
    pub profile_path: String,

    /// Where the dashboard sends the user after logout
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Error message treated as a revocation signal
    #[serde(default = "default_revoked_message")]
    pub revoked_message: String,

    /// File holding stored credentials; in-memory when unset
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    /// Optional client-wide request timeout. No timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            profile_path: default_profile_path(),
            login_path: default_login_path(),
            revoked_message: default_revoked_message(),
            credentials_path: None,
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading client configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` when it exists, otherwise defaults; then applies the
    /// environment override.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Self::default()
        };
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.base_url = base_url;
            config.validate()?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        for (name, path) in [
            ("profile_path", &self.profile_path),
            ("login_path", &self.login_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!("{name} must start with '/'")));
            }
        }
        if self.revoked_message.is_empty() {
            return Err(ConfigError::Invalid(
                "revoked_message cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Joins a path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
