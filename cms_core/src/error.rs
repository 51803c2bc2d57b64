use std::io;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures surfaced by the API client.
///
/// Callers decide whether to notify the user or handle these silently.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status and a `{ message }` body.
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    /// The backend signalled that the session's access was revoked.
    #[error("Access revoked: {0}")]
    Revoked(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),
}

impl ApiError {
    pub fn is_revoked(&self) -> bool {
        matches!(self, ApiError::Revoked(_))
    }

    /// HTTP status of the failed call, when the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
