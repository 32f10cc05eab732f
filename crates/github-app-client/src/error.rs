//! Error types for github-app-client

use thiserror::Error;

/// Errors that can occur talking to GitHub
#[derive(Error, Debug)]
pub enum GitHubError {
    /// A required setting is missing or empty
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// The App JWT could not be signed
    #[error("failed to sign app JWT: {0}")]
    Jwt(String),

    /// Transport failure or non-success status
    #[error("GitHub request failed (status {status:?}): {message}")]
    Http {
        status: Option<u16>,
        message: String,
    },

    /// A response body did not have the expected shape
    #[error("failed to decode GitHub response: {0}")]
    Decode(String),

    /// A timestamp in a response could not be parsed
    #[error("invalid timestamp {value:?}: {message}")]
    TimeParse { value: String, message: String },
}

impl GitHubError {
    /// HTTP status of the failed request, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        GitHubError::Http {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GitHubError {
    fn from(err: serde_json::Error) -> Self {
        GitHubError::Decode(err.to_string())
    }
}
