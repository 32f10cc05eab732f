//! Error taxonomy for onboarding.

use github_app_client::GitHubError;
use onboard_state::StorageError;

/// Configuration lookup failures. A missing record is not one of them.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("configuration store unavailable for {repository}: {source}")]
    StoreUnavailable {
        repository: String,
        #[source]
        source: StorageError,
    },

    #[error("malformed configuration for {repository}: {reason}")]
    MalformedConfiguration { repository: String, reason: String },
}

/// Template source failures.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to read template {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Inbound webhook failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing webhook signature header")]
    MissingSignature,

    #[error("malformed webhook signature: {0}")]
    MalformedSignature(String),

    #[error("webhook signature does not match payload")]
    SignatureMismatch,

    #[error("invalid {event} payload: {reason}")]
    InvalidPayload { event: String, reason: String },
}

/// Per-file provisioning failures.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("GitHub API error: {0}")]
    GitHub(#[from] GitHubError),
}
