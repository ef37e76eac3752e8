//! Error types for identity provisioning.
//!
//! Every variant is `Clone` so that a single in-flight failure can be handed
//! unchanged to all callers waiting on the same single-flight key. Foreign
//! error types (`reqwest`, `sqlx`, `validator`) are therefore flattened into
//! their message on conversion.

use thiserror::Error;

/// Coarse classification used by callers to decide how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local input failed schema checks; never retried.
    Validation,
    /// Network failure or non-2xx answer; safe to retry.
    Transport,
    /// The remote answered with an unexpected shape; not retried.
    Integrity,
    /// A referenced object does not exist.
    NotFound,
    /// Configuration, authentication, or storage failure.
    Internal,
}

/// Errors raised while resolving or provisioning identities.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Local input failed validation before any network call.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Connection, DNS, or timeout failure talking to the support desk.
    #[error("Support desk unreachable: {0}")]
    Transport(String),

    /// Non-2xx status not covered by a more specific variant.
    #[error("Support desk returned HTTP {status}: {detail}")]
    RemoteStatus { status: u16, detail: String },

    /// The support desk throttled the request (HTTP 429).
    #[error("Rate limited by support desk (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The response body did not match the expected shape.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// The support desk refused a write as a duplicate or invalid (HTTP 409/422).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Credentials were rejected (HTTP 401/403).
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A remote object addressed by id does not exist (HTTP 404).
    #[error("Remote resource not found: {0}")]
    RemoteNotFound(String),

    /// The tenant directory has no record for a local id.
    #[error("Local {kind} not found: {id}")]
    LocalNotFound { kind: &'static str, id: String },

    /// The mapping store or tenant directory failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Client or policy configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Retries were exhausted on a retryable error.
    #[error("Max retries exceeded after {attempts} attempt(s): {message}")]
    MaxRetriesExceeded { attempts: u32, message: String },
}

/// Result alias for identity provisioning operations.
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport(_)
            | Self::RemoteStatus { .. }
            | Self::RateLimited { .. }
            | Self::MaxRetriesExceeded { .. } => ErrorKind::Transport,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::RemoteNotFound(_) | Self::LocalNotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) | Self::Auth(_) | Self::Store(_) | Self::InvalidConfig(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the failure is transient (network, throttling).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimited { .. })
    }

    /// Whether the support desk answered with a 5xx status.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::RemoteStatus { status, .. } if *status >= 500)
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Integrity(format!("Failed to decode response: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<validator::ValidationErrors> for SyncError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}
