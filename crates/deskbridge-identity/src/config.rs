//! Support-desk connection settings.

use std::time::Duration;

use crate::auth::SupportDeskCredentials;
use crate::error::{SyncError, SyncResult};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how to reach the support desk.
#[derive(Debug, Clone)]
pub struct SupportDeskConfig {
    /// API root, e.g. `https://acme.zendesk.com/api/v2`.
    pub base_url: String,
    pub credentials: SupportDeskCredentials,
    pub timeout: Duration,
}

impl SupportDeskConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: SupportDeskCredentials) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reject settings the client cannot work with.
    pub fn validate(&self) -> SyncResult<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(SyncError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.credentials.is_blank() {
            return Err(SyncError::InvalidConfig(
                "support desk credentials are empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(SyncError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
