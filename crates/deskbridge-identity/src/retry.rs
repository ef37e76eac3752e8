//! Replay policy for support-desk calls made by the resolver.
//!
//! Only failures that say nothing about the request itself are replayed: a
//! dropped connection, a 429, or a 5xx. Each replay reuses the caller's
//! idempotency key, so it lands on the same remote record as the first try.
//! Integrity, Conflict and Auth answers are final and surface on the first
//! attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// How many times, and how patiently, the resolver replays a remote call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Replays after the first attempt; 0 disables replay.
    pub max_retries: u32,
    /// First backoff step, doubled per replay.
    pub base_delay_secs: u64,
    /// Ceiling for both the doubled backoff and any `Retry-After` hint.
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1)
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay_secs: u64) -> Self {
        Self {
            max_retries,
            base_delay_secs,
            max_delay_secs: DEFAULT_MAX_DELAY_SECS,
        }
    }

    /// Single attempt, no replay.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Whether a call that failed with `error` on replay `attempt` (0-based)
    /// gets another go.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &SyncError) -> bool {
        attempt < self.max_retries && is_transient(error)
    }

    /// Pause before replay `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &SyncError) -> Duration {
        let secs = match error {
            SyncError::RateLimited {
                retry_after_secs: Some(hint),
            } => *hint,
            _ => self
                .base_delay_secs
                .saturating_mul(2u64.saturating_pow(attempt)),
        };
        Duration::from_secs(secs.min(self.max_delay_secs))
    }

    /// Drive `call` until it succeeds or fails for good.
    ///
    /// Final errors come back unchanged. A transient error that outlives the
    /// replay budget becomes [`SyncError::MaxRetriesExceeded`] naming
    /// `operation`; with no replay budget it is returned as is.
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut call: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let error = match call().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempts = attempt + 1, "Remote call recovered");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if self.should_retry(attempt, &error) {
                let delay = self.delay_for(attempt, &error);
                debug!(
                    operation,
                    attempt = attempt + 1,
                    delay_secs = delay.as_secs(),
                    error = %error,
                    "Replaying remote call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if attempt == 0 || !is_transient(&error) {
                return Err(error);
            }

            warn!(operation, attempts = attempt + 1, error = %error, "Replay budget spent");
            return Err(SyncError::MaxRetriesExceeded {
                attempts: attempt + 1,
                message: format!("{operation}: {error}"),
            });
        }
    }
}

/// Whether the support desk might answer differently to the same request.
fn is_transient(error: &SyncError) -> bool {
    match error {
        SyncError::Transport(_) | SyncError::RateLimited { .. } => true,
        SyncError::RemoteStatus { status, .. } => *status >= 500,
        SyncError::Validation(_)
        | SyncError::Integrity(_)
        | SyncError::Conflict(_)
        | SyncError::Auth(_)
        | SyncError::RemoteNotFound(_)
        | SyncError::LocalNotFound { .. }
        | SyncError::Store(_)
        | SyncError::InvalidConfig(_)
        | SyncError::MaxRetriesExceeded { .. } => false,
    }
}
