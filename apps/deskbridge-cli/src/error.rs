//! CLI error types and exit codes

use deskbridge_identity::{ErrorKind, SyncError};
use thiserror::Error;

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error (configuration, database, output)
/// - 2: Support desk rejected the credentials
/// - 3: Support desk unreachable or throttling
/// - 4: Invalid input or not found
/// - 5: Support desk misbehaved (5xx, unexpected response)
/// - 130: Interrupted
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Support desk unhealthy: {0}")]
    Unhealthy(String),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Database(_) | CliError::Output(_) => 1,
            CliError::NotFound(_) => 4,
            CliError::Unhealthy(_) => 3,
            CliError::Interrupted => 130,
            CliError::Sync(err) => match (err, err.kind()) {
                (SyncError::Auth(_), _) => 2,
                (_, ErrorKind::Validation | ErrorKind::NotFound) => 4,
                (_, ErrorKind::Integrity) => 5,
                (_, ErrorKind::Transport) if err.is_server_error() => 5,
                (_, ErrorKind::Transport) => 3,
                (_, ErrorKind::Internal) => 1,
            },
        }
    }

    /// Print the error to stderr
    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::Config(ConfigError::MissingVar("DATABASE_URL".into())).exit_code(),
            1
        );
        assert_eq!(CliError::NotFound("ticket 1".into()).exit_code(), 4);
        assert_eq!(CliError::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_sync_error_exit_codes() {
        let code = |e: SyncError| CliError::from(e).exit_code();

        assert_eq!(code(SyncError::Auth("401".into())), 2);
        assert_eq!(code(SyncError::Validation("empty id".into())), 4);
        assert_eq!(
            code(SyncError::LocalNotFound {
                kind: "user",
                id: "u-1".into()
            }),
            4
        );
        assert_eq!(code(SyncError::Transport("refused".into())), 3);
        assert_eq!(
            code(SyncError::RemoteStatus {
                status: 502,
                detail: String::new()
            }),
            5
        );
        assert_eq!(code(SyncError::Integrity("no id".into())), 5);
        assert_eq!(code(SyncError::Store("pool closed".into())), 1);
    }
}
