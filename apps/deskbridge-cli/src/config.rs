//! Configuration loaded from environment variables.
//!
//! Each command asks only for the settings it needs, so `health` works
//! without a database and `migrate` without support-desk credentials.
//! Missing or malformed values fail fast with the variable name.

use std::env;
use std::time::Duration;

use deskbridge_identity::{RetryPolicy, SupportDeskConfig, SupportDeskCredentials};
use thiserror::Error;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

fn process_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Settings resolved from a variable lookup (the process environment in
/// production, a map in tests).
pub struct Config<F = fn(&str) -> Option<String>> {
    lookup: F,
}

impl Config {
    /// Read from the process environment, loading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            lookup: process_var,
        }
    }
}

impl<F> Config<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn from_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }

    fn require(&self, name: &str) -> Result<String, ConfigError> {
        self.var(name)
            .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
    }

    fn parse_or<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.var(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                var: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// `DATABASE_URL`.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        self.require("DATABASE_URL")
    }

    /// Support-desk endpoint, credentials and timeout.
    ///
    /// `SUPPORT_DESK_BEARER_TOKEN` takes precedence over the
    /// `SUPPORT_DESK_EMAIL` + `SUPPORT_DESK_API_TOKEN` pair.
    pub fn support_desk(&self) -> Result<SupportDeskConfig, ConfigError> {
        let base_url = self.require("SUPPORT_DESK_BASE_URL")?;
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                var: "SUPPORT_DESK_BASE_URL".to_string(),
                message: "must start with http:// or https://".to_string(),
            });
        }

        let credentials = match self.var("SUPPORT_DESK_BEARER_TOKEN") {
            Some(token) => SupportDeskCredentials::Bearer { token },
            None => SupportDeskCredentials::ApiToken {
                email: self.require("SUPPORT_DESK_EMAIL")?,
                token: self.require("SUPPORT_DESK_API_TOKEN")?,
            },
        };

        let timeout_secs: u64 = self.parse_or(
            "SUPPORT_DESK_TIMEOUT_SECS",
            deskbridge_identity::config::DEFAULT_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "SUPPORT_DESK_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(SupportDeskConfig::new(base_url, credentials)
            .with_timeout(Duration::from_secs(timeout_secs)))
    }

    /// `SYNC_MAX_RETRIES` and `SYNC_RETRY_BASE_DELAY_SECS`.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let defaults = RetryPolicy::default();
        Ok(RetryPolicy::new(
            self.parse_or("SYNC_MAX_RETRIES", defaults.max_retries)?,
            self.parse_or("SYNC_RETRY_BASE_DELAY_SECS", defaults.base_delay_secs)?,
        ))
    }

    /// `RUST_LOG`, or [`DEFAULT_LOG_FILTER`].
    pub fn log_filter(&self) -> String {
        self.var("RUST_LOG")
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config<impl Fn(&str) -> Option<String>> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(move |name: &str| map.get(name).cloned())
    }

    #[test]
    fn test_database_url_required() {
        let err = config(&[]).database_url().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "DATABASE_URL"));

        let url = config(&[("DATABASE_URL", "postgres://localhost/desk")])
            .database_url()
            .unwrap();
        assert_eq!(url, "postgres://localhost/desk");
    }

    #[test]
    fn test_support_desk_api_token() {
        let desk = config(&[
            ("SUPPORT_DESK_BASE_URL", "https://acme.example.com/api/v2"),
            ("SUPPORT_DESK_EMAIL", "agent@acme.example.com"),
            ("SUPPORT_DESK_API_TOKEN", "tok"),
        ])
        .support_desk()
        .unwrap();

        assert_eq!(desk.timeout, Duration::from_secs(30));
        assert!(matches!(
            desk.credentials,
            SupportDeskCredentials::ApiToken { ref email, .. } if email == "agent@acme.example.com"
        ));
    }

    #[test]
    fn test_support_desk_bearer_wins() {
        let desk = config(&[
            ("SUPPORT_DESK_BASE_URL", "https://acme.example.com"),
            ("SUPPORT_DESK_BEARER_TOKEN", "oauth"),
            ("SUPPORT_DESK_TIMEOUT_SECS", "5"),
        ])
        .support_desk()
        .unwrap();

        assert_eq!(desk.timeout, Duration::from_secs(5));
        assert!(matches!(desk.credentials, SupportDeskCredentials::Bearer { .. }));
    }

    #[test]
    fn test_support_desk_missing_credentials() {
        let err = config(&[("SUPPORT_DESK_BASE_URL", "https://acme.example.com")])
            .support_desk()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "SUPPORT_DESK_EMAIL"));
    }

    #[test]
    fn test_support_desk_rejects_bad_url_and_timeout() {
        let err = config(&[
            ("SUPPORT_DESK_BASE_URL", "acme.example.com"),
            ("SUPPORT_DESK_BEARER_TOKEN", "t"),
        ])
        .support_desk()
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = config(&[
            ("SUPPORT_DESK_BASE_URL", "https://acme.example.com"),
            ("SUPPORT_DESK_BEARER_TOKEN", "t"),
            ("SUPPORT_DESK_TIMEOUT_SECS", "soon"),
        ])
        .support_desk()
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "SUPPORT_DESK_TIMEOUT_SECS")
        );
    }

    #[test]
    fn test_retry_policy_defaults_and_overrides() {
        let policy = config(&[]).retry_policy().unwrap();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay_secs, 1);

        let policy = config(&[("SYNC_MAX_RETRIES", "0"), ("SYNC_RETRY_BASE_DELAY_SECS", "2")])
            .retry_policy()
            .unwrap();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.base_delay_secs, 2);
    }

    #[test]
    fn test_log_filter_default() {
        assert_eq!(config(&[]).log_filter(), "info");
        assert_eq!(config(&[("RUST_LOG", "debug")]).log_filter(), "debug");
    }
}
