//! Support-desk authentication: API token or bearer token.

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

/// Credentials for the support-desk API.
///
/// The [`Debug`] impl redacts secrets so credentials can sit inside logged
/// configuration structs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SupportDeskCredentials {
    /// Agent email plus API token, sent as basic auth `{email}/token:{token}`.
    #[serde(rename = "api_token")]
    ApiToken { email: String, token: String },

    /// OAuth access token.
    #[serde(rename = "bearer")]
    Bearer { token: String },
}

impl std::fmt::Debug for SupportDeskCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiToken { email, .. } => f
                .debug_struct("ApiToken")
                .field("email", email)
                .field("token", &"[REDACTED]")
                .finish(),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

impl SupportDeskCredentials {
    /// Attach credentials to an outgoing request.
    #[must_use]
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::ApiToken { email, token } => {
                builder.basic_auth(format!("{email}/token"), Some(token))
            }
            Self::Bearer { token } => builder.bearer_auth(token),
        }
    }

    /// Whether any secret material is missing.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::ApiToken { email, token } => email.trim().is_empty() || token.trim().is_empty(),
            Self::Bearer { token } => token.trim().is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = SupportDeskCredentials::ApiToken {
            email: "agent@example.com".into(),
            token: "s3cr3t".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("agent@example.com"));
        assert!(!rendered.contains("s3cr3t"));

        let creds = SupportDeskCredentials::Bearer {
            token: "abc123".into(),
        };
        assert!(!format!("{creds:?}").contains("abc123"));
    }

    #[test]
    fn test_deserialize_tagged() {
        let creds: SupportDeskCredentials =
            serde_json::from_str(r#"{"type":"bearer","token":"t"}"#).unwrap();
        assert_eq!(creds, SupportDeskCredentials::Bearer { token: "t".into() });
    }

    #[test]
    fn test_is_blank() {
        assert!(SupportDeskCredentials::Bearer { token: " ".into() }.is_blank());
        assert!(!SupportDeskCredentials::ApiToken {
            email: "a@b.c".into(),
            token: "t".into()
        }
        .is_blank());
    }
}
