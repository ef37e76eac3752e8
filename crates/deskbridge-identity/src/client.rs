//! Support-desk HTTP client (reqwest-based).
//!
//! Every write carries two independent dedup mechanisms: the
//! `Idempotency-Key` header protects replays of the same request, and the
//! local id sent as `external_id` protects against duplicate logical
//! creations issued under different tokens.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::auth::SupportDeskCredentials;
use crate::config::SupportDeskConfig;
use crate::error::{SyncError, SyncResult};
use crate::models::{LocalOrganization, LocalUser, RemoteOrgId, RemoteTicket, RemoteUserId};

/// Header carrying the idempotency token.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Remote operations needed to mirror identities into the support desk.
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    /// Create the remote organization for `org`.
    async fn create_remote_organization(
        &self,
        org: &LocalOrganization,
        idempotency_key: &str,
    ) -> SyncResult<RemoteOrgId>;

    /// Create the remote user for `user`.
    async fn create_remote_user(
        &self,
        user: &LocalUser,
        idempotency_key: &str,
    ) -> SyncResult<RemoteUserId>;

    /// Attach a remote user to a remote organization.
    async fn link_user_to_organization(
        &self,
        remote_user_id: &RemoteUserId,
        remote_org_id: &RemoteOrgId,
        idempotency_key: &str,
    ) -> SyncResult<()>;

    /// Fetch a ticket; `Ok(None)` when it does not exist.
    async fn get_ticket(&self, remote_ticket_id: &str) -> SyncResult<Option<RemoteTicket>>;
}

/// Result of probing the support desk with the configured credentials.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub checked_at: chrono::DateTime<chrono::Utc>,
    pub error: Option<String>,
}

/// HTTP implementation of [`ProvisioningClient`].
#[derive(Debug, Clone)]
pub struct SupportDeskClient {
    /// API root without trailing slash.
    base_url: String,
    credentials: SupportDeskCredentials,
    http_client: Client,
}

impl SupportDeskClient {
    /// Build a client from validated configuration.
    pub fn new(config: &SupportDeskConfig) -> SyncResult<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("deskbridge-identity/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_http_client(
            config.base_url.clone(),
            config.credentials.clone(),
            http_client,
        ))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(
        base_url: String,
        credentials: SupportDeskCredentials,
        http_client: Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            http_client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Verify credentials against `GET /users/me`.
    pub async fn health_check(&self) -> HealthCheckResult {
        let checked_at = chrono::Utc::now();
        let url = format!("{}/users/me", self.base_url);
        match self.get(&url).await {
            Ok(_) => HealthCheckResult {
                healthy: true,
                checked_at,
                error: None,
            },
            Err(e) => HealthCheckResult {
                healthy: false,
                checked_at,
                error: Some(e.to_string()),
            },
        }
    }

    /// Look up a remote organization by the local id it was created with.
    pub async fn find_organization_by_external_id(
        &self,
        external_id: &str,
    ) -> SyncResult<Option<RemoteOrgId>> {
        let url = format!("{}/organizations/search", self.base_url);
        let body = self.search(&url, external_id).await?;
        first_search_hit(&body, "organizations").map(|id| id.map(RemoteOrgId::new))
    }

    /// Look up a remote user by the local id it was created with.
    pub async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> SyncResult<Option<RemoteUserId>> {
        let url = format!("{}/users/search", self.base_url);
        let body = self.search(&url, external_id).await?;
        first_search_hit(&body, "users").map(|id| id.map(RemoteUserId::new))
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    async fn get(&self, url: &str) -> SyncResult<Value> {
        debug!("Support desk GET {}", url);
        let builder = self.credentials.apply(self.http_client.get(url));
        let response = builder.header("Accept", "application/json").send().await?;
        self.handle_response(response).await
    }

    async fn search(&self, url: &str, external_id: &str) -> SyncResult<Value> {
        debug!("Support desk GET {} (external_id={})", url, external_id);
        let builder = self.credentials.apply(self.http_client.get(url));
        let response = builder
            .query(&[("external_id", external_id)])
            .header("Accept", "application/json")
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        idempotency_key: &str,
    ) -> SyncResult<Value> {
        let response = self.send_post(url, body, idempotency_key).await?;
        self.handle_response(response).await
    }

    async fn send_post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        idempotency_key: &str,
    ) -> SyncResult<reqwest::Response> {
        debug!("Support desk POST {}", url);
        let builder = self.credentials.apply(self.http_client.post(url));
        let response = builder
            .header("Accept", "application/json")
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    // ── Response Handling ─────────────────────────────────────────────

    async fn handle_response(&self, response: reqwest::Response) -> SyncResult<Value> {
        let status = response.status();

        if !status.is_success() {
            return Err(self.error_from_response(response).await);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| SyncError::Integrity(format!("Response is not valid JSON: {e}")))
    }

    async fn error_from_response(&self, response: reqwest::Response) -> SyncError {
        let status = response.status();

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::NOT_FOUND => SyncError::RemoteNotFound(body),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => SyncError::Conflict(body),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Support desk rate limited, retry after {:?}s", retry_after);
                SyncError::RateLimited {
                    retry_after_secs: retry_after,
                }
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SyncError::Auth(format!("HTTP {status}: {body}"))
            }
            _ => {
                let detail = if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                };
                SyncError::RemoteStatus {
                    status: status.as_u16(),
                    detail,
                }
            }
        }
    }
}

#[async_trait]
impl ProvisioningClient for SupportDeskClient {
    async fn create_remote_organization(
        &self,
        org: &LocalOrganization,
        idempotency_key: &str,
    ) -> SyncResult<RemoteOrgId> {
        let url = format!("{}/organizations", self.base_url);
        let payload = json!({
            "organization": {
                "name": org.display_name,
                "external_id": org.id,
                "tags": [org.billing_tier.as_tag()],
            }
        });

        match self.post(&url, &payload, idempotency_key).await {
            Ok(body) => {
                let id = require_id(&body, "organization").map(RemoteOrgId::new)?;
                info!(local_org_id = %org.id, remote_org_id = %id, "Organization created on support desk");
                Ok(id)
            }
            Err(SyncError::Conflict(detail)) => {
                warn!(
                    local_org_id = %org.id,
                    "Organization creation conflict, looking up by external_id"
                );
                match self.find_organization_by_external_id(&org.id).await? {
                    Some(id) => {
                        info!(local_org_id = %org.id, remote_org_id = %id, "Adopted existing organization");
                        Ok(id)
                    }
                    None => Err(SyncError::Conflict(detail)),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn create_remote_user(
        &self,
        user: &LocalUser,
        idempotency_key: &str,
    ) -> SyncResult<RemoteUserId> {
        let url = format!("{}/users", self.base_url);
        let payload = json!({
            "user": {
                "name": user.full_name,
                "email": user.email,
                "external_id": user.id,
                "identities": [{ "type": "email", "value": user.email }],
                "verified": true,
            }
        });

        match self.post(&url, &payload, idempotency_key).await {
            Ok(body) => {
                let id = require_id(&body, "user").map(RemoteUserId::new)?;
                info!(local_user_id = %user.id, remote_user_id = %id, "User created on support desk");
                Ok(id)
            }
            Err(SyncError::Conflict(detail)) => {
                warn!(
                    local_user_id = %user.id,
                    "User creation conflict, looking up by external_id"
                );
                match self.find_user_by_external_id(&user.id).await? {
                    Some(id) => {
                        info!(local_user_id = %user.id, remote_user_id = %id, "Adopted existing user");
                        Ok(id)
                    }
                    None => Err(SyncError::Conflict(detail)),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn link_user_to_organization(
        &self,
        remote_user_id: &RemoteUserId,
        remote_org_id: &RemoteOrgId,
        idempotency_key: &str,
    ) -> SyncResult<()> {
        let url = format!("{}/organization_memberships", self.base_url);
        let payload = json!({
            "organization_membership": {
                "user_id": remote_user_id,
                "organization_id": remote_org_id,
            }
        });

        let response = self.send_post(&url, &payload, idempotency_key).await?;
        let status = response.status();

        match self.handle_response(response).await {
            Ok(_) => {
                info!(
                    remote_user_id = %remote_user_id,
                    remote_org_id = %remote_org_id,
                    "User linked to organization"
                );
                Ok(())
            }
            Err(SyncError::Conflict(detail)) if membership_already_exists(status, &detail) => {
                debug!(
                    remote_user_id = %remote_user_id,
                    remote_org_id = %remote_org_id,
                    "Membership already exists"
                );
                Ok(())
            }
            Err(SyncError::Conflict(detail)) => {
                warn!(
                    remote_user_id = %remote_user_id,
                    remote_org_id = %remote_org_id,
                    status = status.as_u16(),
                    "Membership rejected by support desk"
                );
                Err(SyncError::Conflict(detail))
            }
            Err(e) => Err(e),
        }
    }

    async fn get_ticket(&self, remote_ticket_id: &str) -> SyncResult<Option<RemoteTicket>> {
        validate_ticket_id(remote_ticket_id)?;

        let url = format!("{}/tickets/{}", self.base_url, remote_ticket_id);
        let body = match self.get(&url).await {
            Ok(body) => body,
            Err(SyncError::RemoteNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let ticket = body
            .get("ticket")
            .filter(|t| t.is_object())
            .ok_or_else(|| integrity("response has no 'ticket' object"))?;

        let id = ticket
            .get("id")
            .and_then(id_to_string)
            .ok_or_else(|| integrity("ticket.id is missing or malformed"))?;

        let organization_id = match ticket.get("organization_id") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(
                id_to_string(raw)
                    .map(RemoteOrgId::new)
                    .ok_or_else(|| integrity("ticket.organization_id is malformed"))?,
            ),
        };

        Ok(Some(RemoteTicket {
            id,
            organization_id,
            subject: ticket
                .get("subject")
                .and_then(Value::as_str)
                .map(str::to_string),
            status: ticket
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_string),
        }))
    }
}

fn integrity(message: &str) -> SyncError {
    error!(detail = message, "Unexpected support desk response shape");
    SyncError::Integrity(message.to_string())
}

/// Remote ids arrive as JSON numbers or non-empty strings.
///
/// Both are normalized to their decimal/string text, which is what the mapping
/// tables store and what later requests send back (`1001` goes out as `"1001"`).
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Extract `{envelope: {id}}` or fail with an integrity error.
fn require_id(body: &Value, envelope: &str) -> SyncResult<String> {
    body.get(envelope)
        .and_then(|resource| resource.get("id"))
        .and_then(id_to_string)
        .ok_or_else(|| integrity(&format!("expected '{envelope}.id' in response")))
}

/// First `id` of a `{collection: [..]}` search answer.
fn first_search_hit(body: &Value, collection: &str) -> SyncResult<Option<String>> {
    let items = body
        .get(collection)
        .and_then(Value::as_array)
        .ok_or_else(|| integrity(&format!("expected '{collection}' array in search response")))?;

    match items.first() {
        None => Ok(None),
        Some(item) => item
            .get("id")
            .and_then(id_to_string)
            .map(Some)
            .ok_or_else(|| integrity(&format!("search hit in '{collection}' has no id"))),
    }
}

/// A 409 always means the pair is already linked. A 422 only does when its
/// body reports the duplicate; any other validation failure is a rejection.
fn membership_already_exists(status: StatusCode, detail: &str) -> bool {
    if status == StatusCode::CONFLICT {
        return true;
    }
    let detail = detail.to_ascii_lowercase();
    ["already", "duplicate", "taken"]
        .iter()
        .any(|marker| detail.contains(marker))
}

fn validate_ticket_id(id: &str) -> SyncResult<()> {
    let well_formed = !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(SyncError::Validation(format!("invalid ticket id '{id}'")))
    }
}
