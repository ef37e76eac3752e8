//! Mock support desk using wiremock.
//!
//! Mounts the organization, user, membership and ticket endpoints with
//! success and failure variants.

#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use deskbridge_identity::{SupportDeskClient, SupportDeskCredentials};

pub const TEST_TOKEN: &str = "test-token-123";

pub struct MockSupportDesk {
    server: MockServer,
}

impl MockSupportDesk {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// A bearer-authenticated client pointed at this server.
    pub fn client(&self) -> SupportDeskClient {
        SupportDeskClient::with_http_client(
            self.uri(),
            SupportDeskCredentials::Bearer {
                token: TEST_TOKEN.to_string(),
            },
            reqwest::Client::new(),
        )
    }

    /// Requests received so far with the given method and path.
    pub async fn requests_to(&self, verb: &str, request_path: &str) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == verb && r.url.path() == request_path)
            .collect()
    }

    // =========================================================================
    // Organizations
    // =========================================================================

    pub async fn mock_create_organization(&self, remote_id: Value, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/organizations"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({
                    "organization": { "id": remote_id, "name": "ignored" }
                })),
            )
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_create_organization_status(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/organizations"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": "RecordInvalid",
                "description": "Record validation errors"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_search_organizations(&self, external_id: &str, hits: Value) {
        Mock::given(method("GET"))
            .and(path("/organizations/search"))
            .and(query_param("external_id", external_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organizations": hits,
                "count": hits.as_array().map_or(0, Vec::len),
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn mock_create_user(&self, remote_id: Value, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "user": { "id": remote_id, "role": "end-user" }
            })))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_search_users(&self, external_id: &str, hits: Value) {
        Mock::given(method("GET"))
            .and(path("/users/search"))
            .and(query_param("external_id", external_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": hits })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Memberships
    // =========================================================================

    pub async fn mock_create_membership(&self, status: u16, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/organization_memberships"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "organization_membership": { "id": 9001 }
            })))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Membership creation answered with a 422 carrying the given validation
    /// description for `field`.
    pub async fn mock_create_membership_invalid(&self, field: &str, description: &str) {
        Mock::given(method("POST"))
            .and(path("/organization_memberships"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "error": "RecordInvalid",
                "details": { field: [{ "description": description }] }
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Tickets
    // =========================================================================

    pub async fn mock_get_ticket(&self, ticket_id: &str, organization_id: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/tickets/{ticket_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ticket": {
                    "id": ticket_id,
                    "organization_id": organization_id,
                    "subject": "Printer on fire",
                    "status": "open"
                }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_get_ticket_not_found(&self, ticket_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/tickets/{ticket_id}")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "RecordNotFound"
            })))
            .mount(&self.server)
            .await;
    }
}
