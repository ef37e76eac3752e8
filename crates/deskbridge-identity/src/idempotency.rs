//! Deterministic idempotency tokens for provisioning requests.
//!
//! The same token is sent as the `Idempotency-Key` header, so a request
//! replayed after a crash-and-restart is deduplicated by the support desk
//! itself.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Operation name for remote organization creation.
pub const OP_CREATE_ORG: &str = "create-org";
/// Operation name for remote user creation.
pub const OP_CREATE_USER: &str = "create-user";
/// Operation name for attaching a user to an organization.
pub const OP_LINK_USER_ORG: &str = "link-user-org";

/// Derives idempotency tokens from a logical request.
///
/// The token is a SHA-256 hash of:
/// - the operation name
/// - the subject fields, serialized as JSON with sorted keys
///
/// It never depends on time, randomness, or the order in which subject
/// fields are supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdempotencyKeyDeriver;

impl IdempotencyKeyDeriver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Derive a 64-character hex token for `(operation, subject)`.
    pub fn derive<'a, I>(&self, operation: &str, subject: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let sorted: BTreeMap<&str, &str> = subject.into_iter().collect();
        let canonical = canonicalize(operation, &sorted);
        hash_string(&canonical)
    }

    /// Token for creating the remote organization of `local_org_id`.
    #[must_use]
    pub fn create_org(&self, local_org_id: &str) -> String {
        self.derive(OP_CREATE_ORG, [("localOrgId", local_org_id)])
    }

    /// Token for creating the remote user of `local_user_id`.
    #[must_use]
    pub fn create_user(&self, local_user_id: &str) -> String {
        self.derive(OP_CREATE_USER, [("localUserId", local_user_id)])
    }

    /// Token for linking `local_user_id` to `local_org_id`.
    #[must_use]
    pub fn link_user_org(&self, local_user_id: &str, local_org_id: &str) -> String {
        self.derive(
            OP_LINK_USER_ORG,
            [("localUserId", local_user_id), ("localOrgId", local_org_id)],
        )
    }
}

/// Canonical JSON for hashing. Keys are inserted in sorted order so the
/// output is stable whether or not `serde_json` preserves insertion order.
fn canonicalize(operation: &str, subject: &BTreeMap<&str, &str>) -> String {
    let mut fields = serde_json::Map::new();
    for (key, value) in subject {
        fields.insert((*key).to_string(), serde_json::Value::from(*value));
    }

    let mut root = serde_json::Map::new();
    root.insert("operation".to_string(), serde_json::Value::from(operation));
    root.insert("subject".to_string(), serde_json::Value::Object(fields));
    serde_json::Value::Object(root).to_string()
}

fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
