//! Local and remote identity types.
//!
//! Local entities are owned by the tenant system and only read here. Mapping
//! rows are created lazily by the resolver and never updated afterwards,
//! except for the `linked` flag of a [`RemoteLinkage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use validator::Validate;

use crate::error::SyncError;

/// Maximum accepted length of a local identifier.
pub const MAX_LOCAL_ID_LEN: usize = 255;

/// Check a local id before it reaches the store or the network.
pub fn validate_local_id(kind: &str, id: &str) -> Result<(), SyncError> {
    if id.trim().is_empty() {
        return Err(SyncError::Validation(format!("{kind} id must not be empty")));
    }
    if id.len() > MAX_LOCAL_ID_LEN {
        return Err(SyncError::Validation(format!(
            "{kind} id exceeds {MAX_LOCAL_ID_LEN} characters"
        )));
    }
    Ok(())
}

/// Billing plan of a local organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingTier {
    Hobby,
    Pro,
    Enterprise,
}

impl BillingTier {
    /// Tag attached to the remote organization.
    #[must_use]
    pub fn as_tag(&self) -> String {
        format!("tier:{self}")
    }
}

impl Display for BillingTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hobby => write!(f, "hobby"),
            Self::Pro => write!(f, "pro"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for BillingTier {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hobby" | "free" => Ok(Self::Hobby),
            "pro" => Ok(Self::Pro),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(SyncError::Validation(format!(
                "unknown billing tier '{other}'"
            ))),
        }
    }
}

/// An organization as known to the tenant system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LocalOrganization {
    #[validate(length(min = 1, max = 255))]
    pub id: String,

    #[validate(length(min = 1, max = 255))]
    pub display_name: String,

    pub billing_tier: BillingTier,
}

/// A user as known to the tenant system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LocalUser {
    #[validate(length(min = 1, max = 255))]
    pub id: String,

    #[validate(length(min = 1, max = 255))]
    pub full_name: String,

    #[validate(email)]
    pub email: String,
}

macro_rules! define_remote_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier assigned by the support desk.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_remote_id!(
    /// Organization id assigned by the support desk.
    RemoteOrgId
);

define_remote_id!(
    /// User id assigned by the support desk.
    RemoteUserId
);

/// Association between a local organization and its remote counterpart.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RemoteOrgMapping {
    pub local_org_id: String,
    pub remote_org_id: RemoteOrgId,
    pub created_at: DateTime<Utc>,
}

impl RemoteOrgMapping {
    #[must_use]
    pub fn new(local_org_id: impl Into<String>, remote_org_id: RemoteOrgId) -> Self {
        Self {
            local_org_id: local_org_id.into(),
            remote_org_id,
            created_at: Utc::now(),
        }
    }
}

/// Association between a local user and its remote counterpart.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RemoteUserMapping {
    pub local_user_id: String,
    pub remote_user_id: RemoteUserId,
    pub created_at: DateTime<Utc>,
}

impl RemoteUserMapping {
    #[must_use]
    pub fn new(local_user_id: impl Into<String>, remote_user_id: RemoteUserId) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            remote_user_id,
            created_at: Utc::now(),
        }
    }
}

/// Whether a remote user has been attached to a remote organization.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RemoteLinkage {
    pub local_user_id: String,
    pub local_org_id: String,
    pub linked: bool,
    pub linked_at: Option<DateTime<Utc>>,
}

/// The slice of a support-desk ticket needed for tenant checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTicket {
    pub id: String,
    /// `None` when the ticket is not attached to any organization.
    pub organization_id: Option<RemoteOrgId>,
    pub subject: Option<String>,
    pub status: Option<String>,
}
