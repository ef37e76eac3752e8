//! Read-only access to the tenant system's organizations and users.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::SyncResult;
use crate::models::{LocalOrganization, LocalUser};

/// Source of local identities.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn get_organization(&self, local_org_id: &str) -> SyncResult<Option<LocalOrganization>>;

    async fn get_user(&self, local_user_id: &str) -> SyncResult<Option<LocalUser>>;
}

/// Directory backed by the host product's `organizations` and `users` tables.
#[derive(Debug, Clone)]
pub struct PgTenantDirectory {
    pool: PgPool,
}

#[derive(FromRow)]
struct OrganizationRow {
    id: String,
    display_name: String,
    billing_tier: String,
}

impl PgTenantDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantDirectory for PgTenantDirectory {
    async fn get_organization(&self, local_org_id: &str) -> SyncResult<Option<LocalOrganization>> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            r"
            SELECT id::text AS id, display_name, billing_tier
            FROM organizations
            WHERE id::text = $1
            ",
        )
        .bind(local_org_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> SyncResult<LocalOrganization> {
            Ok(LocalOrganization {
                id: row.id,
                display_name: row.display_name,
                billing_tier: row.billing_tier.parse()?,
            })
        })
        .transpose()
    }

    async fn get_user(&self, local_user_id: &str) -> SyncResult<Option<LocalUser>> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            r"
            SELECT id::text, full_name, email
            FROM users
            WHERE id::text = $1
            ",
        )
        .bind(local_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, full_name, email)| LocalUser {
            id,
            full_name,
            email,
        }))
    }
}

/// In-memory directory for tests and fixtures.
#[derive(Debug, Default)]
pub struct InMemoryTenantDirectory {
    organizations: RwLock<HashMap<String, LocalOrganization>>,
    users: RwLock<HashMap<String, LocalUser>>,
}

impl InMemoryTenantDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_organization(&self, org: LocalOrganization) {
        self.organizations.write().await.insert(org.id.clone(), org);
    }

    pub async fn add_user(&self, user: LocalUser) {
        self.users.write().await.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn get_organization(&self, local_org_id: &str) -> SyncResult<Option<LocalOrganization>> {
        Ok(self.organizations.read().await.get(local_org_id).cloned())
    }

    async fn get_user(&self, local_user_id: &str) -> SyncResult<Option<LocalUser>> {
        Ok(self.users.read().await.get(local_user_id).cloned())
    }
}
