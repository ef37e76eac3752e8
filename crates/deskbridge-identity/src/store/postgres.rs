//! PostgreSQL mapping store.

use async_trait::async_trait;
use sqlx::PgPool;

use super::MappingStore;
use crate::error::{SyncError, SyncResult};
use crate::models::{RemoteLinkage, RemoteOrgId, RemoteOrgMapping, RemoteUserId, RemoteUserMapping};

/// Apply the embedded schema migrations.
///
/// Migrations are embedded at compile time from the crate's `migrations/`
/// directory.
///
/// # Errors
///
/// Returns `SyncError::Store` if any migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> SyncResult<()> {
    tracing::info!("Running support desk mapping migrations...");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| SyncError::Store(format!("migration failed: {e}")))?;

    tracing::info!("Migrations completed successfully");
    Ok(())
}

/// [`MappingStore`] backed by PostgreSQL.
///
/// Uniqueness of the local id is enforced by primary keys, so concurrent
/// writers in different processes converge on the first row inserted.
#[derive(Debug, Clone)]
pub struct PgMappingStore {
    pool: PgPool,
}

impl PgMappingStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MappingStore for PgMappingStore {
    async fn find_org_mapping(&self, local_org_id: &str) -> SyncResult<Option<RemoteOrgMapping>> {
        let row = sqlx::query_as(
            r"
            SELECT local_org_id, remote_org_id, created_at
            FROM support_desk_org_mappings
            WHERE local_org_id = $1
            ",
        )
        .bind(local_org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_org_mapping(
        &self,
        local_org_id: &str,
        remote_org_id: &RemoteOrgId,
    ) -> SyncResult<RemoteOrgMapping> {
        let inserted: Option<RemoteOrgMapping> = sqlx::query_as(
            r"
            INSERT INTO support_desk_org_mappings (local_org_id, remote_org_id)
            VALUES ($1, $2)
            ON CONFLICT (local_org_id) DO NOTHING
            RETURNING local_org_id, remote_org_id, created_at
            ",
        )
        .bind(local_org_id)
        .bind(remote_org_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(row);
        }

        // Lost the race; the existing row wins.
        self.find_org_mapping(local_org_id).await?.ok_or_else(|| {
            SyncError::Store(format!(
                "organization mapping for '{local_org_id}' vanished after conflict"
            ))
        })
    }

    async fn find_user_mapping(
        &self,
        local_user_id: &str,
    ) -> SyncResult<Option<RemoteUserMapping>> {
        let row = sqlx::query_as(
            r"
            SELECT local_user_id, remote_user_id, created_at
            FROM support_desk_user_mappings
            WHERE local_user_id = $1
            ",
        )
        .bind(local_user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_user_mapping(
        &self,
        local_user_id: &str,
        remote_user_id: &RemoteUserId,
    ) -> SyncResult<RemoteUserMapping> {
        let inserted: Option<RemoteUserMapping> = sqlx::query_as(
            r"
            INSERT INTO support_desk_user_mappings (local_user_id, remote_user_id)
            VALUES ($1, $2)
            ON CONFLICT (local_user_id) DO NOTHING
            RETURNING local_user_id, remote_user_id, created_at
            ",
        )
        .bind(local_user_id)
        .bind(remote_user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(row);
        }

        self.find_user_mapping(local_user_id).await?.ok_or_else(|| {
            SyncError::Store(format!(
                "user mapping for '{local_user_id}' vanished after conflict"
            ))
        })
    }

    async fn find_linkage(
        &self,
        local_user_id: &str,
        local_org_id: &str,
    ) -> SyncResult<Option<RemoteLinkage>> {
        let row = sqlx::query_as(
            r"
            SELECT local_user_id, local_org_id, linked, linked_at
            FROM support_desk_linkages
            WHERE local_user_id = $1 AND local_org_id = $2
            ",
        )
        .bind(local_user_id)
        .bind(local_org_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn mark_linked(
        &self,
        local_user_id: &str,
        local_org_id: &str,
    ) -> SyncResult<RemoteLinkage> {
        // linked_at keeps its first value once set.
        let row = sqlx::query_as(
            r"
            INSERT INTO support_desk_linkages (local_user_id, local_org_id, linked, linked_at)
            VALUES ($1, $2, TRUE, NOW())
            ON CONFLICT (local_user_id, local_org_id) DO UPDATE SET
                linked = TRUE,
                linked_at = COALESCE(support_desk_linkages.linked_at, EXCLUDED.linked_at)
            RETURNING local_user_id, local_org_id, linked, linked_at
            ",
        )
        .bind(local_user_id)
        .bind(local_org_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
