//! Durable local id → remote id associations.
//!
//! Rows are written at most once per local id. Inserts are insert-or-noop:
//! when a concurrent writer (another process, typically) got there first,
//! the stored row wins and is returned to the caller.

mod memory;
mod postgres;

pub use memory::InMemoryMappingStore;
pub use postgres::{run_migrations, PgMappingStore};

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::models::{RemoteLinkage, RemoteOrgId, RemoteOrgMapping, RemoteUserId, RemoteUserMapping};

/// Storage backend for identity mappings and link flags.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Mapping for a local organization, if one was persisted.
    async fn find_org_mapping(&self, local_org_id: &str) -> SyncResult<Option<RemoteOrgMapping>>;

    /// Persist an organization mapping, returning the stored row.
    ///
    /// If a mapping already exists for `local_org_id` it is left untouched and
    /// returned instead.
    async fn insert_org_mapping(
        &self,
        local_org_id: &str,
        remote_org_id: &RemoteOrgId,
    ) -> SyncResult<RemoteOrgMapping>;

    /// Mapping for a local user, if one was persisted.
    async fn find_user_mapping(&self, local_user_id: &str)
        -> SyncResult<Option<RemoteUserMapping>>;

    /// Persist a user mapping, returning the stored row.
    async fn insert_user_mapping(
        &self,
        local_user_id: &str,
        remote_user_id: &RemoteUserId,
    ) -> SyncResult<RemoteUserMapping>;

    /// Link state for a (user, organization) pair.
    async fn find_linkage(
        &self,
        local_user_id: &str,
        local_org_id: &str,
    ) -> SyncResult<Option<RemoteLinkage>>;

    /// Record that the pair is linked remotely. Idempotent.
    ///
    /// Both mappings must already exist; otherwise this is a `Store` error.
    async fn mark_linked(&self, local_user_id: &str, local_org_id: &str)
        -> SyncResult<RemoteLinkage>;
}
