//! In-memory mapping store for tests and single-process tooling.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::MappingStore;
use crate::error::{SyncError, SyncResult};
use crate::models::{RemoteLinkage, RemoteOrgId, RemoteOrgMapping, RemoteUserId, RemoteUserMapping};

/// In-memory implementation of [`MappingStore`].
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    orgs: RwLock<HashMap<String, RemoteOrgMapping>>,
    users: RwLock<HashMap<String, RemoteUserMapping>>,
    linkages: RwLock<HashMap<(String, String), RemoteLinkage>>,
}

impl InMemoryMappingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of organization mappings (for testing).
    pub async fn org_count(&self) -> usize {
        self.orgs.read().await.len()
    }

    /// Number of user mappings (for testing).
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Number of linkage rows (for testing).
    pub async fn linkage_count(&self) -> usize {
        self.linkages.read().await.len()
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn find_org_mapping(&self, local_org_id: &str) -> SyncResult<Option<RemoteOrgMapping>> {
        Ok(self.orgs.read().await.get(local_org_id).cloned())
    }

    async fn insert_org_mapping(
        &self,
        local_org_id: &str,
        remote_org_id: &RemoteOrgId,
    ) -> SyncResult<RemoteOrgMapping> {
        let mut orgs = self.orgs.write().await;
        let row = orgs
            .entry(local_org_id.to_string())
            .or_insert_with(|| RemoteOrgMapping::new(local_org_id, remote_org_id.clone()));
        Ok(row.clone())
    }

    async fn find_user_mapping(
        &self,
        local_user_id: &str,
    ) -> SyncResult<Option<RemoteUserMapping>> {
        Ok(self.users.read().await.get(local_user_id).cloned())
    }

    async fn insert_user_mapping(
        &self,
        local_user_id: &str,
        remote_user_id: &RemoteUserId,
    ) -> SyncResult<RemoteUserMapping> {
        let mut users = self.users.write().await;
        let row = users
            .entry(local_user_id.to_string())
            .or_insert_with(|| RemoteUserMapping::new(local_user_id, remote_user_id.clone()));
        Ok(row.clone())
    }

    async fn find_linkage(
        &self,
        local_user_id: &str,
        local_org_id: &str,
    ) -> SyncResult<Option<RemoteLinkage>> {
        let key = (local_user_id.to_string(), local_org_id.to_string());
        Ok(self.linkages.read().await.get(&key).cloned())
    }

    async fn mark_linked(
        &self,
        local_user_id: &str,
        local_org_id: &str,
    ) -> SyncResult<RemoteLinkage> {
        // Same rule the Postgres foreign keys enforce.
        let orgs = self.orgs.read().await;
        let users = self.users.read().await;
        if !orgs.contains_key(local_org_id) || !users.contains_key(local_user_id) {
            return Err(SyncError::Store(format!(
                "cannot link user '{local_user_id}' to organization '{local_org_id}' without both mappings"
            )));
        }

        let key = (local_user_id.to_string(), local_org_id.to_string());
        let mut linkages = self.linkages.write().await;
        let row = linkages.entry(key).or_insert_with(|| RemoteLinkage {
            local_user_id: local_user_id.to_string(),
            local_org_id: local_org_id.to_string(),
            linked: false,
            linked_at: None,
        });
        if !row.linked {
            row.linked = true;
            row.linked_at = Some(Utc::now());
        }
        Ok(row.clone())
    }
}
