//! Identity resolution: local id in, remote id out.
//!
//! Remote identities are created lazily, the first time a local identity
//! needs one. Each resolution checks the mapping store first; on a miss the
//! creation runs under a per-key single-flight so concurrent callers in this
//! process share one remote call. The idempotency key and `external_id` sent
//! with every write cover replays across processes and restarts.
//!
//! A user is always resolved after its organization, so the remote
//! organization exists before the user is created and linked to it.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::client::ProvisioningClient;
use crate::directory::TenantDirectory;
use crate::error::{SyncError, SyncResult};
use crate::idempotency::IdempotencyKeyDeriver;
use crate::models::{validate_local_id, RemoteOrgId, RemoteTicket, RemoteUserId};
use crate::retry::RetryPolicy;
use crate::single_flight::SingleFlight;
use crate::store::MappingStore;

/// Orchestrates mapping lookups, remote creation, and persistence.
///
/// Cloning is cheap; clones share the store, client, and in-flight tables.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn MappingStore>,
    directory: Arc<dyn TenantDirectory>,
    client: Arc<dyn ProvisioningClient>,
    keys: IdempotencyKeyDeriver,
    retry_policy: RetryPolicy,
    org_flights: SingleFlight<SyncResult<RemoteOrgId>>,
    user_flights: SingleFlight<SyncResult<RemoteUserId>>,
    link_flights: SingleFlight<SyncResult<()>>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("retry_policy", &self.retry_policy)
            .field("org_flights", &self.org_flights)
            .field("user_flights", &self.user_flights)
            .field("link_flights", &self.link_flights)
            .finish_non_exhaustive()
    }
}

impl IdentityResolver {
    #[must_use]
    pub fn new(
        store: Arc<dyn MappingStore>,
        directory: Arc<dyn TenantDirectory>,
        client: Arc<dyn ProvisioningClient>,
    ) -> Self {
        Self {
            store,
            directory,
            client,
            keys: IdempotencyKeyDeriver::new(),
            retry_policy: RetryPolicy::default(),
            org_flights: SingleFlight::new(),
            user_flights: SingleFlight::new(),
            link_flights: SingleFlight::new(),
        }
    }

    /// Replace the retry policy applied to remote calls.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Number of creations currently in flight across all key spaces.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.org_flights.in_flight() + self.user_flights.in_flight() + self.link_flights.in_flight()
    }

    /// Remote organization id for `local_org_id`, creating it on first use.
    #[instrument(skip(self), err)]
    pub async fn resolve_organization_identity(&self, local_org_id: &str) -> SyncResult<RemoteOrgId> {
        validate_local_id("organization", local_org_id)?;

        if let Some(mapping) = self.store.find_org_mapping(local_org_id).await? {
            debug!(remote_org_id = %mapping.remote_org_id, "Organization mapping hit");
            return Ok(mapping.remote_org_id);
        }

        let this = self.clone();
        let id = local_org_id.to_string();
        self.org_flights
            .run(&format!("org:{local_org_id}"), move || async move {
                this.provision_organization(&id).await
            })
            .await
    }

    /// Remote user id for `local_user_id`, ensuring the user exists remotely
    /// and is a member of the remote organization for `local_org_id`.
    #[instrument(skip(self), err)]
    pub async fn resolve_user_identity(
        &self,
        local_user_id: &str,
        local_org_id: &str,
    ) -> SyncResult<RemoteUserId> {
        validate_local_id("user", local_user_id)?;
        validate_local_id("organization", local_org_id)?;

        let remote_org_id = self.resolve_organization_identity(local_org_id).await?;

        let remote_user_id = match self.store.find_user_mapping(local_user_id).await? {
            Some(mapping) => {
                debug!(remote_user_id = %mapping.remote_user_id, "User mapping hit");
                mapping.remote_user_id
            }
            None => {
                let this = self.clone();
                let id = local_user_id.to_string();
                self.user_flights
                    .run(&format!("user:{local_user_id}"), move || async move {
                        this.provision_user(&id).await
                    })
                    .await?
            }
        };

        let linked = self
            .store
            .find_linkage(local_user_id, local_org_id)
            .await?
            .is_some_and(|linkage| linkage.linked);

        if !linked {
            let this = self.clone();
            let (user_id, org_id) = (local_user_id.to_string(), local_org_id.to_string());
            let (remote_user, remote_org) = (remote_user_id.clone(), remote_org_id);
            self.link_flights
                .run(
                    &format!("link:{local_user_id}:{local_org_id}"),
                    move || async move {
                        this.link_user(&user_id, &org_id, &remote_user, &remote_org)
                            .await
                    },
                )
                .await?;
        }

        Ok(remote_user_id)
    }

    /// Fetch a ticket on behalf of a local organization.
    ///
    /// Returns `None` when the ticket does not exist or belongs to another
    /// organization. Both cases look the same to the caller.
    #[instrument(skip(self), err)]
    pub async fn get_ticket_for_organization(
        &self,
        local_org_id: &str,
        remote_ticket_id: &str,
    ) -> SyncResult<Option<RemoteTicket>> {
        let remote_org_id = self.resolve_organization_identity(local_org_id).await?;

        let ticket = self
            .retry_policy
            .execute("get_ticket", || self.client.get_ticket(remote_ticket_id))
            .await?;

        match ticket {
            None => {
                debug!("Ticket not found on support desk");
                Ok(None)
            }
            Some(ticket) if ticket.organization_id.as_ref() == Some(&remote_org_id) => {
                Ok(Some(ticket))
            }
            Some(ticket) => {
                warn!(
                    remote_org_id = %remote_org_id,
                    ticket_org_id = ?ticket.organization_id.as_ref().map(RemoteOrgId::as_str),
                    "Ticket belongs to a different organization"
                );
                Ok(None)
            }
        }
    }

    // ── Producers ──────────────────────────────────────────────────────

    async fn provision_organization(&self, local_org_id: &str) -> SyncResult<RemoteOrgId> {
        // A flight for this key may have settled between our lookup and admission.
        if let Some(mapping) = self.store.find_org_mapping(local_org_id).await? {
            return Ok(mapping.remote_org_id);
        }

        let org = self
            .directory
            .get_organization(local_org_id)
            .await?
            .ok_or_else(|| SyncError::LocalNotFound {
                kind: "organization",
                id: local_org_id.to_string(),
            })?;
        org.validate()?;

        let key = self.keys.create_org(local_org_id);
        let created = self
            .retry_policy
            .execute("create_remote_organization", || {
                self.client.create_remote_organization(&org, &key)
            })
            .await?;

        let stored = self.store.insert_org_mapping(local_org_id, &created).await?;
        if stored.remote_org_id != created {
            warn!(
                local_org_id,
                created = %created,
                stored = %stored.remote_org_id,
                "Organization mapping already stored by another writer"
            );
        }
        info!(local_org_id, remote_org_id = %stored.remote_org_id, "Organization provisioned");
        Ok(stored.remote_org_id)
    }

    async fn provision_user(&self, local_user_id: &str) -> SyncResult<RemoteUserId> {
        if let Some(mapping) = self.store.find_user_mapping(local_user_id).await? {
            return Ok(mapping.remote_user_id);
        }

        let user = self
            .directory
            .get_user(local_user_id)
            .await?
            .ok_or_else(|| SyncError::LocalNotFound {
                kind: "user",
                id: local_user_id.to_string(),
            })?;
        user.validate()?;

        let key = self.keys.create_user(local_user_id);
        let created = self
            .retry_policy
            .execute("create_remote_user", || {
                self.client.create_remote_user(&user, &key)
            })
            .await?;

        let stored = self.store.insert_user_mapping(local_user_id, &created).await?;
        if stored.remote_user_id != created {
            warn!(
                local_user_id,
                created = %created,
                stored = %stored.remote_user_id,
                "User mapping already stored by another writer"
            );
        }
        info!(local_user_id, remote_user_id = %stored.remote_user_id, "User provisioned");
        Ok(stored.remote_user_id)
    }

    async fn link_user(
        &self,
        local_user_id: &str,
        local_org_id: &str,
        remote_user_id: &RemoteUserId,
        remote_org_id: &RemoteOrgId,
    ) -> SyncResult<()> {
        let already_linked = self
            .store
            .find_linkage(local_user_id, local_org_id)
            .await?
            .is_some_and(|linkage| linkage.linked);
        if already_linked {
            return Ok(());
        }

        let key = self.keys.link_user_org(local_user_id, local_org_id);
        self.retry_policy
            .execute("link_user_to_organization", || {
                self.client
                    .link_user_to_organization(remote_user_id, remote_org_id, &key)
            })
            .await?;

        self.store.mark_linked(local_user_id, local_org_id).await?;
        info!(local_user_id, local_org_id, "User linked to organization");
        Ok(())
    }
}
