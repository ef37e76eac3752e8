//! Fixtures and a scripted provisioning client for resolver tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use deskbridge_identity::{
    BillingTier, IdentityResolver, InMemoryMappingStore, InMemoryTenantDirectory,
    LocalOrganization, LocalUser, ProvisioningClient, RemoteOrgId, RemoteTicket, RemoteUserId,
    RetryPolicy, SyncError, SyncResult,
};

/// A local organization with a valid display name.
pub fn organization(id: &str) -> LocalOrganization {
    LocalOrganization {
        id: id.to_string(),
        display_name: format!("Organization {id}"),
        billing_tier: BillingTier::Pro,
    }
}

/// A local user with a valid email.
pub fn user(id: &str) -> LocalUser {
    LocalUser {
        id: id.to_string(),
        full_name: format!("User {id}"),
        email: format!("{id}@example.com"),
    }
}

/// Remote org id the scripted client assigns to `local_org_id`.
pub fn remote_org(local_org_id: &str) -> RemoteOrgId {
    RemoteOrgId::new(format!("rorg-{local_org_id}"))
}

/// Remote user id the scripted client assigns to `local_user_id`.
pub fn remote_user(local_user_id: &str) -> RemoteUserId {
    RemoteUserId::new(format!("ruser-{local_user_id}"))
}

/// In-process [`ProvisioningClient`] that counts calls and records the
/// order in which operations start and finish.
#[derive(Default)]
pub struct ScriptedClient {
    pub org_calls: AtomicU32,
    pub user_calls: AtomicU32,
    pub link_calls: AtomicU32,
    pub ticket_calls: AtomicU32,
    /// `start:<op>:<id>` / `end:<op>:<id>` entries in call order.
    pub events: Mutex<Vec<String>>,
    /// Idempotency keys received, per operation.
    pub keys: Mutex<Vec<(String, String)>>,
    latency: Duration,
    org_failures: Mutex<VecDeque<SyncError>>,
    user_failures: Mutex<VecDeque<SyncError>>,
    tickets: Mutex<HashMap<String, RemoteTicket>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every remote call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the next organization creation with `error`.
    pub fn fail_next_org(self, error: SyncError) -> Self {
        self.org_failures.lock().push_back(error);
        self
    }

    /// Fail the next user creation with `error`.
    pub fn fail_next_user(self, error: SyncError) -> Self {
        self.user_failures.lock().push_back(error);
        self
    }

    /// Serve `ticket` from `get_ticket`.
    pub fn with_ticket(self, ticket: RemoteTicket) -> Self {
        self.tickets.lock().insert(ticket.id.clone(), ticket);
        self
    }

    pub fn total_calls(&self) -> u32 {
        self.org_calls.load(Ordering::SeqCst)
            + self.user_calls.load(Ordering::SeqCst)
            + self.link_calls.load(Ordering::SeqCst)
            + self.ticket_calls.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn keys_for(&self, operation: &str) -> Vec<String> {
        self.keys
            .lock()
            .iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, key)| key.clone())
            .collect()
    }

    fn position(&self, event: &str) -> Option<usize> {
        self.events.lock().iter().position(|e| e == event)
    }

    /// Whether `first` was recorded before `second`.
    pub fn happened_before(&self, first: &str, second: &str) -> bool {
        match (self.position(first), self.position(second)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    async fn step(&self, op: &str, id: &str, key: Option<&str>) {
        self.events.lock().push(format!("start:{op}:{id}"));
        if let Some(key) = key {
            self.keys.lock().push((op.to_string(), key.to_string()));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn finish(&self, op: &str, id: &str) {
        self.events.lock().push(format!("end:{op}:{id}"));
    }
}

#[async_trait]
impl ProvisioningClient for ScriptedClient {
    async fn create_remote_organization(
        &self,
        org: &LocalOrganization,
        idempotency_key: &str,
    ) -> SyncResult<RemoteOrgId> {
        self.org_calls.fetch_add(1, Ordering::SeqCst);
        self.step("org", &org.id, Some(idempotency_key)).await;
        let failure = self.org_failures.lock().pop_front();
        self.finish("org", &org.id);
        match failure {
            Some(error) => Err(error),
            None => Ok(remote_org(&org.id)),
        }
    }

    async fn create_remote_user(
        &self,
        user: &LocalUser,
        idempotency_key: &str,
    ) -> SyncResult<RemoteUserId> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.step("user", &user.id, Some(idempotency_key)).await;
        let failure = self.user_failures.lock().pop_front();
        self.finish("user", &user.id);
        match failure {
            Some(error) => Err(error),
            None => Ok(remote_user(&user.id)),
        }
    }

    async fn link_user_to_organization(
        &self,
        remote_user_id: &RemoteUserId,
        remote_org_id: &RemoteOrgId,
        idempotency_key: &str,
    ) -> SyncResult<()> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("{remote_user_id}:{remote_org_id}");
        self.step("link", &id, Some(idempotency_key)).await;
        self.finish("link", &id);
        Ok(())
    }

    async fn get_ticket(&self, remote_ticket_id: &str) -> SyncResult<Option<RemoteTicket>> {
        self.ticket_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tickets.lock().get(remote_ticket_id).cloned())
    }
}

/// A resolver over in-memory backends plus handles to inspect them.
pub struct Harness {
    pub resolver: IdentityResolver,
    pub store: Arc<InMemoryMappingStore>,
    pub directory: Arc<InMemoryTenantDirectory>,
    pub client: Arc<ScriptedClient>,
}

impl Harness {
    /// Build a harness whose directory knows `orgs` and `users`.
    pub async fn new(client: ScriptedClient, orgs: &[&str], users: &[&str]) -> Self {
        let store = Arc::new(InMemoryMappingStore::new());
        let directory = Arc::new(InMemoryTenantDirectory::new());
        for id in orgs {
            directory.add_organization(organization(id)).await;
        }
        for id in users {
            directory.add_user(user(id)).await;
        }
        let client = Arc::new(client);

        let resolver = IdentityResolver::new(store.clone(), directory.clone(), client.clone())
            .with_retry_policy(RetryPolicy::none());

        Self {
            resolver,
            store,
            directory,
            client,
        }
    }
}
