//! Lazy provisioning of tenant identities into an external support desk.
//!
//! Local organizations and users get remote counterparts the first time they
//! are needed. The [`IdentityResolver`] guarantees at most one remote
//! organization and one remote user per local id by combining:
//!
//! - a durable [`MappingStore`] (local id → remote id),
//! - an in-process [`SingleFlight`] coordinator per key,
//! - deterministic idempotency keys ([`IdempotencyKeyDeriver`]) and the local
//!   id sent as `external_id` on every remote write.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use deskbridge_identity::{
//!     IdentityResolver, PgMappingStore, PgTenantDirectory, SupportDeskClient, SupportDeskConfig,
//! };
//!
//! let client = SupportDeskClient::new(&config)?;
//! let resolver = IdentityResolver::new(
//!     Arc::new(PgMappingStore::new(pool.clone())),
//!     Arc::new(PgTenantDirectory::new(pool)),
//!     Arc::new(client),
//! );
//! let remote_user = resolver.resolve_user_identity("user-7", "org-42").await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod idempotency;
pub mod models;
pub mod resolver;
pub mod retry;
pub mod single_flight;
pub mod store;

pub use auth::SupportDeskCredentials;
pub use client::{HealthCheckResult, ProvisioningClient, SupportDeskClient, IDEMPOTENCY_HEADER};
pub use config::SupportDeskConfig;
pub use directory::{InMemoryTenantDirectory, PgTenantDirectory, TenantDirectory};
pub use error::{ErrorKind, SyncError, SyncResult};
pub use idempotency::IdempotencyKeyDeriver;
pub use models::{
    BillingTier, LocalOrganization, LocalUser, RemoteLinkage, RemoteOrgId, RemoteOrgMapping,
    RemoteTicket, RemoteUserId, RemoteUserMapping,
};
pub use resolver::IdentityResolver;
pub use retry::RetryPolicy;
pub use single_flight::SingleFlight;
pub use store::{run_migrations, InMemoryMappingStore, MappingStore, PgMappingStore};
