//! Command implementations.

pub mod health;
pub mod migrate;
pub mod resolve;
pub mod ticket;

use std::sync::Arc;

use deskbridge_identity::{
    IdentityResolver, PgMappingStore, PgTenantDirectory, SupportDeskClient,
};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::CliResult;

const MAX_DB_CONNECTIONS: u32 = 5;

pub(crate) async fn connect(config: &Config) -> CliResult<PgPool> {
    let url = config.database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(MAX_DB_CONNECTIONS)
        .connect(&url)
        .await?;
    Ok(pool)
}

/// Resolver over Postgres and the configured support desk.
pub(crate) async fn build_resolver(config: &Config) -> CliResult<IdentityResolver> {
    let desk = config.support_desk()?;
    let retry_policy = config.retry_policy()?;
    let pool = connect(config).await?;

    let client = SupportDeskClient::new(&desk)?;
    Ok(IdentityResolver::new(
        Arc::new(PgMappingStore::new(pool.clone())),
        Arc::new(PgTenantDirectory::new(pool)),
        Arc::new(client),
    )
    .with_retry_policy(retry_policy))
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
