//! `deskbridge migrate`

use clap::Args;
use serde_json::json;

use crate::config::Config;
use crate::error::CliResult;

/// Apply mapping-table migrations
#[derive(Args, Debug)]
pub struct MigrateArgs {}

pub async fn execute(_args: MigrateArgs, config: &Config) -> CliResult<()> {
    let pool = super::connect(config).await?;
    deskbridge_identity::run_migrations(&pool).await?;
    super::print_json(&json!({ "status": "ok" }))
}
