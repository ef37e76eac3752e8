//! `deskbridge health`

use clap::Args;
use deskbridge_identity::SupportDeskClient;

use crate::config::Config;
use crate::error::{CliError, CliResult};

/// Check connectivity and credentials against the support desk
#[derive(Args, Debug)]
pub struct HealthArgs {}

pub async fn execute(_args: HealthArgs, config: &Config) -> CliResult<()> {
    let client = SupportDeskClient::new(&config.support_desk()?)?;
    let result = client.health_check().await;

    super::print_json(&result)?;
    match result.error {
        None => Ok(()),
        Some(error) => Err(CliError::Unhealthy(error)),
    }
}
