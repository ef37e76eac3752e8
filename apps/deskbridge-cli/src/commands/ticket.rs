//! `deskbridge ticket`

use clap::Args;

use crate::config::Config;
use crate::error::{CliError, CliResult};

/// Fetch a support-desk ticket on behalf of a local organization
#[derive(Args, Debug)]
pub struct TicketArgs {
    /// Local organization id
    #[arg(long = "org")]
    pub org_id: String,

    /// Support-desk ticket id
    #[arg(long = "ticket")]
    pub ticket_id: String,
}

pub async fn execute(args: TicketArgs, config: &Config) -> CliResult<()> {
    let resolver = super::build_resolver(config).await?;

    // Missing and foreign tickets are indistinguishable here.
    match resolver
        .get_ticket_for_organization(&args.org_id, &args.ticket_id)
        .await?
    {
        Some(ticket) => super::print_json(&ticket),
        None => Err(CliError::NotFound(format!("ticket {}", args.ticket_id))),
    }
}
