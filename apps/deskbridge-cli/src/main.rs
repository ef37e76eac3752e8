//! deskbridge - operator CLI for support desk identity provisioning
//!
//! Resolves local organizations and users to their support-desk
//! counterparts (creating them on first use), fetches tenant-scoped
//! tickets, and manages the mapping tables.

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod error;
mod logging;

use config::Config;
use error::{CliError, CliResult};

/// deskbridge - support desk identity provisioning
#[derive(Parser)]
#[command(name = "deskbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply mapping-table migrations
    Migrate(commands::migrate::MigrateArgs),

    /// Resolve the remote organization for a local organization
    ResolveOrg(commands::resolve::ResolveOrgArgs),

    /// Resolve the remote user for a local user within an organization
    ResolveUser(commands::resolve::ResolveUserArgs),

    /// Fetch a ticket scoped to a local organization
    Ticket(commands::ticket::TicketArgs),

    /// Check support desk connectivity and credentials
    Health(commands::health::HealthArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::from_env();
    logging::init_logging(&config.log_filter());

    // Dropping the command future on Ctrl-C cancels any provisioning it owns.
    let result = tokio::select! {
        result = run(cli, &config) => result,
        _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli, config: &Config) -> CliResult<()> {
    match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(args, config).await,
        Commands::ResolveOrg(args) => commands::resolve::execute_org(args, config).await,
        Commands::ResolveUser(args) => commands::resolve::execute_user(args, config).await,
        Commands::Ticket(args) => commands::ticket::execute(args, config).await,
        Commands::Health(args) => commands::health::execute(args, config).await,
    }
}
