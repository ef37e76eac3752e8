//! `deskbridge resolve-org` and `deskbridge resolve-user`

use clap::Args;
use serde::Serialize;

use crate::config::Config;
use crate::error::CliResult;

/// Resolve (creating if needed) the remote organization for a local one
#[derive(Args, Debug)]
pub struct ResolveOrgArgs {
    /// Local organization id
    #[arg(long = "org")]
    pub org_id: String,
}

/// Resolve (creating and linking if needed) the remote user for a local one
#[derive(Args, Debug)]
pub struct ResolveUserArgs {
    /// Local user id
    #[arg(long = "user")]
    pub user_id: String,

    /// Local organization id the user acts in
    #[arg(long = "org")]
    pub org_id: String,
}

#[derive(Serialize)]
struct OrgOutput<'a> {
    local_org_id: &'a str,
    remote_org_id: String,
}

#[derive(Serialize)]
struct UserOutput<'a> {
    local_user_id: &'a str,
    local_org_id: &'a str,
    remote_user_id: String,
}

pub async fn execute_org(args: ResolveOrgArgs, config: &Config) -> CliResult<()> {
    let resolver = super::build_resolver(config).await?;
    let remote = resolver.resolve_organization_identity(&args.org_id).await?;

    super::print_json(&OrgOutput {
        local_org_id: &args.org_id,
        remote_org_id: remote.to_string(),
    })
}

pub async fn execute_user(args: ResolveUserArgs, config: &Config) -> CliResult<()> {
    let resolver = super::build_resolver(config).await?;
    let remote = resolver
        .resolve_user_identity(&args.user_id, &args.org_id)
        .await?;

    super::print_json(&UserOutput {
        local_user_id: &args.user_id,
        local_org_id: &args.org_id,
        remote_user_id: remote.to_string(),
    })
}
