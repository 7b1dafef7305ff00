mod accounts;
mod clean;
mod config;
mod credentials;
mod login;
mod refresh;

use anyhow::{Context, Result};
use ssoctx_auth::Settings;

use crate::cli::{Cli, Commands};

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::new()
        .context("loading configuration")?
        .with_overrides(cli.start_url, cli.region);

    match cli.command {
        Commands::Login { clean } => login::run(&settings, clean).await,
        Commands::Clean => clean::run(&settings),
        Commands::Credentials {
            account_id,
            role_name,
            format,
            profile,
            keys,
        } => {
            let target = match profile {
                Some(profile) => credentials::Target::Profile { profile, keys },
                None => credentials::Target::Stdout(format),
            };
            credentials::run(&settings, &account_id, &role_name, target).await
        }
        Commands::Refresh {
            account_id,
            role_name,
            profile,
            keys,
        } => refresh::run(&settings, account_id.zip(role_name), profile, keys).await,
        Commands::Accounts => accounts::run(&settings).await,
        Commands::Config { action } => config::run(&settings, action),
    }
}

/// Access token of a usable session, authorizing first when needed
async fn access_token(settings: &Settings) -> Result<String> {
    let authorization = ssoctx_auth::authenticate(settings).await?;
    authorization
        .into_session()
        .access_token
        .context("session holds no access token")
}
