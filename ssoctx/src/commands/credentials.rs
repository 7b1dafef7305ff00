use anyhow::{Context, Result};
use sso_api::PortalClient;
use ssoctx_auth::Settings;

use crate::cli::CredentialsFormat;
use crate::output;
use crate::profiles::{CredentialsFile, ProfileEntry};
use crate::usage::{LastUsage, UsageStore};

/// Where issued credentials end up
pub enum Target {
    Stdout(CredentialsFormat),
    Profile { profile: String, keys: bool },
}

pub async fn run(
    settings: &Settings,
    account_id: &str,
    role_name: &str,
    target: Target,
) -> Result<()> {
    let token = super::access_token(settings).await?;
    let portal = PortalClient::new(&settings.region, token)?;

    tracing::debug!(%account_id, %role_name, "Requesting role credentials");
    let credentials = portal
        .get_role_credentials(account_id, role_name)
        .await
        .with_context(|| format!("fetching credentials for {} in {}", role_name, account_id))?;

    let profile = match &target {
        Target::Profile { profile, .. } => Some(profile.clone()),
        Target::Stdout(_) => None,
    };
    remember(settings, account_id, role_name, profile);

    match target {
        Target::Stdout(CredentialsFormat::Env) => {
            print!("{}", output::credentials_env(&credentials))
        }
        Target::Stdout(CredentialsFormat::Process) => {
            println!("{}", output::credentials_process(&credentials)?)
        }
        Target::Profile { profile, keys } => {
            let entry = if keys {
                ProfileEntry::Keys {
                    credentials: credentials.clone(),
                    region: settings.region.clone(),
                }
            } else {
                ProfileEntry::Process {
                    account_id: account_id.to_string(),
                    role_name: role_name.to_string(),
                    start_url: settings.start_url.clone(),
                    region: settings.region.clone(),
                }
            };
            let file = CredentialsFile::new(CredentialsFile::default_path()?);
            file.write_profile(&profile, &entry)?;
            eprintln!("{}", output::profile_summary(&profile, file.path(), &credentials));
        }
    }
    Ok(())
}

/// Failing to record usage never fails the command
fn remember(settings: &Settings, account_id: &str, role_name: &str, profile: Option<String>) {
    let usage = LastUsage {
        account_id: account_id.to_string(),
        role_name: role_name.to_string(),
        start_url: settings.start_url.clone(),
        profile,
    };
    let saved = UsageStore::default_path().and_then(|path| UsageStore::new(path).save(&usage));
    if let Err(e) = saved {
        tracing::warn!("Failed to record last usage: {:#}", e);
    }
}
