use anyhow::{bail, Result};
use ssoctx_auth::Settings;

use super::credentials::{self, Target};
use crate::usage::{LastUsage, UsageStore};

const DEFAULT_PROFILE: &str = "default";

pub async fn run(
    settings: &Settings,
    role: Option<(String, String)>,
    profile: Option<String>,
    keys: bool,
) -> Result<()> {
    let last = UsageStore::new(UsageStore::default_path()?).load()?;
    if let Some(last) = &last {
        if role.is_none() && last.start_url != settings.start_url {
            tracing::warn!(
                last_start_url = %last.start_url,
                "Last used role belongs to another start URL"
            );
        }
    }

    let (account_id, role_name, profile) = resolve(role, profile, last)?;
    tracing::info!(%account_id, %role_name, %profile, "Refreshing profile");

    credentials::run(
        settings,
        &account_id,
        &role_name,
        Target::Profile { profile, keys },
    )
    .await
}

/// Flags win over the last usage; the profile falls back to `default`
fn resolve(
    role: Option<(String, String)>,
    profile: Option<String>,
    last: Option<LastUsage>,
) -> Result<(String, String, String)> {
    let last_profile = last.as_ref().and_then(|l| l.profile.clone());
    let (account_id, role_name) = match (role, last) {
        (Some(role), _) => role,
        (None, Some(last)) => (last.account_id, last.role_name),
        (None, None) => bail!(
            "No previously used role recorded; pass --account-id and --role-name"
        ),
    };
    let profile = profile
        .or(last_profile)
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    Ok((account_id, role_name, profile))
}
