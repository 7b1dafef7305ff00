use anyhow::{Context, Result};
use sso_api::PortalClient;
use ssoctx_auth::Settings;

use crate::output;

pub async fn run(settings: &Settings) -> Result<()> {
    let token = super::access_token(settings).await?;
    let portal = PortalClient::new(&settings.region, token)?;

    let accounts = portal.list_accounts().await.context("listing accounts")?;
    tracing::debug!(count = accounts.len(), "Listed accounts");

    let mut listing = Vec::with_capacity(accounts.len());
    for account in accounts {
        let roles = portal
            .list_account_roles(&account.account_id)
            .await
            .with_context(|| format!("listing roles for {}", account.account_id))?;
        listing.push((account, roles));
    }

    print!("{}", output::accounts(&listing));
    Ok(())
}
