use anyhow::Result;
use ssoctx_auth::Settings;

use crate::output;

pub async fn run(settings: &Settings, clean: bool) -> Result<()> {
    if clean {
        ssoctx_auth::reset(settings)?;
    }

    let authorization = ssoctx_auth::authenticate(settings).await?;
    println!("{}", output::login_summary(&authorization));
    Ok(())
}
