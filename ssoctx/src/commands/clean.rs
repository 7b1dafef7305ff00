use anyhow::Result;
use ssoctx_auth::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    ssoctx_auth::reset(settings)?;
    eprintln!("Removed cached session");
    Ok(())
}
