use anyhow::{Context, Result};
use ssoctx_auth::Settings;
use std::io::ErrorKind;
use std::path::Path;

use crate::cli::ConfigAction;

pub fn run(settings: &Settings, action: ConfigAction) -> Result<()> {
    let path = Settings::config_path().context("Could not find config directory")?;

    match action {
        ConfigAction::Show => {
            println!("# {}", path.display());
            println!("start_url = {:?}", settings.start_url);
            println!("region = {:?}", settings.region);
            println!("client_name = {:?}", settings.client_name);
            println!("reuse_client = {}", settings.reuse_client);
            if let Some(cache_path) = &settings.cache_path {
                println!("cache_path = {:?}", cache_path.display().to_string());
            }
        }
        ConfigAction::Write => {
            settings
                .validate()
                .map_err(|e| anyhow::anyhow!("Refusing to write config: {}", e))?;
            write_config(&path, settings)?;
            eprintln!("Config written to {}", path.display());
        }
    }
    Ok(())
}

/// Stores the start URL and region, keeping any other keys already in the file
fn write_config(path: &Path, settings: &Settings) -> Result<()> {
    let mut table = match std::fs::read_to_string(path) {
        Ok(text) => text
            .parse::<toml::Table>()
            .with_context(|| format!("parsing {}", path.display()))?,
        Err(e) if e.kind() == ErrorKind::NotFound => toml::Table::new(),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    table.insert(
        "start_url".to_string(),
        toml::Value::String(settings.start_url.clone()),
    );
    table.insert(
        "region".to_string(),
        toml::Value::String(settings.region.clone()),
    );

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(path, toml::to_string(&table)?)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "Config written");
    Ok(())
}
