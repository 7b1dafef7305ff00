//! Remembers the last account and role credentials were issued for, so
//! `ssoctx refresh` can repeat it without flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const USAGE_FILE: &str = "last-usage.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastUsage {
    pub account_id: String,
    pub role_name: String,
    /// Start URL the credentials came from
    pub start_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

pub struct UsageStore {
    path: PathBuf,
}

impl UsageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Next to the session cache
    pub fn default_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir().context("Could not find cache directory")?;
        Ok(cache_dir.join("ssoctx").join(USAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<LastUsage>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        let usage = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(usage))
    }

    pub fn save(&self, usage: &LastUsage) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(usage)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        tracing::debug!(account_id = %usage.account_id, role_name = %usage.role_name, "Saved last usage");
        Ok(())
    }
}
