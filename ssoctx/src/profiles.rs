//! Named profiles in the shared credentials file.

use anyhow::{Context, Result};
use ini::Ini;
use sso_api::RoleCredentials;
use std::path::{Path, PathBuf};

/// Executable SDKs invoke for `credential_process` profiles
const PROCESS_COMMAND: &str = "ssoctx";

/// What a profile section holds
#[derive(Debug, Clone)]
pub enum ProfileEntry {
    /// Resolved on demand through `ssoctx credentials --format process`
    Process {
        account_id: String,
        role_name: String,
        start_url: String,
        region: String,
    },
    /// Static keys, valid until the role credentials expire
    Keys {
        credentials: RoleCredentials,
        region: String,
    },
}

impl ProfileEntry {
    fn properties(&self) -> Vec<(&'static str, String)> {
        match self {
            ProfileEntry::Process {
                account_id,
                role_name,
                start_url,
                region,
            } => vec![
                (
                    "credential_process",
                    format!(
                        "{} credentials -a {} -n {} --format process --start-url {} --region {}",
                        PROCESS_COMMAND, account_id, role_name, start_url, region
                    ),
                ),
                ("region", region.clone()),
            ],
            ProfileEntry::Keys {
                credentials,
                region,
            } => vec![
                ("aws_access_key_id", credentials.access_key_id.clone()),
                ("aws_secret_access_key", credentials.secret_access_key.clone()),
                ("aws_session_token", credentials.session_token.clone()),
                ("region", region.clone()),
            ],
        }
    }
}

pub struct CredentialsFile {
    path: PathBuf,
}

impl CredentialsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$AWS_SHARED_CREDENTIALS_FILE` or `~/.aws/credentials`
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os("AWS_SHARED_CREDENTIALS_FILE") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".aws").join("credentials"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces `profile` with `entry`, leaving every other section untouched
    pub fn write_profile(&self, profile: &str, entry: &ProfileEntry) -> Result<()> {
        let mut file = if self.path.exists() {
            Ini::load_from_file(&self.path)
                .with_context(|| format!("reading {}", self.path.display()))?
        } else {
            if let Some(dir) = self.path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
            create_owner_only(&self.path)
                .with_context(|| format!("creating {}", self.path.display()))?;
            Ini::new()
        };

        file.delete(Some(profile));
        for (key, value) in entry.properties() {
            file.set_to(Some(profile), key.to_string(), value);
        }

        file.write_to_file(&self.path)
            .with_context(|| format!("writing {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("restricting {}", self.path.display()))?;
        }

        tracing::info!(%profile, path = %self.path.display(), "Profile written");
        Ok(())
    }
}

fn create_owner_only(path: &Path) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map(drop)
}
