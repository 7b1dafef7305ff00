use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::manager::LifecycleConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Start URL of the SSO tenant
    #[serde(default)]
    pub start_url: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Try the cached client registration before registering a new one
    #[serde(default = "default_reuse_client")]
    pub reuse_client: bool,

    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_client_name() -> String {
    "ssoctx".to_string()
}

fn default_reuse_client() -> bool {
    true
}

impl Settings {
    /// Loads `$SSOCTX_CONFIG` or `<config dir>/ssoctx/config.toml`, then
    /// `SSOCTX__*` environment variables. A missing file is not an error.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(Self::config_path().as_deref())
    }

    /// File read by [`Settings::new`]
    pub fn config_path() -> Option<PathBuf> {
        std::env::var_os("SSOCTX_CONFIG")
            .map(PathBuf::from)
            .or_else(Self::default_config_path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(Environment::with_prefix("SSOCTX").separator("__"));

        builder.build()?.try_deserialize()
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ssoctx").join("config.toml"))
    }

    /// Command line values take precedence over the config file
    pub fn with_overrides(mut self, start_url: Option<String>, region: Option<String>) -> Self {
        if let Some(start_url) = start_url.filter(|s| !s.is_empty()) {
            self.start_url = start_url;
        }
        if let Some(region) = region.filter(|r| !r.is_empty()) {
            self.region = region;
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.start_url.is_empty() {
            return Err("start_url is required".to_string());
        }
        if !(self.start_url.starts_with("https://") || self.start_url.starts_with("http://")) {
            return Err("start_url must be a valid HTTP(S) URL".to_string());
        }
        if self.region.is_empty() {
            return Err("region must not be empty".to_string());
        }
        Ok(())
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            client_name: self.client_name.clone(),
            reuse_client: self.reuse_client,
            ..LifecycleConfig::default()
        }
    }
}
