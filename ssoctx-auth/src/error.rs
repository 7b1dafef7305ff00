use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::client::GatewayError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Session cache {} is corrupted: {source}", .path.display())]
    CacheCorrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Session cache error at {}: {source}", .path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "There is already an authorization process running (lock file {}). \
         Wait for it to finish or run `ssoctx clean`",
        .lock_path.display()
    )]
    AuthorizationInProgress { lock_path: PathBuf },

    #[error("Lock file error at {}: {source}", .path.display())]
    LockIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock file {} is corrupted: {source}", .path.display())]
    LockCorrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Identity provider error: {0}")]
    Gateway(#[from] GatewayError),

    #[error(
        "Timed out after {} seconds waiting for the request to be approved in the browser",
        .0.as_secs()
    )]
    Timeout(Duration),

    #[error("{operation} request did not complete within {} seconds", .after.as_secs())]
    RequestTimeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        AuthError::Configuration(err.to_string())
    }
}
