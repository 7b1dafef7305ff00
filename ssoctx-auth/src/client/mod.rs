mod browser;
mod clock;
mod gateway;
mod manager;
mod process_lock;
mod session_cache;
mod settings;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use clock::{Clock, SystemClock};
pub use gateway::{AuthGateway, GatewayError, OidcGateway};
pub use manager::{Authorization, LifecycleConfig, TokenManager};
pub use process_lock::{LockGuard, ProcessLock, LOCK_FRESHNESS};
pub use session_cache::SessionCache;
pub use settings::Settings;

use crate::error::AuthError;

/// Ensure a usable session for the configured start URL, opening the
/// browser for approval when a new authorization is needed
pub async fn authenticate(settings: &Settings) -> Result<Authorization, AuthError> {
    settings.validate().map_err(AuthError::Configuration)?;

    let manager = TokenManager::from_settings(settings)?;
    let authorization = manager.ensure_session(&settings.start_url).await?;

    match &authorization {
        Authorization::Fresh(_) => tracing::debug!("Cached session is still valid"),
        Authorization::Persisted(_) => eprintln!("✓ Authorization successful!"),
    }

    Ok(authorization)
}

/// Remove the cached session and lock file
pub fn reset(settings: &Settings) -> Result<(), AuthError> {
    TokenManager::from_settings(settings)?.reset()
}
