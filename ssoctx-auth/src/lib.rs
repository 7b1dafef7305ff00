// Types shared by the lifecycle manager and its collaborators
pub mod common;

// Token lifecycle: cache, lock, gateway and the manager driving them
mod client;
mod error;

pub use client::{
    authenticate, reset, AuthGateway, Authorization, BrowserLauncher, Clock, GatewayError,
    LifecycleConfig, LockGuard, OidcGateway, ProcessLock, SessionCache, Settings, SystemBrowser,
    SystemClock, TokenManager, LOCK_FRESHNESS,
};
pub use common::{ClientRegistration, DeviceAuthorization, Session, TokenExchange};
pub use error::AuthError;

// Stub collaborators for driving the manager deterministically
pub mod testing;
