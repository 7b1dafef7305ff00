use chrono::TimeDelta;
use std::future::Future;
use std::time::Duration;

use super::browser::{BrowserLauncher, SystemBrowser};
use super::clock::{Clock, SystemClock};
use super::gateway::{AuthGateway, OidcGateway};
use super::process_lock::{ProcessLock, LOCK_FRESHNESS};
use super::session_cache::SessionCache;
use super::settings::Settings;
use super::gateway::GatewayError;
use crate::common::{ClientRegistration, Session, TokenExchange};
use crate::error::AuthError;

const POLL_INTERVAL_SECS: u64 = 5;
const POLL_TIMEOUT_SECS: u64 = 300; // 5 minute timeout
const REQUEST_TIMEOUT_SECS: u64 = 10;
const TOKEN_LIFETIME_HOURS: i64 = 8; // provider does not report a lifetime for this grant

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Name sent when registering a new client
    pub client_name: String,
    pub poll_interval: Duration,
    /// Upper bound on waiting for the user's approval
    pub poll_timeout: Duration,
    /// Lifetime assumed for a freshly granted access token
    pub token_lifetime: TimeDelta,
    /// Deadline for client registration and device authorization requests
    pub request_timeout: Duration,
    /// Age after which another run's lock file is ignored
    pub lock_freshness: TimeDelta,
    pub reuse_client: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            client_name: "ssoctx".to_string(),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            poll_timeout: Duration::from_secs(POLL_TIMEOUT_SECS),
            token_lifetime: TimeDelta::hours(TOKEN_LIFETIME_HOURS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            lock_freshness: LOCK_FRESHNESS,
            reuse_client: true,
        }
    }
}

/// Session handed back by [`TokenManager::ensure_session`]
#[derive(Debug, Clone, PartialEq)]
pub enum Authorization {
    /// Served from the cache without contacting the provider
    Fresh(Session),
    /// Minted by a new device authorization and written to the cache
    Persisted(Session),
}

impl Authorization {
    pub fn session(&self) -> &Session {
        match self {
            Authorization::Fresh(session) | Authorization::Persisted(session) => session,
        }
    }

    pub fn into_session(self) -> Session {
        match self {
            Authorization::Fresh(session) | Authorization::Persisted(session) => session,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Authorization::Fresh(_))
    }
}

/// Decides whether the cached session can be used and otherwise runs the
/// device authorization handshake under the process lock.
pub struct TokenManager<G, C = SystemClock, B = SystemBrowser> {
    gateway: G,
    cache: SessionCache,
    lock: ProcessLock,
    clock: C,
    browser: B,
    config: LifecycleConfig,
}

impl TokenManager<OidcGateway> {
    pub fn from_settings(settings: &Settings) -> Result<Self, AuthError> {
        let cache_path = match &settings.cache_path {
            Some(path) => path.clone(),
            None => SessionCache::default_path()?,
        };

        Ok(Self::new(
            OidcGateway::new(&settings.region),
            SessionCache::new(cache_path),
            ProcessLock::new(ProcessLock::default_path()),
            SystemClock,
            SystemBrowser,
            settings.lifecycle(),
        ))
    }
}

impl<G, C, B> TokenManager<G, C, B>
where
    G: AuthGateway,
    C: Clock,
    B: BrowserLauncher,
{
    /// The lock's freshness window is taken from `config`.
    pub fn new(
        gateway: G,
        cache: SessionCache,
        lock: ProcessLock,
        clock: C,
        browser: B,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            gateway,
            cache,
            lock: lock.with_freshness(config.lock_freshness),
            clock,
            browser,
            config,
        }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn lock(&self) -> &ProcessLock {
        &self.lock
    }

    /// Returns a session usable for `origin_url`, authorizing anew when the
    /// cached one is missing, minted for another origin, or expired.
    pub async fn ensure_session(&self, origin_url: &str) -> Result<Authorization, AuthError> {
        let now = self.clock.now();
        let cached = self.cache.load()?;

        match &cached {
            Some(session) if session.is_usable(origin_url, now) => {
                tracing::debug!(
                    expires_at = ?session.access_token_expires_at,
                    "Using cached session"
                );
                return Ok(Authorization::Fresh(session.clone()));
            }
            Some(session) if session.origin_url != origin_url => {
                tracing::debug!(
                    cached_origin = %session.origin_url,
                    "Cached session belongs to another start URL"
                );
            }
            Some(_) => tracing::debug!("Cached access token expired"),
            None => tracing::debug!("No cached session"),
        }

        let reusable = cached.filter(|s| {
            self.config.reuse_client && s.can_reuse_client(origin_url, now)
        });

        if self.lock.is_locked(now)? {
            return Err(AuthError::AuthorizationInProgress {
                lock_path: self.lock.path().to_path_buf(),
            });
        }

        let guard = self.lock.acquire(now)?;
        let result = match self.handshake(origin_url, reusable).await {
            Ok(session) => self.cache.save(&session).map(|_| session),
            Err(e) => Err(e),
        };
        let released = guard.release();

        let session = match (result, released) {
            (Ok(session), released) => {
                released?;
                session
            }
            (Err(e), Err(release_err)) => {
                tracing::error!("Failed to release lock after failed handshake: {}", release_err);
                return Err(e);
            }
            (Err(e), Ok(())) => return Err(e),
        };

        tracing::info!(
            expires_at = ?session.access_token_expires_at,
            "Authorization complete"
        );
        Ok(Authorization::Persisted(session))
    }

    /// Removes the cached session and any lock file left behind.
    pub fn reset(&self) -> Result<(), AuthError> {
        self.cache.clear()?;
        self.lock.clear()?;
        tracing::info!("Removed cached session and lock file");
        Ok(())
    }

    async fn handshake(
        &self,
        origin_url: &str,
        reusable: Option<Session>,
    ) -> Result<Session, AuthError> {
        if let Some(previous) = reusable {
            tracing::debug!(client_id = %previous.client_id, "Reusing registered client");
            match self.authorize(origin_url, previous.registration()).await {
                Err(AuthError::Gateway(e)) => {
                    tracing::warn!("Registered client was rejected ({}), registering a new one", e);
                }
                result => return result,
            }
        }

        tracing::debug!(client_name = %self.config.client_name, "Registering client");
        let registration = self
            .within_request(
                "client registration",
                self.gateway.register_client(&self.config.client_name),
            )
            .await?;
        self.authorize(origin_url, registration).await
    }

    async fn authorize(
        &self,
        origin_url: &str,
        registration: ClientRegistration,
    ) -> Result<Session, AuthError> {
        let device = self
            .within_request(
                "device authorization",
                self.gateway.start_device_authorization(
                    &registration.client_id,
                    &registration.client_secret,
                    origin_url,
                ),
            )
            .await?;

        self.hand_off(&device.verification_uri);

        let access_token = self
            .poll_for_token(&registration, &device.device_code)
            .await?;

        let mut session = Session::new(registration, device, origin_url);
        session.access_token = Some(access_token);
        session.access_token_expires_at = Some(self.clock.now() + self.config.token_lifetime);
        Ok(session)
    }

    fn hand_off(&self, verification_uri: &str) {
        eprintln!("Please verify your client request: {}", verification_uri);

        if let Err(e) = self.browser.open(verification_uri) {
            tracing::warn!("Failed to open browser: {}", e);
            eprintln!("Failed to open browser automatically: {}", e);
            eprintln!("\nPlease open this URL in your browser:");
            eprintln!("{}\n", verification_uri);
        }
    }

    async fn poll_for_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<String, AuthError> {
        let start = self.clock.now();
        let timeout = self.config.poll_timeout;

        loop {
            let elapsed = (self.clock.now() - start)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed >= timeout {
                return Err(AuthError::Timeout(timeout));
            }

            // a stalled exchange may not outlive the poll budget
            let exchange = self.gateway.exchange_token(
                &registration.client_id,
                &registration.client_secret,
                device_code,
            );
            let exchange = match self.clock.timeout(timeout - elapsed, exchange).await {
                Some(result) => result?,
                None => return Err(AuthError::Timeout(timeout)),
            };

            match exchange {
                TokenExchange::Granted { access_token } => return Ok(access_token),
                TokenExchange::Pending => {
                    tracing::info!("Waiting on authorization..");
                    self.clock.sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn within_request<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, AuthError> {
        let limit = self.config.request_timeout;
        match self.clock.timeout(limit, call).await {
            Some(result) => Ok(result?),
            None => Err(AuthError::RequestTimeout {
                operation,
                after: limit,
            }),
        }
    }
}
