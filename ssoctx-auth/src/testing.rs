use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use crate::client::{
    AuthGateway, BrowserLauncher, Clock, GatewayError, LifecycleConfig, ProcessLock, SessionCache,
    TokenManager,
};
use crate::common::{ClientRegistration, DeviceAuthorization, TokenExchange};

pub const STUB_CLIENT_ID: &str = "stub-client";
pub const STUB_CLIENT_SECRET: &str = "stub-secret";
pub const STUB_DEVICE_CODE: &str = "stub-device-code";
pub const STUB_VERIFICATION_URI: &str = "https://device.example/?user_code=ABCD-EFGH";
pub const STUB_ACCESS_TOKEN: &str = "stub-access-token";

pub type TestManager = TokenManager<StubGateway, ManualClock, RecordingBrowser>;

/// Manager over the stubs with its cache and lock files inside `dir`
pub fn test_manager(
    dir: &Path,
    gateway: StubGateway,
    clock: ManualClock,
    browser: RecordingBrowser,
) -> TestManager {
    test_manager_with(dir, gateway, clock, browser, LifecycleConfig::default())
}

pub fn test_manager_with(
    dir: &Path,
    gateway: StubGateway,
    clock: ManualClock,
    browser: RecordingBrowser,
    config: LifecycleConfig,
) -> TestManager {
    TokenManager::new(
        gateway,
        SessionCache::new(dir.join("cache").join("access-token.json")),
        ProcessLock::new(dir.join("ssoctx.lock")),
        clock,
        browser,
        config,
    )
}

#[derive(Default)]
struct StubState {
    register_error: Option<GatewayError>,
    start_error: Option<GatewayError>,
    exchange_error: Option<GatewayError>,
    rejected_clients: HashSet<String>,
    /// `None` never grants
    pending_before_grant: Option<usize>,
    stall_register: bool,
    /// Exchanges after this many attempts never complete
    stall_exchange_after: Option<usize>,
    exchange_hook: Option<Rc<dyn Fn()>>,

    register_calls: Cell<usize>,
    start_calls: RefCell<Vec<String>>,
    exchange_calls: RefCell<Vec<String>>,
}

/// Scripted [`AuthGateway`]; clones share state so tests can inspect calls
/// after handing a clone to the manager.
#[derive(Clone)]
pub struct StubGateway {
    state: Rc<RefCell<StubState>>,
}

impl StubGateway {
    /// Grants a token on the first exchange
    pub fn granting() -> Self {
        Self::pending_then_grant(0)
    }

    pub fn pending_then_grant(pending: usize) -> Self {
        let state = StubState {
            pending_before_grant: Some(pending),
            ..StubState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn always_pending() -> Self {
        Self {
            state: Rc::new(RefCell::new(StubState::default())),
        }
    }

    pub fn failing_register(self, err: GatewayError) -> Self {
        self.state.borrow_mut().register_error = Some(err);
        self
    }

    pub fn failing_start(self, err: GatewayError) -> Self {
        self.state.borrow_mut().start_error = Some(err);
        self
    }

    pub fn failing_exchange(self, err: GatewayError) -> Self {
        self.state.borrow_mut().exchange_error = Some(err);
        self
    }

    /// Registration never completes
    pub fn stalling_register(self) -> Self {
        self.state.borrow_mut().stall_register = true;
        self
    }

    /// Token exchange never completes
    pub fn stalling_exchange(self) -> Self {
        self.stalling_exchange_after(0)
    }

    /// The first `attempts` exchanges answer normally, later ones hang
    pub fn stalling_exchange_after(self, attempts: usize) -> Self {
        self.state.borrow_mut().stall_exchange_after = Some(attempts);
        self
    }

    /// Runs `hook` at the start of every token exchange, while the lock is held
    pub fn on_exchange(self, hook: impl Fn() + 'static) -> Self {
        self.state.borrow_mut().exchange_hook = Some(Rc::new(hook));
        self
    }

    /// Device authorization fails for this client id
    pub fn rejecting_client(self, client_id: &str) -> Self {
        self.state
            .borrow_mut()
            .rejected_clients
            .insert(client_id.to_string());
        self
    }

    pub fn register_calls(&self) -> usize {
        self.state.borrow().register_calls.get()
    }

    /// Client ids used for device authorization, in call order
    pub fn start_calls(&self) -> Vec<String> {
        self.state.borrow().start_calls.borrow().clone()
    }

    /// Client ids used for token exchange, in call order
    pub fn exchange_calls(&self) -> Vec<String> {
        self.state.borrow().exchange_calls.borrow().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.register_calls() + self.start_calls().len() + self.exchange_calls().len()
    }
}

#[async_trait(?Send)]
impl AuthGateway for StubGateway {
    async fn register_client(
        &self,
        _client_name: &str,
    ) -> Result<ClientRegistration, GatewayError> {
        let stall = {
            let state = self.state.borrow();
            state.register_calls.set(state.register_calls.get() + 1);
            state.stall_register
        };
        if stall {
            std::future::pending::<()>().await;
        }

        let state = self.state.borrow();
        if let Some(err) = &state.register_error {
            return Err(err.clone());
        }
        Ok(ClientRegistration {
            client_id: STUB_CLIENT_ID.to_string(),
            client_secret: STUB_CLIENT_SECRET.to_string(),
            client_secret_expires_at: i64::MAX,
        })
    }

    async fn start_device_authorization(
        &self,
        client_id: &str,
        _client_secret: &str,
        _origin_url: &str,
    ) -> Result<DeviceAuthorization, GatewayError> {
        let state = self.state.borrow();
        state.start_calls.borrow_mut().push(client_id.to_string());
        if let Some(err) = &state.start_error {
            return Err(err.clone());
        }
        if state.rejected_clients.contains(client_id) {
            return Err(GatewayError::provider(
                "InvalidClientException",
                "Client is not registered",
            ));
        }
        Ok(DeviceAuthorization {
            device_code: STUB_DEVICE_CODE.to_string(),
            verification_uri: STUB_VERIFICATION_URI.to_string(),
        })
    }

    async fn exchange_token(
        &self,
        client_id: &str,
        _client_secret: &str,
        _device_code: &str,
    ) -> Result<TokenExchange, GatewayError> {
        let state = self.state.borrow();
        let attempt = {
            let mut calls = state.exchange_calls.borrow_mut();
            calls.push(client_id.to_string());
            calls.len()
        };
        let hook = state.exchange_hook.clone();
        let stall_after = state.stall_exchange_after;
        drop(state);

        if let Some(hook) = hook {
            hook();
        }
        if stall_after.is_some_and(|n| attempt > n) {
            std::future::pending::<()>().await;
        }

        let state = self.state.borrow();
        if let Some(err) = &state.exchange_error {
            return Err(err.clone());
        }
        match state.pending_before_grant {
            Some(pending) if attempt > pending => Ok(TokenExchange::Granted {
                access_token: STUB_ACCESS_TOKEN.to_string(),
            }),
            _ => Ok(TokenExchange::Pending),
        }
    }
}

/// Clock that only moves when slept on or advanced explicitly
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
    sleeps: Rc<Cell<usize>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
            sleeps: Rc::new(Cell::new(0)),
        }
    }

    pub fn advance(&self, by: chrono::TimeDelta) {
        self.now.set(self.now.get() + by);
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-03-01T12:00:00Z
        Self::at(DateTime::from_timestamp(1_709_294_400, 0).unwrap_or_default())
    }
}

#[async_trait(?Send)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        let by = chrono::TimeDelta::from_std(duration).unwrap_or(chrono::TimeDelta::MAX);
        self.advance(by);
    }

    /// A future still pending after being polled again following a yield
    /// counts as stalled; the clock then jumps ahead by `limit`.
    async fn timeout<F: Future>(&self, limit: Duration, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            output = future => Some(output),
            _ = tokio::task::yield_now() => {
                self.advance(chrono::TimeDelta::from_std(limit).unwrap_or(chrono::TimeDelta::MAX));
                None
            }
        }
    }
}

/// Records opened URLs instead of launching a browser
#[derive(Clone, Default)]
pub struct RecordingBrowser {
    opened: Rc<RefCell<Vec<String>>>,
    fail: bool,
}

impl RecordingBrowser {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.opened.borrow_mut().push(url.to_string());
        if self.fail {
            return Err(std::io::Error::other("no browser available"));
        }
        Ok(())
    }
}
