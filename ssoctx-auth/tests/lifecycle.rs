use chrono::{TimeDelta, TimeZone, Utc};
use std::fs;
use std::time::Duration;

use ssoctx_auth::testing::{
    test_manager, test_manager_with, ManualClock, RecordingBrowser, StubGateway,
    STUB_ACCESS_TOKEN, STUB_CLIENT_ID, STUB_VERIFICATION_URI,
};
use ssoctx_auth::{AuthError, Clock, GatewayError, LifecycleConfig, Session};

const ORIGIN: &str = "https://x";

fn cached_session(origin: &str, clock: &ManualClock, valid_for: TimeDelta) -> Session {
    Session {
        client_id: "cached-client".to_string(),
        client_secret: "cached-secret".to_string(),
        client_secret_expires_at: (clock.now() + TimeDelta::days(90)).timestamp(),
        device_code: "cached-device".to_string(),
        verification_uri: "https://device.example/cached".to_string(),
        origin_url: origin.to_string(),
        access_token: Some("cached-token".to_string()),
        access_token_expires_at: Some(clock.now() + valid_for),
    }
}

#[tokio::test]
async fn fresh_environment_persists_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();
    let clock = ManualClock::default();
    let browser = RecordingBrowser::default();
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    let manager = test_manager(dir.path(), gateway.clone(), clock.clone(), browser.clone());
    let authorization = manager.ensure_session(ORIGIN).await.unwrap();

    assert!(!authorization.is_fresh());
    let session = authorization.session();
    assert_eq!(session.origin_url, ORIGIN);
    assert_eq!(session.client_id, STUB_CLIENT_ID);
    assert_eq!(session.access_token.as_deref(), Some(STUB_ACCESS_TOKEN));
    assert_eq!(session.access_token_expires_at, Some(start + TimeDelta::hours(8)));

    let on_disk = manager.cache().load().unwrap().unwrap();
    assert_eq!(&on_disk, session);
    assert!(!manager.lock().path().exists());

    assert_eq!(gateway.register_calls(), 1);
    assert_eq!(gateway.start_calls().len(), 1);
    assert_eq!(gateway.exchange_calls().len(), 1);
    assert_eq!(browser.opened(), vec![STUB_VERIFICATION_URI.to_string()]);
}

#[tokio::test]
async fn usable_cache_is_returned_without_gateway_calls() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();
    let clock = ManualClock::default();
    let browser = RecordingBrowser::default();

    let manager = test_manager(dir.path(), gateway.clone(), clock.clone(), browser.clone());
    let cached = cached_session(ORIGIN, &clock, TimeDelta::hours(1));
    manager.cache().save(&cached).unwrap();
    let before = fs::read(manager.cache().path()).unwrap();

    let authorization = manager.ensure_session(ORIGIN).await.unwrap();

    assert!(authorization.is_fresh());
    assert_eq!(authorization.into_session(), cached);
    assert_eq!(gateway.total_calls(), 0);
    assert!(browser.opened().is_empty());
    assert_eq!(fs::read(manager.cache().path()).unwrap(), before);
    assert!(!manager.lock().path().exists());
}

#[tokio::test]
async fn expired_cache_triggers_new_authorization() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();
    let clock = ManualClock::default();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    manager
        .cache()
        .save(&cached_session(ORIGIN, &clock, TimeDelta::zero()))
        .unwrap();

    let authorization = manager.ensure_session(ORIGIN).await.unwrap();

    assert!(!authorization.is_fresh());
    assert_eq!(
        authorization.session().access_token.as_deref(),
        Some(STUB_ACCESS_TOKEN)
    );
}

#[tokio::test]
async fn other_origin_triggers_new_registration() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();
    let clock = ManualClock::default();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    manager
        .cache()
        .save(&cached_session(ORIGIN, &clock, TimeDelta::hours(1)))
        .unwrap();

    let authorization = manager.ensure_session("https://y").await.unwrap();

    assert!(!authorization.is_fresh());
    assert_eq!(authorization.session().origin_url, "https://y");
    assert_eq!(gateway.register_calls(), 1);
    assert_eq!(gateway.start_calls(), vec![STUB_CLIENT_ID.to_string()]);

    let on_disk = manager.cache().load().unwrap().unwrap();
    assert_eq!(on_disk.origin_url, "https://y");
}

#[tokio::test]
async fn expired_token_reuses_registered_client() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();
    let clock = ManualClock::default();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    manager
        .cache()
        .save(&cached_session(ORIGIN, &clock, -TimeDelta::hours(1)))
        .unwrap();

    let authorization = manager.ensure_session(ORIGIN).await.unwrap();

    assert_eq!(gateway.register_calls(), 0);
    assert_eq!(gateway.start_calls(), vec!["cached-client".to_string()]);
    assert_eq!(gateway.exchange_calls(), vec!["cached-client".to_string()]);
    assert_eq!(authorization.session().client_id, "cached-client");
}

#[tokio::test]
async fn rejected_client_falls_back_to_registration() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting().rejecting_client("cached-client");
    let clock = ManualClock::default();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    manager
        .cache()
        .save(&cached_session(ORIGIN, &clock, -TimeDelta::hours(1)))
        .unwrap();

    let authorization = manager.ensure_session(ORIGIN).await.unwrap();

    assert_eq!(gateway.register_calls(), 1);
    assert_eq!(
        gateway.start_calls(),
        vec!["cached-client".to_string(), STUB_CLIENT_ID.to_string()]
    );
    assert_eq!(authorization.session().client_id, STUB_CLIENT_ID);
    assert!(!manager.lock().path().exists());
}

#[tokio::test]
async fn pending_responses_are_polled_until_granted() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::pending_then_grant(3);
    let clock = ManualClock::default();
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    let authorization = manager.ensure_session(ORIGIN).await.unwrap();

    assert_eq!(gateway.exchange_calls().len(), 4);
    assert_eq!(clock.sleeps(), 3);
    assert_eq!(
        authorization.session().access_token_expires_at,
        Some(start + TimeDelta::seconds(15) + TimeDelta::hours(8))
    );
}

#[tokio::test]
async fn polling_gives_up_after_five_minutes() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::always_pending();
    let clock = ManualClock::default();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::Timeout(d) if d == Duration::from_secs(300)));
    assert_eq!(gateway.exchange_calls().len(), 60);
    assert!(manager.cache().load().unwrap().is_none());
    assert!(!manager.lock().path().exists());
}

#[tokio::test]
async fn approval_on_last_attempt_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::pending_then_grant(59);
    let clock = ManualClock::default();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    let authorization = manager.ensure_session(ORIGIN).await.unwrap();

    assert!(!authorization.is_fresh());
    assert_eq!(gateway.exchange_calls().len(), 60);
    assert_eq!(clock.sleeps(), 59);
}

#[tokio::test]
async fn lock_is_released_when_registration_fails() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting()
        .failing_register(GatewayError::provider("InternalServerException", "boom"));

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        ManualClock::default(),
        RecordingBrowser::default(),
    );
    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::Gateway(ref e) if e.code() == Some("InternalServerException")));
    assert!(!manager.lock().path().exists());
    assert!(manager.cache().load().unwrap().is_none());
}

#[tokio::test]
async fn lock_is_released_when_device_authorization_fails() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting()
        .failing_start(GatewayError::Transport("connection reset".to_string()));

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        ManualClock::default(),
        RecordingBrowser::default(),
    );
    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::Gateway(GatewayError::Transport(_))));
    assert!(!manager.lock().path().exists());
    assert_eq!(gateway.exchange_calls().len(), 0);
}

#[tokio::test]
async fn lock_is_released_when_token_exchange_fails() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting()
        .failing_exchange(GatewayError::provider("ExpiredTokenException", "expired"));

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        ManualClock::default(),
        RecordingBrowser::default(),
    );
    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::Gateway(ref e) if e.code() == Some("ExpiredTokenException")));
    assert!(!manager.lock().path().exists());
    assert_eq!(gateway.exchange_calls().len(), 1);
}

#[tokio::test]
async fn fresh_lock_reports_authorization_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();
    let clock = ManualClock::default();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    fs::write(
        manager.lock().path(),
        r#"{"Time":"2024-03-01T11:59:30Z"}"#,
    )
    .unwrap();

    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::AuthorizationInProgress { .. }));
    assert_eq!(gateway.total_calls(), 0);
    // someone else's lock stays in place
    assert!(manager.lock().path().exists());
}

#[tokio::test]
async fn stale_lock_is_taken_over() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        ManualClock::default(),
        RecordingBrowser::default(),
    );
    fs::write(
        manager.lock().path(),
        r#"{"Time":"2024-03-01T11:59:00Z"}"#,
    )
    .unwrap();

    let authorization = manager.ensure_session(ORIGIN).await.unwrap();

    assert!(!authorization.is_fresh());
    assert!(!manager.lock().path().exists());
}

#[tokio::test]
async fn usable_cache_ignores_lock() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();
    let clock = ManualClock::default();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    manager
        .cache()
        .save(&cached_session(ORIGIN, &clock, TimeDelta::hours(1)))
        .unwrap();
    fs::write(
        manager.lock().path(),
        r#"{"Time":"2024-03-01T12:00:00Z"}"#,
    )
    .unwrap();

    assert!(manager.ensure_session(ORIGIN).await.unwrap().is_fresh());
}

#[tokio::test]
async fn corrupted_cache_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        ManualClock::default(),
        RecordingBrowser::default(),
    );
    fs::create_dir_all(manager.cache().path().parent().unwrap()).unwrap();
    fs::write(manager.cache().path(), "{not json").unwrap();

    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::CacheCorrupted { .. }));
    assert_eq!(gateway.total_calls(), 0);
}

#[tokio::test]
async fn browser_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let browser = RecordingBrowser::failing();

    let manager = test_manager(
        dir.path(),
        StubGateway::granting(),
        ManualClock::default(),
        browser.clone(),
    );
    let authorization = manager.ensure_session(ORIGIN).await.unwrap();

    assert!(!authorization.is_fresh());
    assert_eq!(browser.opened(), vec![STUB_VERIFICATION_URI.to_string()]);
}

#[tokio::test]
async fn reset_removes_cache_and_lock() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::default();

    let manager = test_manager(
        dir.path(),
        StubGateway::granting(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    manager
        .cache()
        .save(&cached_session(ORIGIN, &clock, TimeDelta::hours(1)))
        .unwrap();
    fs::write(
        manager.lock().path(),
        r#"{"Time":"2024-03-01T12:00:00Z"}"#,
    )
    .unwrap();

    manager.reset().unwrap();

    assert!(!manager.cache().path().exists());
    assert!(!manager.lock().path().exists());

    // nothing left to remove
    manager.reset().unwrap();
}

#[tokio::test]
async fn stalled_token_exchange_is_bounded_by_poll_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting().stalling_exchange();
    let clock = ManualClock::default();
    let start = clock.now();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
    );
    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::Timeout(d) if d == Duration::from_secs(300)));
    assert_eq!(clock.now(), start + TimeDelta::seconds(300));
    assert_eq!(gateway.exchange_calls().len(), 1);
    assert!(!manager.lock().path().exists());
}

#[tokio::test]
async fn stalled_exchange_only_gets_the_remaining_budget() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::default();
    let start = clock.now();
    let gateway = StubGateway::always_pending().stalling_exchange_after(2);

    let config = LifecycleConfig {
        poll_timeout: Duration::from_secs(12),
        ..LifecycleConfig::default()
    };
    let manager = test_manager_with(
        dir.path(),
        gateway.clone(),
        clock.clone(),
        RecordingBrowser::default(),
        config,
    );
    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::Timeout(d) if d == Duration::from_secs(12)));
    // attempts at 0, 5 and 10 seconds; the third hangs until the budget is spent
    assert_eq!(gateway.exchange_calls().len(), 3);
    assert_eq!(clock.now(), start + TimeDelta::seconds(12));
    assert!(!manager.lock().path().exists());
}

#[tokio::test]
async fn stalled_registration_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting().stalling_register();

    let manager = test_manager(
        dir.path(),
        gateway.clone(),
        ManualClock::default(),
        RecordingBrowser::default(),
    );
    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(
        err,
        AuthError::RequestTimeout { operation: "client registration", after }
            if after == Duration::from_secs(10)
    ));
    assert!(gateway.start_calls().is_empty());
    assert!(!manager.lock().path().exists());
}

/// Turns the lock file into a non-empty directory so removing it fails
fn block_lock_removal(lock_path: std::path::PathBuf) -> impl Fn() + 'static {
    move || {
        let _ = fs::remove_file(&lock_path);
        fs::create_dir_all(lock_path.join("blocker")).unwrap();
    }
}

#[tokio::test]
async fn failed_release_after_success_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("ssoctx.lock");
    let gateway = StubGateway::granting().on_exchange(block_lock_removal(lock_path.clone()));

    let manager = test_manager(
        dir.path(),
        gateway,
        ManualClock::default(),
        RecordingBrowser::default(),
    );
    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::LockIo { ref path, .. } if *path == lock_path));
}

#[tokio::test]
async fn handshake_error_wins_over_failed_release() {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("ssoctx.lock");
    let gateway = StubGateway::granting()
        .failing_exchange(GatewayError::provider("AccessDeniedException", "denied"))
        .on_exchange(block_lock_removal(lock_path));

    let manager = test_manager(
        dir.path(),
        gateway,
        ManualClock::default(),
        RecordingBrowser::default(),
    );
    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::Gateway(ref e) if e.code() == Some("AccessDeniedException")));
    assert!(manager.cache().load().unwrap().is_none());
}

#[tokio::test]
async fn lock_freshness_follows_lifecycle_config() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = StubGateway::granting();
    let config = LifecycleConfig {
        lock_freshness: TimeDelta::minutes(10),
        ..LifecycleConfig::default()
    };

    let manager = test_manager_with(
        dir.path(),
        gateway.clone(),
        ManualClock::default(),
        RecordingBrowser::default(),
        config,
    );
    fs::write(
        manager.lock().path(),
        r#"{"Time":"2024-03-01T11:55:00Z"}"#,
    )
    .unwrap();

    let err = manager.ensure_session(ORIGIN).await.unwrap_err();

    assert!(matches!(err, AuthError::AuthorizationInProgress { .. }));
    assert_eq!(gateway.total_calls(), 0);
}
