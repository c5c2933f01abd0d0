//! End-to-end session scenarios through the public API.

use camera_session::{
    CameraError, CameraSession, ErrorKind, FacingMode, FileConfig, MockBehavior, MockPlatform,
    PermissionState, SessionConfig, SessionError,
};
use std::rc::Rc;
use std::time::Duration;

#[tokio::test]
async fn test_granted_start_publishes_stream() {
    let session = CameraSession::new(MockPlatform::new(), SessionConfig::default());
    let mut rx = session.subscribe();

    session.start_camera().await.unwrap();

    let state = rx.borrow_and_update().clone();
    assert!(state.stream.is_some());
    assert!(!state.is_loading);
    assert_eq!(state.error, None);
    assert_eq!(state.has_permission, PermissionState::Granted);
}

#[tokio::test]
async fn test_denied_start_publishes_error() {
    let platform = MockPlatform::new().with_fallback(MockBehavior::Block);
    let session = CameraSession::new(platform, SessionConfig::default());

    let result = session.start_camera().await;

    assert!(matches!(
        result,
        Err(SessionError::Camera(CameraError::PermissionDenied(_)))
    ));
    let state = session.state();
    assert!(state.stream.is_none());
    assert_eq!(state.error.map(|e| e.kind()), Some(ErrorKind::PermissionDenied));
    assert_eq!(state.has_permission, PermissionState::Denied);
}

#[tokio::test]
async fn test_switch_releases_old_stream() {
    let platform = MockPlatform::new().with_tracks(2);
    let ledger = platform.ledger();
    let session = CameraSession::new(platform, SessionConfig::default());

    session.start_camera().await.unwrap();
    let old = session.with_stream(|s| s.id()).unwrap();
    assert_eq!(session.facing_mode(), FacingMode::Environment);

    session.switch_camera().await.unwrap();

    assert_eq!(session.facing_mode(), FacingMode::User);
    let new = session.with_stream(|s| s.id()).unwrap();
    assert_ne!(old, new);
    assert_eq!(ledger.streams_opened(), 2);
    assert_eq!(ledger.live_streams(), 1);
    assert_eq!(ledger.live_tracks(), 2);
}

#[tokio::test]
async fn test_unsupported_permission_probe() {
    let platform = MockPlatform::unsupported();
    let ledger = platform.ledger();
    let session = CameraSession::new(platform, SessionConfig::default());

    assert_eq!(session.request_permission().await, Ok(false));
    assert_eq!(ledger.acquire_calls(), 0);
    assert_eq!(session.has_permission(), PermissionState::Unknown);
}

#[tokio::test]
async fn test_config_file_drives_requests() {
    let config = FileConfig::from_toml(
        r#"
        [session]
        ideal_width = 1920
        ideal_height = 1080
        default_facing = "user"
        "#,
    )
    .unwrap();
    let platform = MockPlatform::new();
    let ledger = platform.ledger();
    let session = CameraSession::new(platform, config.session);

    session.start_camera().await.unwrap();

    let request = ledger.last_request().unwrap();
    assert_eq!(request.facing_mode, FacingMode::User);
    assert_eq!((request.ideal_width, request.ideal_height), (1920, 1080));
    let info = session.state().stream.unwrap();
    assert_eq!((info.width, info.height), (1920, 1080));
}

#[tokio::test(start_paused = true)]
async fn test_teardown_while_loading_releases_everything() {
    let platform = MockPlatform::new().with_tracks(2);
    let ledger = platform.ledger();
    let session = Rc::new(CameraSession::new(platform, SessionConfig::default()));

    session.start_camera().await.unwrap();
    assert_eq!(ledger.live_tracks(), 2);

    session.platform().set_fallback(MockBehavior::Hang);
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let owner = Rc::clone(&session);
            let task = tokio::task::spawn_local(async move {
                let _ = owner.start_camera().await;
            });

            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(session.is_loading());
            // A restart releases the held stream before acquiring again
            assert_eq!(ledger.live_tracks(), 0);

            task.abort();
            let _ = task.await;
        })
        .await;

    assert!(!session.is_loading());
    assert!(session.state().is_consistent());

    let session = Rc::try_unwrap(session).ok().unwrap();
    session.dispose();
    assert_eq!(ledger.live_tracks(), 0);
    assert_eq!(ledger.live_streams(), 0);
}

#[tokio::test]
async fn test_drop_releases_held_stream() {
    let platform = MockPlatform::new().with_tracks(3);
    let ledger = platform.ledger();

    {
        let session = CameraSession::new(platform, SessionConfig::default());
        session.start_camera().await.unwrap();
        assert_eq!(ledger.live_tracks(), 3);
    }

    assert_eq!(ledger.live_tracks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_then_recovery() {
    let platform = MockPlatform::new();
    platform.push(MockBehavior::Hang);
    let config = SessionConfig::default().with_timeout(Duration::from_secs(2));
    let session = CameraSession::new(platform, config);

    let err = session.start_camera().await.unwrap_err();
    assert_eq!(
        err.camera_error().map(|e| e.kind()),
        Some(ErrorKind::Timeout)
    );
    assert!(!session.is_loading());

    session.start_camera().await.unwrap();
    assert_eq!(session.error(), None);
    assert_eq!(session.has_permission(), PermissionState::Granted);
}
