//! Camera session manager.
//!
//! A [`CameraSession`] owns at most one [`MediaStream`] and publishes its
//! state after every change. All operations take `&self` and run on one
//! thread; no `RefCell` borrow is held across an `.await`, so a UI can read
//! state while an acquisition is suspended on a permission prompt.
//!
//! Only one platform request (acquisition or permission probe) may be
//! pending at a time. Overlapping requests are rejected with
//! [`SessionError::InFlight`] rather than queued.

use super::{CameraError, ErrorKind, PermissionState, SessionError, SessionState, StreamInfo};
use crate::capture::{FacingMode, MediaStream, SessionConfig, VideoConstraints};
use crate::platform::MediaPlatform;
use scopeguard::ScopeGuard;
use std::cell::RefCell;
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Running counters for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Acquisitions handed to the platform (including switches).
    pub acquisitions: u64,
    /// Acquisitions that produced a stream.
    pub acquisitions_succeeded: u64,
    /// Failed attempts, by kind. Includes unsupported starts.
    pub failures: HashMap<ErrorKind, u64>,
    /// Streams released by stop, switch, restart or teardown.
    pub releases: u64,
    /// Switches that released a stream and re-acquired.
    pub switches: u64,
    /// Throwaway permission acquisitions.
    pub permission_probes: u64,
    /// Requests rejected because another was in flight.
    pub rejected: u64,
}

impl SessionStats {
    /// Returns the failure count for one kind.
    pub fn failures_of(&self, kind: ErrorKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Returns the total number of failures.
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }

    fn record_failure(&mut self, kind: ErrorKind) {
        *self.failures.entry(kind).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Acquire,
    Probe,
}

struct Inner {
    stream: Option<MediaStream>,
    pending: Option<Pending>,
    error: Option<CameraError>,
    permission: PermissionState,
    facing_mode: FacingMode,
    stats: SessionStats,
}

/// Owner of one camera stream and its lifecycle state.
///
/// Dropping the session (or calling [`dispose`](Self::dispose)) stops every
/// track of the held stream.
pub struct CameraSession<P: MediaPlatform> {
    platform: P,
    config: SessionConfig,
    supported: bool,
    inner: RefCell<Inner>,
    state_tx: watch::Sender<SessionState>,
}

impl<P: MediaPlatform> CameraSession<P> {
    /// Creates a session, probing platform capability once.
    ///
    /// Values [`SessionConfig::validate`] rejects are replaced as described
    /// in [`SessionConfig::sanitized`], with a warning.
    pub fn new(platform: P, config: SessionConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "Invalid session config, replacing rejected values");
                config.sanitized()
            }
        };
        let supported = platform.has_media_capture_capability();
        let facing_mode = config.default_facing;
        info!(supported, facing = %facing_mode, "Camera session created");

        let (state_tx, _) = watch::channel(SessionState::initial(supported, facing_mode));
        Self {
            platform,
            config,
            supported,
            inner: RefCell::new(Inner {
                stream: None,
                pending: None,
                error: None,
                permission: PermissionState::Unknown,
                facing_mode,
                stats: SessionStats::default(),
            }),
            state_tx,
        }
    }

    /// Returns whether the platform can capture video.
    ///
    /// Cached at creation; never changes for the session's lifetime.
    #[inline]
    pub fn probe_support(&self) -> bool {
        self.supported
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the platform the session acquires from.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.snapshot(&self.inner.borrow())
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Returns the running counters.
    pub fn stats(&self) -> SessionStats {
        self.inner.borrow().stats.clone()
    }

    /// Returns true while an acquisition is in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.borrow().pending == Some(Pending::Acquire)
    }

    /// Returns the facing mode the next acquisition asks for.
    pub fn facing_mode(&self) -> FacingMode {
        self.inner.borrow().facing_mode
    }

    /// Returns the permission tri-state.
    pub fn has_permission(&self) -> PermissionState {
        self.inner.borrow().permission
    }

    /// Returns the last classified failure.
    pub fn error(&self) -> Option<CameraError> {
        self.inner.borrow().error.clone()
    }

    /// Runs `f` against the held stream, if any.
    ///
    /// The stream stays owned by the session. Use [`state`](Self::state)
    /// for a copy of the stream summary instead.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls a session method that changes state
    /// (`start_camera`, `stop_camera`, `switch_camera`, `request_permission`).
    pub fn with_stream<R>(&self, f: impl FnOnce(&MediaStream) -> R) -> Option<R> {
        self.inner.borrow().stream.as_ref().map(f)
    }

    /// Acquires a stream with the current facing mode.
    ///
    /// A held stream is released first. Failures are published in the
    /// session state and also returned.
    pub async fn start_camera(&self) -> Result<(), SessionError> {
        if !self.supported {
            {
                let mut inner = self.inner.borrow_mut();
                inner.error = Some(CameraError::Unsupported);
                inner.stats.record_failure(ErrorKind::Unsupported);
            }
            warn!("Camera start requested on a platform without capture support");
            self.publish();
            return Err(CameraError::Unsupported.into());
        }

        {
            let mut inner = self.inner.borrow_mut();
            if inner.pending.is_some() {
                inner.stats.rejected += 1;
                debug!(pending = ?inner.pending, "Camera start rejected: request in flight");
                return Err(SessionError::InFlight);
            }
            Self::release(&mut inner);
        }

        self.acquire().await
    }

    /// Releases the held stream. No-op without one.
    ///
    /// Does not cancel an acquisition that is still in flight.
    pub fn stop_camera(&self) {
        let released = Self::release(&mut self.inner.borrow_mut());
        if released {
            self.publish();
        }
    }

    /// Resolves the permission tri-state without keeping a stream.
    ///
    /// Returns `Ok(true)` iff access was granted. The throwaway stream is
    /// stopped before this returns. Leaves the stream, loading flag and
    /// error untouched.
    pub async fn request_permission(&self) -> Result<bool, SessionError> {
        if !self.supported {
            debug!("Permission probe skipped: capture unsupported");
            return Ok(false);
        }

        let constraints = {
            let mut inner = self.inner.borrow_mut();
            if inner.pending.is_some() {
                inner.stats.rejected += 1;
                debug!(pending = ?inner.pending, "Permission probe rejected: request in flight");
                return Err(SessionError::InFlight);
            }
            if inner.stream.is_some() {
                return Ok(true);
            }
            inner.pending = Some(Pending::Probe);
            inner.stats.permission_probes += 1;
            self.config.constraints(inner.facing_mode)
        };

        let guard = scopeguard::guard((), |()| self.abandon(Pending::Probe));
        let result = self.request(&constraints).await;
        ScopeGuard::into_inner(guard);

        let granted = {
            let mut inner = self.inner.borrow_mut();
            inner.pending = None;
            match result {
                Ok(mut stream) => {
                    stream.stop();
                    inner.permission = PermissionState::Granted;
                    true
                }
                Err(error) => {
                    if error.denies_permission() {
                        inner.permission = PermissionState::Denied;
                    }
                    debug!(kind = %error.kind(), "Permission probe failed");
                    false
                }
            }
        };
        info!(granted, "Camera permission probed");
        self.publish();
        Ok(granted)
    }

    /// Releases the stream, flips the facing mode and re-acquires.
    ///
    /// No-op without a held stream. A failed re-acquisition keeps the new
    /// facing mode and publishes the error.
    pub async fn switch_camera(&self) -> Result<(), SessionError> {
        let previous = {
            let mut inner = self.inner.borrow_mut();
            if inner.stream.is_none() {
                debug!("Camera switch ignored: no active stream");
                return Ok(());
            }
            Self::release(&mut inner);
            let previous = inner.facing_mode;
            inner.facing_mode = previous.toggled();
            inner.stats.switches += 1;
            previous
        };
        info!(from = %previous, to = %previous.toggled(), "Switching camera");

        self.acquire().await
    }

    /// Ends the session, releasing the held stream.
    pub fn dispose(self) {
        debug!("Camera session disposed");
    }

    async fn acquire(&self) -> Result<(), SessionError> {
        let constraints = {
            let mut inner = self.inner.borrow_mut();
            inner.pending = Some(Pending::Acquire);
            inner.error = None;
            inner.stats.acquisitions += 1;
            self.config.constraints(inner.facing_mode)
        };
        self.publish();
        info!(
            facing = %constraints.facing_mode,
            width = constraints.ideal_width,
            height = constraints.ideal_height,
            "Requesting camera stream"
        );

        let guard = scopeguard::guard((), |()| self.abandon(Pending::Acquire));
        let result = self.request(&constraints).await;
        ScopeGuard::into_inner(guard);

        let outcome = {
            let mut inner = self.inner.borrow_mut();
            inner.pending = None;
            match result {
                Ok(stream) => {
                    info!(
                        stream_id = %stream.id(),
                        facing = %stream.settings().facing_mode,
                        width = stream.settings().width,
                        height = stream.settings().height,
                        "Camera stream acquired"
                    );
                    Self::release(&mut inner);
                    inner.stream = Some(stream);
                    inner.permission = PermissionState::Granted;
                    inner.error = None;
                    inner.stats.acquisitions_succeeded += 1;
                    Ok(())
                }
                Err(error) => {
                    warn!(kind = %error.kind(), error = %error, "Camera acquisition failed");
                    if error.denies_permission() {
                        inner.permission = PermissionState::Denied;
                    }
                    inner.stats.record_failure(error.kind());
                    inner.error = Some(error.clone());
                    Err(SessionError::Camera(error))
                }
            }
        };
        self.publish();
        outcome
    }

    async fn request(&self, constraints: &VideoConstraints) -> Result<MediaStream, CameraError> {
        let acquisition = self.platform.acquire_video_stream(constraints);
        match self.config.acquire_timeout() {
            Some(limit) => match tokio::time::timeout(limit, acquisition).await {
                Ok(result) => result.map_err(CameraError::from),
                Err(_) => Err(CameraError::Timeout(limit)),
            },
            None => acquisition.await.map_err(CameraError::from),
        }
    }

    /// Clears a pending slot whose future was dropped before resolving.
    fn abandon(&self, kind: Pending) {
        let cleared = {
            let mut inner = self.inner.borrow_mut();
            if inner.pending == Some(kind) {
                inner.pending = None;
                true
            } else {
                false
            }
        };
        if cleared {
            warn!(pending = ?kind, "Camera request dropped before it resolved");
            self.publish();
        }
    }

    fn release(inner: &mut Inner) -> bool {
        match inner.stream.take() {
            Some(mut stream) => {
                let tracks = stream.stop();
                inner.stats.releases += 1;
                info!(stream_id = %stream.id(), tracks, "Camera stream released");
                true
            }
            None => false,
        }
    }

    fn snapshot(&self, inner: &Inner) -> SessionState {
        SessionState {
            is_supported: self.supported,
            is_loading: inner.pending == Some(Pending::Acquire),
            has_permission: inner.permission,
            facing_mode: inner.facing_mode,
            error: inner.error.clone(),
            stream: inner.stream.as_ref().map(StreamInfo::from),
        }
    }

    fn publish(&self) {
        let state = self.state();
        debug_assert!(state.is_consistent(), "inconsistent session state: {state:?}");
        tracing::trace!(
            loading = state.is_loading,
            streaming = state.is_streaming(),
            permission = ?state.has_permission,
            "Session state published"
        );
        self.state_tx.send_replace(state);
    }
}

impl<P: MediaPlatform> Drop for CameraSession<P> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        inner.pending = None;
        if Self::release(inner) {
            info!("Camera stream released on session teardown");
            self.publish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MockBehavior, MockPlatform};
    use std::time::Duration;

    fn session(platform: &MockPlatform) -> CameraSession<&MockPlatform> {
        CameraSession::new(platform, SessionConfig::default())
    }

    #[tokio::test]
    async fn test_start_granted() {
        let platform = MockPlatform::new();
        let session = session(&platform);

        session.start_camera().await.unwrap();

        let state = session.state();
        assert!(state.stream.is_some());
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        assert_eq!(state.has_permission, PermissionState::Granted);
        assert_eq!(platform.ledger().live_streams(), 1);

        let request = platform.ledger().last_request().unwrap();
        assert_eq!(request.facing_mode, FacingMode::Environment);
        assert_eq!((request.ideal_width, request.ideal_height), (1280, 720));
    }

    #[tokio::test]
    async fn test_start_denied() {
        let platform = MockPlatform::new().with_fallback(MockBehavior::Deny);
        let session = session(&platform);

        let err = session.start_camera().await.unwrap_err();
        assert_eq!(
            err.camera_error().map(CameraError::kind),
            Some(ErrorKind::PermissionDenied)
        );

        let state = session.state();
        assert!(state.stream.is_none());
        assert!(!state.is_loading);
        assert_eq!(state.error.map(|e| e.kind()), Some(ErrorKind::PermissionDenied));
        assert_eq!(state.has_permission, PermissionState::Denied);
    }

    #[tokio::test]
    async fn test_device_errors_leave_permission_alone() {
        let platform = MockPlatform::new();
        platform.push(MockBehavior::NoDevice);
        platform.push(MockBehavior::Busy);
        let session = session(&platform);

        assert!(session.start_camera().await.is_err());
        assert_eq!(session.has_permission(), PermissionState::Unknown);
        assert_eq!(
            session.error().map(|e| e.kind()),
            Some(ErrorKind::DeviceNotFound)
        );

        assert!(session.start_camera().await.is_err());
        assert_eq!(session.has_permission(), PermissionState::Unknown);
        assert_eq!(session.error().map(|e| e.kind()), Some(ErrorKind::DeviceBusy));

        session.start_camera().await.unwrap();
        assert_eq!(session.error(), None);
        assert_eq!(session.has_permission(), PermissionState::Granted);
    }

    #[tokio::test]
    async fn test_unknown_failure_denies_permission() {
        let platform = MockPlatform::new().with_fallback(MockBehavior::Overconstrained);
        let session = session(&platform);

        assert!(session.start_camera().await.is_err());
        assert_eq!(session.has_permission(), PermissionState::Denied);
        assert_eq!(
            session.error().map(|e| e.kind()),
            Some(ErrorKind::UnknownFailure)
        );
    }

    #[tokio::test]
    async fn test_unsupported_never_calls_platform() {
        let platform = MockPlatform::unsupported();
        let session = session(&platform);

        assert!(!session.probe_support());
        let err = session.start_camera().await.unwrap_err();
        assert_eq!(err, SessionError::Camera(CameraError::Unsupported));
        assert_eq!(session.error(), Some(CameraError::Unsupported));
        assert_eq!(session.has_permission(), PermissionState::Unknown);
        assert!(!session.is_loading());

        assert_eq!(session.request_permission().await, Ok(false));
        assert_eq!(platform.ledger().acquire_calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_start_releases_previous_stream() {
        let platform = MockPlatform::new().with_tracks(2);
        let session = session(&platform);
        let ledger = platform.ledger();

        session.start_camera().await.unwrap();
        let first = session.with_stream(|s| s.id()).unwrap();
        session.start_camera().await.unwrap();
        let second = session.with_stream(|s| s.id()).unwrap();

        assert_ne!(first, second);
        assert_eq!(ledger.streams_opened(), 2);
        assert_eq!(ledger.live_streams(), 1);
        assert_eq!(ledger.live_tracks(), 2);
        assert_eq!(ledger.peak_live_streams(), 1);
        assert_eq!(session.stats().releases, 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let platform = MockPlatform::new();
        let session = session(&platform);

        session.start_camera().await.unwrap();
        session.stop_camera();
        let once = session.state();
        session.stop_camera();
        let twice = session.state();

        assert_eq!(once, twice);
        assert!(once.stream.is_none());
        assert_eq!(platform.ledger().live_tracks(), 0);
        assert_eq!(session.stats().releases, 1);
    }

    #[tokio::test]
    async fn test_switch_without_stream_is_noop() {
        let platform = MockPlatform::new();
        let session = session(&platform);
        let before = session.state();

        session.switch_camera().await.unwrap();

        assert_eq!(session.state(), before);
        assert_eq!(platform.ledger().acquire_calls(), 0);
    }

    #[tokio::test]
    async fn test_switch_toggles_facing_mode() {
        let platform = MockPlatform::new();
        let session = session(&platform);
        let ledger = platform.ledger();

        session.start_camera().await.unwrap();
        let old = session.with_stream(|s| s.id()).unwrap();

        session.switch_camera().await.unwrap();

        let state = session.state();
        assert_eq!(state.facing_mode, FacingMode::User);
        let info = state.stream.unwrap();
        assert_ne!(info.id, old);
        assert_eq!(info.facing_mode, FacingMode::User);
        assert_eq!(ledger.live_streams(), 1);
        assert_eq!(ledger.peak_live_streams(), 1);
        assert_eq!(
            ledger.last_request().map(|c| c.facing_mode),
            Some(FacingMode::User)
        );
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_new_facing_mode() {
        let platform = MockPlatform::new();
        let session = session(&platform);

        session.start_camera().await.unwrap();
        platform.push(MockBehavior::NoDevice);

        assert!(session.switch_camera().await.is_err());

        let state = session.state();
        assert_eq!(state.facing_mode, FacingMode::User);
        assert!(state.stream.is_none());
        assert_eq!(state.error.map(|e| e.kind()), Some(ErrorKind::DeviceNotFound));
        assert_eq!(platform.ledger().live_streams(), 0);
    }

    #[tokio::test]
    async fn test_request_permission_releases_probe_stream() {
        let platform = MockPlatform::new().with_tracks(3);
        let session = session(&platform);
        let ledger = platform.ledger();

        assert_eq!(session.request_permission().await, Ok(true));

        let state = session.state();
        assert_eq!(state.has_permission, PermissionState::Granted);
        assert!(state.stream.is_none());
        assert!(!state.is_loading);
        assert_eq!(ledger.streams_opened(), 1);
        assert_eq!(ledger.live_tracks(), 0);
    }

    #[tokio::test]
    async fn test_request_permission_denied_keeps_error_field() {
        let platform = MockPlatform::new();
        platform.push(MockBehavior::Busy);
        platform.push(MockBehavior::Deny);
        let session = session(&platform);

        assert!(session.start_camera().await.is_err());
        assert_eq!(session.request_permission().await, Ok(false));

        assert_eq!(session.has_permission(), PermissionState::Denied);
        assert_eq!(session.error().map(|e| e.kind()), Some(ErrorKind::DeviceBusy));
    }

    #[tokio::test]
    async fn test_request_permission_with_stream_skips_platform() {
        let platform = MockPlatform::new();
        let session = session(&platform);

        session.start_camera().await.unwrap();
        assert_eq!(session.request_permission().await, Ok(true));
        assert_eq!(platform.ledger().acquire_calls(), 1);
        assert!(session.state().stream.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_start_is_rejected() {
        let platform = MockPlatform::new().with_latency(Duration::from_millis(100));
        let session = session(&platform);

        let (first, second) = tokio::join!(session.start_camera(), session.start_camera());

        assert_eq!(first, Ok(()));
        assert_eq!(second, Err(SessionError::InFlight));
        assert_eq!(platform.ledger().acquire_calls(), 1);
        assert_eq!(platform.ledger().peak_live_streams(), 1);
        assert_eq!(session.stats().rejected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_and_start_do_not_overlap() {
        let platform = MockPlatform::new().with_latency(Duration::from_millis(100));
        let session = session(&platform);

        let (probe, start) = tokio::join!(session.request_permission(), session.start_camera());

        assert_eq!(probe, Ok(true));
        assert_eq!(start, Err(SessionError::InFlight));
        assert!(session.state().stream.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_is_published_while_in_flight() {
        let platform = MockPlatform::new().with_latency(Duration::from_millis(100));
        let session = session(&platform);
        let mut rx = session.subscribe();

        let (result, saw_loading) = tokio::join!(session.start_camera(), async {
            rx.wait_for(|s| s.is_loading)
                .await
                .map(|s| s.stream.is_none())
                .unwrap_or(false)
        });

        assert_eq!(result, Ok(()));
        assert!(saw_loading);
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_settles_state() {
        let platform = MockPlatform::new().with_fallback(MockBehavior::Hang);
        let config = SessionConfig::default().with_timeout(Duration::from_millis(250));
        let session = CameraSession::new(&platform, config);

        let err = session.start_camera().await.unwrap_err();

        assert_eq!(
            err,
            SessionError::Camera(CameraError::Timeout(Duration::from_millis(250)))
        );
        let state = session.state();
        assert!(!state.is_loading);
        assert!(state.stream.is_none());
        assert_eq!(state.has_permission, PermissionState::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_request_during_start_is_rejected() {
        let platform = MockPlatform::new().with_latency(Duration::from_millis(100));
        let session = session(&platform);

        let (start, probe) = tokio::join!(session.start_camera(), session.request_permission());

        assert_eq!(start, Ok(()));
        assert_eq!(probe, Err(SessionError::InFlight));
        assert_eq!(platform.ledger().acquire_calls(), 1);
        assert_eq!(platform.ledger().live_streams(), 1);
        let stats = session.stats();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.permission_probes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_request_timeout_leaves_permission_unknown() {
        let platform = MockPlatform::new().with_fallback(MockBehavior::Hang);
        let config = SessionConfig::default().with_timeout(Duration::from_millis(250));
        let session = CameraSession::new(&platform, config);

        assert_eq!(session.request_permission().await, Ok(false));

        let state = session.state();
        assert_eq!(state.has_permission, PermissionState::Unknown);
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        assert_eq!(platform.ledger().live_streams(), 0);

        platform.set_fallback(MockBehavior::Grant);
        assert_eq!(session.request_permission().await, Ok(true));
    }

    #[tokio::test]
    async fn test_sub_millisecond_timeout_still_acquires() {
        let platform = MockPlatform::new();
        let config = SessionConfig::default().with_timeout(Duration::from_micros(500));
        let session = CameraSession::new(&platform, config);

        assert_eq!(session.config().acquire_timeout(), Some(Duration::from_millis(1)));
        assert_eq!(session.start_camera().await, Ok(()));
    }

    #[tokio::test]
    async fn test_invalid_config_is_sanitized() {
        let platform = MockPlatform::new();
        let config = SessionConfig {
            ideal_height: 0,
            acquire_timeout_ms: Some(0),
            ..SessionConfig::default()
        };
        let session = CameraSession::new(&platform, config);

        assert!(session.config().validate().is_ok());
        assert_eq!(session.start_camera().await, Ok(()));
        let request = platform.ledger().last_request().unwrap();
        assert_eq!((request.ideal_width, request.ideal_height), (1280, 720));
    }

    #[tokio::test]
    #[should_panic]
    async fn test_with_stream_panics_on_reentrant_stop() {
        let platform = MockPlatform::new();
        let session = session(&platform);
        session.start_camera().await.unwrap();

        session.with_stream(|_| session.stop_camera());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_acquisition_clears_loading() {
        let platform = MockPlatform::new().with_fallback(MockBehavior::Hang);
        let session = session(&platform);

        tokio::select! {
            _ = session.start_camera() => panic!("hanging acquisition resolved"),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }

        assert!(!session.is_loading());
        assert!(session.state().is_consistent());

        platform.set_fallback(MockBehavior::Grant);
        session.start_camera().await.unwrap();
        assert!(session.state().stream.is_some());
    }

    #[tokio::test]
    async fn test_teardown_releases_stream() {
        let platform = MockPlatform::new().with_tracks(2);
        let ledger = platform.ledger();

        let session = CameraSession::new(&platform, SessionConfig::default());
        let mut rx = session.subscribe();
        session.start_camera().await.unwrap();
        assert_eq!(ledger.live_tracks(), 2);

        session.dispose();

        assert_eq!(ledger.live_tracks(), 0);
        assert_eq!(ledger.live_streams(), 0);
        assert!(rx.borrow_and_update().stream.is_none());
    }

    #[tokio::test]
    async fn test_stats_track_outcomes() {
        let platform = MockPlatform::new();
        platform.push(MockBehavior::Deny);
        let session = session(&platform);

        let _ = session.start_camera().await;
        session.start_camera().await.unwrap();
        session.switch_camera().await.unwrap();
        session.stop_camera();

        let stats = session.stats();
        assert_eq!(stats.acquisitions, 3);
        assert_eq!(stats.acquisitions_succeeded, 2);
        assert_eq!(stats.failures_of(ErrorKind::PermissionDenied), 1);
        assert_eq!(stats.total_failures(), 1);
        assert_eq!(stats.switches, 1);
        assert_eq!(stats.releases, 2);
    }
}
