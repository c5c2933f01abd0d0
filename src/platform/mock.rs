//! Scripted in-memory platform for tests and demos.
//!
//! Every acquisition is recorded in a shared [`MockLedger`], including how
//! many streams are live at once, so callers can check that nothing leaks.

use super::{MediaPlatform, PlatformError};
use crate::capture::{
    FacingMode, MediaStream, MediaTrack, StreamSettings, TrackState, VideoConstraints,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock answers one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Permission granted; a stream is returned.
    Grant,
    /// The user dismissed or refused the prompt.
    Deny,
    /// A policy blocks camera access.
    Block,
    /// No camera is attached.
    NoDevice,
    /// Another application holds the camera.
    Busy,
    /// The requested format is unavailable.
    Overconstrained,
    /// Any other platform failure.
    Fail(String),
    /// Never resolves, like an unanswered permission prompt.
    Hang,
}

/// Shared record of what the mock platform did.
#[derive(Debug, Default)]
pub struct MockLedger {
    acquire_calls: AtomicUsize,
    streams_opened: AtomicUsize,
    live_streams: AtomicUsize,
    live_tracks: AtomicUsize,
    peak_live_streams: AtomicUsize,
    requests: Mutex<Vec<VideoConstraints>>,
}

impl MockLedger {
    /// Number of times `acquire_video_stream` was called.
    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    /// Number of streams handed out.
    pub fn streams_opened(&self) -> usize {
        self.streams_opened.load(Ordering::SeqCst)
    }

    /// Streams that still have at least one live track.
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }

    /// Tracks that have not been stopped.
    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live streams ever observed.
    pub fn peak_live_streams(&self) -> usize {
        self.peak_live_streams.load(Ordering::SeqCst)
    }

    /// Constraints of every acquisition, in call order.
    pub fn requests(&self) -> Vec<VideoConstraints> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Constraints of the most recent acquisition.
    pub fn last_request(&self) -> Option<VideoConstraints> {
        self.requests.lock().ok().and_then(|r| r.last().copied())
    }

    fn record_request(&self, constraints: &VideoConstraints) {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(*constraints);
        }
    }

    fn stream_opened(&self, tracks: usize) {
        self.streams_opened.fetch_add(1, Ordering::SeqCst);
        self.live_tracks.fetch_add(tracks, Ordering::SeqCst);
        let live = self.live_streams.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_live_streams.fetch_max(live, Ordering::SeqCst);
    }
}

/// Mock track; decrements the ledger when stopped.
struct MockTrack {
    label: String,
    live: bool,
    stream_remaining: Arc<AtomicUsize>,
    ledger: Arc<MockLedger>,
}

impl MediaTrack for MockTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn ready_state(&self) -> TrackState {
        if self.live {
            TrackState::Live
        } else {
            TrackState::Ended
        }
    }

    fn stop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        self.ledger.live_tracks.fetch_sub(1, Ordering::SeqCst);
        if self.stream_remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.ledger.live_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Mock platform that answers acquisitions from a script.
///
/// Queued behaviors are consumed first; once the queue is empty every call
/// gets the fallback behavior (`Grant` unless changed).
#[derive(Debug)]
pub struct MockPlatform {
    supported: bool,
    script: RefCell<VecDeque<MockBehavior>>,
    fallback: RefCell<MockBehavior>,
    latency: Option<Duration>,
    tracks_per_stream: usize,
    ledger: Arc<MockLedger>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    /// Creates a supported platform that grants every request.
    pub fn new() -> Self {
        Self {
            supported: true,
            script: RefCell::new(VecDeque::new()),
            fallback: RefCell::new(MockBehavior::Grant),
            latency: None,
            tracks_per_stream: 1,
            ledger: Arc::new(MockLedger::default()),
        }
    }

    /// Creates a platform without capture capability.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Sets the behavior used once the script is exhausted.
    pub fn with_fallback(self, behavior: MockBehavior) -> Self {
        self.set_fallback(behavior);
        self
    }

    /// Delays every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sets how many tracks each granted stream carries.
    pub fn with_tracks(mut self, tracks: usize) -> Self {
        self.tracks_per_stream = tracks.max(1);
        self
    }

    /// Queues a behavior for the next unanswered acquisition.
    pub fn push(&self, behavior: MockBehavior) {
        self.script.borrow_mut().push_back(behavior);
    }

    /// Replaces the fallback behavior.
    pub fn set_fallback(&self, behavior: MockBehavior) {
        *self.fallback.borrow_mut() = behavior;
    }

    /// Lists the cameras the mock pretends to have.
    ///
    /// One per facing mode, or none without capture capability.
    pub fn list_devices(&self) -> Vec<String> {
        if !self.supported {
            return Vec::new();
        }
        [FacingMode::Environment, FacingMode::User]
            .iter()
            .map(|facing| format!("mock {facing} camera"))
            .collect()
    }

    /// Returns the shared ledger.
    pub fn ledger(&self) -> Arc<MockLedger> {
        Arc::clone(&self.ledger)
    }

    fn next_behavior(&self) -> MockBehavior {
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.fallback.borrow().clone())
    }

    fn open_stream(&self, constraints: &VideoConstraints) -> MediaStream {
        let remaining = Arc::new(AtomicUsize::new(self.tracks_per_stream));
        let tracks = (0..self.tracks_per_stream)
            .map(|i| {
                Box::new(MockTrack {
                    label: format!("mock {} camera #{i}", constraints.facing_mode),
                    live: true,
                    stream_remaining: Arc::clone(&remaining),
                    ledger: Arc::clone(&self.ledger),
                }) as Box<dyn MediaTrack>
            })
            .collect();
        self.ledger.stream_opened(self.tracks_per_stream);

        let settings = StreamSettings {
            facing_mode: constraints.facing_mode,
            width: constraints.ideal_width,
            height: constraints.ideal_height,
        };
        MediaStream::new(settings, tracks)
    }
}

impl MediaPlatform for MockPlatform {
    fn has_media_capture_capability(&self) -> bool {
        self.supported
    }

    async fn acquire_video_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<MediaStream, PlatformError> {
        self.ledger.record_request(constraints);
        let behavior = self.next_behavior();
        tracing::trace!(?behavior, facing = %constraints.facing_mode, "Mock acquisition");

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match behavior {
            MockBehavior::Grant => Ok(self.open_stream(constraints)),
            MockBehavior::Deny => Err(PlatformError::Denied("permission dismissed".into())),
            MockBehavior::Block => {
                Err(PlatformError::SecurityPolicy("camera blocked by policy".into()))
            }
            MockBehavior::NoDevice => Err(PlatformError::NoDevice("no camera attached".into())),
            MockBehavior::Busy => {
                Err(PlatformError::DeviceInUse("camera held by another application".into()))
            }
            MockBehavior::Overconstrained => Err(PlatformError::ConstraintsUnsatisfiable(
                format!("{}x{}", constraints.ideal_width, constraints.ideal_height),
            )),
            MockBehavior::Fail(message) => Err(PlatformError::Other(message)),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}
