//! Stream handle and track types.
//!
//! A [`MediaStream`] owns the tracks a platform hands back from an
//! acquisition. Tracks can only be stopped by the crate (through the
//! session) or by dropping the stream, so no outside component can release
//! the device behind the session's back.

use super::FacingMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an acquired stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(u64);

impl StreamId {
    fn next() -> Self {
        StreamId(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        StreamId(raw)
    }

    /// Returns the raw numeric id.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Media channel type. Only video is ever requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Video channel.
    Video,
}

/// Whether a track still holds its device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    /// Producing media; the device is held.
    Live,
    /// Stopped; the device has been released.
    Ended,
}

/// A single media channel within a stream.
///
/// Implemented by platforms. `stop` must release the underlying device and
/// be idempotent.
pub trait MediaTrack {
    /// Human-readable label, usually the device name.
    fn label(&self) -> &str;

    /// Channel type.
    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    /// Current ready state.
    fn ready_state(&self) -> TrackState;

    /// Stops the track and releases its device.
    fn stop(&mut self);
}

/// What the platform actually delivered for an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Camera that was opened.
    pub facing_mode: FacingMode,
    /// Delivered frame width.
    pub width: u32,
    /// Delivered frame height.
    pub height: u32,
}

/// Handle to a live hardware video capture session.
///
/// Dropping the handle stops every live track.
pub struct MediaStream {
    id: StreamId,
    settings: StreamSettings,
    tracks: Vec<Box<dyn MediaTrack>>,
    acquired_at: DateTime<Utc>,
}

impl MediaStream {
    /// Wraps platform tracks into a new stream handle.
    pub fn new(settings: StreamSettings, tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self {
            id: StreamId::next(),
            settings,
            tracks,
            acquired_at: Utc::now(),
        }
    }

    /// Returns the stream id.
    #[inline]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Returns the delivered settings.
    #[inline]
    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Returns when the platform handed the stream over.
    #[inline]
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Iterates the stream's tracks read-only.
    pub fn tracks(&self) -> impl Iterator<Item = &dyn MediaTrack> + '_ {
        self.tracks.iter().map(|t| t.as_ref())
    }

    /// Number of tracks still holding their device.
    pub fn live_track_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.ready_state() == TrackState::Live)
            .count()
    }

    /// Returns true while at least one track is live.
    pub fn is_active(&self) -> bool {
        self.live_track_count() > 0
    }

    /// Stops every live track. Returns how many were stopped.
    pub(crate) fn stop(&mut self) -> usize {
        let mut stopped = 0;
        for track in self.tracks.iter_mut() {
            if track.ready_state() == TrackState::Live {
                track.stop();
                stopped += 1;
            }
        }
        if stopped > 0 {
            tracing::debug!(stream_id = %self.id, tracks = stopped, "Stream tracks stopped");
        }
        stopped
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("tracks", &self.tracks.len())
            .field("live", &self.live_track_count())
            .finish()
    }
}
