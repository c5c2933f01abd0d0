//! Published session state.

use super::CameraError;
use crate::capture::{FacingMode, MediaStream, StreamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the user has authorized camera access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Access was granted by a successful acquisition.
    Granted,
    /// Access was refused, or acquisition failed for an unknown reason.
    Denied,
    /// No acquisition or probe has resolved yet.
    #[default]
    Unknown,
}

/// Read-only summary of the stream a session holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Stream id.
    pub id: StreamId,
    /// Camera that was opened.
    pub facing_mode: FacingMode,
    /// Delivered frame width.
    pub width: u32,
    /// Delivered frame height.
    pub height: u32,
    /// Tracks still holding the device.
    pub live_tracks: usize,
    /// When the stream was acquired.
    pub acquired_at: DateTime<Utc>,
}

impl From<&MediaStream> for StreamInfo {
    fn from(stream: &MediaStream) -> Self {
        let settings = stream.settings();
        Self {
            id: stream.id(),
            facing_mode: settings.facing_mode,
            width: settings.width,
            height: settings.height,
            live_tracks: stream.live_track_count(),
            acquired_at: stream.acquired_at(),
        }
    }
}

/// Snapshot of everything a UI needs to render the camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Capability probed at session creation.
    pub is_supported: bool,
    /// True exactly while an acquisition is in flight.
    pub is_loading: bool,
    /// Permission tri-state.
    pub has_permission: PermissionState,
    /// Camera the next acquisition asks for.
    pub facing_mode: FacingMode,
    /// Last classified failure, cleared when an acquisition starts.
    pub error: Option<CameraError>,
    /// Stream currently held, if any.
    pub stream: Option<StreamInfo>,
}

impl SessionState {
    pub(crate) fn initial(is_supported: bool, facing_mode: FacingMode) -> Self {
        Self {
            is_supported,
            is_loading: false,
            has_permission: PermissionState::Unknown,
            facing_mode,
            error: None,
            stream: None,
        }
    }

    /// Returns true while a stream is held.
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Checks the cross-field invariants of a published state.
    pub fn is_consistent(&self) -> bool {
        let stream_ok = self.stream.is_none()
            || (self.error.is_none() && self.has_permission == PermissionState::Granted);
        let loading_ok = !(self.is_loading && self.stream.is_some());
        let support_ok = self.is_supported || (self.stream.is_none() && !self.is_loading);
        stream_ok && loading_ok && support_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SessionState::initial(true, FacingMode::Environment);
        assert!(!state.is_loading);
        assert!(!state.is_streaming());
        assert_eq!(state.has_permission, PermissionState::Unknown);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_loading_with_stream_is_inconsistent() {
        let mut state = SessionState::initial(true, FacingMode::User);
        state.has_permission = PermissionState::Granted;
        state.stream = Some(StreamInfo {
            id: StreamId::from_raw(7),
            facing_mode: FacingMode::User,
            width: 1280,
            height: 720,
            live_tracks: 1,
            acquired_at: Utc::now(),
        });
        assert!(state.is_consistent());

        state.is_loading = true;
        assert!(!state.is_consistent());
    }

    #[test]
    fn test_state_serializes_to_toml() {
        let mut state = SessionState::initial(false, FacingMode::Environment);
        state.error = Some(CameraError::Unsupported);
        let text = toml::to_string(&state).unwrap();
        assert!(text.contains("is_supported = false"));
        assert!(text.contains("facing_mode = \"environment\""));
        assert!(text.contains("kind = \"unsupported\""));
    }
}
