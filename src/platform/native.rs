//! Hardware platform backed by `nokhwa`.
//!
//! `nokhwa` has no notion of facing mode, so devices are chosen by name
//! using the keyword lists in [`DeviceConfig`]. Facing mode is an ideal
//! constraint: when nothing matches, the first device is used.
//!
//! Camera handles are thread-affine on several backends, so acquisition
//! runs inline on the calling task.

use super::{MediaPlatform, PlatformError};
use crate::capture::{
    DeviceConfig, FacingMode, MediaStream, MediaTrack, StreamSettings, TrackState,
    VideoConstraints,
};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::{Camera, NokhwaError};

/// Native error text fragments, checked in order. First match wins.
const ERROR_RULES: &[(&[&str], NativeErrorClass)] = &[
    (
        &["permission", "not authorized", "denied", "eacces", "not permitted"],
        NativeErrorClass::Denied,
    ),
    (
        &["busy", "in use", "ebusy", "already open", "resource temporarily"],
        NativeErrorClass::InUse,
    ),
    (
        &["no such device", "not found", "enoent", "no device", "no camera"],
        NativeErrorClass::NoDevice,
    ),
    (
        &["format", "resolution", "fourcc"],
        NativeErrorClass::Constraints,
    ),
];

#[derive(Debug, Clone, Copy)]
enum NativeErrorClass {
    Denied,
    InUse,
    NoDevice,
    Constraints,
}

fn map_native_error(err: &NokhwaError) -> PlatformError {
    let message = err.to_string();
    let lowered = message.to_ascii_lowercase();
    let class = ERROR_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, class)| *class);

    match class {
        Some(NativeErrorClass::Denied) => PlatformError::Denied(message),
        Some(NativeErrorClass::InUse) => PlatformError::DeviceInUse(message),
        Some(NativeErrorClass::NoDevice) => PlatformError::NoDevice(message),
        Some(NativeErrorClass::Constraints) => PlatformError::ConstraintsUnsatisfiable(message),
        None => PlatformError::Other(message),
    }
}

/// Picks the device index for a facing mode from device names.
fn pick_device(names: &[String], facing: FacingMode, hints: &DeviceConfig) -> Option<usize> {
    if names.is_empty() {
        return None;
    }
    let keywords = match facing {
        FacingMode::User => &hints.user_keywords,
        FacingMode::Environment => &hints.environment_keywords,
    };
    names
        .iter()
        .position(|name| {
            let name = name.to_ascii_lowercase();
            keywords.iter().any(|k| name.contains(k.as_str()))
        })
        .or(Some(0))
}

struct NativeTrack {
    camera: Camera,
    label: String,
    live: bool,
}

impl MediaTrack for NativeTrack {
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
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!(device = %self.label, error = %e, "Failed to stop camera stream");
        }
    }
}

/// Platform that opens real cameras through the OS native backend.
///
/// nokhwa enumerates and opens devices synchronously, so
/// `acquire_video_stream` never suspends. It holds the executor thread until
/// the device answers, and a session's acquire timeout never fires for it:
/// the whole open completes within one poll. Cameras are
/// bound to the thread that opened them, so the open cannot move to
/// `spawn_blocking` either.
pub struct NativePlatform {
    backend: Option<ApiBackend>,
    hints: DeviceConfig,
}

impl NativePlatform {
    /// Creates a platform using the OS native backend, if there is one.
    pub fn new(hints: DeviceConfig) -> Self {
        let backend = nokhwa::native_api_backend();
        tracing::debug!(?backend, "Native capture backend");
        Self { backend, hints }
    }

    /// Lists the human-readable names of attached cameras.
    pub fn list_devices(&self) -> Result<Vec<String>, PlatformError> {
        Ok(self
            .query()?
            .iter()
            .map(|info| info.human_name())
            .collect())
    }

    fn query(&self) -> Result<Vec<CameraInfo>, PlatformError> {
        let backend = self
            .backend
            .ok_or_else(|| PlatformError::Other("no native capture backend".into()))?;
        nokhwa::query(backend).map_err(|e| map_native_error(&e))
    }
}

impl MediaPlatform for NativePlatform {
    fn has_media_capture_capability(&self) -> bool {
        self.backend.is_some()
    }

    async fn acquire_video_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<MediaStream, PlatformError> {
        let devices = self.query()?;
        let names: Vec<String> = devices.iter().map(|d| d.human_name()).collect();
        let chosen = pick_device(&names, constraints.facing_mode, &self.hints)
            .ok_or_else(|| PlatformError::NoDevice("no cameras enumerated".into()))?;
        let info = &devices[chosen];

        let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(constraints.ideal_width, constraints.ideal_height),
                FrameFormat::MJPEG,
                self.hints.frame_rate,
            ),
        ));

        let mut camera =
            Camera::new(info.index().clone(), format).map_err(|e| map_native_error(&e))?;
        camera.open_stream().map_err(|e| map_native_error(&e))?;

        let resolution = camera.resolution();
        let label = info.human_name();
        tracing::info!(
            device = %label,
            width = resolution.width(),
            height = resolution.height(),
            "Native camera stream opened"
        );

        let settings = StreamSettings {
            facing_mode: constraints.facing_mode,
            width: resolution.width(),
            height: resolution.height(),
        };
        let track = NativeTrack {
            camera,
            label,
            live: true,
        };
        Ok(MediaStream::new(settings, vec![Box::new(track)]))
    }
}
