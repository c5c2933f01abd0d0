//! Platform media-capture boundary.
//!
//! A [`MediaPlatform`] answers whether video capture exists at all and
//! hands out [`MediaStream`]s. The session never talks to hardware any
//! other way, which lets tests swap in [`MockPlatform`].

mod mock;
#[cfg(feature = "camera")]
mod native;

pub use mock::{MockBehavior, MockLedger, MockPlatform};
#[cfg(feature = "camera")]
pub use native::NativePlatform;

use crate::capture::{MediaStream, VideoConstraints};
use thiserror::Error;

/// Failures reported by a platform acquisition.
///
/// Platforms map their native errors onto these kinds; the session then
/// classifies them into [`CameraError`](crate::session::CameraError).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The user refused access.
    #[error("access denied by user: {0}")]
    Denied(String),
    /// Access is blocked by the environment or a policy.
    #[error("access blocked by policy: {0}")]
    SecurityPolicy(String),
    /// No camera matches the request.
    #[error("no capture device: {0}")]
    NoDevice(String),
    /// The camera exists but could not be opened or read.
    #[error("device in use or unreadable: {0}")]
    DeviceInUse(String),
    /// No camera can satisfy the requested constraints.
    #[error("constraints cannot be satisfied: {0}")]
    ConstraintsUnsatisfiable(String),
    /// The request was aborted before it finished.
    #[error("acquisition aborted: {0}")]
    Aborted(String),
    /// Any failure the platform could not classify.
    #[error("platform failure: {0}")]
    Other(String),
}

/// Platform media-capture API.
///
/// Futures returned by `acquire_video_stream` may be dropped before they
/// resolve (timeouts, torn-down callers). Implementations must release any
/// device they opened when that happens; returning resources only through
/// a [`MediaStream`] gets that for free.
#[allow(async_fn_in_trait)]
pub trait MediaPlatform {
    /// Returns true if the platform can capture video at all.
    fn has_media_capture_capability(&self) -> bool;

    /// Requests a video-only stream matching `constraints`.
    ///
    /// May suspend for as long as the user leaves a permission prompt open.
    async fn acquire_video_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<MediaStream, PlatformError>;
}

impl<P: MediaPlatform> MediaPlatform for &P {
    fn has_media_capture_capability(&self) -> bool {
        (**self).has_media_capture_capability()
    }

    async fn acquire_video_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<MediaStream, PlatformError> {
        (**self).acquire_video_stream(constraints).await
    }
}
