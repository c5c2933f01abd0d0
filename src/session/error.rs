//! Classified camera errors.

use crate::platform::PlatformError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Closed set of acquisition failures a session can publish.
///
/// The `Display` text is suitable for showing to a user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum CameraError {
    /// The platform has no video capture API.
    #[error("camera capture is not supported on this device")]
    Unsupported,
    /// The user or a policy refused camera access.
    #[error("camera access was denied: {0}")]
    PermissionDenied(String),
    /// No camera is attached.
    #[error("no camera was found: {0}")]
    DeviceNotFound(String),
    /// Another consumer holds the camera or it cannot be read.
    #[error("the camera is in use by another application: {0}")]
    DeviceBusy(String),
    /// The acquisition did not resolve within the configured timeout.
    #[error("the camera did not respond within {}ms", .0.as_millis())]
    Timeout(#[serde(with = "duration_ms")] Duration),
    /// Any other platform failure.
    #[error("the camera could not be started: {0}")]
    UnknownFailure(String),
}

/// Discriminant of [`CameraError`], for metrics and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`CameraError::Unsupported`].
    Unsupported,
    /// See [`CameraError::PermissionDenied`].
    PermissionDenied,
    /// See [`CameraError::DeviceNotFound`].
    DeviceNotFound,
    /// See [`CameraError::DeviceBusy`].
    DeviceBusy,
    /// See [`CameraError::Timeout`].
    Timeout,
    /// See [`CameraError::UnknownFailure`].
    UnknownFailure,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::Unsupported,
        ErrorKind::PermissionDenied,
        ErrorKind::DeviceNotFound,
        ErrorKind::DeviceBusy,
        ErrorKind::Timeout,
        ErrorKind::UnknownFailure,
    ];

    /// Snake-case name used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::DeviceNotFound => "device_not_found",
            ErrorKind::DeviceBusy => "device_busy",
            ErrorKind::Timeout => "timeout",
            ErrorKind::UnknownFailure => "unknown_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CameraError {
    /// Returns the error's kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::Unsupported => ErrorKind::Unsupported,
            CameraError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            CameraError::DeviceNotFound(_) => ErrorKind::DeviceNotFound,
            CameraError::DeviceBusy(_) => ErrorKind::DeviceBusy,
            CameraError::Timeout(_) => ErrorKind::Timeout,
            CameraError::UnknownFailure(_) => ErrorKind::UnknownFailure,
        }
    }

    /// Returns true if this failure means permission is denied.
    ///
    /// Device availability problems and timeouts say nothing about
    /// permission.
    pub fn denies_permission(&self) -> bool {
        match self.kind() {
            ErrorKind::PermissionDenied | ErrorKind::UnknownFailure => true,
            ErrorKind::Unsupported
            | ErrorKind::DeviceNotFound
            | ErrorKind::DeviceBusy
            | ErrorKind::Timeout => false,
        }
    }
}

impl From<PlatformError> for CameraError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Denied(m) | PlatformError::SecurityPolicy(m) => {
                CameraError::PermissionDenied(m)
            }
            PlatformError::NoDevice(m) => CameraError::DeviceNotFound(m),
            PlatformError::DeviceInUse(m) => CameraError::DeviceBusy(m),
            PlatformError::ConstraintsUnsatisfiable(m)
            | PlatformError::Aborted(m)
            | PlatformError::Other(m) => CameraError::UnknownFailure(m),
        }
    }
}

/// Reasons a session operation was not carried out at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Another acquisition or permission probe has not resolved yet.
    #[error("a camera request is already in flight")]
    InFlight,
    /// The attempt ran but failed; the error is also published in state.
    #[error(transparent)]
    Camera(#[from] CameraError),
}

impl SessionError {
    /// Returns the camera error, if the attempt ran and failed.
    pub fn camera_error(&self) -> Option<&CameraError> {
        match self {
            SessionError::Camera(e) => Some(e),
            SessionError::InFlight => None,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
