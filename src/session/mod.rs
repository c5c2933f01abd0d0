//! Camera session management.
//!
//! [`CameraSession`] is the single owner of a live camera stream. It
//! tracks the permission tri-state, classifies platform failures into
//! [`CameraError`], and guarantees the stream is released on stop, on
//! switch and on teardown.

mod error;
mod manager;
mod state;

pub use error::{CameraError, ErrorKind, SessionError};
pub use manager::{CameraSession, SessionStats};
pub use state::{PermissionState, SessionState, StreamInfo};
