//! Camera Session Library
//!
//! Manages the acquisition of a live camera stream for capture flows such
//! as scanning items during issue and return operations. A session owns
//! at most one stream, tracks whether the user has granted camera access,
//! and classifies platform failures into a small closed set of errors.
//!
//! # Architecture
//!
//! ```text
//! caller (UI) → session → platform (nokhwa / mock)
//!                  ↓
//!         published state (watch channel) → metrics
//! ```
//!
//! # Design Principles
//!
//! - **No leaked devices**: a stream stops its tracks when dropped, and the
//!   session releases its stream on stop, switch, restart and teardown
//! - **One request at a time**: overlapping acquisitions are rejected
//! - **Failures are state**: every failed attempt settles into the
//!   published error, never a stale loading flag
//!
//! # Example
//!
//! ```no_run
//! use camera_session::{CameraSession, MockPlatform, PermissionState, SessionConfig};
//!
//! # async fn run() {
//! let session = CameraSession::new(MockPlatform::new(), SessionConfig::default());
//!
//! if session.start_camera().await.is_ok() {
//!     assert_eq!(session.state().has_permission, PermissionState::Granted);
//!     session.switch_camera().await.ok();
//! }
//!
//! // Dropping the session releases the camera
//! session.dispose();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod metrics;
pub mod platform;
pub mod session;

// Re-export commonly used types at crate root
pub use capture::{FacingMode, FileConfig, MediaStream, SessionConfig, VideoConstraints};
pub use platform::{MediaPlatform, MockBehavior, MockPlatform, PlatformError};
pub use session::{
    CameraError, CameraSession, ErrorKind, PermissionState, SessionError, SessionState,
};

#[cfg(feature = "camera")]
pub use platform::NativePlatform;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
