//! Prometheus metrics exporter for camera sessions.
//!
//! # Metrics Exposed
//!
//! ## State
//! - `camera_session_supported` - Platform capture capability (1=yes, 0=no)
//! - `camera_session_loading` - Acquisition in flight
//! - `camera_session_streaming` - Stream currently held
//! - `camera_session_permission` - Permission (1=granted, 0=unknown, -1=denied)
//!
//! ## Lifecycle
//! - `camera_session_acquisitions_total` - Acquisitions handed to the platform
//! - `camera_session_acquisitions_succeeded_total` - Acquisitions that produced a stream
//! - `camera_session_failures_total{kind}` - Failed acquisitions by error kind
//! - `camera_session_releases_total` - Streams released
//! - `camera_session_switches_total` - Facing-mode switches
//! - `camera_session_permission_probes_total` - Throwaway permission acquisitions
//! - `camera_session_rejected_total` - Requests rejected while another was in flight
//!
//! # Example
//!
//! ```no_run
//! use camera_session::metrics::{MetricsRegistry, MetricsSnapshot};
//! use camera_session::{CameraSession, MockPlatform, SessionConfig};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let session = CameraSession::new(MockPlatform::new(), SessionConfig::default());
//!
//! let snapshot = MetricsSnapshot::from_session(&session.state(), &session.stats());
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
