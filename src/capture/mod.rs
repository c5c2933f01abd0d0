//! Stream handles, acquisition constraints and configuration.
//!
//! This module holds the data a platform hands back from an acquisition
//! and the settings a session requests it with. The stream handle is the
//! only thing that owns device resources.

mod config;
mod constraints;
mod stream;

pub use config::{ConfigError, DeviceConfig, FileConfig, OutputConfig, SessionConfig};
pub use constraints::{FacingMode, VideoConstraints};
pub use stream::{MediaStream, MediaTrack, StreamId, StreamSettings, TrackKind, TrackState};
