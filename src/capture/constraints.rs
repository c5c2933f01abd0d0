//! Facing mode and acquisition constraints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which physical camera an acquisition asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Outward camera, pointed away from the user.
    #[default]
    Environment,
    /// Inward camera, pointed at the user.
    User,
}

impl FacingMode {
    /// Returns the opposite facing mode.
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }

    /// Returns the lowercase name used in config files and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "environment" | "back" | "rear" => Ok(FacingMode::Environment),
            "user" | "front" => Ok(FacingMode::User),
            other => Err(format!("unknown facing mode: {other}")),
        }
    }
}

/// Constraints for a video-only stream request.
///
/// Width, height and facing mode are ideals: a platform may satisfy the
/// request with the closest format or device it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    /// Requested camera.
    pub facing_mode: FacingMode,
    /// Ideal frame width in pixels.
    pub ideal_width: u32,
    /// Ideal frame height in pixels.
    pub ideal_height: u32,
}

impl VideoConstraints {
    /// Creates constraints for the given facing mode at the default 1280x720.
    pub fn new(facing_mode: FacingMode) -> Self {
        Self {
            facing_mode,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }

    /// Returns a copy with different ideal dimensions.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.ideal_width = width;
        self.ideal_height = height;
        self
    }
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self::new(FacingMode::default())
    }
}
