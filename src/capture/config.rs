//! Session and file configuration.

use super::{FacingMode, VideoConstraints};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a camera session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Ideal frame width in pixels.
    pub ideal_width: u32,
    /// Ideal frame height in pixels.
    pub ideal_height: u32,
    /// Facing mode a new session starts with.
    pub default_facing: FacingMode,
    /// Give up on an acquisition after this many milliseconds.
    ///
    /// `None` waits for the platform indefinitely, which is what an
    /// unanswered permission prompt does.
    pub acquire_timeout_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            default_facing: FacingMode::Environment,
            acquire_timeout_ms: None,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration with the specified ideal dimensions.
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            ideal_width: width,
            ideal_height: height,
            ..Default::default()
        }
    }

    /// Returns a copy with an acquisition timeout.
    ///
    /// The timeout is rounded up to whole milliseconds, and never below 1 ms.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        self.acquire_timeout_ms = Some(millis.max(1));
        self
    }

    /// Returns the acquisition timeout, if any.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Builds request constraints for the given facing mode.
    pub fn constraints(&self, facing_mode: FacingMode) -> VideoConstraints {
        VideoConstraints::new(facing_mode).with_resolution(self.ideal_width, self.ideal_height)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ideal_width == 0 || self.ideal_height == 0 {
            return Err(ConfigError::InvalidResolution);
        }
        if self.acquire_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    /// Replaces values [`validate`](Self::validate) would reject.
    ///
    /// A zero dimension resets the resolution to the default and a zero
    /// timeout becomes 1 ms.
    pub fn sanitized(mut self) -> Self {
        if self.ideal_width == 0 || self.ideal_height == 0 {
            let defaults = Self::default();
            self.ideal_width = defaults.ideal_width;
            self.ideal_height = defaults.ideal_height;
        }
        if self.acquire_timeout_ms == Some(0) {
            self.acquire_timeout_ms = Some(1);
        }
        self
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Ideal width or height is zero.
    #[error("invalid ideal resolution")]
    InvalidResolution,
    /// Acquire timeout is zero.
    #[error("acquire timeout must be greater than zero")]
    InvalidTimeout,
    /// Device frame rate outside 1-120 fps.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[session]` table.
    #[serde(default)]
    pub session: SessionConfig,
    /// `[device]` table.
    #[serde(default)]
    pub device: DeviceConfig,
    /// `[output]` table.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Device selection hints for the native platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Frame rate asked of the device.
    pub frame_rate: u32,
    /// Lowercase name fragments that mark an inward-facing camera.
    pub user_keywords: Vec<String>,
    /// Lowercase name fragments that mark an outward-facing camera.
    pub environment_keywords: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            user_keywords: ["front", "user", "facetime", "integrated", "internal"]
                .map(String::from)
                .to_vec(),
            environment_keywords: ["back", "rear", "environment", "world"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl DeviceConfig {
    /// Validates the device hints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 || self.frame_rate > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Output configuration for the command-line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Seconds to hold a stream open (0 holds until Ctrl-C).
    pub hold_seconds: u64,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            hold_seconds: 5,
            metrics_port: 0,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.session.validate()?;
        config.device.validate()?;
        Ok(config)
    }
}
