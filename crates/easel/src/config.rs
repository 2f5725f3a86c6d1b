//! Canvas configuration

use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Narrowest canvas the window chrome can hold (title bar buttons).
pub const MIN_WIDTH: u32 = 150;

/// Shortest canvas allowed.
pub const MIN_HEIGHT: u32 = 1;

/// Configuration for one canvas window
///
/// Size is fixed for the lifetime of the window. Everything else can be
/// changed later through the window handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Client-area width in pixels (at least [`MIN_WIDTH`])
    pub width: u32,
    /// Client-area height in pixels (at least [`MIN_HEIGHT`])
    pub height: u32,
    /// Initial window title
    pub title: Cow<'static, str>,
    /// Terminate the process when this window is the last one to close
    pub exit_on_last_close: bool,
    /// Upper bound on waiting for the native window to become responsive
    #[serde(with = "millis")]
    pub ready_timeout: Duration,
    /// Backoff between readiness polls while the native handle is not realized
    #[serde(with = "millis")]
    pub ready_poll_interval: Duration,
}

impl CanvasConfig {
    /// Default configuration: 600×600, exits the process on last close
    pub const DEFAULT: Self = Self {
        width: 600,
        height: 600,
        title: Cow::Borrowed("Canvas"),
        exit_on_last_close: true,
        ready_timeout: Duration::from_millis(5000),
        ready_poll_interval: Duration::from_millis(10),
    };

    /// Default configuration with a custom size
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::DEFAULT
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the size limits
    ///
    /// Runs before any thread or native resource is created.
    pub fn validate(&self) -> Result<()> {
        if self.width < MIN_WIDTH {
            return Err(Error::InvalidWidth(self.width));
        }
        if self.height < MIN_HEIGHT {
            return Err(Error::InvalidHeight(self.height));
        }
        Ok(())
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
