//! Canvas errors

use std::time::Duration;

use crate::config::{MIN_HEIGHT, MIN_WIDTH};

/// Errors surfaced to the thread that asked for something.
///
/// Marshaling races (a window closed while a call was in flight) are not
/// errors and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Requested canvas width is below [`MIN_WIDTH`].
    #[error("canvas width must be at least {}px, got {0}px", MIN_WIDTH)]
    InvalidWidth(u32),

    /// Requested canvas height is below [`MIN_HEIGHT`].
    #[error("canvas height must be at least {}px, got {0}px", MIN_HEIGHT)]
    InvalidHeight(u32),

    /// The OS refused to start the UI thread.
    #[error("failed to spawn UI thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The UI thread terminated before the window signaled readiness.
    #[error("UI thread exited before the window became ready")]
    UiThreadExited,

    /// The native window never became responsive to marshaled calls.
    #[error("window did not become responsive within {0:?}")]
    Unresponsive(Duration),

    /// The windowing backend failed (event loop, window or surface creation).
    #[error("windowing backend error: {0}")]
    Backend(String),

    /// The system clipboard rejected the image.
    #[error("clipboard error: {0}")]
    Clipboard(String),

    /// A configuration file could not be parsed.
    #[error("invalid canvas configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The window has already been closed.
    #[error("window is closed")]
    Closed,
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
