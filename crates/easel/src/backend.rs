//! Windowing backend seam
//!
//! A [`Backend`] opens native windows; each [`NativeWindow`] it returns lives
//! on, and is only ever touched by, the UI thread that opened it. The host
//! never sees a platform type.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use embedded_graphics::prelude::Point;
use image::RgbaImage;

use crate::error::Result;
use crate::framebuffer::PresentTarget;
use crate::headless::HeadlessBackend;
use crate::host::UiMessage;
use crate::input::RawEvent;
use crate::lifecycle::Lifecycle;

/// Process-unique window identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanvasId(u64);

impl CanvasId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value, for logs and thread names
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CanvasId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a backend delivers raw input for one window
///
/// Feeds the same FIFO queue as marshaled actions, so raw events and actions
/// are handled in arrival order.
#[derive(Debug, Clone)]
pub struct RawEventSink {
    tx: Sender<UiMessage>,
}

impl RawEventSink {
    pub(crate) fn new(tx: Sender<UiMessage>) -> Self {
        Self { tx }
    }

    /// Queue `event`; returns `false` once the window is gone
    pub fn send(&self, event: RawEvent) -> bool {
        self.tx.send(UiMessage::Raw(event)).is_ok()
    }
}

/// Set by the backend once the native handle can receive marshaled calls
#[derive(Debug, Clone, Default)]
pub struct Realized(Arc<AtomicBool>);

impl Realized {
    /// Mark the handle realized
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the handle is realized
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a backend needs to open one window
#[derive(Debug, Clone)]
pub struct OpenRequest {
    /// Identity of the window being opened
    pub id: CanvasId,
    /// Client-area width in pixels
    pub width: u32,
    /// Client-area height in pixels
    pub height: u32,
    /// Initial title
    pub title: String,
    /// Raw input destination
    pub events: RawEventSink,
    /// Readiness flag the host polls
    pub realized: Realized,
}

/// A platform window as seen from its UI thread
///
/// Not `Send`: it is created on the UI thread and dropped there. Methods
/// take `&self` so a call marshaled from inside another call on the same
/// window runs inline; implementations keep their state in cells.
pub trait NativeWindow: PresentTarget {
    /// Repaint the last presented contents
    fn redraw(&self);

    /// Client-area size
    fn size(&self) -> (u32, u32);

    /// Current title
    fn title(&self) -> String;

    /// Change the title
    fn set_title(&self, title: &str);

    /// Desktop position of the window frame
    fn position(&self) -> Point;

    /// Move the window frame
    fn set_position(&self, position: Point);

    /// Hide and release the native window; called once, right before drop
    fn close(&self);

    /// Copy of the last presented contents
    fn contents(&self) -> RgbaImage;
}

/// Opens native windows
pub trait Backend: Send + Sync {
    /// Open a window; called on the new window's UI thread
    fn open(&self, request: OpenRequest) -> Result<Box<dyn NativeWindow>>;

    /// Put `image` on the system clipboard
    fn copy_to_clipboard(&self, image: &RgbaImage) -> Result<()>;
}

/// Backend plus the lifecycle its windows report to
#[derive(Clone)]
pub struct Host {
    backend: Arc<dyn Backend>,
    lifecycle: Arc<Lifecycle>,
}

impl Host {
    /// Combine a backend with a lifecycle
    pub fn new(backend: Arc<dyn Backend>, lifecycle: Arc<Lifecycle>) -> Self {
        Self { backend, lifecycle }
    }

    /// Desktop windows, process exits when the last one closes
    #[cfg(not(feature = "headless"))]
    pub fn native() -> Self {
        Self::new(
            Arc::new(crate::window::DesktopBackend::new()),
            Lifecycle::global(),
        )
    }

    /// In-memory windows reporting to the global lifecycle
    pub fn headless() -> Self {
        Self::new(Arc::new(HeadlessBackend::new()), Lifecycle::global())
    }

    /// Desktop windows unless `EASEL_HEADLESS` is set (or the crate is built
    /// with the `headless` feature)
    pub fn from_env() -> Self {
        if std::env::var_os("EASEL_HEADLESS").is_some() {
            return Self::headless();
        }
        Self::platform_default()
    }

    #[cfg(not(feature = "headless"))]
    fn platform_default() -> Self {
        Self::native()
    }

    #[cfg(feature = "headless")]
    fn platform_default() -> Self {
        Self::headless()
    }

    /// The window backend
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// The lifecycle windows report to
    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::from_env()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}
