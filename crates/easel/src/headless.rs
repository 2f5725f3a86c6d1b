//! In-memory backend for tests and CI
//!
//! Windows are plain pixel vectors. Each open window registers a
//! [`HeadlessProbe`] with the backend, through which tests inject raw input
//! and inspect what is visible. Closing the window unregisters it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use embedded_graphics::prelude::Point;
use image::RgbaImage;

use crate::backend::{Backend, CanvasId, NativeWindow, OpenRequest, RawEventSink, Realized};
use crate::error::{Error, Result};
use crate::framebuffer::{argb_to_image, PresentTarget};
use crate::input::RawEvent;

/// How the backend's windows become ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Realization {
    /// Realized as soon as they are opened
    #[default]
    Immediate,
    /// Realized after a delay (simulates a slow window manager)
    Delayed(Duration),
    /// Never realized
    Never,
}

#[derive(Debug)]
struct Surface {
    visible: Vec<u32>,
    width: u32,
    height: u32,
    title: String,
    position: Point,
    presents: u64,
    closed: bool,
}

/// Test-side view of one headless window
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    surface: Arc<Mutex<Surface>>,
    events: RawEventSink,
}

impl HeadlessProbe {
    fn surface(&self) -> MutexGuard<'_, Surface> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a raw event to the window's UI thread; `false` once closed
    pub fn send(&self, event: RawEvent) -> bool {
        self.events.send(event)
    }

    /// Last presented pixels
    pub fn visible(&self) -> Vec<u32> {
        self.surface().visible.clone()
    }

    /// Number of presents so far
    pub fn presents(&self) -> u64 {
        self.surface().presents
    }

    /// Current title
    pub fn title(&self) -> String {
        self.surface().title.clone()
    }

    /// Current desktop position
    pub fn position(&self) -> Point {
        self.surface().position
    }

    /// Whether the window has been closed
    pub fn is_closed(&self) -> bool {
        self.surface().closed
    }
}

type Registry = Mutex<HashMap<CanvasId, HeadlessProbe>>;

/// Backend whose windows never reach the screen
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    realization: Realization,
    open_error: Option<String>,
    windows: Arc<Registry>,
    opened: AtomicUsize,
    clipboard: Mutex<Option<RgbaImage>>,
}

impl HeadlessBackend {
    /// Backend whose windows are realized immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Change how windows become ready
    pub fn with_realization(mut self, realization: Realization) -> Self {
        self.realization = realization;
        self
    }

    /// Make every `open` fail with `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Probe for the window `id` while it is open
    ///
    /// A probe taken earlier stays usable after the window closes.
    pub fn probe(&self, id: CanvasId) -> Option<HeadlessProbe> {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Number of windows opened so far, closed ones included
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of windows currently open
    pub fn open_now(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Image last put on the clipboard
    pub fn clipboard(&self) -> Option<RgbaImage> {
        self.clipboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Backend for HeadlessBackend {
    fn open(&self, request: OpenRequest) -> Result<Box<dyn NativeWindow>> {
        if let Some(message) = &self.open_error {
            return Err(Error::Backend(message.clone()));
        }

        let size = (request.width as usize).saturating_mul(request.height as usize);
        let surface = Arc::new(Mutex::new(Surface {
            visible: vec![0xFFFF_FFFF; size],
            width: request.width,
            height: request.height,
            title: request.title,
            position: Point::zero(),
            presents: 0,
            closed: false,
        }));
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                request.id,
                HeadlessProbe {
                    surface: surface.clone(),
                    events: request.events,
                },
            );
        self.opened.fetch_add(1, Ordering::SeqCst);

        realize(self.realization, request.realized);
        tracing::debug!(id = %request.id, "headless window opened");
        Ok(Box::new(HeadlessWindow {
            id: request.id,
            surface,
            registry: Arc::downgrade(&self.windows),
        }))
    }

    fn copy_to_clipboard(&self, image: &RgbaImage) -> Result<()> {
        *self.clipboard.lock().unwrap_or_else(PoisonError::into_inner) = Some(image.clone());
        Ok(())
    }
}

fn realize(realization: Realization, realized: Realized) {
    match realization {
        Realization::Immediate => realized.set(),
        Realization::Delayed(delay) => {
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                realized.set();
            });
        }
        Realization::Never => {}
    }
}

/// UI-thread side of a headless window
struct HeadlessWindow {
    id: CanvasId,
    surface: Arc<Mutex<Surface>>,
    registry: Weak<Registry>,
}

impl HeadlessWindow {
    fn surface(&self) -> MutexGuard<'_, Surface> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PresentTarget for HeadlessWindow {
    fn present(&self, pixels: &[u32], width: u32, height: u32) {
        let mut surface = self.surface();
        if (width, height) != (surface.width, surface.height) {
            tracing::warn!(width, height, "frame size does not match window, ignored");
            return;
        }
        surface.visible.clear();
        surface.visible.extend_from_slice(pixels);
        surface.presents = surface.presents.saturating_add(1);
    }
}

impl NativeWindow for HeadlessWindow {
    fn redraw(&self) {}

    fn contents(&self) -> RgbaImage {
        let surface = self.surface();
        argb_to_image(&surface.visible, surface.width, surface.height)
    }

    fn size(&self) -> (u32, u32) {
        let surface = self.surface();
        (surface.width, surface.height)
    }

    fn title(&self) -> String {
        self.surface().title.clone()
    }

    fn set_title(&self, title: &str) {
        self.surface().title = title.to_owned();
    }

    fn position(&self) -> Point {
        self.surface().position
    }

    fn set_position(&self, position: Point) {
        self.surface().position = position;
    }

    fn close(&self) {
        self.surface().closed = true;
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
    }
}
