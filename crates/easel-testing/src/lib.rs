//! Canvas Testing Utilities
//!
//! Headless harness for code that draws on an [`easel::Canvas`] and reacts
//! to its events.
//!
//! # Quick start
//!
//! ```no_run
//! use easel_testing::TestCanvas;
//! use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::{PrimitiveStyle, Rectangle}};
//!
//! let mut t = TestCanvas::new(200, 100).unwrap();
//!
//! Rectangle::new(Point::new(10, 10), Size::new(40, 20))
//!     .into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
//!     .draw(&mut *t)
//!     .unwrap();
//! t.show();
//!
//! t.assert_visible_pixel(20, 15, Rgb888::BLACK).unwrap();
//! t.click(Point::new(20, 15), easel::MouseButton::Left);
//! ```
//!
//! # Golden screenshot testing
//!
//! ```no_run
//! # use easel_testing::TestCanvas;
//! # let t = TestCanvas::new(200, 100).unwrap();
//! // First run: set UPDATE_GOLDEN=1 to create/update the reference file.
//! t.assert_matches_golden("tests/golden/my_screen.png", 0).unwrap();
//! ```

#![warn(clippy::all)]
#![warn(clippy::print_stdout)]
#![allow(clippy::module_name_repetitions)]

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use easel::framebuffer::{argb_to_image, from_argb};
use easel::{
    Canvas, CanvasConfig, HeadlessBackend, HeadlessProbe, Host, KeyArgs, KeyCode, Lifecycle,
    ModifiersState, MouseButton, RawEvent,
};
use embedded_graphics::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};
use image::RgbaImage;

pub use easel;

// ─────────────────────────────────────────────────────────────────────────────
// TestCanvas
// ─────────────────────────────────────────────────────────────────────────────

/// Headless canvas for UI testing.
///
/// Wraps [`Canvas`] on an in-memory backend with its own lifecycle (closing
/// it never ends the test process) and adds:
/// - Input simulation, delivered through the window's UI thread
/// - Pixel and region assertions, on the buffer or on what is shown
/// - Screenshot capture and golden-file comparison
///
/// Derefs to [`Canvas`], which implements [`DrawTarget`].
pub struct TestCanvas {
    inner: Canvas,
    backend: Arc<HeadlessBackend>,
    lifecycle: Arc<Lifecycle>,
    exits: Arc<Mutex<Vec<i32>>>,
    probe: HeadlessProbe,
}

impl TestCanvas {
    /// Open a headless canvas with exact pixel dimensions.
    pub fn new(width: u32, height: u32) -> easel::Result<Self> {
        Self::with_config(CanvasConfig::with_size(width, height))
    }

    /// Open a headless canvas from a full configuration.
    pub fn with_config(config: CanvasConfig) -> easel::Result<Self> {
        let backend = Arc::new(HeadlessBackend::new());
        let exits = Arc::new(Mutex::new(Vec::new()));
        let recorded = exits.clone();
        let lifecycle = Arc::new(Lifecycle::with_exit_hook(move |code| {
            recorded
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(code);
        }));
        let host = Host::new(backend.clone(), lifecycle.clone());

        let inner = Canvas::with_host(config, &host)?;
        let probe = backend
            .probe(inner.window().id())
            .ok_or(easel::Error::UiThreadExited)?;
        Ok(Self {
            inner,
            backend,
            lifecycle,
            exits,
            probe,
        })
    }

    // ── Input simulation ─────────────────────────────────────────────────────

    /// Wait until everything queued so far has been handled.
    pub fn flush(&self) {
        let _ = self.inner.window().invoke_sync(|_| ());
    }

    /// Deliver raw events as the backend would, then [`flush`](Self::flush).
    pub fn send(&self, events: impl IntoIterator<Item = RawEvent>) {
        for event in events {
            self.probe.send(event);
        }
        self.flush();
    }

    /// Key goes down (repeat by calling again).
    pub fn press_key(&self, key: KeyCode) {
        self.press_key_with(key, ModifiersState::empty());
    }

    /// Key goes down with modifiers held.
    pub fn press_key_with(&self, key: KeyCode, modifiers: ModifiersState) {
        self.send([RawEvent::KeyDown(KeyArgs::new(key).with_modifiers(modifiers))]);
    }

    /// Key comes up.
    pub fn release_key(&self, key: KeyCode) {
        self.send([RawEvent::KeyUp(KeyArgs::new(key))]);
    }

    /// Press and release `key`.
    pub fn tap_key(&self, key: KeyCode) {
        self.press_key(key);
        self.release_key(key);
    }

    /// Pointer moves to `position`.
    pub fn move_pointer(&self, position: Point) {
        self.send([RawEvent::PointerMove(position)]);
    }

    /// Pointer enters the window at `position`.
    pub fn enter_at(&self, position: Point) {
        self.send([RawEvent::PointerEnter, RawEvent::PointerMove(position)]);
    }

    /// Pointer leaves the window.
    pub fn leave(&self) {
        self.send([RawEvent::PointerLeave]);
    }

    /// Move to `position`, press and release `button`.
    pub fn click(&self, position: Point, button: MouseButton) {
        self.send([
            RawEvent::PointerMove(position),
            RawEvent::ButtonDown(button),
            RawEvent::ButtonUp(button),
        ]);
    }

    /// Turn the wheel by `notches` (positive = away from the user).
    pub fn scroll(&self, notches: f64) {
        self.send([RawEvent::Wheel(notches)]);
    }

    /// The user clicks the window's close button.
    pub fn request_close(&self) {
        self.probe.send(RawEvent::CloseRequested);
        self.inner.window().wait_until_closed();
    }

    // ── Pixel access ─────────────────────────────────────────────────────────

    /// Color in the off-screen buffer at `(x, y)`, `None` if out of bounds.
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<Rgb888> {
        self.inner.framebuffer().get_pixel(x, y)
    }

    /// Color currently shown at `(x, y)`, `None` if out of bounds.
    pub fn visible_pixel_at(&self, x: u32, y: u32) -> Option<Rgb888> {
        let (width, height) = self.inner.window().size();
        if x >= width || y >= height {
            return None;
        }
        let index = (y as usize) * (width as usize) + (x as usize);
        self.probe.visible().get(index).map(|&pixel| from_argb(pixel))
    }

    /// What the window shows right now.
    pub fn visible_image(&self) -> RgbaImage {
        let (width, height) = self.inner.window().size();
        argb_to_image(&self.probe.visible(), width, height)
    }

    // ── Pixel assertions ─────────────────────────────────────────────────────

    /// Assert that buffer pixel `(x, y)` has the expected color.
    pub fn assert_pixel(&self, x: u32, y: u32, expected: Rgb888) -> Result<(), String> {
        check_pixel("assert_pixel", x, y, self.pixel_at(x, y), expected)
    }

    /// Assert that the shown pixel `(x, y)` has the expected color.
    pub fn assert_visible_pixel(&self, x: u32, y: u32, expected: Rgb888) -> Result<(), String> {
        check_pixel(
            "assert_visible_pixel",
            x,
            y,
            self.visible_pixel_at(x, y),
            expected,
        )
    }

    /// Assert that the window shows exactly the buffer.
    pub fn assert_shown(&self) -> Result<(), String> {
        if self.probe.visible() == self.inner.framebuffer().pixels() {
            Ok(())
        } else {
            Err("assert_shown: window contents differ from the buffer".into())
        }
    }

    /// Assert that every buffer pixel inside `rect` has the given color.
    pub fn assert_region_uniform(&self, rect: Rectangle, color: Rgb888) -> Result<(), String> {
        for point in rect.points() {
            let (x, y) = coordinates(point)
                .ok_or_else(|| format!("assert_region_uniform: {rect:?} leaves the canvas"))?;
            self.assert_pixel(x, y, color)
                .map_err(|e| format!("assert_region_uniform failed in {rect:?}: {e}"))?;
        }
        Ok(())
    }

    /// Assert that `rect` contains **at least one** buffer pixel of `color`.
    pub fn assert_region_contains(&self, rect: Rectangle, color: Rgb888) -> Result<(), String> {
        if self.pixel_count_of_color(rect, color) > 0 {
            Ok(())
        } else {
            Err(format!(
                "assert_region_contains: no pixel of {color:?} found in {rect:?}"
            ))
        }
    }

    /// Count the buffer pixels in `rect` that are exactly `color`.
    pub fn pixel_count_of_color(&self, rect: Rectangle, color: Rgb888) -> usize {
        rect.points()
            .filter_map(coordinates)
            .filter(|&(x, y)| self.pixel_at(x, y) == Some(color))
            .count()
    }

    // ── Screenshot utilities ─────────────────────────────────────────────────

    /// Save what the window shows as a PNG.
    pub fn screenshot(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        self.visible_image().save(path)?;
        Ok(())
    }

    /// Save what the window shows as the golden reference PNG.
    ///
    /// Parent directories are created automatically.
    pub fn save_golden(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let p = path.as_ref();
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.screenshot(p)
    }

    /// Assert what the window shows matches a golden reference PNG.
    ///
    /// `threshold` is the maximum per-channel absolute difference that is still
    /// considered equal (0 = exact match).
    ///
    /// Set the `UPDATE_GOLDEN=1` environment variable to **update** the golden
    /// file instead of asserting:
    ///
    /// ```bash
    /// UPDATE_GOLDEN=1 cargo test
    /// ```
    pub fn assert_matches_golden(
        &self,
        golden_path: impl AsRef<Path>,
        threshold: u8,
    ) -> Result<(), String> {
        let golden_path = golden_path.as_ref();

        if std::env::var("UPDATE_GOLDEN").is_ok() {
            return self.save_golden(golden_path).map_err(|e| {
                format!(
                    "Failed to save golden '{p}': {e}",
                    p = golden_path.display()
                )
            });
        }

        let current = self.visible_image();
        let golden = image::open(golden_path)
            .map_err(|e| {
                format!(
                    "Failed to open golden '{}': {e}\nRun with UPDATE_GOLDEN=1 to create it.",
                    golden_path.display()
                )
            })?
            .to_rgba8();

        if current.dimensions() != golden.dimensions() {
            let (cw, ch) = current.dimensions();
            let (gw, gh) = golden.dimensions();
            return Err(format!(
                "Dimension mismatch: screenshot is {cw}×{ch}, golden is {gw}×{gh}"
            ));
        }

        let diff_pixels = current
            .pixels()
            .zip(golden.pixels())
            .filter(|(cp, gp)| {
                cp.0.iter()
                    .zip(gp.0.iter())
                    .any(|(&a, &b)| a.abs_diff(b) > threshold)
            })
            .count();

        if diff_pixels > 0 {
            Err(format!(
                "{diff_pixels} pixels differ from golden '{}' (threshold={threshold})",
                golden_path.display()
            ))
        } else {
            Ok(())
        }
    }

    // ── Harness access ───────────────────────────────────────────────────────

    /// Test-side view of the window.
    pub fn probe(&self) -> &HeadlessProbe {
        &self.probe
    }

    /// The in-memory backend (clipboard, opened windows).
    pub fn backend(&self) -> &HeadlessBackend {
        &self.backend
    }

    /// The isolated lifecycle the window reports to.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Exit codes the process would have ended with.
    pub fn exit_codes(&self) -> Vec<i32> {
        self.exits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The wrapped canvas.
    pub fn canvas(&self) -> &Canvas {
        &self.inner
    }

    /// The wrapped canvas, mutably.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.inner
    }
}

fn coordinates(point: Point) -> Option<(u32, u32)> {
    Some((u32::try_from(point.x).ok()?, u32::try_from(point.y).ok()?))
}

fn check_pixel(
    what: &str,
    x: u32,
    y: u32,
    actual: Option<Rgb888>,
    expected: Rgb888,
) -> Result<(), String> {
    let actual = actual.ok_or_else(|| format!("Pixel ({x}, {y}) is out of bounds"))?;
    if actual == expected {
        Ok(())
    } else {
        Err(format!(
            "{what}({x}, {y}): expected {expected:?}, got {actual:?}"
        ))
    }
}

impl std::ops::Deref for TestCanvas {
    type Target = Canvas;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::DerefMut for TestCanvas {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Drop for TestCanvas {
    fn drop(&mut self) {
        self.inner.window().close_with(false);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
