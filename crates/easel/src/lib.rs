//! Easel
//!
//! A 2D drawing canvas bound to a desktop window, driven from any thread.
//!
//! Each window gets a dedicated UI thread. The thread that draws keeps its
//! own off-screen [`FrameBuffer`]; presenting marshals a copy onto the UI
//! thread. Keyboard and mouse input is cleaned up (auto-repeat, enter/leave,
//! clicks, wheel notches) and published to subscribers on the UI thread.
//! When the last window closes the process exits with code 0, unless the
//! window was opened with `exit_on_last_close` off.
//!
//! - Window management (winit + softbuffer, one platform thread)
//! - Framebuffer (Rgb888 pixels, embedded-graphics integration)
//! - Event channels (mouse, keyboard, window move)
//! - Headless mode for CI (`EASEL_HEADLESS=1` or the `headless` feature)
//!
//! # Example
//!
//! ```no_run
//! use easel::Canvas;
//! use embedded_graphics::pixelcolor::Rgb888;
//! use embedded_graphics::prelude::*;
//! use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
//!
//! # fn main() -> easel::Result<()> {
//! let mut canvas = Canvas::new(400, 300)?;
//!
//! Rectangle::new(Point::new(20, 20), Size::new(120, 80))
//!     .into_styled(PrimitiveStyle::with_fill(Rgb888::RED))
//!     .draw(&mut canvas)
//!     .ok();
//!
//! canvas.show();
//! canvas.run(); // blocks until the user closes the window
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod framebuffer;
pub mod headless;
pub mod host;
pub mod input;
pub mod keys;
pub mod lifecycle;
pub mod pointer;

#[cfg(not(feature = "headless"))]
pub mod window;

pub use backend::{Backend, CanvasId, Host, NativeWindow, OpenRequest, RawEventSink, Realized};
pub use config::{CanvasConfig, MIN_HEIGHT, MIN_WIDTH};
pub use error::{Error, Result};
pub use events::{Event, EventRouter, KeyArgs, MouseArgs, SubscriberList, SubscriptionId};
pub use framebuffer::{FrameBuffer, PresentTarget};
pub use headless::{HeadlessBackend, HeadlessProbe, Realization};
pub use host::WindowHandle;
pub use input::{InputPipeline, RawEvent};
pub use keys::{KeyRepeatFilter, KeyTransition};
pub use lifecycle::Lifecycle;
pub use pointer::{ClickTracker, PointerTransition, PointerTransitionFilter, WheelAccumulator};
pub use winit::event::MouseButton;
pub use winit::keyboard::{KeyCode, ModifiersState};

use std::convert::Infallible;
use std::time::Duration;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use image::RgbaImage;

/// A window plus the off-screen buffer drawn into it
///
/// Drawing (through [`DrawTarget`]) only touches the buffer; [`show`]
/// makes it visible. The canvas can be moved to any thread.
///
/// [`show`]: Canvas::show
pub struct Canvas {
    framebuffer: FrameBuffer,
    window: WindowHandle,
}

impl Canvas {
    /// Open a `width × height` canvas with the default configuration
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_config(CanvasConfig::with_size(width, height))
    }

    /// Open a canvas on the backend chosen by [`Host::from_env`]
    pub fn with_config(config: CanvasConfig) -> Result<Self> {
        Self::with_host(config, &Host::from_env())
    }

    /// Open a canvas on an explicit backend and lifecycle
    ///
    /// The canvas starts white and visible.
    pub fn with_host(config: CanvasConfig, host: &Host) -> Result<Self> {
        let window = WindowHandle::create(&config, host)?;
        let canvas = Self {
            framebuffer: FrameBuffer::new(config.width, config.height),
            window,
        };
        canvas.show();
        Ok(canvas)
    }

    /// Present the buffer and wait until it is visible
    pub fn show(&self) {
        self.window.render(&self.framebuffer);
    }

    /// Present the buffer, taking at least `min` (animation pacing)
    pub fn show_for(&self, min: Duration) {
        self.window.render_paced(&self.framebuffer, min);
    }

    /// Present the buffer from inside a tokio runtime
    pub async fn show_async(&self) {
        self.window.render_async(&self.framebuffer).await;
    }

    /// Paced present from inside a tokio runtime
    pub async fn show_for_async(&self, min: Duration) {
        self.window.render_paced_async(&self.framebuffer, min).await;
    }

    /// Fill the buffer with white (not shown until the next present)
    pub fn clear(&mut self) {
        self.framebuffer.clear();
    }

    /// Fill the buffer with `color`
    pub fn clear_with(&mut self, color: Rgb888) {
        self.framebuffer.fill(color);
    }

    /// Blend an image into the buffer
    pub fn draw_image(&mut self, top_left: Point, image: &RgbaImage) {
        self.framebuffer.draw_image(top_left, image);
    }

    /// Independent copy of the buffer (not of what is on screen)
    pub fn snapshot(&self) -> RgbaImage {
        self.framebuffer.snapshot()
    }

    /// The off-screen buffer
    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    /// The off-screen buffer, mutably
    pub fn framebuffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.framebuffer
    }

    /// Window title
    pub fn title(&self) -> Result<String> {
        self.window.title()
    }

    /// Change the window title
    pub fn set_title(&self, title: impl Into<String>) {
        self.window.set_title(title);
    }

    /// Desktop position of the window frame
    pub fn frame_position(&self) -> Result<Point> {
        self.window.position()
    }

    /// Move the window frame
    pub fn set_frame_position(&self, position: Point) {
        self.window.set_position(position);
    }

    /// Put what is on screen on the system clipboard
    pub fn copy_to_clipboard(&self) -> Result<()> {
        self.window.copy_to_clipboard()
    }

    /// Event channels of the window
    pub fn events(&self) -> &EventRouter<WindowHandle> {
        self.window.events()
    }

    /// Handle to the window, for use from other threads or handlers
    pub fn window(&self) -> &WindowHandle {
        &self.window
    }

    /// Block until the user closes the window
    ///
    /// With the default configuration closing the last window ends the
    /// process, so this does not return in that case.
    pub fn run(self) {
        self.window.wait_until_closed();
    }

    /// Close the window with its configured exit policy
    pub fn close(self) {
        self.window.close();
    }

    /// Close the window; `exit_on_last_close` decides whether the process
    /// ends if this was the last one
    pub fn close_with(self, exit_on_last_close: bool) {
        self.window.close_with(exit_on_last_close);
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> core::result::Result<(), Self::Error> {
        self.framebuffer.fill(color);
        Ok(())
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        self.framebuffer.size()
    }
}
