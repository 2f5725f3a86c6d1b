//! Desktop backend: winit windows, softbuffer surfaces, arboard clipboard
//!
//! winit allows one event loop per process, so a single platform thread
//! (`easel-platform`, started on first use) owns it. That thread only
//! creates windows and forwards their input into each window's queue. The
//! softbuffer surface and the presented pixels live on the window's own UI
//! thread.
//!
//! Not available on macOS, where the event loop must run on the main thread;
//! opening a window there fails with [`Error::Backend`].

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use arboard::{Clipboard, ImageData};
use embedded_graphics::prelude::Point;
use image::RgbaImage;
use softbuffer::{Context, Surface};
use tokio::sync::oneshot;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::keyboard::{ModifiersState, PhysicalKey};
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

use crate::backend::{Backend, NativeWindow, OpenRequest, RawEventSink, Realized};
use crate::error::{Error, Result};
use crate::events::KeyArgs;
use crate::framebuffer::{argb_to_image, PresentTarget};
use crate::input::RawEvent;
use crate::pointer::PIXELS_PER_NOTCH;

type Proxy = EventLoopProxy<PlatformRequest>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Work for the platform thread
enum PlatformRequest {
    Open {
        width: u32,
        height: u32,
        title: String,
        events: RawEventSink,
        realized: Realized,
        reply: oneshot::Sender<std::result::Result<Arc<WinitWindow>, String>>,
    },
    Forget(WindowId),
}

/// Where one window's input goes
struct Route {
    events: RawEventSink,
    modifiers: ModifiersState,
}

#[derive(Default)]
struct PlatformApp {
    routes: HashMap<WindowId, Route>,
}

impl ApplicationHandler<PlatformRequest> for PlatformApp {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        // Windows are created on request, see user_event()
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, request: PlatformRequest) {
        match request {
            PlatformRequest::Open {
                width,
                height,
                title,
                events,
                realized,
                reply,
            } => {
                let attributes = WindowAttributes::default()
                    .with_title(title)
                    .with_inner_size(PhysicalSize::new(width, height))
                    .with_resizable(false);
                let window = event_loop
                    .create_window(attributes)
                    .map(Arc::new)
                    .map_err(|err| err.to_string());
                if let Ok(window) = &window {
                    self.routes.insert(
                        window.id(),
                        Route {
                            events,
                            modifiers: ModifiersState::empty(),
                        },
                    );
                    realized.set();
                }
                let _ = reply.send(window);
            }
            PlatformRequest::Forget(id) => {
                self.routes.remove(&id);
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(route) = self.routes.get_mut(&id) else {
            return;
        };
        let Some(raw) = translate(route, event) else {
            return;
        };
        if !route.events.send(raw) {
            self.routes.remove(&id);
        }
    }
}

/// winit → raw input; `None` for events the canvas ignores
#[allow(clippy::cast_possible_truncation)] // cursor coordinates fit in i32
fn translate(route: &mut Route, event: WindowEvent) -> Option<RawEvent> {
    let raw = match event {
        WindowEvent::CloseRequested => RawEvent::CloseRequested,
        WindowEvent::RedrawRequested => RawEvent::Redraw,
        WindowEvent::Moved(position) => RawEvent::Moved(Point::new(position.x, position.y)),
        WindowEvent::CursorEntered { .. } => RawEvent::PointerEnter,
        WindowEvent::CursorLeft { .. } => RawEvent::PointerLeave,
        WindowEvent::CursorMoved { position, .. } => {
            RawEvent::PointerMove(Point::new(position.x as i32, position.y as i32))
        }
        WindowEvent::MouseInput { state, button, .. } => match state {
            ElementState::Pressed => RawEvent::ButtonDown(button),
            ElementState::Released => RawEvent::ButtonUp(button),
        },
        WindowEvent::MouseWheel { delta, .. } => RawEvent::Wheel(notches(delta)),
        WindowEvent::ModifiersChanged(modifiers) => {
            route.modifiers = modifiers.state();
            return None;
        }
        WindowEvent::KeyboardInput { event, .. } => {
            let PhysicalKey::Code(code) = event.physical_key else {
                return None;
            };
            let mut args = KeyArgs::new(code).with_modifiers(route.modifiers);
            if let Some(text) = &event.text {
                args = args.with_text(text.as_str());
            }
            match event.state {
                ElementState::Pressed => RawEvent::KeyDown(args),
                ElementState::Released => RawEvent::KeyUp(args),
            }
        }
        _ => return None,
    };
    Some(raw)
}

/// Touchpads scroll in pixels, mice in lines.
fn notches(delta: MouseScrollDelta) -> f64 {
    match delta {
        MouseScrollDelta::LineDelta(_, lines) => f64::from(lines),
        MouseScrollDelta::PixelDelta(pixels) => pixels.y / PIXELS_PER_NOTCH,
    }
}

fn event_loop() -> std::result::Result<EventLoop<PlatformRequest>, String> {
    #[allow(unused_mut)]
    let mut builder = EventLoop::<PlatformRequest>::with_user_event();
    #[cfg(all(
        unix,
        not(any(target_os = "macos", target_os = "ios", target_os = "android"))
    ))]
    winit::platform::x11::EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    #[cfg(windows)]
    winit::platform::windows::EventLoopBuilderExtWindows::with_any_thread(&mut builder, true);
    builder.build().map_err(|err| err.to_string())
}

fn start_platform() -> std::result::Result<Mutex<Proxy>, String> {
    let (started, proxy) = std::sync::mpsc::channel();
    std::thread::Builder::new()
        .name("easel-platform".into())
        .spawn(move || {
            let event_loop = match event_loop() {
                Ok(event_loop) => event_loop,
                Err(err) => {
                    let _ = started.send(Err(err));
                    return;
                }
            };
            let _ = started.send(Ok(event_loop.create_proxy()));
            tracing::debug!("platform event loop running");
            if let Err(err) = event_loop.run_app(&mut PlatformApp::default()) {
                tracing::error!(error = %err, "platform event loop failed");
            }
        })
        .map_err(|err| err.to_string())?;

    proxy
        .recv()
        .map_err(|_| "platform thread exited".to_owned())?
        .map(Mutex::new)
}

/// Proxy into the process-wide platform thread, starting it on first use
fn platform() -> Result<&'static Mutex<Proxy>> {
    static PLATFORM: OnceLock<std::result::Result<Mutex<Proxy>, String>> = OnceLock::new();
    PLATFORM
        .get_or_init(start_platform)
        .as_ref()
        .map_err(|err| Error::Backend(err.clone()))
}

/// Opens real desktop windows
#[derive(Default)]
pub struct DesktopBackend {
    // Kept alive: on X11 the clipboard owner serves the data.
    clipboard: Mutex<Option<Clipboard>>,
}

impl DesktopBackend {
    /// Create the backend; the platform thread starts with the first window
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for DesktopBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopBackend").finish_non_exhaustive()
    }
}

impl Backend for DesktopBackend {
    fn open(&self, request: OpenRequest) -> Result<Box<dyn NativeWindow>> {
        let proxy = platform()?;
        let (reply, window) = oneshot::channel();
        lock(proxy)
            .send_event(PlatformRequest::Open {
                width: request.width,
                height: request.height,
                title: request.title,
                events: request.events,
                realized: request.realized,
                reply,
            })
            .map_err(|_| Error::Backend("platform event loop closed".into()))?;
        let window = window
            .blocking_recv()
            .map_err(|_| Error::Backend("platform thread exited".into()))?
            .map_err(Error::Backend)?;

        tracing::debug!(id = %request.id, "desktop window created");
        let window = DesktopWindow::new(window, request.width, request.height, proxy)?;
        Ok(Box::new(window))
    }

    fn copy_to_clipboard(&self, image: &RgbaImage) -> Result<()> {
        let mut slot = lock(&self.clipboard);
        let clipboard = match slot.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new().map_err(|err| Error::Clipboard(err.to_string()))?,
        };
        slot.insert(clipboard)
            .set_image(ImageData {
                width: image.width() as usize,
                height: image.height() as usize,
                bytes: Cow::Borrowed(image.as_raw()),
            })
            .map_err(|err| Error::Clipboard(err.to_string()))
    }
}

/// One desktop window, owned by its UI thread
struct DesktopWindow {
    window: Arc<WinitWindow>,
    surface: RefCell<Surface<Arc<WinitWindow>, Arc<WinitWindow>>>,
    contents: RefCell<Vec<u32>>,
    width: u32,
    height: u32,
    proxy: &'static Mutex<Proxy>,
}

impl DesktopWindow {
    fn new(
        window: Arc<WinitWindow>,
        width: u32,
        height: u32,
        proxy: &'static Mutex<Proxy>,
    ) -> Result<Self> {
        let context = Context::new(window.clone()).map_err(|err| Error::Backend(err.to_string()))?;
        let mut surface =
            Surface::new(&context, window.clone()).map_err(|err| Error::Backend(err.to_string()))?;

        // Size is fixed for the window's lifetime: resize once.
        let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            return Err(Error::Backend(format!("cannot create a {width}x{height} surface")));
        };
        surface
            .resize(w, h)
            .map_err(|err| Error::Backend(err.to_string()))?;

        let size = (width as usize).saturating_mul(height as usize);
        let desktop = Self {
            window,
            surface: RefCell::new(surface),
            contents: RefCell::new(vec![0xFFFF_FFFF; size]),
            width,
            height,
            proxy,
        };
        desktop.blit();
        Ok(desktop)
    }

    /// Copy `contents` onto the screen
    fn blit(&self) {
        let mut surface = self.surface.borrow_mut();
        let mut buffer = match surface.buffer_mut() {
            Ok(buffer) => buffer,
            Err(err) => {
                tracing::warn!(error = %err, "surface buffer unavailable");
                return;
            }
        };
        // softbuffer wants 0x00RRGGBB.
        for (dst, &src) in buffer.iter_mut().zip(self.contents.borrow().iter()) {
            *dst = src & 0x00FF_FFFF;
        }
        if let Err(err) = buffer.present() {
            tracing::warn!(error = %err, "present failed");
        }
    }
}

impl PresentTarget for DesktopWindow {
    fn present(&self, pixels: &[u32], width: u32, height: u32) {
        {
            let mut contents = self.contents.borrow_mut();
            if (width, height) != (self.width, self.height) || pixels.len() != contents.len() {
                tracing::warn!(width, height, "frame size does not match window, ignored");
                return;
            }
            contents.copy_from_slice(pixels);
        }
        self.blit();
    }
}

impl NativeWindow for DesktopWindow {
    fn redraw(&self) {
        self.blit();
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn title(&self) -> String {
        self.window.title()
    }

    fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    fn position(&self) -> Point {
        // Wayland does not expose window positions.
        self.window
            .outer_position()
            .map(|position| Point::new(position.x, position.y))
            .unwrap_or_default()
    }

    fn set_position(&self, position: Point) {
        self.window
            .set_outer_position(PhysicalPosition::new(position.x, position.y));
    }

    fn close(&self) {
        self.window.set_visible(false);
        if lock(self.proxy)
            .send_event(PlatformRequest::Forget(self.window.id()))
            .is_err()
        {
            tracing::trace!("platform event loop already closed");
        }
    }

    fn contents(&self) -> RgbaImage {
        argb_to_image(&self.contents.borrow(), self.width, self.height)
    }
}
