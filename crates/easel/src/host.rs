//! Per-window UI thread
//!
//! Every window is owned by one dedicated thread running a blocking FIFO
//! loop. Other threads reach the window only through a [`WindowHandle`],
//! which marshals closures onto that loop. Raw input from the backend lands
//! in the same queue, so marshaled calls and input are handled in arrival
//! order.
//!
//! ```text
//!   caller thread              UI thread (easel-ui-<id>)
//!   ─────────────              ─────────────────────────
//!   invoke_async(f) ──send──►  ┌──────────────────────┐
//!   invoke_sync(f)  ──send──►  │ recv ─► Invoke(f)     │─► f(&native)
//!        ▲                     │      ─► Raw(event)    │─► pipeline ─► router
//!        └──── oneshot ◄────── │      ─► Close         │─► teardown
//!   backend sink ──────send──► └──────────────────────┘
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use embedded_graphics::prelude::Point;
use tokio::sync::oneshot;
use winit::keyboard::KeyCode;

use crate::backend::{Backend, CanvasId, Host, NativeWindow, OpenRequest, RawEventSink, Realized};
use crate::config::CanvasConfig;
use crate::error::{Error, Result};
use crate::events::{Event, EventRouter, KeyArgs};
use crate::framebuffer::FrameBuffer;
use crate::input::{InputPipeline, RawEvent, Routed};
use crate::lifecycle::Lifecycle;

type Action = Box<dyn FnOnce(&dyn NativeWindow) + Send>;

/// One entry in a window's queue
pub(crate) enum UiMessage {
    /// Run a marshaled closure against the native window
    Invoke(Action),
    /// Input from the backend
    Raw(RawEvent),
    /// Leave the loop and tear the window down
    Close,
}

impl std::fmt::Debug for UiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invoke(_) => f.write_str("Invoke(..)"),
            Self::Raw(event) => f.debug_tuple("Raw").field(event).finish(),
            Self::Close => f.write_str("Close"),
        }
    }
}

thread_local! {
    // The native window never leaves the thread that opened it.
    static NATIVE: RefCell<Option<Rc<dyn NativeWindow>>> = const { RefCell::new(None) };
}

/// Run `action` against this thread's native window.
///
/// Nested calls run inline as well: the slot is only borrowed long enough
/// to clone the handle. Returns `false` (dropping the action and any
/// completion signal it holds) if this thread has no window.
fn run_inline(action: Action) -> bool {
    let native = NATIVE.with(|slot| slot.borrow().clone());
    match native {
        Some(native) => {
            action(&*native);
            true
        }
        None => false,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    id: CanvasId,
    size: (u32, u32),
    tx: Sender<UiMessage>,
    router: EventRouter<WindowHandle>,
    backend: Arc<dyn Backend>,
    ui_thread: OnceLock<ThreadId>,
    exit_on_last_close: AtomicBool,
    closed: Mutex<bool>,
    closed_signal: Condvar,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap, clonable, thread-safe reference to one window and its UI thread
#[derive(Clone)]
pub struct WindowHandle {
    shared: Arc<Shared>,
}

impl WindowHandle {
    /// Open a window on a fresh UI thread and wait until it is responsive
    ///
    /// The size is validated before anything is spawned. The call returns
    /// once the backend opened the window, the native handle is realized
    /// (polled every `ready_poll_interval`, at most `ready_timeout`) and a
    /// no-op round-trip through the queue succeeded.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidWidth`]/[`Error::InvalidHeight`] for a bad size,
    /// [`Error::Spawn`] if the thread cannot be created, the backend's error
    /// if opening fails, [`Error::UiThreadExited`] if the thread died first,
    /// [`Error::Unresponsive`] if the handle never became realized.
    ///
    /// # Panics
    ///
    /// When called from inside an async runtime; blocking waits are not
    /// allowed there. Create the window on a blocking thread instead.
    pub fn create(config: &CanvasConfig, host: &Host) -> Result<Self> {
        config.validate()?;

        let id = CanvasId::next();
        let (tx, rx) = mpsc::channel();
        let handle = Self {
            shared: Arc::new(Shared {
                id,
                size: (config.width, config.height),
                tx: tx.clone(),
                router: EventRouter::new(),
                backend: host.backend().clone(),
                ui_thread: OnceLock::new(),
                // Armed once the window is ready: a window that fails to
                // open (even by panicking) never ends the process.
                exit_on_last_close: AtomicBool::new(false),
                closed: Mutex::new(false),
                closed_signal: Condvar::new(),
                thread: Mutex::new(None),
            }),
        };

        let realized = Realized::default();
        let request = OpenRequest {
            id,
            width: config.width,
            height: config.height,
            title: config.title.to_string(),
            events: RawEventSink::new(tx),
            realized: realized.clone(),
        };
        let (ready_tx, ready_rx) = oneshot::channel();
        let ui = handle.clone();
        let lifecycle = host.lifecycle().clone();
        let thread = thread::Builder::new()
            .name(format!("easel-ui-{id}"))
            .spawn(move || ui.run(rx, request, lifecycle, ready_tx))
            .map_err(Error::Spawn)?;
        *lock(&handle.shared.thread) = Some(thread);

        match ready_rx.blocking_recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(%id, error = %err, "window failed to open");
                handle.join();
                return Err(err);
            }
            Err(_) => {
                handle.join();
                return Err(Error::UiThreadExited);
            }
        }

        handle.wait_realized(&realized, config.ready_timeout, config.ready_poll_interval)?;
        if handle.invoke_sync(|_| ()).is_none() {
            handle.join();
            return Err(Error::UiThreadExited);
        }
        handle
            .shared
            .exit_on_last_close
            .store(config.exit_on_last_close, Ordering::SeqCst);
        tracing::debug!(%id, width = config.width, height = config.height, "window ready");
        Ok(handle)
    }

    fn wait_realized(&self, realized: &Realized, timeout: Duration, poll: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while !realized.is_set() {
            if self.is_closed() {
                self.join();
                return Err(Error::UiThreadExited);
            }
            if Instant::now() >= deadline {
                tracing::warn!(id = %self.shared.id, ?timeout, "native handle never realized");
                self.close_with(false);
                return Err(Error::Unresponsive(timeout));
            }
            thread::sleep(poll);
        }
        Ok(())
    }

    /// Body of the UI thread
    fn run(
        self,
        rx: Receiver<UiMessage>,
        request: OpenRequest,
        lifecycle: Arc<Lifecycle>,
        ready: oneshot::Sender<Result<()>>,
    ) {
        let id = self.shared.id;
        let _ = self.shared.ui_thread.set(thread::current().id());
        lifecycle.window_opened();
        let _teardown = Teardown {
            shared: self.shared.clone(),
            lifecycle,
        };

        match self.shared.backend.open(request) {
            Ok(native) => NATIVE.with(|slot| *slot.borrow_mut() = Some(Rc::from(native))),
            Err(err) => {
                let _ = ready.send(Err(err));
                return;
            }
        }
        let _ = ready.send(Ok(()));
        tracing::debug!(%id, "UI loop started");

        let mut pipeline = InputPipeline::new();
        while let Ok(message) = rx.recv() {
            match message {
                UiMessage::Invoke(action) => {
                    run_inline(action);
                }
                UiMessage::Raw(raw) => match pipeline.route(raw) {
                    Routed::Publish(events) => {
                        for event in &events {
                            if let Event::KeyDown(key) = event {
                                copy_shortcut(&self, key);
                            }
                            self.shared.router.publish(&self, event);
                        }
                    }
                    Routed::Redraw => {
                        run_inline(Box::new(|native| native.redraw()));
                    }
                    Routed::Close => break,
                },
                UiMessage::Close => break,
            }
        }
        tracing::debug!(%id, "UI loop finished");
    }

    fn is_ui_thread(&self) -> bool {
        self.shared.ui_thread.get() == Some(&thread::current().id())
    }

    /// Run `action` on the UI thread without waiting for it
    ///
    /// On the UI thread itself the action runs inline, also from inside
    /// another action. If the window is gone the action is dropped.
    pub fn invoke_async<F>(&self, action: F)
    where
        F: FnOnce(&dyn NativeWindow) + Send + 'static,
    {
        let action: Action = Box::new(action);
        if self.is_ui_thread() {
            if !run_inline(action) {
                tracing::trace!(id = %self.shared.id, "window gone, action dropped");
            }
            return;
        }
        if self.shared.tx.send(UiMessage::Invoke(action)).is_err() {
            tracing::trace!(id = %self.shared.id, "window gone, action dropped");
        }
    }

    /// Run `action` on the UI thread and wait for its result
    ///
    /// Returns `None` when the window was destroyed before the action ran.
    ///
    /// # Panics
    ///
    /// When called from inside an async runtime off the UI thread.
    pub fn invoke_sync<R, F>(&self, action: F) -> Option<R>
    where
        F: FnOnce(&dyn NativeWindow) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done, mut result) = oneshot::channel();
        self.invoke_async(move |native| {
            let _ = done.send(action(native));
        });
        if self.is_ui_thread() {
            result.try_recv().ok()
        } else {
            result.blocking_recv().ok()
        }
    }

    fn present_async(&self, frame: &FrameBuffer) -> oneshot::Receiver<()> {
        let frame = frame.clone();
        let (done, presented) = oneshot::channel();
        self.invoke_async(move |native| {
            frame.present_to(native);
            let _ = done.send(());
        });
        presented
    }

    /// Make `frame` visible and wait until it is
    pub fn render(&self, frame: &FrameBuffer) {
        let frame = frame.clone();
        let _ = self.invoke_sync(move |native| frame.present_to(native));
    }

    /// Make `frame` visible, taking at least `min`
    ///
    /// The present is queued first, then the caller sleeps out the rest of
    /// `min`, then waits for the present. Returns after
    /// `max(min, present time)`.
    pub fn render_paced(&self, frame: &FrameBuffer, min: Duration) {
        let started = Instant::now();
        let presented = self.present_async(frame);
        if let Some(rest) = min.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
        if !self.is_ui_thread() {
            let _ = presented.blocking_recv();
        }
    }

    /// [`render`](Self::render) for callers inside a tokio runtime
    pub async fn render_async(&self, frame: &FrameBuffer) {
        let _ = self.present_async(frame).await;
    }

    /// [`render_paced`](Self::render_paced) for callers inside a tokio runtime
    pub async fn render_paced_async(&self, frame: &FrameBuffer, min: Duration) {
        let deadline = tokio::time::Instant::now() + min;
        let presented = self.present_async(frame);
        tokio::time::sleep_until(deadline).await;
        let _ = presented.await;
    }

    /// Current window title
    pub fn title(&self) -> Result<String> {
        self.invoke_sync(|native| native.title())
            .ok_or(Error::Closed)
    }

    /// Change the window title; does not wait
    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.invoke_async(move |native| native.set_title(&title));
    }

    /// Desktop position of the window frame
    pub fn position(&self) -> Result<Point> {
        self.invoke_sync(|native| native.position())
            .ok_or(Error::Closed)
    }

    /// Move the window frame; does not wait
    pub fn set_position(&self, position: Point) {
        self.invoke_async(move |native| native.set_position(position));
    }

    /// Put the visible contents on the system clipboard
    pub fn copy_to_clipboard(&self) -> Result<()> {
        let image = self
            .invoke_sync(|native| native.contents())
            .ok_or(Error::Closed)?;
        self.shared.backend.copy_to_clipboard(&image)
    }

    /// Close with the exit policy the window was created with
    ///
    /// See [`close_with`](Self::close_with).
    pub fn close(&self) {
        self.close_with(self.shared.exit_on_last_close.load(Ordering::SeqCst));
    }

    /// Close the window and release its UI thread
    ///
    /// `exit_on_last_close` replaces the window's exit policy. Off the UI
    /// thread this waits until every resource is released; on the UI thread
    /// the close is queued behind the current work and not awaited.
    pub fn close_with(&self, exit_on_last_close: bool) {
        self.shared
            .exit_on_last_close
            .store(exit_on_last_close, Ordering::SeqCst);
        if self.shared.tx.send(UiMessage::Close).is_err() {
            tracing::trace!(id = %self.shared.id, "window already gone");
        }
        if !self.is_ui_thread() {
            self.join();
        }
    }

    fn join(&self) {
        self.wait_until_closed();
        let thread = lock(&self.shared.thread).take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!(id = %self.shared.id, "UI thread panicked");
            }
        }
    }

    /// Block until the window has been closed, by the user or by code
    ///
    /// Returns immediately on the UI thread.
    pub fn wait_until_closed(&self) {
        if self.is_ui_thread() {
            return;
        }
        let mut closed = lock(&self.shared.closed);
        while !*closed {
            closed = self
                .shared
                .closed_signal
                .wait(closed)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Whether the window has finished closing
    pub fn is_closed(&self) -> bool {
        *lock(&self.shared.closed)
    }

    /// Window identity
    pub fn id(&self) -> CanvasId {
        self.shared.id
    }

    /// Client-area size, fixed at creation
    pub fn size(&self) -> (u32, u32) {
        self.shared.size
    }

    /// Event channels; handlers run on the UI thread
    pub fn events(&self) -> &EventRouter<WindowHandle> {
        &self.shared.router
    }
}

impl PartialEq for WindowHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for WindowHandle {}

impl std::fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowHandle")
            .field("id", &self.shared.id)
            .field("size", &self.shared.size)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Ctrl+C copies the visible contents.
fn copy_shortcut(window: &WindowHandle, key: &KeyArgs) {
    if key.key == KeyCode::KeyC && key.modifiers.control_key() {
        if let Err(err) = window.copy_to_clipboard() {
            tracing::warn!(id = %window.id(), error = %err, "copy to clipboard failed");
        }
    }
}

/// Releases the window when the UI thread ends, including by panic
struct Teardown {
    shared: Arc<Shared>,
    lifecycle: Arc<Lifecycle>,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        let native = NATIVE.with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()));
        if let Some(native) = native {
            native.close();
        }

        let exit = self.shared.exit_on_last_close.load(Ordering::SeqCst);
        self.lifecycle.window_closed(exit);
        tracing::debug!(id = %self.shared.id, "window closed");

        *lock(&self.shared.closed) = true;
        self.shared.closed_signal.notify_all();
    }
}
