//! UI-thread host tests, run against the headless backend with an isolated
//! lifecycle so nothing here can end the test process.

// Test file — unwrap/expect/panic acceptable in test code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use easel::{
    Backend, Canvas, CanvasConfig, Error, FrameBuffer, HeadlessBackend, Host, Lifecycle,
    NativeWindow, OpenRequest, RawEvent, Realization, WindowHandle,
};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use image::RgbaImage;

struct Harness {
    backend: Arc<HeadlessBackend>,
    lifecycle: Arc<Lifecycle>,
    exits: Arc<Mutex<Vec<i32>>>,
    host: Host,
}

fn recording_host(backend: Arc<dyn Backend>) -> (Host, Arc<Lifecycle>, Arc<Mutex<Vec<i32>>>) {
    let exits = Arc::new(Mutex::new(Vec::new()));
    let recorded = exits.clone();
    let lifecycle = Arc::new(Lifecycle::with_exit_hook(move |code| {
        recorded.lock().unwrap().push(code);
    }));
    (Host::new(backend, lifecycle.clone()), lifecycle, exits)
}

fn harness_with(backend: HeadlessBackend) -> Harness {
    let backend = Arc::new(backend);
    let (host, lifecycle, exits) = recording_host(backend.clone());
    Harness {
        backend,
        lifecycle,
        exits,
        host,
    }
}

fn harness() -> Harness {
    harness_with(HeadlessBackend::new())
}

fn config(width: u32, height: u32) -> CanvasConfig {
    CanvasConfig::with_size(width, height)
}

#[test]
fn test_create_opens_one_window() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();

    assert_eq!(h.backend.opened(), 1);
    assert_eq!(h.lifecycle.open_windows(), 1);
    assert_eq!(window.size(), (200, 100));
    assert_eq!(window.title().unwrap(), "Canvas");
    assert!(!window.is_closed());
    let probe = h.backend.probe(window.id()).unwrap();

    window.close_with(false);
    assert!(window.is_closed());
    assert_eq!(h.lifecycle.open_windows(), 0);
    assert!(probe.is_closed());
}

#[test]
fn test_closed_windows_are_forgotten_by_the_backend() {
    let h = harness();
    let first = WindowHandle::create(&config(200, 100), &h.host).unwrap();
    let second = WindowHandle::create(&config(200, 100), &h.host).unwrap();
    assert_eq!(h.backend.open_now(), 2);

    first.close_with(false);

    assert!(h.backend.probe(first.id()).is_none());
    assert!(h.backend.probe(second.id()).is_some());
    assert_eq!(h.backend.open_now(), 1);
    assert_eq!(h.backend.opened(), 2);
    second.close_with(false);
    assert_eq!(h.backend.open_now(), 0);
}

#[test]
fn test_invalid_size_fails_before_anything_opens() {
    let h = harness();

    let err = Canvas::with_host(config(149, 100), &h.host).unwrap_err();
    assert!(matches!(err, Error::InvalidWidth(149)));

    let err = Canvas::with_host(config(150, 0), &h.host).unwrap_err();
    assert!(matches!(err, Error::InvalidHeight(0)));

    assert_eq!(h.backend.opened(), 0);
    assert_eq!(h.lifecycle.open_windows(), 0);
}

#[test]
fn test_minimum_size_is_accepted() {
    let h = harness();
    let canvas = Canvas::with_host(config(150, 1), &h.host).unwrap();
    assert_eq!(canvas.size(), Size::new(150, 1));
    canvas.close_with(false);
}

#[test]
fn test_backend_failure_is_reported_and_not_fatal() {
    let h = harness_with(HeadlessBackend::new().failing("no display"));

    let err = WindowHandle::create(&config(300, 200), &h.host).unwrap_err();
    assert!(matches!(err, Error::Backend(ref message) if message == "no display"));
    assert_eq!(h.lifecycle.open_windows(), 0);
    assert!(h.exits.lock().unwrap().is_empty());
}

/// `open` crashes, as a faulty driver would.
struct CrashingBackend;

impl Backend for CrashingBackend {
    fn open(&self, _: OpenRequest) -> easel::Result<Box<dyn NativeWindow>> {
        panic!("driver crashed while opening");
    }

    fn copy_to_clipboard(&self, _: &RgbaImage) -> easel::Result<()> {
        Ok(())
    }
}

/// Opens a window that the user closes before it is ever realized.
struct ClosedWhileOpening(HeadlessBackend);

impl Backend for ClosedWhileOpening {
    fn open(&self, request: OpenRequest) -> easel::Result<Box<dyn NativeWindow>> {
        let events = request.events.clone();
        let native = self.0.open(request)?;
        events.send(RawEvent::CloseRequested);
        Ok(native)
    }

    fn copy_to_clipboard(&self, image: &RgbaImage) -> easel::Result<()> {
        self.0.copy_to_clipboard(image)
    }
}

#[test]
fn test_crash_while_opening_is_reported_and_not_fatal() {
    let (host, lifecycle, exits) = recording_host(Arc::new(CrashingBackend));

    let err = WindowHandle::create(&config(300, 200), &host).unwrap_err();

    assert!(matches!(err, Error::UiThreadExited));
    assert_eq!(lifecycle.open_windows(), 0);
    assert!(exits.lock().unwrap().is_empty());
}

#[test]
fn test_window_closed_before_ready_is_not_fatal() {
    let backend = HeadlessBackend::new().with_realization(Realization::Never);
    let (host, lifecycle, exits) = recording_host(Arc::new(ClosedWhileOpening(backend)));
    let config = CanvasConfig {
        ready_timeout: Duration::from_secs(5),
        ..config(300, 200)
    };

    let started = Instant::now();
    let err = WindowHandle::create(&config, &host).unwrap_err();

    assert!(matches!(err, Error::UiThreadExited));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(lifecycle.open_windows(), 0);
    assert!(exits.lock().unwrap().is_empty());
}

#[test]
fn test_never_realized_window_is_unresponsive() {
    let h = harness_with(HeadlessBackend::new().with_realization(Realization::Never));
    let config = CanvasConfig {
        ready_timeout: Duration::from_millis(100),
        ..config(300, 200)
    };

    let err = WindowHandle::create(&config, &h.host).unwrap_err();
    assert!(matches!(err, Error::Unresponsive(timeout) if timeout == Duration::from_millis(100)));
    assert_eq!(h.lifecycle.open_windows(), 0);
    assert!(h.exits.lock().unwrap().is_empty());
}

#[test]
fn test_slow_realization_is_awaited() {
    let h = harness_with(
        HeadlessBackend::new().with_realization(Realization::Delayed(Duration::from_millis(60))),
    );

    let started = Instant::now();
    let window = WindowHandle::create(&config(300, 200), &h.host).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert!(window.invoke_sync(|_| true).unwrap());
    window.close_with(false);
}

#[test]
fn test_invoke_sync_serializes_callers() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();
    let counter = Arc::new(AtomicU64::new(0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let window = window.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..250 {
                    let counter = counter.clone();
                    // Non-atomic read-modify-write: only exact if actions never overlap.
                    window
                        .invoke_sync(move |_| {
                            let value = counter.load(Ordering::Relaxed);
                            counter.store(value + 1, Ordering::Relaxed);
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(counter.load(Ordering::Relaxed), 1000);
    window.close_with(false);
}

#[test]
fn test_actions_run_in_submission_order() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..50 {
        let log = log.clone();
        window.invoke_async(move |_| log.lock().unwrap().push(i));
    }
    window.invoke_sync(|_| ()).unwrap();

    assert_eq!(*log.lock().unwrap(), (0..50).collect::<Vec<_>>());
    window.close_with(false);
}

#[test]
fn test_render_makes_frame_visible() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();
    let mut frame = FrameBuffer::new(200, 100);
    frame.fill(Rgb888::BLUE);

    window.render(&frame);

    let probe = h.backend.probe(window.id()).unwrap();
    assert_eq!(probe.visible(), frame.pixels());
    assert_eq!(probe.presents(), 1);
    window.close_with(false);
}

#[test]
fn test_render_paced_takes_at_least_the_floor() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();
    let mut frame = FrameBuffer::new(200, 100);
    frame.fill(Rgb888::GREEN);

    let started = Instant::now();
    window.render_paced(&frame, Duration::from_millis(50));
    assert!(started.elapsed() >= Duration::from_millis(50));

    let probe = h.backend.probe(window.id()).unwrap();
    assert_eq!(probe.visible(), frame.pixels());
    window.close_with(false);
}

#[test]
fn test_render_paced_zero_floor_still_presents() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();
    let mut frame = FrameBuffer::new(200, 100);
    frame.set_pixel(1, 1, Rgb888::RED);

    window.render_paced(&frame, Duration::ZERO);

    assert_eq!(h.backend.probe(window.id()).unwrap().visible(), frame.pixels());
    window.close_with(false);
}

#[test]
fn test_render_async_variants() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();
    let mut frame = FrameBuffer::new(200, 100);
    frame.fill(Rgb888::CYAN);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let elapsed = runtime.block_on(async {
        window.render_async(&frame).await;
        let started = tokio::time::Instant::now();
        window.render_paced_async(&frame, Duration::from_millis(30)).await;
        started.elapsed()
    });

    assert!(elapsed >= Duration::from_millis(30));
    let probe = h.backend.probe(window.id()).unwrap();
    assert_eq!(probe.visible(), frame.pixels());
    assert_eq!(probe.presents(), 2);
    window.close_with(false);
}

#[test]
fn test_title_and_position() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();

    window.set_title("Renamed");
    window.set_position(Point::new(120, 80));

    // Setters are queued; the getters queue behind them.
    assert_eq!(window.title().unwrap(), "Renamed");
    assert_eq!(window.position().unwrap(), Point::new(120, 80));
    let probe = h.backend.probe(window.id()).unwrap();
    assert_eq!(probe.title(), "Renamed");
    assert_eq!(probe.position(), Point::new(120, 80));
    window.close_with(false);
}

#[test]
fn test_calls_after_close_never_hang() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();
    window.close_with(false);

    assert_eq!(window.invoke_sync(|_| 42), None);
    assert!(matches!(window.title(), Err(Error::Closed)));
    assert!(matches!(window.copy_to_clipboard(), Err(Error::Closed)));
    window.set_title("ignored");
    window.render(&FrameBuffer::new(200, 100));
    window.render_paced(&FrameBuffer::new(200, 100), Duration::from_millis(5));
    window.close();
}

#[test]
fn test_copy_to_clipboard_uses_visible_contents() {
    let h = harness();
    let mut canvas = Canvas::with_host(config(200, 100), &h.host).unwrap();
    canvas.clear_with(Rgb888::RED);
    canvas.show();
    // Drawn but not shown: must not reach the clipboard.
    canvas.clear_with(Rgb888::BLUE);

    canvas.copy_to_clipboard().unwrap();

    let copied = h.backend.clipboard().unwrap();
    assert_eq!(copied.dimensions(), (200, 100));
    assert_eq!(copied.get_pixel(10, 10).0, [255, 0, 0, 255]);
    canvas.close_with(false);
}

#[test]
fn test_canvas_starts_white_and_titled() {
    let h = harness();
    let config = CanvasConfig {
        title: "Sketch".into(),
        ..config(160, 90)
    };
    let canvas = Canvas::with_host(config, &h.host).unwrap();

    let probe = h.backend.probe(canvas.window().id()).unwrap();
    assert_eq!(probe.presents(), 1);
    assert!(probe.visible().iter().all(|&pixel| pixel == 0xFFFF_FFFF));
    assert_eq!(canvas.title().unwrap(), "Sketch");
    canvas.close_with(false);
}

#[test]
fn test_snapshot_is_independent_of_later_drawing() {
    let h = harness();
    let mut canvas = Canvas::with_host(config(200, 100), &h.host).unwrap();
    Rectangle::new(Point::new(0, 0), Size::new(20, 20))
        .into_styled(PrimitiveStyle::with_fill(Rgb888::GREEN))
        .draw(&mut canvas)
        .unwrap();

    let before = canvas.snapshot();
    canvas.clear_with(Rgb888::BLACK);

    assert_eq!(before.get_pixel(5, 5).0, [0, 255, 0, 255]);
    assert_eq!(before.get_pixel(50, 50).0, [255, 255, 255, 255]);
    assert_eq!(canvas.snapshot().get_pixel(5, 5).0, [0, 0, 0, 255]);
    canvas.close_with(false);
}

#[test]
fn test_canvas_moves_between_threads() {
    let h = harness();
    let mut canvas = Canvas::with_host(config(200, 100), &h.host).unwrap();
    let id = canvas.window().id();

    let canvas = thread::spawn(move || {
        canvas.clear_with(Rgb888::MAGENTA);
        canvas.show();
        canvas
    })
    .join()
    .unwrap();

    let probe = h.backend.probe(id).unwrap();
    assert_eq!(probe.visible(), canvas.framebuffer().pixels());
    canvas.close_with(false);
}

#[test]
fn test_wait_until_closed_wakes_other_threads() {
    let h = harness();
    let window = WindowHandle::create(&config(200, 100), &h.host).unwrap();

    let waiter = {
        let window = window.clone();
        thread::spawn(move || {
            window.wait_until_closed();
            window.is_closed()
        })
    };
    thread::sleep(Duration::from_millis(20));
    window.close_with(false);

    assert!(waiter.join().unwrap());
}
