//! Input flowing from a backend through the UI thread to subscribers.

// Test file — unwrap/expect/panic acceptable in test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::cast_sign_loss
)]

use std::sync::{Arc, Mutex};
use std::thread;

use easel::{
    CanvasConfig, HeadlessBackend, HeadlessProbe, Host, KeyArgs, KeyCode, Lifecycle,
    ModifiersState, MouseArgs, MouseButton, RawEvent, WindowHandle,
};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

struct Fixture {
    backend: Arc<HeadlessBackend>,
    lifecycle: Arc<Lifecycle>,
    exits: Arc<Mutex<Vec<i32>>>,
    window: WindowHandle,
    probe: HeadlessProbe,
}

impl Fixture {
    fn new() -> Self {
        let backend = Arc::new(HeadlessBackend::new());
        let exits = Arc::new(Mutex::new(Vec::new()));
        let recorded = exits.clone();
        let lifecycle = Arc::new(Lifecycle::with_exit_hook(move |code| {
            recorded.lock().unwrap().push(code);
        }));
        let host = Host::new(backend.clone(), lifecycle.clone());
        let window = WindowHandle::create(&CanvasConfig::with_size(300, 200), &host).unwrap();
        let probe = backend.probe(window.id()).unwrap();
        Self {
            backend,
            lifecycle,
            exits,
            window,
            probe,
        }
    }

    fn send(&self, events: impl IntoIterator<Item = RawEvent>) {
        for event in events {
            assert!(self.probe.send(event));
        }
        // Anything queued before this round-trip has been dispatched.
        self.window.invoke_sync(|_| ()).unwrap();
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.window.close_with(false);
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn mouse_log(window: &WindowHandle, log: &Log) {
    let router = window.events();
    let channels = [
        ("click", &router.mouse_click),
        ("move", &router.mouse_move),
        ("down", &router.mouse_down),
        ("up", &router.mouse_up),
        ("wheel", &router.mouse_wheel),
        ("enter", &router.mouse_enter),
        ("leave", &router.mouse_leave),
    ];
    for (name, channel) in channels {
        let log = log.clone();
        channel.subscribe(move |_, args: &MouseArgs| {
            log.lock().unwrap().push(format!(
                "{name} {},{} {}",
                args.position.x, args.position.y, args.wheel_delta
            ));
        });
    }
}

fn key_log(window: &WindowHandle, log: &Log) {
    let router = window.events();
    let channels = [
        ("down", &router.key_down),
        ("pressed", &router.key_pressed),
        ("up", &router.key_up),
    ];
    for (name, channel) in channels {
        let log = log.clone();
        channel.subscribe(move |_, args: &KeyArgs| {
            log.lock().unwrap().push(format!("{name} {:?}", args.key));
        });
    }
}

#[test]
fn test_auto_repeat_yields_one_key_down() {
    let f = Fixture::new();
    let log = log();
    key_log(&f.window, &log);
    let a = KeyArgs::new(KeyCode::KeyA);

    f.send([
        RawEvent::KeyDown(a.clone()),
        RawEvent::KeyDown(a.clone()),
        RawEvent::KeyDown(a.clone()),
        RawEvent::KeyUp(a),
    ]);

    assert_eq!(
        *log.lock().unwrap(),
        [
            "down KeyA",
            "pressed KeyA",
            "pressed KeyA",
            "pressed KeyA",
            "up KeyA"
        ]
    );
}

#[test]
fn test_interleaved_keys_are_independent() {
    let f = Fixture::new();
    let log = log();
    key_log(&f.window, &log);
    let a = KeyArgs::new(KeyCode::KeyA);
    let b = KeyArgs::new(KeyCode::KeyB);

    f.send([
        RawEvent::KeyDown(a.clone()),
        RawEvent::KeyDown(b.clone()),
        RawEvent::KeyDown(a.clone()),
        RawEvent::KeyUp(b.clone()),
        RawEvent::KeyDown(b),
        RawEvent::KeyUp(a),
    ]);

    assert_eq!(
        *log.lock().unwrap(),
        [
            "down KeyA",
            "pressed KeyA",
            "down KeyB",
            "pressed KeyB",
            "pressed KeyA",
            "up KeyB",
            "down KeyB",
            "pressed KeyB",
            "up KeyA"
        ]
    );
}

#[test]
fn test_enter_is_reported_at_first_move() {
    let f = Fixture::new();
    let log = log();
    mouse_log(&f.window, &log);

    f.send([
        RawEvent::PointerEnter,
        RawEvent::PointerMove(Point::new(10, 10)),
        RawEvent::PointerMove(Point::new(12, 11)),
        RawEvent::PointerLeave,
    ]);

    assert_eq!(
        *log.lock().unwrap(),
        [
            "enter 10,10 0",
            "move 10,10 0",
            "move 12,11 0",
            "leave 12,11 0"
        ]
    );
}

#[test]
fn test_leave_without_move_is_silent() {
    let f = Fixture::new();
    let log = log();
    mouse_log(&f.window, &log);

    f.send([RawEvent::PointerEnter, RawEvent::PointerLeave]);

    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_click_and_wheel() {
    let f = Fixture::new();
    let log = log();
    mouse_log(&f.window, &log);

    f.send([
        RawEvent::PointerMove(Point::new(40, 30)),
        RawEvent::ButtonDown(MouseButton::Left),
        RawEvent::ButtonUp(MouseButton::Left),
        RawEvent::Wheel(1.0),
        RawEvent::Wheel(-0.5),
        RawEvent::Wheel(-0.5),
    ]);

    assert_eq!(
        *log.lock().unwrap(),
        [
            "move 40,30 0",
            "down 40,30 0",
            "click 40,30 0",
            "up 40,30 0",
            "wheel 40,30 1",
            "wheel 40,30 -1"
        ]
    );
}

#[test]
fn test_window_move_publishes_unit_payload() {
    let f = Fixture::new();
    let moves = Arc::new(Mutex::new(0));
    let counted = moves.clone();
    f.window.events().window_move.subscribe(move |_, ()| {
        *counted.lock().unwrap() += 1;
    });

    f.send([
        RawEvent::Moved(Point::new(5, 5)),
        RawEvent::Moved(Point::new(9, 5)),
    ]);

    assert_eq!(*moves.lock().unwrap(), 2);
}

#[test]
fn test_handlers_run_on_ui_thread_with_window_as_sender() {
    let f = Fixture::new();
    let seen = Arc::new(Mutex::new(None));
    let record = seen.clone();
    f.window.events().mouse_move.subscribe(move |sender, _| {
        let name = thread::current().name().map(str::to_owned);
        *record.lock().unwrap() = Some((sender.clone(), name));
    });

    f.send([RawEvent::PointerMove(Point::new(1, 2))]);

    let (sender, name) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(sender, f.window);
    assert_eq!(name, Some(format!("easel-ui-{}", f.window.id())));
}

#[test]
fn test_handler_can_unsubscribe_itself() {
    let f = Fixture::new();
    let calls = Arc::new(Mutex::new(0));
    let id = Arc::new(Mutex::new(None));

    let counted = calls.clone();
    let own_id = id.clone();
    let subscription = f.window.events().key_up.subscribe(move |sender, _| {
        *counted.lock().unwrap() += 1;
        if let Some(id) = own_id.lock().unwrap().take() {
            sender.events().key_up.unsubscribe(id);
        }
    });
    *id.lock().unwrap() = Some(subscription);

    let q = KeyArgs::new(KeyCode::KeyQ);
    f.send([RawEvent::KeyUp(q.clone()), RawEvent::KeyUp(q)]);

    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn test_handler_can_render_inline() {
    let f = Fixture::new();
    f.window.events().mouse_click.subscribe(|sender, args| {
        let mut frame = easel::FrameBuffer::new(300, 200);
        frame.set_pixel(args.position.x as u32, args.position.y as u32, Rgb888::RED);
        sender.render(&frame);
    });

    f.send([
        RawEvent::PointerMove(Point::new(3, 0)),
        RawEvent::ButtonDown(MouseButton::Left),
        RawEvent::ButtonUp(MouseButton::Left),
    ]);

    assert_eq!(f.probe.visible()[3], 0xFFFF_0000);
}

#[test]
fn test_ctrl_c_copies_visible_contents() {
    let f = Fixture::new();
    let mut frame = easel::FrameBuffer::new(300, 200);
    frame.fill(Rgb888::GREEN);
    f.window.render(&frame);

    f.send([
        RawEvent::KeyDown(KeyArgs::new(KeyCode::KeyC)),
        RawEvent::KeyUp(KeyArgs::new(KeyCode::KeyC)),
    ]);
    assert!(f.backend.clipboard().is_none());

    f.send([RawEvent::KeyDown(
        KeyArgs::new(KeyCode::KeyC).with_modifiers(ModifiersState::CONTROL),
    )]);
    let copied = f.backend.clipboard().unwrap();
    assert_eq!(copied.get_pixel(0, 0).0, [0, 255, 0, 255]);
}

#[test]
fn test_ctrl_c_is_not_a_visible_subscription() {
    let f = Fixture::new();
    assert!(f.window.events().key_down.is_empty());

    // Handlers may come and go without touching the shortcut.
    let id = f.window.events().key_down.subscribe(|_, _| {});
    f.window.events().key_down.unsubscribe(id);
    f.send([RawEvent::KeyDown(
        KeyArgs::new(KeyCode::KeyC).with_modifiers(ModifiersState::CONTROL),
    )]);

    assert!(f.backend.clipboard().is_some());
}

#[test]
fn test_user_close_ends_the_window_and_exits_when_last() {
    let backend = Arc::new(HeadlessBackend::new());
    let exits = Arc::new(Mutex::new(Vec::new()));
    let recorded = exits.clone();
    let lifecycle = Arc::new(Lifecycle::with_exit_hook(move |code| {
        recorded.lock().unwrap().push(code);
    }));
    let host = Host::new(backend.clone(), lifecycle.clone());
    let window = WindowHandle::create(&CanvasConfig::with_size(300, 200), &host).unwrap();

    backend
        .probe(window.id())
        .unwrap()
        .send(RawEvent::CloseRequested);
    window.wait_until_closed();

    assert_eq!(lifecycle.open_windows(), 0);
    assert_eq!(*exits.lock().unwrap(), [0]);
    assert_eq!(window.invoke_sync(|_| ()), None);
}

#[test]
fn test_fixture_close_does_not_exit() {
    let f = Fixture::new();
    f.window.close_with(false);
    assert_eq!(f.lifecycle.open_windows(), 0);
    assert!(f.exits.lock().unwrap().is_empty());
}
