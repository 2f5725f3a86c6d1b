//! Event Demo
//!
//! Click to drop a dot, scroll to change its size, hold a key to see
//! auto-repeat (one key-down, many key-pressed). Handlers run on the
//! window's UI thread; drawing from them goes through a shared canvas.
//!
//! Run with: RUST_LOG=info cargo run -p easel --example event_demo

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use easel::Canvas;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let canvas = Canvas::new(500, 400)?;
    canvas.set_title("Click, scroll, type");
    let window = canvas.window().clone();
    let canvas = Arc::new(Mutex::new(canvas));
    let diameter = Arc::new(AtomicI32::new(20));

    let target = canvas.clone();
    let size = diameter.clone();
    window.events().mouse_click.subscribe(move |_, args| {
        let Ok(mut canvas) = target.lock() else {
            return;
        };
        let d = size.load(Ordering::Relaxed).unsigned_abs();
        let _ = Circle::with_center(args.position, d)
            .into_styled(PrimitiveStyle::with_fill(Rgb888::CSS_CRIMSON))
            .draw(&mut *canvas);
        canvas.show();
    });

    window.events().mouse_wheel.subscribe(move |sender, args| {
        let d = (diameter.load(Ordering::Relaxed) + args.wheel_delta * 4).clamp(4, 200);
        diameter.store(d, Ordering::Relaxed);
        sender.set_title(format!("Dot size {d}px"));
    });

    window.events().mouse_enter.subscribe(|_, args| {
        tracing::info!(x = args.position.x, y = args.position.y, "pointer entered");
    });
    window.events().mouse_leave.subscribe(|_, args| {
        tracing::info!(x = args.position.x, y = args.position.y, "pointer left");
    });
    window.events().key_down.subscribe(|_, args| {
        tracing::info!(key = ?args.key, "key down");
    });
    window.events().key_pressed.subscribe(|_, args| {
        tracing::info!(key = ?args.key, text = ?args.text, "key pressed");
    });
    window.events().key_up.subscribe(|_, args| {
        tracing::info!(key = ?args.key, "key up");
    });
    window.events().window_move.subscribe(|sender, ()| {
        if let Ok(position) = sender.position() {
            tracing::info!(x = position.x, y = position.y, "window moved");
        }
    });

    window.wait_until_closed();
    Ok(())
}
