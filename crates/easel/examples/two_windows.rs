//! Two Windows Example
//!
//! Two canvases, each animated from its own thread. The palette window is
//! opened with `exit_on_last_close` off: if it is the last one closed the
//! process keeps running until main returns.
//!
//! Run with: cargo run -p easel --example two_windows

use std::thread;
use std::time::Duration;

use easel::{Canvas, CanvasConfig};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut bars = Canvas::with_config(CanvasConfig {
        title: "Bars".into(),
        ..CanvasConfig::with_size(300, 200)
    })?;
    let mut palette = Canvas::with_config(CanvasConfig {
        title: "Palette (stays quiet on close)".into(),
        exit_on_last_close: false,
        ..CanvasConfig::with_size(200, 200)
    })?;
    palette.set_frame_position(Point::new(360, 40));

    let palette_window = palette.window().clone();
    let painter = thread::spawn(move || {
        let mut hue = 0u8;
        while !palette.window().is_closed() {
            hue = hue.wrapping_add(3);
            palette.clear_with(Rgb888::new(hue, 255 - hue, 128));
            palette.show_for(Duration::from_millis(50));
        }
    });

    let bar_window = bars.window().clone();
    let animator = thread::spawn(move || {
        let mut x = 0i32;
        while !bars.window().is_closed() {
            x = (x + 4) % 300;
            bars.clear();
            let _ = Rectangle::new(Point::new(x, 60), Size::new(40, 80))
                .into_styled(PrimitiveStyle::with_fill(Rgb888::CSS_ROYAL_BLUE))
                .draw(&mut bars);
            bars.show_for(Duration::from_millis(16));
        }
    });

    palette_window.wait_until_closed();
    bar_window.wait_until_closed();
    let _ = painter.join();
    let _ = animator.join();
    println!("Both windows closed.");
    Ok(())
}
