//! Clock Example
//!
//! A second hand sweeping at ~30 frames per second. `show_for` paces the
//! loop: each frame takes at least 33 ms, however fast it was drawn.
//! Closing the window ends the process.
//!
//! Run with: cargo run -p easel --example clock

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use easel::Canvas;
use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle};
use embedded_graphics::text::Text;
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(33);
const CENTER: Point = Point::new(150, 150);
const RADIUS: f32 = 120.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut canvas = Canvas::new(300, 300)?;
    canvas.set_title("Clock");
    let started = Instant::now();

    loop {
        let elapsed = started.elapsed().as_secs_f32();
        let angle = (elapsed % 60.0) / 60.0 * TAU;
        let tip = Point::new(
            CENTER.x + (angle.sin() * RADIUS) as i32,
            CENTER.y - (angle.cos() * RADIUS) as i32,
        );

        canvas.clear();
        Circle::with_center(CENTER, (RADIUS as u32) * 2 + 10)
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::BLACK, 2))
            .draw(&mut canvas)?;
        Line::new(CENTER, tip)
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::RED, 3))
            .draw(&mut canvas)?;
        Text::new(
            &format!("{elapsed:6.1}s"),
            Point::new(10, 290),
            MonoTextStyle::new(&FONT_6X10, Rgb888::BLACK),
        )
        .draw(&mut canvas)?;

        canvas.show_for(FRAME);
    }
}
