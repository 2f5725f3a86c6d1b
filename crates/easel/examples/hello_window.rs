//! Hello Window Example
//!
//! Opens a canvas, draws a few shapes and some text, shows it and waits for
//! the window to be closed. Ctrl+C copies the canvas to the clipboard.
//!
//! Run with: cargo run -p easel --example hello_window

use easel::{Canvas, CanvasConfig};
use embedded_graphics::mono_font::{
    ascii::{FONT_6X10, FONT_9X18_BOLD},
    MonoTextStyle,
};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    Circle, CornerRadii, Line, PrimitiveStyle, Rectangle, RoundedRectangle,
};
use embedded_graphics::text::Text;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = CanvasConfig {
        title: "Hello, easel".into(),
        ..CanvasConfig::with_size(400, 240)
    };
    let mut canvas = Canvas::with_config(config)?;

    RoundedRectangle::new(
        Rectangle::new(Point::new(10, 10), Size::new(380, 220)),
        CornerRadii::new(Size::new(12, 12)),
    )
    .into_styled(PrimitiveStyle::with_stroke(Rgb888::CSS_STEEL_BLUE, 3))
    .draw(&mut canvas)?;

    Text::new(
        "Hello from easel",
        Point::new(120, 60),
        MonoTextStyle::new(&FONT_9X18_BOLD, Rgb888::BLACK),
    )
    .draw(&mut canvas)?;

    Circle::new(Point::new(60, 100), 80)
        .into_styled(PrimitiveStyle::with_fill(Rgb888::CSS_ORANGE))
        .draw(&mut canvas)?;
    Line::new(Point::new(170, 140), Point::new(360, 140))
        .into_styled(PrimitiveStyle::with_stroke(Rgb888::CSS_DARK_GREEN, 2))
        .draw(&mut canvas)?;
    Text::new(
        "Ctrl+C copies this window",
        Point::new(170, 170),
        MonoTextStyle::new(&FONT_6X10, Rgb888::CSS_DIM_GRAY),
    )
    .draw(&mut canvas)?;

    canvas.show();

    println!("Window opened. Close it to exit.");
    canvas.run();
    Ok(())
}
