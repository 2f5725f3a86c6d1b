//! CPU-side off-screen frame buffer
//!
//! Drawing goes here through `embedded-graphics`; nothing becomes visible
//! until the buffer is presented. The buffer belongs to the thread that
//! draws into it and is never touched by a UI thread: presenting hands the
//! UI thread a copy.

use std::convert::Infallible;

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Point, Size};
use image::{Rgba, RgbaImage};

/// Anything a frame can be blitted onto
///
/// Takes `&self`: a present may be issued while an outer call on the same
/// window is still running.
pub trait PresentTarget {
    /// Replace the visible contents with `pixels` (`0xAARRGGBB`, row-major,
    /// `width × height`)
    fn present(&self, pixels: &[u32], width: u32, height: u32);
}

/// Pack a color as `0xFFRRGGBB`
pub fn to_argb(color: Rgb888) -> u32 {
    0xFF00_0000 | (u32::from(color.r()) << 16) | (u32::from(color.g()) << 8) | u32::from(color.b())
}

/// Unpack `0xAARRGGBB`, ignoring alpha
#[allow(clippy::cast_possible_truncation)] // each channel is masked to 8 bits
pub fn from_argb(pixel: u32) -> Rgb888 {
    Rgb888::new((pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8)
}

/// Convert `0xAARRGGBB` row-major pixels to an opaque image
///
/// Missing pixels (a short slice) come out white.
pub fn argb_to_image(pixels: &[u32], width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let index = (y as usize) * (width as usize) + (x as usize);
        let [_, r, g, b] = pixels.get(index).copied().unwrap_or(0xFFFF_FFFF).to_be_bytes();
        Rgba([r, g, b, 255])
    })
}

/// Fixed-size pixel surface the caller draws into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Create a buffer filled with white
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize).saturating_mul(height as usize);
        Self {
            pixels: vec![to_argb(Rgb888::WHITE); size],
            width,
            height,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw `0xAARRGGBB` pixels, row-major
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize) * (self.width as usize) + (x as usize))
    }

    /// Set pixel at coordinates; out-of-bounds writes are clipped
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb888) {
        if let Some(slot) = self.index(x, y).and_then(|i| self.pixels.get_mut(i)) {
            *slot = to_argb(color);
        }
    }

    /// Get pixel at coordinates
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        self.index(x, y)
            .and_then(|i| self.pixels.get(i))
            .map(|&pixel| from_argb(pixel))
    }

    /// Fill entire buffer with color
    pub fn fill(&mut self, color: Rgb888) {
        self.pixels.fill(to_argb(color));
    }

    /// Clear buffer (fill with white)
    pub fn clear(&mut self) {
        self.fill(Rgb888::WHITE);
    }

    /// Blend `image` onto the buffer with its top-left corner at `top_left`
    ///
    /// Alpha is honored; parts outside the buffer are clipped.
    pub fn draw_image(&mut self, top_left: Point, image: &RgbaImage) {
        for (ix, iy, &Rgba([r, g, b, a])) in image.enumerate_pixels() {
            let (Ok(x), Ok(y)) = (
                u32::try_from(top_left.x.saturating_add_unsigned(ix)),
                u32::try_from(top_left.y.saturating_add_unsigned(iy)),
            ) else {
                continue;
            };
            let Some(dst) = self.get_pixel(x, y) else {
                continue;
            };
            let color = match a {
                0 => continue,
                255 => Rgb888::new(r, g, b),
                _ => Rgb888::new(
                    blend(r, dst.r(), a),
                    blend(g, dst.g(), a),
                    blend(b, dst.b(), a),
                ),
            };
            self.set_pixel(x, y, color);
        }
    }

    /// Blit the whole buffer onto `target`
    pub fn present_to<T: PresentTarget + ?Sized>(&self, target: &T) {
        target.present(&self.pixels, self.width, self.height);
    }

    /// Independent copy of the current contents
    pub fn snapshot(&self) -> RgbaImage {
        argb_to_image(&self.pixels, self.width, self.height)
    }
}

#[allow(clippy::cast_possible_truncation)] // result is at most 255
fn blend(src: u8, dst: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    ((u32::from(src) * a + u32::from(dst) * (255 - a) + 127) / 255) as u8
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}
