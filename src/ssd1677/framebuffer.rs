//! Packed 1-bpp pixel store with drawing primitives
//!
//! Bit `7 - x % 8` of byte `(x + y * width) / 8` holds pixel `(x, y)`.
//! A set bit is white, a cleared bit is black, matching panel RAM so the
//! buffer can be streamed without conversion.

use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::{Dimensions, DrawTarget, OriginDimensions, Pixel, Size},
    primitives::Rectangle,
};

use crate::ssd1677::color::Color;
use crate::ssd1677::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

/// Length in bytes of a packed buffer for the given size
pub fn buffer_len(width: u32, height: u32) -> usize {
    (width / 8) as usize * height as usize
}

impl Framebuffer {
    /// Allocate an all-white buffer.
    ///
    /// Both dimensions must be non-zero multiples of 8.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || width % 8 != 0 || height % 8 != 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Framebuffer {
            width,
            height,
            bytes: vec![Color::White.get_byte_value(); buffer_len(width, height)],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<(usize, u8)> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        let idx = (x + y * self.width as usize) / 8;
        let mask = 0x80 >> (x % 8);
        Some((idx, mask))
    }

    /// Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some((idx, mask)) = self.index(x, y) {
            match color {
                Color::White => self.bytes[idx] |= mask,
                Color::Black => self.bytes[idx] &= !mask,
            }
        }
    }

    /// `None` outside the buffer
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|(idx, mask)| {
            if self.bytes[idx] & mask != 0 {
                Color::White
            } else {
                Color::Black
            }
        })
    }

    /// Pixels off the buffer are skipped, the run itself may be any length
    pub fn draw_h_line(&mut self, x: i32, y: i32, len: u32, color: Color) {
        let (start, end) = visible_run(x, len, self.width);
        for px in start..end {
            self.set_pixel(px, y, color);
        }
    }

    pub fn draw_v_line(&mut self, x: i32, y: i32, len: u32, color: Color) {
        let (start, end) = visible_run(y, len, self.height);
        for py in start..end {
            self.set_pixel(x, py, color);
        }
    }

    /// Outline only. Corners are shared by the horizontal and vertical runs.
    pub fn draw_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        if w == 0 || h == 0 {
            return;
        }
        let right = x.saturating_add_unsigned(w - 1);
        let bottom = y.saturating_add_unsigned(h - 1);
        self.draw_h_line(x, y, w, color);
        self.draw_h_line(x, bottom, w, color);
        self.draw_v_line(x, y, h, color);
        self.draw_v_line(right, y, h, color);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        let (start, end) = visible_run(y, h, self.height);
        for py in start..end {
            self.draw_h_line(x, py, w, color);
        }
    }

    /// Everything white
    pub fn clear(&mut self) {
        self.fill(Color::White);
    }

    pub fn fill(&mut self, color: Color) {
        self.bytes.fill(color.get_byte_value());
    }

    /// Replace the contents with already packed panel data.
    ///
    /// A buffer of the wrong length is rejected and the current contents kept.
    pub fn load(&mut self, buffer: &[u8]) -> Result<()> {
        if buffer.len() != self.bytes.len() {
            return Err(Error::SizeMismatch {
                expected: self.bytes.len(),
                actual: buffer.len(),
            });
        }
        self.bytes.copy_from_slice(buffer);
        Ok(())
    }

    /// Current packed contents
    pub fn snapshot(&self) -> &[u8] {
        &self.bytes
    }
}

/// Part of `[start, start + len)` inside `[0, extent)`, empty if none
fn visible_run(start: i32, len: u32, extent: u32) -> (i32, i32) {
    let from = (start as i64).max(0);
    let to = (start as i64 + len as i64).min(extent as i64);
    if to <= from {
        (0, 0)
    } else {
        (from as i32, to as i32)
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color.into());
        }
        Ok(())
    }

    fn fill_solid(
        &mut self,
        area: &Rectangle,
        color: Self::Color,
    ) -> core::result::Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        self.fill_rect(
            area.top_left.x,
            area.top_left.y,
            area.size.width,
            area.size.height,
            color.into(),
        );
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> core::result::Result<(), Self::Error> {
        self.fill(color.into());
        Ok(())
    }
}
