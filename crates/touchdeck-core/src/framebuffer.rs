//! RAM framebuffer with per-pixel change detection.
//!
//! Widgets never talk to the display bus. They draw into this buffer on the
//! DrawTask, and once the redraw pass is over only the bounding box of pixels
//! that actually changed is pushed to the panel in a single transfer.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::trace;

/// Result of drawing into a [`FrameBuffer`]; drawing into RAM cannot fail.
pub type DrawResult = Result<(), Infallible>;

/// Inclusive bounding box of changed pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChangedArea {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl ChangedArea {
    fn at(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn as_rectangle(&self) -> Rectangle {
        Rectangle::new(
            Point::new(self.min_x as i32, self.min_y as i32),
            Size::new(
                (self.max_x - self.min_x + 1) as u32,
                (self.max_y - self.min_y + 1) as u32,
            ),
        )
    }
}

/// Heap-allocated `DrawTarget<Color = Rgb565>` sized to the logical screen.
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgb565>,
    changed: Option<ChangedArea>,
}

impl FrameBuffer {
    /// Allocate a black framebuffer. A zero dimension yields an empty buffer
    /// that silently discards every draw.
    pub fn new(width: u16, height: u16) -> Self {
        let width = width as usize;
        let height = height as usize;
        Self {
            width,
            height,
            pixels: vec![Rgb565::BLACK; width * height],
            changed: None,
        }
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        let idx = y * self.width + x;
        if self.pixels[idx] != color {
            self.pixels[idx] = color;
            match &mut self.changed {
                Some(area) => area.include(x, y),
                None => self.changed = Some(ChangedArea::at(x, y)),
            }
        }
    }

    /// Color at `point`, or `None` outside the buffer.
    pub fn pixel(&self, point: Point) -> Option<Rgb565> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (x, y) = (point.x as usize, point.y as usize);
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Region that will be sent on the next [`flush`](Self::flush).
    pub fn pending_region(&self) -> Option<Rectangle> {
        self.changed.map(|area| area.as_rectangle())
    }

    /// Push the changed region to `display` and reset change tracking.
    ///
    /// A buffer with no changes is a no-op and does not touch the bus.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(area) = self.changed.take() else {
            return Ok(false);
        };

        let rect = area.as_rectangle();
        trace!(
            "Flushing {}x{} region at ({}, {})",
            rect.size.width, rect.size.height, area.min_x, area.min_y
        );

        let pixels = &self.pixels;
        let stride = self.width;
        let row_len = area.max_x - area.min_x + 1;
        let colors = (area.min_y..=area.max_y).flat_map(move |y| {
            let start = y * stride + area.min_x;
            pixels[start..start + row_len].iter().copied()
        });

        display.fill_contiguous(&rect, colors)?;
        Ok(true)
    }

    /// Clip `area` to the buffer, returning `(x_start, y_start, x_end, y_end)`.
    fn clip(&self, area: &Rectangle) -> (usize, usize, usize, usize) {
        let x0 = area.top_left.x.max(0) as usize;
        let y0 = area.top_left.y.max(0) as usize;
        let x1 = (area.top_left.x as i64 + area.size.width as i64).max(0) as usize;
        let y1 = (area.top_left.y as i64 + area.size.height as i64).max(0) as usize;
        (
            x0.min(self.width),
            y0.min(self.height),
            x1.min(self.width),
            y1.min(self.height),
        )
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if coord.x >= 0
                && coord.y >= 0
                && (coord.x as usize) < self.width
                && (coord.y as usize) < self.height
            {
                self.set_pixel(coord.x as usize, coord.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        let mut colors = colors.into_iter();
        for row in 0..area.size.height as i32 {
            for col in 0..area.size.width as i32 {
                let Some(color) = colors.next() else {
                    return Ok(());
                };
                let x = area.top_left.x + col;
                let y = area.top_left.y + row;
                if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
                    self.set_pixel(x as usize, y as usize, color);
                }
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let (x_start, y_start, x_end, y_end) = self.clip(area);
        for y in y_start..y_end {
            for x in x_start..x_end {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..self.height {
            for x in 0..self.width {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}
