/*
 *  display/bitmap.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized one-bit raster for text, icons and composed backgrounds
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// A runtime-sized monochrome framebuffer usable as an embedded-graphics target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    buf: Vec<BinaryColor>,
    w: usize,
    h: usize,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![BinaryColor::Off; w * h], w, h }
    }

    pub fn width(&self) -> u32 { self.w as u32 }
    pub fn height(&self) -> u32 { self.h as u32 }

    pub fn as_slice(&self) -> &[BinaryColor] { &self.buf }

    pub fn clear_color(&mut self, color: BinaryColor) {
        self.buf.fill(color);
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }

    pub fn is_on(&self, x: i32, y: i32) -> bool {
        self.idx(Point::new(x, y)).is_some_and(|i| self.buf[i].is_on())
    }

    pub fn set(&mut self, x: i32, y: i32, on: bool) {
        if let Some(i) = self.idx(Point::new(x, y)) {
            self.buf[i] = if on { BinaryColor::On } else { BinaryColor::Off };
        }
    }

    pub fn count_on(&self) -> usize {
        self.buf.iter().filter(|p| p.is_on()).count()
    }

    /// Positions of lit pixels, row major.
    pub fn on_points(&self) -> impl Iterator<Item = Point> + '_ {
        let w = self.w;
        self.buf
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_on())
            .map(move |(i, _)| Point::new((i % w) as i32, (i / w) as i32))
    }

    /// Draw the lit pixels onto `target` with this bitmap's origin at `origin`.
    /// Off pixels are transparent.
    pub fn blit<D>(&self, target: &mut D, origin: Point) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        target.draw_iter(self.on_points().map(|p| Pixel(p + origin, BinaryColor::On)))
    }

    /// Copy `src` into this bitmap at `offset`, clipping to our bounds.
    pub fn paste(&mut self, src: &Bitmap, offset: Point) {
        for p in src.on_points() {
            let q = p + offset;
            if let Some(i) = self.idx(q) {
                self.buf[i] = BinaryColor::On;
            }
        }
    }
}

impl OriginDimensions for Bitmap {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for Bitmap {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        // clip once rather than per pixel
        let area = area.intersection(&self.bounding_box());
        let Size { width, height } = area.size;
        if width == 0 || height == 0 { return Ok(()); }
        let (x0, y0) = (area.top_left.x as usize, area.top_left.y as usize);
        for row in y0..y0 + height as usize {
            let base = row * self.w;
            self.buf[base + x0..base + x0 + width as usize].fill(color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;

    #[test]
    fn test_fill_solid_clips() {
        let mut b = Bitmap::new(10, 4);
        Rectangle::new(Point::new(8, 2), Size::new(10, 10))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut b)
            .unwrap();
        assert_eq!(b.count_on(), 4);
        assert!(b.is_on(9, 3));
        assert!(!b.is_on(7, 3));
    }

    #[test]
    fn test_blit_is_transparent() {
        let mut src = Bitmap::new(3, 1);
        src.set(1, 0, true);
        let mut dst = Bitmap::new(5, 2);
        dst.set(0, 1, true);
        src.blit(&mut dst, Point::new(2, 1)).unwrap();
        assert!(dst.is_on(0, 1));
        assert!(dst.is_on(3, 1));
        assert_eq!(dst.count_on(), 2);
    }

    #[test]
    fn test_paste_negative_offset() {
        let mut src = Bitmap::new(4, 2);
        src.set(0, 0, true);
        src.set(3, 1, true);
        let mut vp = Bitmap::new(4, 2);
        vp.paste(&src, Point::new(-2, 1));
        // (0,0) lands at (-2,1), off the viewport; (3,1) lands at (1,2), also off
        assert_eq!(vp.count_on(), 0);
        vp.paste(&src, Point::new(-1, 0));
        assert!(vp.is_on(2, 1));
    }
}
