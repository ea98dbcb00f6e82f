/*
 *  display/canvas.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Scoped frame: cleared on acquire, flushed when dropped
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
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::error;

use crate::display::traits::DisplayDriver;

/// One frame's worth of drawing. The panel is flushed on every exit path.
pub struct Canvas<'a, D: DisplayDriver> {
    driver: &'a mut D,
}

impl<'a, D: DisplayDriver> Canvas<'a, D> {
    pub fn acquire(driver: &'a mut D) -> Self {
        DrawTarget::clear(&mut *driver, BinaryColor::Off).ok();
        Self { driver }
    }
}

impl<D: DisplayDriver> Drop for Canvas<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.driver.flush() {
            error!("frame flush failed: {}", e);
        }
    }
}

impl<D: DisplayDriver> OriginDimensions for Canvas<'_, D> {
    fn size(&self) -> Size {
        let (w, h) = self.driver.dimensions();
        Size::new(w, h)
    }
}

impl<D: DisplayDriver> DrawTarget for Canvas<'_, D> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.driver.draw_iter(pixels)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.driver.fill_solid(area, color)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        DrawTarget::clear(&mut *self.driver, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockDriver;

    #[test]
    fn test_flushes_on_drop() {
        let mut driver = MockDriver::new(256, 64);
        let state = driver.state();
        {
            let mut c = Canvas::acquire(&mut driver);
            Pixel(Point::new(3, 3), BinaryColor::On).draw(&mut c).unwrap();
        }
        assert_eq!(state.lock().unwrap().flush_count, 1);
        assert_eq!(driver.get_pixel(3, 3), Some(BinaryColor::On));
    }

    #[test]
    fn test_acquire_clears_previous_frame() {
        let mut driver = MockDriver::new(16, 8);
        Pixel(Point::new(1, 1), BinaryColor::On).draw(&mut driver).unwrap();
        {
            let _c = Canvas::acquire(&mut driver);
        }
        assert_eq!(driver.count_on_pixels(), 0);
    }

    #[test]
    fn test_flush_failure_is_absorbed() {
        let mut driver = MockDriver::new(16, 8);
        driver.state().lock().unwrap().simulate_flush_failure = true;
        {
            let _c = Canvas::acquire(&mut driver);
        }
        assert_eq!(driver.state().lock().unwrap().flush_count, 0);
    }
}
