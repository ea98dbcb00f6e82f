/*
 *  display/drivers/mock.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory panel for tests and headless runs
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

use embedded_graphics::prelude::*;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::geometry::Size;

use crate::display::bitmap::Bitmap;
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayDriver, DisplayCapabilities, ColorDepth};

use std::sync::{Arc, Mutex, MutexGuard};

/// Mock display driver
///
/// Behaves like a panel without touching hardware. Every flush snapshots the
/// framebuffer so tests can inspect exactly what would have been shown.
#[derive(Debug, Clone)]
pub struct MockDriver {
    framebuffer: Bitmap,
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Number of times flush() succeeded
    pub flush_count: usize,

    /// Last brightness value set
    pub last_brightness: Option<u8>,

    /// Whether the driver is initialized
    pub is_initialized: bool,

    /// Framebuffer as of the last successful flush
    pub last_frame: Option<Bitmap>,

    /// Simulate failures (for error testing)
    pub simulate_flush_failure: bool,
    pub simulate_init_failure: bool,
}

impl MockDriver {
    pub fn new(width: u32, height: u32) -> Self {
        let capabilities = DisplayCapabilities {
            width,
            height,
            color_depth: ColorDepth::Monochrome,
            max_fps: 120,
            supports_brightness: true,
        };

        Self {
            framebuffer: Bitmap::new(width, height),
            capabilities,
            state: Arc::new(Mutex::new(MockDriverState::default())),
        }
    }

    /// Get pixel at position for testing
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        if x >= self.capabilities.width || y >= self.capabilities.height {
            return None;
        }
        let on = self.framebuffer.is_on(x as i32, y as i32);
        Some(if on { BinaryColor::On } else { BinaryColor::Off })
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, MockDriverState> {
        // a panicking test thread may poison the lock; the counters are still usable
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Count number of pixels set to On
    pub fn count_on_pixels(&self) -> usize {
        self.framebuffer.count_on()
    }

    pub fn framebuffer(&self) -> &Bitmap {
        &self.framebuffer
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();

        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed("simulated init failure".to_string()));
        }

        state.init_count += 1;
        state.is_initialized = true;
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.lock().last_brightness = Some(value);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let frame = self.framebuffer.clone();
        let mut state = self.lock();

        if state.simulate_flush_failure {
            return Err(DisplayError::Other("simulated flush failure".to_string()));
        }

        state.flush_count += 1;
        state.last_frame = Some(frame);
        Ok(())
    }
}

impl DrawTarget for MockDriver {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.framebuffer.fill_solid(area, color)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.framebuffer.clear(color)
    }
}

impl OriginDimensions for MockDriver {
    fn size(&self) -> Size {
        Size::new(self.capabilities.width, self.capabilities.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Line};

    #[test]
    fn test_mock_driver_creation() {
        let driver = MockDriver::new(256, 64);
        assert_eq!(driver.capabilities().width, 256);
        assert_eq!(driver.capabilities().height, 64);
        assert_eq!(driver.count_on_pixels(), 0);
    }

    #[test]
    fn test_mock_driver_init() {
        let mut driver = MockDriver::new(256, 64);

        let state = driver.state();
        assert_eq!(state.lock().unwrap().init_count, 0);
        assert!(!state.lock().unwrap().is_initialized);

        driver.init().unwrap();

        assert_eq!(state.lock().unwrap().init_count, 1);
        assert!(state.lock().unwrap().is_initialized);
    }

    #[test]
    fn test_mock_driver_drawing() {
        let mut driver = MockDriver::new(256, 64);

        let line = Line::new(Point::new(0, 0), Point::new(10, 10));
        line.into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut driver)
            .unwrap();

        assert!(driver.count_on_pixels() > 0);
        assert_eq!(driver.get_pixel(0, 0), Some(BinaryColor::On));
        assert_eq!(driver.get_pixel(300, 0), None);
    }

    #[test]
    fn test_mock_driver_blank() {
        let mut driver = MockDriver::new(256, 64);

        let line = Line::new(Point::new(0, 0), Point::new(10, 10));
        line.into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut driver)
            .unwrap();
        assert!(driver.count_on_pixels() > 0);

        driver.blank().unwrap();

        assert_eq!(driver.count_on_pixels(), 0);
        let state = driver.state();
        let s = state.lock().unwrap();
        assert_eq!(s.flush_count, 1);
        assert_eq!(s.last_frame.as_ref().map(|f| f.count_on()), Some(0));
    }

    #[test]
    fn test_mock_driver_brightness() {
        let mut driver = MockDriver::new(256, 64);
        driver.set_brightness(200).unwrap();
        assert_eq!(driver.state().lock().unwrap().last_brightness, Some(200));
    }

    #[test]
    fn test_mock_driver_simulated_failure() {
        let mut driver = MockDriver::new(256, 64);

        driver.state().lock().unwrap().simulate_flush_failure = true;
        assert!(driver.flush().is_err());

        driver.state().lock().unwrap().simulate_flush_failure = false;
        assert!(driver.flush().is_ok());

        driver.state().lock().unwrap().simulate_init_failure = true;
        assert!(driver.init().is_err());
    }
}
