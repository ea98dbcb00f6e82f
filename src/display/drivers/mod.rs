/*
 *  display/drivers/mod.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel drivers and the configured-panel dispatch
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

pub mod mock;

#[cfg(feature = "driver-ssd1322")]
pub mod ssd1322;

use core::convert::Infallible;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::info;

use crate::config::{DisplayConfig, DriverKind};
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};
use mock::MockDriver;

#[cfg(feature = "driver-ssd1322")]
use ssd1322::Ssd1322Driver;

/// Enum dispatch over the drivers compiled into this build.
pub enum Panel {
    Mock(MockDriver),
    #[cfg(feature = "driver-ssd1322")]
    Ssd1322(Ssd1322Driver),
}

impl Panel {
    /// Open and initialise the configured panel. Any failure here is fatal to startup.
    pub fn open(config: &DisplayConfig) -> Result<Self, DisplayError> {
        let mut panel = match config.driver {
            DriverKind::Mock => {
                info!("using in-memory panel {}x{}", config.width, config.height);
                Panel::Mock(MockDriver::new(config.width, config.height))
            }
            #[cfg(feature = "driver-ssd1322")]
            DriverKind::Ssd1322 => {
                info!("opening SSD1322 on {}", config.spi_bus);
                Panel::Ssd1322(Ssd1322Driver::new_spi(config)?)
            }
            #[cfg(not(feature = "driver-ssd1322"))]
            DriverKind::Ssd1322 => return Err(DisplayError::DriverUnavailable("ssd1322")),
        };
        panel.init()?;
        panel.set_brightness(config.brightness)?;
        Ok(panel)
    }
}

// delegate to the active variant
macro_rules! each_panel {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            Panel::Mock($d) => $body,
            #[cfg(feature = "driver-ssd1322")]
            Panel::Ssd1322($d) => $body,
        }
    };
}

impl DisplayDriver for Panel {
    fn capabilities(&self) -> &DisplayCapabilities {
        each_panel!(self, d => d.capabilities())
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        each_panel!(self, d => d.init())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        each_panel!(self, d => d.set_brightness(value))
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        each_panel!(self, d => d.flush())
    }
}

impl OriginDimensions for Panel {
    fn size(&self) -> Size {
        each_panel!(self, d => d.size())
    }
}

impl DrawTarget for Panel {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        each_panel!(self, d => d.draw_iter(pixels))
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        each_panel!(self, d => d.fill_solid(area, color))
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        each_panel!(self, d => DrawTarget::clear(d, color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_mock_panel() {
        let cfg = DisplayConfig { driver: DriverKind::Mock, brightness: 128, ..Default::default() };
        let panel = Panel::open(&cfg).unwrap();
        assert_eq!(panel.dimensions(), (256, 64));
        match panel {
            Panel::Mock(m) => {
                let state = m.state();
                let s = state.lock().unwrap();
                assert_eq!(s.init_count, 1);
                assert_eq!(s.last_brightness, Some(128));
            }
            #[allow(unreachable_patterns)]
            _ => panic!("expected mock panel"),
        }
    }
}
