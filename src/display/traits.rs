/*
 *  display/traits.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for display driver abstraction
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
use crate::display::error::DisplayError;

/// Color depth the panel controller works in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// 1-bit per pixel
    Monochrome,

    /// 4-bit grayscale (16 levels), used by SSD1322
    Gray4,
}

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Controller color depth; drawing is always monochrome
    pub color_depth: ColorDepth,

    /// Maximum recommended frame rate
    pub max_fps: u32,

    /// Whether the display supports brightness control
    pub supports_brightness: bool,
}

/// A panel the dashboard can draw on.
///
/// Drawing goes through the `DrawTarget` supertrait into an in-memory
/// framebuffer; nothing reaches the glass until [`DisplayDriver::flush`].
pub trait DisplayDriver: DrawTarget<Color = BinaryColor, Error = Infallible> {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Set display brightness (0-255)
    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError>;

    /// Push the framebuffer to the panel
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Blank the framebuffer and the panel
    fn blank(&mut self) -> Result<(), DisplayError> {
        DrawTarget::clear(&mut *self, BinaryColor::Off).ok();
        self.flush()
    }
}
