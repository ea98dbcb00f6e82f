/*
 *  display/drivers/ssd1322.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1322 256x64 OLED over spidev with gpio-cdev DC and RST lines
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

use embedded_graphics::geometry::Size;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, SpidevDevice};
use log::{debug, info};
use std::thread::sleep;
use std::time::Duration;

use crate::config::DisplayConfig;
use crate::display::bitmap::Bitmap;
use crate::display::error::DisplayError;
use crate::display::traits::{ColorDepth, DisplayCapabilities, DisplayDriver};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 64;
const GRAY4_BYTES: usize = (WIDTH * HEIGHT / 2) as usize;
const SPI_CHUNK: usize = 4096;

// (command, args) pairs; 256x64 panels start at segment column 0x1C
const INIT_SEQUENCE: &[(u8, &[u8])] = &[
    (0xFD, &[0x12]),       // unlock
    (0xAE, &[]),           // display off
    (0xB3, &[0xF2]),       // clock divider
    (0xCA, &[0x3F]),       // multiplex 1/64
    (0xA2, &[0x00]),       // display offset
    (0xA1, &[0x00]),       // start line
    (0xA0, &[0x14, 0x11]), // remap: nibble swap, COM scan reversed, dual COM
    (0xB5, &[0x00]),       // GPIO
    (0xAB, &[0x01]),       // internal VDD
    (0xB4, &[0xA0, 0xFD]), // display enhancement A
    (0xC1, &[0x7F]),       // contrast
    (0xC7, &[0x0F]),       // master current
    (0xB9, &[]),           // default linear gray table
    (0xB1, &[0xE2]),       // phase length
    (0xD1, &[0x82, 0x20]), // display enhancement B
    (0xBB, &[0x1F]),       // pre-charge voltage
    (0xB6, &[0x08]),       // second pre-charge
    (0xBE, &[0x07]),       // VCOMH
    (0xA6, &[]),           // normal display
    (0xA9, &[]),           // exit partial
    (0xAF, &[]),           // display on
];

fn spi_err<E: core::fmt::Debug>(e: E) -> DisplayError {
    DisplayError::SpiError(format!("{:?}", e))
}

fn gpio_err<E: core::fmt::Debug>(e: E) -> DisplayError {
    DisplayError::GpioError(format!("{:?}", e))
}

/// Expand the monochrome framebuffer to the controller's 4-bit layout,
/// two pixels per byte, left pixel in the high nibble.
pub fn pack_gray4(fb: &Bitmap, rotate_180: bool, out: &mut Vec<u8>) {
    let (w, h) = (fb.width() as i32, fb.height() as i32);
    out.clear();
    for y in 0..h {
        for x in (0..w).step_by(2) {
            let px = |x: i32| {
                let on = if rotate_180 { fb.is_on(w - 1 - x, h - 1 - y) } else { fb.is_on(x, y) };
                if on { 0x0F } else { 0x00 }
            };
            out.push((px(x) << 4) | px(x + 1));
        }
    }
}

fn request_output(chip: &mut Chip, line: u32, label: &str) -> Result<CdevPin, DisplayError> {
    let handle = chip
        .get_line(line)
        .map_err(gpio_err)?
        .request(LineRequestFlags::OUTPUT, 0, label)
        .map_err(gpio_err)?;
    CdevPin::new(handle).map_err(gpio_err)
}

pub struct Ssd1322Driver {
    spi: SpidevDevice,
    dc: CdevPin,
    rst: CdevPin,
    framebuffer: Bitmap,
    packed: Vec<u8>,
    rotate_180: bool,
    capabilities: DisplayCapabilities,
}

impl Ssd1322Driver {
    pub fn new_spi(config: &DisplayConfig) -> Result<Self, DisplayError> {
        if config.width != WIDTH || config.height != HEIGHT {
            return Err(DisplayError::InvalidConfiguration(format!(
                "SSD1322 panel is {}x{}, configured {}x{}",
                WIDTH, HEIGHT, config.width, config.height
            )));
        }

        let mut spi = SpidevDevice::open(&config.spi_bus).map_err(spi_err)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(config.spi_speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).map_err(spi_err)?;

        let mut chip = Chip::new(&config.gpio_chip).map_err(gpio_err)?;
        let dc = request_output(&mut chip, config.dc_pin, "wxmons-dc")?;
        let rst = request_output(&mut chip, config.rst_pin, "wxmons-rst")?;

        Ok(Self {
            spi,
            dc,
            rst,
            framebuffer: Bitmap::new(WIDTH, HEIGHT),
            packed: Vec::with_capacity(GRAY4_BYTES),
            rotate_180: config.rotate_deg == 180,
            capabilities: DisplayCapabilities {
                width: WIDTH,
                height: HEIGHT,
                color_depth: ColorDepth::Gray4,
                max_fps: 100,
                supports_brightness: true,
            },
        })
    }

    fn command(&mut self, cmd: u8, args: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(gpio_err)?;
        self.spi.write(&[cmd]).map_err(spi_err)?;
        if !args.is_empty() {
            self.dc.set_high().map_err(gpio_err)?;
            self.spi.write(args).map_err(spi_err)?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(gpio_err)?;
        sleep(Duration::from_millis(1));
        self.rst.set_low().map_err(gpio_err)?;
        sleep(Duration::from_millis(10));
        self.rst.set_high().map_err(gpio_err)?;
        sleep(Duration::from_millis(10));
        Ok(())
    }
}

impl DisplayDriver for Ssd1322Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.reset()?;
        for (cmd, args) in INIT_SEQUENCE {
            self.command(*cmd, args)?;
        }
        info!("SSD1322 initialised ({}x{})", WIDTH, HEIGHT);
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        debug!("SSD1322 contrast {}", value);
        self.command(0xC1, &[value])
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        pack_gray4(&self.framebuffer, self.rotate_180, &mut self.packed);

        self.command(0x15, &[0x1C, 0x5B])?;
        self.command(0x75, &[0x00, (HEIGHT - 1) as u8])?;
        self.command(0x5C, &[])?;

        self.dc.set_high().map_err(gpio_err)?;
        for chunk in self.packed.chunks(SPI_CHUNK) {
            self.spi.write(chunk).map_err(spi_err)?;
        }
        Ok(())
    }
}

impl OriginDimensions for Ssd1322Driver {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Ssd1322Driver {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_gray4_nibbles() {
        let mut fb = Bitmap::new(WIDTH, HEIGHT);
        fb.set(0, 0, true);
        fb.set(3, 0, true);
        let mut out = Vec::new();
        pack_gray4(&fb, false, &mut out);
        assert_eq!(out.len(), GRAY4_BYTES);
        assert_eq!(out[0], 0xF0);
        assert_eq!(out[1], 0x0F);
        assert!(out[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pack_gray4_rotated() {
        let mut fb = Bitmap::new(WIDTH, HEIGHT);
        fb.set(0, 0, true);
        let mut out = Vec::new();
        pack_gray4(&fb, true, &mut out);
        assert_eq!(out[GRAY4_BYTES - 1], 0x0F);
        assert_eq!(out[0], 0x00);
    }
}
