/*
 *  display/fonts.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Font faces used on the dashboard
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

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle, iso_8859_1};
use embedded_graphics::pixelcolor::BinaryColor;

/// Dashboard font roles. Latin-1 faces so `°` renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    /// scrolling tip, weather slots, forecast text
    Small,
    /// clock seconds, status messages
    Medium,
    /// header date and title
    Tall,
    /// clock hours and minutes
    Large,
    /// current temperature
    Numeric,
}

impl FontFace {
    pub fn mono(&self) -> &'static MonoFont<'static> {
        match self {
            FontFace::Small => &iso_8859_1::FONT_5X8,
            FontFace::Medium => &iso_8859_1::FONT_6X10,
            FontFace::Tall => &iso_8859_1::FONT_6X13,
            FontFace::Large => &iso_8859_1::FONT_9X18_BOLD,
            FontFace::Numeric => &iso_8859_1::FONT_10X20,
        }
    }

    pub fn style(&self) -> MonoTextStyle<'static, BinaryColor> {
        MonoTextStyle::new(self.mono(), BinaryColor::On)
    }

    pub fn line_height(&self) -> u32 {
        self.mono().character_size.height
    }
}
