/*
 *  display/text_cache.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Memoised text rasters keyed by (text, font)
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
use embedded_graphics::text::{Baseline, Text, renderer::TextRenderer};
use std::collections::HashMap;

use crate::display::bitmap::Bitmap;
use crate::display::fonts::FontFace;

/// A rendered string. Never changes once cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterEntry {
    pub width: u32,
    pub height: u32,
    pub bitmap: Bitmap,
}

/// Pixel width of `text` in `font`, and the font's line height.
pub fn measure(text: &str, font: FontFace) -> (u32, u32) {
    let metrics = font.style().measure_string(text, Point::zero(), Baseline::Top);
    (metrics.bounding_box.size.width, font.line_height())
}

fn render(text: &str, font: FontFace) -> RasterEntry {
    let (width, height) = measure(text, font);
    let mut bitmap = Bitmap::new(width, height);
    Text::with_baseline(text, Point::zero(), font.style(), Baseline::Top)
        .draw(&mut bitmap)
        .ok();
    RasterEntry { width, height, bitmap }
}

/// Every distinct string is rendered once per run; there is no eviction.
/// The set of strings is small: clock digits, dates, slot text and tips.
#[derive(Debug, Default)]
pub struct TextRasterCache {
    entries: HashMap<FontFace, HashMap<String, RasterEntry>>,
    misses: usize,
}

impl TextRasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measure_and_render(&mut self, text: &str, font: FontFace) -> &RasterEntry {
        let per_font = self.entries.entry(font).or_default();
        if !per_font.contains_key(text) {
            self.misses += 1;
            per_font.insert(text.to_string(), render(text, font));
        }
        &per_font[text]
    }

    /// Width and height only, through the cache.
    pub fn size_of(&mut self, text: &str, font: FontFace) -> (u32, u32) {
        let e = self.measure_and_render(text, font);
        (e.width, e.height)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_from_font_metrics() {
        let mut cache = TextRasterCache::new();
        let e = cache.measure_and_render("12:34", FontFace::Large);
        assert_eq!(e.width, 5 * 9);
        assert_eq!(e.height, 18);
        assert_eq!(e.bitmap.width(), 45);
        assert!(e.bitmap.count_on() > 0);
    }

    #[test]
    fn test_same_key_same_entry() {
        let mut cache = TextRasterCache::new();
        let first = cache.measure_and_render("Humidity: 81%", FontFace::Medium).clone();
        let second = cache.measure_and_render("Humidity: 81%", FontFace::Medium).clone();
        assert_eq!(first, second);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_font_is_part_of_key() {
        let mut cache = TextRasterCache::new();
        let small = cache.size_of("Rain", FontFace::Small);
        let tall = cache.size_of("Rain", FontFace::Tall);
        assert_ne!(small, tall);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_empty_string() {
        let mut cache = TextRasterCache::new();
        let e = cache.measure_and_render("", FontFace::Small);
        assert_eq!(e.width, 0);
        assert_eq!(e.bitmap.count_on(), 0);
    }

    #[test]
    fn test_degree_sign_renders() {
        assert_eq!(measure("12°C", FontFace::Numeric).0, 4 * 10);
    }
}
