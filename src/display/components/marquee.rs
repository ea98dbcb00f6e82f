/*
 *  display/components/marquee.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Tip marquee: rise into view, pause, scroll off to the left
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

use chrono::{DateTime, Local};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use log::debug;

use crate::display::bitmap::Bitmap;
use crate::display::fonts::FontFace;
use crate::display::text_cache::TextRasterCache;

/// Animation progress for one pass of the tip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarqueeState {
    /// pixels risen, 0..=text height
    pub vertical_offset: u32,
    /// pixels scrolled left
    pub horizontal_offset: u32,
    pub has_fully_risen: bool,
    pub pause_start: Option<DateTime<Local>>,
    /// set once per pass, when the text has left the viewport
    pub scroll_complete: bool,
}

impl MarqueeState {
    pub fn reset(&mut self) {
        *self = MarqueeState::default();
    }

    /// One animation step. Rise first, then hold for `pause_secs`, then scroll.
    pub fn advance(&mut self, text_width: u32, text_height: u32, now: DateTime<Local>, pause_secs: f64) {
        if self.vertical_offset < text_height {
            self.vertical_offset += 1;
        } else if !self.has_fully_risen {
            self.has_fully_risen = true;
            self.pause_start = Some(now);
        } else if !self.scroll_complete && self.pause_elapsed(now, pause_secs) {
            self.horizontal_offset += 1;
        }

        if !self.scroll_complete && self.horizontal_offset > text_width {
            self.scroll_complete = true;
            debug!("tip scrolled off after {} px", self.horizontal_offset);
        }
    }

    fn pause_elapsed(&self, now: DateTime<Local>, pause_secs: f64) -> bool {
        match self.pause_start {
            Some(start) => {
                let held = (now - start).num_milliseconds() as f64 / 1000.0;
                held > pause_secs
            }
            None => false,
        }
    }
}

/// The tip text, its animation and a viewport the size of the text.
#[derive(Debug)]
pub struct Marquee {
    text: String,
    font: FontFace,
    pause_secs: f64,
    pub state: MarqueeState,
    viewport: Bitmap,
}

impl Marquee {
    pub fn new(font: FontFace, pause_secs: f64) -> Self {
        Self {
            text: String::new(),
            font,
            pause_secs,
            state: MarqueeState::default(),
            viewport: Bitmap::new(0, 0),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the tip. The animation restarts only when the text differs.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        self.state.reset();
        true
    }

    pub fn advance(&mut self, cache: &mut TextRasterCache, now: DateTime<Local>, is_transitioning: bool) {
        if is_transitioning || self.text.is_empty() {
            return;
        }
        let (w, h) = cache.size_of(&self.text, self.font);
        self.state.advance(w, h, now, self.pause_secs);
    }

    /// Draw the visible slice of the tip with its top-left at `origin`.
    pub fn render<D>(&mut self, cache: &mut TextRasterCache, target: &mut D, origin: Point) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        if self.text.is_empty() {
            return Ok(());
        }
        let entry = cache.measure_and_render(&self.text, self.font);
        if self.viewport.width() != entry.width || self.viewport.height() != entry.height {
            self.viewport = Bitmap::new(entry.width, entry.height);
        }
        self.viewport.clear_color(BinaryColor::Off);
        let offset = Point::new(
            -(self.state.horizontal_offset as i32),
            entry.height as i32 - self.state.vertical_offset as i32,
        );
        self.viewport.paste(&entry.bitmap, offset);
        self.viewport.blit(target, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_rises_then_pauses_then_scrolls() {
        let mut s = MarqueeState::default();
        let now = t0();
        for i in 1..=8 {
            s.advance(40, 8, now, 2.0);
            assert_eq!(s.vertical_offset, i);
        }
        assert!(!s.has_fully_risen);
        s.advance(40, 8, now, 2.0);
        assert!(s.has_fully_risen);
        assert_eq!(s.pause_start, Some(now));

        // pause must be strictly exceeded
        s.advance(40, 8, now + Duration::seconds(2), 2.0);
        assert_eq!(s.horizontal_offset, 0);
        s.advance(40, 8, now + Duration::milliseconds(2001), 2.0);
        assert_eq!(s.horizontal_offset, 1);
        assert_eq!(s.vertical_offset, 8);
    }

    #[test]
    fn test_completes_once_and_stops() {
        let mut s = MarqueeState::default();
        let now = t0();
        let later = now + Duration::seconds(10);
        for _ in 0..9 {
            s.advance(5, 8, now, 0.0);
        }
        let mut completions = 0;
        let mut last_h = 0;
        for _ in 0..20 {
            let was = s.scroll_complete;
            s.advance(5, 8, later, 0.0);
            assert!(s.horizontal_offset >= last_h);
            last_h = s.horizontal_offset;
            if s.scroll_complete && !was {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(s.horizontal_offset, 6);
    }

    #[test]
    fn test_set_text_resets_only_on_change() {
        let mut m = Marquee::new(FontFace::Small, 2.0);
        assert!(m.set_text("Dry and bright in London"));
        m.state.vertical_offset = 5;
        assert!(!m.set_text("Dry and bright in London"));
        assert_eq!(m.state.vertical_offset, 5);
        assert!(m.set_text("Rain later, take an umbrella"));
        assert_eq!(m.state, MarqueeState::default());
    }

    #[test]
    fn test_frozen_while_transitioning() {
        let mut cache = TextRasterCache::new();
        let mut m = Marquee::new(FontFace::Small, 2.0);
        m.set_text("Windy");
        m.advance(&mut cache, t0(), true);
        assert_eq!(m.state.vertical_offset, 0);
        m.advance(&mut cache, t0(), false);
        assert_eq!(m.state.vertical_offset, 1);
    }

    #[test]
    fn test_render_clips_to_risen_rows() {
        let mut cache = TextRasterCache::new();
        let mut m = Marquee::new(FontFace::Small, 2.0);
        m.set_text("HHHH");
        let mut target = Bitmap::new(64, 16);

        m.render(&mut cache, &mut target, Point::new(0, 4)).unwrap();
        assert_eq!(target.count_on(), 0);

        m.state.vertical_offset = 8;
        m.render(&mut cache, &mut target, Point::new(0, 4)).unwrap();
        let full = target.count_on();
        assert!(full > 0);
        assert!((0..64).all(|x| (0..4).all(|y| !target.is_on(x, y))));

        // scrolled fully off the viewport
        let mut target = Bitmap::new(64, 16);
        m.state.horizontal_offset = 21;
        m.render(&mut cache, &mut target, Point::new(0, 4)).unwrap();
        assert_eq!(target.count_on(), 0);
    }
}
