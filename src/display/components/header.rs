/*
 *  display/components/header.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Header row: clock, date or forecast title, umbrella hint
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

use chrono::{DateTime, Local, NaiveDate};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use log::debug;

use crate::display::fonts::FontFace;
use crate::display::icons::IconSet;
use crate::display::layout::{date_candidates, select_fit};
use crate::display::text_cache::TextRasterCache;

const HM_FONT: FontFace = FontFace::Large;
const SEC_FONT: FontFace = FontFace::Medium;
const TITLE_FONT: FontFace = FontFace::Tall;

/// Widest possible clock, "23:59" plus ":59".
pub fn max_clock_width(cache: &mut TextRasterCache) -> i32 {
    let (hm, _) = cache.size_of("23:59", HM_FONT);
    let (sec, _) = cache.size_of(":59", SEC_FONT);
    (hm + sec) as i32
}

#[derive(Debug)]
pub struct Header {
    width: i32,
    max_clock_width: i32,
    title: String,
    show_umbrella: bool,
    debug: bool,
    /// fitted date, valid for one (day, umbrella) pair
    date: Option<(NaiveDate, bool, String)>,
}

impl Header {
    pub fn new(cache: &mut TextRasterCache, width: u32, location: &str, show_umbrella: bool, debug: bool) -> Self {
        Self {
            width: width as i32,
            max_clock_width: max_clock_width(cache),
            title: format!("{location} 24h forecast"),
            show_umbrella,
            debug,
            date: None,
        }
    }

    pub fn max_clock_width(&self) -> i32 {
        self.max_clock_width
    }

    pub fn umbrella_visible(&self, tip: &str) -> bool {
        self.show_umbrella && (self.debug || tip.to_lowercase().contains("umbrella"))
    }

    /// Text for the right of the header.
    pub fn right_text(
        &mut self,
        cache: &mut TextRasterCache,
        icons: &mut IconSet,
        now: &DateTime<Local>,
        showing_forecast: bool,
        umbrella: bool,
    ) -> String {
        if showing_forecast {
            return self.title.clone();
        }
        let day = now.date_naive();
        if let Some((d, u, text)) = &self.date {
            if *d == day && *u == umbrella {
                return text.clone();
            }
        }
        let extra = if umbrella { icons.umbrella().width() as i32 + 10 } else { 0 };
        let text = select_fit(cache, &date_candidates(now), TITLE_FONT, self.max_clock_width, self.width, extra);
        debug!("header date '{}'", text);
        self.date = Some((day, umbrella, text.clone()));
        text
    }

    /// Draw the header and return the top-left of the tip line.
    pub fn render<D>(
        &mut self,
        cache: &mut TextRasterCache,
        icons: &mut IconSet,
        target: &mut D,
        now: &DateTime<Local>,
        showing_forecast: bool,
        tip: &str,
    ) -> Result<Point, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let hm = cache.measure_and_render(&now.format("%H:%M").to_string(), HM_FONT);
        hm.bitmap.blit(target, Point::zero())?;
        let (hm_w, hm_h) = (hm.width as i32, hm.height as i32);
        cache
            .measure_and_render(&now.format(":%S").to_string(), SEC_FONT)
            .bitmap
            .blit(target, Point::new(hm_w, 1))?;

        let umbrella = self.umbrella_visible(tip);
        let right = self.right_text(cache, icons, now, showing_forecast, umbrella);
        let content = cache.measure_and_render(&right, TITLE_FONT);
        let content_x = self.width - content.width as i32;
        let content_h = content.height as i32;
        content.bitmap.blit(target, Point::new(content_x, 1))?;

        if umbrella {
            let icon = icons.umbrella();
            let gap = content_x - self.max_clock_width;
            let x = self.max_clock_width + (gap - icon.width() as i32) / 2;
            let y = (hm_h - icon.height() as i32) / 2;
            icon.blit(target, Point::new(x, y))?;
        }

        Ok(Point::new(content_x, 1 + content_h + 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::bitmap::Bitmap;
    use chrono::TimeZone;

    fn setup(debug: bool) -> (TextRasterCache, IconSet, Header) {
        let mut cache = TextRasterCache::new();
        let icons = IconSet::new("/nonexistent");
        let header = Header::new(&mut cache, 256, "London", true, debug);
        (cache, icons, header)
    }

    #[test]
    fn test_max_clock_width() {
        let (_, _, header) = setup(false);
        assert_eq!(header.max_clock_width(), 5 * 9 + 3 * 6);
    }

    #[test]
    fn test_umbrella_visibility() {
        let (_, _, header) = setup(false);
        assert!(header.umbrella_visible("Take an Umbrella, rain by noon"));
        assert!(!header.umbrella_visible("Dry and bright"));
        let (_, _, header) = setup(true);
        assert!(header.umbrella_visible("Dry and bright"));
    }

    #[test]
    fn test_umbrella_shortens_date() {
        let (mut cache, mut icons, mut header) = setup(false);
        let now = Local.with_ymd_and_hms(2025, 9, 24, 10, 0, 0).unwrap();
        assert_eq!(
            header.right_text(&mut cache, &mut icons, &now, false, false),
            "Wednesday, 24th September 2025"
        );
        assert_eq!(
            header.right_text(&mut cache, &mut icons, &now, false, true),
            "Wednesday, 24th September"
        );
        assert_eq!(header.right_text(&mut cache, &mut icons, &now, true, true), "London 24h forecast");
    }

    #[test]
    fn test_render_places_tip_below_title() {
        let (mut cache, mut icons, mut header) = setup(false);
        let now = Local.with_ymd_and_hms(2025, 1, 1, 9, 5, 7).unwrap();
        let mut frame = Bitmap::new(256, 64);
        let tip = header
            .render(&mut cache, &mut icons, &mut frame, &now, false, "Dry and bright")
            .unwrap();
        let title_w = 6 * "Wednesday, 1st January 2025".len() as i32;
        assert_eq!(tip, Point::new(256 - title_w, 16));
        // clock glyphs in the top left, nothing below the header row
        assert!((0..45).any(|x| (0..18).any(|y| frame.is_on(x, y))));
        assert!((0..256).all(|x| (20..64).all(|y| !frame.is_on(x, y))));
    }

    #[test]
    fn test_render_umbrella_in_gap() {
        let (mut cache, mut icons, mut header) = setup(true);
        let now = Local.with_ymd_and_hms(2025, 1, 1, 9, 5, 7).unwrap();
        let mut with = Bitmap::new(256, 64);
        header.render(&mut cache, &mut icons, &mut with, &now, true, "").unwrap();

        let (mut cache, mut icons, mut header) = setup(false);
        let mut without = Bitmap::new(256, 64);
        header.render(&mut cache, &mut icons, &mut without, &now, true, "").unwrap();

        let gap = |b: &Bitmap| (63..130).flat_map(|x| (0..18).map(move |y| (x, y))).filter(|&(x, y)| b.is_on(x, y)).count();
        assert_eq!(gap(&without), 0);
        assert!(gap(&with) > 0);
    }
}
