/*
 *  display/components/weather.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pre-rendered backgrounds for the current and forecast views
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

use chrono::{DateTime, Local, TimeZone};
use embedded_graphics::prelude::*;

use crate::config::Units;
use crate::display::bitmap::Bitmap;
use crate::display::fonts::FontFace;
use crate::display::icons::IconSet;
use crate::display::slots::{Slot, SlotContext};
use crate::display::text_cache::TextRasterCache;
use crate::weather::{CurrentWeather, Forecast};

pub const CURRENT_ICON_SIZE: u32 = 64;
pub const FORECAST_ICON_SIZE: u32 = 28;

/// List entries shown, roughly now, +6h, +12h and +21h.
const FORECAST_PICKS: [usize; 4] = [0, 2, 4, 7];
const FORECAST_CENTRES: [i32; 4] = [20, 91, 161, 232];
const FORECAST_MIN_ENTRIES: usize = 8;

const BODY_Y: i32 = 26;

/// Composes the static part of each view; the header and tip are drawn per frame.
#[derive(Debug, Clone)]
pub struct ViewComposer {
    width: u32,
    height: u32,
    units: Units,
    slots: [Slot; 4],
}

fn blit_text(cache: &mut TextRasterCache, bg: &mut Bitmap, text: &str, font: FontFace, at: Point) -> (i32, i32) {
    let e = cache.measure_and_render(text, font);
    e.bitmap.blit(bg, at).ok();
    (e.width as i32, e.height as i32)
}

fn local_hm(ts: i64) -> String {
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".into())
}

impl ViewComposer {
    pub fn new(width: u32, height: u32, units: Units, slots: [Slot; 4]) -> Self {
        Self { width, height, units, slots }
    }

    /// True when the current view shows text that ages with the clock.
    pub fn has_time_sensitive_slots(&self) -> bool {
        self.slots.iter().any(Slot::is_time_sensitive)
    }

    fn temp(&self, t: f64) -> String {
        format!("{:.0}{}", t, self.units.temp_suffix())
    }

    pub fn compose_current(
        &self,
        cache: &mut TextRasterCache,
        icons: &mut IconSet,
        weather: &CurrentWeather,
        now: DateTime<Local>,
        last_success: i64,
    ) -> Bitmap {
        let mut bg = Bitmap::new(self.width, self.height);
        let w = self.width as i32;

        if let Some(code) = weather.condition().map(|c| c.icon.as_str()).filter(|c| !c.is_empty()) {
            let x = 4 + (w - CURRENT_ICON_SIZE as i32) / 2;
            icons.weather(code, CURRENT_ICON_SIZE).blit(&mut bg, Point::new(x, 9)).ok();
        }

        let (temp_w, temp_h) = blit_text(cache, &mut bg, &self.temp(weather.main.temp), FontFace::Numeric, Point::new(0, BODY_Y));
        blit_text(cache, &mut bg, &self.temp(weather.main.temp_max), FontFace::Small, Point::new(temp_w + 5, BODY_Y));
        let min = self.temp(weather.main.temp_min);
        let (_, min_h) = cache.size_of(&min, FontFace::Small);
        blit_text(cache, &mut bg, &min, FontFace::Small, Point::new(temp_w + 5, BODY_Y + temp_h - min_h as i32));

        let ctx = SlotContext { weather, units: self.units, now, last_success };
        let below = BODY_Y + temp_h + 4;
        for (i, slot) in self.slots.iter().enumerate() {
            let text = slot.format(&ctx);
            if text.is_empty() {
                continue;
            }
            let (tw, _) = cache.size_of(&text, FontFace::Small);
            let right = w - tw as i32;
            let at = match i {
                0 => Point::new(0, below),
                1 => Point::new(right, BODY_Y),
                2 => Point::new(right, 39),
                _ => Point::new(right, below),
            };
            blit_text(cache, &mut bg, &text, FontFace::Small, at);
        }
        bg
    }

    pub fn compose_forecast(&self, cache: &mut TextRasterCache, icons: &mut IconSet, forecast: Option<&Forecast>) -> Bitmap {
        let mut bg = Bitmap::new(self.width, self.height);
        let list = match forecast {
            Some(f) if f.list.len() >= FORECAST_MIN_ENTRIES => &f.list,
            _ => {
                blit_text(cache, &mut bg, "Forecast data unavailable", FontFace::Small, Point::new(10, 25));
                return bg;
            }
        };

        for (&pick, &centre) in FORECAST_PICKS.iter().zip(FORECAST_CENTRES.iter()) {
            let entry = &list[pick];
            let time = local_hm(entry.dt);
            let (time_w, _) = cache.size_of(&time, FontFace::Small);
            blit_text(cache, &mut bg, &time, FontFace::Small, Point::new(centre - time_w as i32 / 2, BODY_Y));

            let icon = entry
                .weather
                .first()
                .map(|c| c.icon.as_str())
                .filter(|c| !c.is_empty())
                .map(|code| icons.weather(code, FORECAST_ICON_SIZE).clone());
            let icon_w = icon.as_ref().map_or(0, |b| b.width() as i32);

            let temp = self.temp(entry.main.temp);
            let (temp_w, temp_h) = cache.size_of(&temp, FontFace::Small);
            let block_x = centre - (icon_w + 2 + temp_w as i32) / 2;
            if let Some(icon) = &icon {
                icon.blit(&mut bg, Point::new(block_x, 34)).ok();
            }
            let temp_y = 34 + FORECAST_ICON_SIZE as i32 / 2 - temp_h as i32 / 2;
            blit_text(cache, &mut bg, &temp, FontFace::Small, Point::new(block_x + icon_w + 2, temp_y));
        }
        bg
    }
}
