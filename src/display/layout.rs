/*
 *  display/layout.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Longest-that-fits selection for right aligned header text
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

use chrono::{DateTime, Datelike, TimeZone, Weekday};

use crate::display::fonts::FontFace;
use crate::display::text_cache::TextRasterCache;

/// Pick the first candidate whose right-aligned placement leaves at least
/// `extra_reserved` pixels between it and `reserved_left`. Candidates are
/// ordered most preferred first; when none fits the last is returned.
pub fn select_fit(
    cache: &mut TextRasterCache,
    candidates: &[String],
    font: FontFace,
    reserved_left: i32,
    total_width: i32,
    extra_reserved: i32,
) -> String {
    for candidate in candidates {
        let (w, _) = cache.size_of(candidate, font);
        let available_gap = (total_width - w as i32) - reserved_left;
        if available_gap >= extra_reserved {
            return candidate.clone();
        }
    }
    candidates.last().cloned().unwrap_or_default()
}

pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

pub fn day_abbreviation(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tues",
        Weekday::Wed => "Weds",
        Weekday::Thu => "Thur",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Header date candidates, longest first.
pub fn date_candidates<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<String>
where
    Tz::Offset: std::fmt::Display,
{
    let day = now.day();
    let sfx = ordinal_suffix(day);
    let month = now.format("%B");
    let full = now.format("%A");
    let short = day_abbreviation(now.weekday());
    vec![
        format!("{full}, {day}{sfx} {month} {}", now.year()),
        format!("{full}, {day}{sfx} {month}"),
        format!("{short}, {day}{sfx} {month}"),
    ]
}
