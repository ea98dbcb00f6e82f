/*
 *  display/slots.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Configurable metric slots on the current weather view
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
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::Units;
use crate::weather::CurrentWeather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "Desc")]
    Desc,
    #[serde(rename = "Sun")]
    Sun,
    #[serde(rename = "Humidity")]
    Humidity,
    #[serde(rename = "Last updated")]
    LastUpdated,
    #[serde(rename = "Pressure")]
    Pressure,
    #[serde(rename = "Location")]
    Location,
    #[serde(rename = "Wind speed")]
    WindSpeed,
    #[serde(rename = "Wind direction")]
    WindDirection,
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "Desc" => Slot::Desc,
            "Sun" => Slot::Sun,
            "Humidity" => Slot::Humidity,
            "Last updated" => Slot::LastUpdated,
            "Pressure" => Slot::Pressure,
            "Location" => Slot::Location,
            "Wind speed" => Slot::WindSpeed,
            "Wind direction" => Slot::WindDirection,
            other => return Err(format!("unknown weather slot '{other}'")),
        })
    }
}

/// Everything a slot may need to format itself.
pub struct SlotContext<'a> {
    pub weather: &'a CurrentWeather,
    pub units: Units,
    pub now: DateTime<Local>,
    /// epoch seconds of the last good fetch, 0 = never
    pub last_success: i64,
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn clock_of(ts: i64) -> String {
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".into())
}

/// Compact age of the data: "Just updated", "Updated 5m ago" ...
pub fn time_ago(now_ts: i64, last_success: i64) -> String {
    if last_success == 0 {
        return String::new();
    }
    let diff = (now_ts - last_success).max(0);
    match diff {
        d if d < 60 => "Just updated".into(),
        d if d < 3600 => format!("Updated {}m ago", d / 60),
        d if d < 86400 => format!("Updated {}h ago", d / 3600),
        d => format!("Updated {}d ago", d / 86400),
    }
}

impl Slot {
    pub fn format(&self, ctx: &SlotContext<'_>) -> String {
        let w = ctx.weather;
        match self {
            Slot::Desc => w
                .condition()
                .map(|c| title_case(&c.description))
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "N/A".into()),
            Slot::Sun => {
                let now_ts = ctx.now.timestamp();
                let sunset = if w.sys.sunset == 0 { now_ts } else { w.sys.sunset };
                let sunrise = if w.sys.sunrise == 0 { now_ts } else { w.sys.sunrise };
                if now_ts < sunset {
                    format!("Sunset: {}", clock_of(sunset))
                } else {
                    format!("Sunrise: {}", clock_of(sunrise))
                }
            }
            Slot::Humidity => format!("Humidity: {}%", w.main.humidity),
            Slot::LastUpdated => time_ago(ctx.now.timestamp(), ctx.last_success),
            Slot::Pressure => format!("Pressure: {} hPa", w.main.pressure),
            Slot::Location => if w.name.is_empty() { "N/A".into() } else { w.name.clone() },
            Slot::WindSpeed => format!("Wind: {} {}", w.wind.speed, ctx.units.speed_suffix()),
            Slot::WindDirection => format!("Wind Dir: {}°", w.wind.deg),
        }
    }

    /// Slots whose text changes with the clock rather than with the data.
    pub fn is_time_sensitive(&self) -> bool {
        matches!(self, Slot::Sun | Slot::LastUpdated)
    }
}
