/*
 *  time_source.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Wall clock, optionally anchored to a debug start date
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

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

const ZONEINFO_DIRS: [&str; 3] = ["/usr/share/zoneinfo", "/usr/lib/zoneinfo", "/usr/share/lib/zoneinfo"];

/// Where tz database files live, `$TZDIR` first.
pub fn zoneinfo_dirs() -> Vec<PathBuf> {
    std::env::var_os("TZDIR")
        .map(PathBuf::from)
        .into_iter()
        .chain(ZONEINFO_DIRS.iter().map(PathBuf::from))
        .collect()
}

/// `zone` if some directory in `dirs` holds it, otherwise "UTC".
pub fn resolve_zone<'a, P: AsRef<Path>>(zone: &'a str, dirs: &[P]) -> &'a str {
    let zone = zone.trim();
    if zone == "UTC" {
        return zone;
    }
    let plausible = !zone.is_empty() && !zone.starts_with('/') && !zone.split('/').any(|c| c == "..");
    if plausible && dirs.iter().any(|d| d.as_ref().join(zone).is_file()) {
        zone
    } else {
        warn!("Timezone '{}' not found. Defaulting to UTC.", zone);
        "UTC"
    }
}

/// Point `Local` at `zone` for the rest of the process.
///
/// Call before the runtime or any other thread is started.
pub fn apply_timezone(zone: &str) -> &str {
    let zone = resolve_zone(zone, zoneinfo_dirs().as_slice());
    // SAFETY: single threaded at this point, nothing else reads the environment concurrently
    unsafe { std::env::set_var("TZ", zone) };
    info!("clock timezone {}", zone);
    zone
}

/// Source of "now" for a tick. Read once per tick and passed down.
#[derive(Debug, Clone)]
pub enum TimeSource {
    System,
    /// Starts at `start` and advances with the monotonic clock.
    Anchored { start: DateTime<Local>, origin: Instant },
}

impl TimeSource {
    pub fn from_debug(start: Option<NaiveDateTime>) -> Self {
        match start.and_then(|n| Local.from_local_datetime(&n).earliest()) {
            Some(start) => {
                info!("debug clock anchored at {}", start.format("%Y-%m-%d %H:%M:%S"));
                TimeSource::Anchored { start, origin: Instant::now() }
            }
            None => TimeSource::System,
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        match self {
            TimeSource::System => Local::now(),
            TimeSource::Anchored { start, origin } => {
                let elapsed = chrono::Duration::from_std(origin.elapsed())
                    .unwrap_or_else(|_| chrono::Duration::zero());
                *start + elapsed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_anchored_starts_at_debug_date() {
        let n = NaiveDateTime::parse_from_str("2024-12-25 07:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let ts = TimeSource::from_debug(Some(n));
        let now = ts.now();
        assert_eq!(now.month(), 12);
        assert_eq!(now.day(), 25);
        assert_eq!(now.hour(), 7);
        assert!(now >= ts.now() - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_resolve_zone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Europe")).unwrap();
        std::fs::write(dir.path().join("Europe/London"), b"TZif").unwrap();
        let dirs = [dir.path()];

        assert_eq!(resolve_zone("Europe/London", &dirs), "Europe/London");
        assert_eq!(resolve_zone("UTC", &dirs), "UTC");
        assert_eq!(resolve_zone("Mars/Olympus", &dirs), "UTC");
        assert_eq!(resolve_zone("Europe", &dirs), "UTC");
        assert_eq!(resolve_zone("../etc/passwd", &dirs), "UTC");
        assert_eq!(resolve_zone("", &dirs), "UTC");
    }

    #[test]
    fn test_none_is_system() {
        assert!(matches!(TimeSource::from_debug(None), TimeSource::System));
    }
}
