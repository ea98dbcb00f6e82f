/*
 *  cache.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Last good weather and forecast documents, persisted between runs
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

use log::{debug, error, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fs, io, path::{Path, PathBuf}};
use thiserror::Error;

use crate::weather::{CurrentWeather, Forecast};

const WEATHER_FILE: &str = "weather_data.json";
const FORECAST_FILE: &str = "forecast_data.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The weather document plus when it was fetched and the tip that went with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedWeather {
    pub timestamp: i64,
    pub data: CurrentWeather,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_tip: Option<String>,
}

/// Persistence seam for the refresh scheduler. Failures are absorbed here.
pub trait CacheStore {
    fn load_weather(&self) -> Option<CachedWeather>;
    fn save_weather(&mut self, record: &CachedWeather);
    fn load_forecast(&self) -> Option<Forecast>;
    fn save_forecast(&mut self, forecast: &Forecast);
}

/// JSON files under a cache directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CacheError> {
        let path = self.dir.join(name);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        debug!("cache written: {}", path.display());
        Ok(())
    }

    fn load_logged<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        match self.read(name) {
            Ok(v) => v,
            Err(e) => {
                warn!("ignoring unreadable cache {}: {}", name, e);
                None
            }
        }
    }

    fn save_logged<T: Serialize>(&self, name: &str, value: &T) {
        if let Err(e) = self.write(name, value) {
            error!("failed to save cache {}: {}", name, e);
        }
    }
}

impl CacheStore for FileCache {
    fn load_weather(&self) -> Option<CachedWeather> {
        self.load_logged(WEATHER_FILE)
    }

    fn save_weather(&mut self, record: &CachedWeather) {
        self.save_logged(WEATHER_FILE, record)
    }

    fn load_forecast(&self) -> Option<Forecast> {
        self.load_logged(FORECAST_FILE)
    }

    fn save_forecast(&mut self, forecast: &Forecast) {
        self.save_logged(FORECAST_FILE, forecast)
    }
}

/// In-memory store, used headless without a writable disk and by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    pub weather: Option<CachedWeather>,
    pub forecast: Option<Forecast>,
    pub weather_saves: usize,
    pub forecast_saves: usize,
}

impl CacheStore for MemoryCache {
    fn load_weather(&self) -> Option<CachedWeather> {
        self.weather.clone()
    }

    fn save_weather(&mut self, record: &CachedWeather) {
        self.weather_saves += 1;
        self.weather = Some(record.clone());
    }

    fn load_forecast(&self) -> Option<Forecast> {
        self.forecast.clone()
    }

    fn save_forecast(&mut self, forecast: &Forecast) {
        self.forecast_saves += 1;
        self.forecast = Some(forecast.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tip: Option<&str>) -> CachedWeather {
        CachedWeather {
            timestamp: 1_700_000_000,
            data: CurrentWeather { name: "London".into(), ..Default::default() },
            ai_tip: tip.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_files_are_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nope"));
        assert!(cache.load_weather().is_none());
        assert!(cache.load_forecast().is_none());
    }

    #[test]
    fn test_weather_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = FileCache::new(dir.path().join("cache"));
        cache.save_weather(&record(Some("Take an umbrella in London")));
        let back = cache.load_weather().unwrap();
        assert_eq!(back.timestamp, 1_700_000_000);
        assert_eq!(back.data.name, "London");
        assert_eq!(back.ai_tip.as_deref(), Some("Take an umbrella in London"));
    }

    #[test]
    fn test_tip_omitted_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = FileCache::new(dir.path());
        cache.save_weather(&record(None));
        let raw = fs::read_to_string(dir.path().join(WEATHER_FILE)).unwrap();
        assert!(!raw.contains("ai_tip"));
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FORECAST_FILE), "{ not json").unwrap();
        let cache = FileCache::new(dir.path());
        assert!(cache.load_forecast().is_none());
    }

    #[test]
    fn test_reads_document_written_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(WEATHER_FILE),
            r#"{"timestamp": 42, "data": {"name": "Leeds", "main": {"temp": 3.2}}}"#,
        )
        .unwrap();
        let cache = FileCache::new(dir.path());
        let rec = cache.load_weather().unwrap();
        assert_eq!(rec.timestamp, 42);
        assert_eq!(rec.ai_tip, None);
        assert_eq!(rec.data.main.temp, 3.2);
    }
}
