/*
 *  refresh.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Stale-data refresh: fetch when the last good update is older than the interval
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

use log::{debug, info, warn};

use crate::cache::{CacheStore, CachedWeather};
use crate::weather::{CurrentWeather, Forecast, WeatherSource};

/// Shown until the first real tip arrives.
pub const TIP_PLACEHOLDER: &str = "Fetching weather tip...";

const FAILURE_SENTINEL: &str = "unavailable";

fn is_failure_text(tip: &str) -> bool {
    tip.to_ascii_lowercase().contains(FAILURE_SENTINEL)
}

/// A tip worth persisting: not blank, not a failure message, not the placeholder.
pub fn is_real_tip(tip: &str) -> bool {
    !tip.trim().is_empty() && !is_failure_text(tip) && tip != TIP_PLACEHOLDER
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshState {
    /// epoch seconds of the last verified weather fetch, 0 = never
    pub last_success: i64,
    pub weather: Option<CurrentWeather>,
    pub forecast: Option<Forecast>,
    pub tip: String,
}

impl Default for RefreshState {
    fn default() -> Self {
        Self { last_success: 0, weather: None, forecast: None, tip: TIP_PLACEHOLDER.to_string() }
    }
}

/// What changed during a tick, so the caller only recomposes what it must.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub weather_updated: bool,
    pub forecast_updated: bool,
    pub tip_changed: bool,
}

impl RefreshOutcome {
    pub fn any(&self) -> bool {
        self.weather_updated || self.forecast_updated || self.tip_changed
    }
}

#[derive(Debug)]
pub struct RefreshScheduler {
    interval: i64,
    state: RefreshState,
}

impl RefreshScheduler {
    pub fn new(interval_secs: i64) -> Self {
        Self { interval: interval_secs, state: RefreshState::default() }
    }

    pub fn with_state(interval_secs: i64, state: RefreshState) -> Self {
        Self { interval: interval_secs, state }
    }

    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    /// Seed from the persisted cache. `force` (or no cached weather) makes the next tick fetch.
    pub fn seed<C: CacheStore>(&mut self, cache: &C, force: bool) {
        match cache.load_weather() {
            Some(rec) => {
                info!("loaded cached weather from {}", rec.timestamp);
                self.state.last_success = if force { 0 } else { rec.timestamp };
                self.state.weather = Some(rec.data);
                if let Some(tip) = rec.ai_tip.filter(|t| is_real_tip(t)) {
                    self.state.tip = tip;
                }
            }
            None => self.state.last_success = 0,
        }
        self.state.forecast = cache.load_forecast();
    }

    pub fn is_due(&self, now: i64) -> bool {
        now - self.state.last_success >= self.interval
    }

    /// Fetch if due. Failures leave the previous data in place.
    pub async fn tick<S, C>(&mut self, now: i64, source: &S, cache: &mut C) -> RefreshOutcome
    where
        S: WeatherSource,
        C: CacheStore,
    {
        let mut outcome = RefreshOutcome::default();
        if !self.is_due(now) {
            return outcome;
        }
        debug!("refresh due: last success {} now {}", self.state.last_success, now);

        match source.current().await {
            Ok(weather) => {
                self.state.weather = Some(weather);
                self.state.last_success = now;
                outcome.weather_updated = true;

                match source.tip().await {
                    Ok(tip) => outcome.tip_changed = self.accept_tip(tip),
                    Err(e) => warn!("weather tip fetch failed: {}", e),
                }

                let record = CachedWeather {
                    timestamp: self.state.last_success,
                    data: self.state.weather.clone().unwrap_or_default(),
                    ai_tip: Some(self.state.tip.clone()).filter(|t| is_real_tip(t)),
                };
                cache.save_weather(&record);
            }
            Err(e) => warn!("weather fetch failed, keeping previous data: {}", e),
        }

        match source.forecast().await {
            Ok(forecast) => {
                cache.save_forecast(&forecast);
                self.state.forecast = Some(forecast);
                outcome.forecast_updated = true;
            }
            Err(e) => warn!("forecast fetch failed, keeping previous data: {}", e),
        }

        outcome
    }

    fn accept_tip(&mut self, tip: String) -> bool {
        let tip = tip.trim();
        if tip.is_empty() || tip == self.state.tip || is_failure_text(tip) {
            return false;
        }
        info!("new weather tip: {}", tip);
        self.state.tip = tip.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::weather::WeatherApiError;
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeSource {
        fail_current: bool,
        fail_forecast: bool,
        tip: Option<String>,
        calls: Cell<usize>,
    }

    impl WeatherSource for FakeSource {
        async fn current(&self) -> Result<CurrentWeather, WeatherApiError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_current {
                Err(WeatherApiError::Status(503))
            } else {
                Ok(CurrentWeather { name: "London".into(), ..Default::default() })
            }
        }

        async fn forecast(&self) -> Result<Forecast, WeatherApiError> {
            if self.fail_forecast {
                Err(WeatherApiError::Status(500))
            } else {
                Ok(Forecast { list: vec![Default::default(); 8] })
            }
        }

        async fn tip(&self) -> Result<String, WeatherApiError> {
            self.tip.clone().ok_or(WeatherApiError::MissingAnswer)
        }
    }

    fn source_with_tip(tip: &str) -> FakeSource {
        FakeSource { tip: Some(tip.to_string()), ..Default::default() }
    }

    #[tokio::test]
    async fn test_due_boundary() {
        let mut s = RefreshScheduler::new(1800);
        let src = source_with_tip("Sunny in London");
        let mut cache = MemoryCache::default();

        assert!(!s.is_due(1799));
        let o = s.tick(1799, &src, &mut cache).await;
        assert!(!o.any());
        assert_eq!(src.calls.get(), 0);

        assert!(s.is_due(1800));
        let o = s.tick(1800, &src, &mut cache).await;
        assert!(o.weather_updated && o.forecast_updated && o.tip_changed);
        assert_eq!(s.state().last_success, 1800);
    }

    #[tokio::test]
    async fn test_idempotent_below_interval() {
        let mut s = RefreshScheduler::new(1800);
        let src = source_with_tip("Dry in London");
        let mut cache = MemoryCache::default();
        s.tick(5000, &src, &mut cache).await;
        let before = s.state().clone();
        for now in [5001, 5900, 6799] {
            assert!(!s.tick(now, &src, &mut cache).await.any());
        }
        assert_eq!(s.state(), &before);
        assert_eq!(src.calls.get(), 1);
        assert_eq!(cache.weather_saves, 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_state() {
        let mut s = RefreshScheduler::new(1800);
        let mut cache = MemoryCache::default();
        s.tick(2000, &source_with_tip("Breezy in London"), &mut cache).await;

        let bad = FakeSource { fail_current: true, fail_forecast: true, ..Default::default() };
        let o = s.tick(4000, &bad, &mut cache).await;
        assert!(!o.any());
        assert_eq!(s.state().last_success, 2000);
        assert_eq!(s.state().tip, "Breezy in London");
        assert!(s.state().weather.is_some());
        // still due, so the next tick retries
        assert!(s.is_due(4001));
    }

    #[tokio::test]
    async fn test_tip_never_replaced_by_sentinel() {
        let mut s = RefreshScheduler::new(10);
        let mut cache = MemoryCache::default();
        s.tick(100, &source_with_tip("Bring an umbrella to London"), &mut cache).await;

        let o = s.tick(200, &source_with_tip("Weather tip unavailable."), &mut cache).await;
        assert!(o.weather_updated);
        assert!(!o.tip_changed);
        assert_eq!(s.state().tip, "Bring an umbrella to London");

        // transport failure on the tip alone
        let no_tip = FakeSource::default();
        s.tick(300, &no_tip, &mut cache).await;
        assert_eq!(s.state().tip, "Bring an umbrella to London");
        let saved = cache.weather.as_ref().unwrap();
        assert_eq!(saved.ai_tip.as_deref(), Some("Bring an umbrella to London"));
        assert_eq!(saved.timestamp, 300);
    }

    #[tokio::test]
    async fn test_same_tip_does_not_restart_marquee() {
        let mut s = RefreshScheduler::new(10);
        let mut cache = MemoryCache::default();
        let src = source_with_tip("Mild in London");
        assert!(s.tick(100, &src, &mut cache).await.tip_changed);
        assert!(!s.tick(200, &src, &mut cache).await.tip_changed);
    }

    #[tokio::test]
    async fn test_placeholder_not_persisted() {
        let mut s = RefreshScheduler::new(10);
        let mut cache = MemoryCache::default();
        s.tick(100, &FakeSource::default(), &mut cache).await;
        assert_eq!(s.state().tip, TIP_PLACEHOLDER);
        assert_eq!(cache.weather.as_ref().unwrap().ai_tip, None);
    }

    #[tokio::test]
    async fn test_forecast_independent_of_weather() {
        let mut s = RefreshScheduler::new(10);
        let mut cache = MemoryCache::default();
        let src = FakeSource { fail_current: true, ..Default::default() };
        let o = s.tick(100, &src, &mut cache).await;
        assert!(!o.weather_updated);
        assert!(o.forecast_updated);
        assert_eq!(cache.forecast_saves, 1);
        assert_eq!(s.state().last_success, 0);
    }

    #[test]
    fn test_seed_from_cache() {
        let cache = MemoryCache {
            weather: Some(CachedWeather {
                timestamp: 1234,
                data: CurrentWeather::default(),
                ai_tip: Some("Cold in London".into()),
            }),
            ..Default::default()
        };
        let mut s = RefreshScheduler::new(1800);
        s.seed(&cache, false);
        assert_eq!(s.state().last_success, 1234);
        assert_eq!(s.state().tip, "Cold in London");

        let mut forced = RefreshScheduler::new(1800);
        forced.seed(&cache, true);
        assert_eq!(forced.state().last_success, 0);
        assert!(forced.state().weather.is_some());
    }

    #[test]
    fn test_real_tip_filter() {
        assert!(is_real_tip("Sunny all day"));
        assert!(!is_real_tip(""));
        assert!(!is_real_tip("Tip UNAVAILABLE right now"));
        assert!(!is_real_tip(TIP_PLACEHOLDER));
    }
}
