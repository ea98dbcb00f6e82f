/*
 *  app.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  The frame loop: gating, refresh, transitions and drawing, once per tick
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

use chrono::{DateTime, Local, Timelike};
use embedded_graphics::prelude::*;
use log::{debug, error, info};
use std::time::Duration;

use crate::cache::CacheStore;
use crate::config::{Config, OperatingHours};
use crate::display::bitmap::Bitmap;
use crate::display::canvas::Canvas;
use crate::display::components::{Header, Marquee, ViewComposer};
use crate::display::fonts::FontFace;
use crate::display::icons::IconSet;
use crate::display::text_cache::TextRasterCache;
use crate::display::traits::DisplayDriver;
use crate::display::transition::{Direction, TransitionController, TransitionStep, ViewSelector};
use crate::pacer::FrameRegulator;
use crate::refresh::{RefreshOutcome, RefreshScheduler};
use crate::time_source::TimeSource;
use crate::weather::WeatherSource;

pub const API_KEY_MESSAGE: &str = "API Key Not Set!";
const MISSING_KEY_IDLE: Duration = Duration::from_secs(1800);

/// What a tick did, mostly for the run loop's choice of sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// steady frame drawn
    Frame,
    /// frame drawn under a transition curtain
    TransitionFrame,
    /// phase boundary, nothing drawn
    Boundary,
    /// outside operating hours
    Inactive,
    /// no API key, static notice shown
    MissingKey,
}

/// Everything the loop mutates, owned in one place.
#[derive(Debug)]
pub struct AppState {
    pub refresh: RefreshScheduler,
    pub transition: TransitionController,
    pub view: ViewSelector,
    pub marquee: Marquee,
    pub header: Header,
    pub composer: ViewComposer,
    pub text_cache: TextRasterCache,
    pub icons: IconSet,
    pub current_bg: Bitmap,
    pub forecast_bg: Bitmap,
    /// minute the current background was composed in
    current_bg_minute: i64,
}

impl AppState {
    fn recompose_current(&mut self, now: DateTime<Local>) {
        let data = self.refresh.state();
        self.current_bg = match &data.weather {
            Some(w) => self.composer.compose_current(&mut self.text_cache, &mut self.icons, w, now, data.last_success),
            None => Bitmap::new(self.current_bg.width(), self.current_bg.height()),
        };
        self.current_bg_minute = now.timestamp().div_euclid(60);
    }

    fn recompose_forecast(&mut self) {
        let forecast = self.refresh.state().forecast.as_ref();
        self.forecast_bg = self.composer.compose_forecast(&mut self.text_cache, &mut self.icons, forecast);
    }

    fn apply(&mut self, outcome: RefreshOutcome, now: DateTime<Local>) {
        if outcome.weather_updated {
            self.recompose_current(now);
        }
        if outcome.forecast_updated {
            self.recompose_forecast();
        }
        if outcome.tip_changed {
            self.marquee.set_text(&self.refresh.state().tip);
        }
    }

    /// "Sunset" and "Updated 5m ago" age with the clock; redraw them once a minute.
    fn refresh_clock_slots(&mut self, now: DateTime<Local>) {
        if self.composer.has_time_sensitive_slots()
            && self.refresh.state().weather.is_some()
            && now.timestamp().div_euclid(60) != self.current_bg_minute
        {
            self.recompose_current(now);
        }
    }
}

pub struct FrameLoop<D, S, C>
where
    D: DisplayDriver,
    S: WeatherSource,
    C: CacheStore,
{
    driver: D,
    source: Option<S>,
    cache: C,
    state: AppState,
    time: TimeSource,
    pacer: FrameRegulator,
    operating_hours: OperatingHours,
    inactive_poll: Duration,
    fps_log_interval: i64,
    last_fps_log: DateTime<Local>,
    frames_since_log: u32,
    active: Option<bool>,
    key_notice_shown: bool,
}

impl<D, S, C> FrameLoop<D, S, C>
where
    D: DisplayDriver,
    S: WeatherSource,
    C: CacheStore,
{
    /// `source` is `None` when no API key is configured.
    pub fn new(cfg: &Config, driver: D, source: Option<S>, cache: C, time: TimeSource) -> Self {
        let now = time.now();
        let (width, height) = driver.dimensions();

        let mut text_cache = TextRasterCache::new();
        let header = Header::new(&mut text_cache, width, &cfg.location, cfg.show_umbrella_icon, cfg.debug);

        let mut refresh = RefreshScheduler::new(cfg.update_interval_secs);
        refresh.seed(&cache, cfg.force_refresh);

        let mut marquee = Marquee::new(FontFace::Small, cfg.scroll_pause_secs);
        marquee.set_text(&refresh.state().tip);

        let mut state = AppState {
            refresh,
            transition: TransitionController::new(
                cfg.transition_effect,
                cfg.transition_duration_secs,
                cfg.display_duration_secs,
                cfg.scroll_off_screen_wait_secs,
                now,
            ),
            view: ViewSelector::default(),
            marquee,
            header,
            composer: ViewComposer::new(width, height, cfg.units, cfg.weather_slots),
            text_cache,
            icons: IconSet::new(&cfg.assets_dir),
            current_bg: Bitmap::new(width, height),
            forecast_bg: Bitmap::new(width, height),
            current_bg_minute: 0,
        };
        state.recompose_current(now);
        state.recompose_forecast();

        Self {
            driver,
            source,
            cache,
            state,
            time,
            pacer: FrameRegulator::new(cfg.fps),
            operating_hours: cfg.operating_hours,
            inactive_poll: Duration::from_secs(cfg.inactive_poll_secs),
            fps_log_interval: cfg.fps_log_interval_secs as i64,
            last_fps_log: now,
            frames_since_log: 0,
            active: None,
            key_notice_shown: false,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn show_missing_key(&mut self) -> TickOutcome {
        if !self.key_notice_shown {
            error!("openWeatherApiKey is not set");
            let mut canvas = Canvas::acquire(&mut self.driver);
            let notice = self.state.text_cache.measure_and_render(API_KEY_MESSAGE, FontFace::Medium);
            let Ok(()) = notice.bitmap.blit(&mut canvas, Point::new(10, 20));
            self.key_notice_shown = true;
        }
        TickOutcome::MissingKey
    }

    fn draw(&mut self, now: DateTime<Local>, curtain: Option<(Direction, f32)>) {
        let st = &mut self.state;
        let mut canvas = Canvas::acquire(&mut self.driver);

        let bg = if st.view.showing_forecast { &st.forecast_bg } else { &st.current_bg };
        let Ok(()) = bg.blit(&mut canvas, Point::zero());

        let Ok(tip_origin) = st.header.render(
            &mut st.text_cache,
            &mut st.icons,
            &mut canvas,
            &now,
            st.view.showing_forecast,
            st.marquee.text(),
        );

        st.marquee.advance(&mut st.text_cache, now, curtain.is_some());
        let Ok(()) = st.marquee.render(&mut st.text_cache, &mut canvas, tip_origin);

        if let Some((direction, progress)) = curtain {
            let Ok(()) = st.transition.effect().render(&mut canvas, direction, progress);
        }
    }

    /// Count a drawn frame and report the drawn rate once per log interval.
    fn log_fps(&mut self, now: DateTime<Local>, drawn: bool) -> Option<f64> {
        if drawn {
            self.frames_since_log += 1;
        }
        let elapsed = (now - self.last_fps_log).num_milliseconds();
        if self.fps_log_interval <= 0 || elapsed < self.fps_log_interval * 1000 {
            return None;
        }
        let fps = self.frames_since_log as f64 * 1000.0 / elapsed as f64;
        info!(
            "{:.1} fps drawn over the last {}s (paced {:.1}), {} cached rasters",
            fps,
            elapsed / 1000,
            self.pacer.effective_fps(),
            self.state.text_cache.len()
        );
        self.frames_since_log = 0;
        self.last_fps_log = now;
        Some(fps)
    }

    /// One pass of the loop for the instant `now`. Never fails; fetch and
    /// cache errors are logged and the previous data stays on screen.
    pub async fn tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        let Some(source) = self.source.as_ref() else {
            return self.show_missing_key();
        };

        let active = self.operating_hours.is_active(now.hour());
        if self.active != Some(active) {
            info!("display {} ({})", if active { "active" } else { "sleeping" }, self.operating_hours);
            if !active {
                if let Err(e) = self.driver.blank() {
                    error!("failed to blank display: {}", e);
                }
            }
            self.active = Some(active);
        }
        if !active {
            return TickOutcome::Inactive;
        }

        let ts = now.timestamp();
        if self.state.refresh.is_due(ts) {
            let outcome = self.state.refresh.tick(ts, source, &mut self.cache).await;
            debug!("refresh outcome {:?}", outcome);
            self.state.apply(outcome, now);
        }
        self.state.refresh_clock_slots(now);

        let st = &mut self.state;
        let step = st.transition.update(now, &mut st.marquee.state, &mut st.view);
        let outcome = match step {
            TransitionStep::Boundary => TickOutcome::Boundary,
            TransitionStep::Steady => {
                self.draw(now, None);
                TickOutcome::Frame
            }
            TransitionStep::Frame { direction, progress } => {
                self.draw(now, Some((direction, progress)));
                TickOutcome::TransitionFrame
            }
        };
        self.log_fps(now, matches!(outcome, TickOutcome::Frame | TickOutcome::TransitionFrame));
        outcome
    }

    /// Tick forever at the configured rate.
    pub async fn run(&mut self) {
        info!("entering display loop");
        loop {
            self.pacer.begin();
            let now = self.time.now();
            match self.tick(now).await {
                TickOutcome::Inactive => tokio::time::sleep(self.inactive_poll).await,
                TickOutcome::MissingKey => tokio::time::sleep(MISSING_KEY_IDLE).await,
                _ => self.pacer.pace().await,
            }
        }
    }

    /// Leave the panel dark on the way out.
    pub fn shutdown(&mut self) {
        info!("clearing display");
        if let Err(e) = self.driver.blank() {
            error!("failed to clear display on exit: {}", e);
        }
    }
}
