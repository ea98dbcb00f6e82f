/*
 *  display/transition.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  View switching: Idle -> Out -> In -> Idle, with wipe and blink curtains
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
use embedded_graphics::primitives::Rectangle;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::display::components::marquee::MarqueeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionEffect {
    #[default]
    Wipe,
    Blink,
}

impl FromStr for TransitionEffect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wipe" => Ok(TransitionEffect::Wipe),
            "blink" => Ok(TransitionEffect::Blink),
            other => Err(format!("unknown transition effect '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
}

fn black<D>(target: &mut D, x0: i32, y0: i32, x1: i32, y1: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    if x1 <= x0 || y1 <= y0 {
        return Ok(());
    }
    let area = Rectangle::new(Point::new(x0, y0), Size::new((x1 - x0) as u32, (y1 - y0) as u32));
    target.fill_solid(&area, BinaryColor::Off)
}

impl TransitionEffect {
    /// Both effects animate the incoming view as well as the outgoing one.
    pub fn has_entry_animation(&self) -> bool {
        match self {
            TransitionEffect::Wipe | TransitionEffect::Blink => true,
        }
    }

    /// Black out the part of an already drawn frame that is hidden at `progress`.
    pub fn render<D>(&self, target: &mut D, direction: Direction, progress: f32) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let size = target.bounding_box().size;
        let (w, h) = (size.width as i32, size.height as i32);
        let p = progress.clamp(0.0, 1.0);
        match self {
            TransitionEffect::Wipe => match direction {
                Direction::Out => {
                    let curtain = (w as f32 * p) as i32;
                    black(target, w - curtain, 0, w, h)
                }
                Direction::In => {
                    let curtain_x = (w as f32 * p) as i32;
                    black(target, curtain_x, 0, w, h)
                }
            },
            TransitionEffect::Blink => {
                let q = match direction {
                    Direction::Out => 1.0 - p,
                    Direction::In => p,
                };
                let (cx, cy) = (w / 2, h / 2);
                let (hw, hh) = ((cx as f32 * q) as i32, (cy as f32 * q) as i32);
                black(target, 0, 0, w, cy - hh)?;
                black(target, 0, cy + hh, w, h)?;
                black(target, 0, cy - hh, cx - hw, cy + hh)?;
                black(target, cx + hw, cy - hh, w, cy + hh)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Idle,
    Out { started: DateTime<Local> },
    In { started: DateTime<Local> },
}

/// What the frame loop should draw this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionStep {
    /// normal frame, marquee advances
    Steady,
    /// transition frame: content plus curtain
    Frame { direction: Direction, progress: f32 },
    /// phase boundary, nothing is drawn
    Boundary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSelector {
    pub showing_forecast: bool,
}

fn secs_between(later: DateTime<Local>, earlier: DateTime<Local>) -> f64 {
    (later - earlier)
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or(f64::MAX)
}

#[derive(Debug)]
pub struct TransitionController {
    effect: TransitionEffect,
    duration_secs: f64,
    /// 0 means "switch when the tip has scrolled off"
    display_duration_secs: u64,
    off_screen_wait_secs: f64,
    phase: TransitionPhase,
    last_view_switch: DateTime<Local>,
    scroll_off_event: Option<DateTime<Local>>,
}

impl TransitionController {
    pub fn new(
        effect: TransitionEffect,
        duration_secs: f64,
        display_duration_secs: u64,
        off_screen_wait_secs: f64,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            effect,
            duration_secs,
            display_duration_secs,
            off_screen_wait_secs,
            phase: TransitionPhase::Idle,
            last_view_switch: now,
            scroll_off_event: None,
        }
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn effect(&self) -> TransitionEffect {
        self.effect
    }

    pub fn is_transitioning(&self) -> bool {
        !matches!(self.phase, TransitionPhase::Idle)
    }

    fn enter_out(&mut self, now: DateTime<Local>, marquee: &mut MarqueeState) {
        debug!("transition out ({:?})", self.effect);
        self.phase = TransitionPhase::Out { started: now };
        marquee.reset();
    }

    fn progress(&self, now: DateTime<Local>, started: DateTime<Local>) -> f64 {
        secs_between(now, started) / self.duration_secs
    }

    /// Advance the state machine for this tick's `now`.
    pub fn update(
        &mut self,
        now: DateTime<Local>,
        marquee: &mut MarqueeState,
        view: &mut ViewSelector,
    ) -> TransitionStep {
        let idle = !self.is_transitioning();
        if self.display_duration_secs > 0 {
            if idle && secs_between(now, self.last_view_switch) > self.display_duration_secs as f64 {
                self.last_view_switch = now;
                self.enter_out(now, marquee);
            }
        } else {
            // a marquee restarted by a new tip must scroll off again
            if !marquee.scroll_complete {
                self.scroll_off_event = None;
            } else if self.scroll_off_event.is_none() {
                self.scroll_off_event = Some(now);
            }
            if let Some(event) = self.scroll_off_event {
                if idle && secs_between(now, event) > self.off_screen_wait_secs {
                    self.scroll_off_event = None;
                    marquee.scroll_complete = false;
                    self.enter_out(now, marquee);
                }
            }
        }

        match self.phase {
            TransitionPhase::Idle => TransitionStep::Steady,
            TransitionPhase::Out { started } => {
                let p = self.progress(now, started);
                if p >= 1.0 {
                    view.showing_forecast = !view.showing_forecast;
                    marquee.reset();
                    info!(
                        "switched to {} view",
                        if view.showing_forecast { "forecast" } else { "current weather" }
                    );
                    self.phase = if self.effect.has_entry_animation() {
                        TransitionPhase::In { started: now }
                    } else {
                        TransitionPhase::Idle
                    };
                    TransitionStep::Boundary
                } else {
                    TransitionStep::Frame { direction: Direction::Out, progress: p as f32 }
                }
            }
            TransitionPhase::In { started } => {
                let p = self.progress(now, started);
                if p >= 1.0 {
                    self.phase = TransitionPhase::Idle;
                    TransitionStep::Boundary
                } else {
                    TransitionStep::Frame { direction: Direction::In, progress: p as f32 }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::bitmap::Bitmap;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    fn lit(w: u32, h: u32) -> Bitmap {
        let mut b = Bitmap::new(w, h);
        b.clear_color(BinaryColor::On);
        b
    }

    #[test]
    fn test_wipe_half_way() {
        let now = t0();
        let mut tc = TransitionController::new(TransitionEffect::Wipe, 0.2, 5, 1.0, now);
        let mut m = MarqueeState::default();
        let mut v = ViewSelector::default();

        let trigger = now + Duration::seconds(6);
        assert!(matches!(tc.update(trigger, &mut m, &mut v), TransitionStep::Frame { direction: Direction::Out, .. }));

        let step = tc.update(trigger + ms(100), &mut m, &mut v);
        let TransitionStep::Frame { direction, progress } = step else { panic!("expected frame, got {step:?}") };
        assert_eq!(direction, Direction::Out);
        assert!((progress - 0.5).abs() < 1e-6);

        let mut b = lit(256, 64);
        TransitionEffect::Wipe.render(&mut b, direction, progress).unwrap();
        assert!(b.is_on(127, 10));
        assert!(!b.is_on(128, 10));
        assert_eq!(b.count_on(), 128 * 64);
    }

    #[test]
    fn test_full_cycle_flips_once() {
        let now = t0();
        let mut tc = TransitionController::new(TransitionEffect::Wipe, 0.2, 5, 1.0, now);
        let mut m = MarqueeState::default();
        let mut v = ViewSelector::default();

        assert_eq!(tc.update(now + ms(1000), &mut m, &mut v), TransitionStep::Steady);
        let start = now + ms(5001);
        tc.update(start, &mut m, &mut v);
        assert!(matches!(tc.phase(), TransitionPhase::Out { .. }));

        // Out -> In boundary renders nothing and flips the view
        assert_eq!(tc.update(start + ms(200), &mut m, &mut v), TransitionStep::Boundary);
        assert!(v.showing_forecast);
        assert!(matches!(tc.phase(), TransitionPhase::In { .. }));

        let step = tc.update(start + ms(300), &mut m, &mut v);
        assert!(matches!(step, TransitionStep::Frame { direction: Direction::In, .. }));
        assert_eq!(tc.update(start + ms(400), &mut m, &mut v), TransitionStep::Boundary);
        assert_eq!(tc.phase(), TransitionPhase::Idle);
        assert!(v.showing_forecast);
        assert_eq!(tc.update(start + ms(500), &mut m, &mut v), TransitionStep::Steady);
    }

    #[test]
    fn test_scroll_off_trigger() {
        let now = t0();
        let mut tc = TransitionController::new(TransitionEffect::Blink, 0.2, 0, 1.0, now);
        let mut m = MarqueeState::default();
        let mut v = ViewSelector::default();

        m.scroll_complete = true;
        m.horizontal_offset = 40;
        assert_eq!(tc.update(now, &mut m, &mut v), TransitionStep::Steady);
        // wait must be strictly exceeded
        assert_eq!(tc.update(now + ms(1000), &mut m, &mut v), TransitionStep::Steady);
        let step = tc.update(now + ms(1001), &mut m, &mut v);
        assert!(matches!(step, TransitionStep::Frame { direction: Direction::Out, .. }));
        assert!(!m.scroll_complete);
        assert_eq!(m.horizontal_offset, 0);
    }

    #[test]
    fn test_new_tip_restarts_the_off_screen_wait() {
        let now = t0();
        let mut tc = TransitionController::new(TransitionEffect::Wipe, 0.2, 0, 1.0, now);
        let mut m = MarqueeState::default();
        let mut v = ViewSelector::default();

        m.scroll_complete = true;
        assert_eq!(tc.update(now, &mut m, &mut v), TransitionStep::Steady);
        m.reset();
        assert_eq!(tc.update(now + ms(1500), &mut m, &mut v), TransitionStep::Steady);
        assert_eq!(tc.phase(), TransitionPhase::Idle);

        // the wait counts from the second scroll-off
        m.scroll_complete = true;
        assert_eq!(tc.update(now + ms(2000), &mut m, &mut v), TransitionStep::Steady);
        assert_eq!(tc.update(now + ms(3000), &mut m, &mut v), TransitionStep::Steady);
        let step = tc.update(now + ms(3001), &mut m, &mut v);
        assert!(matches!(step, TransitionStep::Frame { direction: Direction::Out, .. }));
    }

    #[test]
    fn test_no_trigger_while_transitioning() {
        let now = t0();
        let mut tc = TransitionController::new(TransitionEffect::Wipe, 10.0, 0, 0.0, now);
        let mut m = MarqueeState::default();
        let mut v = ViewSelector::default();
        m.scroll_complete = true;
        tc.update(now, &mut m, &mut v);
        tc.update(now + ms(1), &mut m, &mut v);
        let started = match tc.phase() {
            TransitionPhase::Out { started } => started,
            other => panic!("expected Out, got {other:?}"),
        };
        m.scroll_complete = true;
        tc.update(now + ms(5), &mut m, &mut v);
        tc.update(now + ms(10), &mut m, &mut v);
        assert_eq!(tc.phase(), TransitionPhase::Out { started });
    }

    #[test]
    fn test_blink_extremes() {
        let mut b = lit(256, 64);
        TransitionEffect::Blink.render(&mut b, Direction::Out, 0.0).unwrap();
        assert_eq!(b.count_on(), 256 * 64);

        let mut b = lit(256, 64);
        TransitionEffect::Blink.render(&mut b, Direction::In, 0.0).unwrap();
        assert_eq!(b.count_on(), 0);

        let mut b = lit(256, 64);
        TransitionEffect::Blink.render(&mut b, Direction::In, 0.5).unwrap();
        // centred 128x32 window survives
        assert_eq!(b.count_on(), 128 * 32);
        assert!(b.is_on(128, 32));
        assert!(!b.is_on(10, 32));
    }

    #[test]
    fn test_wipe_in_reveals_from_left() {
        let mut b = lit(256, 64);
        TransitionEffect::Wipe.render(&mut b, Direction::In, 0.25).unwrap();
        assert!(b.is_on(63, 0));
        assert!(!b.is_on(64, 0));
    }

    #[test]
    fn test_parse_effect() {
        assert_eq!("Blink".parse::<TransitionEffect>().unwrap(), TransitionEffect::Blink);
        assert!("fade".parse::<TransitionEffect>().is_err());
    }
}
