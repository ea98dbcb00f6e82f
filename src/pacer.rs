/*
 *  pacer.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame regulator: caps the loop at the target rate and reports what it achieved
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
use std::time::{Duration, Instant};

// SPI at 8MHz manages well over 60fps for a 256x64 gray4 push,
// the default of 40 leaves headroom for slow fetch ticks
pub struct FrameRegulator {
    frame: Duration,
    frame_start: Instant,
    ema_ms: f32,
    alpha: f32,
}

impl FrameRegulator {
    pub fn new(target_fps: u32) -> Self {
        Self {
            frame: Self::frame_for(target_fps),
            frame_start: Instant::now(),
            ema_ms: 0.0,
            alpha: 0.1,
        }
    }

    #[inline]
    fn frame_for(fps: u32) -> Duration {
        Duration::from_micros((1_000_000u32 / fps.max(1)) as u64)
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame
    }

    /// Mark the start of a tick.
    #[inline]
    pub fn begin(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Sleep left over once `elapsed` of the frame is spent; zero when over budget.
    pub fn remaining_after(&self, elapsed: Duration) -> Duration {
        self.frame.saturating_sub(elapsed)
    }

    /// Sleep out the rest of the frame, then fold the total frame time into the average.
    pub async fn pace(&mut self) {
        let rest = self.remaining_after(self.frame_start.elapsed());
        if !rest.is_zero() {
            tokio::time::sleep(rest).await;
        }
        self.record_frame_ms(self.frame_start.elapsed().as_secs_f32() * 1000.0);
    }

    pub fn record_frame_ms(&mut self, frame_ms: f32) {
        self.ema_ms = if self.ema_ms == 0.0 {
            frame_ms
        } else {
            self.alpha * frame_ms + (1.0 - self.alpha) * self.ema_ms
        };
    }

    /// Smoothed achieved frame rate, 0 before the first frame.
    pub fn effective_fps(&self) -> f32 {
        if self.ema_ms > 0.0 { 1000.0 / self.ema_ms } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval() {
        assert_eq!(FrameRegulator::new(40).frame_interval(), Duration::from_millis(25));
        // zero is clamped rather than dividing by it
        assert_eq!(FrameRegulator::new(0).frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_never_sleeps_negative() {
        let r = FrameRegulator::new(40);
        assert_eq!(r.remaining_after(Duration::from_millis(10)), Duration::from_millis(15));
        assert_eq!(r.remaining_after(Duration::from_millis(90)), Duration::ZERO);
    }

    #[test]
    fn test_effective_fps_tracks_frames() {
        let mut r = FrameRegulator::new(40);
        assert_eq!(r.effective_fps(), 0.0);
        for _ in 0..50 {
            r.record_frame_ms(50.0);
        }
        assert!((r.effective_fps() - 20.0).abs() < 0.5);
    }

    #[tokio::test]
    async fn test_pace_holds_the_frame() {
        let mut r = FrameRegulator::new(50);
        r.begin();
        let t = Instant::now();
        r.pace().await;
        assert!(t.elapsed() >= Duration::from_millis(15));
        assert!(r.effective_fps() > 0.0);
    }
}
