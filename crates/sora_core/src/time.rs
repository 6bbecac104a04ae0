//! Frame time and pacing
//!
//! Wall-clock frame stepping: every frame measures its delta against a
//! monotonic clock and sleeps off whatever is left of the frame budget.

use std::time::{Duration, Instant};

/// Default frame rate cap (60 Hz = 16.666ms per frame)
pub const DEFAULT_FPS: u32 = 60;

/// Timing information handed to every stage of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds since the clock started.
    pub elapsed: f64,
    /// Index of this frame, starting at 0.
    pub frame: u64,
}

impl FrameTime {
    /// A synthetic frame with a fixed delta, for headless stepping and tests.
    pub fn fixed(delta: f32, frame: u64) -> Self {
        Self {
            delta,
            elapsed: delta as f64 * frame as f64,
            frame,
        }
    }
}

impl Default for FrameTime {
    fn default() -> Self {
        Self::fixed(0.0, 0)
    }
}

/// Monotonic clock with a frame-rate limiter.
pub struct FrameClock {
    target_fps: u32,
    started: Instant,
    last: Instant,
    frame_count: u64,
}

impl FrameClock {
    pub fn new(target_fps: u32) -> Self {
        let now = Instant::now();
        Self {
            target_fps,
            started: now,
            last: now,
            frame_count: 0,
        }
    }

    /// Frame budget, or `None` when the rate is uncapped (`target_fps == 0`).
    pub fn frame_budget(&self) -> Option<Duration> {
        (self.target_fps > 0).then(|| Duration::from_secs_f64(1.0 / self.target_fps as f64))
    }

    /// Seconds since the clock was created.
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Start a new frame and report how long the previous one took.
    pub fn begin_frame(&mut self) -> FrameTime {
        let now = Instant::now();
        let delta = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        let time = FrameTime {
            delta,
            elapsed: now.duration_since(self.started).as_secs_f64(),
            frame: self.frame_count,
        };
        self.frame_count += 1;
        time
    }

    /// Sleep until the current frame's budget is used up.
    ///
    /// Returns the time slept.
    pub fn limit(&self) -> Duration {
        let Some(budget) = self.frame_budget() else {
            return Duration::ZERO;
        };
        let spent = self.last.elapsed();
        if spent >= budget {
            return Duration::ZERO;
        }
        let remaining = budget - spent;
        std::thread::sleep(remaining);
        remaining
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}
