//! Time management utilities
//!
//! Frame timing for the tick driver, the fixed-step accumulator that turns
//! wall-clock time into update steps, and the monotonic clock used to stamp
//! events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

static CLOCK_EPOCH: OnceLock<Instant> = OnceLock::new();
static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Nanoseconds since the first call in this process.
///
/// Strictly increasing across all threads: two calls never return the same
/// value, even when the underlying clock has not advanced.
pub fn monotonic_nanos() -> u64 {
    let epoch = CLOCK_EPOCH.get_or_init(Instant::now);
    let now = u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
    let next = |last: u64| now.max(last.saturating_add(1));
    match LAST_STAMP.fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(next(last))) {
        Ok(previous) | Err(previous) => next(previous),
    }
}

/// Frame timer with once-per-second FPS/UPS counters
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    window: f32,
    fps: u32,
    fps_count: u32,
    ups: u32,
    ups_count: u32,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            window: 0.0,
            fps: 0,
            fps_count: 0,
            ups: 0,
            ups_count: 0,
        }
    }

    /// Measure the time since the previous tick and return it in seconds
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.advance(elapsed);
        elapsed
    }

    /// Account for `elapsed` seconds without reading the clock
    pub fn advance(&mut self, elapsed: f32) {
        self.delta_time = elapsed;
        self.total_time += elapsed;
        self.window += elapsed;

        if self.window > 1.0 {
            self.fps = self.fps_count;
            self.fps_count = 0;
            self.ups = self.ups_count;
            self.ups_count = 0;
            self.window -= 1.0;
        }
    }

    /// Record a rendered frame
    pub fn count_frame(&mut self) {
        self.fps_count += 1;
    }

    /// Record a fixed update step
    pub fn count_update(&mut self) {
        self.ups_count += 1;
    }

    /// Get the time since the last tick in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Frames rendered during the last full second, or so far if none has passed yet
    pub fn fps(&self) -> u32 {
        if self.fps > 0 {
            self.fps
        } else {
            self.fps_count
        }
    }

    /// Updates run during the last full second, or so far if none has passed yet
    pub fn ups(&self) -> u32 {
        if self.ups > 0 {
            self.ups
        } else {
            self.ups_count
        }
    }
}

/// Accumulator converting variable frame times into fixed update steps
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    interval: f64,
    accumulator: f64,
}

impl FixedTimestep {
    /// Create a timestep running `target_ups` updates per second
    pub fn new(target_ups: u32) -> Self {
        Self {
            interval: 1.0 / f64::from(target_ups.max(1)),
            accumulator: 0.0,
        }
    }

    /// Length of one update step in seconds
    #[allow(clippy::cast_possible_truncation)]
    pub fn interval(&self) -> f32 {
        self.interval as f32
    }

    /// Add wall-clock time to the accumulator
    pub fn accumulate(&mut self, elapsed: f32) {
        self.accumulator += f64::from(elapsed.max(0.0));
    }

    /// Consume one step if enough time has accumulated
    pub fn consume_step(&mut self) -> bool {
        if self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            true
        } else {
            false
        }
    }

    /// Drop whole steps that could not be run this frame, keeping the partial remainder
    pub fn discard_backlog(&mut self) -> u32 {
        let whole = (self.accumulator / self.interval).floor();
        self.accumulator -= whole * self.interval;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let dropped = whole as u32;
        dropped
    }

    /// Fraction of a step left over, in `[0, 1)`
    #[allow(clippy::cast_possible_truncation)]
    pub fn alpha(&self) -> f32 {
        let alpha = (self.accumulator / self.interval) as f32;
        alpha.clamp(0.0, 1.0 - f32::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_monotonic_nanos_strictly_increasing() {
        let stamps: Vec<u64> = (0..1000).map(|_| monotonic_nanos()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_monotonic_nanos_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| monotonic_nanos()).collect::<Vec<_>>()))
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("clock thread panicked"))
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_timer_counters_roll_over_each_second() {
        let mut timer = Timer::new();
        for _ in 0..30 {
            timer.count_frame();
            timer.count_update();
            timer.count_update();
        }
        assert_eq!(timer.fps(), 30);
        assert_eq!(timer.ups(), 60);

        timer.advance(1.1);
        timer.count_frame();
        assert_eq!(timer.fps(), 30);
        assert_eq!(timer.ups(), 60);
        assert_relative_eq!(timer.delta_time(), 1.1);
        assert_relative_eq!(timer.total_time(), 1.1);
    }

    #[test]
    fn test_fixed_timestep_steps_and_alpha() {
        let mut step = FixedTimestep::new(60);
        step.accumulate(step.interval() * 2.5);

        let mut steps = 0;
        while step.consume_step() {
            steps += 1;
        }

        assert_eq!(steps, 2);
        assert_relative_eq!(step.alpha(), 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_fixed_timestep_alpha_stays_below_one() {
        let mut step = FixedTimestep::new(30);
        step.accumulate(step.interval() * 7.25);
        let dropped = step.discard_backlog();

        assert_eq!(dropped, 7);
        assert!(step.alpha() < 1.0);
        assert_relative_eq!(step.alpha(), 0.25, epsilon = 1e-3);
        assert!(!step.consume_step());
    }

    #[test]
    fn test_fixed_timestep_ignores_negative_time() {
        let mut step = FixedTimestep::new(60);
        step.accumulate(-1.0);
        assert!(!step.consume_step());
        assert_relative_eq!(step.alpha(), 0.0);
    }
}
