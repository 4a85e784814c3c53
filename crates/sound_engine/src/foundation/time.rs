//! Frame timing for driving [`SoundManager::update`](crate::audio::SoundManager::update)

use std::time::Instant;

/// Frame clock producing the `(time, delta)` pair in seconds
///
/// Either follows the wall clock through [`tick`](Self::tick) or a
/// simulated one through [`advance`](Self::advance).
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_frame: Instant,
    delta: f64,
    time: f64,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: 0.0,
            time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance by the wall time since the previous frame
    pub fn tick(&mut self) -> (f64, f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
        self.advance(elapsed)
    }

    /// Advance by a fixed step; negative steps count as zero
    pub fn advance(&mut self, delta: f64) -> (f64, f64) {
        self.delta = delta.max(0.0);
        self.time += self.delta;
        self.frame_count += 1;
        (self.time, self.delta)
    }

    /// Seconds covered by the last frame
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Seconds since the clock started
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Frames advanced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second since the clock started
    pub fn average_fps(&self) -> f64 {
        if self.time > 0.0 {
            self.frame_count as f64 / self.time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_advance_accumulates() {
        let mut clock = FrameClock::new();
        clock.advance(0.25);
        let (time, delta) = clock.advance(0.5);

        assert_relative_eq!(time, 0.75);
        assert_relative_eq!(delta, 0.5);
        assert_eq!(clock.frame_count(), 2);
        assert_relative_eq!(clock.average_fps(), 2.0 / 0.75);
    }

    #[test]
    fn test_negative_step_is_ignored() {
        let mut clock = FrameClock::new();
        clock.advance(1.0);
        let (time, delta) = clock.advance(-3.0);

        assert_relative_eq!(time, 1.0);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn test_tick_moves_forward() {
        let mut clock = FrameClock::new();
        let (time, delta) = clock.tick();
        assert!(delta >= 0.0);
        assert_relative_eq!(time, delta);
        assert!(clock.average_fps() >= 0.0);
    }
}
