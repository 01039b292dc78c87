use marchview_common::FrameState;
use std::time::{Duration, Instant};

/// Fixed-rate frame clock.
///
/// `tick` sleeps out whatever remains of the frame budget, then records the
/// iteration. A target of 0 fps disables the sleep.
#[derive(Debug)]
pub struct FrameClock {
    budget: Option<Duration>,
    started: Instant,
    last: Instant,
    state: FrameState,
}

impl FrameClock {
    pub fn new(target_fps: u32) -> Self {
        let now = Instant::now();
        Self {
            budget: (target_fps > 0).then(|| Duration::from_secs_f64(1.0 / target_fps as f64)),
            started: now,
            last: now,
            state: FrameState::default(),
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Finish the current frame.
    pub fn tick(&mut self) -> FrameState {
        if let Some(budget) = self.budget {
            let spent = self.last.elapsed();
            if spent < budget {
                std::thread::sleep(budget - spent);
            }
        }
        let now = Instant::now();
        self.state = FrameState {
            elapsed: (now - self.started).as_secs_f32(),
            frame: self.state.frame + 1,
            delta: (now - self.last).as_secs_f32(),
        };
        self.last = now;
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_clock_counts_frames() {
        let mut clock = FrameClock::new(0);
        for _ in 0..5 {
            clock.tick();
        }
        assert_eq!(clock.state().frame, 5);
    }

    #[test]
    fn elapsed_is_monotonic() {
        let mut clock = FrameClock::new(0);
        let a = clock.tick();
        let b = clock.tick();
        assert!(b.elapsed >= a.elapsed);
        assert!(b.delta >= 0.0);
    }

    #[test]
    fn limited_clock_waits_out_the_budget() {
        let mut clock = FrameClock::new(200);
        let start = Instant::now();
        clock.tick();
        clock.tick();
        // Two 5 ms frames; allow generous slack below for timer granularity.
        assert!(start.elapsed() >= Duration::from_millis(9));
    }
}
