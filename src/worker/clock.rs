use crate::config::PipelineConfig;

/// Elapsed animation time plus the running flag.
///
/// Timestamps are seconds on any monotonic timeline; only differences
/// between consecutive ticks matter.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    elapsed: f32,
    running: bool,
    last_tick: Option<f64>,
    nominal_delta: f32,
    max_delta: f32,
}

impl AnimationClock {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            elapsed: 0.0,
            running: false,
            last_tick: None,
            nominal_delta: config.nominal_frame_interval,
            max_delta: config.max_frame_delta,
        }
    }

    /// Returns `false` when the clock was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.last_tick = None;
        true
    }

    /// Freezes elapsed time. Returns `false` when already stopped.
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        self.last_tick = None;
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advances to `now` and returns the applied delta, or `None` while
    /// stopped. The first tick after `start` applies the nominal frame
    /// interval.
    pub fn advance(&mut self, now: f64) -> Option<f32> {
        if !self.running {
            return None;
        }
        let delta = match self.last_tick {
            None => self.nominal_delta,
            Some(previous) => ((now - previous) as f32).clamp(0.0, self.max_delta),
        };
        self.last_tick = Some(now);
        self.elapsed += delta;
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> AnimationClock {
        AnimationClock::new(&PipelineConfig::default())
    }

    #[test]
    fn first_tick_uses_nominal_interval() {
        let mut clock = clock();
        assert_eq!(clock.advance(5.0), None);
        assert!(clock.start());
        assert_eq!(clock.advance(100.0), Some(1.0 / 60.0));
        let delta = clock.advance(100.02).unwrap();
        assert!((delta - 0.02).abs() < 1e-4);
    }

    #[test]
    fn restart_resets_baseline_and_keeps_elapsed() {
        let mut clock = clock();
        clock.start();
        clock.advance(1.0);
        clock.advance(1.05);
        let frozen = clock.elapsed();
        assert!(clock.stop());
        assert!(!clock.stop());
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed(), frozen);

        // Ten seconds of wall time pass while stopped.
        clock.start();
        let delta = clock.advance(11.05).unwrap();
        assert!(delta <= 1.0 / 60.0 + f32::EPSILON);
        assert!((clock.elapsed() - frozen - delta).abs() < 1e-6);
    }

    #[test]
    fn start_is_idempotent() {
        let mut clock = clock();
        assert!(clock.start());
        clock.advance(0.0);
        assert!(!clock.start());
        let delta = clock.advance(0.01).unwrap();
        assert!((delta - 0.01).abs() < 1e-4);
    }

    #[test]
    fn long_gaps_are_clamped() {
        let mut clock = clock();
        clock.start();
        clock.advance(0.0);
        assert_eq!(clock.advance(3.0), Some(0.1));
        assert_eq!(clock.advance(2.0), Some(0.0));
    }
}
