use std::time::{Duration, Instant};

/// Elapsed time since the last reset and the fastest time at which every
/// city was observed connected. The caller supplies `now`.
#[derive(Clone, Debug)]
pub struct RunClock {
    start: Instant,
    best: Option<Duration>,
}

impl RunClock {
    pub fn new(now: Instant) -> Self {
        Self { start: now, best: None }
    }

    pub fn restart(&mut self, now: Instant) {
        self.start = now;
        self.best = None;
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// Record a tick outcome; keeps the smallest connected time seen.
    pub fn observe(&mut self, now: Instant, all_connected: bool) -> Duration {
        let t = self.elapsed(now);
        if all_connected && self.best.is_none_or(|b| t < b) {
            self.best = Some(t);
        }
        t
    }

    pub fn best(&self) -> Option<Duration> {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_only_tracks_connected_ticks() {
        let t0 = Instant::now();
        let mut clock = RunClock::new(t0);
        clock.observe(t0 + Duration::from_secs(1), false);
        assert_eq!(clock.best(), None);
        clock.observe(t0 + Duration::from_secs(5), true);
        clock.observe(t0 + Duration::from_secs(9), true);
        assert_eq!(clock.best(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn restart_clears_best() {
        let t0 = Instant::now();
        let mut clock = RunClock::new(t0);
        clock.observe(t0 + Duration::from_secs(2), true);
        let t1 = t0 + Duration::from_secs(3);
        clock.restart(t1);
        assert_eq!(clock.best(), None);
        assert_eq!(clock.elapsed(t1 + Duration::from_millis(500)), Duration::from_millis(500));
    }
}
