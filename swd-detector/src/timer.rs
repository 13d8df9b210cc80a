use std::time::{Duration, Instant};

/// Measures the time spent in consecutive stages of one analysis,
/// and the time elapsed since the analysis started.
#[derive(Debug, Clone)]
pub(crate) struct Timer {
    start: Instant,
    lap_start: Instant,
    limit: Option<Duration>,
}

impl Timer {
    pub(crate) fn new(limit: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            lap_start: now,
            limit,
        }
    }

    pub(crate) fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the duration of the current lap and starts the next one.
    pub(crate) fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now.saturating_duration_since(self.lap_start);
        self.lap_start = now;
        lap
    }

    /// The elapsed time, if it exceeds the limit.
    pub(crate) fn overrun(&self) -> Option<Duration> {
        let elapsed = self.elapsed();
        self.limit
            .is_some_and(|limit| elapsed > limit)
            .then_some(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limit_never_overruns() {
        let timer = Timer::new(None);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(timer.overrun(), None);
    }

    #[test]
    fn zero_limit_overruns() {
        let timer = Timer::new(Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.overrun().is_some());
    }

    #[test]
    fn laps_are_consecutive() {
        let mut timer = Timer::new(None);
        std::thread::sleep(Duration::from_millis(5));
        let first = timer.lap();
        let second = timer.lap();
        assert!(first >= Duration::from_millis(5));
        assert!(second < first);
        assert!(timer.elapsed() >= first + second);
    }
}
