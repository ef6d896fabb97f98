use std::time::Duration;

use quanta::Instant;

use crate::Timer;

/// An in-flight timing of one operation.
///
/// Created by [`Timer::start`].  The operation completes, recording the elapsed time into the
/// timer, when the handle is either [stopped](TimingHandle::stop) or dropped, so it is recorded
/// exactly once on every exit path.
#[must_use = "dropping a timing handle immediately records a near-zero duration"]
#[derive(Debug)]
pub struct TimingHandle {
    timer: Timer,
    start: Instant,
    stopped: bool,
}

impl TimingHandle {
    pub(crate) fn new(timer: Timer) -> Self {
        let start = timer.clock().now();
        Self { timer, start, stopped: false }
    }

    /// Time elapsed since the handle was created.
    pub fn elapsed(&self) -> Duration {
        self.timer.clock().now().saturating_duration_since(self.start)
    }

    /// Completes the operation, returning the recorded duration.
    pub fn stop(mut self) -> Duration {
        self.stopped = true;
        self.record()
    }

    fn record(&self) -> Duration {
        let elapsed = self.elapsed();
        self.timer.update(elapsed);
        elapsed
    }
}

impl Drop for TimingHandle {
    fn drop(&mut self) {
        if !self.stopped {
            self.record();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quanta::Clock;

    use crate::{SingleValued, TimeUnit, Timer, Value};

    #[test]
    fn test_stop_records_once() {
        let (clock, mock) = Clock::mock();
        let timer = Timer::new(clock);

        let handle = timer.start();
        mock.increment(Duration::from_micros(1500));
        assert_eq!(handle.elapsed(), Duration::from_micros(1500));

        let elapsed = handle.stop();
        assert_eq!(elapsed, Duration::from_micros(1500));
        assert_eq!(timer.value(), Value::Integer(1));
        assert_eq!(timer.snapshot(TimeUnit::Microseconds).max, 1500.0);
    }

    #[test]
    fn test_drop_records() {
        let (clock, _mock) = Clock::mock();
        let timer = Timer::new(clock);

        {
            let _handle = timer.start();
        }
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.snapshot(TimeUnit::Nanoseconds).max, 0.0);
    }

    #[test]
    fn test_concurrent_handles_are_independent() {
        let (clock, mock) = Clock::mock();
        let timer = Timer::new(clock);

        let first = timer.start();
        mock.increment(Duration::from_millis(10));
        let second = timer.start();
        mock.increment(Duration::from_millis(5));

        assert_eq!(second.stop(), Duration::from_millis(5));
        assert_eq!(first.stop(), Duration::from_millis(15));
        assert_eq!(timer.count(), 2);
    }
}
