use std::{sync::atomic::Ordering, time::Duration};

use crate::atomics::{AtomicF64, AtomicU64};

/// The interval at which moving averages expect to be ticked.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

const SECONDS_PER_MINUTE: f64 = 60.0;

/// An exponentially-weighted moving average of an event rate.
///
/// Events are accumulated with [`update`](Ewma::update), and folded into the average every time
/// [`tick`](Ewma::tick) is called.  Callers are responsible for ticking at a fixed interval
/// (normally [`TICK_INTERVAL`]); the average assumes each tick covers exactly one interval.
///
/// This mirrors the load averages reported by Unix `top`: a one-minute average decays
/// approximately 63% of the way towards the instantaneous rate each minute.
#[derive(Debug)]
pub struct Ewma {
    alpha: f64,
    interval_secs: f64,
    uncounted: AtomicU64,
    rate: AtomicF64,
    initialized: AtomicU64,
}

impl Ewma {
    /// Creates an average with the given smoothing factor, ticked every `interval`.
    pub fn new(alpha: f64, interval: Duration) -> Self {
        Self {
            alpha,
            interval_secs: interval.as_secs_f64(),
            uncounted: AtomicU64::new(0),
            rate: AtomicF64::new(0.0),
            initialized: AtomicU64::new(0),
        }
    }

    /// Creates an average over a window of `minutes`, ticked every [`TICK_INTERVAL`].
    pub fn over_minutes(minutes: f64) -> Self {
        let interval = TICK_INTERVAL.as_secs_f64();
        let alpha = 1.0 - (-interval / SECONDS_PER_MINUTE / minutes).exp();
        Self::new(alpha, TICK_INTERVAL)
    }

    /// A one-minute moving average.
    pub fn one_minute() -> Self {
        Self::over_minutes(1.0)
    }

    /// A five-minute moving average.
    pub fn five_minutes() -> Self {
        Self::over_minutes(5.0)
    }

    /// A fifteen-minute moving average.
    pub fn fifteen_minutes() -> Self {
        Self::over_minutes(15.0)
    }

    /// Records `n` new events.
    pub fn update(&self, n: u64) {
        self.uncounted.fetch_add(n, Ordering::Relaxed);
    }

    /// Folds the events recorded since the last tick into the average.
    ///
    /// Must not be called concurrently with itself.
    pub fn tick(&self) {
        let count = self.uncounted.swap(0, Ordering::AcqRel);
        let instant_rate = count as f64 / self.interval_secs;

        if self.initialized.load(Ordering::Acquire) == 1 {
            let rate = self.rate.load(Ordering::Acquire);
            self.rate.store(rate + self.alpha * (instant_rate - rate), Ordering::Release);
        } else {
            self.rate.store(instant_rate, Ordering::Release);
            self.initialized.store(1, Ordering::Release);
        }
    }

    /// The current rate, in events per second.
    pub fn rate(&self) -> f64 {
        self.rate.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::Ewma;

    fn elapse_minute(ewma: &Ewma) {
        for _ in 0..12 {
            ewma.tick();
        }
    }

    #[test]
    fn test_first_tick_sets_instant_rate() {
        let ewma = Ewma::one_minute();
        assert_eq!(ewma.rate(), 0.0);

        ewma.update(3);
        ewma.tick();
        assert_relative_eq!(ewma.rate(), 0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_one_minute_decay() {
        let ewma = Ewma::one_minute();
        ewma.update(3);
        ewma.tick();

        elapse_minute(&ewma);
        assert_relative_eq!(ewma.rate(), 0.22072766, epsilon = 1e-6);

        elapse_minute(&ewma);
        assert_relative_eq!(ewma.rate(), 0.08120117, epsilon = 1e-6);
    }

    #[test]
    fn test_five_minute_decay() {
        let ewma = Ewma::five_minutes();
        ewma.update(3);
        ewma.tick();

        elapse_minute(&ewma);
        assert_relative_eq!(ewma.rate(), 0.49123845, epsilon = 1e-6);
    }

    #[test]
    fn test_fifteen_minute_decay() {
        let ewma = Ewma::fifteen_minutes();
        ewma.update(3);
        ewma.tick();

        elapse_minute(&ewma);
        assert_relative_eq!(ewma.rate(), 0.56130419, epsilon = 1e-6);
    }
}
