use std::{
    fmt,
    sync::{atomic::Ordering, Arc},
};

use metrology_util::{atomics::AtomicU64, Ewma, TICK_INTERVAL};
use quanta::{Clock, Instant};

use crate::{RatesView, SingleValued, TimeUnit, Value};

const TICK_INTERVAL_NANOS: u64 = TICK_INTERVAL.as_nanos() as u64;

struct Inner {
    count: AtomicU64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    clock: Clock,
    start: Instant,
    // Nanoseconds since `start` at which the current tick interval began.
    last_tick: AtomicU64,
}

impl Inner {
    fn elapsed_nanos(&self) -> u64 {
        let elapsed = self.clock.now().saturating_duration_since(self.start);
        u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
    }

    fn tick_if_necessary(&self) {
        let old_tick = self.last_tick.load(Ordering::Acquire);
        let now = self.elapsed_nanos();
        let age = now.saturating_sub(old_tick);
        if age < TICK_INTERVAL_NANOS {
            return;
        }

        let new_tick = now - age % TICK_INTERVAL_NANOS;
        if self
            .last_tick
            .compare_exchange(old_tick, new_tick, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            for _ in 0..age / TICK_INTERVAL_NANOS {
                self.m1.tick();
                self.m5.tick();
                self.m15.tick();
            }
        }
    }
}

/// A meter.
///
/// Meters count discrete events and track the rate at which they occur: the mean rate since the
/// meter was created, and one-, five- and fifteen-minute exponentially-weighted moving averages.
///
/// Moving averages are advanced lazily, in 5 second steps, whenever the meter is marked or read.
#[derive(Clone)]
pub struct Meter {
    inner: Arc<Inner>,
}

impl Meter {
    /// Creates a meter measuring time with the given clock.
    pub fn new(clock: Clock) -> Self {
        let start = clock.now();
        Self {
            inner: Arc::new(Inner {
                count: AtomicU64::new(0),
                m1: Ewma::one_minute(),
                m5: Ewma::five_minutes(),
                m15: Ewma::fifteen_minutes(),
                clock,
                start,
                last_tick: AtomicU64::new(0),
            }),
        }
    }

    /// Marks the occurrence of one event.
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Marks the occurrence of `n` events.
    pub fn mark_n(&self, n: u64) {
        self.inner.tick_if_necessary();
        self.inner.count.fetch_add(n, Ordering::AcqRel);
        self.inner.m1.update(n);
        self.inner.m5.update(n);
        self.inner.m15.update(n);
    }

    /// Number of events marked since creation.
    pub fn count(&self) -> u64 {
        self.inner.count.load(Ordering::Acquire)
    }

    /// One-minute moving average rate, in events per second.
    pub fn one_minute_rate(&self) -> f64 {
        self.inner.tick_if_necessary();
        self.inner.m1.rate()
    }

    /// Five-minute moving average rate, in events per second.
    pub fn five_minute_rate(&self) -> f64 {
        self.inner.tick_if_necessary();
        self.inner.m5.rate()
    }

    /// Fifteen-minute moving average rate, in events per second.
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.inner.tick_if_necessary();
        self.inner.m15.rate()
    }

    /// Mean rate since creation, in events per second.
    ///
    /// Zero until at least one event has been marked and some time has passed.
    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        let elapsed = self.inner.elapsed_nanos();
        if count == 0 || elapsed == 0 {
            return 0.0;
        }

        count as f64 / (elapsed as f64 / TimeUnit::Seconds.nanos_per_unit() as f64)
    }

    /// All rates, expressed in events per `unit`.
    pub fn rates(&self, unit: TimeUnit) -> RatesView {
        RatesView::new(
            self.count(),
            self.mean_rate(),
            self.one_minute_rate(),
            self.five_minute_rate(),
            self.fifteen_minute_rate(),
            unit,
        )
    }
}

impl SingleValued for Meter {
    fn value(&self) -> Value {
        Value::from_count(self.count())
    }
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter").field("count", &self.count()).finish_non_exhaustive()
    }
}
