use std::{fmt, future::Future, time::Duration};

use quanta::Clock;

use crate::{
    Histogram, Meter, RatesView, ReservoirKind, SingleValued, Snapshot, TimeUnit, TimingHandle,
    Updateable, Value,
};

/// A timer.
///
/// Timers combine a [`Histogram`] of durations, recorded in nanoseconds, with a [`Meter`] of
/// completions: every timed operation records its duration and marks one event.
#[derive(Clone)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
    clock: Clock,
}

impl Timer {
    /// Creates a timer measuring time with the given clock.
    pub fn new(clock: Clock) -> Self {
        Self::with_reservoir(ReservoirKind::default(), clock)
    }

    /// Creates a timer whose durations are sampled with the given reservoir.
    pub fn with_reservoir(kind: ReservoirKind, clock: Clock) -> Self {
        Self { histogram: Histogram::with_kind(kind, &clock), meter: Meter::new(clock.clone()), clock }
    }

    pub(crate) fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Records one completed operation that took `duration`.
    pub fn update(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark();
    }

    /// Records one completed operation that took `amount` of `unit`.
    pub fn update_with_unit(&self, amount: u64, unit: TimeUnit) {
        self.update(unit.duration(amount));
    }

    /// Number of completed operations.
    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    /// Starts timing an operation.
    ///
    /// The operation completes when the returned handle is stopped or dropped.
    pub fn start(&self) -> TimingHandle {
        TimingHandle::new(self.clone())
    }

    /// Times the execution of `f`, returning its result.
    ///
    /// The duration is recorded on every exit path, including panics.  Errors returned by `f`
    /// are passed through untouched.
    pub fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _handle = self.start();
        f()
    }

    /// Wraps `f` so that every invocation is timed.
    pub fn wrap<F, A, R>(&self, f: F) -> impl Fn(A) -> R
    where
        F: Fn(A) -> R,
    {
        let timer = self.clone();
        move |arg| timer.time(|| f(arg))
    }

    /// Times a future from now until it resolves.
    ///
    /// Time spent suspended counts towards the duration.  If the returned future is dropped
    /// before it resolves, the time until it was dropped is recorded.
    pub fn time_future<F>(&self, future: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        let handle = self.start();
        async move {
            let output = future.await;
            handle.stop();
            output
        }
    }

    /// Distribution of recorded durations, converted into `unit`.
    pub fn snapshot(&self, unit: TimeUnit) -> Snapshot {
        Snapshot::from_sample(
            &self.histogram.sample(),
            unit.nanos_per_unit() as f64,
            Some(format!("calls/{}", unit.singular())),
        )
    }

    /// Completion rates, expressed in calls per `unit`.
    pub fn rates(&self, unit: TimeUnit) -> RatesView {
        self.meter.rates(unit)
    }
}

impl Updateable for Timer {
    type Sample = Duration;

    fn update(&self, sample: Duration) {
        Timer::update(self, sample);
    }
}

impl SingleValued for Timer {
    fn value(&self) -> Value {
        Value::from_count(self.count())
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer").field("count", &self.count()).finish_non_exhaustive()
    }
}
