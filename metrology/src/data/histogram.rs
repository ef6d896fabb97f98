use std::{
    fmt,
    sync::{atomic::Ordering, Arc},
};

use metrology_util::{
    atomics::AtomicU64, ExponentiallyDecayingReservoir, Reservoir, Sample, UniformReservoir,
};
use quanta::Clock;

use crate::{SingleValued, Snapshot, Updateable, Value};

/// The sampling strategy used by a histogram.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReservoirKind {
    /// Forward-decaying priority sampling, biased towards the last five minutes of values.
    #[default]
    ExponentiallyDecaying,
    /// Uniform sampling over every value ever recorded, holding up to the given number of values.
    Uniform(usize),
}

impl ReservoirKind {
    pub(crate) fn build(self, clock: &Clock) -> Box<dyn Reservoir> {
        match self {
            ReservoirKind::ExponentiallyDecaying => {
                Box::new(ExponentiallyDecayingReservoir::new(clock.clone()))
            }
            ReservoirKind::Uniform(size) => Box::new(UniformReservoir::new(size)),
        }
    }
}

struct Inner {
    count: AtomicU64,
    reservoir: Box<dyn Reservoir>,
}

/// A histogram.
///
/// Histograms accumulate a stream of integer samples into a reservoir, and expose both the number
/// of samples ever recorded and, on demand, a statistical [`Snapshot`] of the retained ones.
#[derive(Clone)]
pub struct Histogram {
    inner: Arc<Inner>,
}

impl Histogram {
    /// Creates a histogram backed by the given reservoir.
    pub fn new<R>(reservoir: R) -> Self
    where
        R: Reservoir + 'static,
    {
        Self::from_boxed(Box::new(reservoir))
    }

    pub(crate) fn with_kind(kind: ReservoirKind, clock: &Clock) -> Self {
        Self::from_boxed(kind.build(clock))
    }

    fn from_boxed(reservoir: Box<dyn Reservoir>) -> Self {
        Self { inner: Arc::new(Inner { count: AtomicU64::new(0), reservoir }) }
    }

    /// Records a sample.
    pub fn update(&self, value: i64) {
        self.inner.reservoir.update(value);
        self.inner.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of samples ever recorded.
    pub fn count(&self) -> u64 {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Takes a point-in-time copy of the retained samples.
    pub fn sample(&self) -> Sample {
        self.inner.reservoir.snapshot()
    }

    /// Summarizes the retained samples as raw numbers.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_sample(&self.sample(), 1.0, None)
    }
}

impl Updateable for Histogram {
    type Sample = i64;

    fn update(&self, sample: i64) {
        Histogram::update(self, sample);
    }
}

impl SingleValued for Histogram {
    fn value(&self) -> Value {
        Value::from_count(self.count())
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram").field("count", &self.count()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use crossbeam_utils::thread;
    use metrology_util::UniformReservoir;
    use quanta::Clock;

    use super::{Histogram, ReservoirKind};
    use crate::{SingleValued, Updateable, Value};

    #[test]
    fn test_one_through_ten() {
        let (clock, _mock) = Clock::mock();
        let histogram = Histogram::with_kind(ReservoirKind::default(), &clock);
        for v in 1..=10 {
            histogram.update(v);
        }

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.size, 10);
        assert_relative_eq!(snapshot.min, 1.0);
        assert_relative_eq!(snapshot.max, 10.0);
        assert_relative_eq!(snapshot.median, 5.5);
        assert_relative_eq!(snapshot.mean, 5.5);
        assert!(snapshot.label.is_none());
        assert_eq!(histogram.value(), Value::Integer(10));
    }

    #[test]
    fn test_count_outgrows_reservoir() {
        let histogram = Histogram::new(UniformReservoir::new(8));
        for v in 0..100 {
            Updateable::update(&histogram, v);
        }

        assert_eq!(histogram.count(), 100);
        assert_eq!(histogram.snapshot().size, 8);
    }

    #[test]
    fn test_concurrent_updates() {
        let (clock, _mock) = Clock::mock();
        let histogram = Histogram::with_kind(ReservoirKind::Uniform(1024), &clock);

        thread::scope(|s| {
            for t in 0..4 {
                let histogram = &histogram;
                s.spawn(move |_| {
                    for v in 0..250 {
                        histogram.update(t * 1000 + v);
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(histogram.count(), 1000);
        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.size, 1000);
        assert_relative_eq!(snapshot.min, 0.0);
        assert_relative_eq!(snapshot.max, 3249.0);
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = Histogram::new(UniformReservoir::new(8));
        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.size, 0);
        assert_eq!(snapshot.max, 0.0);
        assert_eq!(histogram.value(), Value::Integer(0));
    }
}
