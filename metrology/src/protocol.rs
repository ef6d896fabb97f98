use crate::Value;

/// An instrument that accepts samples.
///
/// Implemented by [`Histogram`](crate::Histogram), which takes raw integer samples, and by
/// [`Timer`](crate::Timer), which takes durations.  Gauges are read-only and counters have their
/// own increment and decrement operations, so neither is updateable.
pub trait Updateable {
    /// The type of sample accepted.
    type Sample;

    /// Records a sample.
    fn update(&self, sample: Self::Sample);
}

/// An instrument that can be summarized as a single scalar.
///
/// Gauges read their accessor, counters report their total, and histograms, meters and timers
/// report the number of events they have seen.  Statistical summaries are available through
/// [`rates`](crate::rates) and [`snapshot`](crate::snapshot) instead.
pub trait SingleValued {
    /// Reads the instrument's value.
    fn value(&self) -> Value;
}
