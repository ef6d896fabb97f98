use std::{fmt, sync::Arc};

use metrology_util::atomics::AtomicI64;
use parking_lot::RwLock;

use crate::{SingleValued, Value};

type Accessor = dyn Fn() -> Value + Send + Sync;

/// A gauge.
///
/// A gauge has no state of its own: it wraps an accessor that is invoked every time the gauge is
/// read.  Accessors run on whichever thread reads the gauge, typically a reporter's background
/// thread, so they should be fast, non-blocking and free of side effects.
///
/// Accessors can be any closure producing something convertible into a [`Value`], which covers
/// both computed readings and readings of externally-mutated shared state:
///
/// ```rust
/// # use metrology::{Gauge, Value};
/// # use std::sync::{Arc, atomic::{AtomicI64, Ordering}};
/// let queue_depth = Arc::new(AtomicI64::new(0));
/// let gauge = {
///     let queue_depth = Arc::clone(&queue_depth);
///     Gauge::new(move || queue_depth.load(Ordering::Relaxed))
/// };
///
/// queue_depth.store(12, Ordering::Relaxed);
/// assert_eq!(gauge.value(), Value::Integer(12));
/// ```
#[derive(Clone)]
pub struct Gauge {
    accessor: Arc<Accessor>,
}

impl Gauge {
    /// Creates a gauge that reads the given accessor.
    pub fn new<F, T>(accessor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Into<Value>,
    {
        Self { accessor: Arc::new(move || accessor().into()) }
    }

    /// Creates a gauge that reads a shared atomic integer.
    pub fn from_atomic(cell: Arc<AtomicI64>) -> Self {
        Self::new(move || cell.load(std::sync::atomic::Ordering::Acquire))
    }

    /// Creates a gauge that reads a shared, lock-protected value.
    pub fn from_shared<T>(cell: Arc<RwLock<T>>) -> Self
    where
        T: Clone + Into<Value> + Send + Sync + 'static,
    {
        Self::new(move || cell.read().clone())
    }

    /// Creates a ratio gauge.
    ///
    /// Both accessors are re-evaluated on every read, and the reading is always a
    /// [`Value::Float`].  When the denominator reads as zero, the gauge reads as `NaN`.
    pub fn ratio<N, D, TN, TD>(numerator: N, denominator: D) -> Self
    where
        N: Fn() -> TN + Send + Sync + 'static,
        D: Fn() -> TD + Send + Sync + 'static,
        TN: Into<Value>,
        TD: Into<Value>,
    {
        Self::new(move || {
            let denominator = denominator().into().as_f64();
            if denominator == 0.0 {
                return f64::NAN;
            }

            numerator().into().as_f64() / denominator
        })
    }

    /// Creates a gauge derived from another gauge.
    ///
    /// Reading the derived gauge reads `source` and applies `transform` to the result.  The
    /// transform must be pure.
    pub fn derive<F, T>(source: &Gauge, transform: F) -> Self
    where
        F: Fn(Value) -> T + Send + Sync + 'static,
        T: Into<Value>,
    {
        let source = Arc::clone(&source.accessor);
        Self::new(move || transform(source()))
    }

    /// Reads the gauge.
    pub fn value(&self) -> Value {
        (self.accessor)()
    }
}

impl SingleValued for Gauge {
    fn value(&self) -> Value {
        Gauge::value(self)
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use metrology_util::atomics::AtomicI64;
    use parking_lot::RwLock;

    use super::Gauge;
    use crate::Value;

    #[test]
    fn test_accessor_is_read_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gauge = {
            let calls = Arc::clone(&calls);
            Gauge::new(move || calls.fetch_add(1, Ordering::SeqCst) as u32 + 1)
        };

        assert_eq!(gauge.value(), Value::Integer(1));
        assert_eq!(gauge.value(), Value::Integer(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shared_state() {
        let atomic = Arc::new(AtomicI64::new(3));
        let gauge = Gauge::from_atomic(Arc::clone(&atomic));
        assert_eq!(gauge.value(), Value::Integer(3));
        atomic.store(-9, Ordering::Release);
        assert_eq!(gauge.value(), Value::Integer(-9));

        let cell = Arc::new(RwLock::new(1.5f64));
        let gauge = Gauge::from_shared(Arc::clone(&cell));
        assert_eq!(gauge.value(), Value::Float(1.5));
        *cell.write() = 2.5;
        assert_eq!(gauge.value(), Value::Float(2.5));
    }

    #[test]
    fn test_ratio() {
        let gauge = Gauge::ratio(|| 1, || 2);
        assert_eq!(gauge.value(), Value::Float(0.5));
    }

    #[test]
    fn test_ratio_with_zero_denominator_is_nan() {
        let gauge = Gauge::ratio(|| 1, || 0);
        assert!(gauge.value().is_nan());

        let gauge = Gauge::ratio(|| 0.0, || 0.0);
        assert!(gauge.value().is_nan());
    }

    #[test]
    fn test_ratio_re_reads_both_sides() {
        let hits = Arc::new(AtomicI64::new(1));
        let total = Arc::new(AtomicI64::new(4));
        let gauge = {
            let hits = Arc::clone(&hits);
            let total = Arc::clone(&total);
            Gauge::ratio(move || hits.load(Ordering::Relaxed), move || total.load(Ordering::Relaxed))
        };

        assert_eq!(gauge.value(), Value::Float(0.25));
        hits.store(3, Ordering::Relaxed);
        assert_eq!(gauge.value(), Value::Float(0.75));
    }

    #[test]
    fn test_derive() {
        let cell = Arc::new(AtomicI64::new(10));
        let source = Gauge::from_atomic(Arc::clone(&cell));
        let doubled = Gauge::derive(&source, |v| v.as_f64() * 2.0);

        assert_eq!(doubled.value(), Value::Float(20.0));
        cell.store(21, Ordering::Release);
        assert_eq!(doubled.value(), Value::Float(42.0));
        assert_eq!(source.value(), Value::Integer(21));
    }
}
