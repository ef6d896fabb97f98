use std::sync::{atomic::Ordering, Arc};

use metrology_util::atomics::AtomicI64;

use crate::{SingleValued, Value};

/// A counter.
///
/// Counters hold a signed 64-bit total that can be incremented and decremented from any number of
/// threads concurrently without losing updates.
///
/// Overflowing the total wraps around; counters are not guarded against it.
#[derive(Clone, Debug, Default)]
pub struct Counter {
    inner: Arc<AtomicI64>,
}

impl Counter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter by one.
    pub fn increment(&self) {
        self.increment_by(1);
    }

    /// Increments the counter by the given amount.
    pub fn increment_by(&self, value: i64) {
        self.inner.fetch_add(value, Ordering::AcqRel);
    }

    /// Decrements the counter by one.
    pub fn decrement(&self) {
        self.decrement_by(1);
    }

    /// Decrements the counter by the given amount.
    pub fn decrement_by(&self, value: i64) {
        self.inner.fetch_sub(value, Ordering::AcqRel);
    }

    /// Gets the current total.
    pub fn count(&self) -> i64 {
        self.inner.load(Ordering::Acquire)
    }
}

impl SingleValued for Counter {
    fn value(&self) -> Value {
        Value::Integer(self.count())
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_utils::thread;
    use proptest::prelude::*;

    use super::Counter;
    use crate::{SingleValued, Value};

    #[test]
    fn test_increment_and_decrement() {
        let counter = Counter::new();
        counter.increment();
        counter.increment_by(10);
        counter.decrement();
        assert_eq!(counter.count(), 10);

        counter.decrement_by(15);
        assert_eq!(counter.value(), Value::Integer(-5));
    }

    #[test]
    fn test_clones_share_state() {
        let counter = Counter::new();
        let other = counter.clone();
        other.increment_by(3);
        assert_eq!(counter.count(), 3);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counter = Counter::new();

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|_| {
                    for _ in 0..10_000 {
                        counter.increment();
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(counter.count(), 40_000);
    }

    proptest! {
        #[test]
        fn test_increment_then_decrement_is_a_no_op(start in -1_000_000i64..1_000_000, n in -1_000_000i64..1_000_000) {
            let counter = Counter::new();
            counter.increment_by(start);
            let before = counter.count();

            counter.increment_by(n);
            counter.decrement_by(n);
            prop_assert_eq!(counter.count(), before);
        }
    }
}
