use parking_lot::Mutex;

use super::{fastrand, Reservoir};
use crate::Sample;

struct Slots {
    values: Vec<i64>,
    seen: u64,
}

/// A uniform sampling reservoir.
///
/// [Reservoir sampling][rs] produces a statistically representative sample of a data stream, in a
/// fixed space, without knowing the length of the stream in advance.  `UniformReservoir` is based
/// on Vitter's ["Algorithm R"][vitter_paper]: every value ever pushed has the same probability of
/// being retained, regardless of when it arrived.
///
/// A fast, thread-local PRNG ([Xoshiro256**][xoshiro256starstar]) limits the per-call sampling
/// overhead.
///
/// [rs]: https://en.wikipedia.org/wiki/Reservoir_sampling
/// [vitter_paper]: https://www.cs.umd.edu/~samir/498/vitter.pdf
/// [xoshiro256starstar]: https://prng.di.unimi.it
pub struct UniformReservoir {
    capacity: usize,
    slots: Mutex<Slots>,
}

impl UniformReservoir {
    /// Creates a new `UniformReservoir` that stores up to `capacity` samples.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, slots: Mutex::new(Slots { values: Vec::with_capacity(capacity), seen: 0 }) }
    }

    /// Maximum number of samples retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Reservoir for UniformReservoir {
    fn update(&self, value: i64) {
        let mut slots = self.slots.lock();
        slots.seen += 1;

        if slots.values.len() < self.capacity {
            slots.values.push(value);
        } else {
            let idx = fastrand(slots.seen) as usize;
            if idx < self.capacity {
                slots.values[idx] = value;
            }
        }
    }

    fn size(&self) -> usize {
        self.slots.lock().values.len()
    }

    fn snapshot(&self) -> Sample {
        let values = self.slots.lock().values.clone();
        Sample::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::UniformReservoir;
    use crate::Reservoir;

    #[test]
    fn test_retains_everything_below_capacity() {
        let reservoir = UniformReservoir::new(100);
        for v in 0..10 {
            reservoir.update(v);
        }

        assert_eq!(reservoir.size(), 10);
        assert_eq!(reservoir.snapshot().values(), &(0..10).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let reservoir = UniformReservoir::new(16);
        for v in 0..10_000 {
            reservoir.update(v);
        }

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.len(), 16);
        assert!(snapshot.values().iter().all(|v| (0..10_000).contains(v)));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let reservoir = UniformReservoir::new(0);
        assert_eq!(reservoir.capacity(), 1);

        reservoir.update(7);
        reservoir.update(8);
        assert_eq!(reservoir.size(), 1);
    }
}
