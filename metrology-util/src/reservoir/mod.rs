//! Sampling reservoirs backing histograms.
use std::cell::RefCell;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::Sample;

mod decaying;
pub use self::decaying::ExponentiallyDecayingReservoir;

mod uniform;
pub use self::uniform::UniformReservoir;

thread_local! {
    static FAST_RNG: RefCell<Xoshiro256StarStar> =
        RefCell::new(Xoshiro256StarStar::from_rng(&mut rand::rng()));
}

/// Returns a random index in `0..upper`.
fn fastrand(upper: u64) -> u64 {
    FAST_RNG.with(|rng| rng.borrow_mut().random_range(0..upper))
}

/// Returns a random number in `(0.0, 1.0]`.
fn fastrand_unit() -> f64 {
    FAST_RNG.with(|rng| 1.0 - rng.borrow_mut().random::<f64>())
}

/// A statistically representative sample of a stream of values.
///
/// Implementations must tolerate concurrent calls to [`update`](Reservoir::update) and
/// [`snapshot`](Reservoir::snapshot) from any number of threads.
pub trait Reservoir: Send + Sync {
    /// Adds a value to the reservoir.
    fn update(&self, value: i64);

    /// Number of values currently retained.
    fn size(&self) -> usize;

    /// Takes a point-in-time copy of the retained values.
    fn snapshot(&self) -> Sample;
}
