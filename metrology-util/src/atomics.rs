//! Atomic types used for metric storage.
//!
//! Counters, meters and moving averages all need a 64-bit atomic regardless of whether the standard
//! library exposes one for the target architecture, so 32-bit targets fall back to
//! `portable-atomic`.  Downstream crates should use the types re-exported here.

#[cfg(target_pointer_width = "32")]
pub use portable_atomic::{AtomicI64, AtomicU64};
#[cfg(not(target_pointer_width = "32"))]
pub use std::sync::atomic::{AtomicI64, AtomicU64};

use std::sync::atomic::Ordering;

/// An `f64` stored in an [`AtomicU64`] by its bit pattern.
#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    /// Creates a new `AtomicF64`.
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Loads the current value.
    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.0.load(order))
    }

    /// Stores a new value.
    pub fn store(&self, value: f64, order: Ordering) {
        self.0.store(value.to_bits(), order);
    }
}
