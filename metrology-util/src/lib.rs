//! Statistical building blocks used by `metrology`.
//!
//! This crate holds the algorithms that instruments delegate to, kept separate so they can be
//! tested and reused on their own:
//!
//! - [`Reservoir`] implementations that sample a stream of values in fixed space:
//!   [`ExponentiallyDecayingReservoir`] (biased towards recent values) and [`UniformReservoir`].
//! - [`Sample`], a sorted point-in-time copy of a reservoir with interpolated quantiles.
//! - [`Ewma`], exponentially-weighted moving averages of event rates.
//! - [`Quantile`], a quantile paired with its `p99` and `99%` labels.
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

pub mod atomics;

mod ewma;
pub use ewma::{Ewma, TICK_INTERVAL};

mod quantile;
pub use quantile::Quantile;

mod reservoir;
pub use reservoir::{ExponentiallyDecayingReservoir, Reservoir, UniformReservoir};

mod sample;
pub use sample::Sample;
