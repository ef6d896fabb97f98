mod counter;
mod gauge;
mod histogram;
mod meter;
mod timer;

pub use self::{
    counter::Counter,
    gauge::Gauge,
    histogram::{Histogram, ReservoirKind},
    meter::Meter,
    timer::Timer,
};
