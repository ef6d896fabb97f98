//! Rate and distribution summaries.
//!
//! [`RatesView`] and [`Snapshot`] are immutable, point-in-time readings of rate-bearing
//! instruments (meters and timers) and distribution-bearing instruments (histograms and timers)
//! respectively.  Both expose their fields as a fixed, ordered set of named entries so that
//! consumers can render them without knowing the instrument they came from.
use metrology_util::{Quantile, Sample};

use crate::{Histogram, Meter, TimeUnit, Timer};

/// Names of the entries of a [`RatesView`], in order.
pub const RATES_KEYS: [&str; 5] =
    ["count", "mean-rate", "1-minute-rate", "5-minute-rate", "15-minute-rate"];

/// Names of the entries of a [`Snapshot`], in order.
pub const SNAPSHOT_KEYS: [&str; 11] = [
    "size",
    "min",
    "max",
    "mean",
    "std-dev",
    "median",
    "75th-percentile",
    "95th-percentile",
    "98th-percentile",
    "99th-percentile",
    "99.9th-percentile",
];

const SNAPSHOT_QUANTILES: [f64; 6] = [0.5, 0.75, 0.95, 0.98, 0.99, 0.999];

/// The quantiles summarized by every [`Snapshot`], in the order of [`Snapshot::quantiles`].
pub fn snapshot_quantiles() -> [Quantile; 6] {
    SNAPSHOT_QUANTILES.map(Quantile::new)
}

/// Event rates of a meter or timer.
#[derive(Clone, Debug, PartialEq)]
pub struct RatesView {
    /// Number of events since creation.
    pub count: u64,
    /// Mean rate since creation.
    pub mean_rate: f64,
    /// One-minute moving average rate.
    pub one_minute_rate: f64,
    /// Five-minute moving average rate.
    pub five_minute_rate: f64,
    /// Fifteen-minute moving average rate.
    pub fifteen_minute_rate: f64,
    /// Unit the rates are expressed per.
    pub unit: TimeUnit,
    /// Rendered unit, such as `events/second`.
    pub label: String,
}

impl RatesView {
    /// Creates a view from per-second rates, rescaling them to events per `unit`.
    pub fn new(
        count: u64,
        mean_rate: f64,
        one_minute_rate: f64,
        five_minute_rate: f64,
        fifteen_minute_rate: f64,
        unit: TimeUnit,
    ) -> Self {
        let scale = unit.seconds_per_unit();
        Self {
            count,
            mean_rate: mean_rate * scale,
            one_minute_rate: one_minute_rate * scale,
            five_minute_rate: five_minute_rate * scale,
            fifteen_minute_rate: fifteen_minute_rate * scale,
            unit,
            label: format!("events/{}", unit.singular()),
        }
    }

    /// The rates as `(key, value)` pairs, keyed by [`RATES_KEYS`].
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            (RATES_KEYS[0], self.count as f64),
            (RATES_KEYS[1], self.mean_rate),
            (RATES_KEYS[2], self.one_minute_rate),
            (RATES_KEYS[3], self.five_minute_rate),
            (RATES_KEYS[4], self.fifteen_minute_rate),
        ]
    }
}

/// Distribution statistics of a histogram or timer.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Number of retained samples the statistics were computed from.
    pub size: usize,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// 50th percentile.
    pub median: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 98th percentile.
    pub p98: f64,
    /// 99th percentile.
    pub p99: f64,
    /// 99.9th percentile.
    pub p999: f64,
    /// Rendered unit for duration-bearing instruments, such as `calls/millisecond`.
    pub label: Option<String>,
}

impl Snapshot {
    /// Summarizes `sample`, dividing every statistic by `divisor`.
    pub fn from_sample(sample: &Sample, divisor: f64, label: Option<String>) -> Self {
        let quantiles = snapshot_quantiles();
        let values: Vec<f64> =
            sample.quantiles(quantiles.iter()).into_iter().map(|(_, v)| v / divisor).collect();

        Self {
            size: sample.len(),
            min: sample.min() as f64 / divisor,
            max: sample.max() as f64 / divisor,
            mean: sample.mean() / divisor,
            std_dev: sample.std_dev() / divisor,
            median: values[0],
            p75: values[1],
            p95: values[2],
            p98: values[3],
            p99: values[4],
            p999: values[5],
            label,
        }
    }

    /// The estimated quantiles, from the median up, paired with the [`Quantile`] they estimate.
    pub fn quantiles(&self) -> Vec<(Quantile, f64)> {
        let values = [self.median, self.p75, self.p95, self.p98, self.p99, self.p999];
        snapshot_quantiles().into_iter().zip(values).collect()
    }

    /// The statistics as `(key, value)` pairs, keyed by [`SNAPSHOT_KEYS`].
    pub fn entries(&self) -> [(&'static str, f64); 11] {
        [
            (SNAPSHOT_KEYS[0], self.size as f64),
            (SNAPSHOT_KEYS[1], self.min),
            (SNAPSHOT_KEYS[2], self.max),
            (SNAPSHOT_KEYS[3], self.mean),
            (SNAPSHOT_KEYS[4], self.std_dev),
            (SNAPSHOT_KEYS[5], self.median),
            (SNAPSHOT_KEYS[6], self.p75),
            (SNAPSHOT_KEYS[7], self.p95),
            (SNAPSHOT_KEYS[8], self.p98),
            (SNAPSHOT_KEYS[9], self.p99),
            (SNAPSHOT_KEYS[10], self.p999),
        ]
    }
}

/// An instrument that tracks event rates.
pub trait Metered {
    /// Reads the instrument's rates, expressed in events per `unit`.
    fn rates_in(&self, unit: TimeUnit) -> RatesView;
}

/// An instrument that tracks a distribution of values.
pub trait Sampled {
    /// Reads the instrument's distribution.
    ///
    /// Duration-bearing instruments convert their values into `unit`; others report raw values
    /// and ignore it.
    fn snapshot_in(&self, unit: TimeUnit) -> Snapshot;
}

impl Metered for Meter {
    fn rates_in(&self, unit: TimeUnit) -> RatesView {
        self.rates(unit)
    }
}

impl Metered for Timer {
    fn rates_in(&self, unit: TimeUnit) -> RatesView {
        self.rates(unit)
    }
}

impl Sampled for Histogram {
    fn snapshot_in(&self, _unit: TimeUnit) -> Snapshot {
        self.snapshot()
    }
}

impl Sampled for Timer {
    fn snapshot_in(&self, unit: TimeUnit) -> Snapshot {
        self.snapshot(unit)
    }
}

/// Reads the rates of a meter or timer, expressed in events per `unit`.
pub fn rates<M>(instrument: &M, unit: TimeUnit) -> RatesView
where
    M: Metered + ?Sized,
{
    instrument.rates_in(unit)
}

/// Reads the distribution of a histogram or timer.
///
/// Timer durations are converted into `unit`.
pub fn snapshot<S>(instrument: &S, unit: TimeUnit) -> Snapshot
where
    S: Sampled + ?Sized,
{
    instrument.snapshot_in(unit)
}
