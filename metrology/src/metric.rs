use crate::{
    Counter, Gauge, Histogram, Meter, MetricKind, RatesView, SingleValued, Snapshot, TimeUnit,
    Timer, Value,
};

/// A registered instrument of any kind.
///
/// Cloning a metric clones a handle to the same underlying instrument.
#[derive(Clone, Debug)]
pub enum Metric {
    /// A gauge.
    Gauge(Gauge),
    /// A counter.
    Counter(Counter),
    /// A histogram.
    Histogram(Histogram),
    /// A meter.
    Meter(Meter),
    /// A timer.
    Timer(Timer),
}

impl Metric {
    /// Gets the kind of this metric.
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Meter(_) => MetricKind::Meter,
            Metric::Timer(_) => MetricKind::Timer,
        }
    }

    /// Gets the gauge, if this is one.
    pub fn as_gauge(&self) -> Option<&Gauge> {
        match self {
            Metric::Gauge(gauge) => Some(gauge),
            _ => None,
        }
    }

    /// Gets the counter, if this is one.
    pub fn as_counter(&self) -> Option<&Counter> {
        match self {
            Metric::Counter(counter) => Some(counter),
            _ => None,
        }
    }

    /// Gets the histogram, if this is one.
    pub fn as_histogram(&self) -> Option<&Histogram> {
        match self {
            Metric::Histogram(histogram) => Some(histogram),
            _ => None,
        }
    }

    /// Gets the meter, if this is one.
    pub fn as_meter(&self) -> Option<&Meter> {
        match self {
            Metric::Meter(meter) => Some(meter),
            _ => None,
        }
    }

    /// Gets the timer, if this is one.
    pub fn as_timer(&self) -> Option<&Timer> {
        match self {
            Metric::Timer(timer) => Some(timer),
            _ => None,
        }
    }

    /// Reads the rates of a meter or timer, expressed in events per `unit`.
    pub fn rates(&self, unit: TimeUnit) -> Option<RatesView> {
        match self {
            Metric::Meter(meter) => Some(meter.rates(unit)),
            Metric::Timer(timer) => Some(timer.rates(unit)),
            _ => None,
        }
    }

    /// Reads the distribution of a histogram or timer, converting timer durations into `unit`.
    pub fn snapshot(&self, unit: TimeUnit) -> Option<Snapshot> {
        match self {
            Metric::Histogram(histogram) => Some(histogram.snapshot()),
            Metric::Timer(timer) => Some(timer.snapshot(unit)),
            _ => None,
        }
    }
}

impl SingleValued for Metric {
    fn value(&self) -> Value {
        match self {
            Metric::Gauge(gauge) => gauge.value(),
            Metric::Counter(counter) => counter.value(),
            Metric::Histogram(histogram) => histogram.value(),
            Metric::Meter(meter) => meter.value(),
            Metric::Timer(timer) => timer.value(),
        }
    }
}

macro_rules! impl_from_instrument {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Metric {
                fn from(instrument: $variant) -> Self {
                    Metric::$variant(instrument)
                }
            }
        )*
    };
}

impl_from_instrument!(Gauge, Counter, Histogram, Meter, Timer);
