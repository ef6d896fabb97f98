use std::{fmt, ops::BitOr};

/// Metric kind.
///
/// Defines the kind, or type, of a metric:
/// - gauges
/// - counters
/// - histograms
/// - meters
/// - timers
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum MetricKind {
    /// Gauge type.
    Gauge,
    /// Counter type.
    Counter,
    /// Histogram type.
    Histogram,
    /// Meter type.
    Meter,
    /// Timer type.
    Timer,
}

impl MetricKind {
    /// Gets the string form of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric kind mask.
///
/// Useful for matching against a kind, or kinds, of metrics, such as when deciding which metrics a
/// reporter should export.
///
/// In order to use for defining multiple metric kinds, can be used in a bitmask fashion, as this
/// type implements bitwise OR support, and checking for inclusion of a specific kind within another
/// kind value can be checked via [`matches`](MetricKindMask::matches):
///
/// ```rust
/// # use metrology::{MetricKind, MetricKindMask};
/// // Let's only match meters and timers:
/// let mask = MetricKindMask::METER | MetricKindMask::TIMER;
///
/// assert!(!mask.matches(MetricKind::Gauge));
/// assert!(mask.matches(MetricKind::Meter));
/// assert!(mask.matches(MetricKind::Timer));
/// ```
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Ord, PartialOrd)]
pub struct MetricKindMask(u8);

impl MetricKindMask {
    /// No metric kinds.
    pub const NONE: MetricKindMask = MetricKindMask(0);

    /// The gauge kind.
    pub const GAUGE: MetricKindMask = MetricKindMask(1);

    /// The counter kind.
    pub const COUNTER: MetricKindMask = MetricKindMask(2);

    /// The histogram kind.
    pub const HISTOGRAM: MetricKindMask = MetricKindMask(4);

    /// The meter kind.
    pub const METER: MetricKindMask = MetricKindMask(8);

    /// The timer kind.
    pub const TIMER: MetricKindMask = MetricKindMask(16);

    /// All metric kinds.
    pub const ALL: MetricKindMask = MetricKindMask(31);

    /// Whether or not this mask contains the specified kind.
    pub fn matches(&self, kind: MetricKind) -> bool {
        let bit = match kind {
            MetricKind::Gauge => MetricKindMask::GAUGE,
            MetricKind::Counter => MetricKindMask::COUNTER,
            MetricKind::Histogram => MetricKindMask::HISTOGRAM,
            MetricKind::Meter => MetricKindMask::METER,
            MetricKind::Timer => MetricKindMask::TIMER,
        };

        self.0 & bit.0 != 0
    }
}

impl Default for MetricKindMask {
    fn default() -> Self {
        MetricKindMask::ALL
    }
}

impl BitOr for MetricKindMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}
