use std::{fmt, str::FromStr, time::Duration};

use crate::Error;

/// A unit of time.
///
/// Durations are recorded internally in nanoseconds; `TimeUnit` converts to and from that
/// canonical representation, and scales per-second rates into other units.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum TimeUnit {
    /// Nanoseconds.
    Nanoseconds,
    /// Microseconds.
    ///
    /// One microsecond is equal to 1000 nanoseconds.
    Microseconds,
    /// Milliseconds.
    ///
    /// One millisecond is equal to 1000 microseconds.
    Milliseconds,
    /// Seconds.
    ///
    /// One second is equal to 1000 milliseconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
}

impl TimeUnit {
    /// Gets the string form of this `TimeUnit`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "nanoseconds",
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        }
    }

    /// Gets the singular form of this unit, as used in rendered labels like `events/second`.
    pub fn singular(&self) -> &'static str {
        let name = self.as_str();
        name.strip_suffix('s').unwrap_or(name)
    }

    /// Gets the canonical abbreviation for this unit, such as `ms` for milliseconds.
    pub fn as_canonical_label(&self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "μs",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }

    /// Number of nanoseconds in one of this unit.
    pub const fn nanos_per_unit(&self) -> u64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60 * 1_000_000_000,
            TimeUnit::Hours => 60 * 60 * 1_000_000_000,
            TimeUnit::Days => 24 * 60 * 60 * 1_000_000_000,
        }
    }

    /// Number of seconds in one of this unit.
    ///
    /// Multiplying a per-second rate by this factor expresses the rate per this unit.
    pub fn seconds_per_unit(&self) -> f64 {
        self.nanos_per_unit() as f64 / TimeUnit::Seconds.nanos_per_unit() as f64
    }

    /// Converts `amount` of this unit into nanoseconds, saturating at `u64::MAX`.
    pub fn to_nanos(&self, amount: u64) -> u64 {
        amount.saturating_mul(self.nanos_per_unit())
    }

    /// Converts a nanosecond quantity into this unit.
    pub fn from_nanos(&self, nanos: f64) -> f64 {
        nanos / self.nanos_per_unit() as f64
    }

    /// Converts `amount` of this unit into a [`Duration`].
    pub fn duration(&self, amount: u64) -> Duration {
        Duration::from_nanos(self.to_nanos(amount))
    }

    /// Converts `amount` of this unit into the `target` unit.
    pub fn convert(&self, amount: f64, target: TimeUnit) -> f64 {
        amount * self.nanos_per_unit() as f64 / target.nanos_per_unit() as f64
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    /// Parses a unit token.
    ///
    /// Accepts the long form (`milliseconds`), the short form (`millis`) and the canonical
    /// abbreviation (`ms`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nanoseconds" | "nanos" | "ns" => Ok(TimeUnit::Nanoseconds),
            "microseconds" | "micros" | "us" | "μs" => Ok(TimeUnit::Microseconds),
            "milliseconds" | "millis" | "ms" => Ok(TimeUnit::Milliseconds),
            "seconds" | "secs" | "s" => Ok(TimeUnit::Seconds),
            "minutes" | "mins" | "m" => Ok(TimeUnit::Minutes),
            "hours" | "h" => Ok(TimeUnit::Hours),
            "days" | "d" => Ok(TimeUnit::Days),
            other => Err(Error::UnknownTimeUnit(other.to_string())),
        }
    }
}
