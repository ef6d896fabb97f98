use std::{
    io::{self, Write},
    sync::Arc,
};

use chrono::{DateTime, Local};

use super::{Batch, Exporter, Reporter, ReporterConfig};
use crate::{
    Error, Metric, MetricKind, MetricKindMask, Quantile, RatesView, Registry, Snapshot, TimeUnit,
};

const WIDTH: usize = 80;

/// Writes human-readable reports to a text stream.
///
/// Metrics are grouped by kind under a banner carrying the local time of the batch:
///
/// ```text
/// 2024-05-01 12:00:00 ============================================================
///
/// -- Meters ----------------------------------------------------------------------
/// requests
///              count = 3
///          mean rate = 0.50 events/second
///      1-minute rate = 0.60 events/second
///      5-minute rate = 0.60 events/second
///     15-minute rate = 0.60 events/second
/// ```
pub struct ConsoleExporter<W> {
    output: W,
}

impl<W> ConsoleExporter<W>
where
    W: Write + Send + 'static,
{
    /// Creates an exporter writing to `output`.
    pub fn new(output: W) -> Self {
        Self { output }
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.output
    }

    fn banner(&mut self, batch: &Batch<'_>) -> io::Result<()> {
        let timestamp = DateTime::<Local>::from(batch.timestamp).format("%Y-%m-%d %H:%M:%S");
        let header = format!("{} ", timestamp);
        let fill = WIDTH.saturating_sub(header.len());
        writeln!(self.output, "{}{}", header, "=".repeat(fill))?;
        writeln!(self.output)
    }

    fn section(&mut self, title: &str) -> io::Result<()> {
        let header = format!("-- {} ", title);
        let fill = WIDTH.saturating_sub(header.len());
        writeln!(self.output, "{}{}", header, "-".repeat(fill))
    }

    fn field(&mut self, label: &str, separator: &str, value: &str) -> io::Result<()> {
        writeln!(self.output, "{:>18} {} {}", label, separator, value)
    }

    fn metric(&mut self, name: &str, metric: &Metric, batch: &Batch<'_>) -> io::Result<()> {
        writeln!(self.output, "{}", name)?;

        let rate_unit = batch.rate_unit.singular();
        let duration_unit = batch.duration_unit.as_str();
        match metric {
            Metric::Gauge(gauge) => self.field("value", "=", &gauge.value().to_string())?,
            Metric::Counter(counter) => self.field("count", "=", &counter.count().to_string())?,
            Metric::Histogram(histogram) => {
                let snapshot = histogram.snapshot();
                self.field("count", "=", &histogram.count().to_string())?;
                self.field("min", "=", &format!("{:.0}", snapshot.min))?;
                self.field("max", "=", &format!("{:.0}", snapshot.max))?;
                self.field("mean", "=", &format!("{:.2}", snapshot.mean))?;
                self.field("stddev", "=", &format!("{:.2}", snapshot.std_dev))?;
                self.field("median", "=", &format!("{:.2}", snapshot.median))?;
                for (quantile, value) in percentiles(&snapshot) {
                    self.field(quantile.percent_label(), "<=", &format!("{:.2}", value))?;
                }
            }
            Metric::Meter(meter) => {
                let rates = meter.rates(batch.rate_unit);
                self.field("count", "=", &rates.count.to_string())?;
                for (label, value) in rate_fields(&rates) {
                    self.field(label, "=", &format!("{:.2} {}", value, rates.label))?;
                }
            }
            Metric::Timer(timer) => {
                let rates = timer.rates(batch.rate_unit);
                let snapshot = timer.snapshot(batch.duration_unit);
                self.field("count", "=", &rates.count.to_string())?;
                for (label, value) in rate_fields(&rates) {
                    self.field(label, "=", &format!("{:.2} calls/{}", value, rate_unit))?;
                }
                self.field("min", "=", &format!("{:.2} {}", snapshot.min, duration_unit))?;
                self.field("max", "=", &format!("{:.2} {}", snapshot.max, duration_unit))?;
                self.field("mean", "=", &format!("{:.2} {}", snapshot.mean, duration_unit))?;
                self.field("stddev", "=", &format!("{:.2} {}", snapshot.std_dev, duration_unit))?;
                self.field("median", "=", &format!("{:.2} {}", snapshot.median, duration_unit))?;
                for (quantile, value) in percentiles(&snapshot) {
                    let value = format!("{:.2} {}", value, duration_unit);
                    self.field(quantile.percent_label(), "<=", &value)?;
                }
            }
        }

        writeln!(self.output)
    }
}

/// Every quantile above the median, which is printed on its own.
fn percentiles(snapshot: &Snapshot) -> impl Iterator<Item = (Quantile, f64)> {
    snapshot.quantiles().into_iter().skip(1)
}

fn rate_fields(rates: &RatesView) -> [(&'static str, f64); 4] {
    [
        ("mean rate", rates.mean_rate),
        ("1-minute rate", rates.one_minute_rate),
        ("5-minute rate", rates.five_minute_rate),
        ("15-minute rate", rates.fifteen_minute_rate),
    ]
}

fn section_title(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Gauge => "Gauges",
        MetricKind::Counter => "Counters",
        MetricKind::Histogram => "Histograms",
        MetricKind::Meter => "Meters",
        MetricKind::Timer => "Timers",
    }
}

impl<W> Exporter for ConsoleExporter<W>
where
    W: Write + Send + 'static,
{
    fn export(&mut self, batch: &Batch<'_>) -> Result<(), Error> {
        self.banner(batch)?;

        let kinds = [
            MetricKind::Gauge,
            MetricKind::Counter,
            MetricKind::Histogram,
            MetricKind::Meter,
            MetricKind::Timer,
        ];
        for kind in kinds {
            let mut selected =
                batch.metrics.iter().filter(|(_, metric)| metric.kind() == kind).peekable();
            if selected.peek().is_none() {
                continue;
            }

            self.section(section_title(kind))?;
            for (name, metric) in selected {
                self.metric(name, metric, batch)?;
            }
        }

        writeln!(self.output)?;
        self.output.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.output.flush();
    }
}

/// Builder for a reporter that prints to a text stream.
///
/// Defaults to printing every metric to standard output once a minute, with rates per second and
/// durations in milliseconds.
pub struct ConsoleBuilder<W = io::Stdout> {
    output: W,
    config: ReporterConfig,
}

impl ConsoleBuilder {
    /// Creates a new `ConsoleBuilder` with default values.
    pub fn new() -> Self {
        Self { output: io::stdout(), config: ReporterConfig::default() }
    }
}

impl Default for ConsoleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> ConsoleBuilder<W>
where
    W: Write + Send + 'static,
{
    /// Sets the stream to print to.
    ///
    /// Defaults to standard output.
    #[must_use]
    pub fn with_output<W2>(self, output: W2) -> ConsoleBuilder<W2>
    where
        W2: Write + Send + 'static,
    {
        ConsoleBuilder { output, config: self.config }
    }

    /// Sets the unit rates are expressed per.
    ///
    /// Defaults to seconds.
    #[must_use]
    pub fn with_rate_unit(mut self, unit: TimeUnit) -> Self {
        self.config.rate_unit = unit;
        self
    }

    /// Sets the unit durations are expressed in.
    ///
    /// Defaults to milliseconds.
    #[must_use]
    pub fn with_duration_unit(mut self, unit: TimeUnit) -> Self {
        self.config.duration_unit = unit;
        self
    }

    /// Sets how often to print, as `frequency` multiples of `unit`.
    ///
    /// Defaults to once a minute.
    #[must_use]
    pub fn with_frequency(mut self, frequency: u64, unit: TimeUnit) -> Self {
        self.config.frequency = frequency;
        self.config.frequency_unit = unit;
        self
    }

    /// Sets which kinds of metrics to print.
    ///
    /// Defaults to all kinds.
    #[must_use]
    pub fn with_filter(mut self, filter: MetricKindMask) -> Self {
        self.config.filter = filter;
        self
    }

    /// Builds a reporter for `registry`.  The reporter is not started.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidArgument`] if the frequency is zero.
    pub fn build(self, registry: Arc<Registry>) -> Result<Reporter<ConsoleExporter<W>>, Error> {
        Reporter::new(registry, ConsoleExporter::new(self.output), self.config)
    }
}
