use std::time::{SystemTime, UNIX_EPOCH};

use metrology::{reporter::Batch, Metric, RatesView, Snapshot, Value};

#[derive(Clone, Copy)]
enum FieldValue {
    Signed(i64),
    Unsigned(u64),
    FloatingPoint(f64),
}

struct FieldValueFormatter {
    int_writer: itoa::Buffer,
    float_writer: ryu::Buffer,
}

impl FieldValueFormatter {
    fn new() -> Self {
        Self { int_writer: itoa::Buffer::new(), float_writer: ryu::Buffer::new() }
    }

    fn format(&mut self, value: FieldValue) -> &str {
        match value {
            FieldValue::Signed(v) => self.int_writer.format(v),
            FieldValue::Unsigned(v) => self.int_writer.format(v),
            FieldValue::FloatingPoint(v) => self.float_writer.format_finite(v),
        }
    }
}

/// Replaces every run of whitespace in `name` with a single `-`.
///
/// Graphite splits lines on whitespace, so names containing any would be misparsed.
pub fn sanitize(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                sanitized.push('-');
            }
            in_whitespace = true;
        } else {
            sanitized.push(c);
            in_whitespace = false;
        }
    }
    sanitized
}

/// Renders batches as Graphite plaintext protocol lines.
///
/// Every line has the form `<prefix>.<name>[.<field>] <value> <timestamp>\n`, with the timestamp
/// in seconds since the Unix epoch.  Non-finite readings (such as a ratio over a zero denominator)
/// are skipped, since Graphite cannot store them.
pub(crate) struct LineWriter {
    prefix: Option<String>,
    buf: Vec<u8>,
    header_buf: Vec<u8>,
    trailer_buf: Vec<u8>,
    formatter: FieldValueFormatter,
    lines: usize,
}

impl LineWriter {
    pub fn new(prefix: Option<&str>) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(sanitize),
            buf: Vec::new(),
            header_buf: Vec::new(),
            trailer_buf: Vec::new(),
            formatter: FieldValueFormatter::new(),
            lines: 0,
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.lines = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    fn write_metric_header(&mut self, name: &str) {
        self.header_buf.clear();
        if let Some(prefix) = &self.prefix {
            self.header_buf.extend_from_slice(prefix.as_bytes());
            self.header_buf.push(b'.');
        }
        self.header_buf.extend_from_slice(sanitize(name).as_bytes());
    }

    fn write_trailer(&mut self, timestamp: u64) {
        self.trailer_buf.clear();
        self.trailer_buf.push(b' ');
        self.trailer_buf.extend_from_slice(itoa::Buffer::new().format(timestamp).as_bytes());
        self.trailer_buf.push(b'\n');
    }

    fn write_field(&mut self, field: Option<&str>, value: FieldValue) {
        if let FieldValue::FloatingPoint(v) = value {
            if !v.is_finite() {
                return;
            }
        }

        self.buf.extend_from_slice(&self.header_buf);
        if let Some(field) = field {
            self.buf.push(b'.');
            self.buf.extend_from_slice(field.as_bytes());
        }
        self.buf.push(b' ');
        self.buf.extend_from_slice(self.formatter.format(value).as_bytes());
        self.buf.extend_from_slice(&self.trailer_buf);
        self.lines += 1;
    }

    fn write_rates(&mut self, rates: &RatesView) {
        self.write_field(Some("m1_rate"), FieldValue::FloatingPoint(rates.one_minute_rate));
        self.write_field(Some("m5_rate"), FieldValue::FloatingPoint(rates.five_minute_rate));
        self.write_field(Some("m15_rate"), FieldValue::FloatingPoint(rates.fifteen_minute_rate));
        self.write_field(Some("mean_rate"), FieldValue::FloatingPoint(rates.mean_rate));
    }

    fn write_snapshot(&mut self, snapshot: &Snapshot) {
        let fields = [
            ("min", snapshot.min),
            ("max", snapshot.max),
            ("mean", snapshot.mean),
            ("stddev", snapshot.std_dev),
        ];
        for (field, value) in fields {
            self.write_field(Some(field), FieldValue::FloatingPoint(value));
        }
        for (quantile, value) in snapshot.quantiles() {
            self.write_field(Some(quantile.label()), FieldValue::FloatingPoint(value));
        }
    }

    pub fn write_metric(&mut self, name: &str, metric: &Metric, batch: &Batch<'_>) {
        self.write_metric_header(name);

        match metric {
            Metric::Gauge(gauge) => {
                let value = match gauge.value() {
                    Value::Integer(v) => FieldValue::Signed(v),
                    Value::Float(v) => FieldValue::FloatingPoint(v),
                };
                self.write_field(None, value);
            }
            Metric::Counter(counter) => {
                self.write_field(Some("count"), FieldValue::Signed(counter.count()));
            }
            Metric::Histogram(histogram) => {
                self.write_field(Some("count"), FieldValue::Unsigned(histogram.count()));
                self.write_snapshot(&histogram.snapshot());
            }
            Metric::Meter(meter) => {
                let rates = meter.rates(batch.rate_unit);
                self.write_field(Some("count"), FieldValue::Unsigned(meter.count()));
                self.write_rates(&rates);
            }
            Metric::Timer(timer) => {
                let rates = timer.rates(batch.rate_unit);
                self.write_field(Some("count"), FieldValue::Unsigned(timer.count()));
                self.write_snapshot(&timer.snapshot(batch.duration_unit));
                self.write_rates(&rates);
            }
        }
    }

    pub fn write_batch(&mut self, batch: &Batch<'_>) {
        self.write_trailer(unix_seconds(batch.timestamp));

        for (name, metric) in batch.metrics {
            self.write_metric(name, metric, batch);
        }
    }
}

/// Seconds since the Unix epoch for `time`, or zero for times before it.
fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        time::{Duration, UNIX_EPOCH},
    };

    use metrology::{reporter::Batch, Metric, Registry, TimeUnit};
    use proptest::prelude::*;
    use quanta::Clock;

    use super::{sanitize, LineWriter};

    fn render(prefix: Option<&str>, metrics: &BTreeMap<String, Metric>) -> String {
        let batch = Batch {
            timestamp: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            metrics,
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
        };

        let mut writer = LineWriter::new(prefix);
        writer.write_batch(&batch);
        String::from_utf8(writer.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_gauges_and_counters() {
        let registry = Registry::new();
        registry.gauge("queue depth", || 12).unwrap();
        registry.gauge("load", || 0.25).unwrap();
        registry.counter("jobs").unwrap().increment_by(-3);

        let output = render(Some("app"), &registry.metrics());
        let expected = "app.jobs.count -3 1700000000\n\
                        app.load 0.25 1700000000\n\
                        app.queue-depth 12 1700000000\n";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_non_finite_readings_are_skipped() {
        let registry = Registry::new();
        registry.ratio("hit-ratio", || 1, || 0).unwrap();

        let mut writer = LineWriter::new(None);
        let metrics = registry.metrics();
        let batch = Batch {
            timestamp: UNIX_EPOCH,
            metrics: &metrics,
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
        };
        writer.write_batch(&batch);
        assert_eq!(writer.lines(), 0);
        assert!(writer.as_bytes().is_empty());
    }

    #[test]
    fn test_histogram_fields() {
        let registry = Registry::with_clock(Clock::mock().0);
        let histogram = registry.histogram("sizes").unwrap();
        for v in 1..=10 {
            histogram.update(v);
        }

        let output = render(None, &registry.metrics());
        let fields: Vec<&str> = output
            .lines()
            .map(|line| line.split(' ').next().unwrap().trim_start_matches("sizes."))
            .collect();
        assert_eq!(
            fields,
            ["count", "min", "max", "mean", "stddev", "p50", "p75", "p95", "p98", "p99", "p999"]
        );
        assert!(output.contains("sizes.count 10 1700000000\n"));
        assert!(output.contains("sizes.p50 5.5 1700000000\n"));
        assert!(output.contains("sizes.max 10.0 1700000000\n"));
    }

    #[test]
    fn test_meter_and_timer_fields() {
        let (clock, mock) = Clock::mock();
        let registry = Registry::with_clock(clock);
        registry.meter("hits").unwrap().mark_n(4);
        registry.timer("latency").unwrap().update(Duration::from_millis(250));
        mock.increment(Duration::from_secs(2));

        let output = render(Some("svc"), &registry.metrics());
        assert!(output.contains("svc.hits.count 4 1700000000\n"));
        assert!(output.contains("svc.hits.mean_rate 2.0 1700000000\n"));
        assert!(output.contains("svc.hits.m1_rate 0.0 1700000000\n"));
        assert!(output.contains("svc.latency.count 1 1700000000\n"));
        assert!(output.contains("svc.latency.max 250.0 1700000000\n"));
        assert!(output.contains("svc.latency.m15_rate 0.0 1700000000\n"));
        assert!(output.contains("svc.latency.mean_rate 0.5 1700000000\n"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("plain.name"), "plain.name");
        assert_eq!(sanitize("with  spaces\tand\ntabs"), "with-spaces-and-tabs");
        assert_eq!(LineWriter::new(Some("my app")).prefix.as_deref(), Some("my-app"));
        assert_eq!(LineWriter::new(Some("")).prefix, None);
    }

    proptest! {
        #[test]
        fn test_sanitized_names_have_no_whitespace(name in "\\PC*") {
            let sanitized = sanitize(&name);
            prop_assert!(!sanitized.chars().any(char::is_whitespace));
            prop_assert!(sanitized.len() <= name.len());
        }
    }
}
