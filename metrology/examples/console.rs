//! Prints a registry to standard output every few seconds while pretending to serve requests.
use std::{sync::Arc, thread, time::Duration};

use metrology::{ConsoleBuilder, Registry, TimeUnit};

fn main() -> Result<(), metrology::Error> {
    tracing_subscriber::fmt::init();

    let registry = Arc::new(Registry::new());
    let requests = registry.meter("requests")?;
    let latency = registry.timer("requests.latency")?;
    let in_flight = registry.counter("requests.in-flight")?;
    let sizes = registry.histogram("requests.size")?;
    let (p95, median) = (sizes.clone(), sizes.clone());
    let ratio = registry.ratio(
        "requests.p95-to-median",
        move || p95.snapshot().p95,
        move || median.snapshot().median,
    )?;
    registry.derive_gauge("requests.p95-to-median.percent", &ratio, |v| v.as_f64() * 100.0)?;

    let mut reporter = ConsoleBuilder::new()
        .with_frequency(2, TimeUnit::Seconds)
        .with_duration_unit(TimeUnit::Microseconds)
        .build(Arc::clone(&registry))?;

    reporter.scope(|| {
        for i in 0..1_000u64 {
            in_flight.increment();
            latency.time(|| thread::sleep(Duration::from_millis(i % 7)));
            requests.mark();
            sizes.update((i * 37 % 1024) as i64);
            in_flight.decrement();
        }
    })
}
