//! In-process instrumentation.
//!
//! `metrology` provides a registry of named, typed instruments that application code updates
//! cheaply at call sites, and reporters that periodically export the state of a registry to a
//! destination such as the console or a Graphite server.
//!
//! # Overview
//!
//! ## Instruments
//! Five kinds of instruments are supported:
//!
//! - [`Gauge`]: reads a value on demand from an accessor, such as a closure or a shared atomic.
//!   [Ratio](Gauge::ratio) gauges divide one accessor by another, and [derived](Gauge::derive)
//!   gauges transform the reading of another gauge.
//! - [`Counter`]: a signed 64-bit total that is incremented and decremented atomically.
//! - [`Histogram`]: samples a stream of integers into a reservoir, and summarizes it on demand as
//!   a [`Snapshot`] of percentiles.
//! - [`Meter`]: counts events and tracks their mean rate and one-, five- and fifteen-minute moving
//!   average rates, read as a [`RatesView`].
//! - [`Timer`]: a histogram of durations paired with a meter of completions.
//!
//! Every instrument is a cheap handle to shared state: clones refer to the same instrument, and
//! every operation takes `&self` and is safe to call from any number of threads.
//!
//! Two capability traits cut across the kinds.  [`Updateable`] is implemented by instruments that
//! accept samples (histograms and timers) and [`SingleValued`] by everything that can be summarized
//! as one number: a gauge's reading, a counter's total, and the event count of the rest.
//!
//! ## Registries
//! A [`Registry`] binds names to instruments.  Counters, histograms, meters and timers are
//! get-or-create, so any number of call sites can ask for the same name and share the instrument:
//!
//! ```rust
//! # use metrology::Registry;
//! let registry = Registry::new();
//! registry.counter("jobs.processed")?.increment();
//! registry.counter("jobs.processed")?.increment_by(2);
//! assert_eq!(registry.counter("jobs.processed")?.count(), 3);
//! # Ok::<(), metrology::Error>(())
//! ```
//!
//! Gauges capture their accessor at registration, and so are registered exactly once.
//!
//! ## Timing
//! Timers can record durations directly, or time a piece of work:
//!
//! ```rust
//! # use metrology::{Registry, TimeUnit};
//! let registry = Registry::new();
//! let timer = registry.timer("render")?;
//!
//! let page = timer.time(|| "<html></html>");
//!
//! let handle = timer.start();
//! // ... work ...
//! let elapsed = handle.stop();
//!
//! assert_eq!(timer.count(), 2);
//! let snapshot = timer.snapshot(TimeUnit::Milliseconds);
//! assert_eq!(snapshot.label.as_deref(), Some("calls/millisecond"));
//! # let _ = (page, elapsed);
//! # Ok::<(), metrology::Error>(())
//! ```
//!
//! ## Reporting
//! A [`Reporter`] exports every metric of a registry through an [`Exporter`] on a background
//! thread.  Reporters are started once and stopped once; dropping a reporter stops it.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use metrology::{ConsoleBuilder, Registry, TimeUnit};
//! let registry = Arc::new(Registry::new());
//! let mut reporter = ConsoleBuilder::new()
//!     .with_frequency(10, TimeUnit::Seconds)
//!     .build(Arc::clone(&registry))?;
//! reporter.start()?;
//! # Ok::<(), metrology::Error>(())
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod data;
pub use self::data::{Counter, Gauge, Histogram, Meter, ReservoirKind, Timer};

mod error;
pub use self::error::{Error, ErrorKind};

mod kind;
pub use self::kind::{MetricKind, MetricKindMask};

mod metric;
pub use self::metric::Metric;

mod protocol;
pub use self::protocol::{SingleValued, Updateable};

mod registry;
pub use self::registry::Registry;

pub mod reporter;
pub use self::reporter::{
    ConsoleBuilder, ConsoleExporter, Exporter, Reporter, ReporterConfig, ReporterState,
};

mod stats;
pub use self::stats::{
    rates, snapshot, snapshot_quantiles, Metered, RatesView, Sampled, Snapshot, RATES_KEYS,
    SNAPSHOT_KEYS,
};

mod timing;
pub use self::timing::TimingHandle;

mod unit;
pub use self::unit::TimeUnit;

mod value;
pub use self::value::Value;

pub use metrology_util::{
    ExponentiallyDecayingReservoir, Quantile, Reservoir, Sample, UniformReservoir,
};
