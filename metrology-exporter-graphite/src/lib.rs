//! A [`metrology`] exporter for sending metrics to a [Graphite][graphite] server.
//!
//! [graphite]: https://graphite.readthedocs.io/en/latest/feeding-carbon.html
//!
//! # Usage
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use metrology::{Registry, TimeUnit};
//! # use metrology_exporter_graphite::GraphiteBuilder;
//! let registry = Arc::new(Registry::new());
//!
//! // The builder configures where metrics are sent, how they are named, and how often they are sent.
//! let mut reporter = GraphiteBuilder::new("graphite.internal")
//!     .with_prefix("web01")
//!     .with_frequency(10, TimeUnit::Seconds)
//!     .build(Arc::clone(&registry))
//!     .expect("failed to build reporter");
//!
//! reporter.start().expect("failed to start reporter");
//! registry.counter("jobs.processed").unwrap().increment();
//! ```
//!
//! # Protocol
//!
//! Metrics are sent over TCP using the plaintext protocol, one line per field:
//!
//! ```text
//! <prefix>.<name>.<field> <value> <unix timestamp>
//! ```
//!
//! Whitespace in names is replaced with `-`.  Gauges are sent without a field; counters send `count`; meters send
//! `count`, `m1_rate`, `m5_rate`, `m15_rate` and `mean_rate`; histograms send `count` followed by `min`, `max`,
//! `mean`, `stddev`, `p50`, `p75`, `p95`, `p98`, `p99` and `p999`; timers send all of the histogram fields followed
//! by the meter rates.
//!
//! # Connection handling
//!
//! The connection is opened on the first export, not when the reporter is built.  If a write fails, the batch is
//! dropped, the failure is logged and passed to the reporter's error hook, and the connection is reopened on the next
//! export.
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, GraphiteBuilder};

mod forwarder;
pub use self::forwarder::GraphiteExporter;

mod writer;
pub use self::writer::sanitize;
