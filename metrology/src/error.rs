use std::io;

use thiserror::Error;

use crate::{MetricKind, ReporterState};

/// Errors produced by registries, instruments and reporters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A time unit token was not recognized.
    #[error("unrecognized time unit `{0}`")]
    UnknownTimeUnit(String),

    /// An argument was outside of its valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A metric could not be registered because the name is already taken.
    ///
    /// Accumulating metrics (counters, histograms, meters and timers) are only reported as
    /// conflicting when the existing metric is of a different kind.  Gauges always conflict.
    #[error("metric `{name}` is already registered as a {existing} (requested {requested})")]
    AlreadyRegistered {
        /// Name of the metric.
        name: String,
        /// Kind of the metric already registered under `name`.
        existing: MetricKind,
        /// Kind of the metric that was requested.
        requested: MetricKind,
    },

    /// A reporter operation was attempted from a state that does not allow it.
    #[error("cannot {operation} a reporter that is {state}")]
    IllegalState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the reporter was in.
        state: ReporterState,
    },

    /// Exported metrics could not be delivered to their destination.
    #[error("failed to transmit metrics: {0}")]
    Transport(#[from] io::Error),

    /// A reporter's background thread could not be spawned.
    #[error("failed to spawn reporter thread: {0}")]
    Spawn(#[source] io::Error),

    /// An export panicked, either in the exporter or while reading a metric.
    #[error("export panicked: {0}")]
    ExportPanicked(String),
}

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// The caller passed something malformed or conflicting.
    InvalidArgument,
    /// The operation is not legal in the current lifecycle state.
    IllegalState,
    /// An exporter could not reach its destination.
    TransportFailure,
    /// A failure inside the library or a user callback, such as a panicking gauge.
    Internal,
}

impl Error {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownTimeUnit(_) | Error::InvalidArgument(_) | Error::AlreadyRegistered { .. } => {
                ErrorKind::InvalidArgument
            }
            Error::IllegalState { .. } => ErrorKind::IllegalState,
            Error::Transport(_) => ErrorKind::TransportFailure,
            Error::Spawn(_) | Error::ExportPanicked(_) => ErrorKind::Internal,
        }
    }
}
