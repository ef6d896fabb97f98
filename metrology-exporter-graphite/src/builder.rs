use std::{sync::Arc, time::Duration};

use metrology::{MetricKindMask, Registry, Reporter, ReporterConfig, TimeUnit};
use thiserror::Error;

use crate::forwarder::{ForwarderConfiguration, GraphiteExporter};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 2003;
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_FREQUENCY: u64 = 5;

/// Errors that could occur while building a Graphite reporter.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to parse the remote address.
    #[error("invalid remote address: {reason}")]
    InvalidRemoteAddress {
        /// Details about the parsing failure.
        reason: String,
    },

    /// The write timeout was zero.
    #[error("write timeout must be positive")]
    InvalidWriteTimeout,

    /// The reporter rejected its configuration.
    #[error(transparent)]
    Reporter(#[from] metrology::Error),
}

/// Builder for a Graphite reporter.
#[derive(Clone, Debug)]
pub struct GraphiteBuilder {
    host: String,
    port: u16,
    prefix: Option<String>,
    write_timeout: Duration,
    config: ReporterConfig,
}

impl GraphiteBuilder {
    /// Creates a builder sending to `host` on the default port.
    pub fn new<H>(host: H) -> Self
    where
        H: Into<String>,
    {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            prefix: None,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            config: ReporterConfig {
                frequency: DEFAULT_FREQUENCY,
                frequency_unit: TimeUnit::Seconds,
                ..ReporterConfig::default()
            },
        }
    }

    /// Set the remote address to send metrics to, in the format of `<host>:<port>`.
    ///
    /// IPv6 addresses must be enclosed in brackets, as in `[::1]:2003`.
    ///
    /// # Errors
    ///
    /// If the given address is not able to be parsed as a valid address, an error will be returned indicating the
    /// reason.
    pub fn with_remote_address<A>(mut self, addr: A) -> Result<Self, BuildError>
    where
        A: AsRef<str>,
    {
        let (host, port) = parse_remote_address(addr.as_ref())
            .map_err(|reason| BuildError::InvalidRemoteAddress { reason })?;
        self.host = host.to_string();
        self.port = port;
        Ok(self)
    }

    /// Set the port of the Graphite server.
    ///
    /// Defaults to 2003, the plaintext protocol port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set a prefix prepended to every metric name, separated by a `.`.
    ///
    /// Defaults to no prefix.
    #[must_use]
    pub fn with_prefix<P>(mut self, prefix: P) -> Self
    where
        P: Into<String>,
    {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the unit that rates are expressed per.
    ///
    /// Defaults to seconds.
    #[must_use]
    pub fn with_rate_unit(mut self, unit: TimeUnit) -> Self {
        self.config.rate_unit = unit;
        self
    }

    /// Set the unit that durations are expressed in.
    ///
    /// Defaults to milliseconds.
    #[must_use]
    pub fn with_duration_unit(mut self, unit: TimeUnit) -> Self {
        self.config.duration_unit = unit;
        self
    }

    /// Set how often metrics are sent.
    ///
    /// Defaults to every 5 seconds.
    #[must_use]
    pub fn with_frequency(mut self, frequency: u64, unit: TimeUnit) -> Self {
        self.config.frequency = frequency;
        self.config.frequency_unit = unit;
        self
    }

    /// Set which kinds of metrics are sent.
    ///
    /// Defaults to every kind.
    #[must_use]
    pub fn with_filter(mut self, filter: MetricKindMask) -> Self {
        self.config.filter = filter;
        self
    }

    /// Set the timeout for connecting to the server and for writing to it.
    ///
    /// When the timeout is reached, the batch being sent is dropped without retrying, and the connection is
    /// reopened on the next export.
    ///
    /// Must be positive.  Defaults to 1 second.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Builds the reporter.
    ///
    /// No connection is made until the first export.  The reporter must be started by the caller.
    ///
    /// # Errors
    ///
    /// If the configured frequency or write timeout is zero, an error will be returned.
    pub fn build(self, registry: Arc<Registry>) -> Result<Reporter<GraphiteExporter>, BuildError> {
        if self.write_timeout.is_zero() {
            return Err(BuildError::InvalidWriteTimeout);
        }

        let forwarder_config = ForwarderConfiguration {
            host: self.host,
            port: self.port,
            write_timeout: self.write_timeout,
        };
        let exporter = GraphiteExporter::new(forwarder_config, self.prefix.as_deref());

        Ok(Reporter::new(registry, exporter, self.config)?)
    }
}

impl Default for GraphiteBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

fn parse_remote_address(addr: &str) -> Result<(&str, u16), String> {
    let (host, port) =
        addr.rsplit_once(':').ok_or_else(|| format!("`{}` is missing a port", addr))?;
    let host = match host.strip_prefix('[') {
        Some(inner) => {
            inner.strip_suffix(']').ok_or_else(|| format!("`{}` has an unclosed bracket", addr))?
        }
        None if host.contains(':') => {
            return Err(format!("IPv6 address in `{}` must be enclosed in brackets", addr))
        }
        None => host,
    };
    if host.is_empty() {
        return Err(format!("`{}` is missing a host", addr));
    }
    let port = port.parse::<u16>().map_err(|e| format!("invalid port `{}`: {}", port, e))?;

    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use metrology::{MetricKindMask, Registry, ReporterConfig, ReporterState, TimeUnit};

    use super::{parse_remote_address, BuildError, GraphiteBuilder};

    #[test]
    fn test_defaults() {
        let builder = GraphiteBuilder::default();
        assert_eq!(builder.host, "127.0.0.1");
        assert_eq!(builder.port, 2003);
        assert_eq!(builder.prefix, None);
        assert_eq!(builder.write_timeout, Duration::from_secs(1));
        assert_eq!(
            builder.config,
            ReporterConfig {
                frequency: 5,
                frequency_unit: TimeUnit::Seconds,
                rate_unit: TimeUnit::Seconds,
                duration_unit: TimeUnit::Milliseconds,
                filter: MetricKindMask::ALL,
            }
        );
    }

    #[test]
    fn test_remote_address() {
        assert_eq!(parse_remote_address("graphite.local:2004"), Ok(("graphite.local", 2004)));
        assert_eq!(parse_remote_address("[::1]:2003"), Ok(("::1", 2003)));

        for invalid in ["graphite.local", ":2003", "host:port", "host:70000", "::1:2003", "[::1:2003"] {
            assert!(parse_remote_address(invalid).is_err(), "{} should be rejected", invalid);
        }

        let err = GraphiteBuilder::default().with_remote_address("nope").unwrap_err();
        assert!(matches!(err, BuildError::InvalidRemoteAddress { .. }));
        assert_eq!(err.to_string(), "invalid remote address: `nope` is missing a port");
    }

    #[test]
    fn test_build() {
        let reporter = GraphiteBuilder::new("localhost")
            .with_port(2103)
            .with_prefix("app")
            .with_rate_unit(TimeUnit::Minutes)
            .with_frequency(30, TimeUnit::Seconds)
            .build(Arc::new(Registry::new()))
            .unwrap();

        assert_eq!(reporter.state(), ReporterState::Created);
        assert_eq!(reporter.config().rate_unit, TimeUnit::Minutes);
        assert_eq!(reporter.config().interval(), Duration::from_secs(30));
        assert!(!reporter.with_exporter(|exporter| exporter.is_connected()));
    }

    #[test]
    fn test_zero_frequency_is_rejected() {
        let err = GraphiteBuilder::default()
            .with_frequency(0, TimeUnit::Seconds)
            .build(Arc::new(Registry::new()))
            .unwrap_err();
        assert!(matches!(err, BuildError::Reporter(_)));
    }

    #[test]
    fn test_zero_write_timeout_is_rejected() {
        let err = GraphiteBuilder::default()
            .with_write_timeout(Duration::ZERO)
            .build(Arc::new(Registry::new()))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidWriteTimeout));
        assert_eq!(err.to_string(), "write timeout must be positive");

        assert!(GraphiteBuilder::default()
            .with_write_timeout(Duration::from_millis(1))
            .build(Arc::new(Registry::new()))
            .is_ok());
    }
}
