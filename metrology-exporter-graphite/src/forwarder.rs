use std::{
    io::{self, Write as _},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use metrology::{
    reporter::{Batch, Exporter},
    Error,
};
use tracing::{debug, trace};

use crate::writer::LineWriter;

#[derive(Clone, Debug)]
pub(crate) struct ForwarderConfiguration {
    pub host: String,
    pub port: u16,
    pub write_timeout: Duration,
}

impl ForwarderConfiguration {
    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_error = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.write_timeout) {
                Ok(stream) => {
                    stream.set_write_timeout(Some(self.write_timeout))?;
                    stream.set_nodelay(true)?;
                    debug!(%addr, "connected to graphite");
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("`{}` did not resolve", self.host))
        }))
    }
}

enum ClientState {
    // Intermediate state during send attempts.
    Inconsistent,

    // Forwarder is currently disconnected.
    Disconnected(ForwarderConfiguration),

    // Forwarder is connected and ready to send metrics.
    Ready(ForwarderConfiguration, TcpStream),
}

impl ClientState {
    fn try_send(&mut self, payload: &[u8]) -> io::Result<()> {
        loop {
            let old_state = std::mem::replace(self, ClientState::Inconsistent);
            match old_state {
                ClientState::Inconsistent => unreachable!("transitioned _from_ inconsistent state"),
                ClientState::Disconnected(config) => match config.connect() {
                    Ok(stream) => *self = ClientState::Ready(config, stream),
                    Err(e) => {
                        *self = ClientState::Disconnected(config);
                        return Err(e);
                    }
                },
                ClientState::Ready(config, mut stream) => {
                    let result = stream.write_all(payload).and_then(|()| stream.flush());
                    if result.is_ok() {
                        *self = ClientState::Ready(config, stream);
                    } else {
                        *self = ClientState::Disconnected(config);
                    }

                    return result;
                }
            };
        }
    }

    fn disconnect(&mut self) {
        if let ClientState::Ready(config, stream) = std::mem::replace(self, ClientState::Inconsistent)
        {
            let _ = stream.shutdown(Shutdown::Both);
            *self = ClientState::Disconnected(config);
        }
    }

    fn is_connected(&self) -> bool {
        matches!(self, ClientState::Ready(..))
    }
}

/// Sends batches to a Graphite server over TCP, using the plaintext protocol.
///
/// The connection is opened lazily on the first export.  When a write fails, the connection is
/// dropped and reopened on the next export.
pub struct GraphiteExporter {
    client_state: ClientState,
    writer: LineWriter,
}

impl GraphiteExporter {
    pub(crate) fn new(config: ForwarderConfiguration, prefix: Option<&str>) -> Self {
        Self { client_state: ClientState::Disconnected(config), writer: LineWriter::new(prefix) }
    }

    /// Whether a connection to the server is currently open.
    pub fn is_connected(&self) -> bool {
        self.client_state.is_connected()
    }
}

impl Exporter for GraphiteExporter {
    fn export(&mut self, batch: &Batch<'_>) -> Result<(), Error> {
        self.writer.clear();
        self.writer.write_batch(batch);
        if self.writer.lines() == 0 {
            return Ok(());
        }

        self.client_state.try_send(self.writer.as_bytes())?;
        trace!(lines = self.writer.lines(), "sent metrics to graphite");
        Ok(())
    }

    fn close(&mut self) {
        self.client_state.disconnect();
    }
}

impl std::fmt::Debug for GraphiteExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphiteExporter")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
