//! Socket ownership and the connection state machine's states.

use std::fmt;
use std::io::{self, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use natsline_config::ServerEndpoint;
use natsline_wire::{FrameReader, ReadOutcome, WireError};

use crate::ClientError;

/// Lifecycle states of a client connection.
///
/// `Disconnected → Connecting → AwaitingAck → Ready → Closing → Disconnected`.
/// A failed verbose handshake leaves the client in `AwaitingAck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket is held.
    Disconnected,
    /// The socket is being opened.
    Connecting,
    /// `INFO` has been read; `CONNECT` is sent or awaiting `+OK`.
    AwaitingAck,
    /// Commands may be sent and frames dispatched.
    Ready,
    /// Workers are draining and subscriptions are being released.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingAck => "awaiting_ack",
            Self::Ready => "ready",
            Self::Closing => "closing",
        };
        formatter.write_str(label)
    }
}

/// Exclusive owner of the broker socket.
///
/// Reads go through a buffered [`FrameReader`]; writes go through a clone of
/// the same stream.
pub(crate) struct Connection {
    reader: FrameReader<BufReader<TcpStream>>,
    writer: TcpStream,
}

impl Connection {
    /// Opens a socket to the first resolved address that accepts within
    /// `timeout` and applies `timeout` to reads and writes.
    pub(crate) fn open(endpoint: &ServerEndpoint, timeout: Duration) -> Result<Self, ClientError> {
        let addresses = resolve(endpoint)?;
        let mut last_error = None;
        for address in addresses {
            match TcpStream::connect_timeout(&address, timeout) {
                Ok(stream) => {
                    return Self::from_stream(stream, timeout).map_err(|source| {
                        ClientError::ConnectFailed {
                            endpoint: endpoint.to_string(),
                            source,
                        }
                    });
                }
                Err(error) => last_error = Some(error),
            }
        }
        Err(ClientError::ConnectFailed {
            endpoint: endpoint.to_string(),
            source: last_error.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses")
            }),
        })
    }

    fn from_stream(stream: TcpStream, timeout: Duration) -> io::Result<Self> {
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: FrameReader::new(BufReader::new(stream)),
            writer,
        })
    }

    /// Applies a new timeout to the live socket.
    pub(crate) fn set_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.writer.set_read_timeout(Some(timeout))?;
        self.writer.set_write_timeout(Some(timeout))
    }

    pub(crate) fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.writer.write_all(frame)?;
        self.writer.flush()
    }

    /// Caps inbound payloads at the broker's announced `max_payload`. A limit
    /// that does not fit in memory addressing is treated as no limit.
    pub(crate) fn set_max_payload(&mut self, announced: Option<u64>) {
        let limit = announced.and_then(|bytes| usize::try_from(bytes).ok());
        self.reader.set_max_payload(limit);
    }

    pub(crate) fn read_frame(&mut self) -> Result<ReadOutcome, WireError> {
        self.reader.read_frame()
    }

    /// Shuts both directions down so the peer observes the close promptly.
    pub(crate) fn shutdown(self) -> io::Result<()> {
        match self.writer.shutdown(Shutdown::Both) {
            Err(error) if error.kind() != io::ErrorKind::NotConnected => Err(error),
            _ => Ok(()),
        }
    }
}

fn resolve(endpoint: &ServerEndpoint) -> Result<Vec<SocketAddr>, ClientError> {
    (endpoint.host(), endpoint.port())
        .to_socket_addrs()
        .map(|addresses| addresses.collect())
        .map_err(|source| ClientError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })
}
