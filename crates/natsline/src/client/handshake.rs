//! Connection establishment: socket open, `INFO` intake and `CONNECT`.

use natsline_wire::{InboundFrame, ReadOutcome, ServerInfo, encode_connect};

use super::Client;
use crate::connection::Connection;
use crate::{ClientError, ConnectionState};

impl Client {
    /// Opens the socket, reads the broker's `INFO` and sends `CONNECT`.
    ///
    /// In verbose mode the broker must answer `+OK`; any other answer leaves
    /// the client in [`ConnectionState::AwaitingAck`], and calling `connect`
    /// again resends `CONNECT` over the same socket. Connecting a ready
    /// client does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Resolve`] or [`ClientError::ConnectFailed`] when
    /// the socket cannot be opened, [`ClientError::ConnectionClosed`] when the
    /// broker hangs up before announcing itself, [`ClientError::Send`] when
    /// `CONNECT` cannot be written, and [`ClientError::HandshakeFailed`] when a
    /// verbose broker refuses it.
    pub fn connect(&mut self) -> Result<(), ClientError> {
        match self.state {
            ConnectionState::Ready => return Ok(()),
            ConnectionState::AwaitingAck if self.connection.is_some() => {
                return self.send_connect();
            }
            _ => {}
        }
        self.registry.clear();
        self.handlers.clear();
        self.server_info = ServerInfo::default();
        self.transition(ConnectionState::Connecting);
        let connection =
            match Connection::open(self.config.endpoint(), self.config.timeout()) {
                Ok(connection) => connection,
                Err(error) => {
                    self.transition(ConnectionState::Disconnected);
                    return Err(error);
                }
            };
        self.connection = Some(connection);
        self.read_server_info()?;
        self.transition(ConnectionState::AwaitingAck);
        self.send_connect()
    }

    /// Consumes the broker's greeting. Either `INFO {json}` or a bare JSON
    /// line is accepted; anything undecodable leaves the info empty.
    fn read_server_info(&mut self) -> Result<(), ClientError> {
        let outcome = match self.connection.as_mut() {
            Some(connection) => connection.read_frame(),
            None => return Err(ClientError::NotConnected { state: self.state }),
        };
        let frame = match outcome {
            Ok(ReadOutcome::Frame(frame)) => frame,
            Ok(ReadOutcome::Timeout) => return Ok(()),
            Ok(ReadOutcome::Closed) => {
                self.drop_connection();
                return Err(ClientError::ConnectionClosed);
            }
            Err(error) if error.is_frame_local() => {
                self.observer.error_absorbed(&ClientError::Frame(error));
                return Ok(());
            }
            Err(error) => {
                self.drop_connection();
                return Err(ClientError::Receive(error));
            }
        };
        self.observer.frame_received(&frame);
        let info = match &frame {
            InboundFrame::Info(json) => ServerInfo::from_json_lossy(json),
            InboundFrame::Unknown(line) if line.starts_with('{') => {
                ServerInfo::from_json_lossy(line)
            }
            _ => ServerInfo::default(),
        };
        self.adopt_server_info(info);
        Ok(())
    }

    /// Records a decoded `INFO` document and applies its payload limit to the
    /// reader. Empty documents are ignored.
    pub(super) fn adopt_server_info(&mut self, info: ServerInfo) {
        if info.is_empty() {
            return;
        }
        if let Some(connection) = self.connection.as_mut() {
            connection.set_max_payload(info.max_payload());
        }
        self.observer.server_announced(&info);
        self.server_info = info;
    }

    fn send_connect(&mut self) -> Result<(), ClientError> {
        let frame = encode_connect(self.config.options())?;
        self.write_frame(&frame)?;
        if self.config.verbose() {
            self.expect_ack(|reason| ClientError::HandshakeFailed { reason })?;
        }
        self.transition(ConnectionState::Ready);
        Ok(())
    }
}
