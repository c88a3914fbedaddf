//! Read loop: frame intake, inline keep-alive replies and per-message workers.

use std::sync::Arc;

use natsline_wire::{FrameKind, InboundFrame, Message, PONG, ReadOutcome, ServerInfo, WireError};

use super::Client;
use crate::ClientError;

/// Result of one [`Client::process_next`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// A frame of the given kind was read and handled.
    Handled(FrameKind),
    /// A malformed frame was read and dropped.
    Discarded,
    /// The read timeout elapsed without a complete frame.
    Timeout,
    /// The broker closed the connection.
    Closed,
}

/// Why [`Client::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitExit {
    /// A stop was requested.
    Stopped,
    /// The connection ended.
    ConnectionClosed,
}

enum Inbound {
    Frame(InboundFrame),
    Discarded,
    Timeout,
    Closed,
}

impl Client {
    /// Reads and handles a single frame.
    ///
    /// `PING` is answered before returning. A `MSG` is handed to a fresh
    /// worker and the call returns without waiting for the handler. Finished
    /// workers are reaped first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] without a socket, and
    /// [`ClientError::Receive`] or [`ClientError::Send`] when the socket
    /// fails or a delivery declares more than the broker's `max_payload`; in
    /// these cases the connection is dropped.
    pub fn process_next(&mut self) -> Result<Progress, ClientError> {
        self.reap_workers();
        match self.next_frame()? {
            Inbound::Frame(frame) => {
                let kind = frame.kind();
                self.handle_frame(frame)?;
                Ok(Progress::Handled(kind))
            }
            Inbound::Discarded => Ok(Progress::Discarded),
            Inbound::Timeout => Ok(Progress::Timeout),
            Inbound::Closed => Ok(Progress::Closed),
        }
    }

    /// Runs the read loop until a stop is requested or the connection ends.
    ///
    /// The stop flag is checked before every read, so a pending request
    /// takes effect within one read timeout. Returning
    /// [`WaitExit::Stopped`] consumes the request.
    ///
    /// # Errors
    ///
    /// As for [`Client::process_next`].
    pub fn wait(&mut self) -> Result<WaitExit, ClientError> {
        if self.connection.is_none() {
            return Err(ClientError::NotConnected { state: self.state });
        }
        loop {
            if self.stop.take() {
                return Ok(WaitExit::Stopped);
            }
            if self.process_next()? == Progress::Closed {
                return Ok(WaitExit::ConnectionClosed);
            }
        }
    }

    /// Blocks until the broker acknowledges the last command.
    ///
    /// Frames that arrive first are handled as in the read loop. A refusal,
    /// an unexpected reply or a timeout is turned into an error by `refused`.
    pub(super) fn expect_ack(
        &mut self,
        refused: fn(String) -> ClientError,
    ) -> Result<(), ClientError> {
        loop {
            match self.next_frame()? {
                Inbound::Frame(InboundFrame::OkAck) => return Ok(()),
                Inbound::Frame(InboundFrame::ErrAck(reason)) => return Err(refused(reason)),
                Inbound::Frame(InboundFrame::Unknown(line)) => {
                    return Err(refused(format!("unexpected reply '{line}'")));
                }
                Inbound::Frame(frame) => self.handle_frame(frame)?,
                Inbound::Discarded => {}
                Inbound::Timeout => {
                    let waited = self.config.timeout().as_secs_f64();
                    return Err(refused(format!("no acknowledgement within {waited}s")));
                }
                Inbound::Closed => return Err(ClientError::ConnectionClosed),
            }
        }
    }

    fn next_frame(&mut self) -> Result<Inbound, ClientError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ClientError::NotConnected { state: self.state });
        };
        match connection.read_frame() {
            Ok(ReadOutcome::Frame(frame)) => {
                self.observer.frame_received(&frame);
                Ok(Inbound::Frame(frame))
            }
            Ok(ReadOutcome::Timeout) => Ok(Inbound::Timeout),
            Ok(ReadOutcome::Closed) => {
                self.drop_connection();
                Ok(Inbound::Closed)
            }
            Err(error) if error.is_frame_local() => {
                self.observer.error_absorbed(&ClientError::Frame(error));
                Ok(Inbound::Discarded)
            }
            Err(error @ (WireError::TruncatedFrame { .. } | WireError::TruncatedLine { .. })) => {
                self.observer.error_absorbed(&ClientError::Frame(error));
                self.drop_connection();
                Ok(Inbound::Closed)
            }
            Err(error) => {
                self.drop_connection();
                Err(ClientError::Receive(error))
            }
        }
    }

    fn handle_frame(&mut self, frame: InboundFrame) -> Result<(), ClientError> {
        match frame {
            InboundFrame::Ping => self.write_frame(PONG),
            InboundFrame::Message(message) => {
                self.dispatch_message(message);
                Ok(())
            }
            InboundFrame::Info(json) => {
                self.adopt_server_info(ServerInfo::from_json_lossy(&json));
                Ok(())
            }
            InboundFrame::Pong
            | InboundFrame::OkAck
            | InboundFrame::ErrAck(_)
            | InboundFrame::Unknown(_) => Ok(()),
        }
    }

    fn dispatch_message(&mut self, message: Message) {
        let handler = self
            .handlers
            .get(&message.sid)
            .map_or_else(|| Arc::clone(&self.handler), Arc::clone);
        let sid = message.sid.clone();
        match self.workers.spawn(move || handler.on_message(&message)) {
            Ok(worker) => self.observer.worker_spawned(worker, &sid),
            Err(source) => self
                .observer
                .error_absorbed(&ClientError::WorkerSpawnFailed { sid, source }),
        }
    }

    fn reap_workers(&mut self) {
        for exit in self.workers.reap() {
            self.observer.worker_finished(exit);
        }
    }
}
