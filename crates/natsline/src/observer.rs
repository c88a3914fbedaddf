//! Observability sink injected into the client engine.

use natsline_wire::{InboundFrame, ServerInfo, SubscriptionId};
use tracing::{debug, info, warn};

use crate::{CLIENT_TARGET, ClientError, ConnectionState, WorkerExit, WorkerId};

/// Observer trait used to surface engine events to telemetry sinks.
///
/// The client calls these hooks from the thread driving it; implementations
/// must be cheap and must not block.
pub trait ClientObserver: Send + Sync {
    /// The connection state machine moved between states.
    fn state_changed(&self, from: ConnectionState, to: ConnectionState);

    /// The broker's `INFO` document was read during the handshake.
    fn server_announced(&self, info: &ServerInfo);

    /// A command was written to the socket.
    fn command_sent(&self, frame: &[u8]);

    /// A frame was read from the socket.
    fn frame_received(&self, frame: &InboundFrame);

    /// A worker was started for a delivered message.
    fn worker_spawned(&self, worker: WorkerId, sid: &SubscriptionId);

    /// A worker was reaped.
    fn worker_finished(&self, exit: WorkerExit);

    /// An error was absorbed without being returned to the caller.
    fn error_absorbed(&self, error: &ClientError);
}

/// Default observer that records engine events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ClientObserver for TracingObserver {
    fn state_changed(&self, from: ConnectionState, to: ConnectionState) {
        debug!(
            target: CLIENT_TARGET,
            event = "state_changed",
            from = %from,
            to = %to,
            "connection state changed"
        );
    }

    fn server_announced(&self, info: &ServerInfo) {
        info!(
            target: CLIENT_TARGET,
            event = "server_announced",
            server_id = info.server_id(),
            max_payload = info.max_payload(),
            "broker announced itself"
        );
    }

    fn command_sent(&self, frame: &[u8]) {
        debug!(
            target: CLIENT_TARGET,
            event = "command_sent",
            command = %command_summary(frame),
            bytes = frame.len(),
            "->"
        );
    }

    fn frame_received(&self, frame: &InboundFrame) {
        match frame {
            InboundFrame::Message(message) => debug!(
                target: CLIENT_TARGET,
                event = "frame_received",
                kind = %frame.kind(),
                subject = %message.subject,
                sid = %message.sid,
                bytes = message.payload.len(),
                "<-"
            ),
            InboundFrame::ErrAck(reason) => warn!(
                target: CLIENT_TARGET,
                event = "frame_received",
                kind = %frame.kind(),
                reason = %reason,
                "<-"
            ),
            InboundFrame::Unknown(line) => warn!(
                target: CLIENT_TARGET,
                event = "frame_received",
                kind = %frame.kind(),
                line = %line,
                "<- unrecognised frame"
            ),
            InboundFrame::Info(_)
            | InboundFrame::Ping
            | InboundFrame::Pong
            | InboundFrame::OkAck => debug!(
                target: CLIENT_TARGET,
                event = "frame_received",
                kind = %frame.kind(),
                "<-"
            ),
        }
    }

    fn worker_spawned(&self, worker: WorkerId, sid: &SubscriptionId) {
        debug!(
            target: CLIENT_TARGET,
            event = "worker_spawned",
            worker = %worker,
            sid = %sid,
            "message worker started"
        );
    }

    fn worker_finished(&self, exit: WorkerExit) {
        match exit {
            WorkerExit::Completed(worker) => debug!(
                target: CLIENT_TARGET,
                event = "worker_finished",
                worker = %worker,
                "message worker finished"
            ),
            WorkerExit::Panicked(worker) => warn!(
                target: CLIENT_TARGET,
                event = "worker_panicked",
                worker = %worker,
                "message handler panicked"
            ),
        }
    }

    fn error_absorbed(&self, error: &ClientError) {
        warn!(
            target: CLIENT_TARGET,
            event = "error_absorbed",
            error = %error,
            "client error absorbed"
        );
    }
}

/// First line of an outbound frame with CONNECT credentials elided.
fn command_summary(frame: &[u8]) -> String {
    let header = frame
        .split(|byte| *byte == b'\n')
        .next()
        .unwrap_or_default();
    let line = String::from_utf8_lossy(header);
    let trimmed = line.trim_end();
    if trimmed.starts_with("CONNECT") {
        return String::from("CONNECT {...}");
    }
    trimmed.to_owned()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"PUB foo 2\r\nhi\r\n".as_slice(), "PUB foo 2")]
    #[case(b"CONNECT {\"pass\":\"secret\"}\r\n".as_slice(), "CONNECT {...}")]
    #[case(b"PING\r\n".as_slice(), "PING")]
    fn summaries_show_header_only(#[case] frame: &[u8], #[case] expected: &str) {
        assert_eq!(command_summary(frame), expected);
    }
}
