//! Error taxonomy for the client engine.

use std::io;

use natsline_wire::{SubscriptionId, WireError};
use thiserror::Error;

use crate::ConnectionState;

/// Failures surfaced by [`crate::Client`] operations or reported to a
/// [`crate::ClientObserver`] when absorbed by the dispatch loop.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The broker host could not be resolved.
    #[error("failed to resolve broker address {endpoint}: {source}")]
    Resolve {
        /// Display form of the configured endpoint.
        endpoint: String,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// No resolved address accepted the connection within the timeout.
    #[error("failed to connect to broker at {endpoint}: {source}")]
    ConnectFailed {
        /// Display form of the configured endpoint.
        endpoint: String,
        /// Last socket error observed.
        #[source]
        source: io::Error,
    },
    /// The broker did not acknowledge `CONNECT` in verbose mode.
    #[error("handshake failed: {reason}")]
    HandshakeFailed {
        /// What arrived instead of `+OK`.
        reason: String,
    },
    /// The broker did not acknowledge a command in verbose mode.
    #[error("command rejected: {reason}")]
    CommandRejected {
        /// What arrived instead of `+OK`.
        reason: String,
    },
    /// The operation needs a ready connection.
    #[error("client is not connected (state: {state})")]
    NotConnected {
        /// State at the time of the call.
        state: ConnectionState,
    },
    /// A command could not be encoded.
    #[error(transparent)]
    Encode(WireError),
    /// An inbound frame was malformed and has been discarded.
    #[error("discarded inbound frame: {0}")]
    Frame(#[source] WireError),
    /// Writing to the socket failed; the connection has been dropped.
    #[error("failed to send to broker: {0}")]
    Send(#[source] io::Error),
    /// Reading from the socket failed; the connection has been dropped.
    #[error("failed to read from broker: {0}")]
    Receive(#[source] WireError),
    /// Updating socket options failed.
    #[error("failed to configure socket: {0}")]
    Socket(#[source] io::Error),
    /// The broker closed the connection.
    #[error("broker closed the connection")]
    ConnectionClosed,
    /// A worker thread for a delivered message could not be started; the
    /// message was dropped.
    #[error("failed to spawn worker for subscription {sid}: {source}")]
    WorkerSpawnFailed {
        /// Subscription the dropped message belonged to.
        sid: SubscriptionId,
        /// Thread spawn failure.
        #[source]
        source: io::Error,
    },
}

impl From<WireError> for ClientError {
    fn from(error: WireError) -> Self {
        Self::Encode(error)
    }
}
