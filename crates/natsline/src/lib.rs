//! Blocking client for a line-oriented publish/subscribe broker.
//!
//! The crate drives a single TCP connection through the handshake
//! (`INFO` in, `CONNECT` out, optional `+OK`), publishes and subscribes on
//! behalf of the caller, and runs a read loop that answers keep-alive probes
//! inline and hands each delivered message to its own worker thread.
//!
//! The socket is owned exclusively by [`Client`] and is only touched through
//! `&mut self`. Handlers receive the [`Message`] and nothing else, so a slow
//! or panicking handler cannot corrupt the connection. Engine events are
//! reported through a [`ClientObserver`]; the default [`TracingObserver`]
//! emits structured `tracing` events under the `natsline::client` target.
//!
//! Wire encoding lives in [`natsline_wire`] and configuration in
//! [`natsline_config`]; the types callers need from both are re-exported here.

mod client;
mod connection;
mod error;
mod handler;
mod observer;
mod registry;
pub mod sid;
mod workers;

pub use client::{Client, Progress, StopHandle, WaitExit};
pub use connection::ConnectionState;
pub use error::ClientError;
pub use handler::{MessageHandler, TracingHandler};
pub use natsline_config::{ClientConfig, ClientConfigBuilder, ServerEndpoint};
pub use natsline_wire::{FrameKind, InboundFrame, Message, ServerInfo, SubscriptionId};
pub use observer::{ClientObserver, TracingObserver};
pub use registry::SubscriptionRegistry;
pub use workers::{WorkerExit, WorkerId};

/// Tracing target used by the engine's structured events.
pub const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
mod tests;
