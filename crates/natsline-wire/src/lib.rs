//! Wire codec for the natsline publish/subscribe protocol.
//!
//! The protocol is line oriented: every control frame is a single
//! CRLF-terminated line whose first token names the operation. The one
//! exception is `MSG`, whose header line declares a byte count that is
//! followed by exactly that many payload bytes and a trailing CRLF.
//!
//! This crate owns both directions of the mapping:
//!
//! - [`encode`] turns client commands (`CONNECT`, `PUB`, `SUB`, `UNSUB`,
//!   `PING`, `PONG`) into the bytes written to the socket.
//! - [`decode_line`] classifies one inbound line, and [`FrameReader`] drives
//!   a blocking [`std::io::BufRead`] source to produce whole
//!   [`InboundFrame`]s, distinguishing read timeouts from a closed
//!   connection.
//!
//! The JSON documents exchanged during the handshake are modelled by
//! [`ConnectOptions`] and [`ServerInfo`].

pub mod encode;
mod error;
mod frame;
mod options;
mod reader;

pub use encode::{
    PING, PONG, encode_connect, encode_publish, encode_subscribe, encode_unsubscribe,
    validate_token,
};
pub use error::{TokenKind, WireError};
pub use frame::{
    DecodedLine, FrameKind, InboundFrame, Message, MessageHeader, SubscriptionId, decode_line,
};
pub use options::{ConnectOptions, ServerInfo};
pub use reader::{FrameReader, ReadOutcome};

/// Terminator appended to every protocol line and payload.
pub const CRLF: &[u8] = b"\r\n";
