//! Inbound frame model and line classification.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::WireError;

/// Opaque token identifying one active subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Wraps an existing token.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for SubscriptionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A message delivered for a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Subject the message was published under.
    pub subject: String,
    /// Subscription the broker matched the message to.
    pub sid: SubscriptionId,
    /// Optional subject the publisher expects replies on.
    pub reply_to: Option<String>,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

impl Message {
    /// Payload decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Parsed `MSG` header awaiting its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Subject the message was published under.
    pub subject: String,
    /// Subscription the broker matched the message to.
    pub sid: SubscriptionId,
    /// Optional reply subject.
    pub reply_to: Option<String>,
    /// Declared payload size in bytes, excluding the terminator.
    pub payload_len: usize,
}

impl MessageHeader {
    /// Completes the header with its payload.
    #[must_use]
    pub fn into_message(self, payload: Vec<u8>) -> Message {
        Message {
            subject: self.subject,
            sid: self.sid,
            reply_to: self.reply_to,
            payload,
        }
    }
}

/// One complete protocol unit read from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Server announcement; holds the raw JSON text.
    Info(String),
    /// Keep-alive probe that must be answered with `PONG`.
    Ping,
    /// Keep-alive reply.
    Pong,
    /// Verbose-mode acknowledgement.
    OkAck,
    /// Verbose-mode rejection with the server's reason.
    ErrAck(String),
    /// Delivered message.
    Message(Message),
    /// Any line without a recognised keyword.
    Unknown(String),
}

impl InboundFrame {
    /// Discriminant used for logging.
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        match self {
            Self::Info(_) => FrameKind::Info,
            Self::Ping => FrameKind::Ping,
            Self::Pong => FrameKind::Pong,
            Self::OkAck => FrameKind::OkAck,
            Self::ErrAck(_) => FrameKind::ErrAck,
            Self::Message(_) => FrameKind::Message,
            Self::Unknown(_) => FrameKind::Unknown,
        }
    }
}

/// Payload-free frame discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// `INFO`
    Info,
    /// `PING`
    Ping,
    /// `PONG`
    Pong,
    /// `+OK`
    OkAck,
    /// `-ERR`
    ErrAck,
    /// `MSG`
    Message,
    /// Unrecognised line.
    Unknown,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::OkAck => "+OK",
            Self::ErrAck => "-ERR",
            Self::Message => "MSG",
            Self::Unknown => "UNKNOWN",
        };
        formatter.write_str(label)
    }
}

/// Result of classifying a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    /// The line is a complete frame on its own.
    Frame(InboundFrame),
    /// The line is a `MSG` header; the payload must be read next.
    MessageHeader(MessageHeader),
}

/// Classifies one inbound line by its leading keyword.
///
/// Keywords are matched case-insensitively. Lines that match no keyword are
/// returned as [`InboundFrame::Unknown`] rather than failing so newer server
/// frames do not break older clients.
///
/// # Errors
///
/// Returns [`WireError::Protocol`] for a `MSG` line with the wrong number of
/// fields or a non-numeric byte count.
pub fn decode_line(line: &[u8]) -> Result<DecodedLine, WireError> {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim_end_matches(['\r', '\n']);
    let (keyword, rest) = trimmed
        .trim_start()
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed.trim_start(), ""));
    if keyword.eq_ignore_ascii_case("MSG") {
        return parse_message_header(trimmed).map(DecodedLine::MessageHeader);
    }

    let argument = rest.trim();
    let frame = if keyword.eq_ignore_ascii_case("PING") {
        InboundFrame::Ping
    } else if keyword.eq_ignore_ascii_case("PONG") {
        InboundFrame::Pong
    } else if keyword.eq_ignore_ascii_case("+OK") {
        InboundFrame::OkAck
    } else if keyword.eq_ignore_ascii_case("-ERR") {
        InboundFrame::ErrAck(argument.trim_matches('\'').to_owned())
    } else if keyword.eq_ignore_ascii_case("INFO") {
        InboundFrame::Info(argument.to_owned())
    } else {
        InboundFrame::Unknown(trimmed.to_owned())
    };
    Ok(DecodedLine::Frame(frame))
}

fn parse_message_header(line: &str) -> Result<MessageHeader, WireError> {
    let fields: Vec<&str> = line.split_ascii_whitespace().collect();
    let (subject, sid, reply_to, size) = match fields.as_slice() {
        [_, subject, sid, size] => (*subject, *sid, None, *size),
        [_, subject, sid, reply, size] => (*subject, *sid, Some(*reply), *size),
        [] | [_] | [_, _] | [_, _, _] => {
            return Err(protocol_error(line, "expected at least 4 fields"));
        }
        _ => return Err(protocol_error(line, "expected at most 5 fields")),
    };
    let payload_len = size
        .parse::<usize>()
        .map_err(|_| protocol_error(line, "byte count is not a number"))?;
    Ok(MessageHeader {
        subject: subject.to_owned(),
        sid: SubscriptionId::from(sid),
        reply_to: reply_to.map(str::to_owned),
        payload_len,
    })
}

fn protocol_error(line: &str, reason: &'static str) -> WireError {
    WireError::Protocol {
        keyword: "MSG",
        reason,
        line: line.to_owned(),
    }
}
