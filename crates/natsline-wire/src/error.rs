//! Errors raised while encoding or decoding protocol frames.

use std::fmt;
use std::io;

use thiserror::Error;

/// Identifies which protocol token failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Subject a message is published or subscribed under.
    Subject,
    /// Inbox subject replies should be sent to.
    ReplyTo,
    /// Queue group shared by load-balanced subscribers.
    QueueGroup,
    /// Client-assigned subscription identifier.
    SubscriptionId,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Subject => "subject",
            Self::ReplyTo => "reply-to subject",
            Self::QueueGroup => "queue group",
            Self::SubscriptionId => "subscription id",
        };
        formatter.write_str(label)
    }
}

/// Failures surfaced by the codec and the frame reader.
#[derive(Debug, Error)]
pub enum WireError {
    /// A token destined for the wire was empty or contained whitespace.
    #[error("invalid {kind} {value:?}: must be non-empty and contain no whitespace")]
    InvalidToken {
        /// Which token was rejected.
        kind: TokenKind,
        /// The rejected value.
        value: String,
    },
    /// The CONNECT options could not be serialised.
    #[error("failed to serialise CONNECT options: {0}")]
    Json(#[source] serde_json::Error),
    /// An inbound frame did not match the protocol grammar.
    #[error("malformed {keyword} frame ({reason}): {line:?}")]
    Protocol {
        /// Keyword of the offending frame.
        keyword: &'static str,
        /// Short description of the violation.
        reason: &'static str,
        /// The raw line as received.
        line: String,
    },
    /// The connection closed before a `MSG` payload was complete.
    #[error("connection closed mid-frame after {received} of {expected} payload bytes")]
    TruncatedFrame {
        /// Payload bytes (including the terminator) the header declared.
        expected: usize,
        /// Bytes that actually arrived.
        received: usize,
    },
    /// The connection closed part way through a protocol line.
    #[error("connection closed after {received} bytes of an unterminated line")]
    TruncatedLine {
        /// Bytes of the partial line.
        received: usize,
    },
    /// A `MSG` header declared more payload than the broker's announced
    /// limit. The payload is not read, so the stream cannot be resynchronised.
    #[error("MSG declares {declared} payload bytes, above the {limit} byte limit")]
    PayloadTooLarge {
        /// Byte count from the header.
        declared: usize,
        /// Limit in force.
        limit: usize,
    },
    /// The underlying stream failed.
    #[error("stream error: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// Returns `true` when the error concerns a single malformed frame and the
    /// stream remains usable.
    #[must_use]
    pub const fn is_frame_local(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}
