//! Serialisation of client commands into wire bytes.
//!
//! Every function returns the complete frame, terminator included, so callers
//! can hand the buffer to a single `write_all`.

use crate::{CRLF, ConnectOptions, SubscriptionId, TokenKind, WireError};

/// Literal keep-alive probe.
pub const PING: &[u8] = b"PING\r\n";
/// Literal keep-alive reply.
pub const PONG: &[u8] = b"PONG\r\n";

/// Checks that `value` can be placed on the wire as a single token.
///
/// # Errors
///
/// Returns [`WireError::InvalidToken`] when `value` is empty or contains
/// whitespace.
pub fn validate_token(kind: TokenKind, value: &str) -> Result<(), WireError> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(WireError::InvalidToken {
            kind,
            value: value.to_owned(),
        });
    }
    Ok(())
}

/// Encodes `CONNECT {json-options}`.
///
/// # Errors
///
/// Returns [`WireError::Json`] if the options cannot be serialised.
pub fn encode_connect(options: &ConnectOptions) -> Result<Vec<u8>, WireError> {
    let json = serde_json::to_vec(options).map_err(WireError::Json)?;
    let mut frame = Vec::with_capacity(json.len().saturating_add(10));
    frame.extend_from_slice(b"CONNECT ");
    frame.extend_from_slice(&json);
    frame.extend_from_slice(CRLF);
    Ok(frame)
}

/// Encodes `PUB <subject>[ <reply-to>] <len>` followed by the payload.
///
/// The declared length counts bytes, so payloads may contain CR/LF or
/// non-UTF-8 data.
///
/// # Errors
///
/// Returns [`WireError::InvalidToken`] for an empty or whitespace-bearing
/// subject or reply-to.
pub fn encode_publish(
    subject: &str,
    reply_to: Option<&str>,
    payload: &[u8],
) -> Result<Vec<u8>, WireError> {
    validate_token(TokenKind::Subject, subject)?;
    let header = match reply_to {
        Some(reply) => {
            validate_token(TokenKind::ReplyTo, reply)?;
            format!("PUB {subject} {reply} {}\r\n", payload.len())
        }
        None => format!("PUB {subject} {}\r\n", payload.len()),
    };
    let mut frame = Vec::with_capacity(header.len() + payload.len() + CRLF.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(CRLF);
    Ok(frame)
}

/// Encodes `SUB <subject>[ <group>] <sid>`.
///
/// # Errors
///
/// Returns [`WireError::InvalidToken`] when any token is empty or contains
/// whitespace.
pub fn encode_subscribe(
    subject: &str,
    group: Option<&str>,
    sid: &SubscriptionId,
) -> Result<Vec<u8>, WireError> {
    validate_token(TokenKind::Subject, subject)?;
    validate_token(TokenKind::SubscriptionId, sid.as_str())?;
    let line = match group {
        Some(queue) => {
            validate_token(TokenKind::QueueGroup, queue)?;
            format!("SUB {subject} {queue} {sid}\r\n")
        }
        None => format!("SUB {subject} {sid}\r\n"),
    };
    Ok(line.into_bytes())
}

/// Encodes `UNSUB <sid>[ <max-msgs>]`.
///
/// # Errors
///
/// Returns [`WireError::InvalidToken`] when the sid is not a valid token.
pub fn encode_unsubscribe(
    sid: &SubscriptionId,
    max_msgs: Option<u64>,
) -> Result<Vec<u8>, WireError> {
    validate_token(TokenKind::SubscriptionId, sid.as_str())?;
    let line = match max_msgs {
        Some(max) => format!("UNSUB {sid} {max}\r\n"),
        None => format!("UNSUB {sid}\r\n"),
    };
    Ok(line.into_bytes())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn publish_matches_reference_frame() {
        let frame = encode_publish("foo.bar", None, b"hi").expect("encode publish");
        assert_eq!(frame, b"PUB foo.bar 2\r\nhi\r\n");
    }

    #[test]
    fn publish_includes_reply_subject() {
        let frame = encode_publish("foo", Some("_INBOX.1"), b"").expect("encode publish");
        assert_eq!(frame, b"PUB foo _INBOX.1 0\r\n\r\n");
    }

    #[test]
    fn publish_length_counts_bytes() {
        let payload = "héllo".as_bytes();
        let frame = encode_publish("greet", None, payload).expect("encode publish");
        assert!(frame.starts_with(b"PUB greet 6\r\n"));
    }

    #[rstest]
    #[case("")]
    #[case("foo bar")]
    #[case("foo\tbar")]
    #[case("foo\r\n")]
    fn publish_rejects_bad_subjects(#[case] subject: &str) {
        let error = encode_publish(subject, None, b"x").expect_err("subject must be rejected");
        assert!(matches!(
            error,
            WireError::InvalidToken {
                kind: TokenKind::Subject,
                ..
            }
        ));
    }

    #[rstest]
    #[case(None, "SUB foo abc\r\n")]
    #[case(Some("workers"), "SUB foo workers abc\r\n")]
    fn subscribe_frames(#[case] group: Option<&str>, #[case] expected: &str) {
        let sid = SubscriptionId::from("abc");
        let frame = encode_subscribe("foo", group, &sid).expect("encode subscribe");
        assert_eq!(frame, expected.as_bytes());
    }

    #[rstest]
    #[case(None, "UNSUB abc\r\n")]
    #[case(Some(5), "UNSUB abc 5\r\n")]
    fn unsubscribe_frames(#[case] max_msgs: Option<u64>, #[case] expected: &str) {
        let sid = SubscriptionId::from("abc");
        let frame = encode_unsubscribe(&sid, max_msgs).expect("encode unsubscribe");
        assert_eq!(frame, expected.as_bytes());
    }

    #[test]
    fn connect_embeds_json_options() {
        let options = ConnectOptions {
            verbose: true,
            ..ConnectOptions::default()
        };
        let frame = encode_connect(&options).expect("encode connect");
        let text = String::from_utf8(frame).expect("connect is utf-8");
        let json = text
            .strip_prefix("CONNECT ")
            .and_then(|rest| rest.strip_suffix("\r\n"))
            .expect("connect framing");
        let decoded: ConnectOptions = serde_json::from_str(json).expect("decode options");
        assert_eq!(decoded, options);
    }
}
