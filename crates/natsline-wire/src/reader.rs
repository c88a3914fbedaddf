//! Blocking frame reader over a buffered byte stream.

use std::io::{self, BufRead, Read};

use crate::{CRLF, DecodedLine, InboundFrame, MessageHeader, WireError, decode_line};

/// Largest buffer reserved up front for a declared payload. Larger payloads
/// grow the buffer as bytes arrive so a bogus byte count cannot force a huge
/// allocation.
const MAX_PREALLOCATED_PAYLOAD: usize = 64 * 1024;

/// Outcome of a single [`FrameReader::read_frame`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete frame arrived.
    Frame(InboundFrame),
    /// The read timeout elapsed before a frame completed. Partial data is kept
    /// and the next call resumes the same frame.
    Timeout,
    /// The peer closed the stream cleanly between frames.
    Closed,
}

struct PendingPayload {
    header: MessageHeader,
    line: String,
    body: Vec<u8>,
}

/// Reads whole protocol frames from a blocking [`BufRead`] source.
///
/// A `MSG` header triggers a follow-up read of exactly the declared number of
/// payload bytes plus the two-byte terminator, which must be CRLF. Read
/// timeouts configured on the underlying socket surface as
/// [`ReadOutcome::Timeout`] instead of errors.
pub struct FrameReader<R> {
    inner: R,
    line: Vec<u8>,
    pending: Option<PendingPayload>,
    max_payload: Option<usize>,
}

enum LineRead {
    Complete,
    Timeout,
    Closed,
}

impl<R: BufRead> FrameReader<R> {
    /// Wraps a buffered source.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            line: Vec::new(),
            pending: None,
            max_payload: None,
        }
    }

    /// Caps the byte count a `MSG` header may declare. `None` lifts the cap.
    pub const fn set_max_payload(&mut self, limit: Option<usize>) {
        self.max_payload = limit;
    }

    /// Borrows the underlying source.
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Returns `true` while a frame is partially buffered.
    pub fn has_partial_frame(&self) -> bool {
        !self.line.is_empty() || self.pending.is_some()
    }

    /// Reads the next complete frame.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Protocol`] for a malformed `MSG` header or a
    /// payload not followed by CRLF (the frame is consumed so the caller may
    /// keep reading), [`WireError::PayloadTooLarge`] when a header declares
    /// more than the configured cap, [`WireError::TruncatedFrame`] or
    /// [`WireError::TruncatedLine`] when the stream ends mid-frame, and
    /// [`WireError::Io`] for other stream failures.
    pub fn read_frame(&mut self) -> Result<ReadOutcome, WireError> {
        if self.pending.is_none() {
            match self.read_line()? {
                LineRead::Complete => {}
                LineRead::Timeout => return Ok(ReadOutcome::Timeout),
                LineRead::Closed => return Ok(ReadOutcome::Closed),
            }
            let line = std::mem::take(&mut self.line);
            match decode_line(&line)? {
                DecodedLine::Frame(frame) => return Ok(ReadOutcome::Frame(frame)),
                DecodedLine::MessageHeader(header) => {
                    let cap = self.max_payload;
                    if let Some(limit) = cap.filter(|limit| header.payload_len > *limit) {
                        return Err(WireError::PayloadTooLarge {
                            declared: header.payload_len,
                            limit,
                        });
                    }
                    let capacity = header
                        .payload_len
                        .saturating_add(CRLF.len())
                        .min(MAX_PREALLOCATED_PAYLOAD);
                    self.pending = Some(PendingPayload {
                        header,
                        line: String::from_utf8_lossy(&line).trim_end().to_owned(),
                        body: Vec::with_capacity(capacity),
                    });
                }
            }
        }
        self.read_payload()
    }

    fn read_line(&mut self) -> Result<LineRead, WireError> {
        loop {
            match self.inner.read_until(b'\n', &mut self.line) {
                Ok(_) if self.line.ends_with(b"\n") => return Ok(LineRead::Complete),
                Ok(_) if self.line.is_empty() => return Ok(LineRead::Closed),
                Ok(_) => {
                    let received = std::mem::take(&mut self.line).len();
                    return Err(WireError::TruncatedLine { received });
                }
                Err(error) if is_timeout(&error) => return Ok(LineRead::Timeout),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    self.line.clear();
                    return Err(WireError::Io(error));
                }
            }
        }
    }

    fn read_payload(&mut self) -> Result<ReadOutcome, WireError> {
        let Self { inner, pending, .. } = self;
        let Some(partial) = pending.as_mut() else {
            return Ok(ReadOutcome::Timeout);
        };
        let expected = partial.header.payload_len.saturating_add(CRLF.len());
        while partial.body.len() < expected {
            let remaining = expected.saturating_sub(partial.body.len());
            let limit = u64::try_from(remaining).unwrap_or(u64::MAX);
            match inner.by_ref().take(limit).read_to_end(&mut partial.body) {
                Ok(0) => {
                    let received = partial.body.len();
                    *pending = None;
                    return Err(WireError::TruncatedFrame { expected, received });
                }
                Ok(_) => {}
                Err(error) if is_timeout(&error) => return Ok(ReadOutcome::Timeout),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    *pending = None;
                    return Err(WireError::Io(error));
                }
            }
        }

        let Some(PendingPayload {
            header,
            line,
            mut body,
        }) = pending.take()
        else {
            return Ok(ReadOutcome::Timeout);
        };
        if body.get(header.payload_len..) != Some(CRLF) {
            return Err(WireError::Protocol {
                keyword: "MSG",
                reason: "payload not terminated by CRLF",
                line,
            });
        }
        body.truncate(header.payload_len);
        Ok(ReadOutcome::Frame(InboundFrame::Message(
            header.into_message(body),
        )))
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{BufReader, Cursor};

    use rstest::rstest;

    use super::*;
    use crate::{Message, SubscriptionId};

    fn reader(bytes: &[u8]) -> FrameReader<Cursor<Vec<u8>>> {
        FrameReader::new(Cursor::new(bytes.to_vec()))
    }

    /// Source that yields scripted chunks and reports a timeout between them.
    struct StutteringSource {
        chunks: VecDeque<Option<Vec<u8>>>,
    }

    impl Read for StutteringSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Some(chunk)) => {
                    let len = chunk.len().min(buf.len());
                    let (head, tail) = chunk.split_at(len);
                    buf.get_mut(..len)
                        .expect("buffer holds chunk")
                        .copy_from_slice(head);
                    if !tail.is_empty() {
                        self.chunks.push_front(Some(tail.to_vec()));
                    }
                    Ok(len)
                }
                Some(None) => Err(io::Error::new(io::ErrorKind::WouldBlock, "timed out")),
                None => Ok(0),
            }
        }
    }

    fn stuttering(chunks: &[Option<&[u8]>]) -> FrameReader<BufReader<StutteringSource>> {
        let source = StutteringSource {
            chunks: chunks.iter().map(|chunk| chunk.map(<[u8]>::to_vec)).collect(),
        };
        FrameReader::new(BufReader::new(source))
    }

    #[test]
    fn reads_control_frames_in_order() {
        let mut frames = reader(b"PING\r\nPONG\r\n+OK\r\n");
        assert_eq!(
            frames.read_frame().expect("ping"),
            ReadOutcome::Frame(InboundFrame::Ping)
        );
        assert_eq!(
            frames.read_frame().expect("pong"),
            ReadOutcome::Frame(InboundFrame::Pong)
        );
        assert_eq!(
            frames.read_frame().expect("ok"),
            ReadOutcome::Frame(InboundFrame::OkAck)
        );
        assert_eq!(frames.read_frame().expect("eof"), ReadOutcome::Closed);
    }

    #[rstest]
    #[case(b"MSG foo 1 5\r\nhello\r\n".as_slice(), None, b"hello".as_slice())]
    #[case(b"MSG foo 1 _INBOX.2 4\r\na\r\nb\r\n".as_slice(), Some("_INBOX.2"), b"a\r\nb".as_slice())]
    #[case(b"MSG foo 1 0\r\n\r\n".as_slice(), None, b"".as_slice())]
    fn reads_message_payloads(
        #[case] wire: &[u8],
        #[case] reply_to: Option<&str>,
        #[case] payload: &[u8],
    ) {
        let mut frames = reader(wire);
        let outcome = frames.read_frame().expect("message");
        assert_eq!(
            outcome,
            ReadOutcome::Frame(InboundFrame::Message(Message {
                subject: String::from("foo"),
                sid: SubscriptionId::from("1"),
                reply_to: reply_to.map(str::to_owned),
                payload: payload.to_vec(),
            }))
        );
        assert_eq!(frames.read_frame().expect("eof"), ReadOutcome::Closed);
    }

    #[test]
    fn message_followed_by_control_frame() {
        let mut frames = reader(b"MSG a 1 2\r\nhi\r\nPING\r\n");
        assert!(matches!(
            frames.read_frame().expect("message"),
            ReadOutcome::Frame(InboundFrame::Message(_))
        ));
        assert_eq!(
            frames.read_frame().expect("ping"),
            ReadOutcome::Frame(InboundFrame::Ping)
        );
    }

    #[test]
    fn short_payload_is_truncated_frame() {
        let mut frames = reader(b"MSG foo 1 10\r\nabc");
        let error = frames.read_frame().expect_err("payload is short");
        assert!(matches!(
            error,
            WireError::TruncatedFrame {
                expected: 12,
                received: 3
            }
        ));
        assert!(!frames.has_partial_frame());
    }

    #[test]
    fn unterminated_line_is_truncated() {
        let mut frames = reader(b"PIN");
        let error = frames.read_frame().expect_err("line is incomplete");
        assert!(matches!(error, WireError::TruncatedLine { received: 3 }));
    }

    #[test]
    fn malformed_header_does_not_poison_stream() {
        let mut frames = reader(b"MSG foo 1\r\nPING\r\n");
        let error = frames.read_frame().expect_err("header is malformed");
        assert!(error.is_frame_local());
        assert_eq!(
            frames.read_frame().expect("ping"),
            ReadOutcome::Frame(InboundFrame::Ping)
        );
    }

    #[test]
    fn miscounted_payload_is_rejected() {
        let mut frames = reader(b"MSG foo 1 3\r\nhello\r\nPING\r\n");
        let error = frames.read_frame().expect_err("payload overruns its count");
        assert!(
            matches!(&error, WireError::Protocol { keyword: "MSG", line, .. } if line == "MSG foo 1 3"),
            "got {error:?}"
        );
        assert!(error.is_frame_local());
        assert!(!frames.has_partial_frame());
    }

    #[test]
    fn declared_size_above_cap_is_refused() {
        let mut frames = reader(b"MSG foo 1 2048\r\n");
        frames.set_max_payload(Some(1024));
        let error = frames.read_frame().expect_err("payload exceeds cap");
        assert!(matches!(
            error,
            WireError::PayloadTooLarge {
                declared: 2048,
                limit: 1024
            }
        ));
        assert!(!error.is_frame_local());
        assert!(!frames.has_partial_frame());
    }

    #[test]
    fn payload_at_cap_is_accepted() {
        let mut frames = reader(b"MSG foo 1 4\r\nfour\r\n");
        frames.set_max_payload(Some(4));
        assert!(matches!(
            frames.read_frame().expect("message"),
            ReadOutcome::Frame(InboundFrame::Message(_))
        ));
    }

    #[test]
    fn timeout_mid_line_resumes() {
        let mut frames = stuttering(&[Some(b"PI"), None, Some(b"NG\r\n")]);
        assert_eq!(frames.read_frame().expect("timeout"), ReadOutcome::Timeout);
        assert!(frames.has_partial_frame());
        assert_eq!(
            frames.read_frame().expect("ping"),
            ReadOutcome::Frame(InboundFrame::Ping)
        );
    }

    #[test]
    fn timeout_mid_payload_resumes() {
        let mut frames = stuttering(&[Some(b"MSG s 7 6\r\nabc"), None, Some(b"def\r\n")]);
        assert_eq!(frames.read_frame().expect("timeout"), ReadOutcome::Timeout);
        let outcome = frames.read_frame().expect("message");
        let ReadOutcome::Frame(InboundFrame::Message(message)) = outcome else {
            panic!("expected message, got {outcome:?}");
        };
        assert_eq!(message.payload, b"abcdef");
        assert_eq!(message.sid.as_str(), "7");
    }

    #[test]
    fn idle_timeout_is_not_closed() {
        let mut frames = stuttering(&[None]);
        assert_eq!(frames.read_frame().expect("timeout"), ReadOutcome::Timeout);
        assert!(!frames.has_partial_frame());
        assert_eq!(frames.read_frame().expect("eof"), ReadOutcome::Closed);
    }
}
