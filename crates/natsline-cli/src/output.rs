//! Rendering of delivered messages.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use natsline::{Message, MessageHandler};
use tracing::warn;

const OUTPUT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::output");

/// Writer shared between the CLI runtime and message workers.
pub(crate) struct SharedWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for SharedWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> SharedWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Writes `text` followed by a newline as one unit.
    pub(crate) fn line(&self, text: &str) -> io::Result<()> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(guard, "{text}")?;
        guard.flush()
    }
}

/// Handler that prints each delivery as a framed block.
pub(crate) struct MessagePrinter<W> {
    out: SharedWriter<W>,
}

impl<W> MessagePrinter<W> {
    pub(crate) const fn new(out: SharedWriter<W>) -> Self {
        Self { out }
    }
}

impl<W: Write + Send + 'static> MessageHandler for MessagePrinter<W> {
    fn on_message(&self, message: &Message) {
        if let Err(error) = self.out.line(&render(message)) {
            warn!(target: OUTPUT_TARGET, %error, "failed to print message");
        }
    }
}

/// Header line with the routing details, then the payload.
pub(crate) fn render(message: &Message) -> String {
    let reply = message
        .reply_to
        .as_deref()
        .map(|subject| format!(" reply={subject}"))
        .unwrap_or_default();
    format!(
        "[#{sid}] {subject}{reply} ({bytes} bytes)\n{payload}",
        sid = message.sid,
        subject = message.subject,
        bytes = message.payload.len(),
        payload = message.payload_lossy(),
    )
}
