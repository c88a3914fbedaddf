//! Collaborator interface invoked for delivered messages.

use natsline_wire::Message;
use tracing::info;

use crate::CLIENT_TARGET;

/// Receives messages delivered to a subscription.
///
/// Each invocation runs on its own worker thread, so implementations may
/// block without stalling the read loop. Handlers only see the message; they
/// never get access to the connection.
pub trait MessageHandler: Send + Sync + 'static {
    /// Handles one delivered message.
    fn on_message(&self, message: &Message);
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) + Send + Sync + 'static,
{
    fn on_message(&self, message: &Message) {
        self(message);
    }
}

/// Handler that records each delivery as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHandler;

impl MessageHandler for TracingHandler {
    fn on_message(&self, message: &Message) {
        info!(
            target: CLIENT_TARGET,
            subject = %message.subject,
            sid = %message.sid,
            reply_to = message.reply_to.as_deref(),
            bytes = message.payload.len(),
            payload = %message.payload_lossy(),
            "message delivered"
        );
    }
}
