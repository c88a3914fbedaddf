//! Public client facade.
//!
//! [`Client`] owns the connection, the subscription registry and the
//! outstanding worker set. Every I/O operation goes through `&mut self`, so
//! the socket is only ever touched by the thread driving the client; message
//! handlers run on their own workers and never see it.

mod dispatch;
mod handshake;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use natsline_config::ClientConfig;
use natsline_wire::{
    PING, PONG, ServerInfo, SubscriptionId, encode_publish, encode_subscribe, encode_unsubscribe,
};

pub use self::dispatch::{Progress, WaitExit};
use crate::connection::Connection;
use crate::registry::SubscriptionRegistry;
use crate::workers::WorkerTracker;
use crate::{ClientError, ClientObserver, ConnectionState, MessageHandler, TracingObserver, sid};

/// Cloneable handle that asks a running [`Client::wait`] loop to return.
///
/// The request is cooperative: the loop notices it before its next read, so a
/// blocked read delays the exit by at most the configured timeout.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests that the read loop return.
    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Returns `true` while a stop request is pending.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

/// Blocking client for a line-oriented publish/subscribe broker.
///
/// # Examples
///
/// ```no_run
/// use natsline::{Client, ClientConfig, Message};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::builder().build()?;
/// let mut client = Client::new(config, |message: &Message| {
///     let _ = message.payload.len();
/// });
/// client.connect()?;
/// client.subscribe("orders.created", None, None)?;
/// client.publish("orders.created", "hello", None)?;
/// client.finish();
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: ClientConfig,
    handler: Arc<dyn MessageHandler>,
    handlers: HashMap<SubscriptionId, Arc<dyn MessageHandler>>,
    observer: Arc<dyn ClientObserver>,
    connection: Option<Connection>,
    state: ConnectionState,
    server_info: ServerInfo,
    registry: SubscriptionRegistry,
    workers: WorkerTracker,
    stop: StopHandle,
}

impl Client {
    /// Builds a disconnected client that routes every delivery to `handler`
    /// unless a subscription registers its own.
    pub fn new<H>(config: ClientConfig, handler: H) -> Self
    where
        H: MessageHandler,
    {
        Self {
            config,
            handler: Arc::new(handler),
            handlers: HashMap::new(),
            observer: Arc::new(TracingObserver),
            connection: None,
            state: ConnectionState::Disconnected,
            server_info: ServerInfo::default(),
            registry: SubscriptionRegistry::new(),
            workers: WorkerTracker::new(),
            stop: StopHandle::default(),
        }
    }

    /// Builds a client and connects it.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Client::connect`].
    pub fn connect_with<H>(config: ClientConfig, handler: H) -> Result<Self, ClientError>
    where
        H: MessageHandler,
    {
        let mut client = Self::new(config, handler);
        client.connect()?;
        Ok(client)
    }

    /// Replaces the observability sink.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ClientObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` when commands can be sent.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Document announced by the broker; empty when none could be decoded.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Registered subscriptions.
    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Number of message workers that have not been reaped yet.
    #[must_use]
    pub fn outstanding_workers(&self) -> usize {
        self.workers.outstanding()
    }

    /// Handle that can stop [`Client::wait`] from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Requests that [`Client::wait`] return at its next poll boundary.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Sets the connect/read timeout in whole seconds. Non-positive values
    /// fall back to five seconds. A live socket picks the change up
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Socket`] if the live socket rejects the new
    /// timeout.
    pub fn set_timeout(&mut self, seconds: i64) -> Result<(), ClientError> {
        self.config.set_timeout_secs(seconds);
        if let Some(connection) = &self.connection {
            connection
                .set_timeout(self.config.timeout())
                .map_err(ClientError::Socket)?;
        }
        Ok(())
    }

    /// Publishes `payload` under `subject`, optionally naming a reply subject.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] without a ready connection,
    /// [`ClientError::Encode`] for an invalid subject, [`ClientError::Send`]
    /// when the write fails, and [`ClientError::CommandRejected`] when a
    /// verbose broker does not acknowledge.
    pub fn publish(
        &mut self,
        subject: &str,
        payload: impl AsRef<[u8]>,
        reply_to: Option<&str>,
    ) -> Result<(), ClientError> {
        let frame = encode_publish(subject, reply_to, payload.as_ref())?;
        self.send_command(&frame)
    }

    /// Subscribes to `subject`, generating an id when `sid` is `None`.
    ///
    /// The subscription is registered only after the command succeeds.
    ///
    /// # Errors
    ///
    /// As for [`Client::publish`].
    pub fn subscribe(
        &mut self,
        subject: &str,
        group: Option<&str>,
        sid: Option<SubscriptionId>,
    ) -> Result<SubscriptionId, ClientError> {
        self.subscribe_inner(subject, group, sid, None)
    }

    /// Subscribes with a handler dedicated to this subscription.
    ///
    /// # Errors
    ///
    /// As for [`Client::publish`].
    pub fn subscribe_with<H>(
        &mut self,
        subject: &str,
        group: Option<&str>,
        sid: Option<SubscriptionId>,
        handler: H,
    ) -> Result<SubscriptionId, ClientError>
    where
        H: MessageHandler,
    {
        self.subscribe_inner(subject, group, sid, Some(Arc::new(handler)))
    }

    fn subscribe_inner(
        &mut self,
        subject: &str,
        group: Option<&str>,
        requested: Option<SubscriptionId>,
        handler: Option<Arc<dyn MessageHandler>>,
    ) -> Result<SubscriptionId, ClientError> {
        let sid = requested.unwrap_or_else(sid::generate);
        let frame = encode_subscribe(subject, group, &sid)?;
        // Deliveries may race the +OK in verbose mode, so the handler must be
        // in place before the command is sent.
        if let Some(dedicated) = handler {
            self.handlers.insert(sid.clone(), dedicated);
        }
        if let Err(error) = self.send_command(&frame) {
            self.handlers.remove(&sid);
            return Err(error);
        }
        self.registry.add(subject, sid.clone());
        Ok(sid)
    }

    /// Sends `UNSUB`, optionally letting the broker deliver `max_msgs` more
    /// messages first.
    ///
    /// An immediate unsubscribe also removes the local registration. With
    /// `max_msgs` the registration and handler are kept so the remaining
    /// deliveries are still routed; [`Client::finish`] reconciles them.
    ///
    /// # Errors
    ///
    /// As for [`Client::publish`].
    pub fn unsubscribe(
        &mut self,
        sid: &SubscriptionId,
        max_msgs: Option<u64>,
    ) -> Result<(), ClientError> {
        let frame = encode_unsubscribe(sid, max_msgs)?;
        self.send_command(&frame)?;
        if max_msgs.is_none() {
            self.forget(sid);
        }
        Ok(())
    }

    /// Sends a raw `PING`. Replies are not correlated.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] or [`ClientError::Send`].
    pub fn ping(&mut self) -> Result<(), ClientError> {
        self.ensure_ready()?;
        self.write_frame(PING)
    }

    /// Sends a raw `PONG`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] or [`ClientError::Send`].
    pub fn pong(&mut self) -> Result<(), ClientError> {
        self.ensure_ready()?;
        self.write_frame(PONG)
    }

    /// Graceful teardown: waits for every outstanding worker, unsubscribes
    /// every registered subscription, then releases the socket.
    ///
    /// Worker draining is unbounded. Messages read while waiting for verbose
    /// `UNSUB` acknowledgements are still dispatched, and their workers are
    /// drained before the socket is released, so no handler outlives this
    /// call. Failures while unsubscribing are reported to the observer and do
    /// not stop the teardown. Calling this on a disconnected client only
    /// drains workers.
    pub fn finish(&mut self) {
        if self.connection.is_some() {
            self.transition(ConnectionState::Closing);
        }
        self.drain_workers();
        for (_subject, sid) in self.registry.all_ids() {
            if self.connection.is_none() {
                break;
            }
            if let Err(error) = self.release_subscription(&sid) {
                self.observer.error_absorbed(&error);
            }
            self.forget(&sid);
        }
        self.registry.clear();
        self.handlers.clear();
        self.drain_workers();
        self.close();
    }

    /// Releases the socket without draining workers or unsubscribing.
    /// Closing a disconnected client does nothing.
    pub fn close(&mut self) {
        let Some(connection) = self.connection.take() else {
            self.transition(ConnectionState::Disconnected);
            return;
        };
        self.transition(ConnectionState::Closing);
        if let Err(error) = connection.shutdown() {
            self.observer.error_absorbed(&ClientError::Socket(error));
        }
        self.transition(ConnectionState::Disconnected);
    }

    fn drain_workers(&mut self) {
        for exit in self.workers.drain() {
            self.observer.worker_finished(exit);
        }
    }

    fn release_subscription(&mut self, sid: &SubscriptionId) -> Result<(), ClientError> {
        let frame = encode_unsubscribe(sid, None)?;
        self.write_frame(&frame)?;
        if self.config.verbose() {
            self.expect_ack(|reason| ClientError::CommandRejected { reason })?;
        }
        Ok(())
    }

    fn forget(&mut self, sid: &SubscriptionId) {
        self.registry.remove(sid);
        self.handlers.remove(sid);
    }

    fn ensure_ready(&self) -> Result<(), ClientError> {
        if self.state == ConnectionState::Ready && self.connection.is_some() {
            return Ok(());
        }
        Err(ClientError::NotConnected { state: self.state })
    }

    /// Writes a command and, in verbose mode, waits for its acknowledgement.
    fn send_command(&mut self, frame: &[u8]) -> Result<(), ClientError> {
        self.ensure_ready()?;
        self.write_frame(frame)?;
        if self.config.verbose() {
            self.expect_ack(|reason| ClientError::CommandRejected { reason })?;
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), ClientError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ClientError::NotConnected { state: self.state });
        };
        match connection.send(frame) {
            Ok(()) => {
                self.observer.command_sent(frame);
                Ok(())
            }
            Err(error) => {
                self.drop_connection();
                Err(ClientError::Send(error))
            }
        }
    }

    /// Forgets a failed socket without attempting a reconnect.
    fn drop_connection(&mut self) {
        self.connection = None;
        self.transition(ConnectionState::Disconnected);
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            let previous = std::mem::replace(&mut self.state, next);
            self.observer.state_changed(previous, next);
        }
    }
}
