//! Recording doubles for the handler and observer seams.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use natsline_wire::{FrameKind, InboundFrame, Message, ServerInfo, SubscriptionId};

use crate::{ClientError, ClientObserver, ConnectionState, MessageHandler, WorkerExit, WorkerId};

/// Handler that stores every delivered message.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    inner: Arc<(Mutex<Vec<Message>>, Condvar)>,
}

impl RecordingHandler {
    /// Blocks until `count` messages have been delivered or `timeout`
    /// elapses, returning whatever arrived.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Message> {
        let (messages, arrived) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut guard = messages.lock().expect("handler mutex poisoned");
        while guard.len() < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            guard = arrived
                .wait_timeout(guard, remaining)
                .expect("handler mutex poisoned")
                .0;
        }
        guard.clone()
    }
}

impl MessageHandler for RecordingHandler {
    fn on_message(&self, message: &Message) {
        let (messages, arrived) = &*self.inner;
        messages
            .lock()
            .expect("handler mutex poisoned")
            .push(message.clone());
        arrived.notify_all();
    }
}

/// Engine events captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    StateChanged(ConnectionState, ConnectionState),
    ServerAnnounced(Option<String>),
    CommandSent(String),
    FrameReceived(FrameKind),
    WorkerSpawned(SubscriptionId),
    WorkerPanicked(WorkerId),
    WorkerCompleted(WorkerId),
    ErrorAbsorbed(String),
}

/// Observer that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .expect("observer mutex poisoned")
            .clone()
    }

    /// State transitions in the order they happened.
    pub fn transitions(&self) -> Vec<ConnectionState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::StateChanged(_, to) => Some(to),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ObservedEvent) {
        self.events
            .lock()
            .expect("observer mutex poisoned")
            .push(event);
    }
}

impl ClientObserver for RecordingObserver {
    fn state_changed(&self, from: ConnectionState, to: ConnectionState) {
        self.record(ObservedEvent::StateChanged(from, to));
    }

    fn server_announced(&self, info: &ServerInfo) {
        self.record(ObservedEvent::ServerAnnounced(
            info.server_id().map(str::to_owned),
        ));
    }

    fn command_sent(&self, frame: &[u8]) {
        self.record(ObservedEvent::CommandSent(
            String::from_utf8_lossy(frame).into_owned(),
        ));
    }

    fn frame_received(&self, frame: &InboundFrame) {
        self.record(ObservedEvent::FrameReceived(frame.kind()));
    }

    fn worker_spawned(&self, _worker: WorkerId, sid: &SubscriptionId) {
        self.record(ObservedEvent::WorkerSpawned(sid.clone()));
    }

    fn worker_finished(&self, exit: WorkerExit) {
        self.record(match exit {
            WorkerExit::Completed(worker) => ObservedEvent::WorkerCompleted(worker),
            WorkerExit::Panicked(worker) => ObservedEvent::WorkerPanicked(worker),
        });
    }

    fn error_absorbed(&self, error: &ClientError) {
        self.record(ObservedEvent::ErrorAbsorbed(error.to_string()));
    }
}
