//! BDD world: a fake broker, the client under test and the handler it feeds.

use std::cell::RefCell;

use crate::test_support::{BrokerScript, FakeBroker};
use crate::{Client, ClientError, ConnectionState};

use super::{RecordingHandler, SETTLE, config_for};

/// Scenario world shared across BDD steps.
#[derive(Default)]
pub struct ClientWorld {
    broker: Option<FakeBroker>,
    client: Option<Client>,
    pub handler: RecordingHandler,
    connect_error: Option<ClientError>,
}

impl ClientWorld {
    /// Starts the broker the client will talk to.
    pub fn start_broker(&mut self, script: BrokerScript) {
        self.broker = Some(FakeBroker::spawn(script).expect("spawn fake broker"));
    }

    /// Builds a client for the running broker and connects it, keeping any
    /// failure for later steps.
    pub fn connect(&mut self, verbose: bool) {
        let port = self.broker().port();
        let mut client = Client::new(config_for(port, verbose), self.handler.clone());
        self.connect_error = client.connect().err();
        self.client = Some(client);
    }

    pub fn broker(&self) -> &FakeBroker {
        self.broker.as_ref().expect("broker not started")
    }

    pub fn client(&mut self) -> &mut Client {
        self.client.as_mut().expect("client not created")
    }

    pub fn state(&self) -> ConnectionState {
        self.client
            .as_ref()
            .map_or(ConnectionState::Disconnected, Client::state)
    }

    pub const fn connect_error(&self) -> Option<&ClientError> {
        self.connect_error.as_ref()
    }

    /// Commands the broker has seen, waiting briefly for `at_least`.
    pub fn commands(&self, at_least: usize) -> Vec<String> {
        self.broker().wait_for_commands(at_least, SETTLE)
    }
}

/// Fresh world with no broker or client.
#[must_use]
pub fn world() -> RefCell<ClientWorld> {
    RefCell::new(ClientWorld::default())
}
