//! Shared fixtures for the client test suites.

mod recorder;
mod world;

use std::time::Duration;

use natsline_config::{ClientConfig, ServerEndpoint};

use crate::Client;
use crate::test_support::{BrokerScript, FakeBroker};

pub use recorder::{ObservedEvent, RecordingHandler, RecordingObserver};
pub use world::{ClientWorld, world};

/// Read timeout used against the fake broker so timeouts surface quickly.
pub const SHORT_TIMEOUT: Duration = Duration::from_millis(200);

/// How long assertions poll for asynchronous effects.
pub const SETTLE: Duration = Duration::from_secs(2);

/// Configuration pointing at a fake broker on `port`.
pub fn config_for(port: u16, verbose: bool) -> ClientConfig {
    ClientConfig::builder()
        .endpoint(ServerEndpoint::new("127.0.0.1", port))
        .timeout(SHORT_TIMEOUT)
        .verbose(verbose)
        .build()
        .expect("test configuration is valid")
}

/// Fake broker plus a client connected to it.
pub struct Harness {
    pub broker: FakeBroker,
    pub client: Client,
    pub handler: RecordingHandler,
}

/// Spawns a broker running `script` and connects a client to it.
pub fn connected(script: BrokerScript, verbose: bool) -> Harness {
    let broker = FakeBroker::spawn(script).expect("spawn fake broker");
    let handler = RecordingHandler::default();
    let mut client = Client::new(config_for(broker.port(), verbose), handler.clone());
    client.connect().expect("connect to fake broker");
    Harness {
        broker,
        client,
        handler,
    }
}
