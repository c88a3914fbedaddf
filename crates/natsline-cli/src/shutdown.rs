//! Termination signal handling for long-running subscriptions.

use std::io;
use std::thread::{self, JoinHandle};

use natsline::StopHandle;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::info;

const SHUTDOWN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shutdown");

/// Errors reported while arming the signal watcher.
#[derive(Debug, Error)]
pub(crate) enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        #[source]
        source: io::Error,
    },
}

/// Background thread that turns the first termination signal into a stop
/// request. Dropping the watcher disarms it.
pub(crate) struct SignalWatcher {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalWatcher {
    pub(crate) fn spawn(stop: StopHandle) -> Result<Self, ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name(String::from("natsline-signals"))
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    info!(target: SHUTDOWN_TARGET, signal, "shutdown signal received");
                    stop.stop();
                }
            })
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            drop(thread.join());
        }
    }
}
