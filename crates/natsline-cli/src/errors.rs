//! Error type reported by the CLI runtime.

use std::io;

use natsline::ClientError;
use natsline_config::ConfigError;
use thiserror::Error;

use crate::shutdown::ShutdownError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("broker closed the connection")]
    ConnectionClosed,
    #[error("no PONG received within {seconds}s")]
    PongTimeout { seconds: u64 },
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}
