//! Stderr log sink for CLI sessions.
//!
//! Message blocks own stdout, so every tracing event is written to stderr.
//! Colour is enabled only when stderr is a terminal.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::{self, time::UtcTime};

use natsline_config::LogFormat;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Failures while installing the log sink.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TelemetryError {
    /// `--log-filter` is not a valid directive list.
    #[error("invalid log filter '{directives}': {source}")]
    Filter {
        /// Directives as given on the command line.
        directives: String,
        /// Parser complaint.
        #[source]
        source: ParseError,
    },
    /// Another global subscriber is already in place.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] SetGlobalDefaultError),
}

/// Installs the stderr subscriber once per process.
pub(crate) fn initialise(directives: &str, format: LogFormat) -> Result<(), TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(directives, format))
        .map(|_| ())
}

fn parse_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|source| TelemetryError::Filter {
        directives: directives.to_owned(),
        source,
    })
}

fn install(directives: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(parse_filter(directives)?)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339())
        .with_thread_names(true);
    let outcome = match format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().flatten_event(true).finish())
        }
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.compact().finish()),
    };
    outcome.map_err(TelemetryError::Subscriber)
}
