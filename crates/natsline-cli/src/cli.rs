//! Command-line argument definitions for the `natsline` binary.

use clap::{Args, Parser, Subcommand};
use natsline::{ClientConfig, ServerEndpoint};
use natsline_config::{ConfigError, DEFAULT_LOG_FILTER, LogFormat, normalise_timeout_secs};

/// Publish, subscribe and probe a line-protocol message broker.
#[derive(Parser, Debug)]
#[command(name = "natsline", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) connection: ConnectionArgs,
    /// Tracing filter directives, for example `natsline=debug`.
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILTER)]
    pub(crate) log_filter: String,
    /// Log output format.
    #[arg(long, global = true, default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Flags that shape the broker connection.
#[derive(Args, Debug, Clone)]
pub(crate) struct ConnectionArgs {
    /// Broker address as `nats://host:port`, `tcp://host:port` or `host[:port]`.
    #[arg(long, short = 's', global = true, default_value = "nats://localhost:4222")]
    pub(crate) server: ServerEndpoint,
    /// Connect and read timeout in seconds; non-positive values mean five.
    #[arg(long, global = true, default_value_t = 3, allow_negative_numbers = true)]
    pub(crate) timeout: i64,
    /// Ask the broker to acknowledge every command.
    #[arg(long, global = true)]
    pub(crate) verbose: bool,
    /// Ask the broker for strict subject checking.
    #[arg(long, global = true)]
    pub(crate) pedantic: bool,
    /// Client name reported to the broker.
    #[arg(long, global = true, default_value = "natsline")]
    pub(crate) name: String,
    /// Opaque authentication token.
    #[arg(long, global = true, conflicts_with = "user")]
    pub(crate) auth_token: Option<String>,
    /// User name; requires `--pass`.
    #[arg(long, global = true, requires = "pass")]
    pub(crate) user: Option<String>,
    /// Password for `--user`.
    #[arg(long, global = true, requires = "user")]
    pub(crate) pass: Option<String>,
}

impl ConnectionArgs {
    /// Builds the validated client configuration.
    pub(crate) fn to_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut builder = ClientConfig::builder()
            .endpoint(self.server.clone())
            .timeout(normalise_timeout_secs(self.timeout))
            .verbose(self.verbose)
            .pedantic(self.pedantic)
            .name(self.name.clone());
        if let Some(token) = &self.auth_token {
            builder = builder.auth_token(token.clone());
        }
        if let (Some(user), Some(pass)) = (&self.user, &self.pass) {
            builder = builder.credentials(user.clone(), pass.clone());
        }
        builder.build()
    }
}

/// Session subcommands.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Subscribes and prints every delivery until interrupted.
    Sub {
        /// Subject or wildcard pattern.
        subject: String,
        /// Queue group to join.
        #[arg(long)]
        group: Option<String>,
        /// Subscription id to use instead of a generated one.
        #[arg(long)]
        sid: Option<String>,
    },
    /// Publishes one message.
    Pub {
        /// Destination subject.
        subject: String,
        /// Message body.
        message: String,
        /// Subject replies should be sent to.
        #[arg(long)]
        reply_to: Option<String>,
    },
    /// Sends `PING` and waits for the broker's `PONG`.
    Ping,
}
