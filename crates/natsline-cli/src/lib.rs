//! Command-line runtime for the `natsline` client.
//!
//! The runtime parses arguments, installs structured telemetry on stderr and
//! runs one broker session: `pub` publishes a single message, `ping` measures
//! a keep-alive round trip, and `sub` prints deliveries until a termination
//! signal arrives or the broker hangs up. Output streams are injected so the
//! runtime can be exercised in-process by tests.

mod cli;
mod errors;
mod output;
mod shutdown;
mod telemetry;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use natsline::{
    Client, ClientConfig, FrameKind, Progress, SubscriptionId, TracingHandler, WaitExit,
};
use tracing::info;

use cli::{Cli, CliCommand};
use errors::AppError;
use output::{MessagePrinter, SharedWriter};
use shutdown::SignalWatcher;

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Runs the CLI with the given arguments and output streams.
///
/// Message blocks and command results go to `stdout`; errors go to `stderr`.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: W, mut stderr: E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write + Send + 'static,
    E: Write,
{
    let out = SharedWriter::new(stdout);
    match execute(args, &out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::CliUsage(error)) => {
            let rendered = error.render().to_string();
            if error.use_stderr() {
                drop(write!(stderr, "{rendered}"));
            } else {
                drop(out.line(rendered.trim_end()));
            }
            ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2))
        }
        Err(error) => {
            drop(writeln!(stderr, "natsline: {error}"));
            ExitCode::FAILURE
        }
    }
}

fn execute<I, W>(args: I, out: &SharedWriter<W>) -> Result<(), AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write + Send + 'static,
{
    let cli = Cli::try_parse_from(args).map_err(AppError::CliUsage)?;
    telemetry::initialise(&cli.log_filter, cli.log_format)?;
    let config = cli.connection.to_config()?;
    match cli.command {
        CliCommand::Sub {
            subject,
            group,
            sid,
        } => subscribe(config, &subject, group.as_deref(), sid, out),
        CliCommand::Pub {
            subject,
            message,
            reply_to,
        } => publish(config, &subject, &message, reply_to.as_deref(), out),
        CliCommand::Ping => ping(config, out),
    }
}

fn subscribe<W>(
    config: ClientConfig,
    subject: &str,
    group: Option<&str>,
    sid: Option<String>,
    out: &SharedWriter<W>,
) -> Result<(), AppError>
where
    W: Write + Send + 'static,
{
    let mut client = Client::connect_with(config, MessagePrinter::new(out.clone()))?;
    let watcher = SignalWatcher::spawn(client.stop_handle())?;
    let outcome = client
        .subscribe(subject, group, sid.map(SubscriptionId::new))
        .and_then(|subscribed| {
            info!(target: CLI_TARGET, sid = %subscribed, subject, "listening");
            client.wait()
        });
    drop(watcher);
    client.finish();
    match outcome? {
        WaitExit::Stopped => Ok(()),
        WaitExit::ConnectionClosed => Err(AppError::ConnectionClosed),
    }
}

fn publish<W: Write>(
    config: ClientConfig,
    subject: &str,
    message: &str,
    reply_to: Option<&str>,
    out: &SharedWriter<W>,
) -> Result<(), AppError> {
    let mut client = Client::connect_with(config, TracingHandler)?;
    let outcome = client.publish(subject, message, reply_to);
    client.finish();
    outcome?;
    out.line(&format!("published {} bytes to {subject}", message.len()))
        .map_err(AppError::Output)
}

fn ping<W: Write>(config: ClientConfig, out: &SharedWriter<W>) -> Result<(), AppError> {
    let mut client = Client::connect_with(config, TracingHandler)?;
    let outcome = await_pong(&mut client);
    client.finish();
    let elapsed = outcome?;
    out.line(&format!("PONG in {} ms", elapsed.as_millis()))
        .map_err(AppError::Output)
}

fn await_pong(client: &mut Client) -> Result<Duration, AppError> {
    let timeout = client.config().timeout();
    let started = Instant::now();
    client.ping()?;
    loop {
        match client.process_next()? {
            Progress::Handled(FrameKind::Pong) => return Ok(started.elapsed()),
            Progress::Closed => return Err(AppError::ConnectionClosed),
            _ if started.elapsed() >= timeout => {
                return Err(AppError::PongTimeout {
                    seconds: timeout.as_secs(),
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests;
