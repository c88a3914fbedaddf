//! Entry point for the `natsline` command-line client.
//!
//! The binary delegates to [`natsline_cli::run`], which parses arguments,
//! installs telemetry and drives a single broker session.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    natsline_cli::run(std::env::args_os(), io::stdout(), io::stderr())
}
