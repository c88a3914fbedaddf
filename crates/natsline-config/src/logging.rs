//! Log rendering selected with `--log-format`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the CLI renders tracing events on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for piping into log collectors.
    Json,
    /// Terse one-line events for a terminal session.
    #[default]
    Compact,
}

/// Returned when a `--log-format` value names no known format.
pub type LogFormatParseError = strum::ParseError;
