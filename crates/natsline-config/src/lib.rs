//! Typed configuration for natsline clients.
//!
//! Configuration is assembled once, validated once, and then handed to the
//! client engine. Only the I/O timeout may change afterwards.

mod client;
mod defaults;
mod endpoint;
mod logging;

pub use client::{ClientConfig, ClientConfigBuilder, ConfigError};
pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_TIMEOUT, FALLBACK_TIMEOUT,
    default_log_format, normalise_timeout_secs,
};
pub use endpoint::{EndpointParseError, ServerEndpoint};
pub use logging::{LogFormat, LogFormatParseError};
pub use natsline_wire::ConnectOptions;
