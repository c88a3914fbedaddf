use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::{DEFAULT_HOST, DEFAULT_PORT};

/// Broker address the client connects to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerEndpoint {
    host: String,
    port: u16,
}

impl ServerEndpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl Default for ServerEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "nats://{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerEndpoint {
    type Err = EndpointParseError;

    /// Parses `nats://host[:port]`, `tcp://host[:port]` or a bare
    /// `host[:port]`. The port defaults to 4222.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let candidate = if input.contains("://") {
            input.to_owned()
        } else {
            format!("nats://{input}")
        };
        let url = Url::parse(&candidate).map_err(|source| EndpointParseError::Url {
            input: input.to_owned(),
            source,
        })?;
        match url.scheme() {
            "nats" | "tcp" => {}
            other => return Err(EndpointParseError::UnsupportedScheme(other.to_owned())),
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?;
        let bare_host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Self::new(bare_host, url.port().unwrap_or(DEFAULT_PORT)))
    }
}

/// Errors encountered while parsing a [`ServerEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// The text was not a valid URL.
    #[error("invalid server address '{input}': {source}")]
    Url {
        /// The rejected text.
        input: String,
        /// Parser diagnostic.
        #[source]
        source: url::ParseError,
    },
    /// Scheme was not recognised.
    #[error("unsupported server scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
}
