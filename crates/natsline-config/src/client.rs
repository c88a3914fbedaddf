use std::time::Duration;

use natsline_wire::ConnectOptions;
use thiserror::Error;

use crate::defaults::{DEFAULT_TIMEOUT, normalise_timeout_secs};
use crate::endpoint::ServerEndpoint;

/// Validated configuration consumed by the client engine.
///
/// Build one with [`ClientConfig::builder`]. Apart from the timeout, the
/// configuration is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    endpoint: ServerEndpoint,
    timeout: Duration,
    options: ConnectOptions,
}

impl ClientConfig {
    /// Starts a builder seeded with the defaults.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Broker address.
    #[must_use]
    pub const fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Timeout bounding the socket open and every read.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Options sent in the `CONNECT` command.
    #[must_use]
    pub const fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Whether the broker acknowledges every command.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.options.verbose
    }

    /// Replaces the timeout using whole seconds; non-positive values fall back
    /// to five seconds.
    pub fn set_timeout_secs(&mut self, seconds: i64) {
        self.timeout = normalise_timeout_secs(seconds);
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: ServerEndpoint::default(),
            timeout: DEFAULT_TIMEOUT,
            options: ConnectOptions::default(),
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Sets the broker address.
    #[must_use]
    pub fn endpoint(mut self, endpoint: ServerEndpoint) -> Self {
        self.config.endpoint = endpoint;
        self
    }

    /// Sets the connect and read timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Requests `+OK` acknowledgements for every command.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.options.verbose = verbose;
        self
    }

    /// Requests strict subject checking from the broker.
    #[must_use]
    pub fn pedantic(mut self, pedantic: bool) -> Self {
        self.config.options.pedantic = pedantic;
        self
    }

    /// Declares whether TLS is required. The flag is passed through only.
    #[must_use]
    pub fn ssl_required(mut self, required: bool) -> Self {
        self.config.options.ssl_required = required;
        self
    }

    /// Sets the client name reported to the broker.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.options.name = name.into();
        self
    }

    /// Sets an opaque authentication token.
    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.options.auth_token = Some(token.into());
        self
    }

    /// Sets user credentials.
    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.config.options.user = Some(user.into());
        self.config.options.pass = Some(pass.into());
        self
    }

    /// Replaces every CONNECT option at once.
    #[must_use]
    pub fn options(mut self, options: ConnectOptions) -> Self {
        self.config.options = options;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the host is empty, the port is zero, the
    /// timeout is zero, or the client name/language tag is blank.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let config = self.config;
        if config.endpoint.host().trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if config.endpoint.port() == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if config.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if config.options.name.trim().is_empty() {
            return Err(ConfigError::BlankOption { field: "name" });
        }
        if config.options.lang.trim().is_empty() {
            return Err(ConfigError::BlankOption { field: "lang" });
        }
        Ok(config)
    }
}

/// Configuration rejected during validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The broker host was blank.
    #[error("server host must not be empty")]
    EmptyHost,
    /// The broker port was zero.
    #[error("server port must be non-zero")]
    ZeroPort,
    /// The timeout was zero, which would disable blocking reads entirely.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    /// A required CONNECT option was blank.
    #[error("connect option '{field}' must not be blank")]
    BlankOption {
        /// Name of the offending option.
        field: &'static str,
    },
}
