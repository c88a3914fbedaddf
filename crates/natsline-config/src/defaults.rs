use std::time::Duration;

use crate::logging::LogFormat;

/// Broker host used when none is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Broker port used when none is configured.
pub const DEFAULT_PORT: u16 = 4222;

/// Connect and read timeout applied to new clients.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout substituted when a non-positive value is requested.
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Converts a timeout expressed in whole seconds.
///
/// Non-positive values fall back to [`FALLBACK_TIMEOUT`].
#[must_use]
pub fn normalise_timeout_secs(seconds: i64) -> Duration {
    u64::try_from(seconds)
        .ok()
        .filter(|secs| *secs > 0)
        .map_or(FALLBACK_TIMEOUT, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, Duration::from_secs(1))]
    #[case(30, Duration::from_secs(30))]
    #[case(0, FALLBACK_TIMEOUT)]
    #[case(-4, FALLBACK_TIMEOUT)]
    fn timeouts_normalise(#[case] seconds: i64, #[case] expected: Duration) {
        assert_eq!(normalise_timeout_secs(seconds), expected);
    }
}
