//! Tracing subscriber set-up for the `foreman` binary.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback filter directive did not parse.
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        /// The rejected directive.
        filter: String,
        /// Parser failure.
        source: ParseError,
    },

    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Installs a formatting subscriber. `RUST_LOG` wins when set; otherwise
/// `default_filter` applies.
///
/// # Errors
///
/// Returns [`TelemetryError`] when `default_filter` is malformed or a
/// subscriber is already installed.
pub fn init(default_filter: &str) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|source| TelemetryError::Filter {
            filter: default_filter.to_owned(),
            source,
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(TelemetryError::Install)
}
