//! Error types for telephony-api.

use telephony_core::ApiError;
use thiserror::Error;

/// Errors raised while reading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("{0} not set")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}

/// Map a transport failure from reqwest onto the shared taxonomy.
pub(crate) fn transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network("request timed out".to_string())
    } else if err.is_connect() {
        ApiError::Network(format!("connection failed: {}", err))
    } else if err.is_decode() {
        ApiError::Network(format!("could not read response: {}", err))
    } else {
        ApiError::Network(err.to_string())
    }
}
