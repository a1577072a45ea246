//! Error types for outbound-scheduler.

use thiserror::Error;

/// Errors from the preference key-value layer.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("preference encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reading scheduler settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
