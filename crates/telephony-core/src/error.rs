//! Error types for telephony operations.

use serde::Serialize;
use thiserror::Error;

use crate::validation::ValidationReport;

/// Errors that can occur while talking to the telephony backend or while
/// checking a request locally before it is sent.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Input rejected locally before any network call.
    #[error("validation failed: {}", .0.summary())]
    Validation(ValidationReport),

    /// The request did not complete (connection, DNS, timeout, bad status).
    #[error("network error: {0}")]
    Network(String),

    /// The backend rejected the request because of a state mismatch.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The referenced entity does not exist on the backend.
    #[error("{0}")]
    NotFound(String),

    /// Another operation on the same key has not resolved yet.
    #[error("already processing {0}")]
    AlreadyProcessing(String),

    /// The backend answered with a body we could not decode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Generic message used when the backend rejects without explaining why.
pub const GENERIC_CONFLICT: &str = "The request conflicts with the current state";

impl ApiError {
    /// A single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(ValidationReport::single(field, message))
    }

    /// A missing entity, phrased for display.
    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound(format!(
            "{} {} not found. Please refresh and try again.",
            entity, id
        ))
    }

    /// Classify a `{success: false, message}` body from the backend.
    pub fn from_rejection(message: Option<String>) -> Self {
        match message {
            Some(msg) if msg.to_lowercase().contains("not found") => ApiError::NotFound(msg),
            Some(msg) if !msg.trim().is_empty() => ApiError::Conflict(msg),
            _ => ApiError::Conflict(GENERIC_CONFLICT.to_string()),
        }
    }

    /// Whether the user may simply try the same operation again.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::AlreadyProcessing(_))
    }

    /// Message suitable for a banner or status line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(_) => "Please fix the validation errors below.".to_string(),
            ApiError::Network(msg) => format!("Network error: {}", msg),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::AlreadyProcessing(key) => format!("Already processing {}", key),
            ApiError::Json(err) => format!("Unexpected response from server: {}", err),
            ApiError::Config(msg) => format!("Configuration error: {}", msg),
        }
    }
}

/// Operation result as seen by a view: never an error, always a flag and
/// an optional message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Outcome {
    /// A successful outcome with a message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// A failed outcome carrying the error's display message.
    pub fn failed(error: &ApiError) -> Self {
        Self {
            success: false,
            message: Some(error.user_message()),
        }
    }

    /// Convert an operation result at the view boundary.
    pub fn from_result<T>(result: &Result<T, ApiError>, success_message: &str) -> Self {
        match result {
            Ok(_) => Self::ok(success_message),
            Err(err) => Self::failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert!(matches!(
            ApiError::from_rejection(Some("Phone number not found".to_string())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_rejection(Some("Already assigned to agentB".to_string())),
            ApiError::Conflict(ref msg) if msg == "Already assigned to agentB"
        ));
        assert!(matches!(
            ApiError::from_rejection(None),
            ApiError::Conflict(ref msg) if msg == GENERIC_CONFLICT
        ));
        assert!(matches!(
            ApiError::from_rejection(Some("  ".to_string())),
            ApiError::Conflict(ref msg) if msg == GENERIC_CONFLICT
        ));
    }

    #[test]
    fn test_not_found_message() {
        let err = ApiError::not_found("Scheduled event", "s1");
        assert_eq!(
            err.to_string(),
            "Scheduled event s1 not found. Please refresh and try again."
        );
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: Result<(), ApiError> = Ok(());
        assert_eq!(Outcome::from_result(&ok, "Done"), Outcome::ok("Done"));

        let err: Result<(), ApiError> = Err(ApiError::Network("connection reset".to_string()));
        let outcome = Outcome::from_result(&err, "Done");
        assert!(!outcome.success);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Network error: connection reset")
        );
    }

    #[test]
    fn test_transient() {
        assert!(ApiError::Network("x".into()).is_transient());
        assert!(ApiError::AlreadyProcessing("+1555".into()).is_transient());
        assert!(!ApiError::Conflict("x".into()).is_transient());
    }
}
