//! Request and response envelopes used only on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use telephony_core::{Ack, ApiError};

/// Body of the assign and unassign calls.
#[derive(Debug, Serialize)]
pub(crate) struct AgentBody<'a> {
    pub agent_id: &'a str,
}

/// Response to any mutation: `{success, message?, trunk?}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MutationResponse {
    /// Missing means the HTTP status already said it all.
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub trunk: Option<Value>,
}

impl MutationResponse {
    /// Parse a mutation body. An empty body counts as success.
    pub fn parse(body: &Value) -> Result<Self, ApiError> {
        if body.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(body.clone())?)
    }

    /// Reject `{success: false}` bodies.
    pub fn check(self) -> Result<Self, ApiError> {
        if self.success == Some(false) {
            return Err(ApiError::from_rejection(self.message.or(self.error)));
        }
        Ok(self)
    }

    pub fn into_ack(self) -> Ack {
        Ack {
            message: self.message,
        }
    }
}

/// Pull a human-readable message out of an error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .filter(|m| !m.trim().is_empty())
}
