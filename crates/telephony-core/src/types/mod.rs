//! Canonical records shared by the backend clients and the stores.

mod agent;
mod phone;
mod schedule;
mod trunk;

use serde::{Deserialize, Serialize};

pub use agent::Agent;
pub use phone::{PhoneNumber, UNASSIGNED};
pub use schedule::{CallType, EventStatus, ScheduleForm, ScheduleRequest, ScheduledEvent};
pub use trunk::{CreateTrunkRequest, Transport, Trunk};

/// Acknowledgement of a successful mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Optional message echoed by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    /// An acknowledgement with a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}
