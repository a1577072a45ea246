use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::{deserialize_unix_seconds, InputZone};

/// Kind of outbound contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    #[default]
    #[serde(alias = "call")]
    OutboundCall,
    #[serde(alias = "sms")]
    OutboundSms,
    #[serde(alias = "whatsapp")]
    OutboundWhatsapp,
}

impl CallType {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::OutboundCall => "outbound_call",
            CallType::OutboundSms => "outbound_sms",
            CallType::OutboundWhatsapp => "outbound_whatsapp",
        }
    }

    /// Whether this kind carries a message body.
    pub fn is_message(&self) -> bool {
        !matches!(self, CallType::OutboundCall)
    }

    /// Parse a user-supplied name (`call`, `sms`, `whatsapp` or the wire form).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "call" | "outbound_call" => Some(CallType::OutboundCall),
            "sms" | "outbound_sms" => Some(CallType::OutboundSms),
            "whatsapp" | "outbound_whatsapp" => Some(CallType::OutboundWhatsapp),
            _ => None,
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a scheduled event.
///
/// Only `Scheduled` is ever set locally; every later status comes from the
/// backend execution engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Failed,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::InProgress => "in_progress",
            EventStatus::Completed => "completed",
            EventStatus::Failed => "failed",
            EventStatus::Unknown => "unknown",
        }
    }

    /// Only events that have not started may be edited.
    pub fn is_editable(&self) -> bool {
        matches!(self, EventStatus::Scheduled)
    }

    /// Events that have not started, or have exhausted their retries.
    pub fn is_deletable(&self) -> bool {
        matches!(self, EventStatus::Scheduled | EventStatus::Failed)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_max_retries() -> u32 {
    3
}

/// A future outbound contact request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub scheduled_id: String,
    #[serde(default)]
    pub organization_id: String,
    /// Acting agent prefix.
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub call_type: CallType,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub recipient_phone: String,
    #[serde(default)]
    pub caller_number: String,
    /// Unix seconds (UTC).
    #[serde(deserialize_with = "deserialize_unix_seconds")]
    pub scheduled_time: i64,
    #[serde(default)]
    pub retry_interval_minutes: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ScheduledEvent {
    /// Build the record the backend would store for a request.
    pub fn from_request(scheduled_id: impl Into<String>, request: &ScheduleRequest) -> Self {
        Self {
            scheduled_id: scheduled_id.into(),
            organization_id: request.organization_id.clone(),
            agent_id: request.agent_id.clone(),
            call_type: request.call_type,
            status: EventStatus::Scheduled,
            recipient_phone: request.recipient_phone.clone(),
            caller_number: request.caller_number.clone(),
            scheduled_time: request.scheduled_time,
            retry_interval_minutes: request.retry_interval_minutes,
            max_retries: request.max_retries,
            retry_count: 0,
            message_template: request.message_template.clone(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Replace every mutable field with the request's values.
    pub fn apply(&mut self, request: &ScheduleRequest) {
        self.agent_id = request.agent_id.clone();
        self.call_type = request.call_type;
        self.recipient_phone = request.recipient_phone.clone();
        self.caller_number = request.caller_number.clone();
        self.scheduled_time = request.scheduled_time;
        self.retry_interval_minutes = request.retry_interval_minutes;
        self.max_retries = request.max_retries;
        self.message_template = request.message_template.clone();
    }

    /// Case-insensitive match against agent, recipient and status.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.agent_id.to_lowercase().contains(&term)
            || self.recipient_phone.contains(&term)
            || self.status.as_str().contains(&term)
    }
}

/// Body of a create or update request. Every mutable field is always sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleRequest {
    pub organization_id: String,
    pub agent_id: String,
    pub call_type: CallType,
    pub recipient_phone: String,
    /// Unix seconds (UTC).
    pub scheduled_time: i64,
    pub caller_number: String,
    pub retry_interval_minutes: u32,
    pub max_retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_template: Option<String>,
}

/// Human-entered scheduling form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleForm {
    pub organization_id: String,
    pub agent_prefix: String,
    pub call_type: CallType,
    pub recipient_phone: String,
    pub caller_number: String,
    /// Local date/time as typed, e.g. `2026-10-20T09:30`.
    pub scheduled_time: String,
    pub retry_interval_minutes: i64,
    pub max_retries: i64,
    pub message_template: Option<String>,
}

impl Default for ScheduleForm {
    fn default() -> Self {
        Self {
            organization_id: String::new(),
            agent_prefix: String::new(),
            call_type: CallType::default(),
            recipient_phone: String::new(),
            caller_number: String::new(),
            scheduled_time: String::new(),
            retry_interval_minutes: 0,
            max_retries: i64::from(default_max_retries()),
            message_template: None,
        }
    }
}

impl ScheduleForm {
    /// An empty form scoped to an organization.
    pub fn for_organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            ..Self::default()
        }
    }

    /// Populate a form from an existing event for editing.
    pub fn from_event(event: &ScheduledEvent, zone: InputZone) -> Self {
        Self {
            organization_id: event.organization_id.clone(),
            agent_prefix: event.agent_id.clone(),
            call_type: event.call_type,
            recipient_phone: event.recipient_phone.clone(),
            caller_number: event.caller_number.clone(),
            scheduled_time: zone.format(event.scheduled_time).unwrap_or_default(),
            retry_interval_minutes: i64::from(event.retry_interval_minutes),
            max_retries: i64::from(event.max_retries),
            message_template: event.message_template.clone(),
        }
    }

    /// Clear every field except the organization and call type.
    pub fn reset(&mut self) {
        *self = Self {
            organization_id: std::mem::take(&mut self.organization_id),
            call_type: self.call_type,
            ..Self::default()
        };
    }

    /// Build the wire request. Call only after validation passed.
    pub fn to_request(&self, scheduled_time: i64) -> ScheduleRequest {
        ScheduleRequest {
            organization_id: self.organization_id.clone(),
            agent_id: self.agent_prefix.trim().to_string(),
            call_type: self.call_type,
            recipient_phone: self.recipient_phone.trim().to_string(),
            scheduled_time,
            caller_number: self.caller_number.trim().to_string(),
            retry_interval_minutes: self.retry_interval_minutes.clamp(0, 60) as u32,
            max_retries: self.max_retries.clamp(1, 10) as u32,
            message_template: self
                .message_template
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }
}
