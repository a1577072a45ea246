//! Input validation for phone numbers and scheduling forms.
//!
//! Every function here is pure: no network, no clock, no mutation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::time::InputZone;
use crate::types::ScheduleForm;

/// Largest accepted retry interval, in minutes.
pub const RETRY_INTERVAL_MAX_MINUTES: i64 = 60;

/// Smallest accepted retry count.
pub const MAX_RETRIES_MIN: i64 = 1;

/// Largest accepted retry count.
pub const MAX_RETRIES_MAX: i64 = 10;

/// Maximum allowed length for SMS/WhatsApp templates.
pub const MAX_TEMPLATE_LENGTH: usize = 1600;

/// Maximum digits in an E.164 number (excluding the `+`).
pub const E164_MAX_DIGITS: usize = 15;

/// Form field names, as used on the wire and in error maps.
pub mod field {
    pub const AGENT_PREFIX: &str = "agent_prefix";
    pub const RECIPIENT_PHONE: &str = "recipient_phone";
    pub const CALLER_NUMBER: &str = "caller_number";
    pub const SCHEDULED_TIME: &str = "scheduled_time";
    pub const RETRY_INTERVAL_MINUTES: &str = "retry_interval_minutes";
    pub const MAX_RETRIES: &str = "max_retries";
    pub const MESSAGE_TEMPLATE: &str = "message_template";
    pub const PHONE_NUMBER: &str = "phone_number";
    pub const AGENT_ID: &str = "agent_id";
    pub const PHONE_ID: &str = "phone_id";
    /// Key for errors the backend reports against the request as a whole.
    pub const REQUEST: &str = "request";
}

/// A single field-level violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Empty value where one is required.
    Required(&'static str),
    /// Not an E.164 number.
    InvalidPhone,
    /// Date/time could not be interpreted.
    InvalidDateTime,
    /// Date/time is not strictly in the future.
    NotInFuture,
    /// Numeric value outside an inclusive range.
    OutOfRange {
        label: &'static str,
        min: i64,
        max: i64,
        unit: &'static str,
    },
    /// Caller number does not belong to a configured trunk.
    UnknownCaller,
    /// Value too long.
    TooLong { label: &'static str, max: usize, actual: usize },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Required(what) => write!(f, "{} is required", what),
            FieldError::InvalidPhone => {
                write!(f, "Please enter a valid phone number (e.g., +1234567890)")
            }
            FieldError::InvalidDateTime => write!(f, "Scheduled time is not a valid date/time"),
            FieldError::NotInFuture => write!(f, "Scheduled time must be in the future"),
            FieldError::OutOfRange {
                label,
                min,
                max,
                unit,
            } => write!(f, "{} must be between {} and {}{}", label, min, max, unit),
            FieldError::UnknownCaller => {
                write!(f, "Caller number must match a configured trunk")
            }
            FieldError::TooLong { label, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", label, actual, max)
            }
        }
    }
}

/// Result of validating a form: every violated field at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    /// An empty, passing report.
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }

    /// A report with one failing field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut report = Self::new();
        report.push(field, message);
        report
    }

    /// Record a violation. The first message for a field wins.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
        self.valid = false;
    }

    /// Message for one field, if it failed.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// One-line summary, e.g. for logs.
    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            return "ok".to_string();
        }
        self.errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Inputs the form check needs besides the form itself.
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    /// Current Unix time in seconds.
    pub now: i64,
    /// Zone the scheduled time was typed in.
    pub zone: InputZone,
    /// Known trunk numbers. `None` skips the caller check.
    pub caller_numbers: Option<&'a [String]>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(now: i64, zone: InputZone) -> Self {
        Self {
            now,
            zone,
            caller_numbers: None,
        }
    }

    /// Require the caller number to be one of these trunk numbers.
    pub fn with_caller_numbers(mut self, numbers: &'a [String]) -> Self {
        self.caller_numbers = Some(numbers);
        self
    }
}

/// Check `^\+[1-9]\d{1,14}$`.
pub fn is_valid_e164(s: &str) -> bool {
    let Some(digits) = s.strip_prefix('+') else {
        return false;
    };
    let len = digits.len();
    (2..=E164_MAX_DIGITS).contains(&len)
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !digits.starts_with('0')
}

/// Prefix `+` when missing. Does not validate.
pub fn normalize_e164(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+{}", trimmed)
    }
}

/// Strictly after `now`.
pub fn is_future_timestamp(t: i64, now: i64) -> bool {
    t > now
}

pub fn is_retry_interval_in_range(v: i64) -> bool {
    (0..=RETRY_INTERVAL_MAX_MINUTES).contains(&v)
}

pub fn is_max_retries_in_range(v: i64) -> bool {
    (MAX_RETRIES_MIN..=MAX_RETRIES_MAX).contains(&v)
}

/// Validate a phone number field, reporting `Required` for blanks.
pub fn validate_phone(value: &str, label: &'static str) -> Result<(), FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::Required(label));
    }
    if !is_valid_e164(value) {
        return Err(FieldError::InvalidPhone);
    }
    Ok(())
}

/// Validate a scheduled time, returning the converted Unix seconds.
pub fn validate_scheduled_time(
    input: &str,
    ctx: &ValidationContext<'_>,
) -> Result<i64, FieldError> {
    if input.trim().is_empty() {
        return Err(FieldError::Required("Scheduled time"));
    }
    let ts = ctx
        .zone
        .to_unix(input)
        .ok_or(FieldError::InvalidDateTime)?;
    if !is_future_timestamp(ts, ctx.now) {
        return Err(FieldError::NotInFuture);
    }
    Ok(ts)
}

/// Validate every field of a scheduling form without short-circuiting.
pub fn validate_schedule_form(form: &ScheduleForm, ctx: &ValidationContext<'_>) -> ValidationReport {
    let mut report = ValidationReport::new();

    if form.agent_prefix.trim().is_empty() {
        report.push(field::AGENT_PREFIX, "Please select an agent");
    }

    if let Err(err) = validate_phone(&form.recipient_phone, "Recipient phone number") {
        report.push(field::RECIPIENT_PHONE, err.to_string());
    }

    match validate_phone(&form.caller_number, "Caller number") {
        Err(err) => report.push(field::CALLER_NUMBER, err.to_string()),
        Ok(()) => {
            if let Some(known) = ctx.caller_numbers {
                let caller = form.caller_number.trim();
                if !known.iter().any(|n| n == caller) {
                    report.push(field::CALLER_NUMBER, FieldError::UnknownCaller.to_string());
                }
            }
        }
    }

    if let Err(err) = validate_scheduled_time(&form.scheduled_time, ctx) {
        report.push(field::SCHEDULED_TIME, err.to_string());
    }

    if !is_retry_interval_in_range(form.retry_interval_minutes) {
        let err = FieldError::OutOfRange {
            label: "Retry interval",
            min: 0,
            max: RETRY_INTERVAL_MAX_MINUTES,
            unit: " minutes",
        };
        report.push(field::RETRY_INTERVAL_MINUTES, err.to_string());
    }

    if !is_max_retries_in_range(form.max_retries) {
        let err = FieldError::OutOfRange {
            label: "Max retries",
            min: MAX_RETRIES_MIN,
            max: MAX_RETRIES_MAX,
            unit: "",
        };
        report.push(field::MAX_RETRIES, err.to_string());
    }

    if let Some(template) = form.message_template.as_deref() {
        let len = template.chars().count();
        if len > MAX_TEMPLATE_LENGTH {
            let err = FieldError::TooLong {
                label: "Message template",
                max: MAX_TEMPLATE_LENGTH,
                actual: len,
            };
            report.push(field::MESSAGE_TEMPLATE, err.to_string());
        }
    }

    report
}
