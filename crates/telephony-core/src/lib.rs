//! Core types and traits for outbound telephony scheduling.
//!
//! This crate provides the shared vocabulary used by every other crate in the
//! workspace. It defines:
//!
//! - [`TelephonyBackend`] - The trait every backend client must implement
//! - [`PhoneNumber`], [`Trunk`], [`Agent`], [`ScheduledEvent`] - Canonical records
//! - [`ApiError`] / [`Outcome`] - The error taxonomy and its boundary conversion
//! - [`validation`] - Pure checks for E.164 numbers, schedule windows and retry bounds
//! - [`normalize`] - Mapping of loosely shaped backend payloads into canonical records
//!
//! # Example
//!
//! ```rust
//! use telephony_core::validation::{validate_schedule_form, ValidationContext};
//! use telephony_core::{InputZone, ScheduleForm};
//!
//! let form = ScheduleForm {
//!     recipient_phone: "555-1234".to_string(),
//!     ..ScheduleForm::default()
//! };
//!
//! let ctx = ValidationContext::new(1_700_000_000, InputZone::utc());
//! let report = validate_schedule_form(&form, &ctx);
//! assert!(!report.valid);
//! assert!(report.errors.contains_key("recipient_phone"));
//! ```

mod backend;
mod error;
pub mod normalize;
mod time;
mod types;
pub mod validation;

pub use backend::TelephonyBackend;
pub use error::{ApiError, Outcome, GENERIC_CONFLICT};
pub use time::{unix_now, InputZone};
pub use types::{
    Ack, Agent, CallType, CreateTrunkRequest, EventStatus, PhoneNumber, ScheduleForm,
    ScheduleRequest, ScheduledEvent, Transport, Trunk, UNASSIGNED,
};
pub use validation::ValidationReport;

// Re-export async_trait for convenience
pub use async_trait::async_trait;
