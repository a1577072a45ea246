//! Client-side state for outbound scheduling and phone number assignment.
//!
//! This crate holds one organization's view of its telephony resources and
//! keeps it consistent with the backend:
//!
//! - [`TrunkRegistry`] - SIP trunks and the caller numbers they provide
//! - [`PhoneAssignmentStore`] - the canonical phone number view, assign and unassign
//! - [`ScheduledEventManager`] - scheduled calls and messages with local validation
//! - [`AgentDirectory`] - agents to pick from
//! - [`PreferenceStore`] - the persisted outbound tab
//!
//! # Architecture
//!
//! ```text
//!   mutation ──► local guard + validation ──► TelephonyBackend
//!                                                │ ack
//!                                                ▼
//!                         SnapshotStore::write_local (optimistic)
//!                                                │
//!                                                ▼
//!                         Reconciler::spawn (re-fetch, background)
//!                                                │
//!                                                ▼
//!                 SnapshotStore::apply_fetch (skipped if stale)
//! ```
//!
//! Every store publishes whole snapshots through a `watch` channel, so
//! readers never see a partially applied update.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use outbound_scheduler::{OutboundSession, SchedulerSettings};
//! use telephony_api::TelephonyClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TelephonyClient::from_env()?;
//!     let org = client.config().organization_id.clone().unwrap_or_default();
//!     let session = OutboundSession::new(Arc::new(client), org, SchedulerSettings::from_env()?);
//!
//!     session.load_all().await;
//!     session.phones.assign("+15551230000", "sales").await?;
//!
//!     let live = session.start_live_refresh();
//!     // ... render until the view closes
//!     live.stop();
//!     Ok(())
//! }
//! ```

mod agents;
mod config;
mod error;
mod inflight;
mod notice;
mod phone_store;
mod preferences;
mod reconciler;
mod scheduled;
mod session;
mod store;
mod trunks;

pub use agents::AgentDirectory;
pub use config::{SchedulerSettings, DEFAULT_REFRESH_INTERVAL};
pub use error::{PreferenceError, SettingsError};
pub use inflight::{InFlight, InFlightGuard};
pub use notice::{Notice, NoticeBoard, NoticeKind, DEFAULT_NOTICE_WINDOW};
pub use phone_store::{PhoneAssignmentStore, PhoneBook};
pub use preferences::{
    FileKv, KeyValueStore, MemoryKv, OutboundTab, PreferenceStore, OUTBOUND_TAB_KEY,
};
pub use reconciler::{Applied, LiveRefresh, Reconciler, Reconciliation};
pub use scheduled::ScheduledEventManager;
pub use session::OutboundSession;
pub use store::{FetchMode, FetchTicket, Settled, SnapshotStore};
pub use trunks::TrunkRegistry;

// Re-export the shared model for convenience
pub use telephony_core::{
    ApiError, CallType, EventStatus, InputZone, Outcome, PhoneNumber, ScheduleForm,
    ScheduledEvent, TelephonyBackend, Transport, Trunk,
};
