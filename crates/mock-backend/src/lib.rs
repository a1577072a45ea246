//! Mock telephony backends for testing outbound scheduling.
//!
//! This crate provides implementations of the `TelephonyBackend` trait for tests:
//! - `InMemoryBackend` - Keeps records in memory, counts calls, injects failures
//! - `DelayedBackend` - Wraps another backend with artificial latency
//! - `GatedBackend` - Holds chosen calls until the test opens the gate
//!
//! For the real service, use the `telephony-api` crate instead.
//!
//! # Example
//!
//! ```rust
//! use mock_backend::{InMemoryBackend, Operation, TelephonyBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_backend::ApiError> {
//!     let backend = InMemoryBackend::new();
//!
//!     let trunks = backend.list_trunks("org1").await?;
//!     assert!(trunks.is_empty());
//!     assert_eq!(backend.calls(Operation::ListTrunks), 1);
//!     Ok(())
//! }
//! ```

mod delayed;
mod gated;
mod memory;
mod operation;

// Re-export telephony-core types for convenience
pub use telephony_core::{async_trait, ApiError, TelephonyBackend};

pub use delayed::DelayedBackend;
pub use gated::GatedBackend;
pub use memory::InMemoryBackend;
pub use operation::Operation;
