//! HTTP client for the outbound telephony backend.
//!
//! [`TelephonyClient`] implements [`telephony_core::TelephonyBackend`] over
//! the backend's REST routes. Every request carries the organization API
//! key in the `X-API-Key` header, and every response is normalized before
//! it leaves this crate.
//!
//! # Example
//!
//! ```no_run
//! use telephony_api::{ApiConfig, TelephonyClient};
//! use telephony_core::TelephonyBackend;
//!
//! # async fn example() -> Result<(), telephony_core::ApiError> {
//! let config = ApiConfig::new("https://api.example.com").with_api_key("key");
//! let client = TelephonyClient::new(config)?;
//!
//! for trunk in client.list_trunks("org1").await? {
//!     println!("{} via {}", trunk.phone_number, trunk.transport);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
mod types;

pub use client::TelephonyClient;
pub use config::{ApiConfig, API_KEY_HEADER, DEFAULT_TIMEOUT_SECS};
pub use error::ConfigError;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
