//! Configuration types for telephony-api.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the organization-scoped API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Configuration for connecting to the telephony backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend (e.g., "https://api.example.com").
    pub base_url: String,
    /// API key sent in the `X-API-Key` header, if any.
    pub api_key: Option<String>,
    /// Organization used when a caller does not name one.
    pub organization_id: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            organization_id: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `OUTBOUND_API_URL` - Backend base URL
    ///
    /// Optional environment variables:
    /// - `OUTBOUND_API_KEY` - API key for the `X-API-Key` header
    /// - `OUTBOUND_ORG_ID` - Default organization id
    /// - `OUTBOUND_TIMEOUT_SECS` - Request timeout (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("OUTBOUND_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("OUTBOUND_API_URL"))?;

        let mut config = Self::new(base_url);
        config.api_key = env::var("OUTBOUND_API_KEY").ok().filter(|v| !v.is_empty());
        config.organization_id = env::var("OUTBOUND_ORG_ID").ok().filter(|v| !v.is_empty());

        if let Ok(raw) = env::var("OUTBOUND_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                name: "OUTBOUND_TIMEOUT_SECS",
                reason: format!("expected whole seconds, got {:?}", raw),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Builder: set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Builder: set the default organization.
    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// Builder: set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn agents_url(&self, organization_id: &str) -> String {
        format!("{}/agents/by-org/{}", self.base_url, encode(organization_id))
    }

    pub fn organization_numbers_url(&self, organization_id: &str) -> String {
        format!(
            "{}/phone-numbers/by-org/{}",
            self.base_url,
            encode(organization_id)
        )
    }

    pub fn available_numbers_url(&self) -> String {
        format!("{}/phone-numbers/available", self.base_url)
    }

    pub fn assign_url(&self, phone_id: &str) -> String {
        format!("{}/phone-numbers/{}/assign", self.base_url, encode(phone_id))
    }

    pub fn unassign_url(&self, phone_id: &str) -> String {
        format!("{}/phone-numbers/{}/unassign", self.base_url, encode(phone_id))
    }

    pub fn trunks_url(&self, organization_id: &str) -> String {
        format!(
            "{}/outbound/trunks/organization/{}",
            self.base_url,
            encode(organization_id)
        )
    }

    pub fn create_trunk_url(&self) -> String {
        format!("{}/outbound/trunks/create", self.base_url)
    }

    pub fn trunk_url(&self, trunk_id: &str) -> String {
        format!("{}/outbound/trunks/{}", self.base_url, encode(trunk_id))
    }

    pub fn scheduled_events_url(&self, organization_id: &str) -> String {
        format!(
            "{}/scheduled-events/by-org/{}",
            self.base_url,
            encode(organization_id)
        )
    }

    pub fn create_scheduled_event_url(&self) -> String {
        format!("{}/scheduled-events", self.base_url)
    }

    pub fn scheduled_event_url(&self, scheduled_id: &str) -> String {
        format!("{}/scheduled-events/{}", self.base_url, encode(scheduled_id))
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
