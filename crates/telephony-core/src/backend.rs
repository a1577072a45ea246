//! The TelephonyBackend trait definition.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{
    Ack, Agent, CreateTrunkRequest, PhoneNumber, ScheduleRequest, ScheduledEvent, Trunk,
};

/// The authoritative telephony service.
///
/// Implementations return records already normalized through
/// [`crate::normalize`]. A `{success: false}` answer must surface as an
/// `Err`, never as an `Ack`. This trait is object-safe and is used as
/// `Arc<dyn TelephonyBackend>` by the stores.
#[async_trait]
pub trait TelephonyBackend: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Agent directory for an organization.
    async fn list_agents(&self, organization_id: &str) -> Result<Vec<Agent>, ApiError>;

    /// Organization-scoped phone numbers (the preferred source).
    async fn organization_numbers(
        &self,
        organization_id: &str,
    ) -> Result<Vec<PhoneNumber>, ApiError>;

    /// Global pool of numbers not yet bound to an organization directory.
    async fn available_numbers(&self) -> Result<Vec<PhoneNumber>, ApiError>;

    /// Bind a number to an agent.
    async fn assign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError>;

    /// Release a number from the agent it is currently bound to.
    async fn unassign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError>;

    async fn list_trunks(&self, organization_id: &str) -> Result<Vec<Trunk>, ApiError>;

    /// Create a trunk. The backend may or may not echo the created record.
    async fn create_trunk(&self, request: &CreateTrunkRequest) -> Result<Option<Trunk>, ApiError>;

    async fn delete_trunk(&self, trunk_id: &str) -> Result<Ack, ApiError>;

    async fn list_scheduled_events(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ScheduledEvent>, ApiError>;

    async fn create_scheduled_event(&self, request: &ScheduleRequest) -> Result<Ack, ApiError>;

    /// Replace every mutable field of an event.
    async fn update_scheduled_event(
        &self,
        scheduled_id: &str,
        request: &ScheduleRequest,
    ) -> Result<Ack, ApiError>;

    async fn delete_scheduled_event(&self, scheduled_id: &str) -> Result<Ack, ApiError>;
}
