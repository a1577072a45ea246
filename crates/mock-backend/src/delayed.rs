//! Delayed backend - wraps another backend with artificial latency.

use std::time::Duration;

use async_trait::async_trait;
use telephony_core::{
    Ack, Agent, ApiError, CreateTrunkRequest, PhoneNumber, ScheduleRequest, ScheduledEvent,
    TelephonyBackend, Trunk,
};
use tokio::time::sleep;

/// A backend that sleeps before forwarding every call.
///
/// Useful with paused tokio time to simulate slow responses.
pub struct DelayedBackend<B: TelephonyBackend> {
    inner: B,
    delay: Duration,
}

impl<B: TelephonyBackend> DelayedBackend<B> {
    pub fn new(inner: B, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn with_millis(inner: B, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: TelephonyBackend> TelephonyBackend for DelayedBackend<B> {
    fn name(&self) -> &str {
        "DelayedBackend"
    }

    async fn list_agents(&self, organization_id: &str) -> Result<Vec<Agent>, ApiError> {
        sleep(self.delay).await;
        self.inner.list_agents(organization_id).await
    }

    async fn organization_numbers(
        &self,
        organization_id: &str,
    ) -> Result<Vec<PhoneNumber>, ApiError> {
        sleep(self.delay).await;
        self.inner.organization_numbers(organization_id).await
    }

    async fn available_numbers(&self) -> Result<Vec<PhoneNumber>, ApiError> {
        sleep(self.delay).await;
        self.inner.available_numbers().await
    }

    async fn assign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError> {
        sleep(self.delay).await;
        self.inner.assign_number(phone_id, agent_id).await
    }

    async fn unassign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError> {
        sleep(self.delay).await;
        self.inner.unassign_number(phone_id, agent_id).await
    }

    async fn list_trunks(&self, organization_id: &str) -> Result<Vec<Trunk>, ApiError> {
        sleep(self.delay).await;
        self.inner.list_trunks(organization_id).await
    }

    async fn create_trunk(&self, request: &CreateTrunkRequest) -> Result<Option<Trunk>, ApiError> {
        sleep(self.delay).await;
        self.inner.create_trunk(request).await
    }

    async fn delete_trunk(&self, trunk_id: &str) -> Result<Ack, ApiError> {
        sleep(self.delay).await;
        self.inner.delete_trunk(trunk_id).await
    }

    async fn list_scheduled_events(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ScheduledEvent>, ApiError> {
        sleep(self.delay).await;
        self.inner.list_scheduled_events(organization_id).await
    }

    async fn create_scheduled_event(&self, request: &ScheduleRequest) -> Result<Ack, ApiError> {
        sleep(self.delay).await;
        self.inner.create_scheduled_event(request).await
    }

    async fn update_scheduled_event(
        &self,
        scheduled_id: &str,
        request: &ScheduleRequest,
    ) -> Result<Ack, ApiError> {
        sleep(self.delay).await;
        self.inner.update_scheduled_event(scheduled_id, request).await
    }

    async fn delete_scheduled_event(&self, scheduled_id: &str) -> Result<Ack, ApiError> {
        sleep(self.delay).await;
        self.inner.delete_scheduled_event(scheduled_id).await
    }
}
