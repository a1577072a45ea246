//! Gated backend - holds selected calls until a test releases them.
//!
//! Tests use this to observe state while a request is still in flight:
//! duplicate submissions, optimistic writes racing a refresh, and so on.

use std::collections::HashSet;

use async_trait::async_trait;
use telephony_core::{
    Ack, Agent, ApiError, CreateTrunkRequest, PhoneNumber, ScheduleRequest, ScheduledEvent,
    TelephonyBackend, Trunk,
};
use tokio::sync::watch;

use crate::operation::Operation;

/// A backend whose gated operations wait until [`GatedBackend::open`].
pub struct GatedBackend<B: TelephonyBackend> {
    inner: B,
    gated: HashSet<Operation>,
    open: watch::Sender<bool>,
    arrived: watch::Sender<usize>,
}

impl<B: TelephonyBackend> GatedBackend<B> {
    /// Gate only the listed operations. The gate starts closed.
    pub fn new(inner: B, gated: &[Operation]) -> Self {
        Self {
            inner,
            gated: gated.iter().copied().collect(),
            open: watch::Sender::new(false),
            arrived: watch::Sender::new(0),
        }
    }

    /// Gate every operation.
    pub fn all(inner: B) -> Self {
        Self::new(inner, &Operation::ALL)
    }

    /// Let every waiting and future gated call through.
    pub fn open(&self) {
        self.open.send_replace(true);
    }

    /// Hold future gated calls again.
    pub fn close(&self) {
        self.open.send_replace(false);
    }

    /// Number of gated calls that have reached the gate so far.
    pub fn arrived(&self) -> usize {
        *self.arrived.borrow()
    }

    /// Wait until at least `count` gated calls have reached the gate.
    pub async fn wait_for_arrivals(&self, count: usize) {
        let mut rx = self.arrived.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n >= count).await;
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn pass(&self, op: Operation) {
        if !self.gated.contains(&op) {
            return;
        }
        let mut rx = self.open.subscribe();
        self.arrived.send_modify(|n| *n += 1);
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl<B: TelephonyBackend> TelephonyBackend for GatedBackend<B> {
    fn name(&self) -> &str {
        "GatedBackend"
    }

    async fn list_agents(&self, organization_id: &str) -> Result<Vec<Agent>, ApiError> {
        self.pass(Operation::ListAgents).await;
        self.inner.list_agents(organization_id).await
    }

    async fn organization_numbers(
        &self,
        organization_id: &str,
    ) -> Result<Vec<PhoneNumber>, ApiError> {
        self.pass(Operation::OrganizationNumbers).await;
        self.inner.organization_numbers(organization_id).await
    }

    async fn available_numbers(&self) -> Result<Vec<PhoneNumber>, ApiError> {
        self.pass(Operation::AvailableNumbers).await;
        self.inner.available_numbers().await
    }

    async fn assign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError> {
        self.pass(Operation::Assign).await;
        self.inner.assign_number(phone_id, agent_id).await
    }

    async fn unassign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError> {
        self.pass(Operation::Unassign).await;
        self.inner.unassign_number(phone_id, agent_id).await
    }

    async fn list_trunks(&self, organization_id: &str) -> Result<Vec<Trunk>, ApiError> {
        self.pass(Operation::ListTrunks).await;
        self.inner.list_trunks(organization_id).await
    }

    async fn create_trunk(&self, request: &CreateTrunkRequest) -> Result<Option<Trunk>, ApiError> {
        self.pass(Operation::CreateTrunk).await;
        self.inner.create_trunk(request).await
    }

    async fn delete_trunk(&self, trunk_id: &str) -> Result<Ack, ApiError> {
        self.pass(Operation::DeleteTrunk).await;
        self.inner.delete_trunk(trunk_id).await
    }

    async fn list_scheduled_events(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ScheduledEvent>, ApiError> {
        self.pass(Operation::ListEvents).await;
        self.inner.list_scheduled_events(organization_id).await
    }

    async fn create_scheduled_event(&self, request: &ScheduleRequest) -> Result<Ack, ApiError> {
        self.pass(Operation::CreateEvent).await;
        self.inner.create_scheduled_event(request).await
    }

    async fn update_scheduled_event(
        &self,
        scheduled_id: &str,
        request: &ScheduleRequest,
    ) -> Result<Ack, ApiError> {
        self.pass(Operation::UpdateEvent).await;
        self.inner.update_scheduled_event(scheduled_id, request).await
    }

    async fn delete_scheduled_event(&self, scheduled_id: &str) -> Result<Ack, ApiError> {
        self.pass(Operation::DeleteEvent).await;
        self.inner.delete_scheduled_event(scheduled_id).await
    }
}
