//! In-memory backend with call counters and failure injection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use telephony_core::{
    Ack, Agent, ApiError, CreateTrunkRequest, PhoneNumber, ScheduleRequest, ScheduledEvent,
    TelephonyBackend, Trunk,
};

use crate::operation::Operation;

#[derive(Default)]
struct State {
    agents: Vec<Agent>,
    organization: Vec<PhoneNumber>,
    pool: Vec<PhoneNumber>,
    trunks: Vec<Trunk>,
    events: Vec<ScheduledEvent>,
    next_id: u64,
    calls: HashMap<Operation, usize>,
    failures: HashMap<Operation, VecDeque<ApiError>>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    /// Count the call and hand back a queued failure, if any.
    fn enter(&mut self, op: Operation) -> Result<(), ApiError> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A backend that keeps every record in memory and behaves like the real
/// service for the happy and the common rejection paths.
///
/// # Example
///
/// ```rust
/// use mock_backend::InMemoryBackend;
/// use telephony_core::{PhoneNumber, TelephonyBackend};
///
/// # async fn example() {
/// let backend = InMemoryBackend::new()
///     .with_organization_numbers(vec![PhoneNumber::new("+15551230000").with_phone_id("p1")]);
///
/// backend.assign_number("p1", "agentA").await.unwrap();
/// # }
/// ```
pub struct InMemoryBackend {
    state: Mutex<State>,
    echo_trunks: bool,
}

impl InMemoryBackend {
    /// Create an empty backend that echoes created trunks.
    pub fn new() -> Self {
        Self {
            state: Mutex::default(),
            echo_trunks: true,
        }
    }

    pub fn with_agents(self, agents: Vec<Agent>) -> Self {
        self.state().agents = agents;
        self
    }

    pub fn with_organization_numbers(self, numbers: Vec<PhoneNumber>) -> Self {
        self.state().organization = numbers;
        self
    }

    pub fn with_available_pool(self, numbers: Vec<PhoneNumber>) -> Self {
        self.state().pool = numbers;
        self
    }

    pub fn with_trunks(self, trunks: Vec<Trunk>) -> Self {
        self.state().trunks = trunks;
        self
    }

    pub fn with_events(self, events: Vec<ScheduledEvent>) -> Self {
        self.state().events = events;
        self
    }

    /// Answer trunk creation without echoing the record.
    pub fn without_trunk_echo(mut self) -> Self {
        self.echo_trunks = false;
        self
    }

    /// Make the next call of `op` fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, op: Operation, error: ApiError) {
        self.state().failures.entry(op).or_default().push_back(error);
    }

    /// Number of times `op` reached this backend.
    pub fn calls(&self, op: Operation) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total number of mutating calls.
    pub fn mutation_calls(&self) -> usize {
        let state = self.state();
        state
            .calls
            .iter()
            .filter(|(op, _)| op.is_mutation())
            .map(|(_, n)| n)
            .sum()
    }

    pub fn organization_snapshot(&self) -> Vec<PhoneNumber> {
        self.state().organization.clone()
    }

    pub fn events_snapshot(&self) -> Vec<ScheduledEvent> {
        self.state().events.clone()
    }

    pub fn trunks_snapshot(&self) -> Vec<Trunk> {
        self.state().trunks.clone()
    }

    /// Replace the organization list, as if another client changed it.
    pub fn replace_organization_numbers(&self, numbers: Vec<PhoneNumber>) {
        self.state().organization = numbers;
    }

    /// Replace the stored events, as if another client changed them.
    pub fn replace_events(&self, events: Vec<ScheduledEvent>) {
        self.state().events = events;
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn same_number(phone: &PhoneNumber, phone_id: &str) -> bool {
    phone.resolved_phone_id() == Some(phone_id)
}

fn rejection(message: &str) -> ApiError {
    ApiError::from_rejection(Some(message.to_string()))
}

#[async_trait]
impl TelephonyBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "InMemoryBackend"
    }

    async fn list_agents(&self, organization_id: &str) -> Result<Vec<Agent>, ApiError> {
        let mut state = self.state();
        state.enter(Operation::ListAgents)?;
        Ok(state
            .agents
            .iter()
            .filter(|a| a.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn organization_numbers(
        &self,
        organization_id: &str,
    ) -> Result<Vec<PhoneNumber>, ApiError> {
        let mut state = self.state();
        state.enter(Operation::OrganizationNumbers)?;
        Ok(state
            .organization
            .iter()
            .filter(|p| p.organization_id.is_empty() || p.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn available_numbers(&self) -> Result<Vec<PhoneNumber>, ApiError> {
        let mut state = self.state();
        state.enter(Operation::AvailableNumbers)?;
        Ok(state.pool.clone())
    }

    async fn assign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError> {
        let mut state = self.state();
        state.enter(Operation::Assign)?;

        if !state.organization.iter().any(|p| same_number(p, phone_id)) {
            let Some(pos) = state.pool.iter().position(|p| same_number(p, phone_id)) else {
                return Err(rejection("Phone number not found"));
            };
            let moved = state.pool.remove(pos);
            state.organization.push(moved);
        }

        let Some(phone) = state
            .organization
            .iter_mut()
            .find(|p| same_number(p, phone_id))
        else {
            return Err(rejection("Phone number not found"));
        };
        if phone.assigned_agent().is_some_and(|current| current != agent_id) {
            return Err(rejection("Phone number is already assigned to another agent"));
        }
        phone.set_agent(Some(agent_id.to_string()));
        Ok(Ack::with_message("Phone number assigned"))
    }

    async fn unassign_number(&self, phone_id: &str, agent_id: &str) -> Result<Ack, ApiError> {
        let mut state = self.state();
        state.enter(Operation::Unassign)?;

        let Some(phone) = state
            .organization
            .iter_mut()
            .find(|p| same_number(p, phone_id))
        else {
            return Err(rejection("Phone number not found"));
        };
        if phone.assigned_agent() != Some(agent_id) {
            return Err(rejection("Phone number is not assigned to this agent"));
        }
        phone.set_agent(None);
        Ok(Ack::with_message("Phone number unassigned"))
    }

    async fn list_trunks(&self, organization_id: &str) -> Result<Vec<Trunk>, ApiError> {
        let mut state = self.state();
        state.enter(Operation::ListTrunks)?;
        Ok(state
            .trunks
            .iter()
            .filter(|t| t.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn create_trunk(&self, request: &CreateTrunkRequest) -> Result<Option<Trunk>, ApiError> {
        let mut state = self.state();
        state.enter(Operation::CreateTrunk)?;

        let duplicate = state.trunks.iter().any(|t| {
            t.organization_id == request.organization_id && t.phone_number == request.phone_number
        });
        if duplicate {
            return Err(rejection("A trunk already exists for this phone number"));
        }

        let trunk = Trunk {
            trunk_id: state.next_id("trunk"),
            phone_number: request.phone_number.clone(),
            transport: request.transport,
            organization_id: request.organization_id.clone(),
        };
        state.trunks.push(trunk.clone());
        Ok(self.echo_trunks.then_some(trunk))
    }

    async fn delete_trunk(&self, trunk_id: &str) -> Result<Ack, ApiError> {
        let mut state = self.state();
        state.enter(Operation::DeleteTrunk)?;

        let before = state.trunks.len();
        state.trunks.retain(|t| t.trunk_id != trunk_id);
        if state.trunks.len() == before {
            return Err(ApiError::not_found("Trunk", trunk_id));
        }
        Ok(Ack::default())
    }

    async fn list_scheduled_events(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ScheduledEvent>, ApiError> {
        let mut state = self.state();
        state.enter(Operation::ListEvents)?;
        Ok(state
            .events
            .iter()
            .filter(|e| e.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn create_scheduled_event(&self, request: &ScheduleRequest) -> Result<Ack, ApiError> {
        let mut state = self.state();
        state.enter(Operation::CreateEvent)?;

        let id = state.next_id("evt");
        state.events.push(ScheduledEvent::from_request(id, request));
        Ok(Ack::with_message("Scheduled event created"))
    }

    async fn update_scheduled_event(
        &self,
        scheduled_id: &str,
        request: &ScheduleRequest,
    ) -> Result<Ack, ApiError> {
        let mut state = self.state();
        state.enter(Operation::UpdateEvent)?;

        let Some(event) = state
            .events
            .iter_mut()
            .find(|e| e.scheduled_id == scheduled_id)
        else {
            return Err(ApiError::not_found("Scheduled event", scheduled_id));
        };
        event.apply(request);
        Ok(Ack::with_message("Scheduled event updated"))
    }

    async fn delete_scheduled_event(&self, scheduled_id: &str) -> Result<Ack, ApiError> {
        let mut state = self.state();
        state.enter(Operation::DeleteEvent)?;

        let before = state.events.len();
        state.events.retain(|e| e.scheduled_id != scheduled_id);
        if state.events.len() == before {
            return Err(ApiError::not_found("Scheduled event", scheduled_id));
        }
        Ok(Ack::with_message("Scheduled event deleted"))
    }
}

#[cfg(test)]
mod tests {
    use telephony_core::{CallType, Transport};

    use super::*;

    fn request() -> ScheduleRequest {
        ScheduleRequest {
            organization_id: "org1".to_string(),
            agent_id: "agentA".to_string(),
            call_type: CallType::OutboundCall,
            recipient_phone: "+15551230000".to_string(),
            scheduled_time: 1_800_000_000,
            caller_number: "+15559870000".to_string(),
            retry_interval_minutes: 5,
            max_retries: 3,
            message_template: None,
        }
    }

    #[tokio::test]
    async fn test_assign_then_unassign() {
        let backend = InMemoryBackend::new().with_organization_numbers(vec![
            PhoneNumber::new("+15551230000").with_phone_id("p1"),
        ]);

        backend.assign_number("p1", "agentA").await.unwrap();
        assert_eq!(
            backend.organization_snapshot()[0].assigned_agent(),
            Some("agentA")
        );

        backend.unassign_number("p1", "agentA").await.unwrap();
        assert!(!backend.organization_snapshot()[0].is_assigned());

        let err = backend.unassign_number("p1", "agentA").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(backend.calls(Operation::Unassign), 2);
    }

    #[tokio::test]
    async fn test_assign_from_pool_moves_number() {
        let backend = InMemoryBackend::new()
            .with_available_pool(vec![PhoneNumber::new("+15551230009").with_phone_id("p9")]);

        backend.assign_number("p9", "agentB").await.unwrap();

        assert!(backend.available_numbers().await.unwrap().is_empty());
        let org = backend.organization_numbers("org1").await.unwrap();
        assert_eq!(org[0].assigned_agent(), Some("agentB"));
    }

    #[tokio::test]
    async fn test_number_is_not_an_id() {
        let backend = InMemoryBackend::new()
            .with_available_pool(vec![PhoneNumber::new("+15551230009")]);

        let err = backend.assign_number("+15551230009", "agentB").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(backend.available_numbers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_consumed_once() {
        let backend = InMemoryBackend::new();
        backend.fail_next(Operation::ListTrunks, ApiError::Network("down".to_string()));

        assert!(backend.list_trunks("org1").await.is_err());
        assert!(backend.list_trunks("org1").await.is_ok());
        assert_eq!(backend.calls(Operation::ListTrunks), 2);
    }

    #[tokio::test]
    async fn test_trunk_lifecycle() {
        let backend = InMemoryBackend::new();
        let created = backend
            .create_trunk(&CreateTrunkRequest {
                organization_id: "org1".to_string(),
                phone_number: "+15559870000".to_string(),
                transport: Transport::Tcp,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(backend.list_trunks("org1").await.unwrap(), vec![created.clone()]);
        backend.delete_trunk(&created.trunk_id).await.unwrap();
        assert!(matches!(
            backend.delete_trunk(&created.trunk_id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_event_lifecycle() {
        let backend = InMemoryBackend::new();
        backend.create_scheduled_event(&request()).await.unwrap();

        let events = backend.list_scheduled_events("org1").await.unwrap();
        assert_eq!(events.len(), 1);

        let mut changed = request();
        changed.max_retries = 7;
        backend
            .update_scheduled_event(&events[0].scheduled_id, &changed)
            .await
            .unwrap();
        assert_eq!(backend.events_snapshot()[0].max_retries, 7);

        backend
            .delete_scheduled_event(&events[0].scheduled_id)
            .await
            .unwrap();
        assert!(backend.events_snapshot().is_empty());
        assert_eq!(backend.mutation_calls(), 3);
    }
}
