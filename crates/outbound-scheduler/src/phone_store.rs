//! Canonical phone number view with assign and unassign.
//!
//! The view is rebuilt from two independently fetched sources (the
//! organization list and the available pool) by
//! [`telephony_core::normalize::reconcile`]. Each source refreshes on its own.
//! A failed load empties that source only; a failed background re-fetch
//! keeps what is shown and records the error.

use std::sync::{Arc, Mutex, MutexGuard};

use telephony_core::normalize::{reconcile, PhoneSource, Reconciled};
use telephony_core::validation::field;
use telephony_core::{Ack, ApiError, PhoneNumber, TelephonyBackend, UNASSIGNED};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::inflight::{InFlight, InFlightGuard};
use crate::notice::NoticeBoard;
use crate::reconciler::{Applied, Reconciler, Reconciliation};
use crate::store::{FetchMode, SnapshotStore};

const ORGANIZATION: &str = "organization numbers";
const POOL: &str = "available pool";

/// Raw sources plus the canonical view derived from them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneBook {
    organization: Vec<PhoneNumber>,
    pool: Vec<PhoneNumber>,
    view: Reconciled,
}

impl PhoneBook {
    /// Canonical, de-duplicated numbers.
    pub fn numbers(&self) -> &[PhoneNumber] {
        &self.view.numbers
    }

    /// Unassigned numbers that can be offered for assignment.
    pub fn available(&self) -> &[PhoneNumber] {
        &self.view.available
    }

    pub fn source(&self) -> PhoneSource {
        self.view.source
    }

    /// Look a number up by E.164 number or backend id.
    pub fn find(&self, key: &str) -> Option<&PhoneNumber> {
        let key = key.trim();
        self.view
            .numbers
            .iter()
            .chain(self.view.available.iter())
            .find(|p| p.phone_number == key || p.resolved_phone_id() == Some(key))
    }

    pub fn assigned_to(&self, agent_id: &str) -> Vec<&PhoneNumber> {
        self.view
            .numbers
            .iter()
            .filter(|p| p.assigned_agent() == Some(agent_id))
            .collect()
    }

    pub fn filter(&self, term: &str) -> Vec<PhoneNumber> {
        self.view
            .numbers
            .iter()
            .filter(|p| p.matches(term))
            .cloned()
            .collect()
    }

    fn rebuild(&mut self) {
        self.view = reconcile(self.organization.clone(), self.pool.clone());
    }

    fn apply_assignment(&mut self, phone_number: &str, agent_id: Option<&str>) {
        let agent_id = agent_id.map(str::to_string);
        if let Some(phone) = self
            .organization
            .iter_mut()
            .find(|p| p.phone_number == phone_number)
        {
            phone.set_agent(agent_id);
        } else if agent_id.is_some() {
            if let Some(mut phone) = self
                .pool
                .iter()
                .find(|p| p.phone_number == phone_number)
                .cloned()
            {
                phone.set_agent(agent_id);
                self.organization.push(phone);
            }
        }
        self.rebuild();
    }
}

#[derive(Debug, Default)]
struct SourceErrors {
    organization: Option<String>,
    pool: Option<String>,
}

/// Phone numbers of one organization.
#[derive(Clone)]
pub struct PhoneAssignmentStore {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn TelephonyBackend>,
    organization_id: String,
    book: SnapshotStore<PhoneBook>,
    errors: Mutex<SourceErrors>,
    processing: InFlight,
    notices: NoticeBoard,
}

impl Inner {
    async fn refresh_organization(&self, mode: FetchMode) -> Result<(), ApiError> {
        let ticket = self.book.begin_fetch();
        let result = self
            .backend
            .organization_numbers(&self.organization_id)
            .await
            .inspect_err(|e| warn!("Failed to load {}: {}", ORGANIZATION, e));
        let settled = self.book.settle(ticket, mode, result, |book, numbers| {
            book.organization = numbers;
            book.rebuild();
        });
        if settled.current {
            self.errors().organization = settled.error.as_ref().map(ApiError::user_message);
        }
        settled.into_result()
    }

    async fn refresh_pool(&self, mode: FetchMode) -> Result<(), ApiError> {
        let ticket = self.book.begin_fetch();
        let result = self
            .backend
            .available_numbers()
            .await
            .inspect_err(|e| warn!("Failed to load {}: {}", POOL, e));
        let settled = self.book.settle(ticket, mode, result, |book, numbers| {
            book.pool = numbers;
            book.rebuild();
        });
        if settled.current {
            self.errors().pool = settled.error.as_ref().map(ApiError::user_message);
        }
        settled.into_result()
    }

    fn errors(&self) -> MutexGuard<'_, SourceErrors> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The backend id of `phone`, required by both assignment endpoints.
fn require_phone_id(phone: &PhoneNumber) -> Result<String, ApiError> {
    phone.resolved_phone_id().map(str::to_string).ok_or_else(|| {
        ApiError::invalid(
            field::PHONE_ID,
            "Phone ID not found. Please refresh and try again.",
        )
    })
}

impl PhoneAssignmentStore {
    pub fn new(
        backend: Arc<dyn TelephonyBackend>,
        organization_id: impl Into<String>,
        notices: NoticeBoard,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                organization_id: organization_id.into(),
                book: SnapshotStore::new("phone numbers"),
                errors: Mutex::default(),
                processing: InFlight::new(),
                notices,
            }),
        }
    }

    /// Fetch both sources concurrently and return the rebuilt view.
    pub async fn load(&self) -> Arc<PhoneBook> {
        let _ = self.refresh(FetchMode::Load).await;
        self.book()
    }

    /// Bind a number to an agent.
    ///
    /// `phone` is an E.164 number or backend id from the current view. On
    /// success the view is updated at once and both sources are re-fetched
    /// in the background.
    pub async fn assign(&self, phone: &str, agent_id: &str) -> Result<Applied<Ack>, ApiError> {
        let result = self.try_assign(phone, agent_id).await;
        match &result {
            Ok(_) => self.inner.notices.success(format!(
                "Phone number {} assigned to {}",
                phone.trim(),
                agent_id.trim()
            )),
            Err(e) => self.inner.notices.failure(e),
        }
        result
    }

    async fn try_assign(&self, key: &str, agent_id: &str) -> Result<Applied<Ack>, ApiError> {
        let agent_id = agent_id.trim();
        if agent_id.is_empty() || agent_id == UNASSIGNED {
            return Err(ApiError::invalid(field::AGENT_ID, "Please select an agent"));
        }
        let phone = self.lookup(key)?;
        let phone_id = require_phone_id(&phone)?;
        let _guard = self.claim(&phone)?;

        let ack = self.inner.backend.assign_number(&phone_id, agent_id).await?;
        info!("Assigned {} to {}", phone.phone_number, agent_id);

        self.inner
            .book
            .write_local(|book| book.apply_assignment(&phone.phone_number, Some(agent_id)));
        Ok(Applied::new(ack, self.reconcile()))
    }

    /// Release a number from its agent.
    ///
    /// Rejected locally when the number is unknown, not assigned, or held by
    /// a different agent. An empty `agent_id` means whichever agent holds it.
    pub async fn unassign(&self, phone: &str, agent_id: &str) -> Result<Applied<Ack>, ApiError> {
        let result = self.try_unassign(phone, agent_id).await;
        match &result {
            Ok(_) => self
                .inner
                .notices
                .success(format!("Phone number {} unassigned", phone.trim())),
            Err(e) => self.inner.notices.failure(e),
        }
        result
    }

    async fn try_unassign(&self, key: &str, agent_id: &str) -> Result<Applied<Ack>, ApiError> {
        let phone = self.lookup(key)?;
        let Some(current) = phone.assigned_agent() else {
            return Err(ApiError::NotFound(format!(
                "Phone number {} is not assigned to any agent. Please refresh and try again.",
                phone.phone_number
            )));
        };
        let agent_id = match agent_id.trim() {
            "" => current,
            requested if requested == current => requested,
            requested => {
                return Err(ApiError::invalid(
                    field::AGENT_ID,
                    format!(
                        "Phone number {} is assigned to {}, not {}",
                        phone.phone_number, current, requested
                    ),
                ));
            }
        };
        let phone_id = require_phone_id(&phone)?;
        let _guard = self.claim(&phone)?;

        let ack = self.inner.backend.unassign_number(&phone_id, agent_id).await?;
        info!("Unassigned {} from {}", phone.phone_number, agent_id);

        self.inner
            .book
            .write_local(|book| book.apply_assignment(&phone.phone_number, None));
        Ok(Applied::new(ack, self.reconcile()))
    }

    fn lookup(&self, key: &str) -> Result<PhoneNumber, ApiError> {
        self.book()
            .find(key)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Phone number", key.trim()))
    }

    fn claim(&self, phone: &PhoneNumber) -> Result<InFlightGuard, ApiError> {
        self.inner
            .processing
            .try_acquire(&phone.phone_number)
            .ok_or_else(|| ApiError::AlreadyProcessing(phone.phone_number.clone()))
    }

    fn reconcile(&self) -> Reconciliation {
        let organization = Arc::clone(&self.inner);
        let pool = Arc::clone(&self.inner);
        Reconciler::spawn(ORGANIZATION, async move {
            organization.refresh_organization(FetchMode::Background).await
        })
        .and(Reconciler::spawn(POOL, async move {
            pool.refresh_pool(FetchMode::Background).await
        }))
    }

    pub(crate) async fn refresh(&self, mode: FetchMode) -> Result<(), ApiError> {
        let (organization, pool) = tokio::join!(
            self.inner.refresh_organization(mode),
            self.inner.refresh_pool(mode)
        );
        organization.and(pool)
    }

    pub fn book(&self) -> Arc<PhoneBook> {
        self.inner.book.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PhoneBook>> {
        self.inner.book.subscribe()
    }

    /// Whether an assign or unassign is in flight for this number.
    pub fn is_processing(&self, phone_number: &str) -> bool {
        self.inner.processing.contains(phone_number.trim())
    }

    /// Errors of the last fetch of each source, joined for display.
    pub fn last_error(&self) -> Option<String> {
        let errors = self.inner.errors();
        match (&errors.organization, &errors.pool) {
            (None, None) => None,
            (Some(e), None) | (None, Some(e)) => Some(e.clone()),
            (Some(org), Some(pool)) => Some(format!("{}; {}", org, pool)),
        }
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }
}
