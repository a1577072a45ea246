//! Scheduled outbound events: list, create, edit, delete and selection.
//!
//! Status transitions after creation (`in_progress`, `completed`, `failed`)
//! belong to the backend and are only observed through re-fetches. Locally an
//! event can be edited while `scheduled` and deleted while `scheduled` or
//! `failed`.

use std::sync::{Arc, Mutex, MutexGuard};

use telephony_core::validation::{
    field, validate_schedule_form, validate_scheduled_time, ValidationContext,
};
use telephony_core::{
    unix_now, Ack, ApiError, InputZone, ScheduleForm, ScheduleRequest, ScheduledEvent,
    TelephonyBackend,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::inflight::InFlight;
use crate::notice::NoticeBoard;
use crate::reconciler::{Applied, Reconciler, Reconciliation};
use crate::store::{FetchMode, SnapshotStore};
use crate::trunks::TrunkRegistry;

/// In-flight key for form submission of a new event.
const CREATE_KEY: &str = "new";

/// Scheduled events of one organization.
#[derive(Clone)]
pub struct ScheduledEventManager {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn TelephonyBackend>,
    organization_id: String,
    zone: InputZone,
    trunks: Option<TrunkRegistry>,
    events: SnapshotStore<Vec<ScheduledEvent>>,
    last_error: Mutex<Option<String>>,
    deleting: InFlight,
    submitting: InFlight,
    selected: Mutex<Option<String>>,
    filter: Mutex<String>,
    notices: NoticeBoard,
}

impl Inner {
    async fn refresh(&self, mode: FetchMode) -> Result<(), ApiError> {
        let ticket = self.events.begin_fetch();
        let result = self
            .backend
            .list_scheduled_events(&self.organization_id)
            .await
            .inspect_err(|e| {
                warn!(
                    "Failed to list scheduled events for {}: {}",
                    self.organization_id, e
                )
            });
        let settled = self
            .events
            .settle(ticket, mode, result, |current, events| *current = events);
        if settled.current {
            *lock(&self.last_error) = settled.error.as_ref().map(ApiError::user_message);
        }
        settled.into_result()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl ScheduledEventManager {
    pub fn new(
        backend: Arc<dyn TelephonyBackend>,
        organization_id: impl Into<String>,
        zone: InputZone,
        notices: NoticeBoard,
    ) -> Self {
        Self::build(backend, organization_id.into(), zone, None, notices)
    }

    /// A manager that only accepts caller numbers owned by a trunk of the
    /// registry.
    pub fn with_trunks(
        backend: Arc<dyn TelephonyBackend>,
        organization_id: impl Into<String>,
        zone: InputZone,
        trunks: TrunkRegistry,
        notices: NoticeBoard,
    ) -> Self {
        Self::build(backend, organization_id.into(), zone, Some(trunks), notices)
    }

    fn build(
        backend: Arc<dyn TelephonyBackend>,
        organization_id: String,
        zone: InputZone,
        trunks: Option<TrunkRegistry>,
        notices: NoticeBoard,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                organization_id,
                zone,
                trunks,
                events: SnapshotStore::new("scheduled events"),
                last_error: Mutex::new(None),
                deleting: InFlight::new(),
                submitting: InFlight::new(),
                selected: Mutex::new(None),
                filter: Mutex::new(String::new()),
                notices,
            }),
        }
    }

    /// Fetch the event list and return it.
    pub async fn list(&self) -> Arc<Vec<ScheduledEvent>> {
        let _ = self.inner.refresh(FetchMode::Load).await;
        self.events()
    }

    /// Validate the form and create an event.
    ///
    /// A form with any invalid field is rejected as a whole with every
    /// field error at once, before any network call. On success the form is
    /// reset and the list is re-fetched.
    pub async fn create(&self, form: &mut ScheduleForm) -> Result<Applied<Ack>, ApiError> {
        let result = self.try_create(form).await;
        match &result {
            Ok(_) => {
                form.reset();
                self.inner
                    .notices
                    .success("Scheduled event created successfully");
            }
            Err(e) => self.inner.notices.failure(e),
        }
        result
    }

    async fn try_create(&self, form: &ScheduleForm) -> Result<Applied<Ack>, ApiError> {
        let request = self.validated_request(form)?;
        let Some(_guard) = self.inner.submitting.try_acquire(CREATE_KEY) else {
            return Err(ApiError::AlreadyProcessing("new scheduled event".to_string()));
        };

        let ack = self.inner.backend.create_scheduled_event(&request).await?;
        info!(
            "Scheduled {} to {} at {}",
            request.call_type, request.recipient_phone, request.scheduled_time
        );
        Ok(Applied::new(ack, self.reconcile()))
    }

    /// Replace every field of a `scheduled` event with the form's values.
    pub async fn update(
        &self,
        scheduled_id: &str,
        form: &ScheduleForm,
    ) -> Result<Applied<Ack>, ApiError> {
        let result = self.try_update(scheduled_id, form).await;
        match &result {
            Ok(_) => self
                .inner
                .notices
                .success("Scheduled event updated successfully"),
            Err(e) => self.inner.notices.failure(e),
        }
        result
    }

    async fn try_update(
        &self,
        scheduled_id: &str,
        form: &ScheduleForm,
    ) -> Result<Applied<Ack>, ApiError> {
        let event = self.lookup(scheduled_id)?;
        if !event.status.is_editable() {
            return Err(ApiError::Conflict(format!(
                "Scheduled event {} is {} and can no longer be edited",
                scheduled_id, event.status
            )));
        }
        let request = self.validated_request(form)?;
        let Some(_guard) = self.inner.submitting.try_acquire(scheduled_id) else {
            return Err(ApiError::AlreadyProcessing(format!(
                "scheduled event {}",
                scheduled_id
            )));
        };

        let ack = self
            .inner
            .backend
            .update_scheduled_event(scheduled_id, &request)
            .await?;
        info!("Updated scheduled event {}", scheduled_id);

        self.inner.events.write_local(|events| {
            if let Some(event) = events.iter_mut().find(|e| e.scheduled_id == scheduled_id) {
                event.apply(&request);
            }
        });
        Ok(Applied::new(ack, self.reconcile()))
    }

    /// Delete an event that is `scheduled` or `failed`.
    ///
    /// The event disappears from the local list on the backend ack. A second
    /// delete of the same id while the first is in flight is rejected.
    pub async fn delete(&self, scheduled_id: &str) -> Result<Applied<Ack>, ApiError> {
        let result = self.try_delete(scheduled_id).await;
        match &result {
            Ok(_) => self
                .inner
                .notices
                .success("Scheduled event deleted successfully"),
            Err(e) => self.inner.notices.failure(e),
        }
        result
    }

    async fn try_delete(&self, scheduled_id: &str) -> Result<Applied<Ack>, ApiError> {
        let Some(_guard) = self.inner.deleting.try_acquire(scheduled_id) else {
            return Err(ApiError::AlreadyProcessing(format!(
                "scheduled event {}",
                scheduled_id
            )));
        };
        let event = self.lookup(scheduled_id)?;
        if !event.status.is_deletable() {
            return Err(ApiError::Conflict(format!(
                "Scheduled event {} is {} and cannot be deleted",
                scheduled_id, event.status
            )));
        }

        let ack = self
            .inner
            .backend
            .delete_scheduled_event(scheduled_id)
            .await?;
        info!("Deleted scheduled event {}", scheduled_id);

        self.inner
            .events
            .write_local(|events| events.retain(|e| e.scheduled_id != scheduled_id));
        {
            let mut selected = lock(&self.inner.selected);
            if selected.as_deref() == Some(scheduled_id) {
                *selected = None;
            }
        }
        Ok(Applied::new(ack, self.reconcile()))
    }

    /// Run the form checks and build the wire request.
    fn validated_request(&self, form: &ScheduleForm) -> Result<ScheduleRequest, ApiError> {
        let callers = self.inner.trunks.as_ref().map(TrunkRegistry::caller_numbers);
        let mut ctx = ValidationContext::new(unix_now(), self.inner.zone);
        if let Some(callers) = callers.as_deref() {
            ctx = ctx.with_caller_numbers(callers);
        }

        let report = validate_schedule_form(form, &ctx);
        if !report.valid {
            debug!("Rejected schedule form: {}", report.summary());
            return Err(ApiError::Validation(report));
        }
        let scheduled_time = validate_scheduled_time(&form.scheduled_time, &ctx)
            .map_err(|e| ApiError::invalid(field::SCHEDULED_TIME, e.to_string()))?;

        let mut request = form.to_request(scheduled_time);
        request.organization_id = self.inner.organization_id.clone();
        Ok(request)
    }

    fn lookup(&self, scheduled_id: &str) -> Result<ScheduledEvent, ApiError> {
        self.events()
            .iter()
            .find(|e| e.scheduled_id == scheduled_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Scheduled event", scheduled_id))
    }

    fn reconcile(&self) -> Reconciliation {
        let inner = Arc::clone(&self.inner);
        Reconciler::spawn("scheduled events", async move {
            inner.refresh(FetchMode::Background).await
        })
    }

    pub(crate) async fn refresh(&self, mode: FetchMode) -> Result<(), ApiError> {
        self.inner.refresh(mode).await
    }

    pub fn events(&self) -> Arc<Vec<ScheduledEvent>> {
        self.inner.events.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<ScheduledEvent>>> {
        self.inner.events.subscribe()
    }

    /// A form pre-filled from an event, for editing.
    pub fn edit_form(&self, scheduled_id: &str) -> Result<ScheduleForm, ApiError> {
        let event = self.lookup(scheduled_id)?;
        Ok(ScheduleForm::from_event(&event, self.inner.zone))
    }

    pub fn select(&self, scheduled_id: &str) -> Result<(), ApiError> {
        self.lookup(scheduled_id)?;
        *lock(&self.inner.selected) = Some(scheduled_id.to_string());
        Ok(())
    }

    /// The selected event, if it is still in the list.
    pub fn selected(&self) -> Option<ScheduledEvent> {
        let selected = lock(&self.inner.selected).clone()?;
        self.lookup(&selected).ok()
    }

    pub fn clear_selection(&self) {
        *lock(&self.inner.selected) = None;
    }

    pub fn set_filter(&self, term: impl Into<String>) {
        *lock(&self.inner.filter) = term.into();
    }

    /// Events matching the current filter term.
    pub fn filtered(&self) -> Vec<ScheduledEvent> {
        let term = lock(&self.inner.filter).clone();
        self.events()
            .iter()
            .filter(|e| e.matches(&term))
            .cloned()
            .collect()
    }

    pub fn is_deleting(&self, scheduled_id: &str) -> bool {
        self.inner.deleting.contains(scheduled_id)
    }

    /// Whether a create (`None`) or an update of `scheduled_id` is in flight.
    pub fn is_submitting(&self, scheduled_id: Option<&str>) -> bool {
        self.inner
            .submitting
            .contains(scheduled_id.unwrap_or(CREATE_KEY))
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner.last_error).clone()
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }
}
