//! SIP trunk registry: list, create, delete, and the caller-number source.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use telephony_core::validation::{field, normalize_e164, validate_phone};
use telephony_core::{Ack, ApiError, CreateTrunkRequest, TelephonyBackend, Transport, Trunk};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::inflight::InFlight;
use crate::notice::NoticeBoard;
use crate::reconciler::{Applied, Reconciler, Reconciliation};
use crate::store::{FetchMode, SnapshotStore};

/// Trunks of one organization.
///
/// Every mutation is followed by a full list refresh; the list is never
/// patched locally. A failed load shows an empty list and keeps the error.
/// A failed refresh after a mutation keeps the list and the error.
#[derive(Clone)]
pub struct TrunkRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn TelephonyBackend>,
    organization_id: String,
    trunks: SnapshotStore<Vec<Trunk>>,
    last_error: Mutex<Option<String>>,
    deleting: InFlight,
    notices: NoticeBoard,
}

impl Inner {
    async fn refresh(&self, mode: FetchMode) -> Result<(), ApiError> {
        let ticket = self.trunks.begin_fetch();
        let result = self
            .backend
            .list_trunks(&self.organization_id)
            .await
            .inspect_err(|e| warn!("Failed to list trunks for {}: {}", self.organization_id, e));
        let settled = self
            .trunks
            .settle(ticket, mode, result, |current, trunks| *current = trunks);
        if settled.current {
            *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) =
                settled.error.as_ref().map(ApiError::user_message);
        }
        settled.into_result()
    }
}

impl TrunkRegistry {
    pub fn new(
        backend: Arc<dyn TelephonyBackend>,
        organization_id: impl Into<String>,
        notices: NoticeBoard,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                organization_id: organization_id.into(),
                trunks: SnapshotStore::new("trunks"),
                last_error: Mutex::new(None),
                deleting: InFlight::new(),
                notices,
            }),
        }
    }

    /// Fetch the trunk list and return it.
    pub async fn list_trunks(&self) -> Arc<Vec<Trunk>> {
        let _ = self.inner.refresh(FetchMode::Load).await;
        self.trunks()
    }

    /// Create a trunk for `phone_number`.
    ///
    /// The number is normalized to E.164 by prefixing `+` when missing. A
    /// number that already has a trunk in this organization is rejected
    /// before any network call.
    pub async fn create_trunk(
        &self,
        phone_number: &str,
        transport: Transport,
    ) -> Result<Applied<Option<Trunk>>, ApiError> {
        let result = self.try_create(phone_number, transport).await;
        match &result {
            Ok(_) => self.inner.notices.success("Trunk created successfully"),
            Err(e) => self.inner.notices.failure(e),
        }
        result
    }

    async fn try_create(
        &self,
        phone_number: &str,
        transport: Transport,
    ) -> Result<Applied<Option<Trunk>>, ApiError> {
        let phone_number = normalize_e164(phone_number);
        validate_phone(&phone_number, "Phone number")
            .map_err(|e| ApiError::invalid(field::PHONE_NUMBER, e.to_string()))?;
        if self.trunks().iter().any(|t| t.phone_number == phone_number) {
            return Err(ApiError::Conflict(format!(
                "A trunk already exists for {}",
                phone_number
            )));
        }

        let request = CreateTrunkRequest {
            organization_id: self.inner.organization_id.clone(),
            phone_number,
            transport,
        };
        let created = self.inner.backend.create_trunk(&request).await?;
        info!("Created trunk for {} ({})", request.phone_number, transport);
        Ok(Applied::new(created, self.reconcile()))
    }

    /// Delete a trunk. A second delete of the same id while the first is in
    /// flight is rejected locally.
    pub async fn delete_trunk(&self, trunk_id: &str) -> Result<Applied<Ack>, ApiError> {
        let result = self.try_delete(trunk_id).await;
        match &result {
            Ok(_) => self.inner.notices.success("Trunk deleted successfully"),
            Err(e) => self.inner.notices.failure(e),
        }
        result
    }

    async fn try_delete(&self, trunk_id: &str) -> Result<Applied<Ack>, ApiError> {
        let Some(_guard) = self.inner.deleting.try_acquire(trunk_id) else {
            return Err(ApiError::AlreadyProcessing(format!("trunk {}", trunk_id)));
        };

        let ack = self.inner.backend.delete_trunk(trunk_id).await?;
        info!("Deleted trunk {}", trunk_id);
        Ok(Applied::new(ack, self.reconcile()))
    }

    fn reconcile(&self) -> Reconciliation {
        let inner = Arc::clone(&self.inner);
        Reconciler::spawn("trunks", async move {
            inner.refresh(FetchMode::Background).await
        })
    }

    pub(crate) async fn refresh(&self, mode: FetchMode) -> Result<(), ApiError> {
        self.inner.refresh(mode).await
    }

    pub fn trunks(&self) -> Arc<Vec<Trunk>> {
        self.inner.trunks.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Trunk>>> {
        self.inner.trunks.subscribe()
    }

    /// Distinct trunk numbers, in list order, for the caller-number choice.
    pub fn caller_numbers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.trunks()
            .iter()
            .filter(|t| seen.insert(t.phone_number.clone()))
            .map(|t| t.phone_number.clone())
            .collect()
    }

    pub fn is_deleting_trunk(&self, trunk_id: &str) -> bool {
        self.inner.deleting.contains(trunk_id)
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }
}
