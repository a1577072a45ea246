//! Read-only agent directory used to populate selections.

use std::sync::{Arc, Mutex};

use telephony_core::{Agent, ApiError, TelephonyBackend};
use tokio::sync::watch;
use tracing::warn;

use crate::store::{FetchMode, SnapshotStore};

/// Agents of one organization.
#[derive(Clone)]
pub struct AgentDirectory {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn TelephonyBackend>,
    organization_id: String,
    agents: SnapshotStore<Vec<Agent>>,
    last_error: Mutex<Option<String>>,
}

impl AgentDirectory {
    pub fn new(backend: Arc<dyn TelephonyBackend>, organization_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                organization_id: organization_id.into(),
                agents: SnapshotStore::new("agents"),
                last_error: Mutex::new(None),
            }),
        }
    }

    /// Fetch the directory. A failure leaves an empty list and retains the
    /// error for display.
    pub async fn load(&self) -> Arc<Vec<Agent>> {
        let _ = self.refresh().await;
        self.agents()
    }

    pub(crate) async fn refresh(&self) -> Result<(), ApiError> {
        let inner = &self.inner;
        let ticket = inner.agents.begin_fetch();
        let result = inner
            .backend
            .list_agents(&inner.organization_id)
            .await
            .inspect_err(|e| warn!("Failed to load agents for {}: {}", inner.organization_id, e));

        let settled = inner
            .agents
            .settle(ticket, FetchMode::Load, result, |current, agents| *current = agents);
        *inner.last_error.lock().unwrap_or_else(|e| e.into_inner()) =
            settled.error.as_ref().map(ApiError::user_message);
        settled.into_result()
    }

    pub fn agents(&self) -> Arc<Vec<Agent>> {
        self.inner.agents.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Agent>>> {
        self.inner.agents.subscribe()
    }

    pub fn find(&self, agent_prefix: &str) -> Option<Agent> {
        self.agents()
            .iter()
            .find(|a| a.agent_prefix == agent_prefix)
            .cloned()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
