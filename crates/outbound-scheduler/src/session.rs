//! One organization's outbound view: every store behind a single handle.

use std::sync::Arc;
use std::time::Duration;

use telephony_core::{ApiError, TelephonyBackend};
use tracing::info;

use crate::agents::AgentDirectory;
use crate::config::SchedulerSettings;
use crate::notice::NoticeBoard;
use crate::phone_store::PhoneAssignmentStore;
use crate::preferences::PreferenceStore;
use crate::reconciler::LiveRefresh;
use crate::scheduled::ScheduledEventManager;
use crate::store::FetchMode;
use crate::trunks::TrunkRegistry;

/// Stores for one organization, sharing a backend.
///
/// Each concern keeps its own notice board so an assignment error never
/// replaces a scheduling success and the other way round.
#[derive(Clone)]
pub struct OutboundSession {
    organization_id: String,
    settings: SchedulerSettings,
    pub agents: AgentDirectory,
    pub trunks: TrunkRegistry,
    pub phones: PhoneAssignmentStore,
    pub events: ScheduledEventManager,
    pub preferences: Arc<PreferenceStore>,
}

impl OutboundSession {
    pub fn new(
        backend: Arc<dyn TelephonyBackend>,
        organization_id: impl Into<String>,
        settings: SchedulerSettings,
    ) -> Self {
        let organization_id = organization_id.into();
        let window = settings.notice_window;

        let trunks = TrunkRegistry::new(
            Arc::clone(&backend),
            organization_id.clone(),
            NoticeBoard::new(window),
        );
        let events = ScheduledEventManager::with_trunks(
            Arc::clone(&backend),
            organization_id.clone(),
            settings.zone,
            trunks.clone(),
            NoticeBoard::new(window),
        );
        let phones = PhoneAssignmentStore::new(
            Arc::clone(&backend),
            organization_id.clone(),
            NoticeBoard::new(window),
        );
        let agents = AgentDirectory::new(backend, organization_id.clone());
        let preferences = Arc::new(match &settings.preferences_path {
            Some(path) => PreferenceStore::with_file(path),
            None => PreferenceStore::new(),
        });

        Self {
            organization_id,
            settings,
            agents,
            trunks,
            phones,
            events,
            preferences,
        }
    }

    /// Override the live refresh period.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.settings.refresh_interval = interval;
        self
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Fetch every collection concurrently.
    ///
    /// Each source degrades to empty on its own; the result lists each
    /// source with its fetch result.
    pub async fn load_all(&self) -> Vec<(&'static str, Result<(), ApiError>)> {
        let (agents, trunks, phones, events) = tokio::join!(
            self.agents.refresh(),
            self.trunks.refresh(FetchMode::Load),
            self.phones.refresh(FetchMode::Load),
            self.events.refresh(FetchMode::Load),
        );
        let results = vec![
            ("agents", agents),
            ("trunks", trunks),
            ("phone numbers", phones),
            ("scheduled events", events),
        ];
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!(
            "Loaded outbound view for {} ({} of {} sources failed)",
            self.organization_id,
            failed,
            results.len()
        );
        results
    }

    /// Refresh scheduled events and phone numbers every refresh interval
    /// until the returned handle is stopped or dropped. A failed tick keeps
    /// the lists as they are.
    pub fn start_live_refresh(&self) -> LiveRefresh {
        let phones = self.phones.clone();
        let events = self.events.clone();
        LiveRefresh::start(self.settings.refresh_interval, move || {
            let phones = phones.clone();
            let events = events.clone();
            async move {
                let _ = tokio::join!(
                    events.refresh(FetchMode::Background),
                    phones.refresh(FetchMode::Background)
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use mock_backend::{InMemoryBackend, Operation};
    use telephony_core::{Agent, PhoneNumber};

    use super::*;

    fn session_for(backend: Arc<InMemoryBackend>) -> OutboundSession {
        let settings =
            SchedulerSettings::default().with_refresh_interval(Duration::from_secs(30));
        OutboundSession::new(backend, "org1", settings)
    }

    #[tokio::test]
    async fn test_load_all_reports_each_source() {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_agents(vec![Agent::new("agentA", "org1")])
                .with_organization_numbers(vec![
                    PhoneNumber::new("+15551230000").with_organization("org1")
                ]),
        );
        backend.fail_next(Operation::ListTrunks, ApiError::Network("down".to_string()));
        let session = session_for(backend);

        let results = session.load_all().await;
        let failed: Vec<_> = results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(source, _)| *source)
            .collect();
        assert_eq!(failed, vec!["trunks"]);
        assert_eq!(session.agents.agents().len(), 1);
        assert_eq!(session.phones.book().numbers().len(), 1);
        assert!(session.trunks.last_error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_refresh_ticks_until_stopped() {
        let backend = Arc::new(InMemoryBackend::new());
        let session = session_for(backend.clone());
        session.load_all().await;
        assert_eq!(backend.calls(Operation::ListEvents), 1);

        let mut events = session.events.subscribe();
        events.borrow_and_update();
        let live = session.start_live_refresh();

        events.changed().await.unwrap();
        assert_eq!(backend.calls(Operation::ListEvents), 2);
        assert!(live.is_running());

        live.stop();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(backend.calls(Operation::ListEvents), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_refresh() {
        let backend = Arc::new(InMemoryBackend::new());
        let session = session_for(backend.clone());

        drop(session.start_live_refresh());
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(backend.calls(Operation::ListEvents), 0);
    }
}
