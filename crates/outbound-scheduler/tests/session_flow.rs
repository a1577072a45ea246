//! End-to-end flows through an OutboundSession backed by the in-memory
//! backend.
//!
//! Run:
//!   cargo test -p outbound-scheduler --test session_flow

use std::sync::Arc;
use std::time::Duration;

use mock_backend::{InMemoryBackend, Operation};
use outbound_scheduler::{
    ApiError, EventStatus, InputZone, OutboundSession, OutboundTab, Outcome, PhoneNumber,
    ScheduleForm, SchedulerSettings, Transport,
};
use telephony_core::{unix_now, Agent};

const ORG: &str = "org1";

fn settings() -> SchedulerSettings {
    SchedulerSettings::default()
        .with_zone(InputZone::utc())
        .with_notice_window(Duration::from_secs(5))
}

fn backend() -> Arc<InMemoryBackend> {
    Arc::new(
        InMemoryBackend::new()
            .with_agents(vec![
                Agent::new("agentA", ORG).with_name("Sales"),
                Agent::new("agentB", ORG),
            ])
            .with_organization_numbers(vec![PhoneNumber::new("+15551230000")
                .with_phone_id("p1")
                .with_organization(ORG)])
            .with_available_pool(vec![PhoneNumber::new("+15551230007").with_phone_id("p7")]),
    )
}

fn schedule_form(caller: &str) -> ScheduleForm {
    ScheduleForm {
        agent_prefix: "agentA".to_string(),
        recipient_phone: "+15557654321".to_string(),
        caller_number: caller.to_string(),
        scheduled_time: (unix_now() + 600).to_string(),
        retry_interval_minutes: 5,
        max_retries: 2,
        ..ScheduleForm::for_organization(ORG)
    }
}

#[tokio::test]
async fn test_trunk_then_schedule_from_its_number() {
    let backend = backend();
    let session = OutboundSession::new(backend.clone(), ORG, settings());
    session.load_all().await;

    session
        .trunks
        .create_trunk("15559870000", Transport::Tcp)
        .await
        .unwrap()
        .reconciliation
        .settled()
        .await;
    assert_eq!(session.trunks.caller_numbers(), vec!["+15559870000".to_string()]);

    let mut unknown_caller = schedule_form("+15550000000");
    assert!(matches!(
        session.events.create(&mut unknown_caller).await,
        Err(ApiError::Validation(_))
    ));
    assert_eq!(backend.calls(Operation::CreateEvent), 0);

    let mut form = schedule_form("+15559870000");
    session
        .events
        .create(&mut form)
        .await
        .unwrap()
        .reconciliation
        .settled()
        .await;

    let events = session.events.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Scheduled);
    assert_eq!(events[0].caller_number, "+15559870000");
    assert_eq!(events[0].organization_id, ORG);
}

#[tokio::test]
async fn test_assignment_round_trip_keeps_ids() {
    let backend = backend();
    let session = OutboundSession::new(backend.clone(), ORG, settings());
    session.load_all().await;

    let mut updates = session.phones.subscribe();
    updates.borrow_and_update();

    // From the pool.
    let applied = session.phones.assign("+15551230007", "agentB").await.unwrap();
    assert!(updates.has_changed().unwrap());
    for (source, result) in applied.reconciliation.settled().await {
        assert!(result.is_ok(), "{} refresh failed", source);
    }

    let book = session.phones.book();
    for phone in book.numbers().iter().filter(|p| p.is_assigned()) {
        assert!(phone.resolved_phone_id().is_some(), "{} has no id", phone.phone_number);
    }
    assert_eq!(
        book.find("+15551230007").and_then(|p| p.assigned_agent()),
        Some("agentB")
    );

    session
        .phones
        .unassign("+15551230007", "")
        .await
        .unwrap()
        .reconciliation
        .settled()
        .await;
    let book = session.phones.book();
    assert!(book.assigned_to("agentB").is_empty());
    assert_eq!(book.find("p7").map(|p| p.is_assigned()), Some(false));

    let second = session.phones.unassign("+15551230007", "").await;
    assert!(matches!(second, Err(ApiError::NotFound(_))));
    assert_eq!(backend.calls(Operation::Unassign), 1);
}

#[tokio::test]
async fn test_notices_are_independent_per_concern() {
    let backend = backend();
    let session = OutboundSession::new(backend.clone(), ORG, settings());
    session.load_all().await;

    let mut form = schedule_form("");
    let result = session.events.create(&mut form).await;
    let outcome = Outcome::from_result(&result, "Scheduled event created successfully");
    assert!(!outcome.success);
    assert!(session.events.notices().current().unwrap().is_error());

    session.phones.assign("p1", "agentA").await.unwrap();
    assert!(!session.phones.notices().current().unwrap().is_error());
    assert!(session.events.notices().current().unwrap().is_error());
    assert!(session.trunks.notices().current().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_notices_expire_after_window() {
    let session = OutboundSession::new(backend(), ORG, settings());
    session.load_all().await;

    session.phones.assign("p1", "agentA").await.unwrap();
    assert!(session.phones.notices().current().is_some());

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(session.phones.notices().current().is_none());
}

#[tokio::test]
async fn test_outbound_tab_persists_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outbound.json");

    let session = OutboundSession::new(backend(), ORG, settings().with_preferences_path(&path));
    assert_eq!(session.preferences.outbound_tab().await, OutboundTab::Trunk);
    session.preferences.set_outbound_tab(OutboundTab::Call).await;

    let reopened = OutboundSession::new(backend(), ORG, settings().with_preferences_path(&path));
    assert_eq!(reopened.preferences.outbound_tab().await, OutboundTab::Call);
}
