//! Integration tests for telephony-api against a mock HTTP server.
//!
//! Run:
//!   cargo test -p telephony-api --test integration_tests

use mockito::{Matcher, Server};
use serde_json::json;
use telephony_api::{ApiConfig, TelephonyClient};
use telephony_core::{
    ApiError, CallType, CreateTrunkRequest, EventStatus, ScheduleRequest, TelephonyBackend,
    Transport,
};

fn client_for(server: &Server) -> TelephonyClient {
    let config = ApiConfig::new(server.url()).with_api_key("test-key");
    TelephonyClient::new(config).unwrap()
}

fn sample_request() -> ScheduleRequest {
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

mod phone_number_tests {
    use super::*;

    #[tokio::test]
    async fn test_organization_numbers_sends_api_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/phone-numbers/by-org/org1")
            .match_header("x-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "phone_numbers": [
                        {"phone_number": "+15551230000", "phone_id": "p1", "agent_id": "agentA"},
                        {"phone_number": "+15551230001", "phone_id": "p2"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let numbers = client.organization_numbers("org1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers[0].assigned_agent(), Some("agentA"));
        assert_eq!(numbers[0].organization_id, "org1");
        assert!(!numbers[1].is_assigned());
    }

    #[tokio::test]
    async fn test_legacy_agent_map_accepted() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/phone-numbers/by-org/org1")
            .with_status(200)
            .with_body(
                json!({
                    "agentA": {"phone_number": "+15551230000"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let numbers = client.organization_numbers("org1").await.unwrap();

        assert_eq!(numbers.len(), 1);
        assert_eq!(numbers[0].assigned_agent(), Some("agentA"));
        assert_eq!(numbers[0].resolved_phone_id(), None);
    }

    #[tokio::test]
    async fn test_assign_posts_agent_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/phone-numbers/p1/assign")
            .match_body(Matcher::Json(json!({"agent_id": "agentA"})))
            .with_status(200)
            .with_body(json!({"success": true, "message": "assigned"}).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let ack = client.assign_number("p1", "agentA").await.unwrap();

        mock.assert_async().await;
        assert_eq!(ack.message.as_deref(), Some("assigned"));
    }

    #[tokio::test]
    async fn test_unassign_rejection_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/phone-numbers/p1/unassign")
            .with_status(200)
            .with_body(
                json!({"success": false, "message": "Phone number not found"}).to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.unassign_number("p1", "agentA").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_available_numbers_never_assigned() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/phone-numbers/available")
            .with_status(200)
            .with_body(
                json!({"phone_numbers": [{"phone_number": "+15551230009", "agent_id": "x"}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let pool = client.available_numbers().await.unwrap();
        assert_eq!(pool.len(), 1);
        assert!(!pool[0].is_assigned());
    }
}

mod trunk_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_trunks() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/outbound/trunks/organization/org1")
            .with_status(200)
            .with_body(
                json!({"trunks": [
                    {"trunk_id": "t1", "phone_number": "+15559870000", "transport": "tcp"},
                    {"trunk_id": "t2"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let trunks = client.list_trunks("org1").await.unwrap();

        assert_eq!(trunks.len(), 1);
        assert_eq!(trunks[0].transport, Transport::Tcp);
        assert_eq!(trunks[0].organization_id, "org1");
    }

    #[tokio::test]
    async fn test_create_trunk_echo() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/outbound/trunks/create")
            .match_body(Matcher::PartialJson(json!({
                "organization_id": "org1",
                "phone_number": "+15559870000",
                "transport": "udp"
            })))
            .with_status(200)
            .with_body(
                json!({"success": true, "trunk": {"trunk_id": "t9", "phone_number": "+15559870000"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let request = CreateTrunkRequest {
            organization_id: "org1".to_string(),
            phone_number: "+15559870000".to_string(),
            transport: Transport::Udp,
        };
        let trunk = client.create_trunk(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(trunk.map(|t| t.trunk_id), Some("t9".to_string()));
    }

    #[tokio::test]
    async fn test_delete_trunk_empty_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/outbound/trunks/t1")
            .with_status(204)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.delete_trunk("t1").await.is_ok());
    }
}

mod scheduled_event_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_skips_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/scheduled-events/by-org/org1")
            .with_status(200)
            .with_body(
                json!({"scheduled_events": [
                    {
                        "scheduled_id": "s1",
                        "organization_id": "org1",
                        "agent_id": "agentA",
                        "call_type": "outbound_call",
                        "recipient_phone": "+15551230000",
                        "caller_number": "+15559870000",
                        "scheduled_time": "1800000000",
                        "status": "scheduled"
                    },
                    {"scheduled_id": "broken"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let events = client.list_scheduled_events("org1").await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].scheduled_time, 1_800_000_000);
        assert_eq!(events[0].status, EventStatus::Scheduled);
        assert_eq!(events[0].max_retries, 3);
    }

    #[tokio::test]
    async fn test_create_sends_full_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/scheduled-events")
            .match_body(Matcher::Json(json!({
                "organization_id": "org1",
                "agent_id": "agentA",
                "call_type": "outbound_call",
                "recipient_phone": "+15551230000",
                "scheduled_time": 1_800_000_000,
                "caller_number": "+15559870000",
                "retry_interval_minutes": 5,
                "max_retries": 3
            })))
            .with_status(201)
            .with_body(json!({"success": true}).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        client.create_scheduled_event(&sample_request()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_conflict_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/scheduled-events/s1")
            .with_status(409)
            .with_body(json!({"message": "Event already in progress"}).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .update_scheduled_event("s1", &sample_request())
            .await
            .unwrap_err();
        match err {
            ApiError::Conflict(msg) => assert_eq!(msg, "Event already in progress"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_not_found_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/scheduled-events/s404")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.delete_scheduled_event("s404").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/scheduled-events/by-org/org1")
            .with_status(503)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.list_scheduled_events("org1").await.unwrap_err();
        assert!(err.is_transient());
    }
}

mod connection_tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let client = TelephonyClient::new(ApiConfig::new("http://127.0.0.1:59999")).unwrap();
        let err = client.available_numbers().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "got {:?}", err);
    }
}
