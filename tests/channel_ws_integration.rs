//! Channel client integration tests against a mock suggestion service.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::timeout;

use mailflow::channel::{ChannelClient, InboundMessage, OutboundMessage, UserActionReport};
use mailflow::config::ChannelConfig;
use mailflow::model::{ActionContext, ActionKind, EmailSummary, ViewLocation};

use common::start_mock_service;

fn config_for(url: &str) -> ChannelConfig {
    ChannelConfig {
        url: url.to_string(),
        user_id: "test-user".to_string(),
        reconnect_base: Duration::from_millis(10),
        reconnect_cap: Duration::from_millis(50),
        max_reconnect_attempts: 3,
        ..ChannelConfig::default()
    }
}

fn sample_report() -> UserActionReport {
    UserActionReport {
        action: ActionKind::Archive,
        email: EmailSummary {
            id: "e1".into(),
            sender: "news@example.com".into(),
            subject: "Weekly Newsletter".into(),
            labels: vec![],
        },
        context: ActionContext {
            location: ViewLocation::Home,
        },
        user_id: "test-user".into(),
        session_id: "ignored".into(),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn connects_with_user_and_session_in_path() {
    let (url, service) = start_mock_service().await;
    let (inbound_tx, _inbound_rx) = mpsc::channel(8);
    let client = Arc::new(ChannelClient::new(config_for(&url), inbound_tx));

    let session_id = client.connect().await;
    service.wait_for_connections(1).await;

    let connections = service.connections().await;
    assert_eq!(connections[0].0, "test-user");
    assert_eq!(connections[0].1, session_id.to_string());

    client.disconnect().await;
}

#[tokio::test]
async fn outbound_messages_arrive_as_typed_envelopes() {
    let (url, service) = start_mock_service().await;
    let (inbound_tx, _inbound_rx) = mpsc::channel(8);
    let client = Arc::new(ChannelClient::new(config_for(&url), inbound_tx));
    client.connect().await;
    service.wait_for_connections(1).await;

    client
        .send(OutboundMessage::UserAction(sample_report()))
        .await;
    client
        .send(OutboundMessage::SuggestionResponse {
            suggestion_id: "sug-1".into(),
            accepted: true,
        })
        .await;

    let frames = service.wait_for_received(|f| f.len() >= 2).await;
    assert_eq!(frames[0]["type"], "user_action");
    assert_eq!(frames[0]["data"]["action"], "archive");
    assert_eq!(frames[0]["data"]["email"]["id"], "e1");
    assert_eq!(frames[1]["type"], "suggestion_response");
    assert_eq!(frames[1]["data"]["accepted"], true);

    client.disconnect().await;
}

#[tokio::test]
async fn inbound_suggestions_reach_the_consumer() {
    let (url, service) = start_mock_service().await;
    let (inbound_tx, mut inbound_rx) = mpsc::channel(8);
    let client = Arc::new(ChannelClient::new(config_for(&url), inbound_tx));
    client.connect().await;
    service.wait_for_connections(1).await;

    service.push(serde_json::json!({
        "type": "workflow_suggestion",
        "data": {
            "id": "sug-1",
            "description": "Auto-archive newsletters?",
            "confidence": 0.85,
            "generated_function": "archive()",
            "created_at": "2025-06-01T12:00:00Z"
        }
    }));

    let message = timeout(Duration::from_secs(5), inbound_rx.recv())
        .await
        .expect("inbound message within 5s")
        .expect("channel open");
    match message {
        InboundMessage::Suggestion(s) => assert_eq!(s.id, "sug-1"),
        other => panic!("expected suggestion, got {other:?}"),
    }

    client.disconnect().await;
}

#[tokio::test]
async fn malformed_and_unknown_frames_do_not_kill_the_connection() {
    let (url, service) = start_mock_service().await;
    let (inbound_tx, mut inbound_rx) = mpsc::channel(8);
    let client = Arc::new(ChannelClient::new(config_for(&url), inbound_tx));
    client.connect().await;
    service.wait_for_connections(1).await;

    service.push_raw("this is not json");
    service.push(serde_json::json!({"type": "server_gossip", "data": {}}));
    tokio::time::sleep(Duration::from_millis(100)).await;
    service.push(serde_json::json!({
        "type": "suggestion_accepted",
        "data": {"message": "saved"}
    }));

    // The bad frames were dropped; the good one still arrives.
    let message = timeout(Duration::from_secs(5), inbound_rx.recv())
        .await
        .expect("inbound message within 5s")
        .expect("channel open");
    match message {
        InboundMessage::Confirmation { message } => assert_eq!(message, "saved"),
        other => panic!("expected confirmation, got {other:?}"),
    }

    client.disconnect().await;
}

#[tokio::test]
async fn reconnects_when_the_server_drops_the_connection() {
    let (url, service) = start_mock_service().await;
    service.reject_clients(true);

    let (inbound_tx, _inbound_rx) = mpsc::channel(8);
    let client = Arc::new(ChannelClient::new(config_for(&url), inbound_tx));
    client.connect().await;

    // Every accepted connection is dropped immediately; each handshake
    // still succeeds, so the attempt counter resets and the client keeps
    // coming back.
    service.wait_for_connections(3).await;

    client.disconnect().await;
}

#[tokio::test]
async fn recovers_and_delivers_after_a_dropped_connection() {
    let (url, service) = start_mock_service().await;
    service.reject_clients(true);

    let (inbound_tx, mut inbound_rx) = mpsc::channel(8);
    let client = Arc::new(ChannelClient::new(config_for(&url), inbound_tx));
    client.connect().await;
    service.wait_for_connections(1).await;

    // Heal the server; the next reconnect sticks and traffic flows again.
    service.reject_clients(false);
    service.wait_for_connections(2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    service.push(serde_json::json!({
        "type": "suggestion_accepted",
        "data": {"message": "still here"}
    }));

    let message = timeout(Duration::from_secs(5), inbound_rx.recv())
        .await
        .expect("inbound message within 5s")
        .expect("channel open");
    assert!(matches!(message, InboundMessage::Confirmation { .. }));

    client.disconnect().await;
}
