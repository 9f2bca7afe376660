//! Wire protocol for the suggestion channel.
//!
//! Every frame is a JSON envelope `{type, data}`. Outbound frames report
//! user actions and suggestion responses; inbound frames carry generated
//! suggestions and confirmations. Unknown inbound types are logged and
//! dropped — never fatal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::{Hook, TriggerEvent};
use crate::error::ChannelError;
use crate::model::{ActionContext, ActionKind, EmailSummary, Suggestion};

// ── Outbound ────────────────────────────────────────────────────────

/// Client → service messages. Serializes to `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    UserAction(UserActionReport),
    SuggestionResponse {
        suggestion_id: String,
        accepted: bool,
    },
    CurrentWorkflows {
        workflows: Vec<HookSummary>,
    },
}

/// One tracked action as reported to the pattern-detection service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActionReport {
    pub action: ActionKind,
    pub email: EmailSummary,
    pub context: ActionContext,
    pub user_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Hook summary pushed after any hook mutation, so the service avoids
/// suggesting automation that already exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub trigger: TriggerEvent,
    pub enabled: bool,
}

impl From<&Hook> for HookSummary {
    fn from(hook: &Hook) -> Self {
        Self {
            id: hook.id.to_string(),
            name: hook.name.clone(),
            description: hook.description.clone(),
            trigger: hook.trigger,
            enabled: hook.enabled,
        }
    }
}

// ── Inbound ─────────────────────────────────────────────────────────

/// Service → client messages.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// A generated automation suggestion.
    Suggestion(Suggestion),
    /// Confirmation that an accepted suggestion was stored remotely.
    Confirmation { message: String },
    /// Acknowledgement of a reported user action.
    Ack,
}

#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parse one inbound frame.
///
/// `Ok(None)` means the type was unknown and the frame should be ignored;
/// `Err` means the frame was malformed (logged and dropped by the caller).
pub fn parse_inbound(text: &str) -> Result<Option<InboundMessage>, ChannelError> {
    let envelope: InboundEnvelope =
        serde_json::from_str(text).map_err(|e| ChannelError::Parse(e.to_string()))?;

    match envelope.kind.as_str() {
        "workflow_suggestion" => {
            let suggestion: Suggestion = serde_json::from_value(envelope.data)
                .map_err(|e| ChannelError::Parse(format!("bad workflow_suggestion: {e}")))?;
            Ok(Some(InboundMessage::Suggestion(suggestion)))
        }
        "suggestion_accepted" => {
            let message = envelope
                .data
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Automation rule created")
                .to_string();
            Ok(Some(InboundMessage::Confirmation { message }))
        }
        "user_action" => Ok(Some(InboundMessage::Ack)),
        other => {
            warn!(message_type = other, "Ignoring unknown channel message type");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::model::ViewLocation;

    #[test]
    fn user_action_envelope_shape() {
        let report = UserActionReport {
            action: ActionKind::Star,
            email: EmailSummary {
                id: "e1".into(),
                sender: "alice@example.com".into(),
                subject: "Hi".into(),
                labels: vec!["Work".into()],
            },
            context: ActionContext {
                location: ViewLocation::Home,
            },
            user_id: "u1".into(),
            session_id: "s1".into(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(OutboundMessage::UserAction(report)).unwrap();
        assert_eq!(json["type"], "user_action");
        assert_eq!(json["data"]["action"], "star");
        assert_eq!(json["data"]["email"]["id"], "e1");
        assert_eq!(json["data"]["context"]["location"], "home");
        assert_eq!(json["data"]["user_id"], "u1");
    }

    #[test]
    fn suggestion_response_envelope_shape() {
        let json = serde_json::to_value(OutboundMessage::SuggestionResponse {
            suggestion_id: "sug-1".into(),
            accepted: true,
        })
        .unwrap();
        assert_eq!(json["type"], "suggestion_response");
        assert_eq!(json["data"]["suggestion_id"], "sug-1");
        assert_eq!(json["data"]["accepted"], true);
    }

    #[test]
    fn current_workflows_envelope_shape() {
        let hook = Hook::new("h", "d", TriggerEvent::EmailReceived, "archive()");
        let json = serde_json::to_value(OutboundMessage::CurrentWorkflows {
            workflows: vec![HookSummary::from(&hook)],
        })
        .unwrap();
        assert_eq!(json["type"], "current_workflows");
        assert_eq!(json["data"]["workflows"][0]["name"], "h");
        assert_eq!(json["data"]["workflows"][0]["trigger"], "email_received");
    }

    #[test]
    fn parses_workflow_suggestion() {
        let frame = serde_json::json!({
            "type": "workflow_suggestion",
            "data": {
                "id": "sug-1",
                "description": "Auto-archive emails from this sender?",
                "confidence": 0.8,
                "reasoning": "You archived 3 emails from this sender",
                "generated_function": "archive()",
                "pattern_data": {"sender": "news@example.com"},
                "created_at": "2025-06-01T12:00:00Z"
            }
        })
        .to_string();

        match parse_inbound(&frame).unwrap() {
            Some(InboundMessage::Suggestion(s)) => {
                assert_eq!(s.id, "sug-1");
                assert!((s.confidence - 0.8).abs() < f32::EPSILON);
            }
            other => panic!("expected suggestion, got {other:?}"),
        }
    }

    #[test]
    fn parses_confirmation_with_default_message() {
        let frame = r#"{"type": "suggestion_accepted", "data": {}}"#;
        match parse_inbound(frame).unwrap() {
            Some(InboundMessage::Confirmation { message }) => {
                assert_eq!(message, "Automation rule created");
            }
            other => panic!("expected confirmation, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_ignored_not_fatal() {
        let frame = r#"{"type": "server_gossip", "data": {"x": 1}}"#;
        assert!(parse_inbound(frame).unwrap().is_none());
    }

    #[test]
    fn malformed_frame_is_a_parse_error() {
        assert!(matches!(
            parse_inbound("not json"),
            Err(ChannelError::Parse(_))
        ));
        // Right type, wrong payload shape
        let frame = r#"{"type": "workflow_suggestion", "data": {"id": 7}}"#;
        assert!(matches!(parse_inbound(frame), Err(ChannelError::Parse(_))));
    }
}
