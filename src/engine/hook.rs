//! Hook model — a persisted, user-or-suggestion-authored rule bound to
//! one trigger event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The class of occurrence that makes a hook eligible to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    EmailReceived,
    EmailClosed,
    UserAction,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailReceived => "email_received",
            Self::EmailClosed => "email_closed",
            Self::UserAction => "user_action",
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_received" => Ok(Self::EmailReceived),
            "email_closed" => Ok(Self::EmailClosed),
            "user_action" => Ok(Self::UserAction),
            other => Err(format!("unknown trigger event: {other}")),
        }
    }
}

/// A persisted automation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub trigger: TriggerEvent,
    pub enabled: bool,
    /// Rule body in the mailflow rule language.
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub execution_count: u64,
    pub last_executed: Option<DateTime<Utc>>,
}

impl Hook {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        trigger: TriggerEvent,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            trigger,
            enabled: true,
            source: source.into(),
            created_at: Utc::now(),
            execution_count: 0,
            last_executed: None,
        }
    }
}

/// Outcome of one hook execution. Consumed once by the action applier,
/// never persisted.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub hook_id: Uuid,
    pub hook_name: String,
    pub success: bool,
    /// Declared intents, in the order the rule recorded them.
    pub actions_taken: Vec<String>,
    pub email_id: Option<String>,
    pub error: Option<String>,
    pub execution_time: std::time::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_round_trips() {
        for trigger in [
            TriggerEvent::EmailReceived,
            TriggerEvent::EmailClosed,
            TriggerEvent::UserAction,
        ] {
            let parsed: TriggerEvent = trigger.as_str().parse().unwrap();
            assert_eq!(parsed, trigger);
        }
        assert!("email_starred".parse::<TriggerEvent>().is_err());
    }

    #[test]
    fn hook_serializes_timestamps_as_rfc3339() {
        let hook = Hook::new("n", "d", TriggerEvent::EmailReceived, "archive()");
        let json = serde_json::to_value(&hook).unwrap();
        assert_eq!(json["trigger"], "email_received");
        // chrono's serde writes RFC 3339 strings
        assert!(json["created_at"].as_str().unwrap().contains('T'));
        assert!(json["last_executed"].is_null());

        let back: Hook = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, hook.id);
        assert_eq!(back.execution_count, 0);
    }
}
