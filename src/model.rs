//! Core data model — tracked actions, suggestions, and context snapshots.

use chrono::{DateTime, Datelike, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};

// ── Tracked actions ─────────────────────────────────────────────────

/// A user gesture on an email, as tracked by the UI layer.
///
/// Ephemeral: created per gesture, batched, serialized onto the wire,
/// and never persisted locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEvent {
    pub action: ActionKind,
    pub email: EmailSummary,
    pub context: ActionContext,
}

/// The slice of an email that travels with a tracked action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub labels: Vec<String>,
}

/// Where in the UI the gesture happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionContext {
    pub location: ViewLocation,
}

/// UI surface an action originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewLocation {
    Home,
    Detail,
}

/// Every action kind the UI can report, including the undo mirror of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Archive,
    Delete,
    Star,
    Unstar,
    MarkRead,
    MarkUnread,
    AddLabel,
    RemoveLabel,
    MoveToInbox,
    MoveToSpam,
    MoveToTrash,
    MoveToArchive,
    UndoArchive,
    UndoDelete,
    UndoStar,
    UndoUnstar,
    UndoMarkRead,
    UndoMarkUnread,
    UndoAddLabel,
    UndoRemoveLabel,
    UndoMoveToInbox,
    UndoMoveToSpam,
    UndoMoveToTrash,
    UndoMoveToArchive,
}

impl ActionKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Delete => "delete",
            Self::Star => "star",
            Self::Unstar => "unstar",
            Self::MarkRead => "mark_read",
            Self::MarkUnread => "mark_unread",
            Self::AddLabel => "add_label",
            Self::RemoveLabel => "remove_label",
            Self::MoveToInbox => "move_to_inbox",
            Self::MoveToSpam => "move_to_spam",
            Self::MoveToTrash => "move_to_trash",
            Self::MoveToArchive => "move_to_archive",
            Self::UndoArchive => "undo_archive",
            Self::UndoDelete => "undo_delete",
            Self::UndoStar => "undo_star",
            Self::UndoUnstar => "undo_unstar",
            Self::UndoMarkRead => "undo_mark_read",
            Self::UndoMarkUnread => "undo_mark_unread",
            Self::UndoAddLabel => "undo_add_label",
            Self::UndoRemoveLabel => "undo_remove_label",
            Self::UndoMoveToInbox => "undo_move_to_inbox",
            Self::UndoMoveToSpam => "undo_move_to_spam",
            Self::UndoMoveToTrash => "undo_move_to_trash",
            Self::UndoMoveToArchive => "undo_move_to_archive",
        }
    }

    /// Whether this kind is intentional enough to trigger local
    /// `user_action` hook execution. Everything else is still reported
    /// over the channel but never analyzed locally.
    pub fn is_intentional(&self) -> bool {
        matches!(
            self,
            Self::Star
                | Self::Unstar
                | Self::Delete
                | Self::Archive
                | Self::AddLabel
                | Self::RemoveLabel
                | Self::MarkRead
                | Self::MarkUnread
                | Self::MoveToSpam
                | Self::MoveToTrash
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Suggestions ─────────────────────────────────────────────────────

/// A remotely generated candidate automation, awaiting accept/reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub description: String,
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: String,
    pub generated_function: String,
    #[serde(default)]
    pub pattern_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ── Context snapshot ────────────────────────────────────────────────

/// Read-only execution context, computed fresh at each dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub user_id: String,
    pub location: ViewLocation,
    /// Local hour of day, 0–23.
    pub time_of_day: u32,
    /// Local day of week, 0–6 with 0 = Sunday.
    pub day_of_week: u32,
    pub session_id: String,
}

impl ContextSnapshot {
    /// Capture the current local time for a dispatch.
    pub fn capture(user_id: &str, location: ViewLocation, session_id: &str) -> Self {
        let now = Local::now();
        Self {
            user_id: user_id.to_string(),
            location,
            time_of_day: now.hour(),
            day_of_week: now.weekday().num_days_from_sunday(),
            session_id: session_id.to_string(),
        }
    }

    pub fn is_weekend(&self) -> bool {
        self.day_of_week == 0 || self.day_of_week == 6
    }

    pub fn is_business_hours(&self) -> bool {
        !self.is_weekend() && (9..17).contains(&self.time_of_day)
    }
}
