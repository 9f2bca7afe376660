//! Action applier — second phase of hook execution.
//!
//! Hook rules never touch the mailbox directly; they record intent
//! tokens against a read-only email view. The applier maps each token
//! onto a mailbox operation and raises one toast per hook that actually
//! changed something. Unknown tokens and mailbox failures are logged and
//! skipped, never fatal.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::WorkflowResult;
use crate::error::MailboxError;
use crate::mailbox::{Mailbox, MailboxLocation};
use crate::notify::{Notifier, Toast};

pub struct ActionApplier {
    mailbox: Arc<dyn Mailbox>,
    notifier: Arc<dyn Notifier>,
}

impl ActionApplier {
    pub fn new(mailbox: Arc<dyn Mailbox>, notifier: Arc<dyn Notifier>) -> Self {
        Self { mailbox, notifier }
    }

    /// Apply a batch of hook results. Failed results carry no intents
    /// and are skipped; each successful result with at least one applied
    /// action raises a single toast.
    pub async fn apply(&self, results: &[WorkflowResult]) {
        for result in results.iter().filter(|r| r.success) {
            self.apply_one(result).await;
        }
    }

    async fn apply_one(&self, result: &WorkflowResult) {
        let Some(email_id) = result.email_id.as_deref() else {
            return;
        };

        let mut applied = Vec::new();
        for token in &result.actions_taken {
            match self.apply_token(email_id, token).await {
                Ok(Some(description)) => applied.push(description),
                Ok(None) => {}
                Err(e) => {
                    warn!(email_id, token = %token, error = %e, "Mailbox operation failed");
                }
            }
        }

        if applied.is_empty() {
            return;
        }

        debug!(
            email_id,
            hook = %result.hook_name,
            actions = applied.len(),
            "Applied hook actions"
        );
        self.notifier
            .add(Toast::new(
                format!("Automation: {}", result.hook_name),
                applied.join(", "),
            ))
            .await;
    }

    /// Map one intent token onto a mailbox operation.
    ///
    /// Returns the human-readable description of what happened, or
    /// `None` for tokens this client does not understand.
    async fn apply_token(
        &self,
        email_id: &str,
        token: &str,
    ) -> Result<Option<String>, MailboxError> {
        if let Some(label) = token.strip_prefix("add_label:") {
            self.mailbox.add_tag(email_id, label).await?;
            return Ok(Some(format!("added label \"{label}\"")));
        }
        if let Some(label) = token.strip_prefix("remove_label:") {
            self.mailbox.remove_tag(email_id, label).await?;
            return Ok(Some(format!("removed label \"{label}\"")));
        }

        let description = match token {
            "archive" => {
                self.mailbox.move_to(email_id, MailboxLocation::Archive).await?;
                "archived"
            }
            // Soft delete: automation never destroys mail outright.
            "delete" | "move_to_trash" => {
                self.mailbox.move_to(email_id, MailboxLocation::Trash).await?;
                "moved to trash"
            }
            "move_to_spam" => {
                self.mailbox.move_to(email_id, MailboxLocation::Spam).await?;
                "moved to spam"
            }
            "star" => {
                self.mailbox.toggle_star(email_id).await?;
                "starred"
            }
            "unstar" => {
                self.mailbox.toggle_star(email_id).await?;
                "unstarred"
            }
            "mark_read" => {
                self.mailbox.set_read(email_id, true).await?;
                "marked read"
            }
            "mark_unread" => {
                self.mailbox.set_read(email_id, false).await?;
                "marked unread"
            }
            other => {
                warn!(email_id, token = other, "Skipping unknown action token");
                return Ok(None);
            }
        };
        Ok(Some(description.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use uuid::Uuid;

    use crate::mailbox::{Email, MemoryMailbox};
    use crate::notify::RecordingNotifier;

    fn make_email(id: &str) -> Email {
        Email {
            id: id.into(),
            sender: "news@example.com".into(),
            subject: "Weekly Digest".into(),
            body: String::new(),
            labels: vec![],
            is_read: false,
            is_starred: false,
            has_attachments: false,
            received_at: Utc::now(),
            location: MailboxLocation::Inbox,
        }
    }

    fn result_with(email_id: &str, actions: &[&str]) -> WorkflowResult {
        WorkflowResult {
            hook_id: Uuid::new_v4(),
            hook_name: "archive newsletters".into(),
            success: true,
            actions_taken: actions.iter().map(|s| s.to_string()).collect(),
            email_id: Some(email_id.into()),
            error: None,
            execution_time: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn applies_tokens_and_raises_one_toast() {
        let mailbox = MemoryMailbox::new();
        let notifier = RecordingNotifier::new();
        mailbox.insert(make_email("e1")).await;

        let applier = ActionApplier::new(mailbox.clone(), notifier.clone());
        applier
            .apply(&[result_with(
                "e1",
                &["archive", "mark_read", "add_label:Newsletters"],
            )])
            .await;

        let email = mailbox.get("e1").await.unwrap();
        assert_eq!(email.location, MailboxLocation::Archive);
        assert!(email.is_read);
        assert_eq!(email.labels, vec!["Newsletters"]);

        let toasts = notifier.added().await;
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].1.title, "Automation: archive newsletters");
        assert!(toasts[0].1.description.contains("archived"));
        assert!(toasts[0].1.description.contains("Newsletters"));
    }

    #[tokio::test]
    async fn unknown_tokens_are_skipped() {
        let mailbox = MemoryMailbox::new();
        let notifier = RecordingNotifier::new();
        mailbox.insert(make_email("e1")).await;

        let applier = ActionApplier::new(mailbox.clone(), notifier.clone());
        applier
            .apply(&[result_with("e1", &["teleport", "star"])])
            .await;

        assert!(mailbox.get("e1").await.unwrap().is_starred);
        // The toast only mentions what was applied.
        let toasts = notifier.added().await;
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].1.description, "starred");
    }

    #[tokio::test]
    async fn no_applied_actions_means_no_toast() {
        let mailbox = MemoryMailbox::new();
        let notifier = RecordingNotifier::new();
        let applier = ActionApplier::new(mailbox, notifier.clone());

        // Email does not exist: every token fails, nothing to announce.
        applier.apply(&[result_with("ghost", &["archive"])]).await;
        assert!(notifier.added().await.is_empty());

        // Failed results are skipped entirely.
        let mut failed = result_with("e1", &[]);
        failed.success = false;
        failed.error = Some("parse error".into());
        applier.apply(&[failed]).await;
        assert!(notifier.added().await.is_empty());
    }

    #[tokio::test]
    async fn delete_is_a_move_to_trash() {
        let mailbox = MemoryMailbox::new();
        let notifier = RecordingNotifier::new();
        mailbox.insert(make_email("e1")).await;

        let applier = ActionApplier::new(mailbox.clone(), notifier);
        applier.apply(&[result_with("e1", &["delete"])]).await;

        let email = mailbox.get("e1").await;
        assert_eq!(email.unwrap().location, MailboxLocation::Trash);
    }
}
