//! Mailbox collaborator — the store the automation engine mutates.
//!
//! The real mailbox (CRUD, filtering, demo data) lives outside this
//! subsystem; we consume it through the `Mailbox` trait. `MemoryMailbox`
//! is the reference implementation backing the demo binary and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::MailboxError;
use crate::model::EmailSummary;

/// Folder an email lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailboxLocation {
    Inbox,
    Archive,
    Spam,
    Trash,
}

impl std::fmt::Display for MailboxLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Inbox => "inbox",
            Self::Archive => "archive",
            Self::Spam => "spam",
            Self::Trash => "trash",
        };
        f.write_str(name)
    }
}

/// A full email record as seen by hook execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub labels: Vec<String>,
    pub is_read: bool,
    pub is_starred: bool,
    pub has_attachments: bool,
    pub received_at: DateTime<Utc>,
    pub location: MailboxLocation,
}

impl Email {
    pub fn summary(&self) -> EmailSummary {
        EmailSummary {
            id: self.id.clone(),
            sender: self.sender.clone(),
            subject: self.subject.clone(),
            labels: self.labels.clone(),
        }
    }
}

/// Mailbox operations the action applier maps intents onto.
///
/// Each operation is idempotent and independent of automation state.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Fetch a snapshot of one email, if it exists.
    async fn get(&self, email_id: &str) -> Option<Email>;
    async fn move_to(&self, email_id: &str, location: MailboxLocation) -> Result<(), MailboxError>;
    async fn toggle_star(&self, email_id: &str) -> Result<(), MailboxError>;
    async fn set_read(&self, email_id: &str, read: bool) -> Result<(), MailboxError>;
    async fn add_tag(&self, email_id: &str, tag: &str) -> Result<(), MailboxError>;
    async fn remove_tag(&self, email_id: &str, tag: &str) -> Result<(), MailboxError>;
    async fn delete(&self, email_id: &str) -> Result<(), MailboxError>;
}

/// In-memory mailbox for the demo binary and tests.
pub struct MemoryMailbox {
    emails: RwLock<HashMap<String, Email>>,
}

impl MemoryMailbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            emails: RwLock::new(HashMap::new()),
        })
    }

    /// Insert (or replace) an email.
    pub async fn insert(&self, email: Email) {
        self.emails.write().await.insert(email.id.clone(), email);
    }

    /// All emails, unordered.
    pub async fn all(&self) -> Vec<Email> {
        self.emails.read().await.values().cloned().collect()
    }

    async fn update<F>(&self, email_id: &str, mutate: F) -> Result<(), MailboxError>
    where
        F: FnOnce(&mut Email),
    {
        let mut emails = self.emails.write().await;
        let email = emails
            .get_mut(email_id)
            .ok_or_else(|| MailboxError::NotFound(email_id.to_string()))?;
        mutate(email);
        Ok(())
    }
}

#[async_trait]
impl Mailbox for MemoryMailbox {
    async fn get(&self, email_id: &str) -> Option<Email> {
        self.emails.read().await.get(email_id).cloned()
    }

    async fn move_to(&self, email_id: &str, location: MailboxLocation) -> Result<(), MailboxError> {
        debug!(email_id, %location, "Moving email");
        self.update(email_id, |e| e.location = location).await
    }

    async fn toggle_star(&self, email_id: &str) -> Result<(), MailboxError> {
        self.update(email_id, |e| e.is_starred = !e.is_starred).await
    }

    async fn set_read(&self, email_id: &str, read: bool) -> Result<(), MailboxError> {
        self.update(email_id, |e| e.is_read = read).await
    }

    async fn add_tag(&self, email_id: &str, tag: &str) -> Result<(), MailboxError> {
        self.update(email_id, |e| {
            if !e.labels.iter().any(|l| l == tag) {
                e.labels.push(tag.to_string());
            }
        })
        .await
    }

    async fn remove_tag(&self, email_id: &str, tag: &str) -> Result<(), MailboxError> {
        self.update(email_id, |e| e.labels.retain(|l| l != tag)).await
    }

    async fn delete(&self, email_id: &str) -> Result<(), MailboxError> {
        let removed = self.emails.write().await.remove(email_id);
        if removed.is_none() {
            return Err(MailboxError::NotFound(email_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_email(id: &str) -> Email {
        Email {
            id: id.into(),
            sender: "alice@example.com".into(),
            subject: "Hello".into(),
            body: "Hi there".into(),
            labels: vec![],
            is_read: false,
            is_starred: false,
            has_attachments: false,
            received_at: Utc::now(),
            location: MailboxLocation::Inbox,
        }
    }

    #[tokio::test]
    async fn move_and_star() {
        let mailbox = MemoryMailbox::new();
        mailbox.insert(make_email("e1")).await;

        mailbox.move_to("e1", MailboxLocation::Archive).await.unwrap();
        mailbox.toggle_star("e1").await.unwrap();

        let email = mailbox.get("e1").await.unwrap();
        assert_eq!(email.location, MailboxLocation::Archive);
        assert!(email.is_starred);

        // toggle flips back
        mailbox.toggle_star("e1").await.unwrap();
        assert!(!mailbox.get("e1").await.unwrap().is_starred);
    }

    #[tokio::test]
    async fn tags_are_idempotent() {
        let mailbox = MemoryMailbox::new();
        mailbox.insert(make_email("e1")).await;

        mailbox.add_tag("e1", "Work").await.unwrap();
        mailbox.add_tag("e1", "Work").await.unwrap();
        assert_eq!(mailbox.get("e1").await.unwrap().labels, vec!["Work"]);

        mailbox.remove_tag("e1", "Work").await.unwrap();
        mailbox.remove_tag("e1", "Work").await.unwrap();
        assert!(mailbox.get("e1").await.unwrap().labels.is_empty());
    }

    #[tokio::test]
    async fn missing_email_is_not_found() {
        let mailbox = MemoryMailbox::new();
        let err = mailbox.set_read("ghost", true).await.unwrap_err();
        assert!(matches!(err, MailboxError::NotFound(_)));
    }
}
