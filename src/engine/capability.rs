//! Capability objects handed to rule execution.
//!
//! Rules never touch live mailbox state: `EmailView` exposes read-only
//! fields plus intent-recording methods that append action tokens to an
//! internal list. The recorded tokens become `actions_taken` and are
//! applied later by the action applier.

use crate::mailbox::Email;

/// Restricted, read-mostly view of one email plus an intent recorder.
#[derive(Debug)]
pub struct EmailView {
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub labels: Vec<String>,
    pub is_read: bool,
    pub is_starred: bool,
    pub has_attachments: bool,
    actions: Vec<String>,
}

impl EmailView {
    pub fn new(email: &Email) -> Self {
        Self {
            id: email.id.clone(),
            sender: email.sender.clone(),
            subject: email.subject.clone(),
            body: email.body.clone(),
            labels: email.labels.clone(),
            is_read: email.is_read,
            is_starred: email.is_starred,
            has_attachments: email.has_attachments,
            actions: Vec::new(),
        }
    }

    /// Drain the recorded intents, in recording order.
    pub fn into_actions(self) -> Vec<String> {
        self.actions
    }

    fn record(&mut self, token: impl Into<String>) {
        self.actions.push(token.into());
    }

    pub fn archive(&mut self) {
        self.record("archive");
    }

    pub fn delete(&mut self) {
        self.record("delete");
    }

    pub fn star(&mut self) {
        self.record("star");
    }

    pub fn unstar(&mut self) {
        self.record("unstar");
    }

    pub fn mark_read(&mut self) {
        self.record("mark_read");
    }

    pub fn mark_unread(&mut self) {
        self.record("mark_unread");
    }

    pub fn add_label(&mut self, label: &str) {
        self.record(format!("add_label:{label}"));
    }

    pub fn remove_label(&mut self, label: &str) {
        self.record(format!("remove_label:{label}"));
    }

    pub fn move_to_spam(&mut self) {
        self.record("move_to_spam");
    }

    pub fn move_to_trash(&mut self) {
        self.record("move_to_trash");
    }
}

/// Case-insensitive text helpers exposed to rule bodies.
pub mod text {
    pub fn contains(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    pub fn starts_with(haystack: &str, prefix: &str) -> bool {
        haystack.to_lowercase().starts_with(&prefix.to_lowercase())
    }

    pub fn ends_with(haystack: &str, suffix: &str) -> bool {
        haystack.to_lowercase().ends_with(&suffix.to_lowercase())
    }

    /// Regex match, case-insensitive. Invalid patterns are reported as
    /// rule execution errors by the interpreter.
    pub fn matches(haystack: &str, pattern: &str) -> Result<bool, regex::Error> {
        let re = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()?;
        Ok(re.is_match(haystack))
    }

    pub fn has_any(labels: &[String], wanted: &[String]) -> bool {
        wanted
            .iter()
            .any(|w| labels.iter().any(|l| l.eq_ignore_ascii_case(w)))
    }

    pub fn has_all(labels: &[String], wanted: &[String]) -> bool {
        wanted
            .iter()
            .all(|w| labels.iter().any(|l| l.eq_ignore_ascii_case(w)))
    }
}
