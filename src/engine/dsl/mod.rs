//! The mailflow rule language — a restricted DSL in place of arbitrary
//! user code.
//!
//! A rule body is parsed to an AST and interpreted against capability
//! objects passed in explicitly: an [`EmailView`](crate::engine::capability::EmailView)
//! that records intents instead of mutating anything, and a read-only
//! context snapshot. Execution is pure: same inputs, same recorded
//! actions, no shared state.
//!
//! ```text
//! if contains(subject, "newsletter") and not is_starred {
//!     archive();
//!     add_label("News");
//! }
//! ```

mod interp;
mod lexer;
mod parser;

use crate::engine::capability::EmailView;
use crate::error::HookError;
use crate::mailbox::Email;
use crate::model::ContextSnapshot;

/// Parse and run one rule body, returning the recorded action tokens.
pub fn run_rule(
    source: &str,
    email: &Email,
    ctx: &ContextSnapshot,
) -> Result<Vec<String>, HookError> {
    let program = parser::parse(source).map_err(HookError::Parse)?;
    let mut view = EmailView::new(email);
    interp::Interpreter::new(&mut view, ctx).run(&program)?;
    Ok(view.into_actions())
}

/// Validate a rule body without executing it.
pub fn check_rule(source: &str) -> Result<(), HookError> {
    parser::parse(source).map(|_| ()).map_err(HookError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::mailbox::MailboxLocation;
    use crate::model::ViewLocation;

    #[test]
    fn run_rule_end_to_end() {
        let email = Email {
            id: "e1".into(),
            sender: "news@example.com".into(),
            subject: "Weekly Newsletter #4".into(),
            body: String::new(),
            labels: vec![],
            is_read: false,
            is_starred: false,
            has_attachments: false,
            received_at: Utc::now(),
            location: MailboxLocation::Inbox,
        };
        let ctx = ContextSnapshot {
            user_id: "u1".into(),
            location: ViewLocation::Home,
            time_of_day: 10,
            day_of_week: 2,
            session_id: "s1".into(),
        };

        let actions =
            run_rule(r#"if contains(subject, "newsletter") { archive() }"#, &email, &ctx).unwrap();
        assert_eq!(actions, vec!["archive"]);
    }

    #[test]
    fn check_rule_reports_parse_errors() {
        assert!(check_rule("archive()").is_ok());
        let err = check_rule("if { archive() }").unwrap_err();
        assert!(matches!(err, HookError::Parse(_)));
    }
}
