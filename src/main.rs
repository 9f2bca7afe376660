use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use mailflow::channel::ChannelClient;
use mailflow::config::{AutomationConfig, ChannelConfig};
use mailflow::coordinator::AutomationCoordinator;
use mailflow::engine::{RuleEngine, TriggerEvent};
use mailflow::mailbox::{Email, Mailbox, MailboxLocation, MemoryMailbox};
use mailflow::model::{ActionContext, ActionEvent, ActionKind, ViewLocation};
use mailflow::notify::LogNotifier;
use mailflow::store::LibSqlHookStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let automation_config = AutomationConfig::from_env()?;
    let channel_config = ChannelConfig::from_env()?;

    let db_path =
        std::env::var("MAILFLOW_DB_PATH").unwrap_or_else(|_| "./data/mailflow.db".to_string());

    eprintln!("📬 Mailflow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   User: {}", automation_config.user_id);
    eprintln!("   Suggestion service: {}", channel_config.url);
    eprintln!("   Database: {}", db_path);
    eprintln!("   Type `help` for commands, `quit` to exit.\n");

    // ── Hook store + engine ─────────────────────────────────────────────
    let store = Arc::new(
        LibSqlHookStore::new_local(std::path::Path::new(&db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open hook store at {db_path}: {e}");
                std::process::exit(1);
            }),
    );
    let engine = RuleEngine::load(store).await?;
    eprintln!("   Hooks loaded: {}", engine.hooks().len());

    // ── Channel + coordinator ───────────────────────────────────────────
    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let channel = Arc::new(ChannelClient::new(channel_config, inbound_tx));
    let mailbox = MemoryMailbox::new();
    let coordinator = AutomationCoordinator::new(
        automation_config,
        engine,
        Arc::clone(&channel),
        mailbox.clone(),
        Arc::new(LogNotifier),
    );
    coordinator.spawn_inbound(inbound_rx);
    let session_id = channel.connect().await;
    eprintln!("   Session: {session_id}\n");

    // ── Demo REPL standing in for the mail UI ───────────────────────────
    let mut demo_emails = demo_emails().into_iter();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => {}
            "help" => print_help(),
            "deliver" => match demo_emails.next() {
                Some(email) => {
                    eprintln!("New email {}: {} — {}", email.id, email.sender, email.subject);
                    mailbox.insert(email.clone()).await;
                    coordinator.handle_incoming_email(&email).await;
                }
                None => eprintln!("No more demo emails."),
            },
            "list" => {
                let mut emails = mailbox.all().await;
                emails.sort_by(|a, b| a.id.cmp(&b.id));
                for e in emails {
                    eprintln!(
                        "  {} [{}]{}{} {} — {}",
                        e.id,
                        e.location,
                        if e.is_starred { " ★" } else { "" },
                        if e.is_read { "" } else { " (unread)" },
                        e.sender,
                        e.subject,
                    );
                }
            }
            "star" => gesture(&coordinator, &mailbox, rest, ActionKind::Star).await,
            "archive" => gesture(&coordinator, &mailbox, rest, ActionKind::Archive).await,
            "delete" => gesture(&coordinator, &mailbox, rest, ActionKind::Delete).await,
            "read" => gesture(&coordinator, &mailbox, rest, ActionKind::MarkRead).await,
            "close" => match mailbox.get(rest).await {
                Some(email) => coordinator.handle_email_close(&email, ViewLocation::Detail).await,
                None => eprintln!("No such email: {rest}"),
            },
            "hooks" => {
                for hook in coordinator.hooks().await {
                    eprintln!(
                        "  {} [{}]{} {} — runs: {}",
                        hook.id,
                        hook.trigger,
                        if hook.enabled { "" } else { " (disabled)" },
                        hook.name,
                        hook.execution_count,
                    );
                }
            }
            "addhook" => {
                // addhook <name> <trigger> <rule source...>
                let mut parts = rest.splitn(3, ' ');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(name), Some(trigger), Some(source)) => {
                        match trigger.parse::<TriggerEvent>() {
                            Ok(trigger) => {
                                match coordinator.create_hook(name, "", trigger, source).await {
                                    Ok(id) => eprintln!("Hook created: {id}"),
                                    Err(e) => eprintln!("Rejected: {e}"),
                                }
                            }
                            Err(e) => eprintln!("Rejected: {e}"),
                        }
                    }
                    _ => eprintln!("Usage: addhook <name> <trigger> <rule source>"),
                }
            }
            "delhook" => match rest.parse() {
                Ok(id) => {
                    if coordinator.delete_hook(id).await? {
                        eprintln!("Hook deleted.");
                    } else {
                        eprintln!("No such hook.");
                    }
                }
                Err(_) => eprintln!("Usage: delhook <uuid>"),
            },
            "accept" => match coordinator.accept_suggestion().await {
                Ok(true) => {}
                Ok(false) => eprintln!("No active suggestion."),
                Err(e) => eprintln!("Could not install suggestion: {e}"),
            },
            "reject" => {
                if !coordinator.reject_suggestion().await {
                    eprintln!("No active suggestion.");
                }
            }
            "flush" => coordinator.flush_now().await,
            "quit" | "exit" => break,
            other => eprintln!("Unknown command: {other} (try `help`)"),
        }
    }

    coordinator.flush_now().await;
    channel.disconnect().await;
    Ok(())
}

/// Perform a mailbox gesture the way the UI would, then track it.
async fn gesture(
    coordinator: &Arc<AutomationCoordinator>,
    mailbox: &Arc<MemoryMailbox>,
    email_id: &str,
    action: ActionKind,
) {
    let Some(email) = mailbox.get(email_id).await else {
        eprintln!("No such email: {email_id}");
        return;
    };

    let result = match action {
        ActionKind::Star => mailbox.toggle_star(email_id).await,
        ActionKind::Archive => mailbox.move_to(email_id, MailboxLocation::Archive).await,
        ActionKind::Delete => mailbox.move_to(email_id, MailboxLocation::Trash).await,
        ActionKind::MarkRead => mailbox.set_read(email_id, true).await,
        _ => Ok(()),
    };
    if let Err(e) = result {
        eprintln!("Mailbox error: {e}");
        return;
    }

    coordinator
        .track(ActionEvent {
            action,
            email: email.summary(),
            context: ActionContext {
                location: ViewLocation::Home,
            },
        })
        .await;
}

fn print_help() {
    eprintln!("  deliver              deliver the next demo email (runs email_received hooks)");
    eprintln!("  list                 list mailbox contents");
    eprintln!("  star|archive|delete|read <id>   perform and track a gesture");
    eprintln!("  close <id>           close an open email (runs email_closed hooks)");
    eprintln!("  hooks                list hooks");
    eprintln!("  addhook <name> <trigger> <rule>  author a hook (trigger: email_received|email_closed|user_action)");
    eprintln!("  delhook <uuid>       delete a hook");
    eprintln!("  accept | reject      respond to the active suggestion");
    eprintln!("  flush                flush the pending action batch now");
    eprintln!("  quit                 exit");
}

fn demo_emails() -> Vec<Email> {
    let now = chrono::Utc::now();
    let make = |id: &str, sender: &str, subject: &str, body: &str| Email {
        id: id.to_string(),
        sender: sender.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        labels: Vec::new(),
        is_read: false,
        is_starred: false,
        has_attachments: false,
        received_at: now,
        location: MailboxLocation::Inbox,
    };

    vec![
        make(
            "e1",
            "newsletter@techdigest.example",
            "Weekly Newsletter: Rust 2024 roundup",
            "This week in systems programming...",
        ),
        make(
            "e2",
            "boss@company.example",
            "Quarterly planning meeting",
            "Can you prepare the roadmap slides?",
        ),
        make(
            "e3",
            "newsletter@techdigest.example",
            "Weekly Newsletter: async runtimes",
            "A deep dive into executors...",
        ),
        make(
            "e4",
            "noreply@promo.example",
            "50% off everything this weekend",
            "Don't miss our biggest sale...",
        ),
        make(
            "e5",
            "alice@company.example",
            "Re: code review",
            "Left a few comments on your branch.",
        ),
    ]
}
