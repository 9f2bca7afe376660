//! Automation coordinator — the orchestration hub.
//!
//! Owns the pending action batch and its debounce timer, the rule engine,
//! and the at-most-one active suggestion. Tracked gestures are batched
//! and reported over the channel; only the most recent gesture of a
//! batch is analyzed locally. Incoming suggestions supersede whatever is
//! active, and every hook mutation pushes the current hook list to the
//! remote service.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::applier::ActionApplier;
use crate::channel::{ChannelClient, HookSummary, InboundMessage, OutboundMessage, UserActionReport};
use crate::config::AutomationConfig;
use crate::engine::{Hook, RuleEngine, TriggerEvent, dsl};
use crate::error::Result;
use crate::mailbox::{Email, Mailbox};
use crate::model::{ActionEvent, ContextSnapshot, Suggestion, ViewLocation};
use crate::notify::{Notifier, Toast};

#[derive(Default)]
struct PendingBatch {
    events: Vec<ActionEvent>,
    timer: Option<JoinHandle<()>>,
}

struct ActiveSuggestion {
    suggestion: Suggestion,
    toast_id: Uuid,
}

pub struct AutomationCoordinator {
    config: AutomationConfig,
    engine: Mutex<RuleEngine>,
    channel: Arc<ChannelClient>,
    mailbox: Arc<dyn Mailbox>,
    notifier: Arc<dyn Notifier>,
    applier: ActionApplier,
    batch: Mutex<PendingBatch>,
    active: Mutex<Option<ActiveSuggestion>>,
}

impl AutomationCoordinator {
    pub fn new(
        config: AutomationConfig,
        engine: RuleEngine,
        channel: Arc<ChannelClient>,
        mailbox: Arc<dyn Mailbox>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let applier = ActionApplier::new(Arc::clone(&mailbox), Arc::clone(&notifier));
        Arc::new(Self {
            config,
            engine: Mutex::new(engine),
            channel,
            mailbox,
            notifier,
            applier,
            batch: Mutex::new(PendingBatch::default()),
            active: Mutex::new(None),
        })
    }

    /// Consume inbound channel messages until the sender side closes.
    pub fn spawn_inbound(self: &Arc<Self>, mut rx: mpsc::Receiver<InboundMessage>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                coordinator.handle_inbound(message).await;
            }
            debug!("Inbound channel closed");
        })
    }

    // ── Action tracking ─────────────────────────────────────────────

    /// Record one mailbox gesture. The flush timer is reset on every
    /// call and fires `config.debounce` after the most recent one.
    pub async fn track(self: &Arc<Self>, event: ActionEvent) {
        debug!(action = %event.action, email_id = %event.email.id, "Tracking action");

        let mut batch = self.batch.lock().await;
        batch.events.push(event);
        if let Some(timer) = batch.timer.take() {
            timer.abort();
        }

        let coordinator = Arc::clone(self);
        let debounce = self.config.debounce;
        batch.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            coordinator.flush().await;
        }));
    }

    /// Flush the pending batch immediately, cancelling any scheduled
    /// timer. Used on shutdown and by tests.
    pub async fn flush_now(&self) {
        let events = {
            let mut batch = self.batch.lock().await;
            if let Some(timer) = batch.timer.take() {
                timer.abort();
            }
            std::mem::take(&mut batch.events)
        };
        self.dispatch_batch(events).await;
    }

    async fn flush(&self) {
        let events = {
            let mut batch = self.batch.lock().await;
            batch.timer = None;
            std::mem::take(&mut batch.events)
        };
        self.dispatch_batch(events).await;
    }

    /// Report every event of the batch in arrival order, then analyze
    /// only the most recent one locally.
    async fn dispatch_batch(&self, events: Vec<ActionEvent>) {
        if events.is_empty() {
            return;
        }
        debug!(count = events.len(), "Flushing action batch");

        let session_id = self.session_id_string().await;
        for event in &events {
            self.channel
                .send(OutboundMessage::UserAction(UserActionReport {
                    action: event.action,
                    email: event.email.clone(),
                    context: event.context.clone(),
                    user_id: self.config.user_id.clone(),
                    session_id: session_id.clone(),
                    timestamp: Utc::now(),
                }))
                .await;
        }

        // Intermediate events were superseded by later gestures; only
        // the last one reflects what the user settled on.
        let Some(last) = events.last() else { return };
        if !last.action.is_intentional() {
            debug!(action = %last.action, "Last action not eligible for local analysis");
            return;
        }
        self.analyze_action(last, &session_id).await;
    }

    async fn analyze_action(&self, event: &ActionEvent, session_id: &str) {
        let Some(email) = self.mailbox.get(&event.email.id).await else {
            warn!(email_id = %event.email.id, "Tracked email no longer exists; skipping analysis");
            return;
        };
        let ctx = ContextSnapshot::capture(&self.config.user_id, event.context.location, session_id);
        let results = self
            .engine
            .lock()
            .await
            .execute(TriggerEvent::UserAction, &email, &ctx)
            .await;
        self.applier.apply(&results).await;
    }

    // ── Email lifecycle triggers ────────────────────────────────────

    /// Run `email_received` hooks against a newly delivered email.
    pub async fn handle_incoming_email(&self, email: &Email) {
        self.run_trigger(TriggerEvent::EmailReceived, email, ViewLocation::Home)
            .await;
    }

    /// Run `email_closed` hooks when the user leaves an open email.
    pub async fn handle_email_close(&self, email: &Email, location: ViewLocation) {
        self.run_trigger(TriggerEvent::EmailClosed, email, location)
            .await;
    }

    async fn run_trigger(&self, trigger: TriggerEvent, email: &Email, location: ViewLocation) {
        let session_id = self.session_id_string().await;
        let ctx = ContextSnapshot::capture(&self.config.user_id, location, &session_id);
        let results = self.engine.lock().await.execute(trigger, email, &ctx).await;
        self.applier.apply(&results).await;
    }

    // ── Suggestion lifecycle ────────────────────────────────────────

    async fn handle_inbound(&self, message: InboundMessage) {
        match message {
            InboundMessage::Suggestion(suggestion) => self.present_suggestion(suggestion).await,
            InboundMessage::Confirmation { message } => {
                info!(%message, "Suggestion confirmed remotely");
                self.notifier.add(Toast::new("Automation saved", message)).await;
            }
            InboundMessage::Ack => debug!("Action report acknowledged"),
        }
    }

    /// Make `suggestion` the active one. Any previously active
    /// suggestion is dismissed first, so at most one is ever live.
    async fn present_suggestion(&self, suggestion: Suggestion) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            debug!(
                superseded = %previous.suggestion.id,
                by = %suggestion.id,
                "Superseding active suggestion"
            );
            self.notifier.close(previous.toast_id).await;
        }

        info!(
            suggestion_id = %suggestion.id,
            confidence = suggestion.confidence,
            "Automation suggestion received"
        );
        let toast_id = self
            .notifier
            .add(Toast::new(
                "Automation suggestion",
                suggestion.description.clone(),
            ))
            .await;
        *active = Some(ActiveSuggestion {
            suggestion,
            toast_id,
        });
    }

    /// The currently active suggestion, if any.
    pub async fn active_suggestion(&self) -> Option<Suggestion> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|a| a.suggestion.clone())
    }

    /// Accept the active suggestion: validate the generated rule,
    /// respond over the channel, dismiss the toast, and install the
    /// rule as a hook.
    ///
    /// A rule body that does not parse is reported as rejected — the
    /// service must never believe an automation was installed when it
    /// was not. Returns false when no suggestion is active.
    pub async fn accept_suggestion(&self) -> Result<bool> {
        let Some(active) = self.active.lock().await.take() else {
            warn!("No active suggestion to accept");
            return Ok(false);
        };
        self.notifier.close(active.toast_id).await;

        if let Err(e) = dsl::check_rule(&active.suggestion.generated_function) {
            warn!(
                suggestion_id = %active.suggestion.id,
                error = %e,
                "Suggested rule does not parse; reporting it rejected"
            );
            self.channel
                .send(OutboundMessage::SuggestionResponse {
                    suggestion_id: active.suggestion.id.clone(),
                    accepted: false,
                })
                .await;
            return Err(e.into());
        }

        self.channel
            .send(OutboundMessage::SuggestionResponse {
                suggestion_id: active.suggestion.id.clone(),
                accepted: true,
            })
            .await;

        let hook = Hook::new(
            active.suggestion.description.clone(),
            active.suggestion.reasoning.clone(),
            TriggerEvent::EmailReceived,
            active.suggestion.generated_function.clone(),
        );
        info!(suggestion_id = %active.suggestion.id, hook_id = %hook.id, "Suggestion accepted");
        self.engine.lock().await.add_hook(hook).await?;
        self.push_current_workflows().await;
        Ok(true)
    }

    /// Reject the active suggestion: respond over the channel and
    /// dismiss the toast. Returns false when no suggestion is active.
    pub async fn reject_suggestion(&self) -> bool {
        let Some(active) = self.active.lock().await.take() else {
            warn!("No active suggestion to reject");
            return false;
        };
        self.notifier.close(active.toast_id).await;
        info!(suggestion_id = %active.suggestion.id, "Suggestion rejected");
        self.channel
            .send(OutboundMessage::SuggestionResponse {
                suggestion_id: active.suggestion.id,
                accepted: false,
            })
            .await;
        true
    }

    // ── Hook management ─────────────────────────────────────────────

    /// Author a hook directly. Clears any active suggestion: the user
    /// chose their own automation over the pending proposal.
    pub async fn create_hook(
        &self,
        name: &str,
        description: &str,
        trigger: TriggerEvent,
        source: &str,
    ) -> Result<Uuid> {
        if let Some(active) = self.active.lock().await.take() {
            debug!(suggestion_id = %active.suggestion.id, "Clearing active suggestion");
            self.notifier.close(active.toast_id).await;
        }

        let hook = Hook::new(name, description, trigger, source);
        let id = hook.id;
        self.engine.lock().await.add_hook(hook).await?;
        self.push_current_workflows().await;
        Ok(id)
    }

    /// Delete a hook. Returns false if the id is unknown.
    pub async fn delete_hook(&self, id: Uuid) -> Result<bool> {
        let deleted = self.engine.lock().await.delete_hook(id).await?;
        if deleted {
            self.push_current_workflows().await;
        }
        Ok(deleted)
    }

    /// Enable or disable a hook. Returns false if the id is unknown.
    pub async fn toggle_hook(&self, id: Uuid, enabled: bool) -> Result<bool> {
        let toggled = self.engine.lock().await.toggle_hook(id, enabled).await?;
        if toggled {
            self.push_current_workflows().await;
        }
        Ok(toggled)
    }

    /// Snapshot of all hooks, in registration order.
    pub async fn hooks(&self) -> Vec<Hook> {
        self.engine.lock().await.hooks().to_vec()
    }

    /// Push the current hook list so the remote service avoids
    /// suggesting automation that already exists.
    async fn push_current_workflows(&self) {
        let workflows: Vec<HookSummary> = {
            let engine = self.engine.lock().await;
            engine.hooks().iter().map(HookSummary::from).collect()
        };
        self.channel
            .send(OutboundMessage::CurrentWorkflows { workflows })
            .await;
    }

    async fn session_id_string(&self) -> String {
        match self.channel.session_id().await {
            Some(id) => id.to_string(),
            None => "offline".to_string(),
        }
    }
}
