//! Rule engine — owns persisted hooks and executes them per trigger.

pub mod capability;
pub mod dsl;
pub mod hook;

pub use hook::{Hook, TriggerEvent, WorkflowResult};

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::mailbox::Email;
use crate::model::ContextSnapshot;
use crate::store::HookStore;

/// Owns the hook list exclusively; persists it through a `HookStore` port.
///
/// Execution is two-phase: a rule runs against a read-only email view that
/// records intents, and the recorded tokens are returned unapplied. The
/// caller (the coordinator) hands them to the action applier.
pub struct RuleEngine {
    hooks: Vec<Hook>,
    store: Arc<dyn HookStore>,
}

impl RuleEngine {
    /// Load persisted hooks from the store.
    pub async fn load(store: Arc<dyn HookStore>) -> Result<Self, StoreError> {
        let hooks = store.load().await?;
        info!(count = hooks.len(), "Loaded hooks");
        Ok(Self { hooks, store })
    }

    /// All hooks, in registration order.
    pub fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    /// Register a hook. Rejects rule bodies that do not parse.
    pub async fn add_hook(&mut self, hook: Hook) -> Result<(), crate::error::Error> {
        dsl::check_rule(&hook.source)?;
        info!(hook_id = %hook.id, name = %hook.name, trigger = %hook.trigger, "Hook added");
        self.hooks.push(hook);
        self.persist().await?;
        Ok(())
    }

    /// Enable or disable a hook. Returns false if the id is unknown.
    pub async fn toggle_hook(&mut self, id: Uuid, enabled: bool) -> Result<bool, StoreError> {
        let Some(hook) = self.hooks.iter_mut().find(|h| h.id == id) else {
            warn!(hook_id = %id, "Cannot toggle unknown hook");
            return Ok(false);
        };
        hook.enabled = enabled;
        debug!(hook_id = %id, enabled, "Hook toggled");
        self.persist().await?;
        Ok(true)
    }

    /// Delete a hook. Returns false if the id is unknown.
    pub async fn delete_hook(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let before = self.hooks.len();
        self.hooks.retain(|h| h.id != id);
        if self.hooks.len() == before {
            warn!(hook_id = %id, "Cannot delete unknown hook");
            return Ok(false);
        }
        info!(hook_id = %id, "Hook deleted");
        self.persist().await?;
        Ok(true)
    }

    /// Execute every enabled hook registered for `trigger`, in
    /// registration order.
    ///
    /// One hook failing (parse or runtime error) is captured as a failed
    /// `WorkflowResult` and never aborts the remaining hooks. Execution
    /// bookkeeping is persisted once per batch, not per hook.
    pub async fn execute(
        &mut self,
        trigger: TriggerEvent,
        email: &Email,
        ctx: &ContextSnapshot,
    ) -> Vec<WorkflowResult> {
        let mut results = Vec::new();
        let mut any_succeeded = false;
        let now = Utc::now();

        for hook in self
            .hooks
            .iter_mut()
            .filter(|h| h.trigger == trigger && h.enabled)
        {
            let started = Instant::now();
            let result = match dsl::run_rule(&hook.source, email, ctx) {
                Ok(actions) => {
                    hook.execution_count += 1;
                    hook.last_executed = Some(now);
                    any_succeeded = true;
                    debug!(
                        hook_id = %hook.id,
                        name = %hook.name,
                        actions = actions.len(),
                        "Hook executed"
                    );
                    WorkflowResult {
                        hook_id: hook.id,
                        hook_name: hook.name.clone(),
                        success: true,
                        actions_taken: actions,
                        email_id: Some(email.id.clone()),
                        error: None,
                        execution_time: started.elapsed(),
                    }
                }
                Err(e) => {
                    warn!(hook_id = %hook.id, name = %hook.name, error = %e, "Hook failed");
                    WorkflowResult {
                        hook_id: hook.id,
                        hook_name: hook.name.clone(),
                        success: false,
                        actions_taken: Vec::new(),
                        email_id: Some(email.id.clone()),
                        error: Some(e.to_string()),
                        execution_time: started.elapsed(),
                    }
                }
            };
            results.push(result);
        }

        // One save per execution batch, not per hook.
        if any_succeeded
            && let Err(e) = self.store.save(&self.hooks).await
        {
            warn!(error = %e, "Failed to persist hook bookkeeping");
        }

        results
    }

    async fn persist(&self) -> Result<(), StoreError> {
        self.store.save(&self.hooks).await
    }
}
