//! Persistence layer — the hook store port and its backends.
//!
//! Hooks are serialized as one JSON array under a well-known key in a
//! local key-value table, so the storage medium stays swappable.

pub mod libsql_backend;

pub use libsql_backend::LibSqlHookStore;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::engine::Hook;
use crate::error::StoreError;

/// Persistence port for the hook list.
#[async_trait]
pub trait HookStore: Send + Sync {
    /// Load all persisted hooks. An empty store yields an empty list.
    async fn load(&self) -> Result<Vec<Hook>, StoreError>;
    /// Replace the persisted hook list.
    async fn save(&self, hooks: &[Hook]) -> Result<(), StoreError>;
}

/// In-memory hook store for tests and the demo binary.
#[derive(Default)]
pub struct MemoryHookStore {
    hooks: Mutex<Vec<Hook>>,
}

impl MemoryHookStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl HookStore for MemoryHookStore {
    async fn load(&self) -> Result<Vec<Hook>, StoreError> {
        Ok(self.hooks.lock().await.clone())
    }

    async fn save(&self, hooks: &[Hook]) -> Result<(), StoreError> {
        *self.hooks.lock().await = hooks.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::TriggerEvent;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryHookStore::new();
        assert!(store.load().await.unwrap().is_empty());

        let hooks = vec![Hook::new("h", "d", TriggerEvent::UserAction, "star()")];
        store.save(&hooks).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, hooks[0].id);
    }
}
