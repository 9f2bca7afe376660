//! libSQL hook store — durable key-value persistence via libsql's
//! native async API. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::engine::Hook;
use crate::error::StoreError;
use crate::store::HookStore;

/// Well-known key the hook list is stored under.
const HOOKS_KEY: &str = "hooks";

/// libSQL-backed hook store.
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlHookStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlHookStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create store directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Hook store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to create kv table: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl HookStore for LibSqlHookStore {
    async fn load(&self) -> Result<Vec<Hook>, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv WHERE key = ?1", params![HOOKS_KEY])
            .await
            .map_err(|e| StoreError::Query(format!("Failed to load hooks: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read hooks row: {e}")))?
        else {
            return Ok(Vec::new());
        };

        let json: String = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("Failed to read hooks column: {e}")))?;

        let hooks: Vec<Hook> = serde_json::from_str(&json)
            .map_err(|e| StoreError::Serialization(format!("Malformed hook list: {e}")))?;
        debug!(count = hooks.len(), "Hooks loaded from store");
        Ok(hooks)
    }

    async fn save(&self, hooks: &[Hook]) -> Result<(), StoreError> {
        let json = serde_json::to_string(hooks)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![HOOKS_KEY, json, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to save hooks: {e}")))?;
        debug!(count = hooks.len(), "Hooks saved to store");
        Ok(())
    }
}
