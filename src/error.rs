//! Error types for Mailflow.

/// Top-level error type for the automation engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),
}

/// Configuration-related errors. Missing environment variables fall
/// back to defaults; only present-but-invalid values are rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Hook persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
///
/// Connection and send failures trigger reconnection internally and are
/// never surfaced to callers, so only frame parsing has an error here;
/// a malformed inbound frame is logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Malformed inbound message: {0}")]
    Parse(String),
}

/// Errors raised by rule parsing or execution.
///
/// Captured per hook as a failed `WorkflowResult` — one hook failing
/// never aborts its siblings.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Execution error: {0}")]
    Eval(String),

    #[error("Step budget exhausted after {0} operations")]
    BudgetExhausted(usize),
}

/// Mailbox collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Email not found: {0}")]
    NotFound(String),

    #[error("Mailbox operation failed: {0}")]
    Operation(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
