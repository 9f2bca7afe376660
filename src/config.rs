//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Automation coordinator configuration.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// User identifier reported with every tracked action.
    pub user_id: String,
    /// Debounce window: the flush timer is reset on every tracked action
    /// and fires this long after the most recent one.
    pub debounce: Duration,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            user_id: "local-user".to_string(),
            debounce: Duration::from_millis(500),
        }
    }
}

impl AutomationConfig {
    /// Build from environment variables. Missing variables fall back to
    /// defaults; present-but-invalid values are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let user_id = std::env::var("MAILFLOW_USER").unwrap_or(defaults.user_id);
        let debounce = match std::env::var("MAILFLOW_DEBOUNCE_MS") {
            Ok(raw) => Duration::from_millis(parse_value("MAILFLOW_DEBOUNCE_MS", &raw)?),
            Err(_) => defaults.debounce,
        };

        Ok(Self { user_id, debounce })
    }
}

/// Suggestion channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Base WebSocket URL of the pattern-detection service.
    /// The client appends `/{user_id}/{session_id}`.
    pub url: String,
    /// User identifier baked into the connection path.
    pub user_id: String,
    /// First reconnect delay; doubles per attempt.
    pub reconnect_base: Duration,
    /// Upper bound on any single reconnect delay.
    pub reconnect_cap: Duration,
    /// Reconnect attempts before giving up until the next `connect()`.
    pub max_reconnect_attempts: u32,
    /// Outbound message buffer size.
    pub send_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws".to_string(),
            user_id: "local-user".to_string(),
            reconnect_base: Duration::from_secs(1),
            reconnect_cap: Duration::from_secs(30),
            max_reconnect_attempts: 5,
            send_buffer: 256,
        }
    }
}

impl ChannelConfig {
    /// Build from environment variables. Missing variables fall back to
    /// defaults; present-but-invalid values are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let url = std::env::var("MAILFLOW_WS_URL").unwrap_or(defaults.url.clone());
        let user_id = std::env::var("MAILFLOW_USER").unwrap_or(defaults.user_id.clone());
        let max_reconnect_attempts = match std::env::var("MAILFLOW_RECONNECT_ATTEMPTS") {
            Ok(raw) => parse_value("MAILFLOW_RECONNECT_ATTEMPTS", &raw)?,
            Err(_) => defaults.max_reconnect_attempts,
        };

        Ok(Self {
            url,
            user_id,
            max_reconnect_attempts,
            ..defaults
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("`{raw}` is not a valid number"),
    })
}
