//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::RelayError;

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Route the WebSocket endpoint is mounted on.
    pub ws_path: String,

    /// Origins allowed to open a WebSocket. Empty allows any origin.
    pub allowed_origins: Vec<String>,

    /// Emit logs as JSON instead of human-readable text.
    pub log_json: bool,

    /// Per-session limits handed to every connection.
    pub session: SessionConfig,
}

/// Per-session limits and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum size in bytes of a single inbound message.
    pub max_message_size: usize,

    /// Time without inbound traffic after which the session is torn down.
    pub idle_timeout: Duration,

    /// Interval between keepalive pings.
    pub ping_interval: Duration,

    /// Longest a single outbound frame may take to write before the
    /// connection is treated as stalled.
    pub write_timeout: Duration,

    /// Capacity of the bounded outbound queue.
    pub outbound_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_message_size: 512,
            idle_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
            outbound_capacity: 256,
        }
    }
}

impl SessionConfig {
    /// Checks that the limits describe a usable session.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidConfig`] if any limit is zero or the
    /// ping interval is not shorter than the idle timeout.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.max_message_size == 0 {
            return Err(RelayError::InvalidConfig(
                "max message size must be positive".to_string(),
            ));
        }
        if self.outbound_capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "outbound queue capacity must be positive".to_string(),
            ));
        }
        if self.idle_timeout.is_zero()
            || self.ping_interval.is_zero()
            || self.write_timeout.is_zero()
        {
            return Err(RelayError::InvalidConfig(
                "idle timeout, ping interval and write timeout must be positive".to_string(),
            ));
        }
        if self.ping_interval >= self.idle_timeout {
            return Err(RelayError::InvalidConfig(format!(
                "ping interval {:?} must be shorter than idle timeout {:?}",
                self.ping_interval, self.idle_timeout
            )));
        }
        Ok(())
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidConfig`] if `LISTEN_ADDR` cannot be
    /// parsed as a [`SocketAddr`] or the session limits are inconsistent.
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| RelayError::InvalidConfig(format!("LISTEN_ADDR: {e}")))?;

        let ws_path = std::env::var("WS_PATH").unwrap_or_else(|_| "/wc".to_string());
        let allowed_origins = parse_list(std::env::var("ALLOWED_ORIGINS").ok().as_deref());
        let log_json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            max_message_size: parse_env("MAX_MESSAGE_SIZE", defaults.max_message_size),
            idle_timeout: Duration::from_secs(parse_env(
                "IDLE_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )),
            ping_interval: Duration::from_secs(parse_env(
                "PING_INTERVAL_SECS",
                defaults.ping_interval.as_secs(),
            )),
            write_timeout: Duration::from_secs(parse_env(
                "WRITE_TIMEOUT_SECS",
                defaults.write_timeout.as_secs(),
            )),
            outbound_capacity: parse_env("OUTBOUND_QUEUE_CAPACITY", defaults.outbound_capacity),
        };
        session.validate()?;

        Ok(Self {
            listen_addr,
            ws_path,
            allowed_origins,
            log_json,
            session,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Splits a comma-separated list, trimming entries and dropping blanks.
fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}
