//! Relay configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_FRAME_BYTES: usize = 256;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// TCP port to listen on (all interfaces).
    pub port: u16,
    /// Largest inbound WebSocket message accepted.
    pub max_frame_bytes: usize,
    /// A connection with no inbound traffic for this long is closed.
    pub idle_timeout: Duration,
    /// Per-connection outbound queue capacity. A member whose queue fills up
    /// is disconnected.
    pub outbound_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

impl RelayConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `RELAY_MAX_FRAME_BYTES`: default 256
    /// - `RELAY_IDLE_TIMEOUT_SECS`: default 20
    /// - `RELAY_OUTBOUND_QUEUE`: default 256
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Absent keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let max_frame_bytes = nonzero(parse_or(&lookup, "RELAY_MAX_FRAME_BYTES", DEFAULT_MAX_FRAME_BYTES)?, "RELAY_MAX_FRAME_BYTES")?;
        let idle_secs = nonzero(parse_or(&lookup, "RELAY_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?, "RELAY_IDLE_TIMEOUT_SECS")?;
        // mpsc::channel panics on a zero capacity.
        let outbound_queue = nonzero(parse_or(&lookup, "RELAY_OUTBOUND_QUEUE", DEFAULT_OUTBOUND_QUEUE)?, "RELAY_OUTBOUND_QUEUE")?;

        Ok(Self { port, max_frame_bytes, idle_timeout: Duration::from_secs(idle_secs), outbound_queue })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

fn nonzero<T>(value: T, var: &'static str) -> Result<T, ConfigError>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        return Err(ConfigError::Zero { var });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
