//! Client configuration

use ap_core::{ApError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Pacing for automatic reconnection after a transient failure
///
/// Attempt `n` (starting at 0) waits `initial_delay * multiplier^n`, capped at
/// `max_delay`, measured from the previous attempt (or from the moment the
/// connection was lost, for the first one). Errors reported while already
/// reconnecting do not restart the wait. After `max_attempts` failed attempts
/// the connection is given up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: u32,
    pub max_attempts: u32,
    /// A handshake still pending after this long counts as a transient failure
    pub handshake_timeout_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2_000,
            max_delay_ms: 30_000,
            multiplier: 2,
            max_attempts: 5,
            handshake_timeout_ms: 30_000,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier.max(1)).saturating_pow(attempt);
        let delay = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Settings for a [`crate::ConnectionController`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Game name the slot was generated for
    pub game: String,
    /// Protocol version announced in the handshake
    pub version: (u32, u32, u32),
    /// Bit flags: 0b001 other worlds, 0b010 own world, 0b100 starting inventory
    pub items_handling: u8,
    pub tags: Vec<String>,
    pub reconnect: ReconnectPolicy,
    /// Minimum spacing between error status updates
    pub error_window_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            game: "Okami HD".to_string(),
            version: (0, 5, 1),
            items_handling: 0b111,
            tags: Vec::new(),
            reconnect: ReconnectPolicy::default(),
            error_window_ms: 1_000,
        }
    }
}

impl ClientConfig {
    /// Config for a specific game with default pacing
    pub fn for_game(game: impl Into<String>) -> Self {
        Self {
            game: game.into(),
            ..Default::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ApError::InvalidArgument(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn error_window(&self) -> Duration {
        Duration::from_millis(self.error_window_ms)
    }
}
