//! Connection state machine states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the server connection
///
/// ```text
/// Disconnected --connect--> Connecting --Connected event--> Connected
/// Connecting/Connected --transient error--> Reconnecting --Connected event--> Connected
/// Reconnecting --retry budget exhausted--> FailedPermanently
/// any live state --disconnect / fatal error--> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    FailedPermanently,
}

impl ConnectionState {
    /// A session handle exists in exactly these states
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }

    /// Compact encoding for atomic storage
    pub fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting => 3,
            ConnectionState::FailedPermanently => 4,
        }
    }

    /// Inverse of [`ConnectionState::as_u8`]; unknown values decode as `Disconnected`
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Reconnecting,
            4 => ConnectionState::FailedPermanently,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting => "Reconnecting",
            ConnectionState::FailedPermanently => "Failed",
        };
        f.write_str(name)
    }
}
