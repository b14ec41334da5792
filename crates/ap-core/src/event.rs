//! Events emitted by the protocol session

use crate::item::{NetworkItem, NetworkPlayer, PlayerSlot};
use serde::{Deserialize, Serialize};

/// Slot details received when the handshake completes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub team: i32,
    pub slot: PlayerSlot,
    #[serde(default)]
    pub players: Vec<NetworkPlayer>,
    #[serde(default)]
    pub checked_locations: Vec<i64>,
    #[serde(default)]
    pub missing_locations: Vec<i64>,
    #[serde(default)]
    pub slot_data: serde_json::Value,
}

/// Why a session stopped talking to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// Socket dropped or failed; the reconnect policy applies
    Transient(String),
    /// Server rejected the handshake
    Refused(Vec<String>),
    /// Handshake could not be completed for a non-network reason
    HandshakeFailed(String),
}

impl DisconnectCause {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DisconnectCause::Transient(_))
    }
}

/// Closed set of session callbacks
///
/// Sessions never call into the game directly; every event is handed to the
/// poll loop, which turns it into a deferred task for the main thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Handshake completed
    Connected(SlotInfo),
    /// Connection lost or rejected
    Disconnected(DisconnectCause),
    /// Items sent to this slot, starting at `index` in the slot's item list
    ItemsReceived {
        index: usize,
        items: Vec<NetworkItem>,
    },
    /// Server chat or system message, already flattened to text
    PrintedMessage(String),
    /// Item and location names for the listed games are now available
    DataPackage { games: Vec<String> },
    /// Bounce packet relayed by the server (death link and similar)
    Bounced {
        tags: Vec<String>,
        data: serde_json::Value,
    },
    /// Reply to a location scout
    LocationInfo(Vec<NetworkItem>),
}

impl SessionEvent {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Connected(_) => "Connected",
            SessionEvent::Disconnected(_) => "Disconnected",
            SessionEvent::ItemsReceived { .. } => "ItemsReceived",
            SessionEvent::PrintedMessage(_) => "PrintedMessage",
            SessionEvent::DataPackage { .. } => "DataPackage",
            SessionEvent::Bounced { .. } => "Bounced",
            SessionEvent::LocationInfo(_) => "LocationInfo",
        }
    }
}
