//! Packets exchanged with the multiworld server
//!
//! Every WebSocket text frame carries a JSON array of packets, each an object
//! tagged by its `cmd` field: `[{"cmd": "RoomInfo", ...}]`.

use ap_core::{ClientStatus, HintMode, LocationId, NetworkItem, NetworkPlayer, PlayerSlot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Protocol version triple; the server expects `"class": "Version"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    #[serde(default = "version_class")]
    pub class: String,
}

fn version_class() -> String {
    "Version".to_string()
}

impl From<(u32, u32, u32)> for NetworkVersion {
    fn from((major, minor, build): (u32, u32, u32)) -> Self {
        Self {
            major,
            minor,
            build,
            class: version_class(),
        }
    }
}

/// Packets sent to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum ClientPacket {
    /// Handshake
    Connect {
        password: String,
        game: String,
        name: String,
        uuid: String,
        version: NetworkVersion,
        items_handling: u8,
        tags: Vec<String>,
        slot_data: bool,
    },

    /// Request item and location names
    GetDataPackage { games: Vec<String> },

    /// Report found locations
    LocationChecks { locations: Vec<LocationId> },

    /// Query location contents
    LocationScouts {
        locations: Vec<LocationId>,
        create_as_hint: HintMode,
    },

    /// Report client progress
    StatusUpdate { status: ClientStatus },
}

/// Slot metadata from the `Connected` packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSlot {
    pub name: String,
    pub game: String,
}

/// One fragment of a `PrintJSON` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonMessagePart {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Owning player for item and location parts
    #[serde(default)]
    pub player: Option<PlayerSlot>,
}

/// Names for one game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    #[serde(default)]
    pub item_name_to_id: HashMap<String, i64>,
    #[serde(default)]
    pub location_name_to_id: HashMap<String, i64>,
    #[serde(default)]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPackageContents {
    #[serde(default)]
    pub games: HashMap<String, GameData>,
}

/// Packets received from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum ServerPacket {
    /// First packet after the socket opens
    RoomInfo {
        version: NetworkVersion,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        password: bool,
        #[serde(default)]
        games: Vec<String>,
        #[serde(default)]
        datapackage_checksums: HashMap<String, String>,
        #[serde(default)]
        seed_name: String,
    },

    /// Handshake rejected
    ConnectionRefused {
        #[serde(default)]
        errors: Vec<String>,
    },

    /// Handshake accepted
    Connected {
        team: i32,
        slot: PlayerSlot,
        #[serde(default)]
        players: Vec<NetworkPlayer>,
        #[serde(default)]
        missing_locations: Vec<LocationId>,
        #[serde(default)]
        checked_locations: Vec<LocationId>,
        #[serde(default)]
        slot_data: serde_json::Value,
        /// Keyed by slot number as a string
        #[serde(default)]
        slot_info: HashMap<String, NetworkSlot>,
    },

    ReceivedItems {
        index: usize,
        items: Vec<NetworkItem>,
    },

    /// Scout reply
    LocationInfo { locations: Vec<NetworkItem> },

    RoomUpdate {
        #[serde(default)]
        players: Option<Vec<NetworkPlayer>>,
        #[serde(default)]
        checked_locations: Option<Vec<LocationId>>,
    },

    #[serde(rename = "PrintJSON")]
    PrintJson { data: Vec<JsonMessagePart> },

    DataPackage { data: DataPackageContents },

    Bounced {
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        data: serde_json::Value,
    },

    /// Server could not process a packet we sent
    InvalidPacket {
        #[serde(rename = "type", default)]
        kind: String,
        #[serde(default)]
        original_cmd: Option<String>,
        #[serde(default)]
        text: String,
    },

    /// Any command this client does not handle
    #[serde(other)]
    Unknown,
}

/// Serialize packets into one text frame
pub fn serialize(packets: &[ClientPacket]) -> Result<String, serde_json::Error> {
    serde_json::to_string(packets)
}

/// Deserialize the packets of one text frame
pub fn deserialize(text: &str) -> Result<Vec<ServerPacket>, serde_json::Error> {
    serde_json::from_str(text)
}
