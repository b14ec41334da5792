//! Location, item and player types

use serde::{Deserialize, Serialize};

/// Identifier of a discoverable in-game location
pub type LocationId = i64;

/// Identifier of an item in a game's data package
pub type ItemId = i64;

/// Player slot number within a multiworld
pub type PlayerSlot = i32;

/// An item placed at a location, as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkItem {
    pub item: ItemId,
    pub location: LocationId,
    /// Sending player for received items, receiving player for scouts
    pub player: PlayerSlot,
    #[serde(default)]
    pub flags: u32,
}

impl NetworkItem {
    /// Item flagged as progression
    pub const FLAG_PROGRESSION: u32 = 0b001;
    /// Item flagged as useful
    pub const FLAG_USEFUL: u32 = 0b010;
    /// Item flagged as a trap
    pub const FLAG_TRAP: u32 = 0b100;

    pub fn is_progression(&self) -> bool {
        self.flags & Self::FLAG_PROGRESSION != 0
    }
}

/// A participant in the multiworld
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlayer {
    pub team: i32,
    pub slot: PlayerSlot,
    pub alias: String,
    pub name: String,
}

/// Client progress reported to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ClientStatus {
    Unknown,
    Connected,
    Ready,
    Playing,
    Goal,
}

impl From<ClientStatus> for u8 {
    fn from(status: ClientStatus) -> Self {
        match status {
            ClientStatus::Unknown => 0,
            ClientStatus::Connected => 5,
            ClientStatus::Ready => 10,
            ClientStatus::Playing => 20,
            ClientStatus::Goal => 30,
        }
    }
}

impl TryFrom<u8> for ClientStatus {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(ClientStatus::Unknown),
            5 => Ok(ClientStatus::Connected),
            10 => Ok(ClientStatus::Ready),
            20 => Ok(ClientStatus::Playing),
            30 => Ok(ClientStatus::Goal),
            other => Err(format!("unknown client status {}", other)),
        }
    }
}

/// Whether scouting a location also reveals it to other participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HintMode {
    /// Query only
    #[default]
    None,
    /// Announce a hint for every scouted location
    Announce,
    /// Announce only locations not already hinted
    AnnounceNew,
}

impl From<HintMode> for u8 {
    fn from(mode: HintMode) -> Self {
        match mode {
            HintMode::None => 0,
            HintMode::Announce => 1,
            HintMode::AnnounceNew => 2,
        }
    }
}

impl TryFrom<u8> for HintMode {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(HintMode::None),
            1 => Ok(HintMode::Announce),
            2 => Ok(HintMode::AnnounceNew),
            other => Err(format!("unknown hint mode {}", other)),
        }
    }
}

impl From<bool> for HintMode {
    fn from(create_as_hint: bool) -> Self {
        if create_as_hint {
            HintMode::Announce
        } else {
            HintMode::None
        }
    }
}
