//! # ap-core
//!
//! Core types shared by the multiworld session client crates.
//!
//! This crate provides:
//! - Location, item and player identifiers
//! - Connection targets and URI building
//! - The connection state machine states
//! - Session events delivered by the protocol session
//! - Error types

pub mod error;
pub mod event;
pub mod item;
pub mod state;
pub mod target;

pub use error::{ApError, Result};
pub use event::{DisconnectCause, SessionEvent, SlotInfo};
pub use item::{ClientStatus, HintMode, ItemId, LocationId, NetworkItem, NetworkPlayer, PlayerSlot};
pub use state::ConnectionState;
pub use target::{ConnectionTarget, DEFAULT_PORT};
