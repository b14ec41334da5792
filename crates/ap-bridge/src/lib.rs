//! WebSocket session adapter
//!
//! This crate provides:
//! - JSON packet protocol spoken with the multiworld server
//! - Packet transport traits and their WebSocket implementation
//! - Background connection task bridging the socket to channels
//! - `WsSession`, an `ap_client::Session` that never blocks the caller

pub mod protocol;
pub mod session;
pub mod store;
pub mod transport;
pub mod ws;

pub use protocol::{ClientPacket, ServerPacket, deserialize, serialize};
pub use session::{WsSession, WsSessionFactory};
pub use store::DataStore;
pub use transport::{Inbound, PacketReader, PacketWriter, connection_task};
