//! # ap-client
//!
//! Connection core that lets a game's simulation thread drive a multiworld
//! server session.
//!
//! This crate provides:
//! - `Session` / `SessionFactory` traits implemented by protocol adapters
//! - `Exclusive` scoped access around the non-thread-safe session
//! - `MainThreadDispatcher` for work that must run on the game thread
//! - `StatusRegistry` holding the player-facing status line
//! - `ConnectionController` with the per-tick `poll` driver and reconnect policy

pub mod clock;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod exclusive;
pub mod hooks;
mod poll;
pub mod session;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, ReconnectPolicy};
pub use controller::ConnectionController;
pub use dispatcher::{DeferredTask, DrainReport, MainThreadDispatcher};
pub use exclusive::Exclusive;
pub use hooks::GameHooks;
pub use session::{EventSink, Handshake, Session, SessionFactory};
pub use status::{StatusMessage, StatusRegistry};
