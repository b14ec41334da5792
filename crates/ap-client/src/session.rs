//! Session traits implemented by protocol adapters

use ap_core::{
    ClientStatus, ConnectionTarget, HintMode, ItemId, LocationId, PlayerSlot, Result, SessionEvent,
};
use tokio::sync::mpsc;

/// Identity presented to the server during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Session UUID, fresh for every `connect`
    pub uuid: String,
    /// Game name the slot was generated for
    pub game: String,
    /// Protocol version (major, minor, build)
    pub version: (u32, u32, u32),
    /// Which items the server should send back to this client
    pub items_handling: u8,
    pub tags: Vec<String>,
}

/// Sender half of the event channel handed to a session when it is opened
///
/// Events are tagged with the generation of the session that produced them so
/// the poll loop can drop anything a replaced session emits late.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, SessionEvent)>,
}

impl EventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, SessionEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Create a sink together with its receiving end
    pub fn channel(generation: u64) -> (Self, mpsc::UnboundedReceiver<(u64, SessionEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(generation, tx), rx)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event; returns false once the controller is gone
    pub fn emit(&self, event: SessionEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// An opened connection to the multiworld server
///
/// Implementations are not required to be thread-safe beyond `Send`; the
/// controller only ever touches a session through [`crate::Exclusive`].
/// None of these methods may block on network I/O.
pub trait Session: Send {
    /// Pump pending network activity, emitting events through the sink
    fn poll(&mut self) -> Result<()>;

    /// Start a new connection attempt after a transient failure
    fn reconnect(&mut self) -> Result<()>;

    /// Report found locations
    fn location_checks(&mut self, locations: &[LocationId]) -> Result<()>;

    /// Ask what is placed at the given locations; replies arrive as
    /// [`SessionEvent::LocationInfo`]
    fn location_scouts(&mut self, locations: &[LocationId], hint: HintMode) -> Result<()>;

    /// Report client progress
    fn status_update(&mut self, status: ClientStatus) -> Result<()>;

    /// Item name from the data package of `player`'s game
    fn item_name(&self, item: ItemId, player: PlayerSlot) -> Option<String>;

    fn player_alias(&self, player: PlayerSlot) -> Option<String>;

    fn player_game(&self, player: PlayerSlot) -> Option<String>;
}

/// Opens sessions for the controller
pub trait SessionFactory: Send + Sync {
    /// Create a session and begin connecting; must return without waiting
    /// for the handshake
    fn open(
        &self,
        target: &ConnectionTarget,
        handshake: &Handshake,
        events: EventSink,
    ) -> Result<Box<dyn Session>>;
}
