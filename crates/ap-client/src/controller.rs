//! Connection lifecycle and command surface
//!
//! The controller is the only owner of the session. Commands may come from any
//! thread; `poll` and `process_main_thread_tasks` belong to the game thread.
//! Nothing here returns an error to the caller: failures end up in the status
//! line or as a `false` / empty-string result.

use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::dispatcher::{DrainReport, MainThreadDispatcher};
use crate::exclusive::Exclusive;
use crate::hooks::GameHooks;
use crate::poll::PollBook;
use crate::session::{EventSink, Handshake, Session, SessionFactory};
use crate::status::{StatusMessage, StatusRegistry};
use ap_core::{
    ApError, ClientStatus, ConnectionState, ConnectionTarget, HintMode, ItemId, LocationId,
    PlayerSlot, SessionEvent,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// State reachable from deferred tasks
pub(crate) struct Shared {
    pub(crate) session: Exclusive<Box<dyn Session>>,
    pub(crate) status: StatusRegistry,
    /// Written only while the session lock is held
    state: AtomicU8,
    /// Bumped whenever a session is installed or removed
    pub(crate) generation: AtomicU64,
    pub(crate) has_attempted: AtomicBool,
    goal_sent: AtomicBool,
}

impl Shared {
    pub(crate) fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Caller must hold the session lock
    pub(crate) fn set_state(&self, state: ConnectionState) {
        let previous = ConnectionState::from_u8(self.state.swap(state.as_u8(), Ordering::SeqCst));
        if previous != state {
            debug!("Connection state {} -> {}", previous, state);
        }
    }
}

/// Owns the server session and exposes the client command surface
pub struct ConnectionController<G: GameHooks = ()> {
    pub(crate) shared: Arc<Shared>,
    pub(crate) dispatcher: MainThreadDispatcher<G>,
    pub(crate) book: Mutex<PollBook>,
    events_tx: mpsc::UnboundedSender<(u64, SessionEvent)>,
    factory: Box<dyn SessionFactory>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: ClientConfig,
}

impl<G: GameHooks> ConnectionController<G> {
    /// Create a controller that opens sessions through `factory`
    pub fn new(factory: impl SessionFactory + 'static, config: ClientConfig) -> Self {
        Self::with_clock(factory, config, Arc::new(SystemClock))
    }

    /// Create with an explicit time source
    pub fn with_clock(
        factory: impl SessionFactory + 'static,
        config: ClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let status = StatusRegistry::new();
        status.set_status("Not connected");

        Self {
            shared: Arc::new(Shared {
                session: Exclusive::empty(),
                status,
                state: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
                generation: AtomicU64::new(0),
                has_attempted: AtomicBool::new(false),
                goal_sent: AtomicBool::new(false),
            }),
            dispatcher: MainThreadDispatcher::new(),
            book: Mutex::new(PollBook::new(events_rx)),
            events_tx,
            factory: Box::new(factory),
            clock,
            config,
        }
    }

    /// Start connecting to `server` as `slot`
    ///
    /// Returns immediately; the handshake completes during a later `poll`.
    /// Ignored with a status update if a session already exists.
    pub fn connect(&self, server: &str, slot: &str, password: &str) {
        self.shared.has_attempted.store(true, Ordering::SeqCst);

        let target = match ConnectionTarget::new(server, slot, password) {
            Ok(target) => target,
            Err(e) => {
                warn!("Rejected connection settings: {}", e);
                self.shared
                    .status
                    .set_status(format!("Invalid connection settings: {}", e));
                return;
            }
        };

        let uuid = Uuid::new_v4().to_string();
        let handshake = Handshake {
            uuid: uuid.clone(),
            game: self.config.game.clone(),
            version: self.config.version,
            items_handling: self.config.items_handling,
            tags: self.config.tags.clone(),
        };

        // Status is written under the session lock; a concurrent `Connected`
        // is applied after it, never before
        let opened = self.shared.session.with_slot(|slot| {
            if slot.is_some() {
                return Err(None::<ApError>);
            }
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let sink = EventSink::new(generation, self.events_tx.clone());
            let session = self
                .factory
                .open(&target, &handshake, sink)
                .map_err(Some)?;
            *slot = Some(session);
            self.shared.set_state(ConnectionState::Connecting);

            info!("Connecting to {}", target);
            self.book().start(target.clone(), generation, self.clock.now());
            self.shared.goal_sent.store(false, Ordering::SeqCst);
            self.shared.status.set_uuid(uuid);
            self.shared
                .status
                .set_status(format!("Connecting to {}...", target));
            Ok(())
        });

        match opened {
            Ok(()) => {}
            Err(None) => {
                debug!("connect({}) ignored, session already exists", target);
                self.shared
                    .status
                    .set_status("Already connected; disconnect first");
            }
            Err(Some(e)) => {
                error!("Failed to open session to {}: {}", target, e);
                self.shared
                    .status
                    .set_status(format!("Connection failed: {}", e));
            }
        }
    }

    /// Drop the session; already queued tasks still run and find it gone
    pub fn disconnect(&self) {
        let had_session = self.shared.session.with_slot(|slot| {
            let session = slot.take();
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            self.shared.set_state(ConnectionState::Disconnected);
            session.is_some()
        });

        self.book().clear_retry();

        if had_session {
            info!("Disconnected");
            self.shared.status.set_status("Disconnected");
        } else {
            debug!("disconnect() with no session");
        }
    }

    /// True while a session exists (connecting, connected or reconnecting)
    pub fn is_connected(&self) -> bool {
        self.shared.state().is_live()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Report a found location
    pub fn send_location(&self, location: LocationId) {
        self.send_locations(&[location]);
    }

    /// Report several found locations in one message
    ///
    /// The send itself happens on the main thread during the next
    /// `process_main_thread_tasks`.
    pub fn send_locations(&self, locations: &[LocationId]) {
        if locations.is_empty() {
            return;
        }
        if !self.shared.session.is_present() {
            self.shared
                .status
                .set_status(format!("Not connected: {} not sent", describe(locations)));
            return;
        }

        let shared = Arc::clone(&self.shared);
        let locations = locations.to_vec();
        self.dispatcher.enqueue(move |_: &mut G| {
            match shared.session.try_with(|s| s.location_checks(&locations)) {
                Ok(()) => {
                    debug!("Sent {}", describe(&locations));
                    Ok(())
                }
                Err(ApError::NotConnected) => {
                    shared
                        .status
                        .set_status(format!("Not connected: {} not sent", describe(&locations)));
                    Ok(())
                }
                Err(e) => Err(e),
            }
        });
    }

    /// Tell the server the goal is complete; repeated calls are no-ops
    pub fn game_finished(&self) {
        if self.shared.goal_sent.load(Ordering::SeqCst) {
            debug!("Goal already reported");
            return;
        }
        if !self.shared.session.is_present() {
            self.shared
                .status
                .set_status("Not connected: goal not reported");
            return;
        }

        let shared = Arc::clone(&self.shared);
        self.dispatcher.enqueue(move |_: &mut G| {
            if shared.goal_sent.load(Ordering::SeqCst) {
                return Ok(());
            }
            match shared.session.try_with(|s| s.status_update(ClientStatus::Goal)) {
                Ok(()) => {
                    shared.goal_sent.store(true, Ordering::SeqCst);
                    info!("Goal reported");
                    shared.status.set_status("Goal complete!");
                    Ok(())
                }
                Err(ApError::NotConnected) => {
                    shared
                        .status
                        .set_status("Not connected: goal not reported");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        });
    }

    /// Ask the server what is placed at `locations`
    ///
    /// Returns whether the request was handed to the session. Replies arrive
    /// later through [`GameHooks::on_location_info`].
    pub fn scout_locations(&self, locations: &[LocationId], hint: impl Into<HintMode>) -> bool {
        if locations.is_empty() {
            return false;
        }
        let hint = hint.into();
        match self
            .shared
            .session
            .try_with(|s| s.location_scouts(locations, hint))
        {
            Ok(()) => {
                debug!("Scouting {} ({:?})", describe(locations), hint);
                true
            }
            Err(ApError::NotConnected) => {
                self.shared
                    .status
                    .set_status("Not connected: cannot scout locations");
                false
            }
            Err(e) => {
                warn!("Scout request failed: {}", e);
                false
            }
        }
    }

    /// Item name for `player`'s game, or empty if unknown or disconnected
    pub fn get_item_name(&self, item: ItemId, player: PlayerSlot) -> String {
        self.shared
            .session
            .with(|s| s.item_name(item, player))
            .flatten()
            .unwrap_or_default()
    }

    /// Owner description shown next to an item, e.g. `"Amaterasu (Okami HD)"`
    pub fn get_item_desc(&self, player: PlayerSlot) -> String {
        self.shared
            .session
            .with(|s| match (s.player_alias(player), s.player_game(player)) {
                (Some(alias), Some(game)) => format!("{} ({})", alias, game),
                (Some(alias), None) => alias,
                _ => String::new(),
            })
            .unwrap_or_default()
    }

    /// Human-readable summary of the current target and state
    pub fn get_connection_info(&self) -> String {
        let state = self.state();
        match &self.book().target {
            Some(target) if state != ConnectionState::Disconnected => {
                format!("{} ({})", target, state)
            }
            _ => state.to_string(),
        }
    }

    pub fn get_uuid(&self) -> String {
        self.shared.status.uuid()
    }

    pub fn get_status(&self) -> String {
        self.shared.status.status()
    }

    /// Status, UUID and revision read together
    pub fn status_snapshot(&self) -> StatusMessage {
        self.shared.status.snapshot()
    }

    /// Run queued work against the game state
    ///
    /// # Panics
    ///
    /// Panics if called from a different thread than the first call.
    pub fn process_main_thread_tasks(&self, game: &mut G) -> DrainReport {
        self.dispatcher.drain(game)
    }

    /// Tasks waiting for the next `process_main_thread_tasks`
    pub fn pending_tasks(&self) -> usize {
        self.dispatcher.pending()
    }

    /// When `poll` last ran
    pub fn last_poll(&self) -> Option<Instant> {
        self.book().last_poll
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn book(&self) -> MutexGuard<'_, PollBook> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn describe(locations: &[LocationId]) -> String {
    match locations {
        [single] => format!("location {}", single),
        many => format!("{} locations", many.len()),
    }
}
