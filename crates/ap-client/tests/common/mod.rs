//! Scripted in-memory session used by the integration tests

#![allow(dead_code)]

use ap_client::{
    ClientConfig, ConnectionController, EventSink, GameHooks, Handshake, ManualClock, Session,
    SessionFactory,
};
use ap_core::{
    ApError, ClientStatus, ConnectionTarget, DisconnectCause, HintMode, ItemId, LocationId,
    NetworkItem, PlayerSlot, Result, SessionEvent, SlotInfo,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// What the sessions saw, shared between the test and the factory
#[derive(Default)]
pub struct ScriptState {
    pub opened: usize,
    pub live_sessions: usize,
    pub targets: Vec<String>,
    pub handshakes: Vec<Handshake>,
    pub sink: Option<EventSink>,
    pub polls: usize,
    pub poll_errors: VecDeque<ApError>,
    pub reconnects: usize,
    pub checks: Vec<LocationId>,
    pub scouts: Vec<(Vec<LocationId>, HintMode)>,
    pub statuses: Vec<ClientStatus>,
    pub fail_open: Option<String>,
    /// Time each `poll` spends inside the session
    pub poll_delay: Option<Duration>,
    /// Emit `Connected` as soon as a session opens
    pub handshake_on_open: bool,
}

#[derive(Default)]
pub struct Script {
    state: Mutex<ScriptState>,
}

impl Script {
    pub fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap()
    }

    /// Emit through the most recently opened session's sink
    pub fn emit(&self, event: SessionEvent) {
        let sink = self.state().sink.clone().expect("no session opened");
        sink.emit(event);
    }

    pub fn connected(&self) {
        self.emit(SessionEvent::Connected(SlotInfo {
            team: 0,
            slot: 1,
            ..Default::default()
        }));
    }

    pub fn drop_connection(&self, reason: &str) {
        self.emit(SessionEvent::Disconnected(DisconnectCause::Transient(
            reason.to_string(),
        )));
    }

    pub fn refuse(&self, errors: &[&str]) {
        self.emit(SessionEvent::Disconnected(DisconnectCause::Refused(
            errors.iter().map(|e| e.to_string()).collect(),
        )));
    }

    pub fn fail_handshake(&self, reason: &str) {
        self.emit(SessionEvent::Disconnected(DisconnectCause::HandshakeFailed(
            reason.to_string(),
        )));
    }

    pub fn queue_poll_errors(&self, count: usize, make: impl Fn(usize) -> ApError) {
        let mut state = self.state();
        for i in 0..count {
            state.poll_errors.push_back(make(i));
        }
    }
}

#[derive(Clone, Default)]
pub struct ScriptedFactory {
    pub script: Arc<Script>,
}

impl SessionFactory for ScriptedFactory {
    fn open(
        &self,
        target: &ConnectionTarget,
        handshake: &Handshake,
        events: EventSink,
    ) -> Result<Box<dyn Session>> {
        let mut state = self.script.state();
        if let Some(reason) = state.fail_open.clone() {
            return Err(ApError::TransientNetwork(reason));
        }
        // The previous session must be gone before a new one is opened
        assert_eq!(state.live_sessions, 0, "two sessions alive at once");
        state.opened += 1;
        state.live_sessions += 1;
        state.targets.push(target.to_string());
        state.handshakes.push(handshake.clone());
        if state.handshake_on_open {
            events.emit(SessionEvent::Connected(SlotInfo {
                team: 0,
                slot: 1,
                ..Default::default()
            }));
        }
        state.sink = Some(events);
        Ok(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
        }))
    }
}

pub struct ScriptedSession {
    script: Arc<Script>,
}

impl Session for ScriptedSession {
    fn poll(&mut self) -> Result<()> {
        let delay = {
            let mut state = self.script.state();
            state.polls += 1;
            if let Some(err) = state.poll_errors.pop_front() {
                return Err(err);
            }
            state.poll_delay
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        Ok(())
    }

    fn reconnect(&mut self) -> Result<()> {
        self.script.state().reconnects += 1;
        Ok(())
    }

    fn location_checks(&mut self, locations: &[LocationId]) -> Result<()> {
        self.script.state().checks.extend_from_slice(locations);
        Ok(())
    }

    fn location_scouts(&mut self, locations: &[LocationId], hint: HintMode) -> Result<()> {
        self.script.state().scouts.push((locations.to_vec(), hint));
        Ok(())
    }

    fn status_update(&mut self, status: ClientStatus) -> Result<()> {
        self.script.state().statuses.push(status);
        Ok(())
    }

    fn item_name(&self, item: ItemId, player: PlayerSlot) -> Option<String> {
        (item > 0).then(|| format!("Item {} for {}", item, player))
    }

    fn player_alias(&self, player: PlayerSlot) -> Option<String> {
        (player > 0).then(|| format!("Player{}", player))
    }

    fn player_game(&self, player: PlayerSlot) -> Option<String> {
        (player > 0).then(|| "Okami HD".to_string())
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.script.state().live_sessions -= 1;
    }
}

/// Game state recording every hook call
#[derive(Debug, Default)]
pub struct Recorder {
    pub connected: Vec<SlotInfo>,
    pub disconnected: Vec<DisconnectCause>,
    pub items: Vec<(usize, Vec<NetworkItem>)>,
    pub messages: Vec<String>,
    pub bounces: Vec<Vec<String>>,
    pub scouted: Vec<NetworkItem>,
    pub data_packages: Vec<Vec<String>>,
}

impl GameHooks for Recorder {
    fn on_connected(&mut self, info: SlotInfo) -> Result<()> {
        self.connected.push(info);
        Ok(())
    }

    fn on_disconnected(&mut self, cause: DisconnectCause) -> Result<()> {
        self.disconnected.push(cause);
        Ok(())
    }

    fn on_items_received(&mut self, index: usize, items: Vec<NetworkItem>) -> Result<()> {
        self.items.push((index, items));
        Ok(())
    }

    fn on_message(&mut self, text: String) -> Result<()> {
        self.messages.push(text);
        Ok(())
    }

    fn on_data_package(&mut self, games: Vec<String>) -> Result<()> {
        self.data_packages.push(games);
        Ok(())
    }

    fn on_bounced(&mut self, tags: Vec<String>, _data: serde_json::Value) -> Result<()> {
        self.bounces.push(tags);
        Ok(())
    }

    fn on_location_info(&mut self, items: Vec<NetworkItem>) -> Result<()> {
        self.scouted.extend(items);
        Ok(())
    }
}

pub struct Harness {
    pub controller: ConnectionController<Recorder>,
    pub script: Arc<Script>,
    pub clock: Arc<ManualClock>,
    pub game: Recorder,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        init_tracing();
        let factory = ScriptedFactory::default();
        let script = Arc::clone(&factory.script);
        let clock = Arc::new(ManualClock::new());
        let controller = ConnectionController::with_clock(factory, config, clock.clone());
        Self {
            controller,
            script,
            clock,
            game: Recorder::default(),
        }
    }

    /// One game tick: poll then drain
    pub fn tick(&mut self) {
        self.controller.poll();
        self.controller.process_main_thread_tasks(&mut self.game);
    }

    pub fn advance(&mut self, by: Duration) {
        self.clock.advance(by);
    }

    /// Connect to localhost and complete the handshake
    pub fn connect_and_handshake(&mut self) {
        self.controller.connect("localhost", "Player1", "");
        self.script.connected();
        self.tick();
    }
}
