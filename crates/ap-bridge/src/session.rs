//! WebSocket-backed session
//!
//! Network I/O runs on a tokio runtime owned by the host. The session itself
//! only moves data between channels, so every `Session` method returns
//! immediately on the calling thread.

use crate::protocol::{ClientPacket, ServerPacket};
use crate::store::DataStore;
use crate::transport::{Inbound, connection_task};
use crate::ws;
use ap_client::{EventSink, Handshake, Session, SessionFactory};
use ap_core::{
    ApError, ClientStatus, ConnectionTarget, DisconnectCause, HintMode, ItemId, LocationId,
    PlayerSlot, Result, SessionEvent, SlotInfo,
};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens [`WsSession`]s on a runtime handle
pub struct WsSessionFactory {
    runtime: Handle,
    connect_timeout: Duration,
}

impl WsSessionFactory {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Bound on TCP, TLS and WebSocket upgrade for each attempt
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl SessionFactory for WsSessionFactory {
    fn open(
        &self,
        target: &ConnectionTarget,
        handshake: &Handshake,
        events: EventSink,
    ) -> Result<Box<dyn Session>> {
        let mut session = WsSession {
            runtime: self.runtime.clone(),
            connect_timeout: self.connect_timeout,
            target: target.clone(),
            handshake: handshake.clone(),
            events,
            link: None,
            store: DataStore::new(),
            checked: BTreeSet::new(),
            pending_status: None,
        };
        session.start_link();
        Ok(Box::new(session))
    }
}

/// One connection attempt and its channels
struct Link {
    outbound: mpsc::UnboundedSender<Vec<ClientPacket>>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    task: JoinHandle<()>,
    started: Instant,
    /// Server accepted our `Connect`
    handshaken: bool,
}

/// Session speaking the multiworld protocol over a WebSocket
///
/// Locations checked while the link is down or mid-handshake are kept and
/// sent after the next successful handshake, as is a pending goal report.
pub struct WsSession {
    runtime: Handle,
    connect_timeout: Duration,
    target: ConnectionTarget,
    handshake: Handshake,
    events: EventSink,
    link: Option<Link>,
    store: DataStore,
    checked: BTreeSet<LocationId>,
    pending_status: Option<ClientStatus>,
}

impl WsSession {
    fn start_link(&mut self) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let uri = self.target.uri().to_string();
        let timeout = self.connect_timeout;

        debug!("Starting connection to {}", uri);
        let task = self.runtime.spawn(async move {
            match ws::connect(&uri, timeout).await {
                Ok((reader, writer)) => connection_task(reader, writer, out_rx, in_tx).await,
                Err(e) => {
                    let _ = in_tx.send(Inbound::Closed(e.to_string()));
                }
            }
        });

        self.link = Some(Link {
            outbound: out_tx,
            inbound: in_rx,
            task,
            started: Instant::now(),
            handshaken: false,
        });
    }

    fn stop_link(&mut self) {
        if let Some(link) = self.link.take() {
            link.task.abort();
        }
    }

    fn is_handshaken(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.handshaken)
    }

    fn send(&self, packets: Vec<ClientPacket>) -> Result<()> {
        let link = self
            .link
            .as_ref()
            .ok_or_else(|| ApError::TransientNetwork("no connection to server".into()))?;
        link.outbound
            .send(packets)
            .map_err(|_| ApError::TransientNetwork("connection task stopped".into()))
    }

    fn emit(&self, event: SessionEvent) {
        if !self.events.emit(event) {
            debug!(generation = self.events.generation(), "Event dropped, controller gone");
        }
    }

    fn connect_packet(&self) -> ClientPacket {
        ClientPacket::Connect {
            password: self.target.password().to_string(),
            game: self.handshake.game.clone(),
            name: self.target.slot().to_string(),
            uuid: self.handshake.uuid.clone(),
            version: self.handshake.version.into(),
            items_handling: self.handshake.items_handling,
            tags: self.handshake.tags.clone(),
            slot_data: true,
        }
    }

    fn handle_packet(&mut self, packet: ServerPacket) -> Result<()> {
        match packet {
            ServerPacket::RoomInfo {
                games,
                datapackage_checksums,
                seed_name,
                password,
                ..
            } => {
                debug!(seed = %seed_name, password, "Room info received");
                let mut batch = Vec::new();
                let missing = self.store.missing_games(&games, &datapackage_checksums);
                if !missing.is_empty() {
                    batch.push(ClientPacket::GetDataPackage { games: missing });
                }
                batch.push(self.connect_packet());
                self.send(batch)
            }

            ServerPacket::ConnectionRefused { errors } => {
                warn!("Connection refused: {:?}", errors);
                self.stop_link();
                self.emit(SessionEvent::Disconnected(DisconnectCause::Refused(errors)));
                Ok(())
            }

            ServerPacket::Connected {
                team,
                slot,
                players,
                missing_locations,
                checked_locations,
                slot_data,
                slot_info,
            } => {
                info!("Handshake complete as slot {} on team {}", slot, team);
                self.store.apply_connected(&players, &slot_info);
                if let Some(link) = self.link.as_mut() {
                    link.handshaken = true;
                }

                let mut batch = Vec::new();
                let unsent: Vec<LocationId> = self
                    .checked
                    .iter()
                    .copied()
                    .filter(|location| !checked_locations.contains(location))
                    .collect();
                if !unsent.is_empty() {
                    debug!("Resending {} checked locations", unsent.len());
                    batch.push(ClientPacket::LocationChecks { locations: unsent });
                }
                if let Some(status) = self.pending_status.take() {
                    batch.push(ClientPacket::StatusUpdate { status });
                }
                if !batch.is_empty() {
                    self.send(batch)?;
                }

                self.emit(SessionEvent::Connected(SlotInfo {
                    team,
                    slot,
                    players,
                    checked_locations,
                    missing_locations,
                    slot_data,
                }));
                Ok(())
            }

            ServerPacket::ReceivedItems { index, items } => {
                debug!("Received {} items at index {}", items.len(), index);
                self.emit(SessionEvent::ItemsReceived { index, items });
                Ok(())
            }

            ServerPacket::LocationInfo { locations } => {
                self.emit(SessionEvent::LocationInfo(locations));
                Ok(())
            }

            ServerPacket::RoomUpdate { players, .. } => {
                if let Some(players) = players {
                    self.store.set_players(&players);
                }
                Ok(())
            }

            ServerPacket::PrintJson { data } => {
                let text = self.store.render(&data);
                self.emit(SessionEvent::PrintedMessage(text));
                Ok(())
            }

            ServerPacket::DataPackage { data } => {
                let games = self.store.apply_data_package(data);
                self.emit(SessionEvent::DataPackage { games });
                Ok(())
            }

            ServerPacket::Bounced { tags, data } => {
                self.emit(SessionEvent::Bounced { tags, data });
                Ok(())
            }

            ServerPacket::InvalidPacket {
                kind,
                original_cmd,
                text,
            } => {
                warn!("Server rejected {:?} ({}): {}", original_cmd, kind, text);
                let reason = format!(
                    "server rejected {}: {}",
                    original_cmd.as_deref().unwrap_or("packet"),
                    text
                );
                if self.link.is_some() && !self.is_handshaken() {
                    // Rejected during the handshake: fatal, not retried
                    self.stop_link();
                    self.emit(SessionEvent::Disconnected(DisconnectCause::HandshakeFailed(
                        reason,
                    )));
                    return Ok(());
                }
                Err(ApError::Protocol(reason))
            }

            ServerPacket::Unknown => Ok(()),
        }
    }
}

impl Session for WsSession {
    fn poll(&mut self) -> Result<()> {
        let mut received = Vec::new();
        if let Some(link) = self.link.as_mut() {
            while let Ok(message) = link.inbound.try_recv() {
                received.push(message);
            }
        }

        let mut first_error = None;
        for message in received {
            match message {
                Inbound::Packets(packets) => {
                    for packet in packets {
                        if let Err(e) = self.handle_packet(packet) {
                            first_error.get_or_insert(e);
                        }
                        // Link stopped by a refusal or failed handshake; drop the rest
                        if self.link.is_none() {
                            break;
                        }
                    }
                }
                Inbound::Closed(reason) => {
                    info!("Connection to {} lost: {}", self.target.uri(), reason);
                    self.stop_link();
                    self.emit(SessionEvent::Disconnected(DisconnectCause::Transient(reason)));
                }
            }
            if self.link.is_none() {
                break;
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn reconnect(&mut self) -> Result<()> {
        if let Some(link) = &self.link {
            if !link.handshaken && link.started.elapsed() < self.connect_timeout {
                debug!("Connection attempt still in flight, not restarting");
                return Ok(());
            }
        }
        self.stop_link();
        self.start_link();
        Ok(())
    }

    fn location_checks(&mut self, locations: &[LocationId]) -> Result<()> {
        self.checked.extend(locations.iter().copied());
        if self.is_handshaken() {
            self.send(vec![ClientPacket::LocationChecks {
                locations: locations.to_vec(),
            }])
        } else {
            debug!("Holding {} checks until the handshake completes", locations.len());
            Ok(())
        }
    }

    fn location_scouts(&mut self, locations: &[LocationId], hint: HintMode) -> Result<()> {
        if !self.is_handshaken() {
            return Err(ApError::TransientNetwork("handshake not complete".into()));
        }
        self.send(vec![ClientPacket::LocationScouts {
            locations: locations.to_vec(),
            create_as_hint: hint,
        }])
    }

    fn status_update(&mut self, status: ClientStatus) -> Result<()> {
        if self.is_handshaken() {
            self.send(vec![ClientPacket::StatusUpdate { status }])
        } else {
            self.pending_status = Some(status);
            Ok(())
        }
    }

    fn item_name(&self, item: ItemId, player: PlayerSlot) -> Option<String> {
        self.store.item_name(item, player)
    }

    fn player_alias(&self, player: PlayerSlot) -> Option<String> {
        self.store.player_alias(player)
    }

    fn player_game(&self, player: PlayerSlot) -> Option<String> {
        self.store.player_game(player)
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.stop_link();
    }
}
