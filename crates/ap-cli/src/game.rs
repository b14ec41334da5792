//! Console stand-in for the game side of the client

use ap_client::GameHooks;
use ap_core::{DisconnectCause, NetworkItem, Result, SlotInfo};
use tracing::{info, warn};

/// Logs everything the server delivers and tracks the received-item index
#[derive(Debug, Default)]
pub struct ConsoleGame {
    next_index: usize,
    received: Vec<NetworkItem>,
}

impl ConsoleGame {
    pub fn received(&self) -> &[NetworkItem] {
        &self.received
    }
}

impl GameHooks for ConsoleGame {
    fn on_connected(&mut self, info: SlotInfo) -> Result<()> {
        info!(
            "Slot {} on team {}: {} locations left, {} checked",
            info.slot,
            info.team,
            info.missing_locations.len(),
            info.checked_locations.len()
        );
        Ok(())
    }

    fn on_disconnected(&mut self, cause: DisconnectCause) -> Result<()> {
        match cause {
            DisconnectCause::Transient(reason) => warn!("Connection lost: {}", reason),
            other => warn!("Session ended: {:?}", other),
        }
        Ok(())
    }

    fn on_items_received(&mut self, index: usize, items: Vec<NetworkItem>) -> Result<()> {
        // Index 0 is a full resync
        if index == 0 {
            self.received.clear();
        } else if index != self.next_index {
            warn!(
                "Item index {} does not follow {}; waiting for resync",
                index, self.next_index
            );
            return Ok(());
        }

        for item in &items {
            info!(
                "Received item {} from player {} (location {}){}",
                item.item,
                item.player,
                item.location,
                if item.is_progression() { " [progression]" } else { "" }
            );
        }
        self.next_index = index + items.len();
        self.received.extend(items);
        Ok(())
    }

    fn on_message(&mut self, text: String) -> Result<()> {
        println!("{}", text);
        Ok(())
    }

    fn on_data_package(&mut self, games: Vec<String>) -> Result<()> {
        info!("Names loaded for {}", games.join(", "));
        Ok(())
    }

    fn on_bounced(&mut self, tags: Vec<String>, data: serde_json::Value) -> Result<()> {
        info!("Bounce {:?}: {}", tags, data);
        Ok(())
    }

    fn on_location_info(&mut self, items: Vec<NetworkItem>) -> Result<()> {
        for item in items {
            println!(
                "Location {} holds item {} for player {}",
                item.location, item.item, item.player
            );
        }
        Ok(())
    }
}
