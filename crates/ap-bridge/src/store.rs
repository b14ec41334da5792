//! Item, location and player names learned from the server

use crate::protocol::{DataPackageContents, JsonMessagePart, NetworkSlot};
use ap_core::{ItemId, LocationId, NetworkPlayer, PlayerSlot};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
struct GameNames {
    items: HashMap<ItemId, String>,
    locations: HashMap<LocationId, String>,
    checksum: Option<String>,
}

/// Name lookups for the current room
///
/// Data packages survive reconnects; player and slot tables are replaced on
/// every successful handshake.
#[derive(Debug, Default)]
pub struct DataStore {
    games: HashMap<String, GameNames>,
    players: HashMap<PlayerSlot, NetworkPlayer>,
    slot_games: HashMap<PlayerSlot, String>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Games from a room announcement whose names we lack or hold stale
    pub fn missing_games(
        &self,
        games: &[String],
        checksums: &HashMap<String, String>,
    ) -> Vec<String> {
        games
            .iter()
            .filter(|game| match (self.games.get(*game), checksums.get(*game)) {
                (None, _) => true,
                (Some(known), Some(wanted)) => known.checksum.as_ref() != Some(wanted),
                (Some(_), None) => false,
            })
            .cloned()
            .collect()
    }

    /// Store a data package, returning the games it covered
    pub fn apply_data_package(&mut self, data: DataPackageContents) -> Vec<String> {
        let mut loaded = Vec::with_capacity(data.games.len());
        for (game, contents) in data.games {
            debug!(
                "Data package for {}: {} items, {} locations",
                game,
                contents.item_name_to_id.len(),
                contents.location_name_to_id.len()
            );
            let names = GameNames {
                items: contents
                    .item_name_to_id
                    .into_iter()
                    .map(|(name, id)| (id, name))
                    .collect(),
                locations: contents
                    .location_name_to_id
                    .into_iter()
                    .map(|(name, id)| (id, name))
                    .collect(),
                checksum: contents.checksum,
            };
            self.games.insert(game.clone(), names);
            loaded.push(game);
        }
        loaded.sort();
        loaded
    }

    /// Replace the player tables from a handshake reply
    pub fn apply_connected(
        &mut self,
        players: &[NetworkPlayer],
        slot_info: &HashMap<String, NetworkSlot>,
    ) {
        self.set_players(players);
        self.slot_games = slot_info
            .iter()
            .filter_map(|(slot, info)| Some((slot.parse().ok()?, info.game.clone())))
            .collect();
    }

    pub fn set_players(&mut self, players: &[NetworkPlayer]) {
        self.players = players.iter().map(|p| (p.slot, p.clone())).collect();
    }

    pub fn item_name(&self, item: ItemId, player: PlayerSlot) -> Option<String> {
        let game = self.slot_games.get(&player)?;
        self.games.get(game)?.items.get(&item).cloned()
    }

    pub fn location_name(&self, location: LocationId, player: PlayerSlot) -> Option<String> {
        let game = self.slot_games.get(&player)?;
        self.games.get(game)?.locations.get(&location).cloned()
    }

    pub fn player_alias(&self, player: PlayerSlot) -> Option<String> {
        self.players.get(&player).map(|p| p.alias.clone())
    }

    pub fn player_game(&self, player: PlayerSlot) -> Option<String> {
        self.slot_games.get(&player).cloned()
    }

    /// Flatten a `PrintJSON` message into plain text
    ///
    /// Player, item and location ids are replaced by names when known and
    /// left as the raw text otherwise.
    pub fn render(&self, parts: &[JsonMessagePart]) -> String {
        let mut out = String::new();
        for part in parts {
            let text = part.text.as_deref().unwrap_or_default();
            let owner = part.player.unwrap_or_default();
            let resolved = match part.kind.as_deref() {
                Some("player_id") => text.parse().ok().and_then(|slot| self.player_alias(slot)),
                Some("item_id") => text.parse().ok().and_then(|id| self.item_name(id, owner)),
                Some("location_id") => text
                    .parse()
                    .ok()
                    .and_then(|id| self.location_name(id, owner)),
                _ => None,
            };
            out.push_str(resolved.as_deref().unwrap_or(text));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::GameData;

    fn store() -> DataStore {
        let mut store = DataStore::new();
        let mut games = HashMap::new();
        games.insert(
            "Okami HD".to_string(),
            GameData {
                item_name_to_id: HashMap::from([("Brush Technique".to_string(), 100)]),
                location_name_to_id: HashMap::from([("River of the Heavens".to_string(), 200)]),
                checksum: Some("abc".into()),
            },
        );
        store.apply_data_package(DataPackageContents { games });

        let players = vec![
            NetworkPlayer {
                team: 0,
                slot: 1,
                alias: "Ammy".into(),
                name: "Player1".into(),
            },
            NetworkPlayer {
                team: 0,
                slot: 2,
                alias: "Issun".into(),
                name: "Player2".into(),
            },
        ];
        let slot_info = HashMap::from([
            (
                "1".to_string(),
                NetworkSlot {
                    name: "Player1".into(),
                    game: "Okami HD".into(),
                },
            ),
            (
                "2".to_string(),
                NetworkSlot {
                    name: "Player2".into(),
                    game: "Other Game".into(),
                },
            ),
        ]);
        store.apply_connected(&players, &slot_info);
        store
    }

    #[test]
    fn test_lookups_follow_the_owning_players_game() {
        let store = store();
        assert_eq!(store.item_name(100, 1).as_deref(), Some("Brush Technique"));
        // Slot 2 plays a game with no data package loaded
        assert_eq!(store.item_name(100, 2), None);
        assert_eq!(store.item_name(999, 1), None);
        assert_eq!(store.player_alias(2).as_deref(), Some("Issun"));
        assert_eq!(store.player_game(2).as_deref(), Some("Other Game"));
        assert_eq!(store.player_alias(9), None);
    }

    #[test]
    fn test_missing_games_by_checksum() {
        let store = store();
        let games = vec!["Okami HD".to_string(), "Other Game".to_string()];

        let fresh = HashMap::from([("Okami HD".to_string(), "abc".to_string())]);
        assert_eq!(store.missing_games(&games, &fresh), vec!["Other Game"]);

        let stale = HashMap::from([("Okami HD".to_string(), "def".to_string())]);
        assert_eq!(
            store.missing_games(&games, &stale),
            vec!["Okami HD", "Other Game"]
        );
    }

    #[test]
    fn test_render_resolves_ids() {
        let store = store();
        let part = |kind: Option<&str>, text: &str, player: Option<PlayerSlot>| JsonMessagePart {
            kind: kind.map(str::to_string),
            text: Some(text.to_string()),
            player,
        };

        let parts = vec![
            part(Some("player_id"), "1", None),
            part(None, " found ", None),
            part(Some("item_id"), "100", Some(1)),
            part(None, " at ", None),
            part(Some("location_id"), "200", Some(1)),
            part(None, " for ", None),
            part(Some("player_id"), "7", None),
        ];
        assert_eq!(
            store.render(&parts),
            "Ammy found Brush Technique at River of the Heavens for 7"
        );
    }
}
