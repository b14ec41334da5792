//! Game-side reactions to session events

use crate::dispatcher::DeferredTask;
use ap_core::{DisconnectCause, NetworkItem, Result, SessionEvent, SlotInfo};

/// Implemented by the game state owned by the main thread
///
/// Every method runs inside `process_main_thread_tasks`, never on the thread
/// that produced the event. All methods default to doing nothing.
pub trait GameHooks: 'static {
    fn on_connected(&mut self, _info: SlotInfo) -> Result<()> {
        Ok(())
    }

    fn on_disconnected(&mut self, _cause: DisconnectCause) -> Result<()> {
        Ok(())
    }

    /// `index` is the position of the first item in the slot's full item list
    fn on_items_received(&mut self, _index: usize, _items: Vec<NetworkItem>) -> Result<()> {
        Ok(())
    }

    fn on_message(&mut self, _text: String) -> Result<()> {
        Ok(())
    }

    fn on_data_package(&mut self, _games: Vec<String>) -> Result<()> {
        Ok(())
    }

    fn on_bounced(&mut self, _tags: Vec<String>, _data: serde_json::Value) -> Result<()> {
        Ok(())
    }

    fn on_location_info(&mut self, _items: Vec<NetworkItem>) -> Result<()> {
        Ok(())
    }
}

impl GameHooks for () {}

/// Wrap an event as a task that hands it to the game hooks
pub(crate) fn into_task<G: GameHooks>(event: SessionEvent) -> DeferredTask<G> {
    match event {
        SessionEvent::Connected(info) => Box::new(move |game: &mut G| game.on_connected(info)),
        SessionEvent::Disconnected(cause) => {
            Box::new(move |game: &mut G| game.on_disconnected(cause))
        }
        SessionEvent::ItemsReceived { index, items } => {
            Box::new(move |game: &mut G| game.on_items_received(index, items))
        }
        SessionEvent::PrintedMessage(text) => Box::new(move |game: &mut G| game.on_message(text)),
        SessionEvent::DataPackage { games } => {
            Box::new(move |game: &mut G| game.on_data_package(games))
        }
        SessionEvent::Bounced { tags, data } => {
            Box::new(move |game: &mut G| game.on_bounced(tags, data))
        }
        SessionEvent::LocationInfo(items) => {
            Box::new(move |game: &mut G| game.on_location_info(items))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        received: Vec<(usize, usize)>,
        messages: Vec<String>,
    }

    impl GameHooks for Recorder {
        fn on_items_received(&mut self, index: usize, items: Vec<NetworkItem>) -> Result<()> {
            self.received.push((index, items.len()));
            Ok(())
        }

        fn on_message(&mut self, text: String) -> Result<()> {
            self.messages.push(text);
            Ok(())
        }
    }

    #[test]
    fn test_events_reach_matching_hook() {
        let mut game = Recorder::default();
        let item = NetworkItem {
            item: 1,
            location: 2,
            player: 1,
            flags: 0,
        };

        into_task::<Recorder>(SessionEvent::ItemsReceived {
            index: 3,
            items: vec![item.clone(), item],
        })(&mut game)
        .unwrap();
        into_task::<Recorder>(SessionEvent::PrintedMessage("hello".into()))(&mut game).unwrap();
        into_task::<Recorder>(SessionEvent::DataPackage { games: vec![] })(&mut game).unwrap();

        assert_eq!(game.received, vec![(3, 2)]);
        assert_eq!(game.messages, vec!["hello".to_string()]);
    }
}
