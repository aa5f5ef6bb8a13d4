use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use pinboard_types::api::{BoardUpdate, NewBoard};
use pinboard_types::events::StoreEvent;
use pinboard_types::models::{Board, Pin};

use crate::error::Result;
use crate::pins::PinStore;

impl PinStore {
    pub fn boards_by_user(&self, user_id: &str) -> Vec<&Board> {
        self.boards.iter().filter(|b| b.user_id == user_id).collect()
    }

    /// Every board whose membership list holds `pin_id`.
    pub fn boards_containing(&self, pin_id: &str) -> Vec<&Board> {
        self.boards.iter().filter(|b| b.contains(pin_id)).collect()
    }

    /// Pins that are members of a board, in feed order.
    pub fn board_pins(&self, board_id: &str) -> Vec<&Pin> {
        let Some(board) = self.board(board_id) else {
            return Vec::new();
        };
        self.pins.iter().filter(|p| board.contains(&p.id)).collect()
    }

    pub fn add_board(&mut self, new: NewBoard) -> Result<Board> {
        let board = Board {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            user_id: new.user_id,
            pin_ids: Vec::new(),
            is_secret: new.is_secret,
            created_at: Utc::now(),
            cover_image: new.cover_image,
        };

        let mut boards = self.boards.clone();
        boards.push(board.clone());
        self.commit(None, Some(boards))?;

        debug!("Created board {} '{}'", board.id, board.name);
        self.dispatcher.broadcast(StoreEvent::BoardCreated {
            board_id: board.id.clone(),
        });
        Ok(board)
    }

    /// Merge `updates` into a board. A rename is carried into the board
    /// snapshot of pins that reference it.
    pub fn update_board(&mut self, id: &str, updates: BoardUpdate) -> Result<bool> {
        let Some(index) = self.board_position(id) else {
            return Ok(false);
        };
        let mut boards = self.boards.clone();
        updates.apply(&mut boards[index]);
        let name = boards[index].name.clone();

        let mut pins = self.pins.clone();
        let mut renamed = false;
        for pin in pins.iter_mut().filter(|p| p.board_id.as_deref() == Some(id)) {
            if pin.board_name.as_deref() != Some(name.as_str()) {
                pin.board_name = Some(name.clone());
                renamed = true;
            }
        }
        self.commit(renamed.then_some(pins), Some(boards))?;

        self.dispatcher.broadcast(StoreEvent::BoardUpdated { board_id: id.to_string() });
        Ok(true)
    }

    /// Remove a board. Its pins survive; any pin whose board snapshot
    /// pointed here is re-pointed at another board it still belongs to.
    pub fn delete_board(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.board_position(id) else {
            return Ok(false);
        };

        let mut boards = self.boards.clone();
        let removed = boards.remove(index);

        let mut pins = self.pins.clone();
        let mut touched = false;
        for pin_id in &removed.pin_ids {
            touched |= refresh_board_ref(&mut pins, &boards, pin_id);
        }
        self.commit(touched.then_some(pins), Some(boards))?;

        debug!("Deleted board {}", id);
        self.dispatcher.broadcast(StoreEvent::BoardDeleted { board_id: id.to_string() });
        Ok(true)
    }

    /// Add a pin to a board's membership list (at most once) and point the
    /// pin's board snapshot at that board. Last call wins the snapshot.
    pub fn add_pin_to_board(&mut self, pin_id: &str, board_id: &str) -> Result<bool> {
        let (Some(pin_index), Some(board_index)) = (self.pin_position(pin_id), self.board_position(board_id)) else {
            return Ok(false);
        };

        let mut boards = self.boards.clone();
        let board = &mut boards[board_index];
        if !board.contains(pin_id) {
            board.pin_ids.push(pin_id.to_string());
        }

        let mut pins = self.pins.clone();
        pins[pin_index].set_board(Some(&boards[board_index]));
        self.commit(Some(pins), Some(boards))?;

        self.dispatcher.broadcast(StoreEvent::PinAddedToBoard {
            pin_id: pin_id.to_string(),
            board_id: board_id.to_string(),
        });
        Ok(true)
    }

    /// Drop a pin from one board. The pin's board snapshot is re-derived
    /// from the memberships that remain, and cleared if there are none.
    pub fn remove_pin_from_board(&mut self, pin_id: &str, board_id: &str) -> Result<bool> {
        let Some(index) = self.board_position(board_id) else {
            return Ok(false);
        };
        let mut boards = self.boards.clone();
        boards[index].pin_ids.retain(|id| id != pin_id);

        let mut pins = self.pins.clone();
        let touched = refresh_board_ref(&mut pins, &boards, pin_id);
        self.commit(touched.then_some(pins), Some(boards))?;

        self.dispatcher.broadcast(StoreEvent::PinRemovedFromBoard {
            pin_id: pin_id.to_string(),
            board_id: board_id.to_string(),
        });
        Ok(true)
    }
}

/// Keep the pin's snapshot if it still names a board holding the pin,
/// otherwise point it at the last such board or clear it.
/// Returns true if the pin changed.
fn refresh_board_ref(pins: &mut [Pin], boards: &[Board], pin_id: &str) -> bool {
    let Some(pin) = pins.iter_mut().find(|p| p.id == pin_id) else {
        return false;
    };

    let still_member = pin
        .board_id
        .as_deref()
        .and_then(|id| boards.iter().find(|b| b.id == id))
        .is_some_and(|b| b.contains(pin_id));
    if still_member {
        return false;
    }

    let fallback = boards.iter().rev().find(|b| b.contains(pin_id));
    let before = (pin.board_id.clone(), pin.board_name.clone());
    pin.set_board(fallback);
    before != (pin.board_id.clone(), pin.board_name.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pinboard_db::MemoryStorage;
    use pinboard_types::api::NewPin;

    use super::*;
    use crate::dispatcher::Dispatcher;

    fn store() -> PinStore {
        PinStore::open(Arc::new(MemoryStorage::new()), Dispatcher::new()).unwrap()
    }

    fn pin(store: &mut PinStore, title: &str) -> String {
        store
            .add_pin(NewPin {
                title: title.into(),
                image_url: "https://img.example/x.jpg".into(),
                user_id: "u1".into(),
                username: "ana".into(),
                ..Default::default()
            })
            .unwrap()
            .id
    }

    fn board(store: &mut PinStore, name: &str) -> String {
        store
            .add_board(NewBoard {
                name: name.into(),
                user_id: "u1".into(),
                ..Default::default()
            })
            .unwrap()
            .id
    }

    #[test]
    fn add_board_starts_empty() {
        let mut store = store();
        let id = board(&mut store, "Travel");
        let b = store.board(&id).unwrap();
        assert!(b.pin_ids.is_empty());
        assert!(!b.is_secret);
        assert_eq!(store.boards_by_user("u1").len(), 1);
    }

    #[test]
    fn add_pin_to_board_is_idempotent() {
        let mut store = store();
        let p = pin(&mut store, "beach");
        let b = board(&mut store, "Travel");

        assert!(store.add_pin_to_board(&p, &b).unwrap());
        assert!(store.add_pin_to_board(&p, &b).unwrap());

        assert_eq!(store.board(&b).unwrap().pin_ids, vec![p.clone()]);
        assert_eq!(store.pin(&p).unwrap().board_name.as_deref(), Some("Travel"));
    }

    #[test]
    fn add_pin_to_unknown_board_or_pin_is_rejected() {
        let mut store = store();
        let p = pin(&mut store, "beach");
        let b = board(&mut store, "Travel");

        assert!(!store.add_pin_to_board(&p, "nope").unwrap());
        assert!(!store.add_pin_to_board("nope", &b).unwrap());
        assert!(store.board(&b).unwrap().pin_ids.is_empty());
    }

    #[test]
    fn latest_board_wins_the_snapshot() {
        let mut store = store();
        let p = pin(&mut store, "beach");
        let travel = board(&mut store, "Travel");
        let summer = board(&mut store, "Summer");

        store.add_pin_to_board(&p, &travel).unwrap();
        store.add_pin_to_board(&p, &summer).unwrap();

        assert_eq!(store.pin(&p).unwrap().board_id.as_deref(), Some(summer.as_str()));
        assert_eq!(store.boards_containing(&p).len(), 2);
    }

    #[test]
    fn removing_from_one_board_falls_back_to_another() {
        let mut store = store();
        let p = pin(&mut store, "beach");
        let travel = board(&mut store, "Travel");
        let summer = board(&mut store, "Summer");
        store.add_pin_to_board(&p, &travel).unwrap();
        store.add_pin_to_board(&p, &summer).unwrap();

        store.remove_pin_from_board(&p, &summer).unwrap();
        assert!(store.board(&summer).unwrap().pin_ids.is_empty());
        assert_eq!(store.pin(&p).unwrap().board_name.as_deref(), Some("Travel"));

        store.remove_pin_from_board(&p, &travel).unwrap();
        let pin = store.pin(&p).unwrap();
        assert!(pin.board_id.is_none());
        assert!(pin.board_name.is_none());
        assert!(store.boards_containing(&p).is_empty());
    }

    #[test]
    fn delete_pin_cascades_to_boards() {
        let mut store = store();
        let p = pin(&mut store, "beach");
        let keep = pin(&mut store, "forest");
        let a = board(&mut store, "A");
        let b = board(&mut store, "B");
        for board_id in [&a, &b] {
            store.add_pin_to_board(&p, board_id).unwrap();
            store.add_pin_to_board(&keep, board_id).unwrap();
        }

        assert!(store.delete_pin(&p).unwrap());
        assert!(store.pin(&p).is_none());
        for board in store.boards() {
            assert_eq!(board.pin_ids, vec![keep.clone()]);
        }
        assert!(!store.delete_pin(&p).unwrap());
    }

    #[test]
    fn delete_board_keeps_pins_and_repairs_snapshot() {
        let mut store = store();
        let p = pin(&mut store, "beach");
        let travel = board(&mut store, "Travel");
        store.add_pin_to_board(&p, &travel).unwrap();

        assert!(store.delete_board(&travel).unwrap());
        assert!(store.board(&travel).is_none());

        let pin = store.pin(&p).unwrap();
        assert!(pin.board_id.is_none());
        assert_eq!(store.pins().len(), 1);
    }

    #[test]
    fn rename_follows_into_pin_snapshot() {
        let mut store = store();
        let p = pin(&mut store, "beach");
        let b = board(&mut store, "Travel");
        store.add_pin_to_board(&p, &b).unwrap();

        store
            .update_board(
                &b,
                BoardUpdate {
                    name: Some("Trips".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(store.board(&b).unwrap().name, "Trips");
        assert_eq!(store.pin(&p).unwrap().board_name.as_deref(), Some("Trips"));
    }

    #[test]
    fn board_pins_follow_feed_order() {
        let mut store = store();
        let older = pin(&mut store, "older");
        let newer = pin(&mut store, "newer");
        let b = board(&mut store, "Mixed");
        store.add_pin_to_board(&older, &b).unwrap();
        store.add_pin_to_board(&newer, &b).unwrap();

        let titles: Vec<_> = store.board_pins(&b).iter().map(|p| p.title.clone()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
        assert!(store.board_pins("missing").is_empty());
    }
}
