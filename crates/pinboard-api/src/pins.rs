use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pinboard_db::{Storage, keys, read_json, write_json};
use pinboard_types::api::{NewComment, NewPin, PinUpdate};
use pinboard_types::events::StoreEvent;
use pinboard_types::models::{Board, Comment, Pin};

use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// Page size of the home feed.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Owns the pin and board collections.
///
/// Both collections live in memory. A mutation builds the new collections
/// on the side and only swaps them in once storage has accepted them, so a
/// failed write leaves memory and storage as they were. Pins are kept
/// newest-first.
pub struct PinStore {
    storage: Storage,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) pins: Vec<Pin>,
    pub(crate) boards: Vec<Board>,
    pin_index: HashMap<String, usize>,
    board_index: HashMap<String, usize>,
}

impl PinStore {
    /// Load both collections from storage. Missing or corrupt blobs start empty.
    pub fn open(storage: Storage, dispatcher: Dispatcher) -> Result<Self> {
        let mut pins: Vec<Pin> = read_json(storage.as_ref(), keys::PINS)?.unwrap_or_default();
        let mut boards: Vec<Board> = read_json(storage.as_ref(), keys::BOARDS)?.unwrap_or_default();
        normalize(&mut pins, &mut boards);

        info!("Loaded {} pins and {} boards", pins.len(), boards.len());

        let mut store = Self {
            storage,
            dispatcher,
            pins,
            boards,
            pin_index: HashMap::new(),
            board_index: HashMap::new(),
        };
        store.reindex_pins();
        store.reindex_boards();
        Ok(store)
    }

    // -- Reads --

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn pin(&self, id: &str) -> Option<&Pin> {
        self.pin_index.get(id).map(|&i| &self.pins[i])
    }

    pub fn board(&self, id: &str) -> Option<&Board> {
        self.board_index.get(id).map(|&i| &self.boards[i])
    }

    pub fn pins_by_user(&self, user_id: &str) -> Vec<&Pin> {
        self.pins.iter().filter(|p| p.user_id == user_id).collect()
    }

    pub fn liked_pins(&self, user_id: &str) -> Vec<&Pin> {
        self.pins.iter().filter(|p| p.is_liked_by(user_id)).collect()
    }

    pub fn is_liked_by(&self, pin_id: &str, user_id: &str) -> bool {
        self.pin(pin_id).is_some_and(|p| p.is_liked_by(user_id))
    }

    /// Case-insensitive substring search over title, description and tags.
    /// A blank query returns every pin. Results keep collection order.
    pub fn search_pins(&self, query: &str) -> Vec<&Pin> {
        if query.trim().is_empty() {
            return self.pins.iter().collect();
        }

        let needle = query.to_lowercase();
        self.pins.iter().filter(|p| p.matches(&needle)).collect()
    }

    /// The feed as shown after `page + 1` loads: the newest
    /// `(page + 1) * per_page` pins.
    pub fn feed_page(&self, page: usize, per_page: usize) -> &[Pin] {
        let end = page
            .saturating_add(1)
            .saturating_mul(per_page)
            .min(self.pins.len());
        &self.pins[..end]
    }

    // -- Pin mutations --

    pub fn add_pin(&mut self, new: NewPin) -> Result<Pin> {
        let pin = Pin {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            image_url: new.image_url,
            link: new.link,
            user_id: new.user_id,
            username: new.username,
            user_avatar: new.user_avatar,
            board_id: new.board_id,
            board_name: new.board_name,
            tags: new.tags,
            likes: 0,
            liked_by: Vec::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
            dominant_color: new.dominant_color,
        };

        let mut pins = Vec::with_capacity(self.pins.len() + 1);
        pins.push(pin.clone());
        pins.extend(self.pins.iter().cloned());
        self.commit(Some(pins), None)?;

        debug!("Created pin {} '{}'", pin.id, pin.title);
        self.dispatcher.broadcast(StoreEvent::PinCreated { pin_id: pin.id.clone() });
        Ok(pin)
    }

    pub fn update_pin(&mut self, id: &str, updates: PinUpdate) -> Result<bool> {
        let Some(index) = self.pin_position(id) else {
            return Ok(false);
        };
        let mut pins = self.pins.clone();
        updates.apply(&mut pins[index]);
        self.commit(Some(pins), None)?;

        self.dispatcher.broadcast(StoreEvent::PinUpdated { pin_id: id.to_string() });
        Ok(true)
    }

    /// Remove a pin and drop it from every board's membership list.
    pub fn delete_pin(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.pin_position(id) else {
            return Ok(false);
        };

        let mut pins = self.pins.clone();
        pins.remove(index);

        let mut boards = self.boards.clone();
        for board in &mut boards {
            board.pin_ids.retain(|pin_id| pin_id != id);
        }
        self.commit(Some(pins), Some(boards))?;

        debug!("Deleted pin {}", id);
        self.dispatcher.broadcast(StoreEvent::PinDeleted { pin_id: id.to_string() });
        Ok(true)
    }

    /// Toggle `user_id`'s like on a pin. The like count always equals the
    /// number of likers.
    pub fn like_pin(&mut self, id: &str, user_id: &str) -> Result<bool> {
        let Some(index) = self.pin_position(id) else {
            return Ok(false);
        };
        let mut pins = self.pins.clone();
        let liked = pins[index].toggle_like(user_id);
        let likes = pins[index].likes;
        self.commit(Some(pins), None)?;

        self.dispatcher.broadcast(StoreEvent::PinLiked {
            pin_id: id.to_string(),
            user_id: user_id.to_string(),
            liked,
            likes,
        });
        Ok(true)
    }

    pub fn add_comment(&mut self, pin_id: &str, new: NewComment) -> Result<Option<Comment>> {
        let Some(index) = self.pin_position(pin_id) else {
            return Ok(None);
        };

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            username: new.username,
            user_avatar: new.user_avatar,
            text: new.text,
            created_at: Utc::now(),
        };
        let mut pins = self.pins.clone();
        pins[index].comments.push(comment.clone());
        self.commit(Some(pins), None)?;

        self.dispatcher.broadcast(StoreEvent::CommentAdded {
            pin_id: pin_id.to_string(),
            comment_id: comment.id.clone(),
        });
        Ok(Some(comment))
    }

    // -- Internals --

    pub(crate) fn pin_position(&self, id: &str) -> Option<usize> {
        self.pin_index.get(id).copied()
    }

    pub(crate) fn board_position(&self, id: &str) -> Option<usize> {
        self.board_index.get(id).copied()
    }

    /// Persist the given collections, then make them current.
    ///
    /// Boards are written before pins. If the pins write fails after the
    /// boards blob was replaced, the previous boards blob is written back.
    /// Memory is only touched once every write has succeeded.
    pub(crate) fn commit(&mut self, pins: Option<Vec<Pin>>, boards: Option<Vec<Board>>) -> Result<()> {
        if let Some(boards) = &boards {
            write_json(self.storage.as_ref(), keys::BOARDS, boards)?;
        }

        if let Some(pins) = &pins {
            if let Err(e) = write_json(self.storage.as_ref(), keys::PINS, pins) {
                if boards.is_some() {
                    if let Err(restore) = write_json(self.storage.as_ref(), keys::BOARDS, &self.boards) {
                        warn!("Could not restore boards after a failed pins write: {:#}", restore);
                    }
                }
                return Err(e.into());
            }
        }

        if let Some(pins) = pins {
            self.pins = pins;
            self.reindex_pins();
        }
        if let Some(boards) = boards {
            self.boards = boards;
            self.reindex_boards();
        }
        Ok(())
    }

    fn reindex_pins(&mut self) {
        self.pin_index = self
            .pins
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
    }

    fn reindex_boards(&mut self) {
        self.board_index = self
            .boards
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id.clone(), i))
            .collect();
    }
}

/// Bring loaded or imported collections in line with the id and like
/// invariants.
///
/// Blank ids get a fresh one. A record whose id repeats an earlier record's
/// is dropped, first one wins. Likers and board members are deduplicated and
/// every like count is resynced to its likers.
pub(crate) fn normalize(pins: &mut Vec<Pin>, boards: &mut Vec<Board>) {
    let mut seen = HashSet::new();
    pins.retain_mut(|pin| {
        if pin.id.trim().is_empty() {
            pin.id = Uuid::new_v4().to_string();
            warn!("Pin '{}' had no id, assigned {}", pin.title, pin.id);
        }
        if !seen.insert(pin.id.clone()) {
            warn!("Dropping pin '{}' with duplicate id {}", pin.title, pin.id);
            return false;
        }

        let mut likers = HashSet::new();
        pin.liked_by.retain(|user_id| likers.insert(user_id.clone()));
        if pin.likes != pin.liked_by.len() {
            warn!(
                "Pin {} had {} likes for {} likers, resyncing",
                pin.id,
                pin.likes,
                pin.liked_by.len()
            );
            pin.likes = pin.liked_by.len();
        }
        true
    });

    let mut seen = HashSet::new();
    boards.retain_mut(|board| {
        if board.id.trim().is_empty() {
            board.id = Uuid::new_v4().to_string();
            warn!("Board '{}' had no id, assigned {}", board.name, board.id);
        }
        if !seen.insert(board.id.clone()) {
            warn!("Dropping board '{}' with duplicate id {}", board.name, board.id);
            return false;
        }

        let mut members = HashSet::new();
        board.pin_ids.retain(|pin_id| members.insert(pin_id.clone()));
        true
    });
}
