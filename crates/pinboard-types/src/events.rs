use serde::{Deserialize, Serialize};

/// Change notifications broadcast by the stores after each successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreEvent {
    /// A user signed in or registered
    SessionStarted { user_id: String },

    /// The session was cleared
    SessionEnded,

    /// The signed-in user edited their profile
    ProfileUpdated { user_id: String },

    PinCreated { pin_id: String },
    PinUpdated { pin_id: String },
    PinDeleted { pin_id: String },

    /// A like was toggled; `liked` is the new state for this user
    PinLiked {
        pin_id: String,
        user_id: String,
        liked: bool,
        likes: usize,
    },

    CommentAdded { pin_id: String, comment_id: String },

    BoardCreated { board_id: String },
    BoardUpdated { board_id: String },
    BoardDeleted { board_id: String },
    PinAddedToBoard { pin_id: String, board_id: String },
    PinRemovedFromBoard { pin_id: String, board_id: String },

    /// Both collections were replaced from a backup
    DataImported { pins: usize, boards: usize },
}
