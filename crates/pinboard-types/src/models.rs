use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The credential-free view of a registered user. This is what the session
/// holds and what gets persisted as the current-user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An entry of the registered-users collection: the user plus its stored
/// credential (an Argon2 PHC string).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Records read back from storage or a backup may omit any field; missing
/// ones take their defaults, with `createdAt` falling back to the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pin {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub user_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    /// Snapshot of the board this pin was most recently saved to.
    /// Board membership lists remain the source of truth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_name: Option<String>,
    pub tags: Vec<String>,
    pub likes: usize,
    pub liked_by: Vec<String>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_color: Option<String>,
}

impl Pin {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|id| id == user_id)
    }

    /// Toggle `user_id` in the liker set and resync the count.
    /// Returns true if the like was added.
    pub fn toggle_like(&mut self, user_id: &str) -> bool {
        let added = if self.is_liked_by(user_id) {
            self.liked_by.retain(|id| id != user_id);
            false
        } else {
            self.liked_by.push(user_id.to_string());
            true
        };
        self.likes = self.liked_by.len();
        added
    }

    /// Case-insensitive substring match on title, description and tags.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }

    pub fn set_board(&mut self, board: Option<&Board>) {
        self.board_id = board.map(|b| b.id.clone());
        self.board_name = board.map(|b| b.name.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub description: String,
    pub user_id: String,
    pub pin_ids: Vec<String>,
    pub is_secret: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl Board {
    pub fn contains(&self, pin_id: &str) -> bool {
        self.pin_ids.iter().any(|id| id == pin_id)
    }
}
