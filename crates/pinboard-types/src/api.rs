use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Board, Pin, User};

/// Format marker written into every export.
pub const EXPORT_VERSION: &str = "1.0";

// -- Auth --

/// Fields a signed-in user may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(avatar) = self.avatar {
            user.avatar = Some(avatar);
        }
        if let Some(bio) = self.bio {
            user.bio = Some(bio);
        }
        if let Some(website) = self.website {
            user.website = Some(website);
        }
    }
}

// -- Pins --

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPin {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub image_url: String,
    pub link: Option<String>,
    pub user_id: String,
    pub username: String,
    pub user_avatar: Option<String>,
    pub board_id: Option<String>,
    pub board_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub dominant_color: Option<String>,
}

/// Content edits to an existing pin. Likes, comments and board
/// association have dedicated operations and cannot be patched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// `Some(None)` clears the link; JSON `null` reads as that.
    #[serde(default, deserialize_with = "present")]
    pub link: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    pub dominant_color: Option<Option<String>>,
}

impl PinUpdate {
    pub fn apply(self, pin: &mut Pin) {
        if let Some(title) = self.title {
            pin.title = title;
        }
        if let Some(description) = self.description {
            pin.description = description;
        }
        if let Some(image_url) = self.image_url {
            pin.image_url = image_url;
        }
        if let Some(link) = self.link {
            pin.link = link;
        }
        if let Some(tags) = self.tags {
            pin.tags = tags;
        }
        if let Some(color) = self.dominant_color {
            pin.dominant_color = color;
        }
    }
}

/// Tells a field sent as `null` apart from one left out: a present field,
/// null or not, deserializes to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub user_id: String,
    pub username: String,
    pub user_avatar: Option<String>,
    pub text: String,
}

// -- Boards --

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBoard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub user_id: String,
    #[serde(default)]
    pub is_secret: bool,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_secret: Option<bool>,
    pub cover_image: Option<String>,
}

impl BoardUpdate {
    pub fn apply(self, board: &mut Board) {
        if let Some(name) = self.name {
            board.name = name;
        }
        if let Some(description) = self.description {
            board.description = description;
        }
        if let Some(is_secret) = self.is_secret {
            board.is_secret = is_secret;
        }
        if let Some(cover) = self.cover_image {
            board.cover_image = Some(cover);
        }
    }
}

// -- Export / import --

/// Whole-collection backup envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub pins: Vec<Pin>,
    pub boards: Vec<Board>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Split a comma-separated tag field into trimmed, non-empty tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tags_trims_and_drops_empty() {
        assert_eq!(parse_tags(" travel, food ,,  ,art"), vec!["travel", "food", "art"]);
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ").is_empty());
    }

    #[test]
    fn export_requires_both_collections() {
        let ok: Result<ExportData, _> = serde_json::from_str(r#"{"pins":[],"boards":[]}"#);
        assert!(ok.is_ok());

        let missing: Result<ExportData, _> = serde_json::from_str(r#"{"pins":[]}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn board_update_only_touches_given_fields() {
        let mut board = Board {
            id: "b1".into(),
            name: "Travel".into(),
            description: "places".into(),
            user_id: "u1".into(),
            pin_ids: vec!["p1".into()],
            is_secret: false,
            created_at: Utc::now(),
            cover_image: None,
        };
        BoardUpdate {
            is_secret: Some(true),
            ..Default::default()
        }
        .apply(&mut board);

        assert!(board.is_secret);
        assert_eq!(board.name, "Travel");
        assert_eq!(board.pin_ids, vec!["p1".to_string()]);
    }

    #[test]
    fn pin_update_tells_null_from_absent() {
        let cleared: PinUpdate = serde_json::from_str(r#"{"link": null}"#).unwrap();
        assert_eq!(cleared.link, Some(None));
        assert_eq!(cleared.dominant_color, None);

        let mut pin = Pin {
            link: Some("https://example.com".into()),
            dominant_color: Some("#336699".into()),
            ..Default::default()
        };
        cleared.apply(&mut pin);
        assert!(pin.link.is_none());
        assert_eq!(pin.dominant_color.as_deref(), Some("#336699"));

        let set: PinUpdate = serde_json::from_str(r##"{"dominantColor": "#000000"}"##).unwrap();
        set.apply(&mut pin);
        assert_eq!(pin.dominant_color.as_deref(), Some("#000000"));
    }
}
