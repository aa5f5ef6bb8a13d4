use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use pinboard_types::api::{EXPORT_VERSION, ExportData};
use pinboard_types::events::StoreEvent;

use crate::error::Result;
use crate::pins::{PinStore, normalize};

/// File name offered for a backup taken on `date`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("pinboard-backup-{}.json", date.format("%Y-%m-%d"))
}

impl PinStore {
    /// Serialize both collections into a versioned, pretty-printed backup.
    pub fn export_data(&self) -> Result<String> {
        let data = ExportData {
            pins: self.pins.clone(),
            boards: self.boards.clone(),
            export_date: Some(Utc::now()),
            version: Some(EXPORT_VERSION.to_string()),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Replace both collections with the contents of a backup.
    ///
    /// Returns false, changing nothing, if the payload is not a backup:
    /// unparseable, or missing either collection. Fields absent from a
    /// record take their defaults, and a backup from an unknown format
    /// version is still read. Records are normalized before they are stored.
    pub fn import_data(&mut self, payload: &str) -> Result<bool> {
        let data: ExportData = match serde_json::from_str(payload) {
            Ok(data) => data,
            Err(e) => {
                warn!("Rejected import: {}", e);
                return Ok(false);
            }
        };

        if let Some(version) = data.version.as_deref().filter(|v| *v != EXPORT_VERSION) {
            warn!("Importing backup of unknown version {}, reading it as {}", version, EXPORT_VERSION);
        }

        let (mut pins, mut boards) = (data.pins, data.boards);
        normalize(&mut pins, &mut boards);
        self.commit(Some(pins), Some(boards))?;

        info!("Imported {} pins and {} boards", self.pins.len(), self.boards.len());
        self.dispatcher.broadcast(StoreEvent::DataImported {
            pins: self.pins.len(),
            boards: self.boards.len(),
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::DateTime;
    use pinboard_db::MemoryStorage;
    use pinboard_types::api::NewPin;

    use super::*;
    use crate::dispatcher::Dispatcher;

    fn seeded() -> PinStore {
        let mut store = PinStore::open(Arc::new(MemoryStorage::new()), Dispatcher::new()).unwrap();
        let pin = store
            .add_pin(NewPin {
                title: "Lighthouse".into(),
                image_url: "data:image/png;base64,iVBORw0KGgo=".into(),
                user_id: "u1".into(),
                username: "ana".into(),
                tags: vec!["coast".into()],
                ..Default::default()
            })
            .unwrap();
        store.like_pin(&pin.id, "u2").unwrap();
        store
    }

    #[test]
    fn export_carries_version_and_date() {
        let store = seeded();
        let json: serde_json::Value = serde_json::from_str(&store.export_data().unwrap()).unwrap();
        assert_eq!(json["version"], "1.0");
        assert!(json["exportDate"].is_string());
        assert_eq!(json["pins"].as_array().unwrap().len(), 1);
        assert!(json["boards"].as_array().unwrap().is_empty());
    }

    #[test]
    fn rejects_non_backups_without_touching_state() {
        let mut store = seeded();
        let before = store.pins().to_vec();

        for payload in [
            "not json",
            "[]",
            r#"{"pins": []}"#,
            r#"{"boards": []}"#,
            r#"{"pins": {}, "boards": []}"#,
            r#"{"pins": [{"id": 7}], "boards": []}"#,
        ] {
            assert!(!store.import_data(payload).unwrap(), "accepted {payload}");
        }
        assert_eq!(store.pins(), before.as_slice());
    }

    #[test]
    fn import_replaces_rather_than_merges() {
        let mut store = seeded();
        assert!(store.import_data(r#"{"pins": [], "boards": []}"#).unwrap());
        assert!(store.pins().is_empty());
    }

    #[test]
    fn import_resyncs_like_counts() {
        let mut store = seeded();
        let payload = r#"{
            "pins": [{
                "id": "1700000000000",
                "title": "Old pin",
                "description": "",
                "imageUrl": "https://img.example/old.jpg",
                "userId": "u1",
                "username": "ana",
                "tags": [],
                "likes": 7,
                "likedBy": ["u2"],
                "comments": [],
                "createdAt": "2024-03-01T10:00:00.000Z"
            }],
            "boards": []
        }"#;

        assert!(store.import_data(payload).unwrap());
        let pin = store.pin("1700000000000").unwrap();
        assert_eq!(pin.likes, 1);
    }

    #[test]
    fn import_fills_missing_fields_with_defaults() {
        let mut store = seeded();
        let payload = r#"{
            "pins": [{
                "id": "1700000000001",
                "title": "Sketch",
                "imageUrl": "https://img.example/sketch.jpg",
                "userId": "u1",
                "boardId": "b1",
                "boardName": "Drafts"
            }],
            "boards": [{
                "id": "b1",
                "name": "Drafts",
                "userId": "u1",
                "pinIds": ["1700000000001"]
            }],
            "version": "0.9"
        }"#;

        assert!(store.import_data(payload).unwrap());

        let pin = store.pin("1700000000001").unwrap();
        assert_eq!(pin.username, "");
        assert_eq!(pin.likes, 0);
        assert!(pin.comments.is_empty());
        assert_eq!(pin.created_at, DateTime::<Utc>::UNIX_EPOCH);

        let board = store.board("b1").unwrap();
        assert_eq!(board.created_at, DateTime::<Utc>::UNIX_EPOCH);
        assert!(!board.is_secret);
        assert_eq!(store.board_pins("b1").len(), 1);
    }

    #[test]
    fn import_drops_repeated_ids() {
        let mut store = seeded();
        let payload = r#"{
            "pins": [
                {"id": "p1", "title": "first", "likedBy": ["u2", "u2"], "likes": 2},
                {"id": "p1", "title": "second"},
                {"id": "", "title": "anonymous"}
            ],
            "boards": [
                {"id": "b1", "name": "Keep", "pinIds": ["p1", "p1"]},
                {"id": "b1", "name": "Drop"}
            ]
        }"#;

        assert!(store.import_data(payload).unwrap());

        assert_eq!(store.pins().len(), 2);
        let pin = store.pin("p1").unwrap();
        assert_eq!(pin.title, "first");
        assert_eq!(pin.liked_by, vec!["u2".to_string()]);
        assert_eq!(pin.likes, 1);
        assert!(!store.pins()[1].id.is_empty());
        assert!(store.pin(&store.pins()[1].id).is_some());

        assert_eq!(store.boards().len(), 1);
        assert_eq!(store.board("b1").unwrap().name, "Keep");
        assert_eq!(store.board("b1").unwrap().pin_ids, vec!["p1".to_string()]);
    }

    #[test]
    fn backup_name_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(backup_file_name(date), "pinboard-backup-2026-10-17.json");
    }
}
