use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::KeyValueStore;

/// Load and parse the blob under `key`.
///
/// A missing key and an unparseable blob both yield `None`; the latter is
/// logged so corrupt storage degrades to an empty state instead of failing
/// the read path. Only storage errors are returned as `Err`.
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key).with_context(|| format!("reading {key}"))? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Corrupt blob under '{}', ignoring it: {}", key, e);
            Ok(None)
        }
    }
}

/// Serialize `value` and overwrite the blob under `key`.
pub fn write_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).with_context(|| format!("serializing {key}"))?;
    store.set(key, &raw).with_context(|| format!("writing {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    #[test]
    fn missing_key_reads_as_none() {
        let store = MemoryStorage::new();
        let value: Option<Vec<String>> = read_json(&store, "absent").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn corrupt_blob_reads_as_none() {
        let store = MemoryStorage::new();
        store.set("pins", "{not json").unwrap();
        let value: Option<Vec<String>> = read_json(&store, "pins").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn write_then_read() {
        let store = MemoryStorage::new();
        write_json(&store, "tags", &vec!["a", "b"]).unwrap();
        let value: Option<Vec<String>> = read_json(&store, "tags").unwrap();
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
    }
}
