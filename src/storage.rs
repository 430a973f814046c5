//! Key-value persistence with an optional synced mirror.
//!
//! Consistency policy: every write lands in the local store first and is then
//! pushed to the synced store (if any) without waiting for it. Reads are served
//! from the local store. The synced store is folded into the local one once at
//! boot through [`Storage::hydrate`], where a non-empty synced value wins over
//! the local one. Concurrent writers resolve as last-writer-wins.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod keys {
    pub const RAW_TEXT: &str = "rawText";
    pub const CURSOR_LAST_POSITION: &str = "cursorLastPosition";
    pub const LAST_EDITED: &str = "lastEdited";
    pub const HISTORY: &str = "history";
    pub const SETTINGS: &str = "settings";
    pub const DATE_FORMAT: &str = "dateFormat";
    pub const CUSTOM_CSS: &str = "customCss";
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageError {
    Unavailable,
    Rejected { key: String, reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "local storage is unavailable"),
            StorageError::Rejected { key, reason } => {
                write!(f, "write to `{key}` was rejected: {reason}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Synchronous string store, e.g. `window.localStorage`.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Best-effort mirror. Implementations report their own failures; callers
/// never learn whether a push landed.
pub trait RemoteStore {
    fn push(&self, key: &str, value: &str);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Picks the value a read should observe when both stores have an opinion.
pub fn prefer_synced(synced: Option<String>, local: Option<String>) -> Option<String> {
    synced.filter(|value| !value.is_empty()).or(local)
}

pub struct Storage {
    local: Box<dyn KeyValueStore>,
    remote: Option<Box<dyn RemoteStore>>,
}

impl Storage {
    pub fn new(local: Box<dyn KeyValueStore>) -> Self {
        Self {
            local,
            remote: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::default()))
    }

    pub fn with_remote(mut self, remote: Box<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn is_synced(&self) -> bool {
        self.remote.is_some()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.local.get(key)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        if let Err(err) = self.local.set(key, value) {
            log::warn!("{err}");
        }
        if let Some(remote) = &self.remote {
            remote.push(key, value);
        }
    }

    /// Folds a synced snapshot into the local store without echoing it back.
    /// Returns how many keys changed.
    pub fn hydrate<I>(&mut self, snapshot: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut changed = 0;
        for (key, synced) in snapshot {
            let local = self.local.get(&key);
            let Some(value) = prefer_synced(Some(synced), local.clone()) else {
                continue;
            };
            if local.as_deref() == Some(value.as_str()) {
                continue;
            }
            match self.local.set(&key, &value) {
                Ok(()) => changed += 1,
                Err(err) => log::warn!("hydrate: {err}"),
            }
        }
        changed
    }

    /// Missing and malformed values both read as `None`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("ignoring malformed `{key}`: {err}");
                None
            }
        }
    }

    pub fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw),
            Err(err) => log::error!("could not serialize `{key}`: {err}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Remote fake that records every push.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingRemote {
        pub pushes: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl RemoteStore for RecordingRemote {
        fn push(&self, key: &str, value: &str) {
            self.pushes
                .borrow_mut()
                .push((key.to_string(), value.to_string()));
        }
    }

    struct FullStore;

    impl KeyValueStore for FullStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Rejected {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            })
        }
    }

    #[test]
    fn writes_go_to_both_stores() {
        let remote = RecordingRemote::default();
        let mut storage = Storage::in_memory().with_remote(Box::new(remote.clone()));

        storage.set(keys::RAW_TEXT, "# hi");

        assert_eq!(storage.get(keys::RAW_TEXT).as_deref(), Some("# hi"));
        assert_eq!(
            remote.pushes.borrow().as_slice(),
            &[("rawText".to_string(), "# hi".to_string())]
        );
    }

    #[test]
    fn rejected_local_write_still_reaches_remote() {
        let remote = RecordingRemote::default();
        let mut storage = Storage::new(Box::new(FullStore)).with_remote(Box::new(remote.clone()));

        storage.set(keys::DATE_FORMAT, "yyyy");

        assert_eq!(storage.get(keys::DATE_FORMAT), None);
        assert_eq!(remote.pushes.borrow().len(), 1);
    }

    #[test]
    fn hydrate_prefers_non_empty_synced_values() {
        let mut storage = Storage::in_memory();
        storage.set(keys::RAW_TEXT, "local");
        storage.set(keys::CUSTOM_CSS, "body {}");

        let changed = storage.hydrate(vec![
            (keys::RAW_TEXT.to_string(), "synced".to_string()),
            (keys::CUSTOM_CSS.to_string(), String::new()),
            (keys::DATE_FORMAT.to_string(), "HH:MM".to_string()),
        ]);

        assert_eq!(changed, 2);
        assert_eq!(storage.get(keys::RAW_TEXT).as_deref(), Some("synced"));
        assert_eq!(storage.get(keys::CUSTOM_CSS).as_deref(), Some("body {}"));
        assert_eq!(storage.get(keys::DATE_FORMAT).as_deref(), Some("HH:MM"));
    }

    #[test]
    fn hydrate_does_not_echo_to_remote() {
        let remote = RecordingRemote::default();
        let mut storage = Storage::in_memory().with_remote(Box::new(remote.clone()));
        storage.hydrate(vec![("rawText".to_string(), "x".to_string())]);
        assert!(remote.pushes.borrow().is_empty());
    }

    #[test]
    fn malformed_json_reads_as_absent() {
        let mut storage = Storage::in_memory();
        storage.set(keys::HISTORY, "[{not json");
        assert_eq!(storage.get_json::<Vec<String>>(keys::HISTORY), None);
        assert_eq!(storage.get_json::<Vec<String>>(keys::SETTINGS), None);
    }

    #[test]
    fn prefer_synced_falls_back_on_empty() {
        assert_eq!(
            prefer_synced(Some(String::new()), Some("a".into())).as_deref(),
            Some("a")
        );
        assert_eq!(
            prefer_synced(Some("b".into()), Some("a".into())).as_deref(),
            Some("b")
        );
        assert_eq!(prefer_synced(None, None), None);
    }
}
