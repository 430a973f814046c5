//! Browser backends for [`crate::storage`]: `window.localStorage` and the
//! extension's `chrome.storage.sync` area.

use std::collections::HashMap;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::storage::{KeyValueStore, RemoteStore, StorageError};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = get, catch)]
    async fn sync_get_all() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = set, catch)]
    async fn sync_set(items: JsValue) -> Result<JsValue, JsValue>;
}

pub struct LocalStore {
    inner: web_sys::Storage,
}

impl LocalStore {
    pub fn open() -> Result<Self, StorageError> {
        let inner = web_sys::window()
            .and_then(|window| window.local_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)?;
        Ok(Self { inner })
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner
            .set_item(key, value)
            .map_err(|err| StorageError::Rejected {
                key: key.to_string(),
                reason: format!("{err:?}"),
            })
    }
}

pub struct ChromeSync;

impl ChromeSync {
    /// `Some` when the page runs as an extension with the storage API.
    pub fn detect() -> Option<Self> {
        let chrome = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("chrome")).ok()?;
        if chrome.is_undefined() || chrome.is_null() {
            return None;
        }
        let storage = js_sys::Reflect::get(&chrome, &JsValue::from_str("storage")).ok()?;
        let sync = js_sys::Reflect::get(&storage, &JsValue::from_str("sync")).ok()?;
        (!sync.is_undefined() && !sync.is_null()).then_some(ChromeSync)
    }

    /// Every synced item as a string. Non-string values are JSON-encoded.
    pub async fn snapshot(&self) -> Vec<(String, String)> {
        let items = match sync_get_all().await {
            Ok(items) => items,
            Err(err) => {
                log::warn!("synced storage read failed: {err:?}");
                return Vec::new();
            }
        };
        let items: HashMap<String, serde_json::Value> = match serde_wasm_bindgen::from_value(items)
        {
            Ok(items) => items,
            Err(err) => {
                log::warn!("synced storage returned unexpected data: {err}");
                return Vec::new();
            }
        };
        items
            .into_iter()
            .map(|(key, value)| (key, synced_text(value)))
            .collect()
    }
}

/// Older builds synced numbers (`cursorLastPosition`, a `0` for
/// `lastEdited`); those read back as their JSON text.
fn synced_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

impl RemoteStore for ChromeSync {
    fn push(&self, key: &str, value: &str) {
        let mut item = HashMap::new();
        item.insert(key.to_string(), value.to_string());
        let args = match item.serialize(&serde_wasm_bindgen::Serializer::json_compatible()) {
            Ok(args) => args,
            Err(err) => {
                log::warn!("could not encode `{key}` for sync: {err}");
                return;
            }
        };
        let key = key.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = sync_set(args).await {
                log::warn!("synced write of `{key}` failed: {err:?}");
            }
        });
    }
}
