/// chrome.storage backed storage

use super::{Storage, StorageChange};
use crate::error::{StorageError, StorageResult};
use crate::events::Event;
use serde::Serialize;
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

// Import JS bridge functions
#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn storageGet(area: &str, key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageSet(area: &str, key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageRemove(area: &str, key: &str) -> Result<(), JsValue>;

    fn onStorageChanged(callback: &js_sys::Function);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    Sync,
    Local,
}

impl StorageArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Sync => "sync",
            StorageArea::Local => "local",
        }
    }
}

pub struct ExtensionStorage {
    key: String,
    area: Rc<Cell<StorageArea>>,
    changed: Event<StorageChange>,
}

impl ExtensionStorage {
    pub fn new(area: StorageArea, key: &str) -> Self {
        let area = Rc::new(Cell::new(area));
        let changed = Event::new();

        {
            let key = key.to_string();
            let area = area.clone();
            let changed = changed.clone();
            let callback = Closure::<dyn FnMut(String, String)>::new(
                move |changed_area: String, changed_key: String| {
                    if changed_key == key && changed_area == area.get().as_str() {
                        changed.emit(&StorageChange { key: key.clone() });
                    }
                },
            );
            onStorageChanged(callback.as_ref().unchecked_ref());
            callback.forget();
        }

        ExtensionStorage {
            key: key.to_string(),
            area,
            changed,
        }
    }

    pub fn area(&self) -> StorageArea {
        self.area.get()
    }

    /// Point the storage at another area; existing data is not migrated
    pub fn set_area(&self, area: StorageArea) {
        if self.area.get() != area {
            self.area.set(area);
            self.changed.emit(&StorageChange {
                key: self.key.clone(),
            });
        }
    }
}

impl Storage for ExtensionStorage {
    fn key(&self) -> &str {
        &self.key
    }

    async fn load(&self) -> StorageResult<Option<Value>> {
        let value_js = storageGet(self.area.get().as_str(), &self.key)
            .await
            .map_err(|e| StorageError::Backend(js_error_message(&e)))?;

        if value_js.is_null() || value_js.is_undefined() {
            Ok(None)
        } else {
            serde_wasm_bindgen::from_value(value_js)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string()))
        }
    }

    async fn save(&self, value: Value) -> StorageResult<()> {
        // Plain objects rather than JS Maps, so chrome.storage can persist them
        let value_js = value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        storageSet(self.area.get().as_str(), &self.key, value_js)
            .await
            .map_err(|e| classify_write_error(js_error_message(&e)))
    }

    async fn clear(&self) -> StorageResult<()> {
        storageRemove(self.area.get().as_str(), &self.key)
            .await
            .map_err(|e| StorageError::Backend(js_error_message(&e)))
    }

    fn on_change(&self) -> &Event<StorageChange> {
        &self.changed
    }
}

fn classify_write_error(message: String) -> StorageError {
    if message.contains("QUOTA") || message.to_lowercase().contains("quota") {
        StorageError::QuotaExceeded(message)
    } else {
        StorageError::Backend(message)
    }
}

pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
