//! `window.localStorage` engine
//!
//! For state persisted from an ordinary web page rather than an extension.
//! LocalStorage only holds text, so non-string values are written as JSON.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::StorageEngine;
use crate::error::{StorageError, StorageResult};

/// Engine over the page's LocalStorage
pub struct WebStorage {
    storage: web_sys::Storage,
}

impl WebStorage {
    /// LocalStorage of the current window, if any
    pub fn new() -> Option<Self> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()?;
        Some(Self { storage })
    }
}

#[async_trait(?Send)]
impl StorageEngine for WebStorage {
    async fn get(&self, keys: &[String]) -> StorageResult<Map<String, Value>> {
        let mut found = Map::new();
        for key in keys {
            if let Some(text) = self.storage.get_item(key).map_err(js_error)? {
                found.insert(key.clone(), Value::String(text));
            }
        }
        Ok(found)
    }

    async fn set(&self, items: Map<String, Value>) -> StorageResult<()> {
        for (key, value) in items {
            let text = match value {
                Value::String(text) => text,
                other => serde_json::to_string(&other)?,
            };
            self.storage.set_item(&key, &text).map_err(js_error)?;
        }
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> StorageResult<()> {
        for key in keys {
            self.storage.remove_item(key).map_err(js_error)?;
        }
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.storage.clear().map_err(js_error)
    }
}

fn js_error(err: wasm_bindgen::JsValue) -> StorageError {
    StorageError::Backend(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}
