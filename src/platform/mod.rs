//! Platform abstraction layer
//!
//! Storage backends behind a single async key-value contract:
//! - `chrome.storage.local` / `chrome.storage.sync` in extensions (wasm32)
//! - `window.localStorage` for plain web pages (wasm32)
//! - An in-memory map everywhere else

pub mod memory;

#[cfg(target_arch = "wasm32")]
pub mod chrome;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::rc::Rc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StorageResult;
use crate::options::StorageOption;

pub use memory::MemoryStorage;

#[cfg(target_arch = "wasm32")]
pub use chrome::ChromeStorage;
#[cfg(target_arch = "wasm32")]
pub use web::WebStorage;

/// Key-value storage backend.
///
/// Mirrors the extension storage API: `get` answers with a map holding only
/// the keys that exist, `set` writes several entries at once.
#[async_trait(?Send)]
pub trait StorageEngine {
    /// Fetch the stored values for `keys`. Missing keys are left out of the map.
    async fn get(&self, keys: &[String]) -> StorageResult<Map<String, Value>>;

    /// Write every entry of `items`
    async fn set(&self, items: Map<String, Value>) -> StorageResult<()>;

    /// Delete the given keys
    async fn remove(&self, keys: &[String]) -> StorageResult<()>;

    /// Delete everything
    async fn clear(&self) -> StorageResult<()>;
}

/// Built-in engine for a storage variant, if this context has one
#[cfg(target_arch = "wasm32")]
pub fn default_engine(option: StorageOption) -> Option<Rc<dyn StorageEngine>> {
    ChromeStorage::new(option).map(|engine| Rc::new(engine) as Rc<dyn StorageEngine>)
}

/// Native builds have no extension storage
#[cfg(not(target_arch = "wasm32"))]
pub fn default_engine(option: StorageOption) -> Option<Rc<dyn StorageEngine>> {
    log::info!(
        "No {} extension storage outside the browser, state will not be persisted",
        option.as_str()
    );
    None
}
