//! In-memory storage engine
//!
//! Holds values exactly as written, so custom serializers that skip
//! stringification round-trip unchanged.

use std::cell::RefCell;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::StorageEngine;
use crate::error::StorageResult;

/// Map-backed engine for native builds and tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<Map<String, Value>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with `items`
    pub fn with_items(items: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            items: RefCell::new(items.into_iter().collect()),
        }
    }

    /// Synchronous read of a single entry
    pub fn get_item(&self, key: &str) -> Option<Value> {
        self.items.borrow().get(key).cloned()
    }

    /// Synchronous write of a single entry
    pub fn set_item(&self, key: impl Into<String>, value: Value) {
        self.items.borrow_mut().insert(key.into(), value);
    }

    /// Copy of everything currently stored
    pub fn snapshot(&self) -> Map<String, Value> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

#[async_trait(?Send)]
impl StorageEngine for MemoryStorage {
    async fn get(&self, keys: &[String]) -> StorageResult<Map<String, Value>> {
        let items = self.items.borrow();
        Ok(keys
            .iter()
            .filter_map(|key| items.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn set(&self, items: Map<String, Value>) -> StorageResult<()> {
        self.items.borrow_mut().extend(items);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> StorageResult<()> {
        let mut items = self.items.borrow_mut();
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.items.borrow_mut().clear();
        Ok(())
    }
}
