//! `chrome.storage` engine for browser extensions
//!
//! The extension API is callback based; the JS shim below wraps every call in
//! a promise and rejects when `chrome.runtime.lastError` is set. Firefox's
//! `browser` namespace is used when `chrome` is missing.

use async_trait::async_trait;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use super::StorageEngine;
use crate::error::{StorageError, StorageResult};
use crate::options::StorageOption;

#[wasm_bindgen(inline_js = "
    function namespace() {
        return globalThis.chrome || globalThis.browser || null;
    }

    function area(name) {
        const api = namespace();
        return api && api.storage && api.storage[name] ? api.storage[name] : null;
    }

    function settle(resolve, reject, value) {
        const api = namespace();
        const err = api && api.runtime ? api.runtime.lastError : null;
        if (err) {
            reject(err.message || String(err));
        } else {
            resolve(value);
        }
    }

    export function storage_available(name) {
        return area(name) !== null;
    }

    export function storage_get(name, keys) {
        return new Promise((resolve, reject) => {
            area(name).get(keys, items => settle(resolve, reject, items || {}));
        });
    }

    export function storage_set(name, items) {
        return new Promise((resolve, reject) => {
            area(name).set(items, () => settle(resolve, reject, undefined));
        });
    }

    export function storage_remove(name, keys) {
        return new Promise((resolve, reject) => {
            area(name).remove(keys, () => settle(resolve, reject, undefined));
        });
    }

    export function storage_clear(name) {
        return new Promise((resolve, reject) => {
            area(name).clear(() => settle(resolve, reject, undefined));
        });
    }
")]
extern "C" {
    fn storage_available(name: &str) -> bool;
    fn storage_get(name: &str, keys: JsValue) -> js_sys::Promise;
    fn storage_set(name: &str, items: JsValue) -> js_sys::Promise;
    fn storage_remove(name: &str, keys: JsValue) -> js_sys::Promise;
    fn storage_clear(name: &str) -> js_sys::Promise;
}

/// One `chrome.storage` area (`local` or `sync`)
#[derive(Debug, Clone, Copy)]
pub struct ChromeStorage {
    area: StorageOption,
}

impl ChromeStorage {
    /// Bind to the area for `option`, or `None` outside an extension context
    pub fn new(option: StorageOption) -> Option<Self> {
        if storage_available(option.area_name()) {
            log::debug!("Using chrome.storage.{}", option.area_name());
            Some(Self { area: option })
        } else {
            log::info!(
                "chrome.storage.{} unavailable, state will not be persisted",
                option.area_name()
            );
            None
        }
    }

    pub fn area(&self) -> StorageOption {
        self.area
    }

    async fn call(&self, promise: js_sys::Promise) -> StorageResult<JsValue> {
        JsFuture::from(promise).await.map_err(js_error)
    }
}

#[async_trait(?Send)]
impl StorageEngine for ChromeStorage {
    async fn get(&self, keys: &[String]) -> StorageResult<Map<String, Value>> {
        let keys = keys_to_js(keys);
        let items = self.call(storage_get(self.area.area_name(), keys)).await?;
        match from_js(&items)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(StorageError::Backend(format!(
                "chrome.storage returned a non-object: {}",
                other
            ))),
        }
    }

    async fn set(&self, items: Map<String, Value>) -> StorageResult<()> {
        let items = to_js(&Value::Object(items))?;
        self.call(storage_set(self.area.area_name(), items)).await?;
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> StorageResult<()> {
        let keys = keys_to_js(keys);
        self.call(storage_remove(self.area.area_name(), keys)).await?;
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.call(storage_clear(self.area.area_name())).await?;
        Ok(())
    }
}

fn keys_to_js(keys: &[String]) -> JsValue {
    keys.iter()
        .map(|key| JsValue::from_str(key))
        .collect::<js_sys::Array>()
        .into()
}

fn to_js(value: &Value) -> StorageResult<JsValue> {
    let json = serde_json::to_string(value)?;
    js_sys::JSON::parse(&json).map_err(js_error)
}

fn from_js(value: &JsValue) -> StorageResult<Value> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    let json: String = js_sys::JSON::stringify(value).map_err(js_error)?.into();
    Ok(serde_json::from_str(&json)?)
}

fn js_error(err: JsValue) -> StorageError {
    StorageError::Backend(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}
