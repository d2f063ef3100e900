//! Hydrate / migrate / persist plugin
//!
//! On bootstrap actions the plugin reads every configured key, decodes and
//! migrates it, and folds the results into the incoming state before the rest
//! of the chain runs. After the chain, it writes every configured key back.
//!
//! Storage corruption never stops the store: failures are logged per key and
//! that key keeps its in-memory value.

pub mod codec;
pub mod migration;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map, Value};

use crate::config::StorageConfig;
use crate::consts::DEFAULT_STATE_KEY;
use crate::error::PersistError;
use crate::options::PersistOptions;
use crate::platform::StorageEngine;
use crate::state::{get_value, merge_top_level, set_value};
use crate::store::{Action, Next, Plugin};

pub use migration::{Migrated, apply_migrations};

/// Store plugin persisting state slices to a storage engine
#[derive(Debug)]
pub struct StoragePlugin {
    config: StorageConfig,
}

/// State after the hydrate phase
#[derive(Debug)]
pub struct Hydrated {
    pub state: Value,
    /// Whether any migration fired, which forces a write-back
    pub migrated: bool,
}

impl StoragePlugin {
    pub fn new(options: PersistOptions) -> Self {
        Self::from_config(StorageConfig::from_options(options))
    }

    pub fn from_config(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Load, decode, migrate and merge every configured key into `state`
    pub async fn hydrate(&self, engine: &dyn StorageEngine, state: Value) -> Hydrated {
        let reads = self.config.keys.iter().map(|key| read_key(engine, key));
        let stored = join_all(reads).await;

        let mut working = state.clone();
        let mut migrated = false;

        for (key, raw) in self.config.keys.iter().zip(stored) {
            let whole_tree = key == DEFAULT_STATE_KEY;

            let (candidate, present) = match raw {
                Some(raw) if !codec::is_absent(Some(&raw)) => (self.decode(key, raw), true),
                _ => {
                    if self.config.migrations.is_empty() {
                        continue;
                    }
                    // Nothing stored: migrations may still upgrade the in-memory value
                    let current = if whole_tree {
                        Some(state.clone())
                    } else {
                        get_value(&state, key).cloned()
                    };
                    match current {
                        Some(current) => (current, false),
                        None => continue,
                    }
                }
            };

            let rules = &self.config.migrations;
            let candidate = match apply_migrations(rules, key, whole_tree, candidate) {
                Ok(out) => {
                    if out.applied == 0 && !present {
                        continue;
                    }
                    migrated |= out.applied > 0;
                    out.value
                }
                Err(e) => {
                    log::error!("{}, keeping in-memory state", e);
                    continue;
                }
            };

            if whole_tree {
                if !merge_top_level(&mut working, candidate) {
                    log::warn!("Stored state under `{}` is not an object, ignoring it", key);
                }
            } else {
                set_value(&mut working, key, candidate);
            }
            log::debug!("Hydrated `{}`", key);
        }

        Hydrated {
            state: working,
            migrated,
        }
    }

    /// Serialize and write every configured key of `state`
    pub async fn persist(&self, engine: &dyn StorageEngine, state: &Value) {
        let writes = self.config.keys.iter().filter_map(|key| {
            match self.encode(key, state) {
                Ok(Some(stored)) => Some(write_key(engine, key, stored)),
                Ok(None) => {
                    log::debug!("`{}` is not in the state, skipping write", key);
                    None
                }
                Err(e) => {
                    log::error!("{}, value not updated", e);
                    None
                }
            }
        });
        join_all(writes).await;
    }

    /// Remove every configured key from storage
    pub async fn purge(&self) {
        let Some(engine) = self.config.engine.as_deref() else {
            return;
        };
        if let Err(e) = engine.remove(&self.config.keys).await {
            log::error!("Failed to purge persisted state: {}", e);
        }
    }

    /// Stored value → state value, falling back to `{}` on failure
    fn decode(&self, key: &str, raw: Value) -> Value {
        let decoded = (self.config.deserialize)(raw)
            .and_then(|value| (self.config.after_deserialize)(value, key));
        match decoded {
            Ok(value) => value,
            Err(e) => {
                let err = PersistError::Deserialize {
                    key: key.to_string(),
                    reason: format!("{:#}", e),
                };
                log::error!("{}, falling back to empty object", err);
                Value::Object(Map::new())
            }
        }
    }

    /// State value → stored value; `None` when the slice does not exist
    fn encode(&self, key: &str, state: &Value) -> Result<Option<Value>, PersistError> {
        let value = if key == DEFAULT_STATE_KEY {
            state.clone()
        } else {
            match get_value(state, key) {
                Some(value) => value.clone(),
                None => return Ok(None),
            }
        };

        (self.config.before_serialize)(value, key)
            .and_then(|value| (self.config.serialize)(&value))
            .map(Some)
            .map_err(|e| PersistError::Serialize {
                key: key.to_string(),
                reason: format!("{:#}", e),
            })
    }
}

#[async_trait(?Send)]
impl<A: Action + 'static> Plugin<A> for StoragePlugin {
    async fn handle(&self, state: Value, action: &A, next: Next<'_, A>) -> Value {
        let Some(engine) = self.config.engine.as_deref() else {
            return next.run(state, action).await;
        };

        let bootstrap = action.is_bootstrap();
        let (state, migrated) = if bootstrap {
            let hydrated = self.hydrate(engine, state).await;
            (hydrated.state, hydrated.migrated)
        } else {
            (state, false)
        };

        let next_state = next.run(state, action).await;

        if !bootstrap || migrated {
            self.persist(engine, &next_state).await;
        }
        next_state
    }
}

async fn read_key(engine: &dyn StorageEngine, key: &str) -> Option<Value> {
    match engine.get(&[key.to_string()]).await {
        Ok(mut items) => items.remove(key),
        Err(source) => {
            let err = PersistError::Read {
                key: key.to_string(),
                source,
            };
            log::error!("{}, treating it as absent", err);
            None
        }
    }
}

async fn write_key(engine: &dyn StorageEngine, key: &str, stored: Value) {
    let mut items = Map::new();
    items.insert(key.to_string(), stored);
    if let Err(source) = engine.set(items).await {
        let err = PersistError::Write {
            key: key.to_string(),
            source,
        };
        log::error!("{}, value not updated", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, StorageResult};
    use crate::options::MigrationRule;
    use crate::platform::MemoryStorage;
    use futures::executor::block_on;
    use serde_json::json;
    use std::rc::Rc;

    fn plugin(storage: &Rc<MemoryStorage>, options: PersistOptions) -> StoragePlugin {
        StoragePlugin::new(options.engine(storage.clone()))
    }

    #[test]
    fn test_absent_values_are_never_deserialized() {
        for raw in [Value::Null, json!("undefined")] {
            let storage = Rc::new(MemoryStorage::with_items([(
                DEFAULT_STATE_KEY.to_string(),
                raw,
            )]));
            let plugin = plugin(
                &storage,
                PersistOptions::new().deserialize(|_| panic!("deserialize called")),
            );

            let state = json!({ "counter": { "count": 123 } });
            let out = block_on(plugin.hydrate(storage.as_ref(), state.clone()));
            assert_eq!(out.state, state);
            assert!(!out.migrated);
        }
    }

    #[test]
    fn test_corrupt_value_falls_back_to_empty_object() {
        let storage = Rc::new(MemoryStorage::with_items([(
            "counter".to_string(),
            json!("{broken"),
        )]));
        let plugin = plugin(&storage, PersistOptions::new().key("counter"));

        let out = block_on(plugin.hydrate(storage.as_ref(), json!({ "counter": { "count": 1 } })));
        assert_eq!(out.state, json!({ "counter": {} }));
    }

    #[test]
    fn test_after_deserialize_receives_key() {
        let storage = Rc::new(MemoryStorage::with_items([(
            "counter".to_string(),
            json!("{\"count\":1}"),
        )]));
        let plugin = plugin(
            &storage,
            PersistOptions::new()
                .key("counter")
                .after_deserialize(|mut value, key| {
                    value["from"] = json!(key);
                    Ok(value)
                }),
        );

        let out = block_on(plugin.hydrate(storage.as_ref(), json!({})));
        assert_eq!(out.state, json!({ "counter": { "count": 1, "from": "counter" } }));
    }

    #[test]
    fn test_keys_fold_in_configuration_order() {
        let storage = Rc::new(MemoryStorage::with_items([
            (
                DEFAULT_STATE_KEY.to_string(),
                json!("{\"counter\":{\"count\":1},\"theme\":\"dark\"}"),
            ),
            ("counter".to_string(), json!("{\"count\":2}")),
        ]));
        let plugin = plugin(
            &storage,
            PersistOptions::new().keys([DEFAULT_STATE_KEY, "counter"]),
        );

        let out = block_on(plugin.hydrate(
            storage.as_ref(),
            json!({ "counter": { "count": 0 }, "theme": "light", "lazy": true }),
        ));
        assert_eq!(
            out.state,
            json!({ "counter": { "count": 2 }, "theme": "dark", "lazy": true })
        );
    }

    #[test]
    fn test_absent_key_can_still_migrate_from_memory() {
        let storage = Rc::new(MemoryStorage::new());
        let plugin = plugin(
            &storage,
            PersistOptions::new().key("counter").migration(
                MigrationRule::new(1, |value| {
                    Ok(json!({ "counts": value["count"], "version": 2 }))
                })
                .for_key("counter"),
            ),
        );

        let out = block_on(plugin.hydrate(
            storage.as_ref(),
            json!({ "counter": { "count": 5, "version": 1 } }),
        ));
        assert!(out.migrated);
        assert_eq!(out.state, json!({ "counter": { "counts": 5, "version": 2 } }));
    }

    #[test]
    fn test_absent_whole_tree_migrates_from_memory() {
        let storage = Rc::new(MemoryStorage::new());
        let plugin = plugin(
            &storage,
            PersistOptions::new().migration(MigrationRule::new(1, |state| {
                Ok(json!({ "version": 2, "settings": { "theme": state["theme"] } }))
            })),
        );

        let out = block_on(plugin.hydrate(
            storage.as_ref(),
            json!({ "version": 1, "counter": { "count": 5 }, "theme": "dark" }),
        ));
        assert!(out.migrated);
        assert_eq!(
            out.state,
            json!({
                "version": 2,
                "counter": { "count": 5 },
                "theme": "dark",
                "settings": { "theme": "dark" }
            })
        );
        assert!(storage.is_empty());
    }

    #[test]
    fn test_absent_key_without_matching_rule_is_untouched() {
        let storage = Rc::new(MemoryStorage::new());
        let plugin = plugin(
            &storage,
            PersistOptions::new()
                .key("missing")
                .migration(MigrationRule::new(1, Ok).for_key("missing")),
        );

        let state = json!({ "counter": { "count": 5 } });
        let out = block_on(plugin.hydrate(storage.as_ref(), state.clone()));
        assert!(!out.migrated);
        assert_eq!(out.state, state);
    }

    #[test]
    fn test_failed_migration_keeps_memory_value() {
        let storage = Rc::new(MemoryStorage::with_items([(
            "counter".to_string(),
            json!("{\"count\":9,\"version\":1}"),
        )]));
        let plugin = plugin(
            &storage,
            PersistOptions::new().key("counter").migration(
                MigrationRule::new(1, |_| Err(anyhow::anyhow!("unsupported"))).for_key("counter"),
            ),
        );

        let state = json!({ "counter": { "count": 0 } });
        let out = block_on(plugin.hydrate(storage.as_ref(), state.clone()));
        assert_eq!(out.state, state);
        assert!(!out.migrated);
    }

    #[test]
    fn test_persist_skips_missing_slices() {
        let storage = Rc::new(MemoryStorage::new());
        let plugin = plugin(&storage, PersistOptions::new().keys(["counter", "missing"]));

        block_on(plugin.persist(storage.as_ref(), &json!({ "counter": { "count": 3 } })));

        assert_eq!(storage.get_item("counter"), Some(json!("{\"count\":3}")));
        assert_eq!(storage.get_item("missing"), None);
    }

    #[test]
    fn test_serialize_failure_is_isolated_per_key() {
        let storage = Rc::new(MemoryStorage::new());
        let plugin = plugin(
            &storage,
            PersistOptions::new()
                .keys(["a", "b"])
                .before_serialize(|value, key| {
                    if key == "a" {
                        anyhow::bail!("refusing to write a");
                    }
                    Ok(value)
                }),
        );

        block_on(plugin.persist(storage.as_ref(), &json!({ "a": 1, "b": 2 })));

        assert_eq!(storage.get_item("a"), None);
        assert_eq!(storage.get_item("b"), Some(json!("2")));
    }

    /// Engine whose writes fail for one key
    struct FlakyStorage {
        inner: MemoryStorage,
        broken: &'static str,
    }

    #[async_trait(?Send)]
    impl StorageEngine for FlakyStorage {
        async fn get(&self, keys: &[String]) -> StorageResult<Map<String, Value>> {
            if keys.iter().any(|k| k == self.broken) {
                return Err(StorageError::Backend("read failed".to_string()));
            }
            self.inner.get(keys).await
        }

        async fn set(&self, items: Map<String, Value>) -> StorageResult<()> {
            if items.contains_key(self.broken) {
                return Err(StorageError::Backend("quota exceeded".to_string()));
            }
            self.inner.set(items).await
        }

        async fn remove(&self, keys: &[String]) -> StorageResult<()> {
            self.inner.remove(keys).await
        }

        async fn clear(&self) -> StorageResult<()> {
            self.inner.clear().await
        }
    }

    #[test]
    fn test_engine_failures_do_not_stop_other_keys() {
        let engine = FlakyStorage {
            inner: MemoryStorage::with_items([("good".to_string(), json!("\"stored\""))]),
            broken: "bad",
        };
        let plugin = StoragePlugin::from_config(StorageConfig::from_options(
            PersistOptions::new().keys(["bad", "good"]),
        ));

        let out = block_on(plugin.hydrate(&engine, json!({ "bad": 1, "good": "memory" })));
        assert_eq!(out.state, json!({ "bad": 1, "good": "stored" }));

        block_on(plugin.persist(&engine, &json!({ "bad": 2, "good": "next" })));
        assert_eq!(engine.inner.get_item("good"), Some(json!("\"next\"")));
        assert_eq!(engine.inner.get_item("bad"), None);
    }

    #[test]
    fn test_purge_removes_configured_keys() {
        let storage = Rc::new(MemoryStorage::with_items([
            ("counter".to_string(), json!("1")),
            ("other".to_string(), json!("2")),
        ]));
        let plugin = plugin(&storage, PersistOptions::new().key("counter"));

        block_on(plugin.purge());

        assert_eq!(storage.get_item("counter"), None);
        assert_eq!(storage.get_item("other"), Some(json!("2")));
    }
}
