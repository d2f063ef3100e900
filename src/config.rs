//! Normalized persistence configuration
//!
//! Built once from [`PersistOptions`] and immutable afterwards. The plugin
//! only ever sees string keys and concrete hooks.

use std::fmt;
use std::rc::Rc;

use crate::consts::DEFAULT_STATE_KEY;
use crate::options::{MigrationRule, PersistOptions};
use crate::persistence::codec::{
    self, AfterDeserialize, BeforeSerialize, Deserializer, Serializer,
};
use crate::platform::{self, StorageEngine};

/// Canonical configuration consumed by the storage plugin
#[derive(Clone)]
pub struct StorageConfig {
    /// Never empty; `[DEFAULT_STATE_KEY]` when nothing was configured
    pub keys: Vec<String>,
    /// `None` when no backend exists, which turns the plugin into a passthrough
    pub engine: Option<Rc<dyn StorageEngine>>,
    pub migrations: Vec<MigrationRule>,
    pub serialize: Serializer,
    pub deserialize: Deserializer,
    pub before_serialize: BeforeSerialize,
    pub after_deserialize: AfterDeserialize,
}

impl StorageConfig {
    pub fn from_options(options: PersistOptions) -> Self {
        let mut keys: Vec<String> = Vec::with_capacity(options.keys.len());
        for key in &options.keys {
            let name = key.as_str().trim();
            if name.is_empty() {
                log::warn!("Ignoring empty storage key in options");
                continue;
            }
            keys.push(name.to_string());
        }
        if keys.is_empty() {
            keys.push(DEFAULT_STATE_KEY.to_string());
        }

        let engine = match options.engine {
            Some(engine) => Some(engine),
            None => platform::default_engine(options.storage),
        };

        Self {
            keys,
            engine,
            migrations: options.migrations,
            serialize: options
                .serialize
                .unwrap_or_else(|| Rc::new(codec::json_serialize) as Serializer),
            deserialize: options
                .deserialize
                .unwrap_or_else(|| Rc::new(codec::json_deserialize) as Deserializer),
            before_serialize: options
                .before_serialize
                .unwrap_or_else(|| Rc::new(codec::identity) as BeforeSerialize),
            after_deserialize: options
                .after_deserialize
                .unwrap_or_else(|| Rc::new(codec::identity) as AfterDeserialize),
        }
    }

    /// True when there is no storage backend to talk to
    pub fn is_passthrough(&self) -> bool {
        self.engine.is_none()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::from_options(PersistOptions::default())
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("keys", &self.keys)
            .field("passthrough", &self.is_passthrough())
            .field("migrations", &self.migrations)
            .finish_non_exhaustive()
    }
}
