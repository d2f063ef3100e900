//! User-facing persistence options
//!
//! `PersistOptions` is what callers build; the plugin normalizes it into a
//! [`StorageConfig`](crate::config::StorageConfig) once at construction.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::DEFAULT_VERSION_KEY;
use crate::persistence::codec::{AfterDeserialize, BeforeSerialize, Deserializer, Serializer};
use crate::platform::StorageEngine;
use crate::state::get_value;

/// Built-in storage areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageOption {
    /// Device-local storage
    #[default]
    Local,
    /// Storage synced across the user's browsers
    Sync,
}

impl StorageOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOption::Local => "Local",
            StorageOption::Sync => "Sync",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" => Some(StorageOption::Local),
            "sync" | "synced" => Some(StorageOption::Sync),
            _ => None,
        }
    }

    /// Property name under `chrome.storage`
    pub fn area_name(&self) -> &'static str {
        match self {
            StorageOption::Local => "local",
            StorageOption::Sync => "sync",
        }
    }
}

/// A type standing for a named slice of the state tree
pub trait StateIdentifier {
    const NAME: &'static str;
}

/// Reference to a persisted slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRef {
    /// Dotted path into the state tree
    Key(String),
    /// Name taken from a [`StateIdentifier`]
    State(&'static str),
}

impl KeyRef {
    pub fn state<S: StateIdentifier>() -> Self {
        KeyRef::State(S::NAME)
    }

    pub fn as_str(&self) -> &str {
        match self {
            KeyRef::Key(path) => path.as_str(),
            KeyRef::State(name) => name,
        }
    }
}

impl From<&str> for KeyRef {
    fn from(path: &str) -> Self {
        KeyRef::Key(path.to_string())
    }
}

impl From<String> for KeyRef {
    fn from(path: String) -> Self {
        KeyRef::Key(path)
    }
}

/// Version a migration rule keys off. Numbers and strings never compare equal.
#[derive(Debug, Clone, PartialEq)]
pub enum Version {
    Number(f64),
    Text(String),
}

impl Version {
    /// Strict equality against a stored version field
    pub fn matches(&self, field: Option<&Value>) -> bool {
        match (self, field) {
            (Version::Number(expected), Some(Value::Number(found))) => {
                found.as_f64() == Some(*expected)
            }
            (Version::Text(expected), Some(Value::String(found))) => expected == found,
            _ => false,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Number(n) => write!(f, "{}", n),
            Version::Text(s) => write!(f, "{:?}", s),
        }
    }
}

macro_rules! version_from_number {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Version {
            fn from(n: $ty) -> Self {
                Version::Number(n as f64)
            }
        })*
    };
}

version_from_number!(i32, i64, u32, u64, f64);

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version::Text(s.to_string())
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Version::Text(s)
    }
}

/// Migration callback
pub type MigrateFn = Rc<dyn Fn(Value) -> anyhow::Result<Value>>;

/// A version-gated transform applied to a stored value before it is merged
#[derive(Clone)]
pub struct MigrationRule {
    pub version: Version,
    /// Dotted path of the version field inside the candidate value
    pub version_key: String,
    /// Key the rule targets; `None` means the whole-tree key
    pub key: Option<String>,
    pub migrate: MigrateFn,
}

impl MigrationRule {
    pub fn new(
        version: impl Into<Version>,
        migrate: impl Fn(Value) -> anyhow::Result<Value> + 'static,
    ) -> Self {
        Self {
            version: version.into(),
            version_key: DEFAULT_VERSION_KEY.to_string(),
            key: None,
            migrate: Rc::new(migrate),
        }
    }

    /// Target a single key instead of the whole tree
    pub fn for_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn version_key(mut self, version_key: impl Into<String>) -> Self {
        self.version_key = version_key.into();
        self
    }

    /// Whether this rule fires for `candidate` stored under `key`
    pub fn applies(&self, key: &str, is_whole_tree: bool, candidate: &Value) -> bool {
        let key_match = match &self.key {
            Some(target) => target == key,
            None => is_whole_tree,
        };
        key_match && self.version.matches(get_value(candidate, &self.version_key))
    }
}

impl fmt::Debug for MigrationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRule")
            .field("version", &self.version)
            .field("version_key", &self.version_key)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Options accepted by [`StoragePlugin::new`](crate::persistence::StoragePlugin::new)
#[derive(Clone, Default)]
pub struct PersistOptions {
    /// Slices to persist; empty means the whole tree
    pub keys: Vec<KeyRef>,
    pub storage: StorageOption,
    /// Custom engine, takes precedence over `storage`
    pub engine: Option<Rc<dyn StorageEngine>>,
    pub migrations: Vec<MigrationRule>,
    pub serialize: Option<Serializer>,
    pub deserialize: Option<Deserializer>,
    pub before_serialize: Option<BeforeSerialize>,
    pub after_deserialize: Option<AfterDeserialize>,
}

impl PersistOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<KeyRef>) -> Self {
        self.keys.push(key.into());
        self
    }

    pub fn keys<K: Into<KeyRef>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn storage(mut self, storage: StorageOption) -> Self {
        self.storage = storage;
        self
    }

    pub fn engine(mut self, engine: Rc<dyn StorageEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn migration(mut self, rule: MigrationRule) -> Self {
        self.migrations.push(rule);
        self
    }

    pub fn serialize(mut self, f: impl Fn(&Value) -> anyhow::Result<Value> + 'static) -> Self {
        self.serialize = Some(Rc::new(f));
        self
    }

    pub fn deserialize(mut self, f: impl Fn(Value) -> anyhow::Result<Value> + 'static) -> Self {
        self.deserialize = Some(Rc::new(f));
        self
    }

    pub fn before_serialize(
        mut self,
        f: impl Fn(Value, &str) -> anyhow::Result<Value> + 'static,
    ) -> Self {
        self.before_serialize = Some(Rc::new(f));
        self
    }

    pub fn after_deserialize(
        mut self,
        f: impl Fn(Value, &str) -> anyhow::Result<Value> + 'static,
    ) -> Self {
        self.after_deserialize = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for PersistOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistOptions")
            .field("keys", &self.keys)
            .field("storage", &self.storage)
            .field("custom_engine", &self.engine.is_some())
            .field("migrations", &self.migrations)
            .finish_non_exhaustive()
    }
}

/// Declarative part of the options, loadable from JSON
///
/// ```json
/// { "keys": ["counter", "settings.theme"], "storage": "sync" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistSettings {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub storage: StorageOption,
}

impl PersistSettings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn into_options(self) -> PersistOptions {
        PersistOptions::new().keys(self.keys).storage(self.storage)
    }
}
