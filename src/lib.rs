//! Ext State Storage - persist application state in browser extension storage
//!
//! Core modules:
//! - `store`: Minimal state container with a plugin chain
//! - `persistence`: Hydrate / migrate / persist plugin
//! - `config`: Normalized plugin configuration
//! - `options`: User-facing options, migration rules, storage variants
//! - `platform`: Storage engines (chrome.storage, LocalStorage, in-memory)
//! - `state`: Dotted-path helpers over the JSON state tree

pub mod config;
pub mod error;
pub mod options;
pub mod persistence;
pub mod platform;
pub mod state;
pub mod store;

pub use config::StorageConfig;
pub use error::{PersistError, StorageError, StorageResult};
pub use options::{
    KeyRef, MigrationRule, PersistOptions, PersistSettings, StateIdentifier, StorageOption,
    Version,
};
pub use persistence::StoragePlugin;
pub use platform::{MemoryStorage, StorageEngine};
pub use store::{Action, Next, Plugin, Store};

/// Storage constants
pub mod consts {
    /// Storage key holding the whole state tree
    pub const DEFAULT_STATE_KEY: &str = "@@STATE";
    /// Field a migration rule reads its version from unless told otherwise
    pub const DEFAULT_VERSION_KEY: &str = "version";
}

/// Install the logger for the current platform.
///
/// Browser builds log to the devtools console and report panics there.
/// Native builds use `env_logger` (`RUST_LOG=debug` for hydration details).
/// Calling this more than once is harmless.
#[cfg(target_arch = "wasm32")]
pub fn init_logging(level: log::Level) {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(level).is_err() {
        log::debug!("Logger already initialized");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(level: log::Level) {
    let env = env_logger::Env::default().default_filter_or(level.as_str());
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
