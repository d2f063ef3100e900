//! Ext State Storage demo
//!
//! A counter store whose state survives restarts. In an extension page the
//! counter lives in `chrome.storage.local` and counts how often the page was
//! opened; natively it runs against an in-memory engine.

use ext_state_storage::{Action, Store};
use serde_json::{Value, json};

/// Counter events
enum CounterAction {
    Init,
    Increment,
    Decrement,
}

impl Action for CounterAction {
    fn is_bootstrap(&self) -> bool {
        matches!(self, CounterAction::Init)
    }
}

fn counter_reducer(mut state: Value, action: &CounterAction) -> Value {
    let delta = match action {
        CounterAction::Init => return state,
        CounterAction::Increment => 1,
        CounterAction::Decrement => -1,
    };
    let count = state["counter"]["count"].as_i64().unwrap_or(0);
    state["counter"]["count"] = json!(count + delta);
    state
}

fn new_store() -> Store<CounterAction> {
    Store::new(json!({ "counter": { "count": 0 } }), counter_reducer)
}

#[cfg(target_arch = "wasm32")]
mod wasm_demo {
    use std::rc::Rc;

    use ext_state_storage::platform::WebStorage;
    use ext_state_storage::{PersistOptions, StorageOption, StoragePlugin};

    use super::{CounterAction, new_store};

    /// Extension storage when available, the page's LocalStorage otherwise
    fn counter_plugin() -> StoragePlugin {
        let plugin = StoragePlugin::new(PersistOptions::new().storage(StorageOption::Local));
        if !plugin.config().is_passthrough() {
            return plugin;
        }
        match WebStorage::new() {
            Some(web) => {
                log::info!("Not running inside an extension, using LocalStorage");
                StoragePlugin::new(PersistOptions::new().engine(Rc::new(web)))
            }
            None => {
                log::warn!("No storage available, the counter will reset on reload");
                plugin
            }
        }
    }

    pub async fn run() {
        ext_state_storage::init_logging(log::Level::Info);
        log::info!("Ext State Storage starting...");

        let plugin = counter_plugin();

        let mut store = new_store().with_plugin(plugin);
        store.dispatch(CounterAction::Init).await;
        let state = store.dispatch(CounterAction::Increment).await;
        log::info!("Opened {} times", state["counter"]["count"]);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_demo::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::rc::Rc;

    use ext_state_storage::consts::DEFAULT_STATE_KEY;
    use ext_state_storage::{MemoryStorage, PersistOptions, StoragePlugin};
    use futures::executor::block_on;

    ext_state_storage::init_logging(log::Level::Info);
    log::info!("Ext State Storage (native) starting...");

    let storage = Rc::new(MemoryStorage::with_items([(
        DEFAULT_STATE_KEY.to_string(),
        json!(r#"{"counter":{"count":100}}"#),
    )]));

    let mut store =
        new_store().with_plugin(StoragePlugin::new(PersistOptions::new().engine(storage.clone())));

    block_on(async {
        store.dispatch(CounterAction::Init).await;
        log::info!("Hydrated counter: {}", store.snapshot()["counter"]["count"]);

        for _ in 0..5 {
            store.dispatch(CounterAction::Increment).await;
        }
        store.dispatch(CounterAction::Decrement).await;
    });

    log::info!("Final counter: {}", store.snapshot()["counter"]["count"]);
    log::info!(
        "Persisted: {}",
        storage.get_item(DEFAULT_STATE_KEY).unwrap_or(json!(null))
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
