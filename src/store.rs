//! Minimal state container with a plugin chain
//!
//! The store owns one JSON state tree. Every dispatch threads the current
//! state through the registered plugins in order and finally through the
//! reducer; whatever comes out becomes the new state.

use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;

use crate::state::get_value;

/// An event dispatched to the store
pub trait Action {
    /// Init / update-bootstrap events, on which persisted state is loaded
    fn is_bootstrap(&self) -> bool;
}

/// Interceptor around the reducer.
///
/// Implementations must call `next.run(..)` exactly once.
#[async_trait(?Send)]
pub trait Plugin<A: 'static> {
    async fn handle(&self, state: Value, action: &A, next: Next<'_, A>) -> Value;
}

/// Pure state transition
pub type Reducer<A> = Box<dyn Fn(Value, &A) -> Value>;

/// Continuation into the rest of the plugin chain
pub struct Next<'a, A: 'static> {
    plugins: &'a [Rc<dyn Plugin<A>>],
    reducer: &'a dyn Fn(Value, &A) -> Value,
}

impl<'a, A: 'static> Next<'a, A> {
    pub async fn run(self, state: Value, action: &A) -> Value {
        match self.plugins.split_first() {
            Some((plugin, rest)) => {
                let next = Next {
                    plugins: rest,
                    reducer: self.reducer,
                };
                plugin.handle(state, action, next).await
            }
            None => (self.reducer)(state, action),
        }
    }
}

/// Single-threaded store
pub struct Store<A: 'static> {
    state: Value,
    reducer: Reducer<A>,
    plugins: Vec<Rc<dyn Plugin<A>>>,
}

impl<A: Action + 'static> Store<A> {
    /// Create a store holding `defaults`
    pub fn new(defaults: Value, reducer: impl Fn(Value, &A) -> Value + 'static) -> Self {
        Self {
            state: defaults,
            reducer: Box::new(reducer),
            plugins: Vec::new(),
        }
    }

    /// Append a plugin; plugins run in registration order
    pub fn with_plugin(mut self, plugin: impl Plugin<A> + 'static) -> Self {
        self.plugins.push(Rc::new(plugin));
        self
    }

    /// Run `action` through the plugins and the reducer
    pub async fn dispatch(&mut self, action: A) -> &Value {
        let state = std::mem::take(&mut self.state);
        let next = Next {
            plugins: &self.plugins,
            reducer: self.reducer.as_ref(),
        };
        self.state = next.run(state, &action).await;
        &self.state
    }

    /// Current state tree
    pub fn snapshot(&self) -> &Value {
        &self.state
    }

    /// Slice of the current state at a dotted path
    pub fn select(&self, path: &str) -> Option<&Value> {
        get_value(&self.state, path)
    }
}
