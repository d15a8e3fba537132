//! Store contract and a reference single-threaded store
//!
//! The plugin talks to any [`Store`]; [`BasicStore`] is a small
//! mutation-driven implementation used by the demo and the tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Descriptor of a committed mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Mutation {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// Handle returned by [`Store::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Called with `(mutation, post-mutation state)` after every commit
pub type MutationHandler = Box<dyn FnMut(&Mutation, &Value)>;

/// What the plugin needs from a store
pub trait Store {
    /// Copy of the current state
    fn state(&self) -> Value;

    /// Swap the whole state. Does not notify subscribers.
    fn replace_state(&self, state: Value);

    /// Register a handler for committed mutations, in commit order
    fn subscribe(&self, handler: MutationHandler) -> SubscriptionId;

    /// Drop a handler. Returns false if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

type MutationFn = Rc<dyn Fn(&mut Value, &Value)>;
type SharedHandler = Rc<RefCell<MutationHandler>>;

/// Minimal store: a JSON state tree changed only through registered mutations
pub struct BasicStore {
    state: RefCell<Value>,
    mutations: RefCell<HashMap<String, MutationFn>>,
    subscribers: RefCell<Vec<(SubscriptionId, SharedHandler)>>,
    next_id: Cell<u64>,
}

impl BasicStore {
    pub fn new(state: Value) -> Self {
        Self {
            state: RefCell::new(state),
            mutations: RefCell::new(HashMap::new()),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Register (or replace) the handler for a mutation type
    pub fn register(
        &self,
        kind: impl Into<String>,
        mutation: impl Fn(&mut Value, &Value) + 'static,
    ) -> &Self {
        self.mutations
            .borrow_mut()
            .insert(kind.into(), Rc::new(mutation));
        self
    }

    /// Apply a registered mutation, then notify subscribers
    pub fn commit(&self, kind: &str, payload: Value) -> Result<(), StoreError> {
        let mutation_fn = self
            .mutations
            .borrow()
            .get(kind)
            .cloned()
            .ok_or_else(|| StoreError::UnknownMutation(kind.to_string()))?;

        let post_state = {
            let mut state = self.state.borrow_mut();
            mutation_fn(&mut *state, &payload);
            state.clone()
        };

        let mutation = Mutation::new(kind, payload);
        // Snapshot so handlers may subscribe/unsubscribe while being notified
        let subscribers: Vec<SharedHandler> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in subscribers {
            match handler.try_borrow_mut() {
                Ok(mut handler) => (handler.as_mut())(&mutation, &post_state),
                Err(_) => log::warn!(
                    "Skipping re-entrant notification for mutation '{}'",
                    mutation.kind
                ),
            }
        }
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl Store for BasicStore {
    fn state(&self) -> Value {
        self.state.borrow().clone()
    }

    fn replace_state(&self, state: Value) {
        *self.state.borrow_mut() = state;
    }

    fn subscribe(&self, handler: MutationHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(handler))));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }
}
