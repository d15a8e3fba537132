//! Hook signatures and their default implementations

use std::borrow::Cow;
use std::rc::Rc;

use serde_json::Value;

use crate::error::StorageError;
use crate::path;
use crate::storage::Storage;
use crate::store::{Mutation, MutationHandler, Store, SubscriptionId};

/// Reads the snapshot under `key`. None means "no prior state".
pub type GetStateFn = Rc<dyn Fn(&str, &dyn Storage) -> Option<Value>>;
/// Writes a snapshot. Must not fail outward.
pub type SetStateFn = Rc<dyn Fn(&str, &Value, &dyn Storage)>;
/// Clears the snapshot under `key`
pub type RemoveStateFn = Rc<dyn Fn(&str, &dyn Storage)>;
/// Computes what gets persisted from the full state and the configured paths
pub type ReducerFn = Rc<dyn for<'a> Fn(&'a Value, Option<&[String]>) -> Cow<'a, Value>>;
/// Decides whether a mutation triggers a write
pub type FilterFn = Rc<dyn Fn(&Mutation) -> bool>;
/// Called once after the store state was rehydrated
pub type RehydratedFn = Rc<dyn Fn(&dyn Store)>;
/// Hooks a mutation handler into the store
pub type SubscriberFn = Rc<dyn Fn(&dyn Store, MutationHandler) -> SubscriptionId>;
/// Validates a storage backend at construction
pub type AssertStorageFn = Rc<dyn Fn(&dyn Storage) -> Result<(), StorageError>>;

/// Parse the JSON stored under `key`.
///
/// Missing entries, empty strings, backend errors and malformed JSON all
/// read as `None`.
pub fn default_get_state(key: &str, storage: &dyn Storage) -> Option<Value> {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => return None,
        Err(e) => {
            log::debug!("Reading '{}' failed: {}", key, e);
            return None;
        }
    };
    serde_json::from_str(&raw)
        .inspect_err(|e| log::debug!("Discarding unparsable state under '{}': {}", key, e))
        .ok()
}

/// Serialize to JSON and store under `key`. Failures are logged and dropped.
pub fn default_set_state(key: &str, state: &Value, storage: &dyn Storage) {
    let json = match serde_json::to_string(state) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("Failed to serialize state for '{}': {}", key, e);
            return;
        }
    };
    if let Err(e) = storage.set_item(key, &json) {
        log::warn!("Failed to persist state under '{}': {}", key, e);
    }
}

/// Remover for backends that implement `remove_item`
pub fn remove_native(key: &str, storage: &dyn Storage) {
    if let Err(e) = storage.remove_item(key) {
        log::warn!("Failed to remove state under '{}': {}", key, e);
    }
}

/// Remover for backends without `remove_item`: blank the entry instead.
/// The default reader treats the blank value as absent.
pub fn remove_by_blanking(key: &str, storage: &dyn Storage) {
    if let Err(e) = storage.set_item(key, "") {
        log::warn!("Failed to clear state under '{}': {}", key, e);
    }
}

/// Whole state (borrowed) when no paths are configured, otherwise the path
/// projection
pub fn default_reducer<'a>(state: &'a Value, paths: Option<&[String]>) -> Cow<'a, Value> {
    match paths {
        Some(paths) => Cow::Owned(path::project(state, paths)),
        None => Cow::Borrowed(state),
    }
}

/// Persist on every mutation
pub fn default_filter(_mutation: &Mutation) -> bool {
    true
}

/// The store's own subscription mechanism
pub fn default_subscriber(store: &dyn Store, handler: MutationHandler) -> SubscriptionId {
    store.subscribe(handler)
}
