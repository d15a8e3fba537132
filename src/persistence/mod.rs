//! Store state persistence
//!
//! [`StateSync`] restores a saved snapshot into a store when attached and
//! writes a reduced view of the state back to storage after every
//! qualifying mutation.
//!
//! Lifecycle:
//! - construction: resolve storage, validate it, optionally fetch early
//! - attach: rehydrate (merge or overwrite), then subscribe
//! - per mutation: filter → reduce → write
//!
//! Only construction can fail. Corrupt snapshots read as absent and failed
//! writes are logged, so a bad backend never breaks the mutation flow.

pub mod hooks;
pub mod options;

pub use options::SyncOptions;

use std::rc::Rc;

use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::merge::{MergeFn, MergeOptions};
use crate::storage::{self, Storage};
use crate::store::{Mutation, Store, SubscriptionId};
use hooks::{
    FilterFn, GetStateFn, ReducerFn, RehydratedFn, RemoveStateFn, SetStateFn, SubscriberFn,
};

/// Resolved, immutable plugin state shared with the mutation handler
struct Shared {
    key: String,
    storage: Rc<dyn Storage>,
    paths: Option<Vec<String>>,
    overwrite: bool,
    get_state: GetStateFn,
    set_state: SetStateFn,
    remove_state: RemoveStateFn,
    reducer: ReducerFn,
    filter: FilterFn,
    merge: MergeFn,
    merge_options: MergeOptions,
    rehydrated: RehydratedFn,
    subscriber: SubscriberFn,
}

impl Shared {
    fn fetch(&self) -> Option<Value> {
        (self.get_state)(&self.key, self.storage.as_ref())
    }

    fn persist(&self, mutation: &Mutation, state: &Value) {
        if !(self.filter)(mutation) {
            log::trace!("Mutation '{}' filtered out", mutation.kind);
            return;
        }
        let reduced = (self.reducer)(state, self.paths.as_deref());
        (self.set_state)(&self.key, reduced.as_ref(), self.storage.as_ref());
    }
}

/// A configured sync plugin, ready to attach to stores
pub struct StateSync {
    shared: Rc<Shared>,
    /// Snapshot read at construction when `fetch_before_use` is set
    prefetched: Option<Option<Value>>,
}

impl StateSync {
    /// Resolve storage, validate it and (optionally) fetch the snapshot.
    ///
    /// Fails with [`SyncError::NoStorage`] when no backend was supplied and
    /// the environment has none, and with [`SyncError::InvalidStorage`] when
    /// the validator rejects the backend.
    pub fn new(options: SyncOptions) -> SyncResult<Self> {
        let storage = options
            .storage
            .or_else(storage::default_storage)
            .ok_or(SyncError::NoStorage)?;

        (options.assert_storage)(storage.as_ref()).map_err(SyncError::InvalidStorage)?;

        let remove_state: RemoveStateFn = match options.remove_state {
            Some(remove) => remove,
            None if storage.supports_remove() => Rc::new(hooks::remove_native),
            None => Rc::new(hooks::remove_by_blanking),
        };

        let config = options.config;
        let shared = Rc::new(Shared {
            key: config.key,
            storage,
            paths: config.paths,
            overwrite: config.overwrite,
            get_state: options.get_state,
            set_state: options.set_state,
            remove_state,
            reducer: options.reducer,
            filter: options.filter,
            merge: options.merge,
            merge_options: MergeOptions {
                array_merge: options.array_merge,
            },
            rehydrated: options.rehydrated,
            subscriber: options.subscriber,
        });

        let prefetched = config.fetch_before_use.then(|| {
            log::debug!("Prefetching state under '{}'", shared.key);
            shared.fetch()
        });

        Ok(Self { shared, prefetched })
    }

    /// Rehydrate `store` from storage, then persist its mutations.
    ///
    /// Returns the subscription so callers can detach later.
    pub fn attach(&self, store: &dyn Store) -> SubscriptionId {
        let saved = match &self.prefetched {
            Some(prefetched) => prefetched.clone(),
            None => self.shared.fetch(),
        };

        match saved {
            Some(snapshot) if is_structured(&snapshot) => self.rehydrate(store, snapshot),
            Some(_) => log::debug!("Ignoring non-structured state under '{}'", self.shared.key),
            None => log::debug!("No saved state under '{}'", self.shared.key),
        }

        let shared = Rc::clone(&self.shared);
        (self.shared.subscriber)(
            store,
            Box::new(move |mutation: &Mutation, state: &Value| shared.persist(mutation, state)),
        )
    }

    fn rehydrate(&self, store: &dyn Store, snapshot: Value) {
        let shared = &self.shared;
        let next = if shared.overwrite {
            snapshot
        } else {
            (shared.merge)(store.state(), snapshot, &shared.merge_options)
        };
        store.replace_state(next);
        log::info!("Rehydrated state from '{}'", shared.key);
        (shared.rehydrated)(store);
    }

    /// Clear the persisted snapshot. Failures are logged, never returned.
    pub fn remove_state(&self) {
        (self.shared.remove_state)(&self.shared.key, self.shared.storage.as_ref());
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn storage(&self) -> &dyn Storage {
        self.shared.storage.as_ref()
    }
}

/// Only objects and arrays are restored; scalars and null are ignored
fn is_structured(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Closure form: `plugin(options)?` returns the attach function
pub fn plugin(options: SyncOptions) -> SyncResult<impl Fn(&dyn Store) -> SubscriptionId> {
    let sync = StateSync::new(options)?;
    Ok(move |store: &dyn Store| sync.attach(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::merge::array_merge;
    use crate::storage::MemoryStorage;
    use crate::store::BasicStore;
    use serde_json::json;
    use std::borrow::Cow;
    use std::cell::{Cell, RefCell};

    fn counter_store(state: Value) -> BasicStore {
        let store = BasicStore::new(state);
        store.register("set", |state, payload| {
            if let (Some(obj), Some(patch)) = (state.as_object_mut(), payload.as_object()) {
                for (k, v) in patch {
                    obj.insert(k.clone(), v.clone());
                }
            }
        });
        store
    }

    /// Backend whose reads always fail
    struct BrokenReads;

    impl Storage for BrokenReads {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("read denied".into()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_rehydrate_merges_saved_over_live() {
        let storage = Rc::new(MemoryStorage::new().seeded("store", r#"{"count":5}"#));
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);

        let sync = StateSync::new(
            SyncOptions::new()
                .storage(Rc::clone(&storage))
                .rehydrated(move |store: &dyn Store| {
                    assert_eq!(store.state()["count"], json!(5));
                    seen.set(seen.get() + 1);
                }),
        )
        .unwrap();

        let store = counter_store(json!({"count": 0, "flag": true}));
        sync.attach(&store);

        assert_eq!(store.state(), json!({"count": 5, "flag": true}));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_overwrite_replaces_state_verbatim() {
        let storage = MemoryStorage::new().seeded("store", r#"{"count":5}"#);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let sync = StateSync::new(
            SyncOptions::new()
                .storage(storage)
                .overwrite(true)
                .rehydrated(move |_: &dyn Store| seen.set(seen.get() + 1)),
        )
        .unwrap();

        let store = counter_store(json!({"count": 0, "flag": true}));
        sync.attach(&store);

        assert_eq!(store.state(), json!({"count": 5}));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_fresh_key_subscribes_and_persists_whole_state() {
        let storage = Rc::new(MemoryStorage::new());
        let rehydrated = Rc::new(Cell::new(false));
        let flag = Rc::clone(&rehydrated);
        let sync = StateSync::new(
            SyncOptions::new()
                .key("app")
                .storage(Rc::clone(&storage))
                .rehydrated(move |_: &dyn Store| flag.set(true)),
        )
        .unwrap();
        let writes_after_sentinel = storage.write_count();

        let store = counter_store(json!({}));
        sync.attach(&store);
        assert!(!rehydrated.get());
        assert_eq!(store.subscriber_count(), 1);

        store.commit("set", json!({"n": 1})).unwrap();
        assert_eq!(storage.write_count(), writes_after_sentinel + 1);
        assert_eq!(storage.get_item("app").unwrap().as_deref(), Some(r#"{"n":1}"#));
    }

    #[test]
    fn test_unreadable_storage_skips_rehydration() {
        let replaced = Rc::new(Cell::new(false));
        let flag = Rc::clone(&replaced);
        let sync = StateSync::new(
            SyncOptions::new()
                .storage(BrokenReads)
                .rehydrated(move |_: &dyn Store| flag.set(true)),
        )
        .unwrap();

        let store = counter_store(json!({"n": 0}));
        sync.attach(&store);
        assert!(!replaced.get());
        assert_eq!(store.state(), json!({"n": 0}));
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn test_corrupt_or_scalar_snapshot_skips_rehydration() {
        for raw in ["{broken", "5", "null", "\"text\""] {
            let storage = MemoryStorage::new().seeded("store", raw);
            let calls = Rc::new(Cell::new(0));
            let seen = Rc::clone(&calls);
            let sync = StateSync::new(
                SyncOptions::new()
                    .storage(storage)
                    .rehydrated(move |_: &dyn Store| seen.set(seen.get() + 1)),
            )
            .unwrap();

            let store = counter_store(json!({"n": 0}));
            sync.attach(&store);
            assert_eq!(store.state(), json!({"n": 0}), "snapshot {raw}");
            assert_eq!(calls.get(), 0, "snapshot {raw}");
        }
    }

    #[test]
    fn test_filter_blocks_writes() {
        let storage = Rc::new(MemoryStorage::new());
        let sync = StateSync::new(
            SyncOptions::new()
                .storage(Rc::clone(&storage))
                .filter(|m: &Mutation| m.kind != "set"),
        )
        .unwrap();
        let store = counter_store(json!({}));
        store.register("other", |_, _| {});
        sync.attach(&store);

        let before = storage.write_count();
        store.commit("set", json!({"n": 1})).unwrap();
        assert_eq!(storage.write_count(), before);
        store.commit("other", Value::Null).unwrap();
        assert_eq!(storage.write_count(), before + 1);
    }

    #[test]
    fn test_paths_reduce_persisted_state() {
        let storage = Rc::new(MemoryStorage::new());
        let sync = StateSync::new(
            SyncOptions::new()
                .storage(Rc::clone(&storage))
                .paths(["a.b", "c"]),
        )
        .unwrap();
        let store = counter_store(json!({"a": {"b": 1, "x": 2}, "c": 3}));
        sync.attach(&store);

        store.commit("set", json!({"d": 4})).unwrap();
        let raw = storage.get_item("store").unwrap().unwrap();
        let persisted: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, json!({"a": {"b": 1}, "c": 3}));
    }

    #[test]
    fn test_write_failures_are_swallowed() {
        // Room for the validation sentinel, not for the state below
        let storage = Rc::new(MemoryStorage::with_quota(40));
        let sync = StateSync::new(SyncOptions::new().storage(Rc::clone(&storage))).unwrap();
        let store = counter_store(json!({}));
        sync.attach(&store);

        let blob = "x".repeat(64);
        store.commit("set", json!({"blob": blob})).unwrap();
        store.commit("set", json!({"blob": "ok"})).unwrap();
        assert_eq!(
            storage.get_item("store").unwrap().as_deref(),
            Some(r#"{"blob":"ok"}"#)
        );
    }

    #[test]
    fn test_missing_storage_is_fatal() {
        let err = StateSync::new(SyncOptions::new()).err().unwrap();
        assert!(matches!(err, SyncError::NoStorage));
        assert!(plugin(SyncOptions::new()).is_err());
    }

    #[test]
    fn test_unusable_storage_is_fatal() {
        let err = StateSync::new(SyncOptions::new().storage(MemoryStorage::with_quota(0)))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SyncError::InvalidStorage(StorageError::QuotaExceeded { .. })
        ));
    }

    #[test]
    fn test_custom_validator() {
        let result = StateSync::new(
            SyncOptions::new()
                .storage(MemoryStorage::new())
                .assert_storage(|_: &dyn Storage| Err(StorageError::Unavailable("nope".into()))),
        );
        assert!(matches!(result, Err(SyncError::InvalidStorage(_))));
    }

    #[test]
    fn test_prefetch_reads_at_construction() {
        let storage = Rc::new(MemoryStorage::new().seeded("store", r#"{"v":1}"#));
        let sync = StateSync::new(
            SyncOptions::new()
                .storage(Rc::clone(&storage))
                .fetch_before_use(true),
        )
        .unwrap();
        // Later storage changes are not seen by attach
        storage.set_item("store", r#"{"v":2}"#).unwrap();

        let first = counter_store(json!({}));
        sync.attach(&first);
        assert_eq!(first.state(), json!({"v": 1}));

        let second = counter_store(json!({}));
        sync.attach(&second);
        assert_eq!(second.state(), json!({"v": 1}));
    }

    #[test]
    fn test_lazy_fetch_reads_at_attach() {
        let storage = Rc::new(MemoryStorage::new().seeded("store", r#"{"v":1}"#));
        let sync = StateSync::new(SyncOptions::new().storage(Rc::clone(&storage))).unwrap();
        storage.set_item("store", r#"{"v":2}"#).unwrap();

        let store = counter_store(json!({}));
        sync.attach(&store);
        assert_eq!(store.state(), json!({"v": 2}));
    }

    #[test]
    fn test_custom_merge_receives_array_strategy() {
        let storage = MemoryStorage::new().seeded("store", r#"{"list":[3]}"#);
        let sync = StateSync::new(
            SyncOptions::new()
                .storage(storage)
                .array_merge(array_merge::concat),
        )
        .unwrap();
        let store = counter_store(json!({"list": [1, 2]}));
        sync.attach(&store);
        assert_eq!(store.state(), json!({"list": [1, 2, 3]}));

        let storage = MemoryStorage::new().seeded("store", r#"{"a":1}"#);
        let merged_with = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&merged_with);
        let sync = StateSync::new(SyncOptions::new().storage(storage).merge(
            move |live: Value, saved: Value, _: &MergeOptions| {
                *sink.borrow_mut() = Some((live, saved.clone()));
                saved
            },
        ))
        .unwrap();
        let store = counter_store(json!({"b": 2}));
        sync.attach(&store);
        assert_eq!(store.state(), json!({"a": 1}));
        assert_eq!(
            *merged_with.borrow(),
            Some((json!({"b": 2}), json!({"a": 1})))
        );
    }

    #[test]
    fn test_custom_reader_writer_and_reducer() {
        let written = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&written);
        let sync = StateSync::new(
            SyncOptions::new()
                .storage(MemoryStorage::new())
                .get_state(|_: &str, _: &dyn Storage| Some(json!({"from": "reader"})))
                .set_state(move |key: &str, state: &Value, _: &dyn Storage| {
                    sink.borrow_mut().push((key.to_string(), state.clone()));
                })
                .reducer(|state, _| Cow::Owned(json!({"n": state["n"]}))),
        )
        .unwrap();
        let store = counter_store(json!({"n": 0, "junk": true}));
        sync.attach(&store);
        assert_eq!(store.state()["from"], json!("reader"));

        store.commit("set", json!({"n": 7})).unwrap();
        assert_eq!(
            *written.borrow(),
            vec![("store".to_string(), json!({"n": 7}))]
        );
    }

    #[test]
    fn test_custom_subscriber_and_detach() {
        let storage = Rc::new(MemoryStorage::new());
        let used = Rc::new(Cell::new(false));
        let flag = Rc::clone(&used);
        let sync = StateSync::new(SyncOptions::new().storage(Rc::clone(&storage)).subscriber(
            move |store: &dyn Store, handler| {
                flag.set(true);
                store.subscribe(handler)
            },
        ))
        .unwrap();
        let store = counter_store(json!({}));
        let id = sync.attach(&store);
        assert!(used.get());

        assert!(store.unsubscribe(id));
        let before = storage.write_count();
        store.commit("set", json!({"n": 1})).unwrap();
        assert_eq!(storage.write_count(), before);
    }

    #[test]
    fn test_remove_state_native_and_blanking() {
        let storage = Rc::new(MemoryStorage::new().seeded("store", r#"{"a":1}"#));
        let sync = StateSync::new(SyncOptions::new().storage(Rc::clone(&storage))).unwrap();
        sync.remove_state();
        assert_eq!(storage.get_item("store").unwrap(), None);

        let storage = Rc::new(MemoryStorage::without_remove().seeded("store", r#"{"a":1}"#));
        let sync = StateSync::new(SyncOptions::new().storage(Rc::clone(&storage))).unwrap();
        sync.remove_state();
        assert_eq!(storage.get_item("store").unwrap().as_deref(), Some(""));

        // A blanked key reads as "no snapshot"
        let store = counter_store(json!({"n": 0}));
        sync.attach(&store);
        assert_eq!(store.state(), json!({"n": 0}));
    }

    #[test]
    fn test_plugin_closure_form() {
        let storage = MemoryStorage::new().seeded("app", r#"{"n":3}"#);
        let attach = plugin(SyncOptions::new().key("app").storage(storage)).unwrap();
        let store = counter_store(json!({"n": 0}));
        attach(&store);
        assert_eq!(store.state(), json!({"n": 3}));
    }

    #[test]
    fn test_accessors() {
        let sync = StateSync::new(
            SyncOptions::from_config(crate::SyncConfig {
                key: "cfg".into(),
                ..Default::default()
            })
            .storage(MemoryStorage::new()),
        )
        .unwrap();
        assert_eq!(sync.key(), "cfg");
        assert!(sync.storage().get_item("cfg").unwrap().is_none());
    }
}
