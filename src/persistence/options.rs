//! Plugin options builder

use std::borrow::Cow;
use std::rc::Rc;

use serde_json::Value;

use super::hooks::{
    self, AssertStorageFn, FilterFn, GetStateFn, ReducerFn, RehydratedFn, RemoveStateFn,
    SetStateFn, SubscriberFn,
};
use crate::error::StorageError;
use crate::merge::{self, ArrayMergeFn, MergeFn, MergeOptions};
use crate::settings::SyncConfig;
use crate::storage::{self, Storage};
use crate::store::{Mutation, MutationHandler, Store, SubscriptionId};

/// Everything [`crate::StateSync::new`] needs.
///
/// Every hook starts at its default; setters replace one hook each. The
/// remover stays unset until construction, where it is picked from the
/// backend's capabilities.
pub struct SyncOptions {
    pub(crate) config: SyncConfig,
    pub(crate) storage: Option<Rc<dyn Storage>>,
    pub(crate) get_state: GetStateFn,
    pub(crate) set_state: SetStateFn,
    pub(crate) remove_state: Option<RemoveStateFn>,
    pub(crate) reducer: ReducerFn,
    pub(crate) filter: FilterFn,
    pub(crate) merge: MergeFn,
    pub(crate) array_merge: ArrayMergeFn,
    pub(crate) rehydrated: RehydratedFn,
    pub(crate) subscriber: SubscriberFn,
    pub(crate) assert_storage: AssertStorageFn,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(SyncConfig::default())
    }
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from serializable settings, all hooks at their defaults
    pub fn from_config(config: SyncConfig) -> Self {
        Self {
            config,
            storage: None,
            get_state: Rc::new(hooks::default_get_state),
            set_state: Rc::new(hooks::default_set_state),
            remove_state: None,
            reducer: Rc::new(hooks::default_reducer),
            filter: Rc::new(hooks::default_filter),
            merge: Rc::new(merge::deep_merge),
            array_merge: MergeOptions::default().array_merge,
            rehydrated: Rc::new(|_: &dyn Store| {}),
            subscriber: Rc::new(hooks::default_subscriber),
            assert_storage: Rc::new(storage::validate_storage),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.config.key = key.into();
        self
    }

    /// Backend to persist into. Pass an `Rc` to keep a handle of your own.
    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Some(Rc::new(storage));
        self
    }

    /// Persist only these state paths
    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.config.overwrite = overwrite;
        self
    }

    pub fn fetch_before_use(mut self, fetch_before_use: bool) -> Self {
        self.config.fetch_before_use = fetch_before_use;
        self
    }

    pub fn get_state(mut self, f: impl Fn(&str, &dyn Storage) -> Option<Value> + 'static) -> Self {
        self.get_state = Rc::new(f);
        self
    }

    pub fn set_state(mut self, f: impl Fn(&str, &Value, &dyn Storage) + 'static) -> Self {
        self.set_state = Rc::new(f);
        self
    }

    pub fn remove_state(mut self, f: impl Fn(&str, &dyn Storage) + 'static) -> Self {
        self.remove_state = Some(Rc::new(f));
        self
    }

    /// Reducers that keep the whole state can hand it back borrowed
    pub fn reducer(
        mut self,
        f: impl for<'a> Fn(&'a Value, Option<&[String]>) -> Cow<'a, Value> + 'static,
    ) -> Self {
        self.reducer = Rc::new(f);
        self
    }

    pub fn filter(mut self, f: impl Fn(&Mutation) -> bool + 'static) -> Self {
        self.filter = Rc::new(f);
        self
    }

    pub fn merge(mut self, f: impl Fn(Value, Value, &MergeOptions) -> Value + 'static) -> Self {
        self.merge = Rc::new(f);
        self
    }

    /// Tie-break for array-vs-array conflicts, `(live, saved) -> merged`
    pub fn array_merge(
        mut self,
        f: impl Fn(Vec<Value>, Vec<Value>) -> Vec<Value> + 'static,
    ) -> Self {
        self.array_merge = Rc::new(f);
        self
    }

    pub fn rehydrated(mut self, f: impl Fn(&dyn Store) + 'static) -> Self {
        self.rehydrated = Rc::new(f);
        self
    }

    pub fn subscriber(
        mut self,
        f: impl Fn(&dyn Store, MutationHandler) -> SubscriptionId + 'static,
    ) -> Self {
        self.subscriber = Rc::new(f);
        self
    }

    pub fn assert_storage(
        mut self,
        f: impl Fn(&dyn Storage) -> Result<(), StorageError> + 'static,
    ) -> Self {
        self.assert_storage = Rc::new(f);
        self
    }
}

impl std::fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOptions")
            .field("config", &self.config)
            .field("storage", &self.storage.is_some())
            .field("custom_remover", &self.remove_state.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_config() {
        let options = SyncOptions::new()
            .key("app")
            .paths(["a.b", "c"])
            .overwrite(true)
            .fetch_before_use(true);
        let config = options.config();
        assert_eq!(config.key, "app");
        assert_eq!(config.paths.as_deref(), Some(&["a.b".to_string(), "c".to_string()][..]));
        assert!(config.overwrite);
        assert!(config.fetch_before_use);
    }

    #[test]
    fn test_defaults_have_no_storage_or_remover() {
        let options = SyncOptions::default();
        assert!(options.storage.is_none());
        assert!(options.remove_state.is_none());
        assert_eq!(options.config().key, "store");
    }
}
