//! Key/value storage backends
//!
//! The plugin only needs string get/set; remove is an optional capability
//! advertised through [`Storage::supports_remove`].

#[cfg(target_arch = "wasm32")]
mod local;

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::StorageError;

/// Key used by [`validate_storage`] for its sentinel write
pub const SENTINEL_KEY: &str = "__state_sync_sentinel__";

/// String key/value backend.
///
/// Methods take `&self`; backends that mutate use interior mutability the
/// same way browser storage does.
pub trait Storage {
    /// Read the raw value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Backends without removal keep the default.
    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unsupported("remove"))
    }

    /// Whether [`Storage::remove_item`] is implemented
    fn supports_remove(&self) -> bool {
        false
    }
}

/// In-process storage backend.
///
/// Useful natively (where there is no ambient persistent storage) and in
/// tests. Can be given a byte quota and can be built without remove support.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
    /// Max total bytes of keys + values (None = unbounded)
    quota: Option<usize>,
    without_remove: bool,
    writes: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of stored keys and values
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Backend that does not implement `remove_item`
    pub fn without_remove() -> Self {
        Self {
            without_remove: true,
            ..Self::default()
        }
    }

    /// Pre-populate an entry (does not count as a write)
    pub fn seeded(self, key: &str, value: &str) -> Self {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Number of successful `set_item` calls
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.items
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            if self.used_bytes_without(key) + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if self.without_remove {
            return Err(StorageError::Unsupported("remove"));
        }
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn supports_remove(&self) -> bool {
        !self.without_remove
    }
}

impl<S: Storage + ?Sized> Storage for Rc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn supports_remove(&self) -> bool {
        (**self).supports_remove()
    }
}

/// Persistent storage provided by the environment, if any.
///
/// Browser builds return `window.localStorage`; everything else has no
/// ambient storage and must inject one explicitly.
#[cfg(target_arch = "wasm32")]
pub fn default_storage() -> Option<Rc<dyn Storage>> {
    LocalStorage::from_window().map(|s| Rc::new(s) as Rc<dyn Storage>)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn default_storage() -> Option<Rc<dyn Storage>> {
    None
}

/// Default storage validator.
///
/// Performs a real write so that quota and availability problems surface at
/// construction, then cleans the sentinel up (remove, or blank-write when the
/// backend has no remove).
pub fn validate_storage(storage: &dyn Storage) -> Result<(), StorageError> {
    storage.set_item(SENTINEL_KEY, "1").inspect_err(|e| {
        log::warn!("Storage is not usable: {e}");
    })?;

    let cleanup = if storage.supports_remove() {
        storage.remove_item(SENTINEL_KEY)
    } else {
        storage.set_item(SENTINEL_KEY, "")
    };
    cleanup.inspect_err(|e| log::warn!("Storage sentinel cleanup failed: {e}"))
}
