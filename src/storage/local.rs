//! Browser LocalStorage backend (WASM only)

use super::Storage;
use crate::error::StorageError;

/// `window.localStorage` behind the [`Storage`] trait
pub struct LocalStorage {
    inner: web_sys::Storage,
}

impl LocalStorage {
    /// Wrap an existing `web_sys::Storage` handle
    pub fn new(inner: web_sys::Storage) -> Self {
        Self { inner }
    }

    /// Look up `window.localStorage`. None when there is no window or
    /// the browser denies access (e.g. storage disabled).
    pub fn from_window() -> Option<Self> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()?;
        Some(Self::new(storage))
    }
}

impl Storage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // Browsers only report quota failures as an opaque DOMException
        self.inner
            .set_item(key, value)
            .map_err(|e| StorageError::Backend(format!("{:?}", e)))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.inner
            .remove_item(key)
            .map_err(|e| StorageError::Backend(format!("{:?}", e)))
    }

    fn supports_remove(&self) -> bool {
        true
    }
}
