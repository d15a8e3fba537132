//! State Sync - persist and rehydrate store state
//!
//! Core modules:
//! - `persistence`: The sync plugin (rehydrate on attach, persist on mutation)
//! - `storage`: Key/value backends (in-memory, browser LocalStorage)
//! - `store`: Store contract plus a minimal reference store
//! - `merge`: Deep merge with pluggable array strategies
//! - `path`: Dotted/bracketed state paths and path projection
//! - `settings`: Serializable plugin configuration
//!
//! ```
//! use serde_json::json;
//! use state_sync::{BasicStore, MemoryStorage, StateSync, Store, SyncOptions};
//!
//! let storage = MemoryStorage::new().seeded("store", r#"{"count":5}"#);
//! let sync = StateSync::new(SyncOptions::new().storage(storage)).unwrap();
//!
//! let store = BasicStore::new(json!({"count": 0, "flag": true}));
//! sync.attach(&store);
//! assert_eq!(store.state(), json!({"count": 5, "flag": true}));
//! ```

pub mod error;
pub mod merge;
pub mod path;
pub mod persistence;
pub mod settings;
pub mod storage;
pub mod store;

pub use error::{StorageError, StoreError, SyncError, SyncResult};
pub use merge::{MergeOptions, array_merge, deep_merge};
pub use persistence::{StateSync, SyncOptions, plugin};
pub use settings::SyncConfig;
pub use storage::{MemoryStorage, Storage, default_storage, validate_storage};
pub use store::{BasicStore, Mutation, Store, SubscriptionId};

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
