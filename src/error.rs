//! Error types for the sync plugin.
//!
//! Only [`SyncError`] ever leaves [`crate::StateSync::new`]. Read, write and
//! remove failures at runtime are logged and absorbed by the plugin.

use thiserror::Error;

/// Failures raised by a [`crate::Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend exists but refuses access (private mode, disabled storage).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Write rejected because the backend is full.
    #[error("storage quota exceeded while writing `{key}`")]
    QuotaExceeded { key: String },

    /// Optional capability not implemented by this backend.
    #[error("storage does not support {0}")]
    Unsupported(&'static str),

    /// Any other backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failures raised by a [`crate::Store`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown mutation type: {0}")]
    UnknownMutation(String),
}

/// Configuration errors. These are fatal: the plugin is never produced.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No backend supplied and none detected in the environment.
    #[error("no storage engine available")]
    NoStorage,

    /// The storage validator rejected the backend.
    #[error("invalid storage engine: {0}")]
    InvalidStorage(#[source] StorageError),

    /// A configuration document failed to parse.
    #[error("invalid sync configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Result type for plugin construction.
pub type SyncResult<T> = Result<T, SyncError>;
