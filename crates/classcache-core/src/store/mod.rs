//! Durable key/value persistence for table snapshots, settings and session.
//!
//! The engine only needs three operations on string values, so anything that
//! can hold a handful of JSON documents can back it:
//! - `FileStore`: one `<key>.json` file per key in a data directory
//! - `MemoryStore`: process-local map, for tests and throwaway sessions

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key/value substrate the engine persists into.
///
/// Implementations must be safe to share between the caller and background
/// sync tasks.
pub trait LocalStore: Send + Sync {
    /// Raw contents stored under `key`, or `None` if nothing is stored.
    fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replace whatever is stored under `key`.
    fn write(&self, key: &str, contents: &str) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;
}
