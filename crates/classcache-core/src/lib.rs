//! classcache-core - local-first record cache with background remote sync.
//!
//! The `Engine` keeps a durable local copy of a few record tables (users,
//! students, materials, submissions, settings) authoritative for reads.
//! Writes land locally and reach subscribers immediately; a spreadsheet-backed
//! HTTP endpoint is updated in the background on a best-effort basis, and
//! subscribing pulls the remote snapshot to refresh the cache.
//!
//! ```no_run
//! use std::sync::Arc;
//! use classcache_core::{Engine, MemoryStore, Student};
//!
//! let engine = Engine::new(Arc::new(MemoryStore::new()), None);
//! let ana = engine.students().save(Student::new("Ana", "3"));
//! assert!(ana.id.unwrap().starts_with("std_"));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod notifier;
pub mod remote;
pub mod store;

pub use config::Config;
pub use engine::{Engine, SessionStore, SettingsTable, Table};
pub use error::{Error, Result};
pub use events::{SyncAction, SyncEvent};
pub use models::{
    Material, Record, Session, Settings, Student, Submission, TableName, User, SETTINGS_ID,
};
pub use notifier::Subscription;
pub use remote::{HttpTransport, RemoteCommand, RemoteError, Transport};
pub use store::{FileStore, LocalStore, MemoryStore, StoreError};
