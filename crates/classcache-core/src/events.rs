//! Diagnostics for background sync work.
//!
//! Remote failures never reach callers of the table API. They are logged and
//! also broadcast as `SyncEvent`s so tests and front ends can observe them.

use serde::{Deserialize, Serialize};

use crate::models::TableName;

/// Buffer size for the diagnostics broadcast channel.
/// Slow receivers lag and skip old events rather than blocking sync tasks.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Mutation kind forwarded to the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one piece of background sync work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SyncEvent {
    /// A mutation was delivered and the endpoint answered with a 2xx.
    Sent {
        action: SyncAction,
        table: TableName,
        id: Option<String>,
    },
    SendFailed {
        action: SyncAction,
        table: TableName,
        id: Option<String>,
        error: String,
    },
    /// A remote snapshot was read, whether or not it changed anything.
    Fetched { table: TableName, count: usize },
    FetchFailed { table: TableName, error: String },
    /// The local cache was overwritten by a remote snapshot.
    Reconciled { table: TableName, count: usize },
}

impl SyncEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncEvent::SendFailed { .. } | SyncEvent::FetchFailed { .. })
    }
}
