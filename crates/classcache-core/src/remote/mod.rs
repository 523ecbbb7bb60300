//! Remote gateway to the spreadsheet-backed record store.
//!
//! Writes are fire-and-forget and reads return `None` on any failure. When no
//! endpoint is configured the gateway is disabled and every call returns
//! immediately, so the engine runs purely local.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::HttpTransport;
pub use error::RemoteError;
pub use gateway::RemoteGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::SyncAction;
use crate::models::TableName;

/// Body of an outbound mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCommand {
    pub action: SyncAction,
    pub table: TableName,
    pub data: Value,
}

/// Wire-level access to the remote endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one mutation. Success only means the endpoint answered 2xx.
    async fn post_command(&self, command: &RemoteCommand) -> Result<(), RemoteError>;

    /// Read the raw JSON the endpoint returns for a table.
    async fn read_table(&self, table: TableName) -> Result<Value, RemoteError>;
}
