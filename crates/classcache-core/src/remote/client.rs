//! HTTP transport for the spreadsheet-backed remote endpoint.
//!
//! The endpoint speaks a tiny protocol:
//! - `POST <endpoint>` with `{action, table, data}` for mutations
//! - `GET <endpoint>?action=read&table=<name>` returning a JSON array

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use super::{RemoteCommand, RemoteError, Transport};
use crate::models::TableName;

/// Transport over `reqwest`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport for `endpoint`. Without a timeout a hanging request
    /// simply stays pending until the connection gives up.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, RemoteError> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| RemoteError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidEndpoint(endpoint.to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_command(&self, command: &RemoteCommand) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(command)
            .send()
            .await?;
        // Body is deliberately not consumed; delivery is unconfirmed beyond the status
        Self::check_response(response).await?;
        Ok(())
    }

    async fn read_table(&self, table: TableName) -> Result<Value, RemoteError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("action", "read"), ("table", table.as_str())])
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let body = response.text().await?;
        debug!(table = %table, bytes = body.len(), "Read remote table");
        serde_json::from_str(&body).map_err(|e| RemoteError::MalformedBody(e.to_string()))
    }
}
