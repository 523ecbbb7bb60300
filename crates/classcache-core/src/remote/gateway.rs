use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{RemoteCommand, Transport};
use crate::events::{SyncAction, SyncEvent};
use crate::models::{record_id, TableName};

/// Best-effort bridge to the remote store.
///
/// Never returns an error: failures are logged and broadcast as `SyncEvent`s.
pub struct RemoteGateway {
    transport: RwLock<Option<Arc<dyn Transport>>>,
    events: broadcast::Sender<SyncEvent>,
}

impl RemoteGateway {
    pub fn new(transport: Option<Arc<dyn Transport>>, events: broadcast::Sender<SyncEvent>) -> Self {
        Self {
            transport: RwLock::new(transport),
            events,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.current().is_some()
    }

    /// Swap the transport, e.g. after the endpoint was changed. Calls already
    /// in flight keep using the transport they started with.
    pub fn set_transport(&self, transport: Option<Arc<dyn Transport>>) {
        let mut slot = self.transport.write().unwrap_or_else(|e| e.into_inner());
        *slot = transport;
    }

    fn current(&self) -> Option<Arc<dyn Transport>> {
        self.transport
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn emit(&self, event: SyncEvent) {
        // No receivers is the normal case outside tests
        let _ = self.events.send(event);
    }

    /// Forward a mutation. Resolves once the attempt finished, successful or not.
    pub async fn send(&self, action: SyncAction, table: TableName, data: Value) {
        let Some(transport) = self.current() else {
            return;
        };

        let id = record_id(&data);
        let command = RemoteCommand { action, table, data };

        match transport.post_command(&command).await {
            Ok(()) => {
                debug!(table = %table, action = %action, id = ?id, "Remote write delivered");
                self.emit(SyncEvent::Sent { action, table, id });
            }
            Err(e) => {
                warn!(table = %table, action = %action, id = ?id, error = %e, "Remote write failed");
                self.emit(SyncEvent::SendFailed {
                    action,
                    table,
                    id,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Read the full remote snapshot of a table.
    ///
    /// `None` means "could not ask" (disabled, transport failure, or a body
    /// that is not a JSON array), which is different from `Some(vec![])`.
    pub async fn fetch(&self, table: TableName) -> Option<Vec<Value>> {
        let transport = self.current()?;

        let result = match transport.read_table(table).await {
            Ok(Value::Array(records)) => Ok(records),
            Ok(other) => Err(format!("expected a JSON array, got {}", json_kind(&other))),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(records) => {
                debug!(table = %table, count = records.len(), "Fetched remote snapshot");
                self.emit(SyncEvent::Fetched {
                    table,
                    count: records.len(),
                });
                Some(records)
            }
            Err(error) => {
                warn!(table = %table, error = %error, "Remote fetch failed");
                self.emit(SyncEvent::FetchFailed { table, error });
                None
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeTransport {
        reply: Value,
        fail: bool,
        sent: Mutex<Vec<RemoteCommand>>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn post_command(&self, command: &RemoteCommand) -> Result<(), RemoteError> {
            self.sent.lock().unwrap().push(command.clone());
            if self.fail {
                Err(RemoteError::MalformedBody("boom".to_string()))
            } else {
                Ok(())
            }
        }

        async fn read_table(&self, _table: TableName) -> Result<Value, RemoteError> {
            if self.fail {
                Err(RemoteError::InvalidEndpoint("offline".to_string()))
            } else {
                Ok(self.reply.clone())
            }
        }
    }

    fn fake(reply: Value, fail: bool) -> Arc<FakeTransport> {
        Arc::new(FakeTransport {
            reply,
            fail,
            sent: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_disabled_gateway_is_noop() {
        let (tx, mut rx) = broadcast::channel(8);
        let gateway = RemoteGateway::new(None, tx);
        assert!(!gateway.is_enabled());

        gateway
            .send(SyncAction::Create, TableName::Students, json!({"id": "std_1"}))
            .await;
        assert_eq!(gateway.fetch(TableName::Students).await, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_failure_is_swallowed_and_reported() {
        let (tx, mut rx) = broadcast::channel(8);
        let transport = fake(json!([]), true);
        let gateway = RemoteGateway::new(Some(transport.clone()), tx);

        gateway
            .send(SyncAction::Update, TableName::Users, json!({"id": "usr_1", "name": "Bo"}))
            .await;

        assert_eq!(transport.sent.lock().unwrap().len(), 1);
        match rx.try_recv().unwrap() {
            SyncEvent::SendFailed { action, table, id, .. } => {
                assert_eq!(action, SyncAction::Update);
                assert_eq!(table, TableName::Users);
                assert_eq!(id.as_deref(), Some("usr_1"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_distinguishes_empty_from_failure() {
        let (tx, _rx) = broadcast::channel(8);
        let gateway = RemoteGateway::new(Some(fake(json!([]), false)), tx.clone());
        assert_eq!(gateway.fetch(TableName::Materials).await, Some(vec![]));

        let failing = RemoteGateway::new(Some(fake(json!([]), true)), tx);
        assert_eq!(failing.fetch(TableName::Materials).await, None);
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_array() {
        let (tx, mut rx) = broadcast::channel(8);
        let gateway = RemoteGateway::new(Some(fake(json!({"error": "no sheet"}), false)), tx);

        assert_eq!(gateway.fetch(TableName::Submissions).await, None);
        assert!(matches!(rx.try_recv().unwrap(), SyncEvent::FetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_set_transport_toggles_enabled() {
        let (tx, _rx) = broadcast::channel(8);
        let gateway = RemoteGateway::new(None, tx);
        gateway.set_transport(Some(fake(json!([]), false)));
        assert!(gateway.is_enabled());
        gateway.set_transport(None);
        assert!(!gateway.is_enabled());
    }
}
