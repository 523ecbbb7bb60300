//! The cache-and-sync engine.
//!
//! Every mutation is applied to the local store and announced to subscribers
//! before the call returns; mirroring to the remote endpoint happens in a
//! background task nobody waits on. Subscribing replays the cached table
//! right away and then reconciles with a remote snapshot (last fetch wins).

mod dispatch;
pub mod ids;
pub mod session;
pub mod settings;
pub mod table;

pub use session::SessionStore;
pub use settings::SettingsTable;
pub use table::Table;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use self::dispatch::Dispatcher;

use crate::config::Config;
use crate::error::Result;
use crate::events::{SyncAction, SyncEvent, EVENT_CHANNEL_CAPACITY};
use crate::models::{
    assign_id, record_id, Material, Record, Student, Submission, TableName, User, SETTINGS_ID,
};
use crate::notifier::{ChangeNotifier, Listener, Subscription};
use crate::remote::{HttpTransport, RemoteGateway, Transport};
use crate::store::{FileStore, LocalStore};

/// Store key holding the remote endpoint chosen at runtime.
pub const ENDPOINT_KEY: &str = "remote_endpoint";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Handle to the engine. Clone is cheap; clones share all state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    store: Arc<dyn LocalStore>,
    gateway: RemoteGateway,
    notifier: ChangeNotifier,
    dispatcher: Dispatcher,
    events: broadcast::Sender<SyncEvent>,
    /// Serializes load-modify-write cycles on the store.
    write_lock: Mutex<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    request_timeout: Option<Duration>,
}

impl Engine {
    /// Build an engine over explicit dependencies. `None` runs local-only.
    pub fn new(store: Arc<dyn LocalStore>, transport: Option<Arc<dyn Transport>>) -> Self {
        Self::with_timeout(store, transport, None)
    }

    fn with_timeout(
        store: Arc<dyn LocalStore>,
        transport: Option<Arc<dyn Transport>>,
        request_timeout: Option<Duration>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(EngineInner {
                store,
                gateway: RemoteGateway::new(transport, events.clone()),
                notifier: ChangeNotifier::new(),
                dispatcher: Dispatcher::default(),
                events,
                write_lock: Mutex::new(()),
                tasks: Mutex::new(Vec::new()),
                request_timeout,
            }),
        }
    }

    /// Open the file-backed engine described by `config`.
    ///
    /// The endpoint comes from the config if set, otherwise from the one
    /// saved in the store by [`Engine::set_remote_endpoint`].
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let data_dir = config.data_dir()?;
        let store = FileStore::new(data_dir.clone())
            .with_context(|| format!("Failed to open data directory: {}", data_dir.display()))?;
        let engine = Self::with_timeout(Arc::new(store), None, config.request_timeout());

        let endpoint = match config.endpoint() {
            Some(endpoint) => Some(endpoint.to_string()),
            None => engine.remote_endpoint(),
        };
        if let Some(endpoint) = endpoint {
            let transport = HttpTransport::new(&endpoint, config.request_timeout())
                .with_context(|| format!("Invalid remote endpoint: {}", endpoint))?;
            engine.inner.gateway.set_transport(Some(Arc::new(transport)));
            info!(endpoint = %endpoint, "Remote sync enabled");
        } else {
            info!("No remote endpoint configured, running local-only");
        }

        Ok(engine)
    }

    pub fn users(&self) -> Table<User> {
        self.table(TableName::Users)
    }

    pub fn students(&self) -> Table<Student> {
        self.table(TableName::Students)
    }

    pub fn materials(&self) -> Table<Material> {
        self.table(TableName::Materials)
    }

    pub fn submissions(&self) -> Table<Submission> {
        self.table(TableName::Submissions)
    }

    pub fn settings(&self) -> SettingsTable {
        SettingsTable::new(self.table(TableName::Settings))
    }

    pub fn session(&self) -> SessionStore {
        SessionStore::new(self.inner.store.clone())
    }

    /// Any table viewed as records of type `R` (use `serde_json::Value` for
    /// untyped access).
    pub fn table<R: Record>(&self, name: TableName) -> Table<R> {
        Table::new(name, self.inner.clone())
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.inner.gateway.is_enabled()
    }

    /// Endpoint saved in the local store, if any.
    pub fn remote_endpoint(&self) -> Option<String> {
        let raw = match self.inner.store.read(ENDPOINT_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read stored endpoint");
                return None;
            }
        };
        match serde_json::from_str::<String>(&raw) {
            Ok(endpoint) if !endpoint.trim().is_empty() => Some(endpoint),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed stored endpoint");
                None
            }
        }
    }

    /// Save (or clear) the endpoint and switch the gateway to it.
    pub fn set_remote_endpoint(&self, endpoint: Option<&str>) -> Result<()> {
        match endpoint.map(str::trim).filter(|s| !s.is_empty()) {
            Some(endpoint) => {
                let transport = HttpTransport::new(endpoint, self.inner.request_timeout)?;
                let contents = serde_json::to_string(endpoint).map_err(crate::store::StoreError::from)?;
                self.inner.store.write(ENDPOINT_KEY, &contents)?;
                self.inner.gateway.set_transport(Some(Arc::new(transport)));
                info!(endpoint = %endpoint, "Remote endpoint updated");
            }
            None => {
                self.inner.store.remove(ENDPOINT_KEY)?;
                self.inner.gateway.set_transport(None);
                info!("Remote endpoint cleared, running local-only");
            }
        }
        Ok(())
    }

    /// Diagnostics for background sync work.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Wait for every background sync task spawned so far.
    ///
    /// Local reads never need this; it exists so a short-lived process can
    /// let pending remote writes finish before exiting.
    pub async fn settle(&self) {
        loop {
            let pending = std::mem::take(&mut *lock(&self.inner.tasks));
            if pending.is_empty() {
                break;
            }
            for task in pending {
                if let Err(e) = task.await {
                    warn!(error = %e, "Background sync task did not complete");
                }
            }
        }
    }
}

impl EngineInner {
    /// Current contents of a table. Missing, unreadable or malformed data
    /// reads as an empty table.
    pub(crate) fn load(&self, table: TableName) -> Vec<Value> {
        let raw = match self.store.read(table.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(table = %table, error = %e, "Failed to read table, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(records)) => records,
            // Settings used to be stored as a bare object
            Ok(record @ Value::Object(_)) => vec![record],
            Ok(Value::Null) => Vec::new(),
            Ok(_) => {
                warn!(table = %table, "Table is not a JSON array, treating as empty");
                Vec::new()
            }
            Err(e) => {
                warn!(table = %table, error = %e, "Malformed table data, treating as empty");
                Vec::new()
            }
        }
    }

    /// Persist a table. Failures are logged and reported as `false`.
    fn write(&self, table: TableName, records: &[Value]) -> bool {
        let result = serde_json::to_string(records)
            .map_err(crate::store::StoreError::from)
            .and_then(|contents| self.store.write(table.as_str(), &contents));
        match result {
            Ok(()) => true,
            Err(e) => {
                error!(table = %table, error = %e, "Failed to persist table");
                false
            }
        }
    }

    /// Persist `records` and queue them for subscribers. Call with the write
    /// lock held; returns the delivery ticket, or `None` if nothing was stored.
    fn commit(&self, table: TableName, records: Vec<Value>) -> Option<u64> {
        if !self.write(table, &records) {
            return None;
        }
        Some(self.dispatcher.enqueue(table, records))
    }

    fn deliver(&self, ticket: u64) {
        self.dispatcher.deliver(ticket, &self.notifier);
    }

    /// Insert or replace one record and mirror it remotely.
    ///
    /// Settings records are always stored under [`SETTINGS_ID`].
    pub(crate) fn save(self: &Arc<Self>, table: TableName, mut record: Value) -> Value {
        if table == TableName::Settings && !assign_id(&mut record, SETTINGS_ID) {
            warn!("Settings record is not an object, not saved");
            return record;
        }

        let committed = {
            let _guard = lock(&self.write_lock);
            let mut records = self.load(table);

            let action = match record_id(&record) {
                Some(id) => match records.iter().position(|r| record_id(r).as_deref() == Some(id.as_str())) {
                    Some(index) => {
                        records[index] = record.clone();
                        SyncAction::Update
                    }
                    None => {
                        records.push(record.clone());
                        SyncAction::Create
                    }
                },
                None => {
                    let id = ids::generate_id(table);
                    if !assign_id(&mut record, &id) {
                        warn!(table = %table, "Record is not an object, storing without id");
                    }
                    records.push(record.clone());
                    SyncAction::Create
                }
            };

            self.commit(table, records).map(|ticket| (action, ticket))
        };

        let Some((action, ticket)) = committed else {
            return record;
        };
        debug!(table = %table, action = %action, id = ?record_id(&record), "Saved record");
        self.deliver(ticket);
        self.mirror(action, table, record.clone());
        record
    }

    /// Remove a record by id. Returns whether anything was removed.
    pub(crate) fn delete(self: &Arc<Self>, table: TableName, id: &str) -> bool {
        let committed = {
            let _guard = lock(&self.write_lock);
            let mut records = self.load(table);
            let before = records.len();
            records.retain(|r| record_id(r).as_deref() != Some(id));
            let removed = records.len() < before;
            self.commit(table, records).map(|ticket| (removed, ticket))
        };

        let Some((removed, ticket)) = committed else {
            return false;
        };
        debug!(table = %table, id = id, removed = removed, "Deleted record");
        self.deliver(ticket);
        self.mirror(SyncAction::Delete, table, serde_json::json!({ "id": id }));
        removed
    }

    /// Append many new records with one write and one notification, then
    /// send one remote create per record, in order.
    ///
    /// The settings table holds a single row, so a settings batch collapses
    /// to a save of its last record.
    pub(crate) fn import(self: &Arc<Self>, table: TableName, incoming: Vec<Value>) -> Vec<Value> {
        if table == TableName::Settings {
            if incoming.len() > 1 {
                warn!(count = incoming.len(), "Settings import keeps only the last record");
            }
            return match incoming.into_iter().last() {
                Some(record) => vec![self.save(table, record)],
                None => Vec::new(),
            };
        }

        let imported: Vec<Value> = incoming
            .into_iter()
            .enumerate()
            .map(|(index, mut record)| {
                if !assign_id(&mut record, &ids::generate_bulk_id(table, index)) {
                    warn!(table = %table, index = index, "Imported record is not an object, storing without id");
                }
                record
            })
            .collect();

        let ticket = {
            let _guard = lock(&self.write_lock);
            let mut records = self.load(table);
            records.extend(imported.iter().cloned());
            self.commit(table, records)
        };

        let Some(ticket) = ticket else {
            return Vec::new();
        };
        info!(table = %table, count = imported.len(), "Imported records");
        self.deliver(ticket);

        if self.gateway.is_enabled() && !imported.is_empty() {
            let inner = self.clone();
            let batch = imported.clone();
            self.spawn(async move {
                for record in batch {
                    inner.gateway.send(SyncAction::Create, table, record).await;
                }
            });
        }
        imported
    }

    /// Register a listener, replay the cache to it, then reconcile with the
    /// remote snapshot in the background.
    pub(crate) fn subscribe(self: &Arc<Self>, table: TableName, listener: Listener) -> Subscription {
        let subscription = self.notifier.subscribe(table, listener.clone());
        listener(self.load(table).as_slice());

        if self.gateway.is_enabled() {
            let inner = self.clone();
            self.spawn(async move {
                if let Some(remote) = inner.gateway.fetch(table).await {
                    inner.reconcile(table, remote);
                }
            });
        }
        subscription
    }

    /// Overwrite the cache with a remote snapshot when it is non-empty and
    /// differs from what is cached. Local writes made since the last fetch
    /// are lost if the remote disagrees.
    fn reconcile(&self, table: TableName, remote: Vec<Value>) {
        if remote.is_empty() {
            debug!(table = %table, "Remote table empty, keeping local cache");
            return;
        }

        let count = remote.len();
        let ticket = {
            let _guard = lock(&self.write_lock);
            let cached = serde_json::to_string(&self.load(table)).unwrap_or_default();
            let incoming = serde_json::to_string(&remote).unwrap_or_default();
            if cached == incoming {
                debug!(table = %table, "Remote snapshot matches cache");
                return;
            }
            self.commit(table, remote)
        };

        let Some(ticket) = ticket else {
            return;
        };
        info!(table = %table, count = count, "Local cache replaced by remote snapshot");
        self.deliver(ticket);
        let _ = self.events.send(SyncEvent::Reconciled { table, count });
    }

    fn mirror(self: &Arc<Self>, action: SyncAction, table: TableName, data: Value) {
        if !self.gateway.is_enabled() {
            return;
        }
        let inner = self.clone();
        self.spawn(async move {
            inner.gateway.send(action, table, data).await;
        });
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(handle) => {
                let join = handle.spawn(task);
                let mut tasks = lock(&self.tasks);
                tasks.retain(|t| !t.is_finished());
                tasks.push(join);
            }
            Err(_) => {
                warn!("No async runtime available, skipping remote sync");
            }
        }
    }
}
