use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, warn};

use super::EngineInner;
use crate::models::{Record, TableName};
use crate::notifier::Subscription;

/// Typed handle to one cached table.
///
/// All reads come from the local cache. Writes return once the cache and
/// subscribers are updated; the remote copy catches up in the background.
pub struct Table<R: Record> {
    name: TableName,
    inner: Arc<EngineInner>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Table<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: self.inner.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Table<R> {
    pub(crate) fn new(name: TableName, inner: Arc<EngineInner>) -> Self {
        Self {
            name,
            inner,
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> TableName {
        self.name
    }

    /// Snapshot of the cached table.
    pub fn list(&self) -> Vec<R> {
        decode_all(self.name, &self.inner.load(self.name))
    }

    pub fn get(&self, id: &str) -> Option<R> {
        self.list()
            .into_iter()
            .find(|r| r.id().as_deref() == Some(id))
    }

    pub fn len(&self) -> usize {
        self.inner.load(self.name).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or update `record` and return it as stored, with its id.
    ///
    /// A record whose id is already cached replaces it in place; one with an
    /// unknown id is appended as is; one without an id gets a generated id.
    pub fn save(&self, record: R) -> R {
        let value = match serde_json::to_value(&record) {
            Ok(value) => value,
            Err(e) => {
                error!(table = %self.name, error = %e, "Record could not be serialized, not saved");
                return record;
            }
        };
        let saved = self.inner.save(self.name, value);
        decode(self.name, saved).unwrap_or(record)
    }

    /// Remove the record with `id`. Deleting an unknown id is a no-op locally
    /// (subscribers are still notified) and returns false.
    pub fn delete(&self, id: &str) -> bool {
        self.inner.delete(self.name, id)
    }

    /// Append `records` as new rows, each with a fresh id, in one write.
    ///
    /// Returns nothing if the write could not be persisted. On the settings
    /// table only the last record is kept, stored under the fixed id.
    pub fn bulk_import(&self, records: Vec<R>) -> Vec<R> {
        let values: Vec<Value> = records
            .iter()
            .filter_map(|record| match serde_json::to_value(record) {
                Ok(value) => Some(value),
                Err(e) => {
                    error!(table = %self.name, error = %e, "Skipping record that could not be serialized");
                    None
                }
            })
            .collect();
        let imported = self.inner.import(self.name, values);
        decode_all(self.name, &imported)
    }

    /// Call `callback` with the table now and after every change.
    ///
    /// The first call happens before this returns, from the cache. If a
    /// remote endpoint is configured a background fetch may replace the cache
    /// and trigger another call.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Vec<R>) + Send + Sync + 'static,
    {
        let name = self.name;
        self.inner.subscribe(
            name,
            Arc::new(move |records: &[Value]| callback(decode_all(name, records))),
        )
    }
}

fn decode<R: Record>(table: TableName, value: Value) -> Option<R> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(table = %table, error = %e, "Skipping record that does not match its model");
            None
        }
    }
}

fn decode_all<R: Record>(table: TableName, values: &[Value]) -> Vec<R> {
    values
        .iter()
        .filter_map(|value| decode(table, value.clone()))
        .collect()
}
