//! Per-table publish/subscribe for full table snapshots.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;
use tracing::debug;

use crate::models::TableName;

/// Receives the full contents of a table after every change.
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<TableName, Vec<(u64, Listener)>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

/// Registry of listeners, one channel per table.
#[derive(Default)]
pub struct ChangeNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `table`. Registering the same listener twice
    /// creates two independent registrations.
    pub fn subscribe(&self, table: TableName, listener: Listener) -> Subscription {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.entry(table).or_default().push((id, listener));
        debug!(table = %table, subscription = id, "Listener registered");

        Subscription {
            table,
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invoke every listener of `table` with `snapshot`, in registration order.
    ///
    /// Listeners run outside the registry lock so they may subscribe or
    /// unsubscribe themselves.
    pub fn notify(&self, table: TableName, snapshot: &[Value]) {
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .get(&table)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener(snapshot);
        }
    }

    pub fn listener_count(&self, table: TableName) -> usize {
        lock(&self.registry)
            .listeners
            .get(&table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Capability to remove one registration.
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
#[must_use = "keep the subscription to be able to unsubscribe later"]
pub struct Subscription {
    table: TableName,
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove exactly this registration. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = lock(&registry);
        let Some(entries) = registry.listeners.get_mut(&self.table) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(id, _)| *id != self.id);
        let removed = entries.len() < before;
        if removed {
            debug!(table = %self.table, subscription = self.id, "Listener removed");
        }
        removed
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("table", &self.table)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Listener) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        let listener: Listener = Arc::new(move |_: &[Value]| {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    #[test]
    fn test_notify_in_registration_order() {
        let notifier = ChangeNotifier::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            let _ = notifier.subscribe(
                TableName::Students,
                Arc::new(move |_: &[Value]| order.lock().unwrap().push(n)),
            );
        }

        notifier.notify(TableName::Students, &[json!({"id": "std_1"})]);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_tables_are_isolated() {
        let notifier = ChangeNotifier::new();
        let (count, listener) = counter();
        let _sub = notifier.subscribe(TableName::Users, listener);

        notifier.notify(TableName::Materials, &[]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        notifier.notify(TableName::Users, &[]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_listener_unsubscribes_one_registration() {
        let notifier = ChangeNotifier::new();
        let (count, listener) = counter();

        let first = notifier.subscribe(TableName::Students, listener.clone());
        let _second = notifier.subscribe(TableName::Students, listener);
        assert_eq!(notifier.listener_count(TableName::Students), 2);

        assert!(first.unsubscribe());
        assert_eq!(notifier.listener_count(TableName::Students), 1);

        notifier.notify(TableName::Students, &[]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_after_notifier_dropped() {
        let notifier = ChangeNotifier::new();
        let (_count, listener) = counter();
        let sub = notifier.subscribe(TableName::Settings, listener);
        drop(notifier);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_listener_may_unsubscribe_during_notify() {
        let notifier = Arc::new(ChangeNotifier::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let inner = slot.clone();
        let sub = notifier.subscribe(
            TableName::Submissions,
            Arc::new(move |_: &[Value]| {
                if let Some(sub) = inner.lock().unwrap().take() {
                    sub.unsubscribe();
                }
            }),
        );
        *slot.lock().unwrap() = Some(sub);

        notifier.notify(TableName::Submissions, &[]);
        assert_eq!(notifier.listener_count(TableName::Submissions), 0);
    }
}
