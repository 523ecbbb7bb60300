//! Delivery of committed table snapshots in commit order.
//!
//! Writers enqueue their snapshot while they still hold the engine's write
//! lock, so queue order is commit order. Whichever thread finds no delivery
//! in progress drains the queue; the others wait until their own snapshot has
//! gone out. A listener that writes again from inside a callback only
//! enqueues, and the outer drain delivers it once the callback returns.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use serde_json::Value;

use crate::models::TableName;
use crate::notifier::ChangeNotifier;

#[derive(Default)]
struct Queue {
    pending: VecDeque<(u64, TableName, Vec<Value>)>,
    last_queued: u64,
    last_delivered: u64,
    draining: Option<ThreadId>,
}

#[derive(Default)]
pub(crate) struct Dispatcher {
    queue: Mutex<Queue>,
    delivered: Condvar,
}

impl Dispatcher {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a committed snapshot. Call with the write lock held.
    pub(crate) fn enqueue(&self, table: TableName, snapshot: Vec<Value>) -> u64 {
        let mut queue = self.lock();
        queue.last_queued += 1;
        let ticket = queue.last_queued;
        queue.pending.push_back((ticket, table, snapshot));
        ticket
    }

    /// Return once the snapshot behind `ticket` has reached the listeners, or
    /// immediately when called from inside a delivery on this thread.
    pub(crate) fn deliver(&self, ticket: u64, notifier: &ChangeNotifier) {
        let me = thread::current().id();
        let mut queue = self.lock();
        loop {
            if queue.last_delivered >= ticket || queue.draining == Some(me) {
                return;
            }
            if queue.draining.is_none() {
                break;
            }
            queue = self
                .delivered
                .wait(queue)
                .unwrap_or_else(|e| e.into_inner());
        }
        queue.draining = Some(me);
        drop(queue);

        let _drain = Drain { dispatcher: self };
        loop {
            let next = self.lock().pending.pop_front();
            let Some((ticket, table, snapshot)) = next else {
                break;
            };
            notifier.notify(table, &snapshot);
            self.lock().last_delivered = ticket;
            self.delivered.notify_all();
        }
    }
}

/// Hands the queue back when a drain ends, including by a panicking listener.
struct Drain<'a> {
    dispatcher: &'a Dispatcher,
}

impl Drop for Drain<'_> {
    fn drop(&mut self) {
        self.dispatcher.lock().draining = None;
        self.dispatcher.delivered.notify_all();
    }
}
