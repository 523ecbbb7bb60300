use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{LocalStore, StoreResult};

/// In-process store. Contents are lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key, e.g. with deliberately malformed contents in tests.
    pub fn with_entry(self, key: &str, contents: &str) -> Self {
        self.lock().insert(key.to_string(), contents.to_string());
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave a map entry half-written
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LocalStore for MemoryStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, contents: &str) -> StoreResult<()> {
        self.lock().insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new().with_entry("users", "[1]");
        assert_eq!(store.read("users").unwrap().as_deref(), Some("[1]"));
        store.write("users", "[]").unwrap();
        assert_eq!(store.read("users").unwrap().as_deref(), Some("[]"));
        store.remove("users").unwrap();
        assert_eq!(store.read("users").unwrap(), None);
    }
}
