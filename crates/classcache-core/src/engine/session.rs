use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::Session;
use crate::store::{LocalStore, StoreError, StoreResult};

/// Session key in the local store
const SESSION_KEY: &str = "session";

/// The signed-in identity on this device. Local only: never synced, no
/// subscribers.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn LocalStore>,
}

impl SessionStore {
    pub(crate) fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Current session. Missing or unreadable data means nobody is signed in.
    pub fn get(&self) -> Option<Session> {
        let raw = match self.store.read(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read session");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed session");
                None
            }
        }
    }

    pub fn set(&self, session: &Session) -> StoreResult<()> {
        let contents = serde_json::to_string(session).map_err(StoreError::from)?;
        self.store.write(SESSION_KEY, &contents)?;
        debug!(name = session.display_name(), "Session saved");
        Ok(())
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.store.remove(SESSION_KEY)?;
        debug!("Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Student, User};
    use crate::store::MemoryStore;

    #[test]
    fn test_set_get_clear() {
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(sessions.get(), None);

        let staff = Session::Staff(User {
            id: Some("usr_1".to_string()),
            name: "Rosa".to_string(),
            ..Default::default()
        });
        sessions.set(&staff).unwrap();
        assert_eq!(sessions.get(), Some(staff));

        let student = Session::Student(Student::new("Ana", "3"));
        sessions.set(&student).unwrap();
        assert_eq!(sessions.get(), Some(student));

        sessions.clear().unwrap();
        assert_eq!(sessions.get(), None);
    }

    #[test]
    fn test_corrupt_session_reads_as_none() {
        let store = MemoryStore::new().with_entry(SESSION_KEY, "{\"kind\":");
        let sessions = SessionStore::new(Arc::new(store));
        assert_eq!(sessions.get(), None);
    }
}
