//! Session storage for frozen engines
//!
//! The request layer never keeps engines alive between requests: each request thaws the
//! session's blob, runs, and stores the re-frozen result.

use std::collections::HashMap;
use uuid::Uuid;

pub trait SessionStore {
    fn get(&self, session_id: &str) -> Option<Vec<u8>>;

    fn set(&mut self, session_id: &str, blob: Vec<u8>);
}

/// In-process store keyed by session id
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: HashMap<String, Vec<u8>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn remove(&mut self, session_id: &str) -> Option<Vec<u8>> {
        self.sessions.remove(session_id)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Option<Vec<u8>> {
        self.sessions.get(session_id).cloned()
    }

    fn set(&mut self, session_id: &str, blob: Vec<u8>) {
        self.sessions.insert(session_id.to_string(), blob);
    }
}

/// Fresh random session id
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemorySessionStore::new();
        let id = new_session_id();
        assert_eq!(store.get(&id), None);
        store.set(&id, b"{}".to_vec());
        assert_eq!(store.get(&id), Some(b"{}".to_vec()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove(&id), Some(b"{}".to_vec()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_session_ids_are_unique_uuids() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
