//! In-memory session store.
//!
//! The in-memory copy is authoritative for in-flight dialogs; persistence
//! only mirrors metadata for observability. The store is a seam so tests
//! (or a future deployment) can swap the backing.

use std::time::Duration;

use time::OffsetDateTime;

use super::types::Session;

/// Keyed storage for in-flight sessions.
pub trait SessionStore: Send + Sync {
    /// Fetch a session by its gateway key.
    fn get(&self, key: &str) -> Option<Session>;

    /// Insert or replace a session.
    fn upsert(&self, session: Session);

    /// Remove a session, returning it if present.
    fn remove(&self, key: &str) -> Option<Session>;

    /// Drop every session idle longer than `ttl`, returning what was purged.
    fn purge_expired(&self, now: OffsetDateTime, ttl: Duration) -> Vec<Session>;

    /// Number of live sessions.
    fn len(&self) -> usize;

    /// True when no sessions are held.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// DashMap-backed store for single-instance deployment.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: dashmap::DashMap<String, Session>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Option<Session> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    fn upsert(&self, session: Session) {
        self.sessions.insert(session.key.clone(), session);
    }

    fn remove(&self, key: &str) -> Option<Session> {
        self.sessions.remove(key).map(|(_, session)| session)
    }

    fn purge_expired(&self, now: OffsetDateTime, ttl: Duration) -> Vec<Session> {
        let expired_keys: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(ttl, now))
            .map(|entry| entry.key().clone())
            .collect();

        expired_keys
            .iter()
            .filter_map(|key| self.sessions.remove(key).map(|(_, session)| session))
            .collect()
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const TTL: Duration = Duration::from_secs(30 * 60);

    fn session(key: &str, at: OffsetDateTime) -> Session {
        Session::new(key, "+250700000001", at)
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let store = InMemorySessionStore::new();
        store.upsert(session("a", datetime!(2026-01-01 12:00 UTC)));

        let found = store.get("a").unwrap();
        assert_eq!(found.key, "a");
        assert!(store.get("b").is_none());
    }

    #[test]
    fn remove_returns_the_session() {
        let store = InMemorySessionStore::new();
        store.upsert(session("a", datetime!(2026-01-01 12:00 UTC)));

        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn purge_drops_only_expired_sessions() {
        let store = InMemorySessionStore::new();
        store.upsert(session("old", datetime!(2026-01-01 11:00 UTC)));
        store.upsert(session("fresh", datetime!(2026-01-01 11:55 UTC)));

        let purged = store.purge_expired(datetime!(2026-01-01 12:00 UTC), TTL);

        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].key, "old");
        assert!(store.get("old").is_none());
        assert!(store.get("fresh").is_some());
    }
}
