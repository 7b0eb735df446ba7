//! Ephemeral session records for the OAuth handshake.
//!
//! A session record binds a CSRF token to a handshake in progress. It is
//! created when the login redirect is issued, read once at the provider
//! callback, and deleted on consumption. Records expire after a TTL; an
//! expired record is reported absent whether or not it has been purged,
//! so the two handshake legs can run as independent stateless requests.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// State held for one handshake in progress
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRecord {
    /// Random token echoed back via the OAuth `state` parameter
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Key-value store with per-key TTL for session records.
///
/// The OAuth handlers depend on this capability rather than a concrete
/// backend, so the store can be swapped for an external service without
/// touching the handshake logic.
pub trait SessionStore: Send + Sync {
    /// Store a record under `key`, expiring after `ttl_seconds`.
    fn put(&self, key: &str, record: SessionRecord, ttl_seconds: i64);

    /// Fetch a live record. Missing and expired keys both return None.
    fn get(&self, key: &str) -> Option<SessionRecord>;

    /// Remove a record. Removing an absent key is a no-op.
    fn delete(&self, key: &str);
}

struct Entry {
    record: SessionRecord,
    expires_at: DateTime<Utc>,
}

/// In-memory session store with TTL-based expiry
#[derive(Clone)]
pub struct MemorySessionStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Drop expired entries (called periodically by the cleanup task)
    pub fn cleanup_expired(&self) {
        let mut entries = self.entries.lock().unwrap();
        let now = Utc::now();
        entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Count of live plus not-yet-purged entries (for monitoring)
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, key: &str, record: SessionRecord, ttl_seconds: i64) {
        let entry = Entry {
            record,
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        };
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), entry);
    }

    fn get(&self, key: &str) -> Option<SessionRecord> {
        let mut entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.record.clone()),
            Some(_) => {
                // Expired but not yet purged: report absent
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn delete(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
    }
}

/// Background task to periodically clean up expired session records
pub async fn run_session_cleanup(store: MemorySessionStore, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        store.cleanup_expired();
        tracing::debug!(
            "Session cleanup complete, {} records remaining",
            store.count()
        );
    }
}
