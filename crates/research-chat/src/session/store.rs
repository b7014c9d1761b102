//! In-memory session table with idle expiry

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::Error;
use crate::types::{Exchange, Transcript};

/// Opaque per-browser session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| Error::Session(format!("Invalid session id '{}': {}", s, e)))
    }
}

/// Session chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSession {
    pub id: SessionId,
    /// True when a new transcript was started for this id
    pub created: bool,
}

struct SessionEntry {
    transcript: Transcript,
    last_seen: DateTime<Utc>,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            last_seen: Utc::now(),
        }
    }
}

/// Session id -> transcript, shared by all request handlers
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionEntry>,
    /// Idle time after which a session is dropped
    ttl: chrono::Duration,
    /// Clear a transcript once its JSON encoding passes this many bytes
    size_limit: Option<usize>,
}

impl SessionStore {
    pub fn new(ttl: Duration, size_limit: Option<usize>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::days(365 * 100)),
            size_limit,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.size_limit())
    }

    /// Find or start the session for a client token
    ///
    /// A missing or malformed token gets a fresh id. A well-formed id the
    /// store does not know (expired, or issued before a restart) is
    /// registered again under the same id with an empty transcript.
    pub fn resolve(&self, token: Option<&str>) -> ResolvedSession {
        let parsed = token.and_then(|t| match t.parse::<SessionId>() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        });

        let id = parsed.unwrap_or_default();
        let created = match self.sessions.entry(id) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.last_seen = Utc::now();
                self.enforce_size_limit(id, &mut entry.transcript);
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(SessionEntry::new());
                true
            }
        };

        if created {
            tracing::debug!("Started session {}", id);
        }
        ResolvedSession { id, created }
    }

    fn enforce_size_limit(&self, id: SessionId, transcript: &mut Transcript) {
        if let Some(limit) = self.size_limit {
            let size = transcript.serialized_size();
            if size > limit {
                tracing::info!(
                    "Chat history for session {} is {} bytes (limit {}). Clearing memory.",
                    id,
                    size,
                    limit
                );
                transcript.clear();
            }
        }
    }

    /// Snapshot of a session's transcript (empty if unknown)
    pub fn transcript(&self, id: SessionId) -> Transcript {
        self.sessions
            .get(&id)
            .map(|entry| entry.transcript.clone())
            .unwrap_or_default()
    }

    /// Append under the entry lock, returning the new transcript length
    ///
    /// A session evicted while its question was in flight is re-registered
    /// so the answer is not lost.
    pub fn append(&self, id: SessionId, exchange: Exchange) -> usize {
        let mut entry = self.sessions.entry(id).or_insert_with(SessionEntry::new);
        entry.transcript.push(exchange);
        entry.last_seen = Utc::now();
        entry.transcript.len()
    }

    /// Drop sessions idle for at least the TTL
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| now.signed_duration_since(entry.last_seen) < self.ttl);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!("Evicted {} idle session(s)", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Run `evict_expired` every `interval` until the runtime shuts down
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.evict_expired();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(3600), None)
    }

    #[test]
    fn test_no_token_creates_session() {
        let store = store();
        let resolved = store.resolve(None);
        assert!(resolved.created);
        assert_eq!(store.len(), 1);
        assert!(store.transcript(resolved.id).is_empty());
    }

    #[test]
    fn test_known_token_reuses_session() {
        let store = store();
        let first = store.resolve(None);
        store.append(first.id, Exchange::new("q", "a"));

        let token = first.id.to_string();
        let second = store.resolve(Some(&token));
        assert_eq!(second.id, first.id);
        assert!(!second.created);
        assert_eq!(store.transcript(first.id).len(), 1);
    }

    #[test]
    fn test_unknown_token_reregistered_with_same_id() {
        let store = store();
        let id = SessionId::new();
        let resolved = store.resolve(Some(&id.to_string()));
        assert_eq!(resolved.id, id);
        assert!(resolved.created);
    }

    #[test]
    fn test_garbage_token_gets_fresh_id() {
        let store = store();
        let resolved = store.resolve(Some("not-a-uuid"));
        assert!(resolved.created);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_keeps_order() {
        let store = store();
        let id = store.resolve(None).id;
        assert_eq!(store.append(id, Exchange::new("first", "1")), 1);
        assert_eq!(store.append(id, Exchange::new("second", "2")), 2);

        let transcript = store.transcript(id);
        assert_eq!(transcript.exchanges()[0].question, "first");
        assert_eq!(transcript.exchanges()[1].question, "second");
    }

    #[test]
    fn test_size_limit_clears_but_keeps_id() {
        let store = SessionStore::new(Duration::from_secs(3600), Some(200));
        let id = store.resolve(None).id;
        store.append(id, Exchange::new("long question", "x".repeat(500)));

        let resolved = store.resolve(Some(&id.to_string()));
        assert_eq!(resolved.id, id);
        assert!(!resolved.created);
        assert!(store.transcript(id).is_empty());
    }

    #[test]
    fn test_size_limit_disabled_keeps_history() {
        let store = store();
        let id = store.resolve(None).id;
        store.append(id, Exchange::new("q", "x".repeat(10_000)));
        store.resolve(Some(&id.to_string()));
        assert_eq!(store.transcript(id).len(), 1);
    }

    #[test]
    fn test_evict_expired() {
        let store = SessionStore::new(Duration::ZERO, None);
        store.resolve(None);
        store.resolve(None);
        assert_eq!(store.evict_expired(), 2);
        assert!(store.is_empty());

        let fresh = SessionStore::new(Duration::from_secs(3600), None);
        fresh.resolve(None);
        assert_eq!(fresh.evict_expired(), 0);
        assert_eq!(fresh.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_all_recorded() {
        let store = Arc::new(store());
        let id = store.resolve(None).id;

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.append(id, Exchange::new(format!("q{}", i), "a"));
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.transcript(id).len(), 16);
    }

    #[tokio::test]
    async fn test_sweeper_evicts_in_background() {
        let store = Arc::new(SessionStore::new(Duration::ZERO, None));
        store.resolve(None);

        let handle = store.spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.is_empty());
        handle.abort();
    }

    #[test]
    fn test_session_id_round_trips_through_string() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("nope".parse::<SessionId>().is_err());
    }
}
