//! Per-chat session storage.
//!
//! A session pins the downscaled original image together with the settings
//! of the last delivered render, so every adjustment re-renders from clean
//! pixels instead of stacking filters. The store hands sessions out under a
//! per-session lock: operations for one chat serialize, operations for
//! different chats run in parallel. Recency is tracked with a logical clock
//! rather than wall time, which keeps eviction order deterministic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::settings::FilterSettings;

// ============================================================================
// ChatKey
// ============================================================================

/// Identifies the chat a session belongs to.
///
/// Wraps the transport's numeric chat id; serializes as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ChatKey(pub i64);

// ============================================================================
// Session
// ============================================================================

/// One chat's active adjustment state.
#[derive(Debug, Clone)]
pub struct Session {
    /// The ingested image after downscaling, before any filtering.
    pub original: RgbImage,

    /// Settings of the last render delivered for this session.
    pub settings: FilterSettings,
}

impl Session {
    /// Starts a session at the default settings.
    pub fn new(original: RgbImage) -> Self {
        Self {
            original,
            settings: FilterSettings::default(),
        }
    }
}

// ============================================================================
// SessionStore
// ============================================================================

/// Concurrent map from chat to session with LRU eviction.
pub struct SessionStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    entries: HashMap<ChatKey, Entry>,
    clock: u64,
}

struct Entry {
    session: Arc<Mutex<Session>>,
    last_used: u64,
}

impl SessionStore {
    /// Capacity used by [`EngineConfig::default`](crate::EngineConfig).
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a store holding at most `capacity` sessions.
    ///
    /// A capacity of 0 disables eviction entirely.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            }),
            capacity,
        }
    }

    /// Inserts or replaces the session for a chat.
    ///
    /// When the store is full and the chat is new, the least recently used
    /// session is dropped first.
    pub fn insert(&self, key: ChatKey, session: Session) {
        let mut inner = self.lock_inner();
        inner.clock += 1;
        let stamp = inner.clock;

        if self.capacity > 0
            && !inner.entries.contains_key(&key)
            && inner.entries.len() >= self.capacity
        {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| *key);
            if let Some(evicted) = oldest {
                inner.entries.remove(&evicted);
                debug!(chat = evicted.0, "evicted least recently used session");
            }
        }

        inner.entries.insert(
            key,
            Entry {
                session: Arc::new(Mutex::new(session)),
                last_used: stamp,
            },
        );
    }

    /// Runs `op` with exclusive access to the chat's session.
    ///
    /// The whole closure executes under the session lock, so a read, render
    /// and settings write made inside it are atomic with respect to other
    /// calls for the same chat. Returns `None` if the chat has no session.
    pub fn with_session<T>(&self, key: ChatKey, op: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let session = {
            let mut inner = self.lock_inner();
            inner.clock += 1;
            let stamp = inner.clock;
            let entry = inner.entries.get_mut(&key)?;
            entry.last_used = stamp;
            Arc::clone(&entry.session)
        };
        // The map lock is released; only this chat's lock is held below.
        let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        Some(op(&mut guard))
    }

    /// Returns `true` if the chat currently has a session.
    pub fn contains(&self, key: ChatKey) -> bool {
        self.lock_inner().entries.contains_key(&key)
    }

    /// Drops the chat's session. Returns `true` if one existed.
    pub fn remove(&self, key: ChatKey) -> bool {
        self.lock_inner().entries.remove(&key).is_some()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock_inner().entries.len()
    }

    /// Returns `true` if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_session() -> Session {
        Session::new(RgbImage::new(2, 2))
    }

    #[test]
    fn missing_chat_yields_none() {
        let store = SessionStore::new(8);
        assert!(!store.contains(ChatKey(1)));
        assert_eq!(store.with_session(ChatKey(1), |_| ()), None);
        assert!(!store.remove(ChatKey(1)));
    }

    #[test]
    fn mutations_inside_the_closure_persist() {
        let store = SessionStore::new(8);
        store.insert(ChatKey(7), tiny_session());

        store.with_session(ChatKey(7), |session| {
            session.settings.purple = 2.5;
        });

        let purple = store.with_session(ChatKey(7), |session| session.settings.purple);
        assert_eq!(purple, Some(2.5));
    }

    #[test]
    fn reinserting_resets_the_session() {
        let store = SessionStore::new(8);
        store.insert(ChatKey(3), tiny_session());
        store.with_session(ChatKey(3), |session| session.settings.black = 4.0);

        store.insert(ChatKey(3), tiny_session());
        let black = store.with_session(ChatKey(3), |session| session.settings.black);
        assert_eq!(black, Some(1.0), "a fresh ingest starts over at defaults");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn eviction_drops_the_least_recently_used_chat() {
        let store = SessionStore::new(2);
        store.insert(ChatKey(1), tiny_session());
        store.insert(ChatKey(2), tiny_session());

        // Touch chat 1 so chat 2 becomes the oldest
        store.with_session(ChatKey(1), |_| ());
        store.insert(ChatKey(3), tiny_session());

        assert!(store.contains(ChatKey(1)));
        assert!(!store.contains(ChatKey(2)));
        assert!(store.contains(ChatKey(3)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn replacing_a_resident_chat_never_evicts_neighbors() {
        let store = SessionStore::new(2);
        store.insert(ChatKey(1), tiny_session());
        store.insert(ChatKey(2), tiny_session());
        store.insert(ChatKey(1), tiny_session());

        assert_eq!(store.len(), 2);
        assert!(store.contains(ChatKey(2)));
    }

    #[test]
    fn zero_capacity_disables_eviction() {
        let store = SessionStore::new(0);
        for id in 0..50 {
            store.insert(ChatKey(id), tiny_session());
        }
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn parallel_chats_update_independently() {
        let store = Arc::new(SessionStore::new(16));
        for id in 0..4 {
            store.insert(ChatKey(id), tiny_session());
        }

        let handles: Vec<_> = (0..4)
            .map(|id| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.with_session(ChatKey(id), |session| {
                            session.settings.purple = (session.settings.purple + 0.5).min(4.0);
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for id in 0..4 {
            let purple = store.with_session(ChatKey(id), |session| session.settings.purple);
            assert_eq!(purple, Some(4.0));
        }
    }

    #[test]
    fn chat_key_serializes_as_a_bare_integer() {
        let json = serde_json::to_string(&ChatKey(-100123)).unwrap();
        assert_eq!(json, "-100123");
        let parsed: ChatKey = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, ChatKey(42));
    }
}
