//! Session state and its stores

use super::{ChangeSignal, SessionKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// Per-key randomization state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Signal calls since the last randomization
    pub stride_count: u32,
    /// Names picked by the most recent randomization
    pub selection: BTreeSet<String>,
    /// Signal returned for `selection`; `None` until the first randomization
    pub signal: Option<ChangeSignal>,
    /// Randomizations performed for this key
    pub randomizations: u64,
    pub randomized_at: Option<DateTime<Utc>>,
}

/// Keyed storage for randomization sessions.
///
/// Entries are created lazily and never evicted.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &SessionKey) -> Option<SessionState>;

    fn put(&self, key: SessionKey, state: SessionState);

    /// Run `f` on the state for `key`, starting from the default state when
    /// the key is new, and store the result.
    ///
    /// The default is a plain get/put pair. Stores shared between threads
    /// override it so the whole read-modify-write happens under one lock.
    fn update(&self, key: &SessionKey, f: &mut dyn FnMut(&mut SessionState)) {
        let mut state = self.get(key).unwrap_or_default();
        f(&mut state);
        self.put(key.clone(), state);
    }

    /// All keys seen so far
    fn keys(&self) -> Vec<SessionKey>;
}

/// Mutex-guarded in-process session map
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionKey, SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &SessionKey) -> Option<SessionState> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(key).cloned()
    }

    fn put(&self, key: SessionKey, state: SessionState) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(key, state);
    }

    fn update(&self, key: &SessionKey, f: &mut dyn FnMut(&mut SessionState)) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        f(sessions.entry(key.clone()).or_default());
    }

    fn keys(&self) -> Vec<SessionKey> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<SessionKey> = sessions.keys().cloned().collect();
        keys.sort();
        keys
    }
}
