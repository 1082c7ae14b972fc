//! In-process session store.
//!
//! Owns the read-modify-write cycle on conversation history. The orchestrator
//! only ever receives a snapshot of a session's [`History`].

use lectern_core::message::{History, SessionId};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Bounded histories keyed by session id.
pub struct SessionStore {
    max_exchanges: usize,
    sessions: RwLock<HashMap<SessionId, History>>,
}

impl SessionStore {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            max_exchanges,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_session(&self) -> SessionId {
        let id = SessionId::new();
        self.sessions
            .write()
            .await
            .insert(id.clone(), History::new(self.max_exchanges));
        debug!(session = %id, "Session created");
        id
    }

    /// Snapshot of a session's history. Unknown sessions have an empty one.
    pub async fn history(&self, id: &SessionId) -> History {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_else(|| History::new(self.max_exchanges))
    }

    /// Append a completed exchange, creating the session if needed.
    pub async fn record_exchange(&self, id: &SessionId, question: &str, answer: &str) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.clone())
            .or_insert_with(|| History::new(self.max_exchanges))
            .push_exchange(question, answer);
    }

    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
