//! Session management for code assistant conversations.
//!
//! Sessions live in process memory and are only removed on request. Each
//! session carries a [`ChatMemory`] window of the most recent messages.

mod memory;
mod message;

use std::collections::HashMap;
use std::sync::Arc;

pub use memory::{ChatMemory, DEFAULT_MAX_MESSAGES, MessageWindow};
pub use message::{Message, MessageRole};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Tracing target for session operations.
const TRACING_TARGET: &str = "codelab_rig::session";

/// Registry of active sessions.
///
/// This is a cheaply cloneable handle; clones share the same sessions.
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, ChatMemory>>>,
    max_messages: usize,
}

impl SessionManager {
    /// Creates an empty registry whose sessions keep [`DEFAULT_MAX_MESSAGES`].
    pub fn new() -> Self {
        Self::with_max_messages(DEFAULT_MAX_MESSAGES)
    }

    /// Creates an empty registry with a custom window size.
    pub fn with_max_messages(max_messages: usize) -> Self {
        Self {
            sessions: Arc::default(),
            max_messages,
        }
    }

    /// Creates a new session and returns its identifier.
    pub async fn create_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let memory = ChatMemory::with_max_messages(self.max_messages);
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), memory);

        tracing::info!(
            target: TRACING_TARGET,
            session_id = %session_id,
            "Created new session"
        );
        session_id
    }

    /// Returns the memory of a session, or `None` if it does not exist.
    pub async fn session_memory(&self, session_id: &str) -> Option<ChatMemory> {
        let memory = self.sessions.read().await.get(session_id).cloned();
        match &memory {
            Some(memory) => {
                let messages = memory.len().await;
                tracing::debug!(
                    target: TRACING_TARGET,
                    session_id = %session_id,
                    messages = %messages,
                    "Session memory retrieved"
                );
            }
            None => tracing::warn!(
                target: TRACING_TARGET,
                session_id = %session_id,
                "Session not found"
            ),
        }
        memory
    }

    /// Returns true if the session exists.
    pub async fn session_exists(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Removes a session. Returns false if it did not exist.
    pub async fn clear_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            tracing::info!(
                target: TRACING_TARGET,
                session_id = %session_id,
                "Cleared session"
            );
        } else {
            tracing::warn!(
                target: TRACING_TARGET,
                session_id = %session_id,
                "Attempted to clear non-existent session"
            );
        }
        removed
    }

    /// Removes every session and returns how many were removed.
    pub async fn clear_all_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        sessions.clear();

        tracing::info!(
            target: TRACING_TARGET,
            count = %count,
            "Cleared all sessions"
        );
        count
    }

    /// Returns the number of active sessions.
    pub async fn active_session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns the identifiers of all active sessions, sorted.
    pub async fn active_session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn lookups_can_cross_threads() {
        let manager = SessionManager::new();
        let id = manager.create_session().await;

        let lookup = manager.session_memory(&id);
        assert_send(&lookup);
        assert!(lookup.await.is_some());
    }

    #[tokio::test]
    async fn create_and_lookup() {
        let manager = SessionManager::new();
        let id = manager.create_session().await;

        assert!(Uuid::parse_str(&id).is_ok());
        assert!(manager.session_exists(&id).await);
        assert!(manager.session_memory(&id).await.is_some());
        assert!(manager.session_memory("missing").await.is_none());
        assert_eq!(manager.active_session_count().await, 1);
    }

    #[tokio::test]
    async fn memory_is_shared_with_the_registry() {
        let manager = SessionManager::new();
        let id = manager.create_session().await;

        let memory = manager.session_memory(&id).await.unwrap();
        memory.add(Message::user("fn main() {}")).await;

        let again = manager.session_memory(&id).await.unwrap();
        assert_eq!(again.len().await, 1);
    }

    #[tokio::test]
    async fn clear_single_and_all() {
        let manager = SessionManager::new();
        let a = manager.create_session().await;
        let _b = manager.create_session().await;
        let _c = manager.create_session().await;

        assert!(manager.clear_session(&a).await);
        assert!(!manager.clear_session(&a).await);
        assert_eq!(manager.active_session_ids().await.len(), 2);

        assert_eq!(manager.clear_all_sessions().await, 2);
        assert_eq!(manager.active_session_count().await, 0);
    }

    #[tokio::test]
    async fn custom_window_size_applies_to_new_sessions() {
        let manager = SessionManager::with_max_messages(2);
        let id = manager.create_session().await;
        let memory = manager.session_memory(&id).await.unwrap();

        for i in 0..5 {
            memory.add(Message::user(i.to_string())).await;
        }
        let contents: Vec<String> = memory
            .messages()
            .await
            .iter()
            .map(|m| m.content().to_string())
            .collect();
        assert_eq!(contents, ["3", "4"]);
    }
}
