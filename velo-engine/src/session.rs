//! Per-session navigation context, sharded for concurrent access.
//!
//! There is deliberately no process-global per-user state: every façade
//! call names its session, and the engine resolves it here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Bounded navigation history kept per session.
const RECENT_URL_CAP: usize = 20;

/// Per-session navigation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Most recent navigations, newest last, capped.
    pub recent_urls: Vec<String>,
    pub navigation_events: u64,
    pub prefetch_submissions: u64,
}

impl SessionContext {
    pub fn new(session_id: String) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            created_at: now,
            last_activity: now,
            recent_urls: Vec::new(),
            navigation_events: 0,
            prefetch_submissions: 0,
        }
    }

    /// Record a navigation, keeping the history bounded.
    pub fn record_navigation(&mut self, url: &str) {
        self.recent_urls.push(url.to_string());
        if self.recent_urls.len() > RECENT_URL_CAP {
            let excess = self.recent_urls.len() - RECENT_URL_CAP;
            self.recent_urls.drain(..excess);
        }
        self.navigation_events += 1;
        self.last_activity = Utc::now();
    }

    pub fn record_prefetch_submissions(&mut self, count: u64) {
        self.prefetch_submissions += count;
        self.last_activity = Utc::now();
    }
}

/// Thread-safe session registry using `DashMap` for sharded concurrent
/// access.
pub struct SessionManager {
    sessions: Arc<DashMap<String, SessionContext>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Fetch-or-create a session, returning a cloned snapshot.
    pub fn ensure(&self, session_id: &str) -> SessionContext {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionContext::new(session_id.to_string()))
            .clone()
    }

    /// Get a session context by id (cloned snapshot).
    pub fn get(&self, session_id: &str) -> Option<SessionContext> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }

    /// Record a navigation, creating the session if needed.
    pub fn record_navigation(&self, session_id: &str, url: &str) {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionContext::new(session_id.to_string()))
            .record_navigation(url);
    }

    pub fn record_prefetch_submissions(&self, session_id: &str, count: u64) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.record_prefetch_submissions(count);
        }
    }

    /// Remove a session.
    pub fn remove(&self, session_id: &str) -> Option<SessionContext> {
        self.sessions.remove(session_id).map(|(_, context)| context)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
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

    #[test]
    fn sessions_are_isolated() {
        let manager = SessionManager::new();
        manager.record_navigation("alice", "https://a.example");
        manager.record_navigation("bob", "https://b.example");

        assert_eq!(manager.get("alice").unwrap().recent_urls, vec!["https://a.example"]);
        assert_eq!(manager.get("bob").unwrap().recent_urls, vec!["https://b.example"]);
        assert_eq!(manager.session_count(), 2);
    }

    #[test]
    fn recent_urls_are_bounded() {
        let manager = SessionManager::new();
        for index in 0..50 {
            manager.record_navigation("s", &format!("https://example.com/{index}"));
        }
        let context = manager.get("s").unwrap();
        assert_eq!(context.recent_urls.len(), RECENT_URL_CAP);
        assert_eq!(context.recent_urls.last().unwrap(), "https://example.com/49");
        assert_eq!(context.navigation_events, 50);
    }

    #[test]
    fn remove_returns_the_context() {
        let manager = SessionManager::new();
        manager.ensure("gone");
        assert!(manager.remove("gone").is_some());
        assert!(manager.get("gone").is_none());
        assert_eq!(manager.session_count(), 0);
    }
}
