//! Per-chat session pages
//!
//! Consecutive items from one chat land on the same page while they arrive
//! within the session window of each other.

use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
struct Session {
    page_id: String,
    last_seen: Instant,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    window: Duration,
    sessions: DashMap<i64, Session>,
}

impl SessionRegistry {
    /// A zero window disables reuse: every item gets its own page.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            sessions: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.window.is_zero()
    }

    /// Page to append to, if the chat was active within the window
    pub fn active_page(&self, chat_id: i64, now: Instant) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let expired = match self.sessions.get(&chat_id) {
            Some(session) if now.saturating_duration_since(session.last_seen) <= self.window => {
                return Some(session.page_id.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove(&chat_id);
        }
        None
    }

    /// Remember `page_id` as the chat's page and restart its window
    pub fn record(&self, chat_id: i64, page_id: &str, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        // Chats that went quiet are dropped here, not only on their next message.
        let window = self.window;
        self.sessions
            .retain(|_, session| now.saturating_duration_since(session.last_seen) <= window);
        self.sessions.insert(
            chat_id,
            Session {
                page_id: page_id.to_string(),
                last_seen: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
