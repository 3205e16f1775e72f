//! Transient notifications with a fixed expiry

use serde::Serialize;
use std::time::{Duration, Instant};

/// How long a notification stays up unless dismissed
pub const NOTICE_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Warning,
    Danger,
}

impl NoticeLevel {
    pub fn heading(&self) -> &'static str {
        match self {
            NoticeLevel::Warning => "WARNING",
            NoticeLevel::Danger => "CRITICAL EVENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub raised_at: Instant,
}

#[derive(Debug, Clone)]
pub struct Notices {
    items: Vec<Notice>,
    ttl: Duration,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(NOTICE_TTL)
    }
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: Vec::new(),
            ttl,
        }
    }

    pub fn raise(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        self.items.push(Notice {
            level,
            message: message.into(),
            raised_at: now,
        });
    }

    /// Drop every notice older than the ttl; returns how many went away
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.items.len();
        let ttl = self.ttl;
        self.items
            .retain(|n| now.saturating_duration_since(n.raised_at) < ttl);
        before - self.items.len()
    }

    /// Dismiss by display position
    pub fn dismiss(&mut self, index: usize) -> Option<Notice> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
