//! Timestamped incident log, newest entry first

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Operator,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub source: LogSource,
    pub message: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let at = self.at.format("%Y-%m-%d %H:%M:%S");
        match self.source {
            LogSource::Operator => write!(f, "{} • {}", at, self.message),
            LogSource::Admin => write!(f, "{} • [admin] {}", at, self.message),
        }
    }
}

/// Bounded log; the oldest entries fall off the end
#[derive(Debug, Clone)]
pub struct IncidentLog {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

impl IncidentLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn record(&mut self, source: LogSource, message: impl Into<String>) {
        self.record_at(Local::now(), source, message);
    }

    pub fn record_at(&mut self, at: DateTime<Local>, source: LogSource, message: impl Into<String>) {
        self.entries.push_front(LogEntry {
            at,
            source,
            message: message.into(),
        });
        self.entries.truncate(self.max_entries);
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
