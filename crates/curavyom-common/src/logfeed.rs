//! System log feed for the demo view.
//!
//! Backend log lines may start with a level token (`INFO`, `WARN`, `ERROR`,
//! `DEBUG`). The token is split off, the line is stamped with local time, and
//! the feed keeps the newest [`MAX_ENTRIES`] lines, newest first.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::OnceLock;

pub const MAX_ENTRIES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

fn level_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(INFO|WARN|ERROR|DEBUG)").expect("static regex"))
}

impl LogEntry {
    /// Split a raw backend line into level and message.
    pub fn parse(line: &str, timestamp: impl Into<String>) -> Self {
        let (level, rest) = match level_prefix().find(line) {
            Some(m) => {
                let level = match m.as_str() {
                    "WARN" => LogLevel::Warn,
                    "ERROR" => LogLevel::Error,
                    "DEBUG" => LogLevel::Debug,
                    _ => LogLevel::Info,
                };
                (level, &line[m.end()..])
            }
            None => (LogLevel::Info, line),
        };
        Self { timestamp: timestamp.into(), level, message: rest.trim().to_string() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogFeed {
    entries: VecDeque<LogEntry>,
}

impl LogFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw line stamped with the current local time (`HH:MM:SS`).
    pub fn push_line(&mut self, line: &str) -> &LogEntry {
        let now = chrono::Local::now().format("%H:%M:%S").to_string();
        self.push(LogEntry::parse(line, now))
    }

    pub fn push(&mut self, entry: LogEntry) -> &LogEntry {
        self.entries.push_front(entry);
        self.entries.truncate(MAX_ENTRIES);
        &self.entries[0]
    }

    /// Newest first.
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
