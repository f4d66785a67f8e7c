use crate::utils::get_timestamp;
use shared::LogEntry;
use std::collections::VecDeque;

/// Bounded, append-only log of what happened in a room.
///
/// Once `capacity` entries are stored, each push evicts the oldest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHistory {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(128)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(get_timestamp(), message);
    }

    pub fn push_at(&mut self, timestamp: u64, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp,
            message: message.into(),
        });
    }

    pub fn last_message(&self) -> Option<&str> {
        self.entries.back().map(|entry| entry.message.as_str())
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
