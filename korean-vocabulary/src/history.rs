use std::collections::HashSet;

use chrono::{DateTime, Utc};
use dictionary::StudentLevel;

pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub word: String,
    pub level: StudentLevel,
    pub timestamp: DateTime<Utc>,
}

/// Recent successful lookups, most recent first, one entry per word.
#[derive(Debug, Default, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Rebuilds the list from stored entries, keeping the first occurrence of a word.
    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.word.clone()))
            .take(MAX_HISTORY)
            .collect();
        Self { entries }
    }

    pub fn record(&mut self, word: &str, level: StudentLevel) {
        self.record_at(word, level, Utc::now());
    }

    pub fn record_at(&mut self, word: &str, level: StudentLevel, timestamp: DateTime<Utc>) {
        self.entries.retain(|entry| entry.word != word);
        self.entries.insert(
            0,
            HistoryEntry {
                word: word.to_owned(),
                level,
                timestamp,
            },
        );
        self.entries.truncate(MAX_HISTORY);
    }

    /// Case-insensitive substring match, in history order.
    pub fn filter(&self, query: &str) -> Vec<&HistoryEntry> {
        let query = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.word.to_lowercase().contains(&query))
            .collect()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
