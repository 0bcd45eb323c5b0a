//! Bounded log of texts that made it out, for duplicate detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::file_store::{StateStore, load_or_default, reload_into, save_logged};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEntry {
    pub text: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_id: Option<String>,
}

/// Serialized log, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishedLogState {
    #[serde(default)]
    pub entries: Vec<PublishedEntry>,
}

pub struct PublishedLog {
    store: Box<dyn StateStore<PublishedLogState>>,
    state: PublishedLogState,
    capacity: usize,
}

impl PublishedLog {
    pub fn open(store: Box<dyn StateStore<PublishedLogState>>, capacity: usize) -> Self {
        let state = load_or_default(store.as_ref(), "published log");
        Self {
            store,
            state,
            capacity: capacity.max(1),
        }
    }

    pub fn reload(&mut self) {
        reload_into(self.store.as_ref(), &mut self.state, "published log");
    }

    pub fn record(&mut self, text: &str, published_id: Option<&str>) {
        self.record_at(text, published_id, Utc::now());
    }

    pub fn record_at(&mut self, text: &str, published_id: Option<&str>, now: DateTime<Utc>) {
        self.state.entries.push(PublishedEntry {
            text: text.to_string(),
            published_at: now,
            published_id: published_id.map(str::to_string),
        });
        let overflow = self.state.entries.len().saturating_sub(self.capacity);
        if overflow > 0 {
            self.state.entries.drain(..overflow);
        }
        save_logged(self.store.as_ref(), &self.state, "published log");
    }

    /// Verbatim comparison against every remembered text.
    pub fn contains(&self, text: &str) -> bool {
        self.state.entries.iter().any(|entry| entry.text == text)
    }

    /// Remembered texts, newest first.
    pub fn recent_texts(&self) -> Vec<String> {
        self.state
            .entries
            .iter()
            .rev()
            .map(|entry| entry.text.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_store::MemoryStore;

    #[test]
    fn log_is_bounded_and_newest_first() {
        let mut log = PublishedLog::open(Box::new(MemoryStore::new()), 2);
        log.record("one", Some("1"));
        log.record("two", None);
        log.record("three", Some("3"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.recent_texts(), ["three", "two"]);
        assert!(!log.contains("one"));
        assert!(log.contains("two"));
    }

    #[test]
    fn contains_is_exact() {
        let mut log = PublishedLog::open(Box::new(MemoryStore::new()), 10);
        log.record("Cats are liquid", None);
        assert!(!log.contains("cats are liquid"));
        assert!(!log.contains("Cats are liquid "));
    }
}
