//! FIFO of garbled texts waiting for a publish slot.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::file_store::{StateStore, load_or_default, reload_into, save_logged};

/// Failed publish attempts after which the head item is evicted.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedItem {
    pub source_id: String,
    pub final_text: String,
    pub queued_at: DateTime<Utc>,
    #[serde(default)]
    pub attempt_count: u32,
}

/// Serialized queue, head first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    #[serde(default)]
    pub items: VecDeque<QueuedItem>,
}

pub struct PublishQueue {
    store: Box<dyn StateStore<QueueState>>,
    state: QueueState,
}

impl PublishQueue {
    pub fn open(store: Box<dyn StateStore<QueueState>>) -> Self {
        let state = load_or_default(store.as_ref(), "publish queue");
        Self { store, state }
    }

    pub fn reload(&mut self) {
        reload_into(self.store.as_ref(), &mut self.state, "publish queue");
    }

    /// Append an item. Returns `false` (and changes nothing) when `source_id` is already queued.
    pub fn enqueue(&mut self, source_id: &str, final_text: &str) -> bool {
        self.enqueue_at(source_id, final_text, Utc::now())
    }

    pub fn enqueue_at(&mut self, source_id: &str, final_text: &str, now: DateTime<Utc>) -> bool {
        if self.contains(source_id) {
            debug!("'{source_id}' already queued, skipping enqueue");
            return false;
        }
        self.state.items.push_back(QueuedItem {
            source_id: source_id.to_string(),
            final_text: final_text.to_string(),
            queued_at: now,
            attempt_count: 0,
        });
        self.persist();
        true
    }

    pub fn peek(&self) -> Option<&QueuedItem> {
        self.state.items.front()
    }

    pub fn dequeue(&mut self) -> Option<QueuedItem> {
        let item = self.state.items.pop_front();
        if item.is_some() {
            self.persist();
        }
        item
    }

    /// Bump the head item's attempt counter, returning the new count.
    pub fn increment_attempt(&mut self) -> Option<u32> {
        let head = self.state.items.front_mut()?;
        head.attempt_count += 1;
        let count = head.attempt_count;
        self.persist();
        Some(count)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.state
            .items
            .iter()
            .any(|item| item.source_id == source_id)
    }

    pub fn len(&self) -> usize {
        self.state.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &QueuedItem> {
        self.state.items.iter()
    }

    fn persist(&self) {
        save_logged(self.store.as_ref(), &self.state, "publish queue");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_store::MemoryStore;

    fn queue() -> PublishQueue {
        PublishQueue::open(Box::new(MemoryStore::new()))
    }

    #[test]
    fn enqueue_is_deduplicated_by_source_id() {
        let mut q = queue();
        assert!(q.enqueue("A", "first"));
        assert!(!q.enqueue("A", "second"));
        assert_eq!(q.len(), 1);
        assert_eq!(q.peek().unwrap().final_text, "first");
    }

    #[test]
    fn dequeue_is_fifo() {
        let mut q = queue();
        q.enqueue("A", "a");
        q.enqueue("B", "b");
        q.enqueue("C", "c");

        let order: Vec<String> = std::iter::from_fn(|| q.dequeue())
            .map(|item| item.source_id)
            .collect();
        assert_eq!(order, ["A", "B", "C"]);
        assert!(q.is_empty());
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn increment_attempt_touches_only_head() {
        let mut q = queue();
        assert_eq!(q.increment_attempt(), None);

        q.enqueue("A", "a");
        q.enqueue("B", "b");
        assert_eq!(q.increment_attempt(), Some(1));
        assert_eq!(q.increment_attempt(), Some(2));

        let counts: Vec<u32> = q.items().map(|item| item.attempt_count).collect();
        assert_eq!(counts, [2, 0]);
    }

    #[test]
    fn requeue_after_dequeue_is_allowed() {
        let mut q = queue();
        q.enqueue("A", "a");
        q.dequeue();
        assert!(q.enqueue("A", "a again"));
    }

    #[test]
    fn queue_survives_reopen() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut q = PublishQueue::open(Box::new(store.clone()));
        q.enqueue("A", "a");
        q.increment_attempt();

        let reopened = PublishQueue::open(Box::new(store));
        let head = reopened.peek().unwrap();
        assert_eq!(head.source_id, "A");
        assert_eq!(head.attempt_count, 1);
    }
}
