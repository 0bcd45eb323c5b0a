//! Rolling 24-hour publish counter.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::file_store::{StateStore, load_or_default, reload_into, save_logged};

/// Publishes allowed per rolling window unless configured otherwise.
pub const DEFAULT_DAILY_LIMIT: usize = 17;

/// Serialized publish timestamps, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishRecord {
    #[serde(default)]
    pub published_at: Vec<DateTime<Utc>>,
}

impl PublishRecord {
    fn prune(&mut self, now: DateTime<Utc>) -> bool {
        let cutoff = now - window();
        let before = self.published_at.len();
        self.published_at.retain(|ts| *ts > cutoff);
        self.published_at.sort();
        self.published_at.len() != before
    }
}

fn window() -> Duration {
    Duration::hours(24)
}

pub struct PublishBudget {
    store: Box<dyn StateStore<PublishRecord>>,
    record: PublishRecord,
    daily_limit: usize,
}

impl PublishBudget {
    pub fn open(store: Box<dyn StateStore<PublishRecord>>, daily_limit: usize) -> Self {
        let mut budget = Self {
            record: load_or_default(store.as_ref(), "publish record"),
            store,
            daily_limit,
        };
        if budget.record.prune(Utc::now()) {
            budget.persist();
        }
        budget
    }

    pub fn reload(&mut self) {
        reload_into(self.store.as_ref(), &mut self.record, "publish record");
    }

    pub fn can_publish(&mut self) -> bool {
        self.can_publish_at(Utc::now())
    }

    pub fn can_publish_at(&mut self, now: DateTime<Utc>) -> bool {
        self.count_at(now) < self.daily_limit
    }

    pub fn record_publish(&mut self) {
        self.record_publish_at(Utc::now());
    }

    pub fn record_publish_at(&mut self, now: DateTime<Utc>) {
        self.record.prune(now);
        self.record.published_at.push(now);
        self.persist();
    }

    /// Publishes inside the window ending at `now`.
    pub fn count_at(&mut self, now: DateTime<Utc>) -> usize {
        if self.record.prune(now) {
            self.persist();
        }
        self.record.published_at.len()
    }

    pub fn remaining_slots(&mut self) -> usize {
        self.remaining_slots_at(Utc::now())
    }

    pub fn remaining_slots_at(&mut self, now: DateTime<Utc>) -> usize {
        self.daily_limit.saturating_sub(self.count_at(now))
    }

    pub fn seconds_until_next_slot(&mut self) -> i64 {
        self.seconds_until_next_slot_at(Utc::now())
    }

    /// Zero when a slot is free, otherwise the time until the oldest publish leaves the window.
    pub fn seconds_until_next_slot_at(&mut self, now: DateTime<Utc>) -> i64 {
        if self.count_at(now) < self.daily_limit {
            return 0;
        }
        // With the window full, the slot frees when enough old publishes expire.
        let overflow = self.record.published_at.len() - self.daily_limit;
        let Some(oldest) = self.record.published_at.get(overflow) else {
            return 0;
        };
        (*oldest + window() - now).num_seconds().max(0)
    }

    pub fn last_publish_at(&self) -> Option<DateTime<Utc>> {
        self.record.published_at.last().copied()
    }

    pub fn daily_limit(&self) -> usize {
        self.daily_limit
    }

    fn persist(&self) {
        save_logged(self.store.as_ref(), &self.record, "publish record");
    }
}
