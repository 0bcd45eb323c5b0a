//! Named rate-limit buckets with sticky hard limits.
//!
//! A bucket is either *hard* limited (the remote service said no) or on a
//! self-imposed *cooldown* used to pace calls. Neither kind of update ever
//! shortens a standing limit. Every hard rejection additionally records a
//! floor timestamp that keeps the bucket limited for `hard_floor`, whatever
//! happens to the bucket entry afterwards (including `clear`).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::file_store::{StateStore, load_or_default, reload_into, save_logged};

/// Bucket consulted when a specific bucket has no entry of its own.
pub const GLOBAL_BUCKET: &str = "global";
/// Bucket guarding the publishing service.
pub const PUBLISH_BUCKET: &str = "publish";

/// Who imposed a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    /// Enforced by the remote service.
    Hard,
    /// Self-imposed pacing.
    Cooldown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitEntry {
    pub until: DateTime<Utc>,
    pub kind: LimitKind,
    pub reason: String,
}

/// Serialized form of all buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateLimitState {
    #[serde(default)]
    pub buckets: BTreeMap<String, RateLimitEntry>,
    #[serde(default)]
    pub last_hard_rejection: BTreeMap<String, DateTime<Utc>>,
}

/// Durations governing hard limits.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Minimum time a bucket stays limited after a hard rejection.
    pub hard_floor: Duration,
    /// Added to a server-supplied reset time.
    pub reset_buffer: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            hard_floor: Duration::minutes(90),
            reset_buffer: Duration::seconds(120),
        }
    }
}

pub struct RateLimiter {
    store: Box<dyn StateStore<RateLimitState>>,
    state: RateLimitState,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    /// Open the limiter, reading whatever state the store holds.
    pub fn open(store: Box<dyn StateStore<RateLimitState>>, policy: RateLimitPolicy) -> Self {
        let state = load_or_default(store.as_ref(), "rate limits");
        Self {
            store,
            state,
            policy,
        }
    }

    /// Re-read durable state (another process may have written it).
    pub fn reload(&mut self) {
        reload_into(self.store.as_ref(), &mut self.state, "rate limits");
    }

    pub fn is_limited(&mut self, bucket: &str) -> bool {
        self.is_limited_at(bucket, Utc::now())
    }

    pub fn is_limited_at(&mut self, bucket: &str, now: DateTime<Utc>) -> bool {
        if self.floor_remaining(bucket, now).is_some() {
            return true;
        }

        let key = self.effective_key(bucket);
        let Some(key) = key else {
            return false;
        };
        let Some(entry) = self.state.buckets.get(&key) else {
            return false;
        };
        if now < entry.until {
            return true;
        }

        info!("rate limit on '{key}' expired ({})", entry.reason);
        self.state.buckets.remove(&key);
        self.persist();
        false
    }

    pub fn set_hard_limit(&mut self, bucket: &str, server_reset_epoch_seconds: Option<i64>) {
        self.set_hard_limit_at(bucket, server_reset_epoch_seconds, Utc::now());
    }

    pub fn set_hard_limit_at(
        &mut self,
        bucket: &str,
        server_reset_epoch_seconds: Option<i64>,
        now: DateTime<Utc>,
    ) {
        let server_reset = server_reset_epoch_seconds
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        let (computed, reason) = match server_reset {
            Some(reset) => (
                reset + self.policy.reset_buffer,
                format!("hard limit, server reset at {}", reset.to_rfc3339()),
            ),
            None => (
                now + self.policy.hard_floor,
                "hard limit, no server reset time".to_string(),
            ),
        };

        let until = match self.state.buckets.get(bucket) {
            Some(existing) if existing.until > computed => existing.until,
            _ => computed,
        };

        warn!(
            "'{bucket}' hard limited until {} ({reason})",
            until.to_rfc3339()
        );
        self.state.buckets.insert(
            bucket.to_string(),
            RateLimitEntry {
                until,
                kind: LimitKind::Hard,
                reason,
            },
        );
        self.state
            .last_hard_rejection
            .insert(bucket.to_string(), now);
        self.persist();
    }

    pub fn set_cooldown(&mut self, bucket: &str, seconds: i64, reason: &str) {
        self.set_cooldown_at(bucket, seconds, reason, Utc::now());
    }

    pub fn set_cooldown_at(&mut self, bucket: &str, seconds: i64, reason: &str, now: DateTime<Utc>) {
        let until = now + Duration::seconds(seconds.max(0));
        if let Some(existing) = self.state.buckets.get(bucket)
            && existing.until >= until
        {
            return;
        }

        self.state.buckets.insert(
            bucket.to_string(),
            RateLimitEntry {
                until,
                kind: LimitKind::Cooldown,
                reason: reason.to_string(),
            },
        );
        self.persist();
    }

    pub fn seconds_until_reset(&self, bucket: &str) -> i64 {
        self.seconds_until_reset_at(bucket, Utc::now())
    }

    /// Seconds until `bucket` stops being limited, counting both the entry and the floor.
    pub fn seconds_until_reset_at(&self, bucket: &str, now: DateTime<Utc>) -> i64 {
        let floor = self.floor_remaining(bucket, now).unwrap_or_else(Duration::zero);
        let entry = self
            .effective_key(bucket)
            .and_then(|key| self.state.buckets.get(&key))
            .map(|entry| entry.until - now)
            .unwrap_or_else(Duration::zero);
        let remaining = floor.max(entry);
        if remaining <= Duration::zero() {
            return 0;
        }
        let millis = remaining.num_milliseconds();
        (millis + 999) / 1000
    }

    /// Drop one bucket's entry, or every entry. Hard-rejection floors survive.
    pub fn clear(&mut self, bucket: Option<&str>) {
        match bucket {
            Some(bucket) => {
                self.state.buckets.remove(bucket);
            }
            None => self.state.buckets.clear(),
        }
        self.persist();
    }

    pub fn entry(&self, bucket: &str) -> Option<&RateLimitEntry> {
        self.state.buckets.get(bucket)
    }

    pub fn state(&self) -> &RateLimitState {
        &self.state
    }

    fn effective_key(&self, bucket: &str) -> Option<String> {
        if self.state.buckets.contains_key(bucket) {
            Some(bucket.to_string())
        } else if self.state.buckets.contains_key(GLOBAL_BUCKET) {
            Some(GLOBAL_BUCKET.to_string())
        } else {
            None
        }
    }

    fn floor_remaining(&self, bucket: &str, now: DateTime<Utc>) -> Option<Duration> {
        let rejected_at = self.state.last_hard_rejection.get(bucket)?;
        let remaining = *rejected_at + self.policy.hard_floor - now;
        (remaining > Duration::zero()).then_some(remaining)
    }

    fn persist(&self) {
        save_logged(self.store.as_ref(), &self.state, "rate limits");
    }
}
