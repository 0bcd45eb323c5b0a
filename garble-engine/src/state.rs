use chrono::Duration;
use garble_core::PublishSettings;
use garble_store::{
    DataPaths, HandledSources, MemoryStore, PublishBudget, PublishQueue, PublishedLog,
    RateLimitPolicy, RateLimiter,
};

/// The durable structures the coordinator reads and writes every tick.
pub struct DurableState {
    pub rate_limits: RateLimiter,
    pub budget: PublishBudget,
    pub queue: PublishQueue,
    pub published: PublishedLog,
    pub handled: HandledSources,
}

fn policy(settings: &PublishSettings) -> RateLimitPolicy {
    RateLimitPolicy {
        hard_floor: Duration::minutes(settings.hard_floor_minutes),
        reset_buffer: Duration::seconds(settings.reset_buffer_seconds),
    }
}

impl DurableState {
    /// Open every structure from its JSON file under `paths`.
    pub fn open(paths: &DataPaths, settings: &PublishSettings) -> Self {
        Self {
            rate_limits: RateLimiter::open(
                paths.json_store(paths.rate_limits()),
                policy(settings),
            ),
            budget: PublishBudget::open(
                paths.json_store(paths.publish_record()),
                settings.daily_limit,
            ),
            queue: PublishQueue::open(paths.json_store(paths.publish_queue())),
            published: PublishedLog::open(
                paths.json_store(paths.published_log()),
                settings.history_size,
            ),
            handled: HandledSources::open(paths.json_store(paths.handled_sources())),
        }
    }

    /// Process-local state, for tests and dry runs.
    pub fn in_memory(settings: &PublishSettings) -> Self {
        Self {
            rate_limits: RateLimiter::open(Box::new(MemoryStore::new()), policy(settings)),
            budget: PublishBudget::open(Box::new(MemoryStore::new()), settings.daily_limit),
            queue: PublishQueue::open(Box::new(MemoryStore::new())),
            published: PublishedLog::open(Box::new(MemoryStore::new()), settings.history_size),
            handled: HandledSources::open(Box::new(MemoryStore::new())),
        }
    }

    /// Re-read everything from the stores.
    pub fn reload(&mut self) {
        self.rate_limits.reload();
        self.budget.reload();
        self.queue.reload();
        self.published.reload();
        self.handled.reload();
    }
}
