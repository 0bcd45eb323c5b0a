//! garble-store: durable state for the garble publishing loop.
//!
//! This crate provides:
//! - Named rate-limit buckets with sticky hard limits
//! - The rolling 24-hour publish budget
//! - The FIFO publish queue and the published-content log
//! - Atomic JSON-file persistence and the cross-process instance lock

pub mod error;
pub mod file_store;
pub mod handled;
pub mod lock;
pub mod paths;
pub mod publish_budget;
pub mod publish_queue;
pub mod published_log;
pub mod rate_limits;

// Re-export commonly used types
pub use error::{StoreError, StoreResult};
pub use file_store::{JsonFileStore, MemoryStore, StateStore};
pub use handled::{HandledSources, HandledState};
pub use lock::InstanceLock;
pub use paths::DataPaths;
pub use publish_budget::{DEFAULT_DAILY_LIMIT, PublishBudget, PublishRecord};
pub use publish_queue::{DEFAULT_MAX_ATTEMPTS, PublishQueue, QueueState, QueuedItem};
pub use published_log::{PublishedEntry, PublishedLog, PublishedLogState};
pub use rate_limits::{
    GLOBAL_BUCKET, LimitKind, PUBLISH_BUCKET, RateLimitEntry, RateLimitPolicy, RateLimitState,
    RateLimiter,
};
