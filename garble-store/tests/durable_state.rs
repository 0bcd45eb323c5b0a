//! Restart behaviour of the durable structures backed by real JSON files.

use chrono::{Duration, Utc};
use garble_store::{
    DataPaths, HandledSources, LimitKind, PUBLISH_BUCKET, PublishBudget, PublishQueue,
    PublishedLog, RateLimitPolicy, RateLimiter,
};

#[test]
fn rate_limits_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let now = Utc::now();

    {
        let mut limiter = RateLimiter::open(
            paths.json_store(paths.rate_limits()),
            RateLimitPolicy::default(),
        );
        limiter.set_hard_limit_at(PUBLISH_BUCKET, None, now);
        limiter.clear(Some(PUBLISH_BUCKET));
    }

    let mut limiter = RateLimiter::open(
        paths.json_store(paths.rate_limits()),
        RateLimitPolicy::default(),
    );
    assert!(limiter.entry(PUBLISH_BUCKET).is_none());
    // The floor was persisted separately from the cleared entry.
    assert!(limiter.is_limited_at(PUBLISH_BUCKET, now + Duration::minutes(60)));
    assert!(!limiter.is_limited_at(PUBLISH_BUCKET, now + Duration::minutes(91)));
}

#[test]
fn cooldown_entry_is_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let mut limiter = RateLimiter::open(
        paths.json_store(paths.rate_limits()),
        RateLimitPolicy::default(),
    );
    limiter.set_cooldown(PUBLISH_BUCKET, 17 * 60, "post-publish pacing");

    let raw = std::fs::read_to_string(paths.rate_limits()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["buckets"]["publish"]["kind"], "cooldown");
    assert_eq!(value["buckets"]["publish"]["reason"], "post-publish pacing");
    assert_eq!(
        limiter.entry(PUBLISH_BUCKET).map(|e| e.kind),
        Some(LimitKind::Cooldown)
    );
}

#[test]
fn queue_budget_and_logs_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());

    {
        let mut queue = PublishQueue::open(paths.json_store(paths.publish_queue()));
        queue.enqueue("A", "first");
        queue.enqueue("B", "second");
        queue.increment_attempt();

        let mut budget = PublishBudget::open(paths.json_store(paths.publish_record()), 17);
        budget.record_publish();

        let mut log = PublishedLog::open(paths.json_store(paths.published_log()), 50);
        log.record("already out", Some("post-1"));

        let mut handled = HandledSources::open(paths.json_store(paths.handled_sources()));
        handled.mark("Z");
    }

    let queue = PublishQueue::open(paths.json_store(paths.publish_queue()));
    let ids: Vec<&str> = queue.items().map(|i| i.source_id.as_str()).collect();
    assert_eq!(ids, ["A", "B"]);
    assert_eq!(queue.peek().unwrap().attempt_count, 1);

    let mut budget = PublishBudget::open(paths.json_store(paths.publish_record()), 17);
    assert_eq!(budget.remaining_slots(), 16);
    assert!(budget.last_publish_at().is_some());

    let log = PublishedLog::open(paths.json_store(paths.published_log()), 50);
    assert!(log.contains("already out"));

    let handled = HandledSources::open(paths.json_store(paths.handled_sources()));
    assert!(handled.contains("Z"));
}

#[test]
fn unwritable_directory_degrades_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the data directory should be makes every save fail.
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();
    let paths = DataPaths::new(&blocker);

    let mut queue = PublishQueue::open(paths.json_store(paths.publish_queue()));
    assert!(queue.enqueue("A", "text"));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.dequeue().unwrap().source_id, "A");
}

#[test]
fn unreadable_file_on_reload_keeps_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let mut queue = PublishQueue::open(paths.json_store(paths.publish_queue()));
    queue.enqueue("A", "first text");

    std::fs::write(paths.publish_queue(), "{truncated").unwrap();
    queue.reload();
    assert!(queue.contains("A"));

    // The next save writes the kept items back over the broken file.
    queue.enqueue("B", "second text");
    let reopened = PublishQueue::open(paths.json_store(paths.publish_queue()));
    assert_eq!(reopened.len(), 2);
    assert!(reopened.contains("A"));
}
