//! One scheduling tick: drain the publish queue, then process new source items.
//!
//! Publishing is gated three ways, checked in this order: the `publish` rate
//! limit bucket, the rolling daily budget, and the minimum spacing since the
//! last publish. A hard rejection from the platform stops the tick's
//! publishing and leaves a sticky limit behind for the next ones.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use garble_core::{PublishSettings, SourceItem};
use garble_store::PUBLISH_BUCKET;
use tracing::{debug, info, warn};

use crate::providers::{PublishError, PublishedId, Publisher, SourceFeed};
use crate::retry::RetryOrchestrator;
use crate::state::DurableState;

/// What a tick did, for the scheduler's logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub did_publish: bool,
    /// A rate-limit cooldown or the inter-publish spacing held publishing back.
    pub was_blocked_by_cooldown: bool,
    /// The daily budget is spent, or the platform hard-rejected a publish.
    pub was_blocked_by_budget: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Cooldown,
    Budget,
}

impl TickOutcome {
    fn blocked(&mut self, block: Block) {
        match block {
            Block::Cooldown => self.was_blocked_by_cooldown = true,
            Block::Budget => self.was_blocked_by_budget = true,
        }
    }
}

pub struct Coordinator {
    orchestrator: RetryOrchestrator,
    publisher: Arc<dyn Publisher>,
    feed: Arc<dyn SourceFeed>,
    state: DurableState,
    settings: PublishSettings,
}

impl Coordinator {
    pub fn new(
        orchestrator: RetryOrchestrator,
        publisher: Arc<dyn Publisher>,
        feed: Arc<dyn SourceFeed>,
        state: DurableState,
        settings: PublishSettings,
    ) -> Self {
        Self {
            orchestrator,
            publisher,
            feed,
            state,
            settings,
        }
    }

    pub fn state(&self) -> &DurableState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DurableState {
        &mut self.state
    }

    /// Re-read durable state written by an earlier tick or another process.
    pub fn reload_state(&mut self) {
        self.state.reload();
    }

    pub async fn run_one_tick(&mut self) -> TickOutcome {
        self.run_one_tick_at(Utc::now()).await
    }

    /// Run a tick as if it started at `now`. Time spent inside the tick
    /// (chains, publish calls) is added on top of `now`.
    pub async fn run_one_tick_at(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let started = Instant::now();
        let mut outcome = TickOutcome::default();

        self.drain_queue(now, &mut outcome).await;

        let items = match self.feed.fetch().await {
            Ok(items) => items,
            Err(e) => {
                warn!("failed to fetch source items: {e}");
                return outcome;
            }
        };
        let fresh: Vec<SourceItem> = items
            .into_iter()
            .filter(|item| {
                !self.state.handled.contains(&item.id) && !self.state.queue.contains(&item.id)
            })
            .take(self.settings.items_per_tick)
            .collect();
        if fresh.is_empty() {
            debug!("no new source items");
        }

        for item in fresh {
            self.process_item(&item, now, started, &mut outcome).await;
        }

        info!(
            "tick done: published={}, cooldown={}, budget={}, queued={}",
            outcome.did_publish,
            outcome.was_blocked_by_cooldown,
            outcome.was_blocked_by_budget,
            self.state.queue.len()
        );
        outcome
    }

    async fn process_item(
        &mut self,
        item: &SourceItem,
        tick_start: DateTime<Utc>,
        started: Instant,
        outcome: &mut TickOutcome,
    ) {
        info!("processing source item {}", item.id);
        let recent = self.state.published.recent_texts();
        let produced = self.orchestrator.produce(&item.text, &recent).await;
        let now = tick_start + Duration::from_std(started.elapsed()).unwrap_or_default();

        if !produced.accepted {
            warn!(
                "source item {} not accepted after {} attempts, queueing best effort",
                item.id, produced.attempts
            );
            self.state
                .queue
                .enqueue_at(&item.id, &produced.final_text, now);
            return;
        }

        if let Some(block) = self.publish_block(now) {
            info!(
                "publishing blocked ({block:?}, ~{}s), queueing {}",
                self.seconds_until_unblocked(now),
                item.id
            );
            outcome.blocked(block);
            self.state
                .queue
                .enqueue_at(&item.id, &produced.final_text, now);
            return;
        }

        match self.publisher.publish(&produced.final_text).await {
            Ok(id) => {
                self.record_published(&item.id, &produced.final_text, &id, now);
                outcome.did_publish = true;
            }
            Err(e) => {
                self.state
                    .queue
                    .enqueue_at(&item.id, &produced.final_text, now);
                match self.handle_publish_error(&e, now) {
                    Some(block) => outcome.blocked(block),
                    None => warn!("publishing {} failed, queued for retry: {e}", item.id),
                }
            }
        }
    }

    async fn drain_queue(&mut self, now: DateTime<Utc>, outcome: &mut TickOutcome) {
        while let Some(head) = self.state.queue.peek().cloned() {
            if head.attempt_count >= self.settings.queue_max_attempts {
                warn!(
                    "evicting {} from the queue after {} failed attempts",
                    head.source_id, head.attempt_count
                );
                self.state.queue.dequeue();
                continue;
            }

            if let Some(block) = self.publish_block(now) {
                info!(
                    "queue drain blocked ({block:?}, ~{}s), {} item(s) waiting",
                    self.seconds_until_unblocked(now),
                    self.state.queue.len()
                );
                outcome.blocked(block);
                break;
            }

            if self.state.published.contains(&head.final_text) {
                info!("skipping {}: identical text already published", head.source_id);
                self.state.queue.dequeue();
                self.state.handled.mark(&head.source_id);
                continue;
            }

            match self.publisher.publish(&head.final_text).await {
                Ok(id) => {
                    self.state.queue.dequeue();
                    self.record_published(&head.source_id, &head.final_text, &id, now);
                    outcome.did_publish = true;
                }
                Err(e) => {
                    match self.handle_publish_error(&e, now) {
                        Some(block) => outcome.blocked(block),
                        None => {
                            let attempts = self.state.queue.increment_attempt();
                            warn!(
                                "publishing {} failed (attempt {}): {e}",
                                head.source_id,
                                attempts.unwrap_or_default()
                            );
                        }
                    }
                    break;
                }
            }
        }
    }

    /// Why publishing at `now` is not allowed, if it is not.
    fn publish_block(&mut self, now: DateTime<Utc>) -> Option<Block> {
        if self.state.rate_limits.is_limited_at(PUBLISH_BUCKET, now) {
            return Some(Block::Cooldown);
        }
        if !self.state.budget.can_publish_at(now) {
            return Some(Block::Budget);
        }
        let spacing = Duration::minutes(self.settings.min_spacing_minutes);
        match self.state.budget.last_publish_at() {
            Some(last) if now - last < spacing => Some(Block::Cooldown),
            _ => None,
        }
    }

    /// Longest of the three waits; an estimate for logs.
    fn seconds_until_unblocked(&mut self, now: DateTime<Utc>) -> i64 {
        let limit = self.state.rate_limits.seconds_until_reset_at(PUBLISH_BUCKET, now);
        let budget = self.state.budget.seconds_until_next_slot_at(now);
        let spacing = self.state.budget.last_publish_at().map_or(0, |last| {
            (last + Duration::minutes(self.settings.min_spacing_minutes) - now)
                .num_seconds()
                .max(0)
        });
        limit.max(budget).max(spacing)
    }

    fn record_published(
        &mut self,
        source_id: &str,
        text: &str,
        id: &PublishedId,
        now: DateTime<Utc>,
    ) {
        info!("published {source_id} as {id}");
        self.state.budget.record_publish_at(now);
        self.state.rate_limits.set_cooldown_at(
            PUBLISH_BUCKET,
            self.settings.cooldown_minutes * 60,
            "post-publish pacing",
            now,
        );
        self.state.published.record_at(text, Some(id.as_str()), now);
        self.state.handled.mark(source_id);
    }

    /// Record a hard rejection. `None` for ordinary failures, which the
    /// caller handles.
    fn handle_publish_error(
        &mut self,
        error: &PublishError,
        now: DateTime<Utc>,
    ) -> Option<Block> {
        if error.is_rate_limit() {
            warn!("publish hard-rejected by the platform: {error}");
            self.state
                .rate_limits
                .set_hard_limit_at(PUBLISH_BUCKET, error.server_reset(), now);
            Some(Block::Budget)
        } else {
            None
        }
    }
}
