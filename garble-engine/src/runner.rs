use std::path::{Path, PathBuf};
use std::time::Duration;

use garble_store::InstanceLock;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};

use crate::coordinator::{Coordinator, TickOutcome};

/// Run one tick under the instance lock. `None` when another process holds it.
pub async fn run_locked_tick(
    coordinator: &mut Coordinator,
    lock_path: &Path,
) -> Option<TickOutcome> {
    let _lock = match InstanceLock::try_acquire(lock_path) {
        Ok(lock) => lock,
        Err(e) => {
            warn!("skipping tick: {e}");
            return None;
        }
    };
    coordinator.reload_state();
    Some(coordinator.run_one_tick().await)
}

/// Tick the coordinator every `tick`, first tick immediately. Ticks that
/// fall due while one is still running are skipped, not queued.
pub fn start_tick_runner(
    mut coordinator: Coordinator,
    lock_path: PathBuf,
    tick: Duration,
) -> tokio::task::JoinHandle<()> {
    let mut interval = interval_at(Instant::now(), tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let handle = tokio::spawn(async move {
        loop {
            interval.tick().await;
            if let Some(outcome) = run_locked_tick(&mut coordinator, &lock_path).await {
                info!(
                    "tick finished (published={}, blocked_by_cooldown={}, blocked_by_budget={})",
                    outcome.did_publish,
                    outcome.was_blocked_by_cooldown,
                    outcome.was_blocked_by_budget
                );
            }
        }
    });

    info!("tick runner started (every {}s)", tick.as_secs());
    handle
}
