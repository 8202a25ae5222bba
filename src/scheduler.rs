//! Drives repeated pipeline runs against one shared, freshly-reset cache on
//! a fixed interval for a bounded total duration.

use crate::config::FeedGroup;
use crate::pipeline::{run_once, PipelineOptions};
use crate::storage::Database;
use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// Cooperative generator driving the schedule loop. Each call to
/// [`tick`](ScheduleClock::tick) yields `true` (run another iteration,
/// sleeping first unless this is the very first tick) or `false` once
/// running the loop again would cross the deadline. Cancellation is
/// reaching the deadline; there is nothing else to cancel on.
struct ScheduleClock {
    deadline: Instant,
    interval: Duration,
    started: bool,
}

impl ScheduleClock {
    fn new(total_time: Duration, interval_time: Duration) -> Self {
        Self {
            deadline: Instant::now() + total_time,
            interval: interval_time,
            started: false,
        }
    }

    async fn tick(&mut self) -> bool {
        if !self.started {
            self.started = true;
            return true;
        }
        if Instant::now() + self.interval > self.deadline {
            return false;
        }
        tokio::time::sleep(self.interval).await;
        true
    }
}

/// Run the pipeline every `interval_time` for `total_time`, all iterations
/// sharing one freshly reset cache and writing into a single
/// `schedule_<timestamp>` output directory.
///
/// Caching is forced on for the schedule's duration regardless of the
/// caller's own preference, and any existing cache database is deleted
/// first, so every schedule starts from a clean baseline.
pub async fn run_schedule(
    groups: &[FeedGroup],
    client: &reqwest::Client,
    cache_path: &str,
    output_root: &Path,
    full_document: bool,
    total_time: Duration,
    interval_time: Duration,
) -> anyhow::Result<()> {
    tracing::info!(
        total_secs = total_time.as_secs(),
        interval_secs = interval_time.as_secs(),
        "scheduler starting, resetting cache to a clean baseline"
    );
    let cache = Database::reset(cache_path).await?;

    let folder = output_root.join(format!("schedule_{}", Utc::now().format("%Y%m%dT%H%M%SZ")));
    tokio::fs::create_dir_all(&folder).await?;

    let options = PipelineOptions {
        caching: true,
        full_document,
    };

    let mut clock = ScheduleClock::new(total_time, interval_time);
    let mut iteration = 0u32;
    while clock.tick().await {
        iteration += 1;
        tracing::info!(iteration, folder = %folder.display(), "scheduled pipeline run starting");
        run_once(groups, client, &cache, options, &folder).await;
    }

    tracing::info!(iterations = iteration, "scheduled run complete");
    Ok(())
}
