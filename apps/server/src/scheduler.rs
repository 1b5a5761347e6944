//! Background schedules for the daemon.
//!
//! News runs on its own interval. The catalog runs on a longer interval and
//! is followed by a logo backfill for instruments still missing an image.
//! Each loop awaits its own run, so a job never overlaps itself.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::main_lib::{AppState, UpstreamServices};

/// Delay before the first run, so startup logs stay readable.
const INITIAL_DELAY: Duration = Duration::from_secs(5);

/// Starts every schedule. Abort the returned handles to stop them.
pub fn start_schedulers(
    state: Arc<AppState>,
    news_every: Duration,
    catalog_every: Duration,
) -> Vec<JoinHandle<()>> {
    if state.upstream.is_none() {
        warn!("Scheduler running logo backfill only: no upstream configured");
        return vec![spawn_every("logo backfill", state, catalog_every, |state| {
            async move { run_backfill(&state).await }.boxed()
        })];
    }

    vec![
        spawn_every("news sync", state.clone(), news_every, |state| {
            async move {
                if let Some(upstream) = &state.upstream {
                    run_news_sync(upstream).await;
                }
            }
            .boxed()
        }),
        spawn_every("catalog sync", state, catalog_every, |state| {
            async move {
                if let Some(upstream) = &state.upstream {
                    run_catalog_sync(upstream).await;
                }
                run_backfill(&state).await;
            }
            .boxed()
        }),
    ]
}

type Job = fn(Arc<AppState>) -> BoxFuture<'static, ()>;

fn spawn_every(
    name: &'static str,
    state: Arc<AppState>,
    every: Duration,
    job: Job,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("{} scheduler started ({}s interval)", name, every.as_secs());
        tokio::time::sleep(INITIAL_DELAY).await;

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            job(state.clone()).await;
        }
    })
}

async fn run_news_sync(upstream: &UpstreamServices) {
    match upstream.news_sync.sync_news().await {
        Ok(result) => info!(
            "Scheduled news sync: {} stocks, {} new, {} updated, {} errors",
            result.total_stocks, result.new_articles, result.updated_articles, result.error_count
        ),
        Err(e) => error!("Scheduled news sync failed: {}", e),
    }
}

async fn run_catalog_sync(upstream: &UpstreamServices) {
    match upstream.catalog_sync.sync_catalog().await {
        Ok(result) => info!(
            "Scheduled catalog sync: {} fetched, {} upserted, {} failed",
            result.fetched, result.upserted, result.failed
        ),
        Err(e) => error!("Scheduled catalog sync failed: {}", e),
    }
}

async fn run_backfill(state: &AppState) {
    match state
        .logo_backfill
        .backfill_missing(state.logo_backfill_limit)
        .await
    {
        Ok(result) => info!(
            "Scheduled logo backfill: {} checked, {} acquired, {} missing, {} failed",
            result.checked, result.acquired, result.missing, result.failed
        ),
        Err(e) => error!("Scheduled logo backfill failed: {}", e),
    }
}
