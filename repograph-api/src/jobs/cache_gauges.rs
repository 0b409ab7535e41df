//! Cache Size Gauges Job
//!
//! Periodically counts the entries in every cache tier and publishes them
//! as Prometheus gauges, together with the background writer's drop and
//! failure counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use repograph_core::RepographResult;
use repograph_storage::{CacheStore, CacheWriter, Tier};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::JobsConfig;
use crate::telemetry::metrics;

/// Counters for the gauge job itself.
#[derive(Debug, Default)]
pub struct CacheGaugeJobMetrics {
    pub cycles: AtomicU64,
    pub errors: AtomicU64,
}

/// Tier sizes observed by one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheGaugeSnapshot {
    pub tiers: Vec<(Tier, u64)>,
    pub scored_repos: u64,
    pub writes_dropped: u64,
    pub writes_failed: u64,
}

/// Count every tier once and publish the results.
pub async fn refresh_cache_gauges(
    store: &dyn CacheStore,
    writer: Option<&CacheWriter>,
) -> RepographResult<CacheGaugeSnapshot> {
    let mut snapshot = CacheGaugeSnapshot::default();
    for tier in Tier::ALL {
        snapshot.tiers.push((tier, store.count(tier).await?));
    }
    snapshot.scored_repos = store.stats().await?.scored_repos;
    if let Some(writer) = writer {
        snapshot.writes_dropped = writer.dropped();
        snapshot.writes_failed = writer.failed();
    }

    if let Some(metrics) = metrics() {
        for (tier, count) in &snapshot.tiers {
            metrics.set_tier_entries(*tier, *count);
        }
        metrics.set_scored_repos(snapshot.scored_repos);
        metrics.set_writer_counters(snapshot.writes_dropped, snapshot.writes_failed);
    }

    Ok(snapshot)
}

/// Run until `shutdown_rx` turns true.
///
/// # Example
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// tokio::spawn(cache_gauges_task(store, Some(writer), JobsConfig::default(), shutdown_rx));
/// let _ = shutdown_tx.send(true);
/// ```
pub async fn cache_gauges_task(
    store: Arc<dyn CacheStore>,
    writer: Option<CacheWriter>,
    config: JobsConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<CacheGaugeJobMetrics> {
    let job_metrics = Arc::new(CacheGaugeJobMetrics::default());

    let mut ticker = interval(config.gauge_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_secs = config.gauge_interval.as_secs(),
        "Cache gauge task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Cache gauge task shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                job_metrics.cycles.fetch_add(1, Ordering::Relaxed);
                match refresh_cache_gauges(store.as_ref(), writer.as_ref()).await {
                    Ok(snapshot) => tracing::debug!(
                        scored_repos = snapshot.scored_repos,
                        writes_dropped = snapshot.writes_dropped,
                        "Cache gauges refreshed"
                    ),
                    Err(e) => {
                        job_metrics.errors.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(error = %e, "Failed to refresh cache gauges");
                    }
                }
            }
        }
    }

    job_metrics
}
