//! Controller (§4.8): owns the lifecycle of one run.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::info;

use crate::aggregator::{self, AggregatorState};
use crate::plan::{Budget, Plan};
use crate::request::RequestFactory;
use crate::snapshot::Snapshot;
use crate::transport::build_transport;
use crate::worker::{run_worker, WorkerBudget, WorkerConfig};

/// Result channel capacity: `min(c*1000, 1_000_000)` (§4.8 step 2).
fn channel_capacity(c: u64) -> usize {
    (c.saturating_mul(1000)).min(1_000_000) as usize
}

/// Runs a full plan to completion: builds the transport, spawns the
/// aggregator and worker pool, watches for duration expiry or an external
/// interrupt, then finalizes a `Snapshot`.
///
/// `interrupted` is an externally-owned flag the caller may flip (e.g. from
/// a Ctrl-C handler) to request early stop; the controller always spawns
/// its own duration watcher besides.
pub async fn run(
    plan: &Plan,
    factory: Arc<dyn RequestFactory>,
    interrupted: Arc<AtomicBool>,
) -> reqwest::Result<Snapshot> {
    let client = build_transport(&plan.transport_options, plan.request_timeout)?;

    let (tx, rx) = mpsc::channel(channel_capacity(plan.concurrency));
    let mut aggregator_state = AggregatorState::default();
    let progress_count = Arc::new(AtomicU64::new(0));

    let aggregator_progress = progress_count.clone();
    let aggregator_handle = tokio::spawn(async move {
        aggregator::run(rx, &mut aggregator_state, Some(aggregator_progress)).await;
        aggregator_state
    });

    let run_start = Instant::now();
    let stop = interrupted;

    let worker_budget = |share: Option<u64>| match share {
        Some(n) => WorkerBudget::Count(n),
        None => WorkerBudget::UntilStopped,
    };
    let per_worker_budget = plan.requests_per_worker();

    let mut workers = JoinSet::new();
    for _ in 0..plan.concurrency {
        let client = client.clone();
        let factory = factory.clone();
        let config = WorkerConfig {
            budget: worker_budget(per_worker_budget),
            qps_per_worker: plan.qps_per_worker,
        };
        let stop = stop.clone();
        let tx = tx.clone();
        workers.spawn(run_worker(client, factory, config, run_start, stop, tx));
    }
    drop(tx);

    let progress_handle = if plan.output_mode == crate::plan::OutputMode::Summary {
        Some(spawn_progress_reporter(progress_count.clone(), stop.clone()))
    } else {
        None
    };

    let duration_handle = if let Budget::Duration(d) = plan.budget {
        Some(spawn_duration_watcher(d, stop.clone()))
    } else {
        None
    };

    while workers.join_next().await.is_some() {}

    stop.store(true, Ordering::Relaxed);
    if let Some(h) = duration_handle {
        h.abort();
    }
    if let Some(h) = progress_handle {
        h.abort();
    }

    let aggregator_state = aggregator_handle
        .await
        .expect("aggregator task should not panic");
    let elapsed = run_start.elapsed();

    info!(num_results = aggregator_state.num_results, ?elapsed, "run complete");
    Ok(Snapshot::finalize(aggregator_state, elapsed))
}

fn spawn_duration_watcher(duration: Duration, stop: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        stop.store(true, Ordering::Relaxed);
    })
}

fn spawn_progress_reporter(
    count: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(500));
        loop {
            interval.tick().await;
            if stop.load(Ordering::Relaxed) {
                break;
            }
            eprint!("\r{} requests done", count.load(Ordering::Relaxed));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_capped_at_one_million() {
        assert_eq!(channel_capacity(2), 2000);
        assert_eq!(channel_capacity(5_000), 1_000_000);
    }
}
