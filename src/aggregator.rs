//! Aggregator (§4.6): single-reader task that consumes the result channel,
//! maintains running sums and distributions, and keeps a bounded retained
//! sample for percentile/histogram fidelity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::result::RequestResult;

/// Hard ceiling on the retained sample, per the design notes: bounds memory
/// without affecting the running sums (which account for every result).
pub const RETAINED_SAMPLE_CAP: usize = 1_000_000;

/// Owned only by the aggregator task; never read or written from elsewhere.
pub struct AggregatorState {
    pub sum_total: Duration,
    pub sum_conn: Duration,
    pub sum_dns: Duration,
    pub sum_req: Duration,
    pub sum_res: Duration,
    pub sum_delay: Duration,
    pub size_total: i64,
    pub num_results: u64,

    pub status_dist: HashMap<u16, u64>,
    pub error_dist: HashMap<String, u64>,

    pub total: Vec<Duration>,
    pub conn: Vec<Duration>,
    pub dns: Vec<Duration>,
    pub req: Vec<Duration>,
    pub delay: Vec<Duration>,
    pub res: Vec<Duration>,
    pub status_codes: Vec<u16>,
    pub offsets: Vec<Duration>,
}

impl Default for AggregatorState {
    fn default() -> Self {
        Self {
            sum_total: Duration::ZERO,
            sum_conn: Duration::ZERO,
            sum_dns: Duration::ZERO,
            sum_req: Duration::ZERO,
            sum_res: Duration::ZERO,
            sum_delay: Duration::ZERO,
            size_total: 0,
            num_results: 0,
            status_dist: HashMap::new(),
            error_dist: HashMap::new(),
            total: Vec::new(),
            conn: Vec::new(),
            dns: Vec::new(),
            req: Vec::new(),
            delay: Vec::new(),
            res: Vec::new(),
            status_codes: Vec::new(),
            offsets: Vec::new(),
        }
    }
}

impl AggregatorState {
    fn retained_len(&self) -> usize {
        self.total.len()
    }

    fn ingest(&mut self, result: RequestResult) {
        self.num_results += 1;

        if let Some(err) = result.err {
            *self.error_dist.entry(err.dist_key()).or_insert(0) += 1;
            return;
        }

        self.sum_total += result.duration;
        self.sum_conn += result.conn_duration;
        self.sum_dns += result.dns_duration;
        self.sum_req += result.req_duration;
        self.sum_res += result.res_duration;
        self.sum_delay += result.delay_duration;

        if self.retained_len() < RETAINED_SAMPLE_CAP {
            self.total.push(result.duration);
            self.conn.push(result.conn_duration);
            self.dns.push(result.dns_duration);
            self.req.push(result.req_duration);
            self.delay.push(result.delay_duration);
            self.res.push(result.res_duration);
            self.status_codes.push(result.status_code);
            self.offsets.push(result.offset);
        }

        *self.status_dist.entry(result.status_code).or_insert(0) += 1;
        if result.content_length >= 0 {
            self.size_total += result.content_length;
        }
    }
}

/// Drains `rx` to completion, applying every result to `state` in order.
/// Returns once the channel is closed and all senders (the worker pool)
/// have been dropped. `progress`, when given, is bumped after every result
/// so an external low-frequency reporter can read it without touching the
/// aggregator's own state.
pub async fn run(
    mut rx: mpsc::Receiver<RequestResult>,
    state: &mut AggregatorState,
    progress: Option<Arc<AtomicU64>>,
) {
    while let Some(result) = rx.recv().await {
        state.ingest(result);
        if let Some(progress) = &progress {
            progress.fetch_add(1, Ordering::Relaxed);
        }
    }
    debug!(num_results = state.num_results, "aggregator drained channel");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;

    fn ok_result(duration_ms: u64, status: u16) -> RequestResult {
        RequestResult {
            err: None,
            status_code: status,
            duration: Duration::from_millis(duration_ms),
            conn_duration: Duration::from_millis(1),
            dns_duration: Duration::from_millis(1),
            req_duration: Duration::ZERO,
            delay_duration: Duration::from_millis(duration_ms - 2),
            res_duration: Duration::from_millis(1),
            content_length: 100,
            offset: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn ingests_success_and_error_results() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(ok_result(10, 200)).await.unwrap();
        tx.send(RequestResult {
            err: Some(TransportError::Timeout),
            status_code: 0,
            duration: Duration::ZERO,
            conn_duration: Duration::ZERO,
            dns_duration: Duration::ZERO,
            req_duration: Duration::ZERO,
            delay_duration: Duration::ZERO,
            res_duration: Duration::ZERO,
            content_length: -1,
            offset: Duration::ZERO,
        })
        .await
        .unwrap();
        drop(tx);

        let mut state = AggregatorState::default();
        run(rx, &mut state, None).await;

        assert_eq!(state.num_results, 2);
        assert_eq!(state.status_dist.get(&200), Some(&1));
        assert_eq!(state.error_dist.get("timeout"), Some(&1));
        assert_eq!(state.retained_len(), 1);
        assert_eq!(state.size_total, 100);
    }

    #[test]
    fn retained_sample_is_capped() {
        let mut state = AggregatorState::default();
        for _ in 0..(RETAINED_SAMPLE_CAP + 5) {
            state.ingest(ok_result(5, 200));
        }
        assert_eq!(state.retained_len(), RETAINED_SAMPLE_CAP);
        assert_eq!(state.num_results, (RETAINED_SAMPLE_CAP + 5) as u64);
        assert_eq!(state.status_dist.get(&200), Some(&((RETAINED_SAMPLE_CAP + 5) as u64)));
    }
}
