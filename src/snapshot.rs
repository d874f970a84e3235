//! Snapshot: the immutable, derived view of a finished run (§3), built once
//! from the aggregator's state at finalize time.

use std::collections::HashMap;
use std::time::Duration;

use crate::aggregator::{AggregatorState, RETAINED_SAMPLE_CAP};

/// One measured latency stage: a sorted copy for percentiles/histogram, with
/// min/average computed over the *nonzero* subset — a zero in a stage like
/// `conn`/`req` means "not measured" (a pooled connection, an unavailable
/// write hook), not a genuinely instantaneous one, so it would otherwise
/// drag min to zero and bias the average low. `max` is unaffected: a stage
/// that is zero throughout has nothing to bias and correctly reports zero.
#[derive(Debug, Clone, Default)]
pub struct StageStats {
    pub sorted: Vec<Duration>,
    pub average: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl StageStats {
    fn from_samples(samples: Vec<Duration>, sum: Duration) -> Self {
        let mut sorted = samples;
        sorted.sort_unstable();

        let nonzero_count = sorted.iter().filter(|d| !d.is_zero()).count();
        let average = if nonzero_count == 0 {
            Duration::ZERO
        } else {
            sum / nonzero_count as u32
        };
        let min = sorted.iter().find(|d| !d.is_zero()).copied().unwrap_or_default();
        let max = sorted.last().copied().unwrap_or_default();

        Self {
            sorted,
            average,
            min,
            max,
        }
    }
}

/// Arrival-order, per-request-correlated samples: row `i` here is one real
/// `Result` record, across every field. Kept separate from the
/// percentile-sorted `StageStats::sorted` vectors, which are independently
/// sorted per stage and so no longer line up request-by-request.
#[derive(Debug, Clone, Default)]
pub struct PerRequestSamples {
    pub total: Vec<Duration>,
    pub conn: Vec<Duration>,
    pub dns: Vec<Duration>,
    pub req: Vec<Duration>,
    pub delay: Vec<Duration>,
    pub res: Vec<Duration>,
    pub status_codes: Vec<u16>,
    pub offsets: Vec<Duration>,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub total: StageStats,
    pub conn: StageStats,
    pub dns: StageStats,
    pub req: StageStats,
    pub delay: StageStats,
    pub res: StageStats,

    /// Arrival-order records for CSV output; see `PerRequestSamples`.
    pub samples: PerRequestSamples,

    pub status_dist: HashMap<u16, u64>,
    pub error_dist: HashMap<String, u64>,

    pub num_results: u64,
    pub size_total: i64,
    pub elapsed: Duration,
    pub rps: f64,

    /// Set when `num_results` exceeded the retained-sample cap — the
    /// reporter must surface this rather than silently present truncated
    /// statistics as if they covered the whole run.
    pub truncated: bool,
}

impl Snapshot {
    pub fn finalize(state: AggregatorState, elapsed: Duration) -> Self {
        let rps = if elapsed.as_secs_f64() > 0.0 {
            state.num_results as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let samples = PerRequestSamples {
            total: state.total.clone(),
            conn: state.conn.clone(),
            dns: state.dns.clone(),
            req: state.req.clone(),
            delay: state.delay.clone(),
            res: state.res.clone(),
            status_codes: state.status_codes.clone(),
            offsets: state.offsets.clone(),
        };

        Snapshot {
            total: StageStats::from_samples(state.total, state.sum_total),
            conn: StageStats::from_samples(state.conn, state.sum_conn),
            dns: StageStats::from_samples(state.dns, state.sum_dns),
            req: StageStats::from_samples(state.req, state.sum_req),
            delay: StageStats::from_samples(state.delay, state.sum_delay),
            res: StageStats::from_samples(state.res, state.sum_res),
            samples,
            status_dist: state.status_dist,
            error_dist: state.error_dist,
            num_results: state.num_results,
            size_total: state.size_total,
            elapsed,
            rps,
            truncated: state.num_results as usize > RETAINED_SAMPLE_CAP,
        }
    }

    pub fn bytes_per_request(&self) -> f64 {
        if self.total.sorted.is_empty() {
            0.0
        } else {
            self.size_total as f64 / self.total.sorted.len() as f64
        }
    }
}
