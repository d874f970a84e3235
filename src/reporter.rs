//! Reporter (§4.7): renders a finalized `Snapshot` as a human summary or a
//! CSV stream. The histogram/percentile/CSV formulas below are load-bearing
//! — they are exercised directly by the testable properties in §8.

use std::io::Write;
use std::time::Duration;

use crate::snapshot::{Snapshot, StageStats};

const PERCENTILES: [u32; 7] = [10, 25, 50, 75, 90, 95, 99];
const HISTOGRAM_BUCKETS: usize = 10;
const BAR_FILL: char = '\u{25A0}';
const BAR_WIDTH: u64 = 40;

/// One row of the percentile table: the percentile `p` maps to the value at
/// sorted index `⌊i·100/n⌋ ≥ p`, scanning forward.
pub fn percentiles(sorted: &[Duration]) -> Vec<(u32, Duration)> {
    if sorted.is_empty() {
        return PERCENTILES.iter().map(|p| (*p, Duration::ZERO)).collect();
    }
    let n = sorted.len();
    PERCENTILES
        .iter()
        .map(|&p| {
            let mut value = sorted[n - 1];
            for (i, d) in sorted.iter().enumerate() {
                if ((i as u64) * 100 / n as u64) as u32 >= p {
                    value = *d;
                    break;
                }
            }
            (p, value)
        })
        .collect()
}

/// One histogram bucket: an upper edge (seconds) and the count of samples
/// falling at or below it but above the previous bucket's edge.
pub struct HistogramBucket {
    pub upper_bound: Duration,
    pub count: usize,
    pub bar_len: u64,
}

/// Ten equal-width buckets from `fastest` to `slowest`, plus an eleventh
/// edge-inclusive bucket exactly at `slowest` (§4.7).
pub fn histogram(sorted: &[Duration]) -> Vec<HistogramBucket> {
    if sorted.is_empty() {
        return Vec::new();
    }
    let fastest = sorted[0].as_secs_f64();
    let slowest = sorted[sorted.len() - 1].as_secs_f64();
    let width = (slowest - fastest) / HISTOGRAM_BUCKETS as f64;

    let mut edges = Vec::with_capacity(HISTOGRAM_BUCKETS + 1);
    for i in 0..HISTOGRAM_BUCKETS {
        edges.push(fastest + width * (i + 1) as f64);
    }
    edges.push(slowest);

    let mut counts = vec![0usize; edges.len()];
    for d in sorted {
        let secs = d.as_secs_f64();
        let mut bucket = edges.len() - 1;
        for (i, edge) in edges.iter().enumerate() {
            if secs <= *edge || width <= 0.0 {
                bucket = i;
                break;
            }
        }
        counts[bucket] += 1;
    }

    let max_count = counts.iter().copied().max().unwrap_or(0) as u64;
    edges
        .into_iter()
        .zip(counts)
        .map(|(edge, count)| {
            let bar_len = if max_count > 0 {
                (count as u64 * BAR_WIDTH + max_count / 2) / max_count
            } else {
                0
            };
            HistogramBucket {
                upper_bound: Duration::from_secs_f64(edge.max(0.0)),
                count,
                bar_len,
            }
        })
        .collect()
}

/// Sum of histogram bucket counts must equal the retained sample length
/// (§8 invariant 5) — this is what callers should assert against, not an
/// implementation detail of `histogram` itself.
pub fn histogram_total(buckets: &[HistogramBucket]) -> usize {
    buckets.iter().map(|b| b.count).sum()
}

fn stage_line(name: &str, stats: &StageStats) -> String {
    format!(
        "  {:<10} {:>10.4}s {:>10.4}s {:>10.4}s",
        name,
        stats.average.as_secs_f64(),
        stats.min.as_secs_f64(),
        stats.max.as_secs_f64()
    )
}

/// Renders the human-readable summary described in §4.7.
pub fn render_summary(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\nSummary:\n  Total:\t{:.4} secs\n  Slowest:\t{:.4} secs\n  Fastest:\t{:.4} secs\n  Average:\t{:.4} secs\n  Requests/sec:\t{:.4}\n",
        snapshot.elapsed.as_secs_f64(),
        snapshot.total.max.as_secs_f64(),
        snapshot.total.min.as_secs_f64(),
        snapshot.total.average.as_secs_f64(),
        snapshot.rps,
    ));
    if snapshot.size_total > 0 {
        out.push_str(&format!(
            "  Total data:\t{} bytes\n  Size/request:\t{:.2} bytes\n",
            snapshot.size_total,
            snapshot.bytes_per_request(),
        ));
    }
    if snapshot.truncated {
        out.push_str(&format!(
            "\n  NOTE: retained sample truncated at the {}-record cap; percentiles and the histogram below reflect only the retained subset.\n",
            crate::aggregator::RETAINED_SAMPLE_CAP,
        ));
    }

    out.push_str("\nResponse time histogram:\n");
    for bucket in histogram(&snapshot.total.sorted) {
        out.push_str(&format!(
            "  {:>8.3} [{:>5}] |{}\n",
            bucket.upper_bound.as_secs_f64(),
            bucket.count,
            BAR_FILL.to_string().repeat(bucket.bar_len as usize),
        ));
    }

    out.push_str("\nLatency distribution:\n");
    for (p, value) in percentiles(&snapshot.total.sorted) {
        out.push_str(&format!("  {:>3}% in {:.4} secs\n", p, value.as_secs_f64()));
    }

    out.push_str("\nDetails (average, min, max):\n");
    out.push_str(&format!("{}\n", stage_line("DNS+dial:", &snapshot.conn)));
    out.push_str(&format!("{}\n", stage_line("DNS:", &snapshot.dns)));
    out.push_str(&format!("{}\n", stage_line("req write:", &snapshot.req)));
    out.push_str(&format!("{}\n", stage_line("resp wait:", &snapshot.delay)));
    out.push_str(&format!("{}\n", stage_line("resp read:", &snapshot.res)));

    out.push_str("\nStatus code distribution:\n");
    let mut statuses: Vec<_> = snapshot.status_dist.iter().collect();
    statuses.sort_by_key(|(code, _)| **code);
    for (code, count) in statuses {
        out.push_str(&format!("  [{}]\t{} responses\n", code, count));
    }

    if !snapshot.error_dist.is_empty() {
        out.push_str("\nError distribution:\n");
        let mut errors: Vec<_> = snapshot.error_dist.iter().collect();
        errors.sort_by_key(|(msg, _)| msg.clone());
        for (msg, count) in errors {
            out.push_str(&format!("  [{}]\t{}\n", count, msg));
        }
    }

    out
}

/// Header row for the CSV output (§6), exported for tests that need the
/// exact literal contract without re-deriving it from `render_csv`.
pub const CSV_HEADER: [&str; 8] = [
    "response-time",
    "DNS+dialup",
    "DNS",
    "Request-write",
    "Response-delay",
    "Response-read",
    "status-code",
    "offset",
];

/// Writes the CSV contract from §4.7/§6 to `writer`: one header row, one
/// data row per retained sample. Driven from `snapshot.samples`, the
/// arrival-order vectors, not the per-stage `sorted` vectors — each of
/// those is sorted independently for percentiles and no longer lines up
/// request-by-request.
pub fn render_csv<W: Write>(snapshot: &Snapshot, writer: W) -> csv::Result<()> {
    let mut w = csv::WriterBuilder::new().from_writer(writer);
    w.write_record(CSV_HEADER)?;

    let samples = &snapshot.samples;
    for i in 0..samples.total.len() {
        w.write_record(&[
            format!("{:.4}", samples.total[i].as_secs_f64()),
            format!("{:.4}", samples.conn[i].as_secs_f64()),
            format!("{:.4}", samples.dns[i].as_secs_f64()),
            format!("{:.4}", samples.req[i].as_secs_f64()),
            format!("{:.4}", samples.delay[i].as_secs_f64()),
            format!("{:.4}", samples.res[i].as_secs_f64()),
            samples.status_codes[i].to_string(),
            format!("{:.4}", samples.offsets[i].as_secs_f64()),
        ])?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn durations_ms(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|v| Duration::from_millis(*v)).collect()
    }

    #[test]
    fn percentile_ordering_holds() {
        let sorted = durations_ms(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let table = percentiles(&sorted);
        let values: Vec<_> = table.iter().map(|(_, v)| *v).collect();
        let mut sorted_values = values.clone();
        sorted_values.sort();
        assert_eq!(values, sorted_values);
        assert!(values[0] >= sorted[0]);
        assert!(*values.last().unwrap() <= *sorted.last().unwrap());
    }

    #[test]
    fn histogram_counts_sum_to_sample_len() {
        let sorted = durations_ms(&[1, 2, 2, 3, 5, 8, 13, 21, 34, 55, 89]);
        let buckets = histogram(&sorted);
        assert_eq!(histogram_total(&buckets), sorted.len());
    }

    #[test]
    fn histogram_has_eleven_buckets_when_nonempty() {
        let sorted = durations_ms(&[1, 2, 3]);
        assert_eq!(histogram(&sorted).len(), HISTOGRAM_BUCKETS + 1);
    }

    #[test]
    fn csv_output_matches_column_contract() {
        use crate::aggregator::AggregatorState;

        let mut state = AggregatorState::default();
        for i in 0..3u64 {
            state.total.push(Duration::from_millis(10 + i));
            state.conn.push(Duration::from_millis(1));
            state.dns.push(Duration::from_millis(1));
            state.req.push(Duration::ZERO);
            state.delay.push(Duration::from_millis(7));
            state.res.push(Duration::from_millis(1));
            state.status_codes.push(200);
            state.offsets.push(Duration::from_millis(i));
        }
        let snapshot = Snapshot::finalize(state, Duration::from_secs(1));

        let mut buf = Vec::new();
        render_csv(&snapshot, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "response-time,DNS+dialup,DNS,Request-write,Response-delay,Response-read,status-code,offset"
        );
        let data_rows: Vec<_> = lines.collect();
        assert_eq!(data_rows.len(), 3);
        for row in data_rows {
            assert_eq!(row.split(',').count(), 8);
        }
    }
}
