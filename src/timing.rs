//! Per-request timing probe.
//!
//! `reqwest` fuses dial, TLS handshake, request-write, and server-wait into
//! the single await on `Client::execute` — there is no public hook
//! splitting them. DNS resolution is the one stage this crate can instrument
//! directly, by installing a custom `reqwest::dns::Resolve`. See §4.3.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};

tokio::task_local! {
    static TIMING_SLOT: Arc<Mutex<Option<DnsTiming>>>;
}

#[derive(Debug, Clone, Copy)]
struct DnsTiming {
    start: Instant,
    done: Instant,
}

/// Durations recorded for a single request attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeResult {
    pub dns: std::time::Duration,
    pub conn: std::time::Duration,
    pub req: std::time::Duration,
    pub delay: std::time::Duration,
    pub res: std::time::Duration,
}

/// Resolves hostnames via the system resolver (`tokio::net::lookup_host`,
/// the same getaddrinfo-backed lookup `reqwest`'s own default resolver uses)
/// and records a DNS-start/DNS-done pair into whichever task-local slot is
/// active when `resolve` is polled.
///
/// Because each worker drives at most one request at a time (§4.5), and the
/// slot is scoped to that worker's task for the duration of the request,
/// concurrent workers never observe each other's timing — the slot is never
/// shared across requests despite the resolver itself being one shared
/// `Arc` handed to a single `reqwest::Client`.
#[derive(Default)]
pub struct TimingResolver;

impl Resolve for TimingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let start = Instant::now();
            let host = format!("{}:0", name.as_str());
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host(host)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?
                .collect();
            let done = Instant::now();
            let _ = TIMING_SLOT.try_with(|slot| {
                *slot.lock().expect("timing slot poisoned") = Some(DnsTiming { start, done });
            });
            let boxed: Addrs = Box::new(addrs.into_iter());
            Ok(boxed)
        })
    }
}

/// Runs `fut` with a fresh per-request DNS timing slot installed, then
/// reports whatever the resolver (if invoked at all) recorded into it.
pub async fn with_probe<F, T>(fut: F) -> (T, ProbeResult)
where
    F: Future<Output = (T, ResponseTimestamps)>,
{
    let slot: Arc<Mutex<Option<DnsTiming>>> = Arc::new(Mutex::new(None));
    let (value, ts) = TIMING_SLOT.scope(slot.clone(), fut).await;

    let dns_timing = slot.lock().expect("timing slot poisoned").take();
    let dns = dns_timing
        .map(|t| t.done.saturating_duration_since(t.start))
        .unwrap_or_default();

    // conn_duration reports exactly the measured DNS span; req_duration is
    // always zero (unmeasurable through reqwest's public API); delay_duration
    // absorbs the rest of the pre-response span. See SPEC_FULL.md §4.3.
    let pre_response = ts
        .headers_received
        .saturating_duration_since(ts.request_start);
    let delay = pre_response.saturating_sub(dns);
    let res = ts
        .body_done
        .saturating_duration_since(ts.headers_received);

    (
        value,
        ProbeResult {
            dns,
            conn: dns,
            req: std::time::Duration::ZERO,
            delay,
            res,
        },
    )
}

/// The three wall-clock points a worker can observe around a `reqwest` call.
#[derive(Debug, Clone, Copy)]
pub struct ResponseTimestamps {
    pub request_start: Instant,
    pub headers_received: Instant,
    pub body_done: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_dns_activity_yields_zero_segments() {
        let start = Instant::now();
        let headers = start + std::time::Duration::from_millis(10);
        let done = headers + std::time::Duration::from_millis(5);

        let (value, probe) = with_probe(async move {
            (
                42,
                ResponseTimestamps {
                    request_start: start,
                    headers_received: headers,
                    body_done: done,
                },
            )
        })
        .await;

        assert_eq!(value, 42);
        assert_eq!(probe.dns, std::time::Duration::ZERO);
        assert_eq!(probe.conn, std::time::Duration::ZERO);
        assert_eq!(probe.req, std::time::Duration::ZERO);
        assert_eq!(probe.delay, std::time::Duration::from_millis(10));
        assert_eq!(probe.res, std::time::Duration::from_millis(5));
    }
}
