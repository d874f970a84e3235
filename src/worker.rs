//! Worker pool (§4.5): `c` tasks, each repeatedly pacing itself against the
//! rate limiter, building a request via the factory, executing it against
//! the shared transport, and emitting one `Result` record per attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::trace;

use crate::errors::TransportError;
use crate::limiter::RateLimiter;
use crate::request::{BuiltRequest, RequestFactory};
use crate::result::RequestResult;
use crate::timing::{with_probe, ResponseTimestamps};

/// How many requests a single worker should issue before stopping.
pub enum WorkerBudget {
    Count(u64),
    UntilStopped,
}

pub struct WorkerConfig {
    pub budget: WorkerBudget,
    pub qps_per_worker: f64,
}

/// Runs one worker to completion. Exits when its budget is exhausted, or
/// (for duration-based plans) when `stop` flips to `true`.
///
/// Per iteration: check `stop`, wait for a rate-limiter tick, build a
/// request, execute it, drain the body, and send one `Result` — blocking
/// on a full channel is the intended backpressure (§4.5 point 7).
pub async fn run_worker(
    client: Arc<reqwest::Client>,
    factory: Arc<dyn RequestFactory>,
    config: WorkerConfig,
    run_start: Instant,
    stop: Arc<AtomicBool>,
    tx: mpsc::Sender<RequestResult>,
) {
    let mut limiter = RateLimiter::new(config.qps_per_worker);
    let mut issued: u64 = 0;

    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if let WorkerBudget::Count(n) = config.budget {
            if issued >= n {
                break;
            }
        }

        limiter.tick().await;

        // Re-check after the rate-limiter wait: the external stop signal
        // pre-empts a pending tick (§4.4).
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let request = factory.next_request();
        let offset = run_start.elapsed();
        let result = execute(&client, request, offset).await;

        trace!(status = result.status_code, "worker emitted a result");
        if tx.send(result).await.is_err() {
            // Aggregator gone (channel closed from the receiving side); no
            // point continuing.
            break;
        }

        issued += 1;
    }
}

async fn execute(client: &reqwest::Client, request: BuiltRequest, offset: Duration) -> RequestResult {
    let (outcome, probe) = with_probe(async move {
        let request_start = Instant::now();

        let mut builder = client.request(request.method, request.url);
        builder = builder.headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        match builder.send().await {
            Ok(response) => {
                let headers_received = Instant::now();
                let status_code = response.status().as_u16();
                let content_length = response
                    .content_length()
                    .map(|n| n as i64)
                    .unwrap_or(-1);

                match response.bytes().await {
                    Ok(body) => {
                        let body_done = Instant::now();
                        let size = if content_length >= 0 {
                            content_length
                        } else {
                            body.len() as i64
                        };
                        (
                            Ok((status_code, size)),
                            ResponseTimestamps {
                                request_start,
                                headers_received,
                                body_done,
                            },
                        )
                    }
                    Err(e) => {
                        let body_done = Instant::now();
                        (
                            Err(TransportError::from(&e)),
                            ResponseTimestamps {
                                request_start,
                                headers_received,
                                body_done,
                            },
                        )
                    }
                }
            }
            Err(e) => {
                let now = Instant::now();
                (
                    Err(TransportError::from(&e)),
                    ResponseTimestamps {
                        request_start,
                        headers_received: now,
                        body_done: now,
                    },
                )
            }
        }
    })
    .await;

    let duration = probe.conn + probe.req + probe.delay + probe.res;

    match outcome {
        Ok((status_code, content_length)) => RequestResult {
            err: None,
            status_code,
            duration,
            conn_duration: probe.conn,
            dns_duration: probe.dns,
            req_duration: probe.req,
            delay_duration: probe.delay,
            res_duration: probe.res,
            content_length,
            offset,
        },
        Err(err) => RequestResult {
            err: Some(err),
            status_code: 0,
            duration,
            conn_duration: probe.conn,
            dns_duration: probe.dns,
            req_duration: probe.req,
            delay_duration: probe.delay,
            res_duration: probe.res,
            content_length: -1,
            offset,
        },
    }
}
