//! CLI layer (ambient, not core): parses flags into a `Plan` and a canonical
//! request. Kept entirely outside `heyrs::*` — the core never depends on
//! `clap`.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::Parser;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};

use heyrs::{Budget, Canonical, OutputMode, Plan, RequestFactory, StaticRequestFactory, TransportOptions};

/// An HTTP load generator.
#[derive(Parser, Debug)]
#[command(name = "heyrs", about = "HTTP load generator")]
pub struct Args {
    /// Number of requests to run (mutually exclusive with -z).
    #[arg(short = 'n', default_value_t = 200)]
    pub n: u64,

    /// Number of workers to run concurrently.
    #[arg(short = 'c', default_value_t = 50)]
    pub c: u64,

    /// Rate limit, in queries per second, per worker. 0 = no limit.
    #[arg(short = 'q', default_value_t = 0.0)]
    pub qps: f64,

    /// Duration of the run, e.g. "10s", "3m". Overrides -n when set.
    #[arg(short = 'z')]
    pub duration: Option<String>,

    /// HTTP method.
    #[arg(short = 'm', default_value = "GET")]
    pub method: String,

    /// Request body.
    #[arg(short = 'd')]
    pub body: Option<String>,

    /// Path to a file whose contents are used as the request body.
    #[arg(short = 'D')]
    pub body_file: Option<String>,

    /// Content-Type header value.
    #[arg(short = 'T', default_value = "text/html")]
    pub content_type: String,

    /// Extra header, "Key: Value". May be repeated.
    #[arg(short = 'H')]
    pub headers: Vec<String>,

    /// Basic auth, "user:pass".
    #[arg(short = 'a')]
    pub basic_auth: Option<String>,

    /// HTTP proxy URL.
    #[arg(short = 'x')]
    pub proxy: Option<String>,

    /// Request timeout in seconds. 0 = none.
    #[arg(short = 't', default_value_t = 0)]
    pub timeout_secs: u64,

    /// Disable compression.
    #[arg(long = "disable-compression")]
    pub disable_compression: bool,

    /// Disable keep-alive connection reuse.
    #[arg(long = "disable-keepalive")]
    pub disable_keepalive: bool,

    /// Disable following redirects.
    #[arg(long = "disable-redirects")]
    pub disable_redirects: bool,

    /// Enable HTTP/2.
    #[arg(long = "h2")]
    pub h2: bool,

    /// Skip TLS certificate verification.
    #[arg(short = 'k')]
    pub insecure: bool,

    /// Output mode: "summary" or "csv".
    #[arg(short = 'o', default_value = "summary")]
    pub output: String,

    /// Record per-stage timing even in CSV mode.
    #[arg(long = "trace")]
    pub trace: bool,

    /// Target URL.
    pub url: String,
}

/// Assembles the `Plan` and canonical request this crate's core consumes.
/// Mirrors the validation and header/body/auth construction a real CLI
/// front end performs before ever touching the engine.
pub fn build(args: &Args) -> Result<(Plan, Arc<dyn RequestFactory>), Box<dyn std::error::Error>> {
    let url = Url::parse(&args.url)?;
    let method = args.method.parse::<Method>()?;

    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_str(&args.content_type)?,
    );
    for raw in &args.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("invalid header, expected 'Key: Value': {raw}"))?;
        headers.insert(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    if let Some(creds) = &args.basic_auth {
        let encoded = BASE64.encode(creds.as_bytes());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}"))?,
        );
    }

    let body = match (&args.body, &args.body_file) {
        (Some(_), Some(_)) => return Err("-d and -D are mutually exclusive".into()),
        (Some(inline), None) => Some(bytes::Bytes::from(inline.clone().into_bytes())),
        (None, Some(path)) => Some(bytes::Bytes::from(fs::read(path)?)),
        (None, None) => None,
    };

    let canonical = Canonical::new(method, url, headers, body);
    let factory: Arc<dyn RequestFactory> = Arc::new(StaticRequestFactory::new(canonical));

    let budget = match &args.duration {
        Some(raw) => Budget::Duration(parse_duration(raw)?),
        None => Budget::Count(args.n),
    };

    let output_mode = match args.output.as_str() {
        "csv" => OutputMode::Csv,
        "summary" | "" => OutputMode::Summary,
        other => return Err(format!("unknown output mode: {other}").into()),
    };

    let plan = Plan {
        budget,
        concurrency: args.c,
        qps_per_worker: args.qps,
        request_timeout: Duration::from_secs(args.timeout_secs),
        transport_options: TransportOptions {
            insecure_skip_verify: args.insecure,
            disable_keepalives: args.disable_keepalive,
            disable_compression: args.disable_compression,
            disable_redirects: args.disable_redirects,
            enable_h2: args.h2,
            proxy_url: args.proxy.clone(),
        },
        output_mode,
        trace_enabled: args.trace || output_mode == OutputMode::Summary,
    };
    plan.validate()?;

    Ok((plan, factory))
}

/// Parses a Go-`time.ParseDuration`-flavored string ("500ms", "10s", "3m").
/// Supports the handful of unit suffixes load-test durations actually use.
fn parse_duration(raw: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let raw = raw.trim();
    let (value, unit) = raw
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|idx| raw.split_at(idx))
        .ok_or_else(|| format!("duration missing unit: {raw}"))?;
    let value: f64 = value.parse()?;

    let secs = match unit {
        "ms" => value / 1000.0,
        "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unknown duration unit: {other}").into()),
    };
    Ok(Duration::from_secs_f64(secs))
}
