//! `Result` record: one completed request attempt (§3).

use std::time::Duration;

use crate::errors::TransportError;

/// One completed request attempt, emitted by a worker onto the result
/// channel. Owned by the channel until the aggregator consumes it.
#[derive(Debug, Clone)]
pub struct RequestResult {
    pub err: Option<TransportError>,
    pub status_code: u16,
    pub duration: Duration,
    pub conn_duration: Duration,
    pub dns_duration: Duration,
    pub req_duration: Duration,
    pub delay_duration: Duration,
    pub res_duration: Duration,
    /// Response body size in bytes, `-1` when unknown or on error.
    pub content_length: i64,
    /// Start time relative to run start.
    pub offset: Duration,
}

impl RequestResult {
    pub fn is_error(&self) -> bool {
        self.err.is_some()
    }
}
