//! Error taxonomy for the load-generation engine.
//!
//! Every per-request failure the worker pool observes is classified into one
//! of a small set of buckets so the aggregator can group them without caring
//! about the underlying transport's error representation.

use thiserror::Error;

/// A transport-level failure for a single request attempt.
///
/// Never stops a run; the worker pool converts these into `Result` records
/// with `status_code = 0` and keeps going.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("dns failure: {0}")]
    Dns(String),

    #[error("connect failure: {0}")]
    Connect(String),

    #[error("tls failure: {0}")]
    Tls(String),

    #[error("timeout")]
    Timeout,

    #[error("read/write error: {0}")]
    ReadWrite(String),

    #[error("http error: {0}")]
    Http(String),
}

impl TransportError {
    /// The string recorded under `error_dist` — the `Display` impl, which is
    /// what the reporter and CSV both key distributions by.
    pub fn dist_key(&self) -> String {
        self.to_string()
    }
}

impl From<&reqwest::Error> for TransportError {
    fn from(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return TransportError::Timeout;
        }
        if error.is_connect() {
            return TransportError::Connect(error.to_string());
        }
        if error.is_body() || error.is_decode() {
            return TransportError::ReadWrite(error.to_string());
        }

        let msg = error.to_string().to_lowercase();
        if msg.contains("certificate") || msg.contains("tls") || msg.contains("ssl") {
            TransportError::Tls(error.to_string())
        } else if msg.contains("dns") || msg.contains("resolve") || msg.contains("lookup") {
            TransportError::Dns(error.to_string())
        } else if msg.contains("connect") || msg.contains("connection") {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Http(error.to_string())
        }
    }
}

/// Errors raised while validating a `Plan` before a run ever starts.
///
/// These are caller-responsibility failures (§7): the core asserts them but
/// is not expected to recover from them mid-run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("request count must be greater than zero")]
    ZeroRequests,

    #[error("concurrency must be greater than zero")]
    ZeroConcurrency,

    #[error("concurrency ({c}) must not exceed request count ({n})")]
    ConcurrencyExceedsRequests { n: u64, c: u64 },

    #[error("invalid proxy url: {0}")]
    InvalidProxy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dist_key_matches_display() {
        let err = TransportError::Timeout;
        assert_eq!(err.dist_key(), "timeout");
    }

    #[test]
    fn plan_error_messages_name_the_offending_values() {
        let err = PlanError::ConcurrencyExceedsRequests { n: 5, c: 10 };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains("10"));
    }
}
