//! Plan: the immutable, frozen configuration for a single run.

use std::time::Duration;

use crate::errors::PlanError;

/// Either a fixed request count or a wall-clock budget. `duration` wins when
/// both are supplied by a caller; this type makes that impossible to express
/// by construction instead of by runtime precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Count(u64),
    Duration(Duration),
}

/// HTTP transport behavior, independent of the target request itself.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    pub insecure_skip_verify: bool,
    pub disable_keepalives: bool,
    pub disable_compression: bool,
    pub disable_redirects: bool,
    pub enable_h2: bool,
    pub proxy_url: Option<String>,
}

/// How the reporter should render the finalized snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Summary,
    Csv,
}

/// Immutable configuration for one run. Constructed by an external
/// collaborator (the CLI layer in this crate) and frozen before
/// `Controller::run` takes ownership of it.
#[derive(Debug, Clone)]
pub struct Plan {
    pub budget: Budget,
    pub concurrency: u64,
    pub qps_per_worker: f64,
    pub request_timeout: Duration,
    pub transport_options: TransportOptions,
    pub output_mode: OutputMode,
    pub trace_enabled: bool,
}

impl Plan {
    /// Validate the caller-responsibility invariants from §7: nonzero count,
    /// nonzero concurrency, and concurrency not exceeding a bounded count.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.concurrency == 0 {
            return Err(PlanError::ZeroConcurrency);
        }
        if let Budget::Count(n) = self.budget {
            if n == 0 {
                return Err(PlanError::ZeroRequests);
            }
            if self.concurrency > n {
                return Err(PlanError::ConcurrencyExceedsRequests {
                    n,
                    c: self.concurrency,
                });
            }
        }
        Ok(())
    }

    /// Requests each worker is responsible for, when the plan is count
    /// bounded: `⌊n/c⌋`, the remainder `n mod c` intentionally dropped.
    pub fn requests_per_worker(&self) -> Option<u64> {
        match self.budget {
            Budget::Count(n) => Some(n / self.concurrency),
            Budget::Duration(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_plan(budget: Budget, concurrency: u64) -> Plan {
        Plan {
            budget,
            concurrency,
            qps_per_worker: 0.0,
            request_timeout: Duration::ZERO,
            transport_options: TransportOptions::default(),
            output_mode: OutputMode::Summary,
            trace_enabled: true,
        }
    }

    #[test]
    fn rejects_zero_concurrency() {
        let plan = base_plan(Budget::Count(10), 0);
        assert_eq!(plan.validate(), Err(PlanError::ZeroConcurrency));
    }

    #[test]
    fn rejects_zero_requests() {
        let plan = base_plan(Budget::Count(0), 2);
        assert_eq!(plan.validate(), Err(PlanError::ZeroRequests));
    }

    #[test]
    fn rejects_concurrency_above_count() {
        let plan = base_plan(Budget::Count(5), 10);
        assert_eq!(
            plan.validate(),
            Err(PlanError::ConcurrencyExceedsRequests { n: 5, c: 10 })
        );
    }

    #[test]
    fn duration_plans_skip_the_count_checks() {
        let plan = base_plan(Budget::Duration(Duration::from_millis(500)), 100);
        assert!(plan.validate().is_ok());
        assert_eq!(plan.requests_per_worker(), None);
    }

    #[test]
    fn per_worker_share_drops_the_remainder() {
        let plan = base_plan(Budget::Count(20), 3);
        assert_eq!(plan.requests_per_worker(), Some(6));
    }
}
