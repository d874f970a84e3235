//! Rate limiter: per-worker QPS pacing (§4.4).

use tokio::time::{interval, Duration, Interval, MissedTickBehavior};

/// Paces a single worker's request issuance to `qps` ticks per second.
/// `qps == 0.0` means unlimited — every wait resolves immediately.
///
/// Ticks are not saved up: `MissedTickBehavior::Delay` means a worker that
/// falls behind (a slow request ran long) does not get to fire a burst of
/// catch-up ticks; it just loses the slots it couldn't consume.
pub enum RateLimiter {
    Unlimited,
    Paced(Box<Interval>),
}

impl RateLimiter {
    pub fn new(qps: f64) -> Self {
        if qps <= 0.0 {
            return RateLimiter::Unlimited;
        }
        let period = Duration::from_secs_f64(1.0 / qps);
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        RateLimiter::Paced(Box::new(tick))
    }

    /// Waits for the next admission tick. Immediate for `Unlimited`.
    pub async fn tick(&mut self) {
        if let RateLimiter::Paced(interval) = self {
            interval.tick().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn unlimited_never_waits() {
        let mut limiter = RateLimiter::new(0.0);
        let start = Instant::now();
        for _ in 0..1000 {
            limiter.tick().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn paced_limiter_spaces_ticks_by_the_period() {
        let mut limiter = RateLimiter::new(10.0);
        limiter.tick().await; // first tick fires immediately
        let start = Instant::now();
        limiter.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }
}
