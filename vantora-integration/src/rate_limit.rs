use crate::clock::EngineClock;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Relative priority of a queued request. Cancel requests jump the REST queue ahead of new
/// order placement, which in turn jumps ahead of best-effort reads like balance polling.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Priority {
    Background = 0,
    Normal = 1,
    CancelOrder = 2,
}

#[derive(Debug)]
struct Ticket {
    priority: Priority,
    sequence: u64,
}

impl PartialEq for Ticket {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for Ticket {}

impl Ord for Ticket {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Higher priority first; for equal priority, earlier sequence (FIFO) first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
impl PartialOrd for Ticket {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Exchange-reported quota remaining after the most recent request, read from response
/// headers (`X-Bapi-Limit-Status`, `X-Bapi-Limit`) and fed back into the limiter so it can
/// widen its interval before the exchange itself starts rejecting requests.
#[derive(Debug, Clone, Copy)]
pub struct QuotaStatus {
    pub remaining: u32,
    pub limit: u32,
}

impl QuotaStatus {
    fn utilisation(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        1.0 - (self.remaining as f64 / self.limit as f64)
    }
}

/// Token-bucket rate limiter with a priority queue for ordering waiters and adaptive
/// backoff driven by exchange-reported quota headers.
///
/// The base interval is doubled each time reported utilisation crosses
/// [`RateLimiter::WARN_UTILISATION`] (70%, matching the exchange's own soft-throttle point)
/// and halved back towards the configured floor once utilisation drops again, so a hot
/// symbol doesn't permanently pay the backed-off rate.
pub struct RateLimiter<C> {
    clock: Arc<C>,
    base_interval: Duration,
    current_interval: parking_lot::Mutex<Duration>,
    max_interval: Duration,
    queue: parking_lot::Mutex<BinaryHeap<Ticket>>,
    sequence: std::sync::atomic::AtomicU64,
}

impl<C: EngineClock> RateLimiter<C> {
    pub const WARN_UTILISATION: f64 = 0.70;

    pub fn new(clock: Arc<C>, base_interval: Duration, max_interval: Duration) -> Self {
        Self {
            clock,
            base_interval,
            current_interval: parking_lot::Mutex::new(base_interval),
            max_interval,
            queue: parking_lot::Mutex::new(BinaryHeap::new()),
            sequence: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Register a waiter and return its ticket ordering relative to others currently queued.
    /// Callers use the returned rank purely for diagnostics; actual gating is via
    /// [`RateLimiter::current_interval`].
    pub fn enqueue(&self, priority: Priority) -> u64 {
        let sequence = self.sequence.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.queue.lock().push(Ticket { priority, sequence });
        sequence
    }

    pub fn dequeue(&self) {
        self.queue.lock().pop();
    }

    pub fn current_interval(&self) -> Duration {
        *self.current_interval.lock()
    }

    /// Feed back the quota reported by the most recent response, widening or narrowing the
    /// interval in response to observed utilisation.
    pub fn observe(&self, status: QuotaStatus) {
        let utilisation = status.utilisation();
        let mut interval = self.current_interval.lock();

        if utilisation >= Self::WARN_UTILISATION {
            let widened = (*interval * 2).min(self.max_interval);
            if widened != *interval {
                warn!(
                    utilisation,
                    remaining = status.remaining,
                    limit = status.limit,
                    widened_to_ms = widened.as_millis(),
                    "rate limit utilisation crossed warning threshold, backing off"
                );
            }
            *interval = widened;
        } else if *interval > self.base_interval {
            *interval = (*interval / 2).max(self.base_interval);
        }
    }

    pub fn record_failure(&self) {
        let mut interval = self.current_interval.lock();
        *interval = (*interval * 2).min(self.max_interval);
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use chrono::Utc;

    fn limiter() -> RateLimiter<TestClock> {
        RateLimiter::new(
            Arc::new(TestClock::new(Utc::now())),
            Duration::from_millis(100),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn cancel_order_outranks_normal_and_background() {
        let limiter = limiter();
        limiter.enqueue(Priority::Background);
        limiter.enqueue(Priority::Normal);
        limiter.enqueue(Priority::CancelOrder);

        let top = limiter.queue.lock().peek().unwrap().priority;
        assert_eq!(top, Priority::CancelOrder);
    }

    #[test]
    fn high_utilisation_doubles_interval_up_to_cap() {
        let limiter = limiter();
        assert_eq!(limiter.current_interval(), Duration::from_millis(100));

        limiter.observe(QuotaStatus { remaining: 20, limit: 100 });
        assert_eq!(limiter.current_interval(), Duration::from_millis(200));

        for _ in 0..10 {
            limiter.observe(QuotaStatus { remaining: 20, limit: 100 });
        }
        assert_eq!(limiter.current_interval(), Duration::from_secs(5));
    }

    #[test]
    fn low_utilisation_relaxes_interval_back_to_base() {
        let limiter = limiter();
        limiter.observe(QuotaStatus { remaining: 10, limit: 100 });
        assert!(limiter.current_interval() > Duration::from_millis(100));

        for _ in 0..10 {
            limiter.observe(QuotaStatus { remaining: 90, limit: 100 });
        }
        assert_eq!(limiter.current_interval(), Duration::from_millis(100));
    }
}
