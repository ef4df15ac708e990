use crate::clock::EngineClock;
use std::sync::Arc;
use std::time::Duration;

/// Health of a single WebSocket connection as observed by the gateway's read loop, exposed
/// over the operator HTTP surface as part of `GET /status`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConnectionHealth {
    Connecting,
    Connected,
    /// Disconnected and waiting out the backoff interval before the next attempt.
    Reconnecting { attempt: u32 },
    /// Exceeded the configured retry budget; requires operator intervention.
    Failed,
}

/// Pure, deterministic exponential-backoff policy for WebSocket reconnects.
///
/// Kept free of any actual I/O so it can be unit tested without a network: given an attempt
/// count it returns the delay to wait before the next attempt, doubling from `base` up to
/// `max`, with the result perturbed by up to 20% jitter to avoid every instrument reconnecting
/// in lockstep after a shared network blip.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base: Duration,
    max: Duration,
    max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, max: Duration, max_attempts: Option<u32>) -> Self {
        Self { base, max, max_attempts }
    }

    /// Delay before attempt number `attempt` (1-indexed), or `None` if the retry budget is
    /// exhausted and the caller should transition to [`ConnectionHealth::Failed`].
    pub fn delay_for(&self, attempt: u32, jitter_fraction: f64) -> Option<Duration> {
        if let Some(max_attempts) = self.max_attempts {
            if attempt > max_attempts {
                return None;
            }
        }

        let exponent = attempt.saturating_sub(1).min(16);
        let scaled = self.base.as_millis().saturating_mul(1u128 << exponent);
        let capped = scaled.min(self.max.as_millis());

        let jitter_fraction = jitter_fraction.clamp(0.0, 1.0);
        let jittered = (capped as f64 * (1.0 + (jitter_fraction - 0.5) * 0.4)) as u64;

        Some(Duration::from_millis(jittered.max(1)))
    }
}

/// Drives the reconnect state machine for one WebSocket connection: tracks attempt count and
/// reports [`ConnectionHealth`], delegating actual delay computation to [`ReconnectPolicy`]
/// and actual time to an [`EngineClock`] so both are swappable in tests.
pub struct ReconnectState<C> {
    policy: ReconnectPolicy,
    clock: Arc<C>,
    attempt: u32,
    health: ConnectionHealth,
}

impl<C: EngineClock> ReconnectState<C> {
    pub fn new(policy: ReconnectPolicy, clock: Arc<C>) -> Self {
        Self { policy, clock, attempt: 0, health: ConnectionHealth::Connecting }
    }

    pub fn health(&self) -> ConnectionHealth {
        self.health
    }

    pub fn on_connected(&mut self) {
        self.attempt = 0;
        self.health = ConnectionHealth::Connected;
    }

    /// Record a disconnect and compute the next delay, or transition to `Failed` if the
    /// retry budget is exhausted.
    pub fn on_disconnected(&mut self, jitter_fraction: f64) -> Option<Duration> {
        self.attempt += 1;
        match self.policy.delay_for(self.attempt, jitter_fraction) {
            Some(delay) => {
                self.health = ConnectionHealth::Reconnecting { attempt: self.attempt };
                Some(delay)
            }
            None => {
                self.health = ConnectionHealth::Failed;
                None
            }
        }
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}

/// Heartbeat cadence for a private WebSocket connection: the exchange expects a `ping` frame
/// at a fixed interval and disconnects idle connections otherwise.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub pong_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(10),
        }
    }
}
