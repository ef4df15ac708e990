use crate::types::RiskRejection;
use chrono::{DateTime, Utc};
use vantora_instrument::Symbol;

/// A noteworthy risk event surfaced outside the journal: circuit trips and operator-visible
/// conditions the AI notification agent (read-only, per the resolved Open Question) consumes.
#[derive(Debug, Clone)]
pub enum RiskViolation {
    CircuitTripped { reason: String, at: DateTime<Utc> },
    IntentRejected { symbol: Symbol, reason: RiskRejection, at: DateTime<Utc> },
    QuotaUtilisationHigh { remaining: u32, limit: u32 },
}

/// Pluggable sink for [`RiskViolation`]s. The default implementation just logs; a
/// notification-channel implementation (Slack, email) can be substituted without touching the
/// Risk Engine itself.
pub trait RiskAlertHook: Send + Sync {
    fn on_violation(&self, violation: RiskViolation);
}

#[derive(Debug, Default)]
pub struct TracingAlertHook;

impl RiskAlertHook for TracingAlertHook {
    fn on_violation(&self, violation: RiskViolation) {
        match violation {
            RiskViolation::CircuitTripped { reason, at } => {
                tracing::error!(reason, %at, "circuit tripped");
            }
            RiskViolation::IntentRejected { symbol, reason, at } => {
                tracing::info!(%symbol, %reason, %at, "intent rejected by risk engine");
            }
            RiskViolation::QuotaUtilisationHigh { remaining, limit } => {
                tracing::warn!(remaining, limit, "rate limit quota running low");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHook(Arc<AtomicUsize>);
    impl RiskAlertHook for CountingHook {
        fn on_violation(&self, _: RiskViolation) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn custom_hook_receives_violations() {
        let count = Arc::new(AtomicUsize::new(0));
        let hook = CountingHook(Arc::clone(&count));
        hook.on_violation(RiskViolation::QuotaUtilisationHigh { remaining: 10, limit: 100 });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
