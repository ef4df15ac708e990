use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantora_execution::OrderState;
use vantora_instrument::{Side, Symbol};
use vantora_risk::{CircuitMode, RiskRejection};

/// Every fact the trading pipeline records, in the order `TickObserved -> FeaturesComputed
/// -> ModelScored* -> IntentFormed|IntentSuppressed -> RiskDecided -> OrderSubmitted?` for a
/// single tick. The journal never mutates a variant after it is appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JournalEvent {
    TickObserved { symbol: Symbol, as_of: DateTime<Utc> },
    FeaturesComputed { symbol: Symbol, complete: bool, as_of: DateTime<Utc> },
    ModelScored { model_id: String, symbol: Symbol, signal: String, confidence: Decimal, as_of: DateTime<Utc> },
    IntentFormed { symbol: Symbol, side: Side, confidence: Decimal, source_signals: Vec<String>, as_of: DateTime<Utc> },
    IntentSuppressed { symbol: Symbol, reason: String, as_of: DateTime<Utc> },
    RiskDecided { symbol: Symbol, approved: bool, reason: Option<RiskRejection>, client_order_id: Option<String>, as_of: DateTime<Utc> },
    OrderSubmitted { client_order_id: String, symbol: Symbol, side: Side, quantity: Decimal, reduce_only: bool, as_of: DateTime<Utc> },
    OrderUpdated { client_order_id: String, state: OrderState, filled_quantity: Decimal, as_of: DateTime<Utc> },
    OrderTerminal { client_order_id: String, state: OrderState, as_of: DateTime<Utc> },
    PositionUpdated { symbol: Symbol, side: Side, size: Decimal, avg_entry_price: Decimal, as_of: DateTime<Utc> },
    ReconciliationDiff { client_order_id: String, symbol: Symbol, local: OrderState, exchange: OrderState, as_of: DateTime<Utc> },
    CircuitTripped { reason: String, as_of: DateTime<Utc> },
    CircuitReset { reason: String, operator: String, as_of: DateTime<Utc> },
    ModeChanged { mode: CircuitMode, operator: Option<String>, as_of: DateTime<Utc> },
    ErrorObserved { kind: String, message: String, retryable: bool, as_of: DateTime<Utc> },
}

impl JournalEvent {
    pub fn as_of(&self) -> DateTime<Utc> {
        match self {
            JournalEvent::TickObserved { as_of, .. }
            | JournalEvent::FeaturesComputed { as_of, .. }
            | JournalEvent::ModelScored { as_of, .. }
            | JournalEvent::IntentFormed { as_of, .. }
            | JournalEvent::IntentSuppressed { as_of, .. }
            | JournalEvent::RiskDecided { as_of, .. }
            | JournalEvent::OrderSubmitted { as_of, .. }
            | JournalEvent::OrderUpdated { as_of, .. }
            | JournalEvent::OrderTerminal { as_of, .. }
            | JournalEvent::PositionUpdated { as_of, .. }
            | JournalEvent::ReconciliationDiff { as_of, .. }
            | JournalEvent::CircuitTripped { as_of, .. }
            | JournalEvent::CircuitReset { as_of, .. }
            | JournalEvent::ModeChanged { as_of, .. }
            | JournalEvent::ErrorObserved { as_of, .. } => *as_of,
        }
    }
}

/// A `JournalEvent` tagged with its position in the append-only log. Sequence numbers are
/// dense and strictly increasing for the lifetime of a journal; this is the invariant crash
/// recovery relies on to detect a truncated write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: JournalEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_through_json() {
        let event = JournalEvent::IntentFormed {
            symbol: Symbol::new("BTCUSDT", vantora_instrument::Category::Linear),
            side: Side::Buy,
            confidence: dec!(0.76),
            source_signals: vec!["model-a".to_string()],
            as_of: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let decoded: JournalEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.as_of(), event.as_of());
    }
}
