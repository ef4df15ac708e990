use crate::event::JournalEvent;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use vantora_execution::OrderState;
use vantora_instrument::{Side, Symbol};
use vantora_risk::position::{Position, PositionTracker};
use vantora_risk::CircuitMode;

/// Minimal open-order projection the State Store exposes read-only; the authoritative copy
/// lives in `vantora_execution::OrderManager`, this mirrors it for dashboards and recovery.
#[derive(Debug, Clone)]
pub struct OpenOrderProjection {
    pub client_order_id: String,
    pub symbol: Symbol,
    pub state: OrderState,
    pub filled_quantity: Decimal,
}

/// Everything the State Store knows, rebuilt by replaying the journal from an empty state.
/// Mutated only by [`StateStore::apply`]; every other component reads through
/// [`StateStore::view`].
#[derive(Debug, Clone)]
pub struct Projections {
    pub positions: PositionTrackerSnapshot,
    pub open_orders: HashMap<String, OpenOrderProjection>,
    pub circuit_mode: CircuitMode,
    pub realized_pnl_today: Decimal,
    pub last_event_sequence: Option<u64>,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl Default for Projections {
    fn default() -> Self {
        Self {
            positions: PositionTrackerSnapshot::default(),
            open_orders: HashMap::new(),
            circuit_mode: CircuitMode::Paper,
            realized_pnl_today: Decimal::ZERO,
            last_event_sequence: None,
            last_event_at: None,
        }
    }
}

/// `PositionTracker` has no `Clone`/`Default` of its own reasonable to duplicate here, so the
/// projection keeps a plain map mirroring it; `vantora_risk::RiskEngine` reads its own
/// authoritative tracker, this one is for read-only observability.
#[derive(Debug, Clone, Default)]
pub struct PositionTrackerSnapshot {
    by_symbol: HashMap<Symbol, Position>,
}

impl PositionTrackerSnapshot {
    pub fn get(&self, symbol: &Symbol) -> Option<&Position> {
        self.by_symbol.get(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.by_symbol.values()
    }

    pub fn open_count(&self) -> usize {
        self.by_symbol.len()
    }

    fn upsert(&mut self, position: Position) {
        if position.size.is_zero() {
            self.by_symbol.remove(&position.symbol);
        } else {
            self.by_symbol.insert(position.symbol.clone(), position);
        }
    }

    pub fn to_tracker(&self) -> PositionTracker {
        let mut tracker = PositionTracker::new();
        for position in self.by_symbol.values() {
            tracker.upsert(position.clone());
        }
        tracker
    }
}

/// Single-writer projection store: [`StateStore::apply`] is the only function that mutates
/// `Projections`. Readers take a cheap `Arc` snapshot via [`StateStore::view`] and never see
/// a partially-applied event.
pub struct StateStore {
    current: parking_lot::RwLock<Arc<Projections>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self { current: parking_lot::RwLock::new(Arc::new(Projections::default())) }
    }

    pub fn view(&self) -> Arc<Projections> {
        self.current.read().clone()
    }

    /// Rebuilds projections from a full journal replay, applying events in order. Used once
    /// at startup before the Orchestrator accepts commands.
    pub fn rebuild(&self, events: impl IntoIterator<Item = (u64, DateTime<Utc>, JournalEvent)>) {
        let mut projections = Projections::default();
        for (sequence, recorded_at, event) in events {
            apply(&mut projections, &event);
            projections.last_event_sequence = Some(sequence);
            projections.last_event_at = Some(recorded_at);
        }
        *self.current.write() = Arc::new(projections);
    }

    pub fn apply(&self, sequence: u64, recorded_at: DateTime<Utc>, event: &JournalEvent) {
        let mut guard = self.current.write();
        let mut projections = (**guard).clone();
        apply(&mut projections, event);
        projections.last_event_sequence = Some(sequence);
        projections.last_event_at = Some(recorded_at);
        *guard = Arc::new(projections);
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply(projections: &mut Projections, event: &JournalEvent) {
    match event {
        JournalEvent::PositionUpdated { symbol, side, size, avg_entry_price, .. } => {
            projections.positions.upsert(Position {
                symbol: symbol.clone(),
                side: *side,
                size: *size,
                avg_entry_price: *avg_entry_price,
                unrealized_pnl: Decimal::ZERO,
                margin_used: Decimal::ZERO,
            });
        }
        JournalEvent::OrderSubmitted { client_order_id, symbol, .. } => {
            projections.open_orders.insert(
                client_order_id.clone(),
                OpenOrderProjection {
                    client_order_id: client_order_id.clone(),
                    symbol: symbol.clone(),
                    state: OrderState::Submitted,
                    filled_quantity: Decimal::ZERO,
                },
            );
        }
        JournalEvent::OrderUpdated { client_order_id, state, filled_quantity, .. } => {
            if let Some(order) = projections.open_orders.get_mut(client_order_id) {
                order.state = *state;
                order.filled_quantity = *filled_quantity;
            }
        }
        JournalEvent::OrderTerminal { client_order_id, state, .. } => {
            if let Some(order) = projections.open_orders.get_mut(client_order_id) {
                order.state = *state;
            }
            projections.open_orders.remove(client_order_id);
        }
        JournalEvent::ReconciliationDiff { client_order_id, exchange, .. } => {
            if let Some(order) = projections.open_orders.get_mut(client_order_id) {
                order.state = *exchange;
            }
        }
        JournalEvent::ModeChanged { mode, .. } => {
            projections.circuit_mode = *mode;
        }
        JournalEvent::CircuitTripped { .. } => {
            projections.circuit_mode = CircuitMode::Halt;
        }
        JournalEvent::CircuitReset { .. } => {
            projections.circuit_mode = CircuitMode::Paper;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use vantora_instrument::Category;

    fn symbol() -> Symbol {
        Symbol::new("BTCUSDT", Category::Linear)
    }

    #[test]
    fn position_updated_then_flattened_removes_the_position() {
        let store = StateStore::new();
        let now = Utc::now();
        store.apply(0, now, &JournalEvent::PositionUpdated { symbol: symbol(), side: Side::Buy, size: dec!(1), avg_entry_price: dec!(100), as_of: now });
        assert_eq!(store.view().positions.open_count(), 1);

        store.apply(1, now, &JournalEvent::PositionUpdated { symbol: symbol(), side: Side::Buy, size: dec!(0), avg_entry_price: dec!(100), as_of: now });
        assert_eq!(store.view().positions.open_count(), 0);
    }

    #[test]
    fn order_submitted_then_terminal_clears_the_open_order_projection() {
        let store = StateStore::new();
        let now = Utc::now();
        store.apply(0, now, &JournalEvent::OrderSubmitted { client_order_id: "a".into(), symbol: symbol(), side: Side::Buy, quantity: dec!(1), reduce_only: false, as_of: now });
        assert_eq!(store.view().open_orders.len(), 1);

        store.apply(1, now, &JournalEvent::OrderTerminal { client_order_id: "a".into(), state: OrderState::Filled, as_of: now });
        assert!(store.view().open_orders.is_empty());
    }

    #[test]
    fn rebuild_from_a_full_replay_matches_incremental_apply() {
        let store = StateStore::new();
        let now = Utc::now();
        let events = vec![
            (0u64, now, JournalEvent::PositionUpdated { symbol: symbol(), side: Side::Buy, size: dec!(2), avg_entry_price: dec!(100), as_of: now }),
            (1u64, now, JournalEvent::CircuitTripped { reason: "var_exceeded".into(), as_of: now }),
        ];
        store.rebuild(events);
        let view = store.view();
        assert_eq!(view.positions.open_count(), 1);
        assert_eq!(view.circuit_mode, CircuitMode::Halt);
        assert_eq!(view.last_event_sequence, Some(1));
    }
}
