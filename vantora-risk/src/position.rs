use rust_decimal::Decimal;
use std::collections::HashMap;
use vantora_instrument::{Side, Symbol};

/// One open position, mutated only by fills observed from the exchange or reconciliation -
/// never derived optimistically from an order submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
    pub avg_entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub margin_used: Decimal,
}

impl Position {
    pub fn notional(&self) -> Decimal {
        self.size * self.avg_entry_price
    }
}

/// The authoritative open-position set, keyed by symbol. The Risk Engine reads this to
/// evaluate the position-count cap and per-symbol/portfolio exposure caps; the State Store is
/// the only writer.
#[derive(Debug, Default)]
pub struct PositionTracker {
    positions: HashMap<Symbol, Position>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, position: Position) {
        if position.size.is_zero() {
            self.positions.remove(&position.symbol);
        } else {
            self.positions.insert(position.symbol.clone(), position);
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn total_notional(&self) -> Decimal {
        self.positions.values().map(Position::notional).sum()
    }

    pub fn symbol_notional(&self, symbol: &Symbol) -> Decimal {
        self.positions.get(symbol).map(Position::notional).unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }
}
