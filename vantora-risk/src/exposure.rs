use crate::position::PositionTracker;
use rust_decimal::Decimal;
use vantora_instrument::Symbol;

/// Evaluates the per-symbol and portfolio notional caps against a would-be fill, without
/// mutating the tracker - callers decide whether to actually submit before committing.
pub struct ExposureTracker<'a> {
    positions: &'a PositionTracker,
}

impl<'a> ExposureTracker<'a> {
    pub fn new(positions: &'a PositionTracker) -> Self {
        Self { positions }
    }

    /// Notional this symbol would carry after adding `additional_notional` to its current
    /// exposure.
    pub fn symbol_notional_after(&self, symbol: &Symbol, additional_notional: Decimal) -> Decimal {
        self.positions.symbol_notional(symbol) + additional_notional
    }

    pub fn portfolio_notional_after(&self, additional_notional: Decimal) -> Decimal {
        self.positions.total_notional() + additional_notional
    }

    pub fn exceeds_symbol_cap(&self, symbol: &Symbol, additional_notional: Decimal, cap_usd: Decimal) -> bool {
        self.symbol_notional_after(symbol, additional_notional) > cap_usd
    }

    pub fn exceeds_portfolio_cap(&self, additional_notional: Decimal, equity: Decimal, cap_fraction: Decimal) -> bool {
        self.portfolio_notional_after(additional_notional) > equity * cap_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use rust_decimal_macros::dec;
    use vantora_instrument::{Category, Side};

    #[test]
    fn symbol_cap_accounts_for_existing_exposure() {
        let mut positions = PositionTracker::new();
        let symbol = Symbol::new("BTCUSDT", Category::Linear);
        positions.upsert(Position {
            symbol: symbol.clone(),
            side: Side::Buy,
            size: dec!(50),
            avg_entry_price: dec!(100),
            unrealized_pnl: Decimal::ZERO,
            margin_used: Decimal::ZERO,
        });

        let exposure = ExposureTracker::new(&positions);
        assert!(exposure.exceeds_symbol_cap(&symbol, dec!(2000), dec!(6000)));
        assert!(!exposure.exceeds_symbol_cap(&symbol, dec!(500), dec!(6000)));
    }

    #[test]
    fn portfolio_cap_is_fraction_of_equity() {
        let positions = PositionTracker::new();
        let exposure = ExposureTracker::new(&positions);
        assert!(exposure.exceeds_portfolio_cap(dec!(6000), dec!(10000), dec!(0.5)));
        assert!(!exposure.exceeds_portfolio_cap(dec!(4000), dec!(10000), dec!(0.5)));
    }
}
