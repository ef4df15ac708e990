use crate::volatility::VolatilityScaler;
use rust_decimal::Decimal;
use vantora_instrument::Side;

/// Running win-rate/payoff statistics over approved trades so far, used to derive the Kelly
/// fraction that caps position size. Updated by the OMS as trades close, not by the Risk
/// Engine itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct TradeStats {
    pub wins: u32,
    pub losses: u32,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
}

impl TradeStats {
    fn win_rate(&self) -> Decimal {
        let total = self.wins + self.losses;
        if total == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.wins) / Decimal::from(total)
    }

    /// Kelly fraction `f* = p - (1-p)/b`, where `b` is the win/loss payoff ratio. Negative or
    /// undefined values (no loss history yet, or a losing edge) clamp to zero rather than
    /// sizing up on a bad bet.
    pub fn kelly_fraction(&self) -> Decimal {
        if self.avg_loss <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let p = self.win_rate();
        let b = self.avg_win / self.avg_loss;
        if b <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (p - (Decimal::ONE - p) / b).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SizingInputs {
    pub account_equity: Decimal,
    pub max_risk_per_trade: Decimal,
    pub atr: Decimal,
    pub entry_price: Decimal,
    pub lot_size: Decimal,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct SizingResult {
    pub quantity: Decimal,
    pub stop_loss_price: Decimal,
    pub take_profit_price: Decimal,
}

/// Produces a final order size and stop/target prices from an approved Intent: base risk
/// budget, volatility-normalized, Kelly-capped, then rounded down to the exchange's lot size.
pub fn size_order(inputs: SizingInputs, side: Side, stats: TradeStats) -> SizingResult {
    let base_risk_budget = inputs.account_equity * inputs.max_risk_per_trade;

    let kelly_capped_fraction = stats.kelly_fraction().min(inputs.max_risk_per_trade);
    let risk_budget = if kelly_capped_fraction > Decimal::ZERO {
        (inputs.account_equity * kelly_capped_fraction).min(base_risk_budget)
    } else {
        base_risk_budget
    };

    let quantity = round_down_to_lot(VolatilityScaler::scale(risk_budget, inputs.atr), inputs.lot_size);

    let (stop_loss_price, take_profit_price) = match side {
        Side::Buy => (
            inputs.entry_price * (Decimal::ONE - inputs.stop_loss_pct),
            inputs.entry_price * (Decimal::ONE + inputs.take_profit_pct),
        ),
        Side::Sell => (
            inputs.entry_price * (Decimal::ONE + inputs.stop_loss_pct),
            inputs.entry_price * (Decimal::ONE - inputs.take_profit_pct),
        ),
    };

    SizingResult { quantity, stop_loss_price, take_profit_price }
}

fn round_down_to_lot(quantity: Decimal, lot_size: Decimal) -> Decimal {
    if lot_size <= Decimal::ZERO {
        return quantity;
    }
    (quantity / lot_size).floor() * lot_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn inputs() -> SizingInputs {
        SizingInputs {
            account_equity: dec!(10000),
            max_risk_per_trade: dec!(0.01),
            atr: dec!(50),
            entry_price: dec!(100),
            lot_size: dec!(0.01),
            stop_loss_pct: dec!(0.02),
            take_profit_pct: dec!(0.04),
        }
    }

    #[test]
    fn stop_and_target_straddle_entry_correctly_for_buy() {
        let result = size_order(inputs(), Side::Buy, TradeStats::default());
        assert_eq!(result.stop_loss_price, dec!(98));
        assert_eq!(result.take_profit_price, dec!(104));
    }

    #[test]
    fn stop_and_target_invert_for_sell() {
        let result = size_order(inputs(), Side::Sell, TradeStats::default());
        assert_eq!(result.stop_loss_price, dec!(102));
        assert_eq!(result.take_profit_price, dec!(96));
    }

    #[test]
    fn quantity_is_rounded_down_to_the_lot_size() {
        let result = size_order(inputs(), Side::Buy, TradeStats::default());
        let remainder = result.quantity % dec!(0.01);
        assert_eq!(remainder, Decimal::ZERO);
    }

    #[test]
    fn losing_edge_kelly_fraction_falls_back_to_base_risk_budget() {
        let stats = TradeStats { wins: 2, losses: 8, avg_win: dec!(10), avg_loss: dec!(20) };
        assert_eq!(stats.kelly_fraction(), Decimal::ZERO);
    }

    #[test]
    fn winning_edge_kelly_fraction_is_positive_but_still_capped() {
        let stats = TradeStats { wins: 8, losses: 2, avg_win: dec!(20), avg_loss: dec!(10) };
        assert!(stats.kelly_fraction() > Decimal::ZERO);
        let result = size_order(inputs(), Side::Buy, stats);
        assert!(result.quantity >= Decimal::ZERO);
    }
}
