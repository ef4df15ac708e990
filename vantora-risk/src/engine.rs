use crate::alert::{RiskAlertHook, RiskViolation};
use crate::drawdown::DailyDrawdownTracker;
use crate::exposure::ExposureTracker;
use crate::position::PositionTracker;
use crate::sizing::{size_order, SizingInputs, TradeStats};
use crate::types::{ApprovedOrder, CircuitMode, CircuitState, EntryType, Intent, RiskLimits, RiskRejection};
use crate::var::ReturnsWindow;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use vantora_integration::clock::EngineClock;

/// Per-candle market context the Risk Engine needs but does not own: current price, ATR and
/// exchange lot size for the symbol under evaluation.
#[derive(Debug, Clone, Copy)]
pub struct MarketContext {
    pub entry_price: Decimal,
    pub atr: Decimal,
    pub lot_size: Decimal,
}

/// Account-level state the Risk Engine needs for sizing and exposure checks but that the
/// State Store, not the engine, owns.
#[derive(Debug, Clone, Copy)]
pub struct AccountState {
    pub equity: Decimal,
    pub realized_plus_unrealized_pnl_today: Decimal,
}

/// Evaluates Intents against portfolio limits and circuit breakers, producing an
/// [`ApprovedOrder`] or a typed [`RiskRejection`]. Owns the mutable risk state
/// (`CircuitState`, the drawdown tracker, the VaR returns window) behind a mutex since checks
/// and trips must be atomic with respect to each other.
pub struct RiskEngine<C> {
    limits: RiskLimits,
    clock: Arc<C>,
    circuit: Mutex<CircuitState>,
    drawdown: Mutex<DailyDrawdownTracker<C>>,
    returns: Mutex<ReturnsWindow>,
    stats: Mutex<TradeStats>,
    alert_hook: Arc<dyn RiskAlertHook>,
    idempotency_bucket_secs: i64,
}

impl<C: EngineClock> RiskEngine<C> {
    pub fn new(
        limits: RiskLimits,
        clock: Arc<C>,
        opening_equity: Decimal,
        returns_window_capacity: usize,
        alert_hook: Arc<dyn RiskAlertHook>,
        idempotency_bucket_secs: i64,
    ) -> Self {
        let drawdown = DailyDrawdownTracker::new(Arc::clone(&clock), opening_equity);
        Self {
            limits,
            clock,
            circuit: Mutex::new(CircuitState::default()),
            drawdown: Mutex::new(drawdown),
            returns: Mutex::new(ReturnsWindow::new(returns_window_capacity)),
            stats: Mutex::new(TradeStats::default()),
            alert_hook,
            idempotency_bucket_secs,
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit.lock().clone()
    }

    pub fn reset_circuit(&self, mode: CircuitMode) {
        self.circuit.lock().reset(mode);
    }

    pub fn trip_circuit(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let at = self.clock.now();
        self.circuit.lock().trip(reason.clone(), at);
        self.alert_hook.on_violation(RiskViolation::CircuitTripped { reason, at });
    }

    pub fn record_daily_pnl(&self, account: AccountState) {
        self.drawdown.lock().record_pnl(account.realized_plus_unrealized_pnl_today, account.equity);
    }

    pub fn record_daily_return(&self, daily_return: Decimal) {
        self.returns.lock().push(daily_return);
    }

    pub fn record_trade_outcome(&self, pnl: Decimal) {
        let mut stats = self.stats.lock();
        if pnl > Decimal::ZERO {
            stats.wins += 1;
            stats.avg_win = weighted_average(stats.avg_win, stats.wins.saturating_sub(1), pnl);
        } else if pnl < Decimal::ZERO {
            stats.losses += 1;
            stats.avg_loss = weighted_average(stats.avg_loss, stats.losses.saturating_sub(1), -pnl);
        }
    }

    pub fn evaluate(
        &self,
        intent: &Intent,
        strategy_id: &str,
        positions: &PositionTracker,
        account: AccountState,
        market: MarketContext,
    ) -> Result<ApprovedOrder, RiskRejection> {
        let rejection = self.check(intent, positions, account, market);
        if let Err(reason) = rejection {
            self.alert_hook.on_violation(RiskViolation::IntentRejected {
                symbol: intent.symbol.clone(),
                reason,
                at: self.clock.now(),
            });
            return Err(reason);
        }

        let sizing = size_order(
            SizingInputs {
                account_equity: account.equity,
                max_risk_per_trade: self.limits.max_risk_per_trade,
                atr: market.atr,
                entry_price: market.entry_price,
                lot_size: market.lot_size,
                stop_loss_pct: self.limits.stop_loss_pct,
                take_profit_pct: self.limits.take_profit_pct,
            },
            intent.side,
            *self.stats.lock(),
        );

        Ok(ApprovedOrder {
            symbol: intent.symbol.clone(),
            side: intent.side,
            quantity: sizing.quantity,
            entry_type: EntryType::Market,
            limit_price: None,
            stop_loss_price: sizing.stop_loss_price,
            take_profit_price: sizing.take_profit_price,
            reduce_only: false,
            client_order_id: idempotency_key(strategy_id, intent, self.idempotency_bucket_secs),
        })
    }

    fn estimate_quantity(&self, account: AccountState, market: MarketContext) -> Decimal {
        let budget = account.equity * self.limits.max_risk_per_trade;
        crate::volatility::VolatilityScaler::scale(budget, market.atr)
    }

    fn check(
        &self,
        intent: &Intent,
        positions: &PositionTracker,
        account: AccountState,
        market: MarketContext,
    ) -> Result<(), RiskRejection> {
        if self.circuit.lock().is_halted() {
            return Err(RiskRejection::HaltedByCircuit);
        }

        if positions.open_count() >= self.limits.max_positions && positions.get(&intent.symbol).is_none() {
            return Err(RiskRejection::PositionCountCapExceeded);
        }

        let additional_notional = market.entry_price * self.estimate_quantity(account, market);
        let exposure = ExposureTracker::new(positions);

        if exposure.exceeds_symbol_cap(&intent.symbol, additional_notional, self.limits.per_symbol_cap_usd) {
            return Err(RiskRejection::PerSymbolExposureCapExceeded);
        }

        if exposure.exceeds_portfolio_cap(additional_notional, account.equity, self.limits.portfolio_cap_fraction_of_equity) {
            return Err(RiskRejection::PortfolioExposureCapExceeded);
        }

        self.record_daily_pnl(account);
        if self.drawdown.lock().is_tripped(self.limits.daily_loss_limit_pct) {
            self.trip_circuit("daily drawdown limit breached");
            return Err(RiskRejection::DailyDrawdownTripped);
        }

        if let Some(var) = self.returns.lock().historical_var(Decimal::new(99, 2)) {
            if var > self.limits.var_limit_pct {
                self.trip_circuit("historical VaR exceeded limit");
                return Err(RiskRejection::VarLimitTripped);
            }
        }

        if intent.confidence < self.limits.confidence_threshold {
            return Err(RiskRejection::ConfidenceBelowThreshold);
        }

        Ok(())
    }
}

fn weighted_average(current: Decimal, prior_count: u32, new_value: Decimal) -> Decimal {
    let prior_count = Decimal::from(prior_count);
    (current * prior_count + new_value) / (prior_count + Decimal::ONE)
}

/// Deterministic `clientOrderId`: `(strategyId, symbol, side, asOf)`, with `asOf` bucketed to
/// `bucket_secs` so retries of the same tick produce the same id.
fn idempotency_key(strategy_id: &str, intent: &Intent, bucket_secs: i64) -> String {
    let bucket = bucketed_timestamp(intent.as_of, bucket_secs);
    format!("{strategy_id}:{}:{}:{bucket}", intent.symbol, intent.side)
}

fn bucketed_timestamp(at: DateTime<Utc>, bucket_secs: i64) -> i64 {
    if bucket_secs <= 0 {
        return at.timestamp();
    }
    (at.timestamp() / bucket_secs) * bucket_secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::TracingAlertHook;
    use rust_decimal_macros::dec;
    use vantora_instrument::{Category, Side, Symbol};
    use vantora_integration::clock::TestClock;

    fn engine() -> RiskEngine<TestClock> {
        RiskEngine::new(
            RiskLimits::default(),
            Arc::new(TestClock::new(Utc::now())),
            dec!(10000),
            250,
            Arc::new(TracingAlertHook),
            60,
        )
    }

    fn intent() -> Intent {
        Intent {
            symbol: Symbol::new("BTCUSDT", Category::Linear),
            side: Side::Buy,
            confidence: dec!(0.80),
            source_signals: vec!["model-a".to_string()],
            as_of: Utc::now(),
        }
    }

    fn market() -> MarketContext {
        MarketContext { entry_price: dec!(50000), atr: dec!(500), lot_size: dec!(0.001) }
    }

    fn account() -> AccountState {
        AccountState { equity: dec!(10000), realized_plus_unrealized_pnl_today: Decimal::ZERO }
    }

    #[test]
    fn halted_circuit_rejects_every_intent() {
        let engine = engine();
        engine.trip_circuit("manual test trip");
        let positions = PositionTracker::new();
        let result = engine.evaluate(&intent(), "strategy-1", &positions, account(), market());
        assert_eq!(result.unwrap_err(), RiskRejection::HaltedByCircuit);
    }

    #[test]
    fn low_confidence_intent_is_rejected() {
        let engine = engine();
        let positions = PositionTracker::new();
        let mut low_confidence = intent();
        low_confidence.confidence = dec!(0.10);
        let result = engine.evaluate(&low_confidence, "strategy-1", &positions, account(), market());
        assert_eq!(result.unwrap_err(), RiskRejection::ConfidenceBelowThreshold);
    }

    #[test]
    fn approved_order_carries_a_deterministic_client_order_id_for_repeated_ticks() {
        let engine = engine();
        let positions = PositionTracker::new();
        let fixed_intent = intent();

        let first = engine.evaluate(&fixed_intent, "strategy-1", &positions, account(), market()).unwrap();
        let second = engine.evaluate(&fixed_intent, "strategy-1", &positions, account(), market()).unwrap();
        assert_eq!(first.client_order_id, second.client_order_id);
    }

    #[test]
    fn daily_drawdown_breach_trips_circuit_and_rejects() {
        let engine = engine();
        let positions = PositionTracker::new();
        let mut losing_account = account();
        losing_account.realized_plus_unrealized_pnl_today = dec!(-500);

        let result = engine.evaluate(&intent(), "strategy-1", &positions, losing_account, market());
        assert_eq!(result.unwrap_err(), RiskRejection::DailyDrawdownTripped);
        assert!(engine.circuit_state().is_halted());
    }
}
