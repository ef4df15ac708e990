use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantora_instrument::{Side, Symbol};
use vantora_integration::ErrorKind;

/// Trading mode the Circuit is currently enforcing. `Paper` behaves identically to `Live` in
/// every risk check; only the OMS treats it differently (simulated fills, no exchange calls).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitMode {
    Live,
    Paper,
    Halt,
}

/// Sticky breaker state: once `daily_drawdown_tripped` or `var_tripped` flips to `true`, it
/// stays `true` until an explicit operator reset, regardless of subsequent PnL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitState {
    pub mode: CircuitMode,
    pub killed: bool,
    pub daily_drawdown_tripped: bool,
    pub var_tripped: bool,
    pub last_trip_reason: Option<String>,
    pub last_trip_at: Option<DateTime<Utc>>,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self {
            mode: CircuitMode::Live,
            killed: false,
            daily_drawdown_tripped: false,
            var_tripped: false,
            last_trip_reason: None,
            last_trip_at: None,
        }
    }
}

impl CircuitState {
    pub fn is_halted(&self) -> bool {
        self.killed || matches!(self.mode, CircuitMode::Halt)
    }

    pub fn trip(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        self.mode = CircuitMode::Halt;
        self.last_trip_reason = Some(reason.into());
        self.last_trip_at = Some(at);
    }

    pub fn reset(&mut self, mode: CircuitMode) {
        self.mode = mode;
        self.killed = false;
        self.daily_drawdown_tripped = false;
        self.var_tripped = false;
    }
}

/// A candidate trade proposed by the Signal Engine, not yet evaluated against portfolio
/// limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub symbol: Symbol,
    pub side: Side,
    pub confidence: Decimal,
    pub source_signals: Vec<String>,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Market,
    Limit,
}

/// An Intent that has cleared every risk check, sized and priced, ready for the OMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedOrder {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub entry_type: EntryType,
    pub limit_price: Option<Decimal>,
    pub stop_loss_price: Decimal,
    pub take_profit_price: Decimal,
    pub reduce_only: bool,
    pub client_order_id: String,
}

/// Why an Intent was rejected. Every variant is journaled verbatim as `RiskDecided`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRejection {
    #[error("circuit is halted or killed")]
    HaltedByCircuit,
    #[error("open position count is at the configured cap")]
    PositionCountCapExceeded,
    #[error("per-symbol notional exposure would exceed its cap")]
    PerSymbolExposureCapExceeded,
    #[error("portfolio notional exposure would exceed its cap")]
    PortfolioExposureCapExceeded,
    #[error("daily drawdown limit breached, circuit tripped")]
    DailyDrawdownTripped,
    #[error("historical VaR exceeded its limit, circuit tripped")]
    VarLimitTripped,
    #[error("intent confidence is below the configured floor")]
    ConfidenceBelowThreshold,
}

impl RiskRejection {
    /// Every rejection maps onto `ValidationRejected` except the two that double as circuit
    /// trips, which report `CircuitTripped` so the Journal and HTTP layer surface them the
    /// same way a direct operator halt would be surfaced.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RiskRejection::HaltedByCircuit
            | RiskRejection::DailyDrawdownTripped
            | RiskRejection::VarLimitTripped => ErrorKind::CircuitTripped,
            RiskRejection::PositionCountCapExceeded
            | RiskRejection::PerSymbolExposureCapExceeded
            | RiskRejection::PortfolioExposureCapExceeded
            | RiskRejection::ConfidenceBelowThreshold => ErrorKind::ValidationRejected,
        }
    }

    pub fn retryable(&self) -> bool {
        false
    }
}

/// Hard portfolio limits resolved once from `AppConfig` at startup.
#[derive(Debug, Clone)]
pub struct RiskLimits {
    pub max_positions: usize,
    pub per_symbol_cap_usd: Decimal,
    pub portfolio_cap_fraction_of_equity: Decimal,
    pub daily_loss_limit_pct: Decimal,
    pub var_limit_pct: Decimal,
    pub confidence_threshold: Decimal,
    pub max_risk_per_trade: Decimal,
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            max_positions: 5,
            per_symbol_cap_usd: dec!(10000),
            portfolio_cap_fraction_of_equity: dec!(0.5),
            daily_loss_limit_pct: dec!(0.03),
            var_limit_pct: dec!(0.05),
            confidence_threshold: dec!(0.70),
            max_risk_per_trade: dec!(0.01),
            stop_loss_pct: dec!(0.02),
            take_profit_pct: dec!(0.04),
        }
    }
}
