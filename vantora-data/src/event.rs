use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantora_instrument::{Side, Symbol};
use vantora_ta::Candle;

/// Top-of-book snapshot: best bid/ask price and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookTop {
    pub symbol: Symbol,
    pub best_bid_price: Decimal,
    pub best_bid_size: Decimal,
    pub best_ask_price: Decimal,
    pub best_ask_size: Decimal,
    pub exchange_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: Symbol,
    pub price: Decimal,
    pub quantity: Decimal,
    pub side: Side,
    pub exchange_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: Symbol,
    pub last_price: Decimal,
    pub mark_price: Decimal,
    pub index_price: Decimal,
    pub exchange_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletUpdate {
    pub asset: String,
    pub available_balance: Decimal,
    pub wallet_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
    pub avg_entry_price: Decimal,
    pub unrealized_pnl: Decimal,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ExchangeOrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub client_order_id: String,
    pub exchange_order_id: String,
    pub symbol: Symbol,
    pub status: ExchangeOrderStatus,
    pub filled_quantity: Decimal,
    pub avg_fill_price: Option<Decimal>,
}

/// Everything the Market Data Gateway can emit on its unified event stream: four public
/// topics per subscribed symbol and three account-scoped private topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    OrderBookTop(OrderBookTop),
    Trade(Trade),
    Ticker(Ticker),
    KlineClose(Candle),
    Wallet(WalletUpdate),
    Position(PositionUpdate),
    Order(OrderUpdate),
    /// Emitted when reported quota utilisation crosses the warning threshold; carried on the
    /// same stream so the Orchestrator doesn't need a second channel just for this.
    QuotaWarning { remaining: u32, limit: u32 },
}
