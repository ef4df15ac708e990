use crate::error::ExecutionError;
use crate::requests::{
    AmendOrderBody, AmendOrderRequest, CancelAllBody, CancelAllRequest, CancelOrderBody, CancelOrderRequest,
    CreateOrderRequest, OpenOrdersQuery, OpenOrdersRequest, OpenOrdersResult, PositionListQuery, PositionListRequest,
    PositionListResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use vantora_data::event::{ExchangeOrderStatus, MarketEvent, OrderUpdate, PositionUpdate};
use vantora_data::RestClient;
use vantora_instrument::{Category, Side, Symbol};
use vantora_integration::channel::{Tx, UnboundedTx};
use vantora_integration::clock::EngineClock;
use vantora_integration::rate_limit::Priority;
use vantora_integration::signer::Signer;
use vantora_risk::{ApprovedOrder, EntryType};

fn category_str(category: Category) -> &'static str {
    match category {
        Category::Linear => "linear",
        Category::Inverse => "inverse",
        Category::Spot => "spot",
        Category::Option => "option",
    }
}

/// What the OMS needs from a venue, abstracted so the rest of the OMS is identical whether
/// it is trading for real or running against the paper simulator.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn submit(&self, approved: &ApprovedOrder) -> Result<String, ExecutionError>;
    async fn amend(&self, symbol: &Symbol, client_order_id: &str, qty: Option<Decimal>, price: Option<Decimal>) -> Result<(), ExecutionError>;
    async fn cancel(&self, symbol: &Symbol, client_order_id: &str) -> Result<(), ExecutionError>;
    async fn cancel_all(&self, category: Category, symbol: Option<&Symbol>) -> Result<(), ExecutionError>;
    async fn list_open_orders(&self, category: Category) -> Result<OpenOrdersResult, ExecutionError>;
    async fn list_positions(&self, category: Category) -> Result<PositionListResult, ExecutionError>;
}

/// Real-exchange implementation: thin translation from [`ExchangeClient`] calls onto the
/// signed REST client and its typed request set.
pub struct LiveExchange<S, C> {
    rest: Arc<RestClient<S, C>>,
}

impl<S, C> LiveExchange<S, C> {
    pub fn new(rest: Arc<RestClient<S, C>>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl<S: Signer + Send + Sync, C: EngineClock + Send + Sync> ExchangeClient for LiveExchange<S, C> {
    async fn submit(&self, approved: &ApprovedOrder) -> Result<String, ExecutionError> {
        let request = CreateOrderRequest::new(
            &approved.symbol,
            approved.side,
            approved.entry_type,
            approved.quantity,
            approved.limit_price,
            approved.reduce_only,
            approved.stop_loss_price,
            approved.take_profit_price,
            approved.client_order_id.clone(),
        );
        let priority = if approved.reduce_only { Priority::CancelOrder } else { Priority::Normal };
        let result = self.rest.execute(request, priority).await?;
        Ok(result.order_id)
    }

    async fn amend(&self, symbol: &Symbol, client_order_id: &str, qty: Option<Decimal>, price: Option<Decimal>) -> Result<(), ExecutionError> {
        let request = AmendOrderRequest {
            body: AmendOrderBody {
                category: category_str(symbol.category()),
                symbol: symbol.code().to_string(),
                order_link_id: client_order_id.to_string(),
                qty: qty.map(|q| q.to_string()),
                price: price.map(|p| p.to_string()),
            },
        };
        self.rest.execute(request, Priority::Normal).await?;
        Ok(())
    }

    async fn cancel(&self, symbol: &Symbol, client_order_id: &str) -> Result<(), ExecutionError> {
        let request = CancelOrderRequest {
            body: CancelOrderBody {
                category: category_str(symbol.category()),
                symbol: symbol.code().to_string(),
                order_link_id: client_order_id.to_string(),
            },
        };
        self.rest.execute(request, Priority::CancelOrder).await?;
        Ok(())
    }

    async fn cancel_all(&self, category: Category, symbol: Option<&Symbol>) -> Result<(), ExecutionError> {
        let request = CancelAllRequest {
            body: CancelAllBody { category: category_str(category), symbol: symbol.map(|s| s.code().to_string()) },
        };
        self.rest.execute(request, Priority::CancelOrder).await?;
        Ok(())
    }

    async fn list_open_orders(&self, category: Category) -> Result<OpenOrdersResult, ExecutionError> {
        let request = OpenOrdersRequest { query: OpenOrdersQuery { category: category_str(category) } };
        Ok(self.rest.execute(request, Priority::Background).await?)
    }

    async fn list_positions(&self, category: Category) -> Result<PositionListResult, ExecutionError> {
        let request = PositionListRequest { query: PositionListQuery { category: category_str(category) } };
        Ok(self.rest.execute(request, Priority::Background).await?)
    }
}

/// Top-of-book price source the simulator fills against; the Orchestrator feeds it from the
/// same `OrderBookTop` events the Gateway publishes.
pub trait TopOfBookSource: Send + Sync {
    fn best_bid_ask(&self, symbol: &Symbol) -> Option<(Decimal, Decimal)>;
}

struct SimulatedPosition {
    side: Side,
    size: Decimal,
    avg_entry_price: Decimal,
}

/// Paper-mode venue: fills synthetically at top-of-book with configured slippage and feeds
/// `Position`/`Order` events into the same [`MarketEvent`] channel a live Gateway would,
/// so the rest of the OMS and State Store run an identical code path regardless of mode.
pub struct SimulatorExchange<C, B> {
    clock: Arc<C>,
    book: Arc<B>,
    slippage_bps: Decimal,
    events: UnboundedTx<MarketEvent>,
    positions: parking_lot::Mutex<HashMap<Symbol, SimulatedPosition>>,
}

impl<C: EngineClock, B: TopOfBookSource> SimulatorExchange<C, B> {
    pub fn new(clock: Arc<C>, book: Arc<B>, slippage_bps: Decimal, events: UnboundedTx<MarketEvent>) -> Self {
        Self { clock, book, slippage_bps, events, positions: parking_lot::Mutex::new(HashMap::new()) }
    }

    fn fill_price(&self, symbol: &Symbol, side: Side) -> Option<Decimal> {
        let (bid, ask) = self.book.best_bid_ask(symbol)?;
        let slip = self.slippage_bps / Decimal::from(10_000);
        Some(match side {
            Side::Buy => ask * (Decimal::ONE + slip),
            Side::Sell => bid * (Decimal::ONE - slip),
        })
    }

    fn apply_fill(&self, symbol: &Symbol, side: Side, quantity: Decimal, price: Decimal, at: DateTime<Utc>) -> PositionUpdate {
        let mut positions = self.positions.lock();
        let entry = positions.entry(symbol.clone()).or_insert(SimulatedPosition { side, size: Decimal::ZERO, avg_entry_price: price });

        if entry.size == Decimal::ZERO || entry.side == side {
            let new_size = entry.size + quantity;
            entry.avg_entry_price = if new_size.is_zero() {
                price
            } else {
                (entry.avg_entry_price * entry.size + price * quantity) / new_size
            };
            entry.size = new_size;
            entry.side = side;
        } else {
            entry.size -= quantity;
            if entry.size < Decimal::ZERO {
                entry.side = side;
                entry.size = entry.size.abs();
                entry.avg_entry_price = price;
            }
        }

        PositionUpdate {
            symbol: symbol.clone(),
            side: entry.side,
            size: entry.size,
            avg_entry_price: entry.avg_entry_price,
            unrealized_pnl: Decimal::ZERO,
        }
    }
}

#[async_trait]
impl<C: EngineClock + Send + Sync, B: TopOfBookSource> ExchangeClient for SimulatorExchange<C, B> {
    async fn submit(&self, approved: &ApprovedOrder) -> Result<String, ExecutionError> {
        let now = self.clock.now();
        let fill_price = self.fill_price(&approved.symbol, approved.side).unwrap_or_else(|| approved.limit_price.unwrap_or_default());

        let order_update = OrderUpdate {
            client_order_id: approved.client_order_id.clone(),
            exchange_order_id: format!("sim-{}", approved.client_order_id),
            symbol: approved.symbol.clone(),
            status: ExchangeOrderStatus::Filled,
            filled_quantity: approved.quantity,
            avg_fill_price: Some(fill_price),
        };
        let position_update = self.apply_fill(&approved.symbol, approved.side, approved.quantity, fill_price, now);

        let _ = self.events.send(MarketEvent::Order(order_update.clone()));
        let _ = self.events.send(MarketEvent::Position(position_update));

        Ok(order_update.exchange_order_id)
    }

    async fn amend(&self, _: &Symbol, _: &str, _: Option<Decimal>, _: Option<Decimal>) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn cancel(&self, _: &Symbol, client_order_id: &str) -> Result<(), ExecutionError> {
        let order_update = OrderUpdate {
            client_order_id: client_order_id.to_string(),
            exchange_order_id: format!("sim-{client_order_id}"),
            symbol: Symbol::new("UNKNOWN", Category::Linear),
            status: ExchangeOrderStatus::Cancelled,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: None,
        };
        let _ = self.events.send(MarketEvent::Order(order_update));
        Ok(())
    }

    async fn cancel_all(&self, _: Category, _: Option<&Symbol>) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn list_open_orders(&self, _: Category) -> Result<OpenOrdersResult, ExecutionError> {
        Ok(OpenOrdersResult { list: Vec::new() })
    }

    async fn list_positions(&self, _: Category) -> Result<PositionListResult, ExecutionError> {
        Ok(PositionListResult { list: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    struct FixedBook;
    impl TopOfBookSource for FixedBook {
        fn best_bid_ask(&self, _: &Symbol) -> Option<(Decimal, Decimal)> {
            Some((dec!(99.9), dec!(100.1)))
        }
    }

    fn approved(side: Side, qty: Decimal) -> ApprovedOrder {
        ApprovedOrder {
            symbol: Symbol::new("BTCUSDT", Category::Linear),
            side,
            quantity: qty,
            entry_type: EntryType::Market,
            limit_price: None,
            stop_loss_price: dec!(98),
            take_profit_price: dec!(104),
            reduce_only: false,
            client_order_id: "sim-1".to_string(),
        }
    }

    #[tokio::test]
    async fn buy_fills_above_ask_with_slippage_and_opens_a_long_position() {
        let clock = Arc::new(vantora_integration::clock::TestClock::new(Utc::now()));
        let (tx, mut rx) = mpsc::unbounded_channel::<MarketEvent>();
        let sim = SimulatorExchange::new(clock, Arc::new(FixedBook), dec!(10), UnboundedTx(tx));

        sim.submit(&approved(Side::Buy, dec!(1))).await.unwrap();

        match rx.recv().await {
            Some(MarketEvent::Order(update)) => assert_eq!(update.status, ExchangeOrderStatus::Filled),
            other => panic!("expected order update, got {other:?}"),
        }
        match rx.recv().await {
            Some(MarketEvent::Position(update)) => {
                assert_eq!(update.side, Side::Buy);
                assert_eq!(update.size, dec!(1));
                assert!(update.avg_entry_price > dec!(100.1));
            }
            other => panic!("expected position update, got {other:?}"),
        }
    }
}
