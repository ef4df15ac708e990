use crate::error::ExecutionError;
use crate::events::{ExecutionEvent, ExecutionEventSink, TracingExecutionSink};
use crate::exchange::ExchangeClient;
use crate::order::{Order, OrderState};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use vantora_data::event::{ExchangeOrderStatus, OrderUpdate};
use vantora_instrument::{Category, Side, Symbol};
use vantora_integration::clock::EngineClock;
use vantora_risk::position::PositionTracker;
use vantora_risk::{ApprovedOrder, EntryType};

fn observed_state(status: ExchangeOrderStatus) -> OrderState {
    match status {
        ExchangeOrderStatus::New => OrderState::Submitted,
        ExchangeOrderStatus::PartiallyFilled => OrderState::PartiallyFilled,
        ExchangeOrderStatus::Filled => OrderState::Filled,
        ExchangeOrderStatus::Cancelled => OrderState::Cancelled,
        ExchangeOrderStatus::Rejected => OrderState::Rejected,
    }
}

/// Owns the local open-order map keyed by `clientOrderId` and is the sole writer of order
/// state: transitions happen only when the exchange (or the paper simulator, via the same
/// event shape) reports them, never optimistically on submission.
pub struct OrderManager<X, C> {
    exchange: Arc<X>,
    clock: Arc<C>,
    category: Category,
    open_orders: parking_lot::Mutex<HashMap<String, Order>>,
    sink: Arc<dyn ExecutionEventSink>,
}

impl<X: ExchangeClient, C: EngineClock> OrderManager<X, C> {
    pub fn new(exchange: Arc<X>, clock: Arc<C>, category: Category) -> Self {
        Self { exchange, clock, category, open_orders: parking_lot::Mutex::new(HashMap::new()), sink: Arc::new(TracingExecutionSink) }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ExecutionEventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn open_order(&self, client_order_id: &str) -> Option<Order> {
        self.open_orders.lock().get(client_order_id).cloned()
    }

    pub fn open_order_count(&self) -> usize {
        self.open_orders.lock().values().filter(|o| !o.state.is_terminal()).count()
    }

    /// Submits an `ApprovedOrder`. Idempotent: if an order with the same `clientOrderId`
    /// already exists and hasn't reached a terminal state, the submission is a no-op rather
    /// than a duplicate request to the exchange.
    pub async fn submit(&self, approved: ApprovedOrder) -> Result<(), ExecutionError> {
        let now = self.clock.now();

        {
            let orders = self.open_orders.lock();
            if let Some(existing) = orders.get(&approved.client_order_id) {
                if !existing.state.is_terminal() {
                    tracing::debug!(client_order_id = %approved.client_order_id, "duplicate submission for open order, skipping");
                    return Ok(());
                }
            }
        }

        let order = Order::new(&approved, now);
        self.open_orders.lock().insert(order.client_order_id.clone(), order.clone());
        self.sink.emit(ExecutionEvent::OrderSubmitted { order: order.clone() });

        match self.exchange.submit(&approved).await {
            Ok(exchange_order_id) => {
                let mut orders = self.open_orders.lock();
                if let Some(order) = orders.get_mut(&approved.client_order_id) {
                    order.exchange_order_id = Some(exchange_order_id);
                    let _ = order.transition(OrderState::Submitted, now);
                }
                Ok(())
            }
            Err(error) => {
                let mut orders = self.open_orders.lock();
                if let Some(order) = orders.get_mut(&approved.client_order_id) {
                    let _ = order.transition(OrderState::Rejected, now);
                }
                Err(error)
            }
        }
    }

    pub async fn amend(&self, client_order_id: &str, qty: Option<Decimal>, price: Option<Decimal>) -> Result<(), ExecutionError> {
        let symbol = {
            let orders = self.open_orders.lock();
            orders.get(client_order_id).map(|o| o.symbol.clone()).ok_or_else(|| ExecutionError::UnknownClientOrderId {
                client_order_id: client_order_id.to_string(),
            })?
        };
        self.exchange.amend(&symbol, client_order_id, qty, price).await
    }

    pub async fn cancel(&self, client_order_id: &str) -> Result<(), ExecutionError> {
        let symbol = {
            let orders = self.open_orders.lock();
            orders.get(client_order_id).map(|o| o.symbol.clone()).ok_or_else(|| ExecutionError::UnknownClientOrderId {
                client_order_id: client_order_id.to_string(),
            })?
        };
        self.exchange.cancel(&symbol, client_order_id).await
    }

    /// Applies an exchange-observed order event: the only path that mutates order state.
    pub fn apply_order_update(&self, update: OrderUpdate) {
        let now = self.clock.now();
        let next_state = observed_state(update.status);

        let mut orders = self.open_orders.lock();
        let order = orders.entry(update.client_order_id.clone()).or_insert_with(|| {
            tracing::warn!(client_order_id = %update.client_order_id, "order update for unknown clientOrderId, adopting exchange view");
            Order {
                client_order_id: update.client_order_id.clone(),
                exchange_order_id: Some(update.exchange_order_id.clone()),
                symbol: update.symbol.clone(),
                side: Side::Buy,
                quantity: update.filled_quantity,
                entry_type: EntryType::Market,
                limit_price: None,
                stop_loss_price: Decimal::ZERO,
                take_profit_price: Decimal::ZERO,
                reduce_only: false,
                state: OrderState::New,
                filled_quantity: Decimal::ZERO,
                avg_fill_price: None,
                created_at: now,
                updated_at: now,
            }
        });

        order.filled_quantity = update.filled_quantity;
        order.avg_fill_price = update.avg_fill_price.or(order.avg_fill_price);

        if order.transition(next_state, now).is_ok() {
            drop(orders);
            if next_state.is_terminal() {
                self.sink.emit(ExecutionEvent::OrderTerminal { client_order_id: update.client_order_id, state: next_state });
            } else {
                self.sink.emit(ExecutionEvent::OrderUpdated {
                    client_order_id: update.client_order_id,
                    state: next_state,
                    filled_quantity: update.filled_quantity,
                });
            }
        }
    }

    /// Reconciles local open-order state against the exchange's reported state. The
    /// exchange's view always wins; divergences are reported through the sink rather than
    /// silently overwritten.
    pub async fn reconcile(&self) -> Result<(), ExecutionError> {
        let remote = self.exchange.list_open_orders(self.category).await?;
        let now = self.clock.now();
        let mut orders = self.open_orders.lock();

        for entry in remote.list {
            let observed = match entry.order_status.as_str() {
                "New" => OrderState::Submitted,
                "PartiallyFilled" => OrderState::PartiallyFilled,
                "Filled" => OrderState::Filled,
                "Cancelled" => OrderState::Cancelled,
                "Rejected" => OrderState::Rejected,
                _ => continue,
            };

            if let Some(local) = orders.get_mut(&entry.order_link_id) {
                if local.state != observed {
                    self.sink.emit(ExecutionEvent::ReconciliationDiff {
                        symbol: local.symbol.clone(),
                        client_order_id: entry.order_link_id.clone(),
                        local: local.state,
                        exchange: observed,
                        at: now,
                    });
                    local.filled_quantity = entry.cum_exec_qty;
                    local.avg_fill_price = entry.avg_price;
                    let _ = local.transition(observed, now);
                }
            }
        }

        Ok(())
    }

    /// Submits reduce-only market orders for every open position and cancels every open
    /// non-reduce-only order. Idempotent: repeated calls against an already-flat book are
    /// safe no-ops.
    pub async fn flatten_all(&self, positions: &PositionTracker, at: DateTime<Utc>) -> Result<(), ExecutionError> {
        self.exchange.cancel_all(self.category, None).await?;

        for position in positions.iter() {
            if position.size.is_zero() {
                continue;
            }
            let opposite = match position.side {
                Side::Buy => Side::Sell,
                Side::Sell => Side::Buy,
            };
            let client_order_id = format!("flatten-{}-{}", position.symbol.code(), at.timestamp());
            let approved = ApprovedOrder {
                symbol: position.symbol.clone(),
                side: opposite,
                quantity: position.size,
                entry_type: EntryType::Market,
                limit_price: None,
                stop_loss_price: Decimal::ZERO,
                take_profit_price: Decimal::ZERO,
                reduce_only: true,
                client_order_id,
            };
            self.submit(approved).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{OpenOrderEntry, OpenOrdersResult, PositionListResult};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use vantora_risk::position::Position;

    struct MockExchange {
        submissions: AtomicU32,
        open_orders: Vec<OpenOrderEntry>,
    }

    #[async_trait]
    impl ExchangeClient for MockExchange {
        async fn submit(&self, _: &ApprovedOrder) -> Result<String, ExecutionError> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok("exchange-1".to_string())
        }
        async fn amend(&self, _: &Symbol, _: &str, _: Option<Decimal>, _: Option<Decimal>) -> Result<(), ExecutionError> {
            Ok(())
        }
        async fn cancel(&self, _: &Symbol, _: &str) -> Result<(), ExecutionError> {
            Ok(())
        }
        async fn cancel_all(&self, _: Category, _: Option<&Symbol>) -> Result<(), ExecutionError> {
            Ok(())
        }
        async fn list_open_orders(&self, _: Category) -> Result<OpenOrdersResult, ExecutionError> {
            Ok(OpenOrdersResult { list: self.open_orders.clone() })
        }
        async fn list_positions(&self, _: Category) -> Result<PositionListResult, ExecutionError> {
            Ok(PositionListResult { list: Vec::new() })
        }
    }

    fn approved(id: &str) -> ApprovedOrder {
        ApprovedOrder {
            symbol: Symbol::new("BTCUSDT", Category::Linear),
            side: Side::Buy,
            quantity: dec!(1),
            entry_type: EntryType::Market,
            limit_price: None,
            stop_loss_price: dec!(98),
            take_profit_price: dec!(104),
            reduce_only: false,
            client_order_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn resubmitting_an_open_order_id_is_a_noop() {
        let exchange = Arc::new(MockExchange { submissions: AtomicU32::new(0), open_orders: Vec::new() });
        let clock = Arc::new(vantora_integration::clock::TestClock::new(Utc::now()));
        let oms = OrderManager::new(exchange.clone(), clock, Category::Linear);

        oms.submit(approved("dup-1")).await.unwrap();
        oms.submit(approved("dup-1")).await.unwrap();

        assert_eq!(exchange.submissions.load(Ordering::SeqCst), 1);
        assert_eq!(oms.open_order_count(), 1);
    }

    #[tokio::test]
    async fn order_update_transitions_local_state_and_records_fill() {
        let exchange = Arc::new(MockExchange { submissions: AtomicU32::new(0), open_orders: Vec::new() });
        let clock = Arc::new(vantora_integration::clock::TestClock::new(Utc::now()));
        let oms = OrderManager::new(exchange, clock, Category::Linear);

        oms.submit(approved("fill-1")).await.unwrap();
        oms.apply_order_update(OrderUpdate {
            client_order_id: "fill-1".to_string(),
            exchange_order_id: "exchange-1".to_string(),
            symbol: Symbol::new("BTCUSDT", Category::Linear),
            status: ExchangeOrderStatus::Filled,
            filled_quantity: dec!(1),
            avg_fill_price: Some(dec!(100)),
        });

        let order = oms.open_order("fill-1").unwrap();
        assert_eq!(order.state, OrderState::Filled);
        assert_eq!(order.filled_quantity, dec!(1));
        assert_eq!(oms.open_order_count(), 0);
    }

    #[tokio::test]
    async fn reconcile_adopts_exchange_reported_size_on_divergence() {
        let open_orders = vec![OpenOrderEntry {
            order_id: "exchange-1".to_string(),
            order_link_id: "recon-1".to_string(),
            symbol: "BTCUSDT".to_string(),
            order_status: "Filled".to_string(),
            cum_exec_qty: dec!(0.5),
            avg_price: Some(dec!(101)),
        }];
        let exchange = Arc::new(MockExchange { submissions: AtomicU32::new(0), open_orders });
        let clock = Arc::new(vantora_integration::clock::TestClock::new(Utc::now()));
        let oms = OrderManager::new(exchange, clock, Category::Linear);

        oms.submit(approved("recon-1")).await.unwrap();
        oms.reconcile().await.unwrap();

        let order = oms.open_order("recon-1").unwrap();
        assert_eq!(order.state, OrderState::Filled);
        assert_eq!(order.filled_quantity, dec!(0.5));
    }

    #[tokio::test]
    async fn flatten_all_submits_reduce_only_orders_for_every_open_position() {
        let exchange = Arc::new(MockExchange { submissions: AtomicU32::new(0), open_orders: Vec::new() });
        let clock = Arc::new(vantora_integration::clock::TestClock::new(Utc::now()));
        let oms = OrderManager::new(exchange.clone(), clock.clone(), Category::Linear);

        let mut positions = PositionTracker::default();
        positions.upsert(Position {
            symbol: Symbol::new("BTCUSDT", Category::Linear),
            side: Side::Buy,
            size: dec!(2),
            avg_entry_price: dec!(100),
            unrealized_pnl: dec!(0),
            margin_used: dec!(0),
        });

        oms.flatten_all(&positions, clock.now()).await.unwrap();
        assert_eq!(exchange.submissions.load(Ordering::SeqCst), 1);
    }
}
