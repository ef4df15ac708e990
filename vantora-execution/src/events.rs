use crate::order::{Order, OrderState};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use vantora_instrument::Symbol;
use vantora_risk::RiskRejection;

/// Everything the OMS reports outward. The Orchestrator and Journal both implement
/// [`ExecutionEventSink`] to turn these into `JournalEvent`s; the OMS itself never knows
/// about journaling.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    OrderSubmitted { order: Order },
    OrderUpdated { client_order_id: String, state: OrderState, filled_quantity: Decimal },
    OrderTerminal { client_order_id: String, state: OrderState },
    OrderRejected { client_order_id: String, reason: RiskRejection },
    ReconciliationDiff { symbol: Symbol, client_order_id: String, local: OrderState, exchange: OrderState, at: DateTime<Utc> },
}

pub trait ExecutionEventSink: Send + Sync {
    fn emit(&self, event: ExecutionEvent);
}

/// Default sink: logs through `tracing` so nothing is silently dropped before a real
/// Journal sink is wired in.
#[derive(Debug, Default)]
pub struct TracingExecutionSink;

impl ExecutionEventSink for TracingExecutionSink {
    fn emit(&self, event: ExecutionEvent) {
        match event {
            ExecutionEvent::OrderSubmitted { order } => {
                tracing::info!(client_order_id = %order.client_order_id, symbol = %order.symbol, "order submitted")
            }
            ExecutionEvent::OrderUpdated { client_order_id, state, filled_quantity } => {
                tracing::debug!(client_order_id, ?state, %filled_quantity, "order updated")
            }
            ExecutionEvent::OrderTerminal { client_order_id, state } => {
                tracing::info!(client_order_id, ?state, "order reached terminal state")
            }
            ExecutionEvent::OrderRejected { client_order_id, reason } => {
                tracing::warn!(client_order_id, %reason, "order rejected")
            }
            ExecutionEvent::ReconciliationDiff { symbol, client_order_id, local, exchange, .. } => {
                tracing::warn!(%symbol, client_order_id, ?local, ?exchange, "reconciliation discrepancy, exchange wins")
            }
        }
    }
}
