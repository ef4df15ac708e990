#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! The Order Manager (OMS): idempotent order placement against a live exchange or a
//! paper-trading simulator, reconciliation of local order state against the exchange's
//! reported state, and emergency flatten.
//!
//! [`exchange::ExchangeClient`] is the interface-abstraction point (§9 of the design notes):
//! the OMS in [`oms::OrderManager`] is identical whether it is wired to
//! [`exchange::LiveExchange`] or [`exchange::SimulatorExchange`].

pub mod balance;
pub mod error;
pub mod events;
pub mod exchange;
pub mod oms;
pub mod order;
pub mod requests;

pub use balance::{AssetBalance, Balance, BalanceTracker};
pub use error::ExecutionError;
pub use events::{ExecutionEvent, ExecutionEventSink, TracingExecutionSink};
pub use exchange::{ExchangeClient, LiveExchange, SimulatorExchange, TopOfBookSource};
pub use oms::OrderManager;
pub use order::{IllegalTransition, Order, OrderState};
