#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! The Market Data Gateway: an authenticated, rate-limit-aware, auto-reconnecting channel of
//! market events, plus the signed REST client used for order placement and account queries.
//!
//! [`gateway::Gateway`] is the single entry point the rest of the stack depends on -
//! `vantora-execution`'s OMS sends orders through its REST client, and the Orchestrator
//! drains its [`event::MarketEvent`] stream to feed the Feature Store.

pub mod error;
pub mod event;
pub mod gateway;
pub mod rest;
pub mod ws;

pub use error::DataError;
pub use event::MarketEvent;
pub use gateway::{Gateway, GatewayConfig, GatewayTasks};
pub use rest::{Quota, RestClient};
