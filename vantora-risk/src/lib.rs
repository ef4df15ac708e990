#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! The Risk Engine: translates a Signal Engine [`types::Intent`] into a sized
//! [`types::ApprovedOrder`] or a typed [`types::RiskRejection`], enforcing hard portfolio
//! limits and sticky circuit breakers ([`types::CircuitState`]).

pub mod alert;
pub mod drawdown;
pub mod engine;
pub mod exposure;
pub mod position;
pub mod sizing;
pub mod types;
pub mod var;
pub mod volatility;

pub use engine::{AccountState, MarketContext, RiskEngine};
pub use types::{ApprovedOrder, CircuitMode, CircuitState, EntryType, Intent, RiskLimits, RiskRejection};
