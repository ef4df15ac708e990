#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! Exchange-facing identifiers shared by every Vantora crate: the [`Symbol`] a strategy
//! trades, the [`Category`] it belongs to on the exchange, and the [`Environment`]
//! (`live` / `testnet` / `demo`) a process is wired against.
//!
//! These types carry no behaviour beyond validation - they exist so that every other
//! crate in the workspace (data, risk, strategy, execution, journal) can key its maps
//! and events off the same identifiers instead of passing raw strings around.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::cmp::Ordering;

pub mod environment;
pub mod side;

pub use environment::Environment;
pub use side::Side;

/// Instrument category, mirroring the exchange's own product taxonomy.
///
/// A `Symbol`'s category determines which WebSocket topic namespace and REST
/// endpoint family the Market Data Gateway and OMS address it through.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Linear,
    Inverse,
    Spot,
    Option,
}

/// Opaque, exchange-assigned instrument identifier (e.g. `BTCUSDT`) paired with its
/// [`Category`].
///
/// `Symbol` is constant for the lifetime of a process: the full set is loaded once at
/// startup from [`crate::environment::Environment`] configuration and never mutated.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Symbol {
    code: SmolStr,
    category: Category,
}

impl Symbol {
    /// Construct a new `Symbol`, upper-casing the exchange code for consistent keying.
    pub fn new(code: impl AsRef<str>, category: Category) -> Self {
        Self {
            code: SmolStr::new(code.as_ref().to_ascii_uppercase()),
            category,
        }
    }

    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.category, self.code)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.category == other.category
    }
}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code.hash(state);
        self.category.hash(state);
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code.cmp(&other.code).then(self.category.cmp(&other.category))
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
