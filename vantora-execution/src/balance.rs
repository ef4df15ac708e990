use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vantora_data::event::WalletUpdate;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize, Constructor)]
pub struct Balance {
    pub total: Decimal,
    pub free: Decimal,
}

impl Balance {
    pub fn used(&self) -> Decimal {
        self.total - self.free
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Constructor)]
pub struct AssetBalance {
    pub asset: String,
    pub balance: Balance,
    pub time_exchange: DateTime<Utc>,
}

/// The State Store's wallet projection: per-asset balances, updated only from observed
/// `WalletUpdate` events, never optimistically from a submission.
#[derive(Debug, Clone, Default)]
pub struct BalanceTracker {
    balances: HashMap<String, AssetBalance>,
}

impl BalanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, update: &WalletUpdate, at: DateTime<Utc>) {
        self.balances.insert(
            update.asset.clone(),
            AssetBalance {
                asset: update.asset.clone(),
                balance: Balance { total: update.wallet_balance, free: update.available_balance },
                time_exchange: at,
            },
        );
    }

    pub fn get(&self, asset: &str) -> Option<&AssetBalance> {
        self.balances.get(asset)
    }

    pub fn equity(&self, quote_asset: &str) -> Decimal {
        self.balances.get(quote_asset).map(|b| b.balance.total).unwrap_or_default()
    }
}
