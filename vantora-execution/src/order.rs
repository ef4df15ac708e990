use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantora_instrument::{Side, Symbol};
use vantora_risk::{ApprovedOrder, EntryType};

/// Lifecycle state of an order the OMS is tracking.
///
/// ```text
///   New -> Submitted -> {PartiallyFilled -> Filled | Cancelled | Rejected}
///      \-> AmendPending -> Submitted
/// ```
/// `Filled`, `Cancelled` and `Rejected` are terminal; the OMS never transitions out of them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    New,
    Submitted,
    AmendPending,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Filled | OrderState::Cancelled | OrderState::Rejected)
    }

    /// Whether `self -> next` is a transition the state machine allows. Unlisted pairs
    /// (including any transition out of a terminal state) are rejected.
    pub fn can_transition_to(self, next: OrderState) -> bool {
        use OrderState::*;
        matches!(
            (self, next),
            (New, Submitted)
                | (New, Rejected)
                | (Submitted, PartiallyFilled)
                | (Submitted, Filled)
                | (Submitted, Cancelled)
                | (Submitted, Rejected)
                | (Submitted, AmendPending)
                | (PartiallyFilled, PartiallyFilled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Cancelled)
                | (AmendPending, Submitted)
        )
    }
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[error("illegal order transition {from:?} -> {to:?} for clientOrderId {client_order_id}")]
pub struct IllegalTransition {
    pub client_order_id: String,
    pub from: OrderState,
    pub to: OrderState,
}

/// An order the OMS owns: the approved intent it was sized from, its local state, and
/// whatever the exchange has reported back so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub client_order_id: String,
    pub exchange_order_id: Option<String>,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub entry_type: EntryType,
    pub limit_price: Option<Decimal>,
    pub stop_loss_price: Decimal,
    pub take_profit_price: Decimal,
    pub reduce_only: bool,
    pub state: OrderState,
    pub filled_quantity: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(approved: &ApprovedOrder, as_of: DateTime<Utc>) -> Self {
        Self {
            client_order_id: approved.client_order_id.clone(),
            exchange_order_id: None,
            symbol: approved.symbol.clone(),
            side: approved.side,
            quantity: approved.quantity,
            entry_type: approved.entry_type,
            limit_price: approved.limit_price,
            stop_loss_price: approved.stop_loss_price,
            take_profit_price: approved.take_profit_price,
            reduce_only: approved.reduce_only,
            state: OrderState::New,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: None,
            created_at: as_of,
            updated_at: as_of,
        }
    }

    pub fn transition(&mut self, next: OrderState, at: DateTime<Utc>) -> Result<(), IllegalTransition> {
        if !self.state.can_transition_to(next) {
            return Err(IllegalTransition { client_order_id: self.client_order_id.clone(), from: self.state, to: next });
        }
        self.state = next;
        self.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_can_only_move_to_submitted_or_rejected() {
        assert!(OrderState::New.can_transition_to(OrderState::Submitted));
        assert!(OrderState::New.can_transition_to(OrderState::Rejected));
        assert!(!OrderState::New.can_transition_to(OrderState::Filled));
    }

    #[test]
    fn terminal_states_accept_no_further_transitions() {
        for terminal in [OrderState::Filled, OrderState::Cancelled, OrderState::Rejected] {
            assert!(!terminal.can_transition_to(OrderState::Submitted));
            assert!(terminal.is_terminal());
        }
    }

    #[test]
    fn amend_pending_returns_to_submitted_only() {
        assert!(OrderState::AmendPending.can_transition_to(OrderState::Submitted));
        assert!(!OrderState::AmendPending.can_transition_to(OrderState::Filled));
    }
}
