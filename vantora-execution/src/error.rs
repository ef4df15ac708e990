use vantora_data::DataError;
use vantora_integration::ErrorKind;

/// Errors surfaced by the Order Manager. Transient wire failures arrive wrapped from
/// [`DataError`]; everything below that is specific to order lifecycle management.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("an open order already exists for clientOrderId {client_order_id}")]
    DuplicateClientOrderId { client_order_id: String },

    #[error("no open order found for clientOrderId {client_order_id}")]
    UnknownClientOrderId { client_order_id: String },

    #[error("order {client_order_id} rejected by exchange: {reason}")]
    Rejected { client_order_id: String, reason: String },

    #[error("retry budget of {attempts} attempts exhausted for clientOrderId {client_order_id}")]
    RetryBudgetExhausted { client_order_id: String, attempts: u32 },

    #[error("local and exchange order state diverged for clientOrderId {client_order_id} and could not be reconciled")]
    IrreconcilableState { client_order_id: String },
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::Data(inner) => inner.kind(),
            ExecutionError::DuplicateClientOrderId { .. } => ErrorKind::ValidationRejected,
            ExecutionError::UnknownClientOrderId { .. } => ErrorKind::ValidationRejected,
            ExecutionError::Rejected { .. } => ErrorKind::ValidationRejected,
            ExecutionError::RetryBudgetExhausted { .. } => ErrorKind::Timeout,
            ExecutionError::IrreconcilableState { .. } => ErrorKind::InvariantViolated,
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            ExecutionError::Data(inner) => inner.retryable(),
            _ => false,
        }
    }
}
