use vantora_integration::{ErrorKind, SocketError};

/// Errors surfaced by the Market Data Gateway: REST requests, WebSocket lifecycle and quota
/// tracking all funnel into this single enum so the Orchestrator can match on one type
/// regardless of which transport failed.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error("authentication frame rejected by exchange: {0}")]
    AuthFailed(String),

    #[error("exceeded {attempts} reconnect attempts for stream {stream}")]
    MaxReconnectAttemptsReached { stream: String, attempts: u32 },

    #[error("heartbeat pong not received within {0:?}, connection considered dead")]
    HeartbeatTimeout(std::time::Duration),

    #[error("subscription to topic {0} was rejected by the exchange")]
    SubscriptionRejected(String),

    #[error("gateway was asked to operate on an unconfigured symbol: {0}")]
    UnknownSymbol(String),
}

impl DataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::Socket(inner) => inner.kind(),
            DataError::AuthFailed(_) => ErrorKind::AuthFailed,
            DataError::MaxReconnectAttemptsReached { .. } => ErrorKind::Network,
            DataError::HeartbeatTimeout(_) => ErrorKind::Timeout,
            DataError::SubscriptionRejected(_) => ErrorKind::ExchangeError,
            DataError::UnknownSymbol(_) => ErrorKind::InvariantViolated,
        }
    }

    /// Auth and signature failures are never retried automatically; every other kind
    /// inherits its underlying transport classification.
    pub fn retryable(&self) -> bool {
        match self {
            DataError::AuthFailed(_) | DataError::SubscriptionRejected(_) => false,
            DataError::MaxReconnectAttemptsReached { .. } => false,
            other => other.kind().retryable(),
        }
    }
}
