use serde::{Deserialize, Serialize};
use std::fmt;

/// Language-neutral error classification shared by every crate in the stack.
///
/// Each crate defines its own `thiserror`-derived error enum scoped to its own
/// responsibility, but every one of those enums exposes a [`kind`](ErrorKind) and a
/// [`retryable`](SocketError::retryable) predicate through this shared vocabulary, so the
/// HTTP layer and the Journal can render any error uniformly without matching on every
/// concrete variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigInvalid,
    AuthFailed,
    Network,
    Timeout,
    RateLimited,
    ExchangeError,
    ValidationRejected,
    CircuitTripped,
    InvariantViolated,
}

impl ErrorKind {
    /// Whether a caller may safely retry an operation that failed with this kind.
    pub fn retryable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimited)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ConfigInvalid => "config_invalid",
            ErrorKind::AuthFailed => "auth_failed",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ExchangeError => "exchange_error",
            ErrorKind::ValidationRejected => "validation_rejected",
            ErrorKind::CircuitTripped => "circuit_tripped",
            ErrorKind::InvariantViolated => "invariant_violated",
        };
        write!(f, "{s}")
    }
}

/// Transport-level failures shared by the REST client and the WebSocket connector.
///
/// Concrete domain errors (`vantora_data::DataError`, `vantora_execution::ExecutionError`,
/// ...) wrap a `SocketError` via `#[from]` rather than re-deriving the same network-failure
/// variants.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("rate limited: remaining={remaining} limit={limit}")]
    RateLimited { remaining: u32, limit: u32 },

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("exchange rejected request: code={code} msg={msg}")]
    ExchangeError { code: i64, msg: String, transient: bool },

    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to url-encode query params: {0}")]
    UrlEncode(#[from] serde_urlencoded::ser::Error),

    #[error("failed to deserialize response body: {error}")]
    DeserialiseBinary {
        error: serde_json::Error,
        payload: Vec<u8>,
    },
}

impl SocketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SocketError::Network(_) => ErrorKind::Network,
            SocketError::WebSocket(_) => ErrorKind::Network,
            SocketError::Timeout(_) => ErrorKind::Timeout,
            SocketError::RateLimited { .. } => ErrorKind::RateLimited,
            SocketError::AuthFailed(_) => ErrorKind::AuthFailed,
            SocketError::ExchangeError { transient, .. } => {
                if *transient {
                    ErrorKind::Network
                } else {
                    ErrorKind::ExchangeError
                }
            }
            SocketError::Serialize(_) | SocketError::UrlEncode(_) | SocketError::DeserialiseBinary { .. } => {
                ErrorKind::InvariantViolated
            }
        }
    }

    pub fn retryable(&self) -> bool {
        self.kind().retryable()
    }
}

/// Marker for errors which, once observed on a channel send, mean the receiver is gone
/// for good and the sender should stop trying.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}
