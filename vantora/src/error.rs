use vantora_data::DataError;
use vantora_execution::ExecutionError;
use vantora_integration::ErrorKind;
use vantora_journal::JournalError;
use vantora_risk::RiskRejection;
use vantora_strategy::ConsensusConfigError;

/// Top-level error type for the core binary: every lower-level crate error converts upward
/// via `#[from]`, so the Orchestrator and the HTTP layer match on one type regardless of
/// which component failed.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("risk engine rejected the intent: {0}")]
    Risk(#[from] RiskRejection),

    #[error("consensus configuration invalid: {0}")]
    Consensus(#[from] ConsensusConfigError),

    #[error("a background task panicked: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("command channel closed before the reply could be sent")]
    CommandChannelClosed,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            AppError::Data(inner) => inner.kind(),
            AppError::Execution(inner) => inner.kind(),
            AppError::Journal(_) => ErrorKind::InvariantViolated,
            AppError::Risk(inner) => inner.kind(),
            AppError::Consensus(_) => ErrorKind::ConfigInvalid,
            AppError::TaskJoin(_) => ErrorKind::InvariantViolated,
            AppError::CommandChannelClosed => ErrorKind::InvariantViolated,
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            AppError::Data(inner) => inner.retryable(),
            AppError::Execution(inner) => inner.retryable(),
            AppError::Risk(inner) => inner.retryable(),
            _ => false,
        }
    }
}
