pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod orchestrator;

pub use config::AppConfig;
pub use error::AppError;
pub use orchestrator::{LatestBook, Orchestrator, OrchestratorCommand};
