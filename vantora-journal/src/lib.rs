pub mod checkpoint;
pub mod event;
pub mod journal;
pub mod projection;

pub use checkpoint::{recover, CheckpointScheduler};
pub use event::{JournalEvent, SequencedEvent};
pub use journal::{Journal, JournalError};
pub use projection::{OpenOrderProjection, PositionTrackerSnapshot, Projections, StateStore};
