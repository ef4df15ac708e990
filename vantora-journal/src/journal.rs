use crate::event::{JournalEvent, SequencedEvent};
use chrono::Utc;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("failed to open journal file at {path}: {source}")]
    Open { path: PathBuf, #[source] source: io::Error },
    #[error("failed to append to journal: {0}")]
    Append(#[source] io::Error),
    #[error("failed to read journal during replay: {0}")]
    Replay(#[source] io::Error),
    #[error("corrupt journal line {line}: {source}")]
    Corrupt { line: u64, #[source] source: serde_json::Error },
}

/// Capacity of the live event fan-out the operator HTTP surface's SSE endpoint subscribes
/// to. A slow consumer is dropped rather than allowed to back-pressure the journal writer
/// (§4.9): `broadcast` does exactly this by design.
const LIVE_FANOUT_CAPACITY: usize = 1024;

/// Durable append-only event log, newline-delimited JSON on disk. `sequence` is dense and
/// strictly increasing; every call to [`Journal::append`] assigns the next one under a
/// single writer lock so ordering is never ambiguous even under concurrent callers.
pub struct Journal {
    path: PathBuf,
    file: parking_lot::Mutex<std::fs::File>,
    next_sequence: AtomicU64,
    live: broadcast::Sender<SequencedEvent>,
}

impl Journal {
    /// Opens (creating if absent) the journal at `path` and replays it to determine the next
    /// sequence number, without materialising the full event list in memory twice - callers
    /// that need the replayed events should use [`Journal::replay`] directly.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let path = path.into();
        let next_sequence = Self::last_sequence(&path)?.map(|s| s + 1).unwrap_or(0);

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| JournalError::Open { path: path.clone(), source })?;

        let (live, _) = broadcast::channel(LIVE_FANOUT_CAPACITY);

        Ok(Self { path, file: parking_lot::Mutex::new(file), next_sequence: AtomicU64::new(next_sequence), live })
    }

    fn last_sequence(path: &Path) -> Result<Option<u64>, JournalError> {
        if !path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(path).map_err(|source| JournalError::Open { path: path.to_path_buf(), source })?;
        let reader = io::BufReader::new(file);
        let mut last = None;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(JournalError::Replay)?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: SequencedEvent = serde_json::from_str(&line)
                .map_err(|source| JournalError::Corrupt { line: line_no as u64, source })?;
            last = Some(parsed.sequence);
        }
        Ok(last)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `event`, assigning it the next dense sequence number, and fans it out to any
    /// live SSE subscribers. Returns the sequenced event actually written.
    pub fn append(&self, event: JournalEvent) -> Result<SequencedEvent, JournalError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let sequenced = SequencedEvent { sequence, recorded_at: Utc::now(), event };

        let line = serde_json::to_string(&sequenced).map_err(|error| JournalError::Append(io::Error::new(io::ErrorKind::InvalidData, error)))?;
        {
            let mut file = self.file.lock();
            writeln!(file, "{line}").map_err(JournalError::Append)?;
            file.flush().map_err(JournalError::Append)?;
        }

        let _ = self.live.send(sequenced.clone());
        Ok(sequenced)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SequencedEvent> {
        self.live.subscribe()
    }

    /// Reads every event currently on disk, in arrival order. Used at startup to rebuild
    /// projections before the Orchestrator accepts commands.
    pub fn replay(&self) -> Result<Vec<SequencedEvent>, JournalError> {
        let file = std::fs::File::open(&self.path).map_err(|source| JournalError::Open { path: self.path.clone(), source })?;
        let reader = io::BufReader::new(file);
        let mut events = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(JournalError::Replay)?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: SequencedEvent = serde_json::from_str(&line)
                .map_err(|source| JournalError::Corrupt { line: line_no as u64, source })?;
            events.push(parsed);
        }
        Ok(events)
    }
}
