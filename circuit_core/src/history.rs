//! Workout history log.
//!
//! Each ended session is appended as one JSON line to a log file with file
//! locking, so concurrent `circuit` processes never interleave writes.

use crate::engine::{CueSink, Engine};
use crate::{Result, WorkoutRecord};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

impl WorkoutRecord {
    /// Summarize a session that started at `started_at` and ends now
    pub fn from_session<C: CueSink>(engine: &Engine<C>, started_at: DateTime<Utc>) -> Self {
        let routine = engine.routine();
        Self {
            id: uuid::Uuid::new_v4(),
            routine_id: routine.id().to_string(),
            routine_name: routine.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            completed: engine.is_complete(),
            timed_seconds_elapsed: engine.elapsed_timed_seconds(),
            exercise_count: routine.len(),
        }
    }
}

/// Sink for finished workout records
pub trait HistorySink {
    fn append(&mut self, record: &WorkoutRecord) -> Result<()>;
}

/// JSONL-based history sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl HistorySink for JsonlSink {
    fn append(&mut self, record: &WorkoutRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended workout {} to history", record.id);
        Ok(())
    }
}

/// Read every record from a history file, oldest first
///
/// Malformed lines are skipped with a warning.
pub fn read_records(path: &Path) -> Result<Vec<WorkoutRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    // Split on raw bytes so a line of invalid UTF-8 is skipped like any other bad line
    for (line_num, line_result) in reader.split(b'\n').enumerate() {
        let line = line_result?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<WorkoutRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse history at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} workout records", records.len());
    Ok(records)
}

/// The most recent `limit` records, newest first
pub fn recent_records(path: &Path, limit: usize) -> Result<Vec<WorkoutRecord>> {
    let mut records = read_records(path)?;
    records.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
    records.truncate(limit);
    Ok(records)
}
