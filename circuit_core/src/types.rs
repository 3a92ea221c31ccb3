//! Core domain types for Circuit.
//!
//! This module defines the authored data the rest of the system reads:
//! - Exercises and their time/repetition payloads
//! - Routine definitions (ordered exercise snapshots)
//! - Session phases
//! - Workout history records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Exercise Types
// ============================================================================

/// Kind-specific payload of an exercise
///
/// Authored numbers are signed so that malformed input survives parsing and
/// is reported by validation instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExerciseKind {
    /// Work phase is a countdown of `duration_seconds`
    Time { duration_seconds: i32 },
    /// Work phase is operator-paced; the set ends on an explicit signal
    Reps { rep_count: i32 },
}

impl ExerciseKind {
    pub fn is_timed(&self) -> bool {
        matches!(self, ExerciseKind::Time { .. })
    }
}

/// An exercise as authored in the catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub sets: i32,
    /// Rest taken after each set except the last
    pub rest_seconds: i32,
    #[serde(flatten)]
    pub kind: ExerciseKind,
}

impl Exercise {
    /// Create an exercise with a freshly generated id
    pub fn new(name: impl Into<String>, kind: ExerciseKind, sets: i32, rest_seconds: i32) -> Self {
        Self {
            id: format!("ex_{}", Uuid::new_v4().simple()),
            name: name.into(),
            sets,
            rest_seconds,
            kind,
        }
    }

    /// Short human-readable summary, e.g. `60s × 2 sets | 30s rest`
    pub fn summary(&self) -> String {
        let work = match self.kind {
            ExerciseKind::Time { duration_seconds } => format!("{}s", duration_seconds),
            ExerciseKind::Reps { rep_count } => format!("{} reps", rep_count),
        };
        let mut summary = format!("{} × {} sets", work, self.sets);
        if self.rest_seconds > 0 {
            summary.push_str(&format!(" | {}s rest", self.rest_seconds));
        }
        summary
    }
}

// ============================================================================
// Routine Types
// ============================================================================

/// A saved routine
///
/// Exercises are stored as snapshots, so editing or deleting a catalog
/// exercise later never changes a routine that already uses it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineDefinition {
    pub id: String,
    pub name: String,
    pub exercises: Vec<Exercise>,
}

// ============================================================================
// Session Types
// ============================================================================

/// Phase of the current set
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    Rest,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Work => write!(f, "WORK"),
            Phase::Rest => write!(f, "REST"),
        }
    }
}

/// A finished (or abandoned) guided session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: Uuid,
    pub routine_id: String,
    pub routine_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// False when the session was exited before the last set
    pub completed: bool,
    pub timed_seconds_elapsed: u64,
    pub exercise_count: usize,
}
