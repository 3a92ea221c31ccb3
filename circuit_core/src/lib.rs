#![forbid(unsafe_code)]

//! Core domain model and workout execution engine for Circuit.
//!
//! This crate provides:
//! - Domain types (exercises, routine definitions, phases, history records)
//! - Exercise catalog management and persistence
//! - Validated routine model
//! - Execution engine (set/phase sequencing, countdown, cues)
//! - Timed-progress aggregation
//! - Tick source and workout history

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod store;
pub mod history;
pub mod routine;
pub mod engine;
pub mod timing;
pub mod ticker;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{default_exercises, Catalog, ExerciseChanges, RoutineEdit};
pub use config::Config;
pub use history::{read_records, recent_records, HistorySink, JsonlSink};
pub use routine::{Routine, RoutineExercise, Work};
pub use engine::{CueSink, Engine, NextUp, RunState, SilentCues};
pub use timing::format_clock;
pub use ticker::{TickGate, Ticker};
