//! Exercise library and saved routines.
//!
//! This module provides the built-in exercises and the authoring operations
//! over a [`Catalog`]: adding, editing and removing exercises, and assembling
//! and rearranging routines built from exercise snapshots.

use crate::routine::validate_exercise;
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Cached built-in exercises - built once and reused
static DEFAULT_EXERCISES: Lazy<Vec<Exercise>> = Lazy::new(build_default_exercises);

/// Get a reference to the cached built-in exercises
pub fn default_exercises() -> &'static [Exercise] {
    &DEFAULT_EXERCISES
}

fn timed(id: &str, name: &str, duration_seconds: i32, sets: i32, rest_seconds: i32) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        sets,
        rest_seconds,
        kind: ExerciseKind::Time { duration_seconds },
    }
}

fn reps(id: &str, name: &str, rep_count: i32, sets: i32, rest_seconds: i32) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        sets,
        rest_seconds,
        kind: ExerciseKind::Reps { rep_count },
    }
}

fn build_default_exercises() -> Vec<Exercise> {
    vec![
        timed("ex1", "Isometric hold", 60, 2, 60),
        timed("ex2", "Plank", 60, 2, 30),
        timed("ex3", "Wall sit", 60, 2, 60),
        reps("ex4", "Glute bridge", 15, 2, 30),
        timed("ex5", "Arm circles", 45, 2, 60),
        reps("ex6", "Push-ups", 15, 2, 45),
        reps("ex7", "Biceps curl", 15, 2, 45),
        reps("ex8", "Shoulder press", 15, 2, 45),
        reps("ex9", "Crunches", 15, 2, 45),
    ]
}

/// Field changes for a library exercise; `None` keeps the current value
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExerciseChanges {
    pub name: Option<String>,
    pub kind: Option<ExerciseKind>,
    pub sets: Option<i32>,
    pub rest_seconds: Option<i32>,
}

impl ExerciseChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.kind.is_none()
            && self.sets.is_none()
            && self.rest_seconds.is_none()
    }
}

/// One change to a saved routine; positions are zero-based
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutineEdit {
    Rename(String),
    /// Move the entry at `from` so it ends up at `to`
    Move { from: usize, to: usize },
    /// Copy a library exercise in at `at`, or at the end when `None`
    Add { exercise_id: String, at: Option<usize> },
    Remove { at: usize },
}

fn position_error(routine: &str, at: usize, len: usize) -> Error {
    Error::Validation(format!(
        "Position {} is out of range for routine '{}' ({} exercises)",
        at + 1,
        routine,
        len
    ))
}

/// The authored library: exercises plus the routines built from them
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub routines: Vec<RoutineDefinition>,
}

impl Catalog {
    /// A catalog seeded with the built-in exercises and no routines
    pub fn with_defaults() -> Self {
        Self {
            exercises: default_exercises().to_vec(),
            routines: Vec::new(),
        }
    }

    /// Add an exercise after checking it, returning its id
    pub fn add_exercise(&mut self, exercise: Exercise) -> Result<String> {
        if exercise.name.trim().is_empty() {
            return Err(Error::Validation("Exercise name must not be empty".into()));
        }
        let errors = validate_exercise(&exercise);
        if !errors.is_empty() {
            return Err(Error::Validation(errors.join("; ")));
        }
        if self.exercises.iter().any(|e| e.id == exercise.id) {
            return Err(Error::Catalog(format!(
                "Exercise id '{}' already exists",
                exercise.id
            )));
        }

        let id = exercise.id.clone();
        tracing::info!("Added exercise '{}' ({})", exercise.name, id);
        self.exercises.push(Exercise {
            name: exercise.name.trim().to_string(),
            ..exercise
        });
        Ok(id)
    }

    /// Remove an exercise from the library
    ///
    /// Routines keep their own snapshot and are unaffected.
    pub fn remove_exercise(&mut self, id: &str) -> Result<Exercise> {
        let index = self
            .exercises
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::Catalog(format!("No exercise with id '{}'", id)))?;
        let removed = self.exercises.remove(index);
        tracing::info!("Removed exercise '{}' ({})", removed.name, removed.id);
        Ok(removed)
    }

    /// Change an exercise in place, returning the updated copy
    ///
    /// Routines hold their own snapshot and keep the old values.
    pub fn update_exercise(&mut self, id: &str, changes: ExerciseChanges) -> Result<Exercise> {
        if changes.is_empty() {
            return Err(Error::Validation(format!(
                "Nothing to change for exercise '{}'",
                id
            )));
        }
        let current = self
            .exercises
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::Catalog(format!("No exercise with id '{}'", id)))?;

        let updated = Exercise {
            id: current.id.clone(),
            name: changes
                .name
                .map(|name| name.trim().to_string())
                .unwrap_or_else(|| current.name.clone()),
            sets: changes.sets.unwrap_or(current.sets),
            rest_seconds: changes.rest_seconds.unwrap_or(current.rest_seconds),
            kind: changes.kind.unwrap_or_else(|| current.kind.clone()),
        };
        if updated.name.is_empty() {
            return Err(Error::Validation("Exercise name must not be empty".into()));
        }
        let errors = validate_exercise(&updated);
        if !errors.is_empty() {
            return Err(Error::Validation(errors.join("; ")));
        }

        tracing::info!("Updated exercise '{}' ({})", updated.name, updated.id);
        *current = updated.clone();
        Ok(updated)
    }

    pub fn find_exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Assemble a routine from exercise ids, in order
    ///
    /// The same id may appear more than once; each occurrence is copied.
    pub fn create_routine(&mut self, name: &str, exercise_ids: &[String]) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Routine name must not be empty".into()));
        }
        if exercise_ids.is_empty() {
            return Err(Error::Validation(format!(
                "Routine '{}' needs at least one exercise",
                name
            )));
        }
        if self
            .routines
            .iter()
            .any(|r| r.name.eq_ignore_ascii_case(name))
        {
            return Err(Error::Catalog(format!(
                "A routine named '{}' already exists",
                name
            )));
        }

        let exercises = exercise_ids
            .iter()
            .map(|id| {
                self.find_exercise(id)
                    .cloned()
                    .ok_or_else(|| Error::Catalog(format!("No exercise with id '{}'", id)))
            })
            .collect::<Result<Vec<_>>>()?;

        let id = format!("routine_{}", Uuid::new_v4().simple());
        tracing::info!(
            "Created routine '{}' ({}) with {} exercises",
            name,
            id,
            exercises.len()
        );
        self.routines.push(RoutineDefinition {
            id: id.clone(),
            name: name.to_string(),
            exercises,
        });
        Ok(id)
    }

    /// Apply `edits` in order to the routine matching `key`
    ///
    /// Either every edit applies or the routine is left untouched. A routine
    /// may not end up empty or share its name with another routine.
    pub fn edit_routine(&mut self, key: &str, edits: &[RoutineEdit]) -> Result<RoutineDefinition> {
        let mut definition = self
            .find_routine(key)
            .cloned()
            .ok_or_else(|| Error::Catalog(format!("No routine matching '{}'", key)))?;

        for edit in edits {
            let len = definition.exercises.len();
            match edit {
                RoutineEdit::Rename(name) => {
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(Error::Validation("Routine name must not be empty".into()));
                    }
                    definition.name = name.to_string();
                }
                RoutineEdit::Move { from, to } => {
                    if *from >= len {
                        return Err(position_error(&definition.name, *from, len));
                    }
                    if *to >= len {
                        return Err(position_error(&definition.name, *to, len));
                    }
                    let entry = definition.exercises.remove(*from);
                    definition.exercises.insert(*to, entry);
                }
                RoutineEdit::Add { exercise_id, at } => {
                    let at = at.unwrap_or(len);
                    if at > len {
                        return Err(position_error(&definition.name, at, len));
                    }
                    let exercise = self.find_exercise(exercise_id).cloned().ok_or_else(|| {
                        Error::Catalog(format!("No exercise with id '{}'", exercise_id))
                    })?;
                    definition.exercises.insert(at, exercise);
                }
                RoutineEdit::Remove { at } => {
                    if *at >= len {
                        return Err(position_error(&definition.name, *at, len));
                    }
                    definition.exercises.remove(*at);
                }
            }
        }

        if definition.exercises.is_empty() {
            return Err(Error::Validation(format!(
                "Routine '{}' needs at least one exercise",
                definition.name
            )));
        }
        if self
            .routines
            .iter()
            .any(|r| r.id != definition.id && r.name.eq_ignore_ascii_case(&definition.name))
        {
            return Err(Error::Catalog(format!(
                "A routine named '{}' already exists",
                definition.name
            )));
        }

        let slot = self
            .routines
            .iter_mut()
            .find(|r| r.id == definition.id)
            .ok_or_else(|| Error::Catalog(format!("No routine matching '{}'", key)))?;
        *slot = definition.clone();
        tracing::info!(
            "Edited routine '{}' ({}), now {} exercises",
            definition.name,
            definition.id,
            definition.exercises.len()
        );
        Ok(definition)
    }

    /// Remove a routine by id or name
    pub fn remove_routine(&mut self, key: &str) -> Result<RoutineDefinition> {
        let id = self
            .find_routine(key)
            .map(|r| r.id.clone())
            .ok_or_else(|| Error::Catalog(format!("No routine matching '{}'", key)))?;
        let index = self
            .routines
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::Catalog(format!("No routine matching '{}'", key)))?;
        let removed = self.routines.remove(index);
        tracing::info!("Removed routine '{}' ({})", removed.name, removed.id);
        Ok(removed)
    }

    /// Look up a routine by exact id, then by case-insensitive name
    pub fn find_routine(&self, key: &str) -> Option<&RoutineDefinition> {
        self.routines
            .iter()
            .find(|r| r.id == key)
            .or_else(|| {
                self.routines
                    .iter()
                    .find(|r| r.name.eq_ignore_ascii_case(key))
            })
    }

    /// Validate the catalog contents, returning every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for exercise in &self.exercises {
            if exercise.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            } else if !seen.insert(exercise.id.as_str()) {
                errors.push(format!("Duplicate exercise ID '{}'", exercise.id));
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", exercise.id));
            }
            errors.extend(validate_exercise(exercise));
        }

        let mut seen = HashSet::new();
        for routine in &self.routines {
            if routine.id.is_empty() {
                errors.push("Routine has empty ID".to_string());
            } else if !seen.insert(routine.id.as_str()) {
                errors.push(format!("Duplicate routine ID '{}'", routine.id));
            }
            if routine.name.is_empty() {
                errors.push(format!("Routine '{}' has empty name", routine.id));
            }
            if routine.exercises.is_empty() {
                errors.push(format!("Routine '{}' has no exercises", routine.name));
            }
            for exercise in &routine.exercises {
                for error in validate_exercise(exercise) {
                    errors.push(format!("Routine '{}': {}", routine.name, error));
                }
            }
        }

        errors
    }
}
