//! Validated, read-only routine model for a guided session.
//!
//! A [`Routine`] is built from an authored [`RoutineDefinition`] once per
//! session. Construction copies every exercise into a run-local
//! [`RoutineExercise`], so nothing the engine does can reach back into the
//! catalog.

use crate::{Error, Exercise, ExerciseKind, Result, RoutineDefinition};

/// What a Work phase consists of
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Work {
    /// Countdown of `seconds`
    Timed { seconds: u32 },
    /// Operator-paced, `count` repetitions
    Reps { count: u32 },
}

/// One run-local occurrence of an exercise within a routine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutineExercise {
    pub exercise_id: String,
    pub name: String,
    pub sets: u32,
    pub rest_seconds: u32,
    pub work: Work,
}

impl RoutineExercise {
    pub fn is_timed(&self) -> bool {
        matches!(self.work, Work::Timed { .. })
    }

    /// Countdown length of one Work phase; zero for repetition work
    pub fn work_seconds(&self) -> u32 {
        match self.work {
            Work::Timed { seconds } => seconds,
            Work::Reps { .. } => 0,
        }
    }

    fn from_exercise(exercise: &Exercise) -> Self {
        let work = match exercise.kind {
            ExerciseKind::Time { duration_seconds } => Work::Timed {
                seconds: duration_seconds as u32,
            },
            ExerciseKind::Reps { rep_count } => Work::Reps {
                count: rep_count as u32,
            },
        };

        Self {
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            sets: exercise.sets as u32,
            rest_seconds: exercise.rest_seconds as u32,
            work,
        }
    }
}

/// Check a single authored exercise, returning every problem found
pub fn validate_exercise(exercise: &Exercise) -> Vec<String> {
    let mut errors = Vec::new();
    let label = if exercise.name.is_empty() {
        exercise.id.as_str()
    } else {
        exercise.name.as_str()
    };

    if exercise.sets < 1 {
        errors.push(format!(
            "Exercise '{}': sets must be at least 1 (got {})",
            label, exercise.sets
        ));
    }
    if exercise.rest_seconds < 0 {
        errors.push(format!(
            "Exercise '{}': rest must not be negative (got {})",
            label, exercise.rest_seconds
        ));
    }
    match exercise.kind {
        ExerciseKind::Time { duration_seconds } if duration_seconds < 1 => {
            errors.push(format!(
                "Exercise '{}': duration must be at least 1 second (got {})",
                label, duration_seconds
            ));
        }
        ExerciseKind::Reps { rep_count } if rep_count < 1 => {
            errors.push(format!(
                "Exercise '{}': rep count must be at least 1 (got {})",
                label, rep_count
            ));
        }
        _ => {}
    }

    errors
}

/// Ordered, validated exercise sequence driving one session
#[derive(Clone, Debug)]
pub struct Routine {
    id: String,
    name: String,
    exercises: Vec<RoutineExercise>,
}

impl Routine {
    /// Build a routine, failing with [`Error::Validation`] on malformed data
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        exercises: &[Exercise],
    ) -> Result<Self> {
        let name = name.into();
        let mut errors = Vec::new();

        if exercises.is_empty() {
            errors.push(format!("Routine '{}' has no exercises", name));
        }
        for exercise in exercises {
            errors.extend(validate_exercise(exercise));
        }

        if !errors.is_empty() {
            return Err(Error::Validation(errors.join("; ")));
        }

        Ok(Self {
            id: id.into(),
            name,
            exercises: exercises.iter().map(RoutineExercise::from_exercise).collect(),
        })
    }

    /// Build a routine from a saved definition
    pub fn from_definition(definition: &RoutineDefinition) -> Result<Self> {
        Self::new(&definition.id, &definition.name, &definition.exercises)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exercises(&self) -> &[RoutineExercise] {
        &self.exercises
    }

    /// Never zero; construction rejects empty routines
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RoutineExercise> {
        self.exercises.get(index)
    }
}
