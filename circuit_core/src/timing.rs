//! Timed-progress projection over a routine and its run state.
//!
//! Only countdown-bearing time is measured: repetition work is
//! operator-paced and contributes nothing. Everything here is recomputed
//! from the routine and the current [`RunState`] on every call rather than
//! kept in running counters.

use crate::engine::RunState;
use crate::routine::{Routine, RoutineExercise};
use crate::Phase;

/// Full countdown time of one exercise: every work set plus the rests between them
pub fn exercise_timed_seconds(exercise: &RoutineExercise) -> u64 {
    if !exercise.is_timed() {
        return 0;
    }

    let sets = u64::from(exercise.sets);
    let work = u64::from(exercise.work_seconds()).saturating_mul(sets);
    let rest = u64::from(exercise.rest_seconds).saturating_mul(sets.saturating_sub(1));
    work.saturating_add(rest)
}

/// Countdown time of the whole routine
pub fn total_timed_seconds(routine: &Routine) -> u64 {
    routine
        .exercises()
        .iter()
        .map(exercise_timed_seconds)
        .fold(0, u64::saturating_add)
}

/// Countdown time still ahead of `state`
pub fn remaining_timed_seconds(routine: &Routine, state: &RunState) -> u64 {
    if state.complete {
        return 0;
    }

    routine
        .exercises()
        .iter()
        .enumerate()
        .skip(state.exercise_index)
        .map(|(index, exercise)| {
            if index == state.exercise_index {
                remaining_in_current(exercise, state)
            } else {
                exercise_timed_seconds(exercise)
            }
        })
        .fold(0, u64::saturating_add)
}

/// Countdown time already behind `state`, clamped to `0..=total`
pub fn elapsed_timed_seconds(routine: &Routine, state: &RunState) -> u64 {
    let total = total_timed_seconds(routine);
    let remaining = remaining_timed_seconds(routine, state);
    total.saturating_sub(remaining).min(total)
}

fn remaining_in_current(exercise: &RoutineExercise, state: &RunState) -> u64 {
    if !exercise.is_timed() {
        return 0;
    }

    let total_sets = u64::from(exercise.sets.max(1));
    let work = u64::from(exercise.work_seconds());
    let rest = u64::from(exercise.rest_seconds);
    let current = u64::from(state.seconds_remaining);

    // The set whose work just ended counts as done while resting.
    let completed_sets = match state.phase {
        Phase::Work => u64::from(state.set_number).saturating_sub(1),
        Phase::Rest => u64::from(state.set_number),
    }
    .min(total_sets);

    match state.phase {
        Phase::Work => {
            let sets_after_current = total_sets.saturating_sub(completed_sets + 1);
            current.saturating_add(sets_after_current.saturating_mul(work.saturating_add(rest)))
        }
        Phase::Rest => {
            let sets_remaining = total_sets.saturating_sub(completed_sets);
            current
                .saturating_add(sets_remaining.saturating_mul(work))
                .saturating_add(sets_remaining.saturating_sub(1).saturating_mul(rest))
        }
    }
}

/// Format seconds as `m:ss`
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Exercise, ExerciseKind};

    fn timed(duration: i32, sets: i32, rest: i32) -> Exercise {
        Exercise {
            id: "t".into(),
            name: "Timed".into(),
            sets,
            rest_seconds: rest,
            kind: ExerciseKind::Time {
                duration_seconds: duration,
            },
        }
    }

    fn reps(count: i32, sets: i32, rest: i32) -> Exercise {
        Exercise {
            id: "r".into(),
            name: "Reps".into(),
            sets,
            rest_seconds: rest,
            kind: ExerciseKind::Reps { rep_count: count },
        }
    }

    fn state(index: usize, set: u32, phase: Phase, remaining: u32) -> RunState {
        RunState {
            exercise_index: index,
            set_number: set,
            phase,
            seconds_remaining: remaining,
            running: true,
            complete: false,
        }
    }

    #[test]
    fn test_exercise_total() {
        let routine = Routine::new("r", "R", &[timed(60, 2, 30)]).unwrap();
        assert_eq!(exercise_timed_seconds(&routine.exercises()[0]), 150);
        assert_eq!(total_timed_seconds(&routine), 150);
    }

    #[test]
    fn test_single_set_has_no_rest_in_total() {
        let routine = Routine::new("r", "R", &[timed(45, 1, 90)]).unwrap();
        assert_eq!(total_timed_seconds(&routine), 45);
    }

    #[test]
    fn test_reps_contribute_nothing() {
        let routine = Routine::new("r", "R", &[reps(15, 3, 20)]).unwrap();
        assert_eq!(total_timed_seconds(&routine), 0);
        assert_eq!(remaining_timed_seconds(&routine, &state(0, 2, Phase::Rest, 20)), 0);
    }

    #[test]
    fn test_remaining_mid_work() {
        let routine = Routine::new("r", "R", &[timed(60, 3, 30)]).unwrap();
        // 40s left in set 2, then one more set preceded by a rest
        assert_eq!(
            remaining_timed_seconds(&routine, &state(0, 2, Phase::Work, 40)),
            40 + 30 + 60
        );
    }

    #[test]
    fn test_remaining_mid_rest() {
        let routine = Routine::new("r", "R", &[timed(60, 3, 30)]).unwrap();
        // Resting after set 1: 10s of rest, then 2 sets with one rest between
        assert_eq!(
            remaining_timed_seconds(&routine, &state(0, 1, Phase::Rest, 10)),
            10 + 60 * 2 + 30
        );
    }

    #[test]
    fn test_past_and_future_exercises() {
        let routine =
            Routine::new("r", "R", &[timed(10, 1, 0), reps(5, 2, 10), timed(20, 2, 5)]).unwrap();
        assert_eq!(total_timed_seconds(&routine), 10 + 45);
        // On the reps exercise: the first exercise is behind, the last one is ahead
        let at_reps = state(1, 1, Phase::Work, 0);
        assert_eq!(remaining_timed_seconds(&routine, &at_reps), 45);
        assert_eq!(elapsed_timed_seconds(&routine, &at_reps), 10);
    }

    #[test]
    fn test_complete_state_has_nothing_remaining() {
        let routine = Routine::new("r", "R", &[timed(60, 2, 30)]).unwrap();
        let mut done = state(0, 2, Phase::Work, 60);
        done.complete = true;
        done.running = false;
        assert_eq!(remaining_timed_seconds(&routine, &done), 0);
        assert_eq!(elapsed_timed_seconds(&routine, &done), 150);
    }

    #[test]
    fn test_elapsed_is_clamped() {
        let routine = Routine::new("r", "R", &[timed(60, 1, 0)]).unwrap();
        // A transient remaining above the work length never yields negative elapsed
        assert_eq!(elapsed_timed_seconds(&routine, &state(0, 1, Phase::Work, 90)), 0);
    }

    #[test]
    fn test_huge_routine_saturates() {
        let huge = timed(i32::MAX, i32::MAX, i32::MAX);
        let routine = Routine::new("r", "R", &[huge.clone(), huge.clone(), huge]).unwrap();

        assert_eq!(total_timed_seconds(&routine), u64::MAX);
        let at_start = state(0, 1, Phase::Work, i32::MAX as u32);
        assert_eq!(remaining_timed_seconds(&routine, &at_start), u64::MAX);
        assert_eq!(elapsed_timed_seconds(&routine, &at_start), 0);
        let resting = state(0, 7, Phase::Rest, 3);
        assert_eq!(remaining_timed_seconds(&routine, &resting), u64::MAX);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(59), "0:59");
        assert_eq!(format_clock(60), "1:00");
        assert_eq!(format_clock(754), "12:34");
    }
}
