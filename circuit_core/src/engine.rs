//! Workout execution engine.
//!
//! The engine walks a [`Routine`] set by set, alternating Work and Rest
//! phases, and owns the only mutable session state ([`RunState`]). It never
//! reads a clock: an external tick source calls [`Engine::tick`] once per
//! second while the session is running, and the caller issues the remaining
//! commands (start, pause, skip, complete-set) from user input.
//!
//! ## Transitions
//!
//! Every phase boundary funnels through one function:
//!
//! - Work ends: rest if more sets remain and the exercise has rest,
//!   otherwise advance.
//! - Rest ends: advance.
//! - Advance: next set of the same exercise, else first set of the next
//!   exercise, else complete.
//!
//! Rest is never inserted between different exercises.

use crate::routine::{Routine, RoutineExercise};
use crate::timing;
use crate::{Error, Phase, Result};

/// Outbound notifications raised by the engine
pub trait CueSink {
    /// A countdown reached zero or a set was marked done
    fn on_phase_boundary(&mut self);

    /// The routine finished; raised exactly once per session
    fn on_complete(&mut self);
}

/// Cue sink that discards every notification
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentCues;

impl CueSink for SilentCues {
    fn on_phase_boundary(&mut self) {}

    fn on_complete(&mut self) {}
}

/// Mutable position of one session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunState {
    /// 0-based position in the routine
    pub exercise_index: usize,
    /// 1-based, never above the current exercise's set count
    pub set_number: u32,
    pub phase: Phase,
    /// Only meaningful while a countdown is active
    pub seconds_remaining: u32,
    pub running: bool,
    /// Terminal; no transition leaves it
    pub complete: bool,
}

/// What follows the current phase
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NextUp {
    Rest(u32),
    Set(u32),
    Exercise(String),
    Finish,
}

impl std::fmt::Display for NextUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NextUp::Rest(seconds) => write!(f, "Next: {}s rest", seconds),
            NextUp::Set(set) => write!(f, "Next: set {}", set),
            NextUp::Exercise(name) => write!(f, "Next: {}", name),
            NextUp::Finish => write!(f, "Last set!"),
        }
    }
}

/// Phase/set sequencer and countdown driver for one session
pub struct Engine<C: CueSink = SilentCues> {
    routine: Routine,
    state: RunState,
    cues: C,
}

impl<C: CueSink> Engine<C> {
    /// Start a session at the first set of the first exercise, paused
    pub fn new(routine: Routine, cues: C) -> Self {
        let seconds_remaining = routine
            .get(0)
            .map(RoutineExercise::work_seconds)
            .unwrap_or(0);

        tracing::info!(
            "Session created for routine '{}' ({} exercises)",
            routine.name(),
            routine.len()
        );

        Self {
            routine,
            state: RunState {
                exercise_index: 0,
                set_number: 1,
                phase: Phase::Work,
                seconds_remaining,
                running: false,
                complete: false,
            },
            cues,
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Begin or resume the session
    pub fn start(&mut self) -> Result<()> {
        if self.state.complete {
            return Err(Error::Command("cannot start a completed session".into()));
        }
        if !self.state.running {
            self.state.running = true;
            tracing::debug!("Session running");
        }
        Ok(())
    }

    /// Freeze the countdown at its current value
    ///
    /// Pausing a session that is not running is a no-op.
    pub fn pause(&mut self) -> Result<()> {
        if self.state.running {
            self.state.running = false;
            tracing::debug!(
                "Session paused with {}s remaining",
                self.state.seconds_remaining
            );
        }
        Ok(())
    }

    /// Advance the countdown by one second
    ///
    /// Ignored unless the session is running with an active countdown, so a
    /// tick delivered while paused (or during repetition work) has no effect.
    pub fn tick(&mut self) {
        if !self.state.running || !self.has_active_countdown() {
            tracing::trace!("Tick ignored");
            return;
        }
        if self.state.seconds_remaining == 0 {
            tracing::warn!("Tick with an already expired countdown");
            return;
        }

        self.state.seconds_remaining -= 1;
        if self.state.seconds_remaining == 0 {
            self.cues.on_phase_boundary();
            self.phase_complete();
        }
    }

    /// Mark the current repetition set as done
    ///
    /// Only valid while running, in Work, on a repetition-based exercise.
    pub fn complete_set(&mut self) -> Result<()> {
        if self.state.complete {
            return Err(Error::Command("session is already complete".into()));
        }
        if self.state.phase != Phase::Work {
            return Err(Error::Command("no set in progress during rest".into()));
        }
        if self.current().is_timed() {
            return Err(Error::Command(
                "timed sets finish when their countdown expires".into(),
            ));
        }
        if !self.state.running {
            return Err(Error::Command("session is paused".into()));
        }

        self.cues.on_phase_boundary();
        self.phase_complete();
        Ok(())
    }

    /// End the current phase immediately, without a cue
    pub fn skip(&mut self) -> Result<()> {
        if self.state.complete {
            return Err(Error::Command("session is already complete".into()));
        }

        tracing::debug!(
            "Skipping {} of set {} in exercise {}",
            self.state.phase,
            self.state.set_number,
            self.state.exercise_index
        );
        self.phase_complete();
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Exercise being performed; `None` once the routine is complete
    pub fn current_exercise(&self) -> Option<&RoutineExercise> {
        if self.state.complete {
            None
        } else {
            self.routine.get(self.state.exercise_index)
        }
    }

    pub fn current_set(&self) -> u32 {
        self.state.set_number
    }

    pub fn current_phase(&self) -> Phase {
        self.state.phase
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.state.seconds_remaining
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn is_complete(&self) -> bool {
        self.state.complete
    }

    /// Whether ticks currently move the session forward (ignoring pause)
    pub fn has_active_countdown(&self) -> bool {
        if self.state.complete {
            return false;
        }
        match self.state.phase {
            Phase::Work => self.current().is_timed(),
            Phase::Rest => true,
        }
    }

    pub fn total_timed_seconds(&self) -> u64 {
        timing::total_timed_seconds(&self.routine)
    }

    pub fn remaining_timed_seconds(&self) -> u64 {
        timing::remaining_timed_seconds(&self.routine, &self.state)
    }

    pub fn elapsed_timed_seconds(&self) -> u64 {
        timing::elapsed_timed_seconds(&self.routine, &self.state)
    }

    /// What the next transition will lead to
    pub fn next_up(&self) -> NextUp {
        if self.state.complete {
            return NextUp::Finish;
        }

        let exercise = self.current();
        let has_more_sets = self.state.set_number < exercise.sets;

        if self.state.phase == Phase::Work && has_more_sets && exercise.rest_seconds > 0 {
            NextUp::Rest(exercise.rest_seconds)
        } else if has_more_sets {
            NextUp::Set(self.state.set_number + 1)
        } else if let Some(next) = self.routine.get(self.state.exercise_index + 1) {
            NextUp::Exercise(next.name.clone())
        } else {
            NextUp::Finish
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn routine(&self) -> &Routine {
        &self.routine
    }

    pub fn cues(&self) -> &C {
        &self.cues
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    fn current(&self) -> &RoutineExercise {
        // exercise_index stays in bounds: it only grows while a later exercise exists
        &self.routine.exercises()[self.state.exercise_index]
    }

    fn phase_complete(&mut self) {
        match self.state.phase {
            Phase::Work => {
                let exercise = self.current();
                let has_more_sets = self.state.set_number < exercise.sets;
                let rest_seconds = exercise.rest_seconds;

                if has_more_sets && rest_seconds > 0 {
                    self.state.phase = Phase::Rest;
                    self.state.seconds_remaining = rest_seconds;
                    tracing::debug!(
                        "Resting {}s after set {}",
                        rest_seconds,
                        self.state.set_number
                    );
                } else {
                    self.advance();
                }
            }
            Phase::Rest => self.advance(),
        }
    }

    fn advance(&mut self) {
        let sets = self.current().sets;

        if self.state.set_number < sets {
            self.state.set_number += 1;
            self.state.phase = Phase::Work;
            self.state.seconds_remaining = self.current().work_seconds();
            tracing::debug!(
                "Set {} of exercise {}",
                self.state.set_number,
                self.state.exercise_index
            );
        } else if self.state.exercise_index + 1 < self.routine.len() {
            self.state.exercise_index += 1;
            self.state.set_number = 1;
            self.state.phase = Phase::Work;
            self.state.seconds_remaining = self.current().work_seconds();
            tracing::info!(
                "Exercise {} of {}: {}",
                self.state.exercise_index + 1,
                self.routine.len(),
                self.current().name
            );
        } else {
            self.state.complete = true;
            self.state.running = false;
            self.state.phase = Phase::Work;
            self.state.seconds_remaining = 0;
            tracing::info!("Routine '{}' complete", self.routine.name());
            self.cues.on_complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Exercise, ExerciseKind};

    #[derive(Debug, Default)]
    struct CountingCues {
        boundaries: usize,
        completions: usize,
    }

    impl CueSink for CountingCues {
        fn on_phase_boundary(&mut self) {
            self.boundaries += 1;
        }

        fn on_complete(&mut self) {
            self.completions += 1;
        }
    }

    fn timed(name: &str, duration: i32, sets: i32, rest: i32) -> Exercise {
        Exercise {
            id: name.to_lowercase(),
            name: name.into(),
            sets,
            rest_seconds: rest,
            kind: ExerciseKind::Time {
                duration_seconds: duration,
            },
        }
    }

    fn reps(name: &str, count: i32, sets: i32, rest: i32) -> Exercise {
        Exercise {
            id: name.to_lowercase(),
            name: name.into(),
            sets,
            rest_seconds: rest,
            kind: ExerciseKind::Reps { rep_count: count },
        }
    }

    fn engine(exercises: &[Exercise]) -> Engine<CountingCues> {
        crate::logging::init_test();
        let routine = Routine::new("test", "Test", exercises).unwrap();
        Engine::new(routine, CountingCues::default())
    }

    fn ticks(engine: &mut Engine<CountingCues>, n: usize) {
        for _ in 0..n {
            engine.tick();
        }
    }

    /// Drive a session to completion the way a host would, recording the
    /// remaining timed seconds and exercise index after every step
    fn run_to_completion(engine: &mut Engine<CountingCues>) -> (Vec<u64>, Vec<usize>) {
        let mut remaining = vec![engine.remaining_timed_seconds()];
        let mut indices = vec![engine.state().exercise_index];
        engine.start().unwrap();

        for _ in 0..100_000 {
            if engine.is_complete() {
                break;
            }
            if engine.has_active_countdown() {
                engine.tick();
            } else {
                engine.complete_set().unwrap();
            }
            remaining.push(engine.remaining_timed_seconds());
            indices.push(engine.state().exercise_index);
        }

        assert!(engine.is_complete(), "session did not finish");
        (remaining, indices)
    }

    #[test]
    fn test_initial_state() {
        let engine = engine(&[timed("Plank", 60, 2, 30)]);
        assert_eq!(
            engine.state(),
            &RunState {
                exercise_index: 0,
                set_number: 1,
                phase: Phase::Work,
                seconds_remaining: 60,
                running: false,
                complete: false,
            }
        );
        assert_eq!(engine.current_exercise().unwrap().name, "Plank");
    }

    #[test]
    fn test_timed_sets_rest_between() {
        let mut engine = engine(&[timed("Plank", 60, 2, 30)]);
        assert_eq!(engine.total_timed_seconds(), 150);
        assert_eq!(engine.remaining_timed_seconds(), 150);

        engine.start().unwrap();
        ticks(&mut engine, 60);
        assert_eq!(engine.current_phase(), Phase::Rest);
        assert_eq!(engine.seconds_remaining(), 30);
        assert_eq!(engine.current_set(), 1);
        assert_eq!(engine.elapsed_timed_seconds(), 60);

        ticks(&mut engine, 30);
        assert_eq!(engine.current_set(), 2);
        assert_eq!(engine.current_phase(), Phase::Work);
        assert_eq!(engine.seconds_remaining(), 60);
        assert_eq!(engine.remaining_timed_seconds(), 60);

        ticks(&mut engine, 60);
        assert!(engine.is_complete());
        assert!(!engine.is_running());
        assert_eq!(engine.remaining_timed_seconds(), 0);
        assert_eq!(engine.cues().boundaries, 3);
        assert_eq!(engine.cues().completions, 1);
    }

    #[test]
    fn test_rep_sets_rest_between() {
        let mut engine = engine(&[reps("Squat", 15, 3, 20)]);
        assert_eq!(engine.total_timed_seconds(), 0);
        engine.start().unwrap();

        // Ticks never move repetition work
        ticks(&mut engine, 500);
        assert_eq!(engine.current_phase(), Phase::Work);
        assert_eq!(engine.current_set(), 1);

        for set in 1..=2 {
            engine.complete_set().unwrap();
            assert_eq!(engine.current_phase(), Phase::Rest);
            assert_eq!(engine.current_set(), set);
            assert_eq!(engine.seconds_remaining(), 20);
            ticks(&mut engine, 20);
            assert_eq!(engine.current_phase(), Phase::Work);
            assert_eq!(engine.current_set(), set + 1);
        }

        engine.complete_set().unwrap();
        assert!(engine.is_complete());
        assert_eq!(engine.cues().completions, 1);
    }

    #[test]
    fn test_single_sets_move_straight_on() {
        let mut engine = engine(&[timed("Hold", 10, 1, 0), reps("Push-up", 5, 1, 0)]);
        engine.start().unwrap();

        ticks(&mut engine, 9);
        assert_eq!(engine.state().exercise_index, 0);
        engine.tick();
        assert_eq!(engine.state().exercise_index, 1);
        assert_eq!(engine.current_phase(), Phase::Work);
        assert_eq!(engine.current_set(), 1);

        engine.complete_set().unwrap();
        assert!(engine.is_complete());
    }

    #[test]
    fn test_no_rest_between_exercises() {
        let mut engine = engine(&[timed("A", 5, 1, 90), timed("B", 5, 2, 0)]);
        engine.start().unwrap();

        ticks(&mut engine, 5);
        assert_eq!(engine.state().exercise_index, 1);
        assert_eq!(engine.current_phase(), Phase::Work);

        // Zero rest: set 2 follows set 1 directly
        ticks(&mut engine, 5);
        assert_eq!(engine.current_set(), 2);
        assert_eq!(engine.current_phase(), Phase::Work);
    }

    #[test]
    fn test_last_set_never_rests() {
        let mut engine = engine(&[reps("Lunge", 10, 2, 60), timed("Plank", 5, 1, 0)]);
        engine.start().unwrap();

        engine.complete_set().unwrap();
        assert_eq!(engine.current_phase(), Phase::Rest);
        engine.skip().unwrap();
        engine.complete_set().unwrap();
        assert_eq!(engine.state().exercise_index, 1);
        assert_eq!(engine.current_phase(), Phase::Work);
    }

    #[test]
    fn test_pause_ignores_ticks() {
        let mut engine = engine(&[timed("Plank", 60, 2, 30)]);
        engine.start().unwrap();
        ticks(&mut engine, 10);
        engine.pause().unwrap();

        let before = engine.state().clone();
        ticks(&mut engine, 200);
        assert_eq!(engine.state(), &before);

        engine.start().unwrap();
        engine.tick();
        assert_eq!(engine.seconds_remaining(), 49);
    }

    #[test]
    fn test_ticks_before_start_are_ignored() {
        let mut engine = engine(&[timed("Plank", 60, 1, 0)]);
        ticks(&mut engine, 5);
        assert_eq!(engine.seconds_remaining(), 60);
    }

    #[test]
    fn test_skip_has_no_boundary_cue() {
        let mut engine = engine(&[timed("Plank", 60, 2, 30), reps("Squat", 10, 1, 0)]);

        engine.skip().unwrap();
        assert_eq!(engine.current_phase(), Phase::Rest);
        engine.skip().unwrap();
        assert_eq!(engine.current_set(), 2);
        engine.skip().unwrap();
        assert_eq!(engine.state().exercise_index, 1);
        engine.skip().unwrap();

        assert!(engine.is_complete());
        assert_eq!(engine.cues().boundaries, 0);
        assert_eq!(engine.cues().completions, 1);
    }

    #[test]
    fn test_skip_always_changes_state() {
        let mut engine = engine(&[
            timed("A", 3, 2, 2),
            reps("B", 4, 2, 0),
            timed("C", 2, 1, 5),
        ]);

        while !engine.is_complete() {
            let before = engine.state().clone();
            engine.skip().unwrap();
            assert_ne!(engine.state(), &before);
        }
    }

    #[test]
    fn test_skip_preserves_running_flag() {
        let mut engine = engine(&[timed("A", 3, 2, 2)]);
        engine.skip().unwrap();
        assert!(!engine.is_running());

        engine.start().unwrap();
        engine.skip().unwrap();
        assert!(engine.is_running());
    }

    #[test]
    fn test_complete_set_preconditions() {
        let mut engine = engine(&[reps("Squat", 10, 2, 10), timed("Plank", 5, 1, 0)]);

        // Paused
        assert!(matches!(engine.complete_set(), Err(Error::Command(_))));
        assert_eq!(engine.current_set(), 1);

        engine.start().unwrap();
        engine.complete_set().unwrap();

        // Resting
        let resting = engine.state().clone();
        assert!(matches!(engine.complete_set(), Err(Error::Command(_))));
        assert_eq!(engine.state(), &resting);

        ticks(&mut engine, 10);
        engine.complete_set().unwrap();

        // Timed work
        assert!(engine.current_exercise().unwrap().is_timed());
        assert!(matches!(engine.complete_set(), Err(Error::Command(_))));
    }

    #[test]
    fn test_complete_is_terminal() {
        let mut engine = engine(&[reps("Squat", 10, 1, 0)]);
        engine.start().unwrap();
        engine.complete_set().unwrap();
        assert!(engine.is_complete());
        assert!(engine.current_exercise().is_none());

        let done = engine.state().clone();
        assert!(engine.start().is_err());
        assert!(engine.skip().is_err());
        assert!(engine.complete_set().is_err());
        engine.pause().unwrap();
        engine.tick();
        assert_eq!(engine.state(), &done);
        assert_eq!(engine.cues().completions, 1);
    }

    #[test]
    fn test_full_run_properties() {
        let mut engine = engine(&[
            timed("Plank", 6, 2, 3),
            reps("Push-up", 15, 3, 4),
            timed("Hold", 5, 1, 10),
            reps("Squat", 10, 1, 0),
            timed("Jacks", 4, 3, 0),
        ]);
        let total = engine.total_timed_seconds();
        assert_eq!(engine.remaining_timed_seconds(), total);

        let (remaining, indices) = run_to_completion(&mut engine);

        assert!(remaining.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(*remaining.last().unwrap(), 0);

        assert!(indices.windows(2).all(|w| w[1] == w[0] || w[1] == w[0] + 1));
        assert_eq!(*indices.last().unwrap(), 4);
        assert_eq!(engine.cues().completions, 1);
        assert_eq!(engine.elapsed_timed_seconds(), total);
    }

    #[test]
    fn test_skips_keep_remaining_monotonic() {
        let mut engine = engine(&[timed("Plank", 20, 3, 10), timed("Hold", 8, 2, 4)]);
        engine.start().unwrap();
        let mut previous = engine.remaining_timed_seconds();

        let mut step = 0;
        while !engine.is_complete() {
            if step % 3 == 0 {
                engine.skip().unwrap();
            } else {
                engine.tick();
            }
            let now = engine.remaining_timed_seconds();
            assert!(now <= previous, "remaining grew from {} to {}", previous, now);
            previous = now;
            step += 1;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_rest_never_entered_without_rest_or_sets() {
        let mut engine = engine(&[
            timed("A", 2, 1, 30),
            reps("B", 5, 1, 30),
            timed("C", 2, 3, 0),
            reps("D", 5, 2, 0),
        ]);
        engine.start().unwrap();

        while !engine.is_complete() {
            assert_eq!(engine.current_phase(), Phase::Work);
            if engine.has_active_countdown() {
                engine.tick();
            } else {
                engine.complete_set().unwrap();
            }
        }
    }

    #[test]
    fn test_next_up() {
        let mut engine = engine(&[timed("Plank", 5, 2, 30), reps("Squat", 10, 1, 0)]);
        assert_eq!(engine.next_up(), NextUp::Rest(30));

        engine.skip().unwrap();
        assert_eq!(engine.next_up(), NextUp::Set(2));

        engine.skip().unwrap();
        assert_eq!(engine.next_up(), NextUp::Exercise("Squat".into()));

        engine.skip().unwrap();
        assert_eq!(engine.next_up(), NextUp::Finish);
        assert_eq!(engine.next_up().to_string(), "Last set!");
    }

    #[test]
    fn test_silent_cues() {
        let routine = Routine::new("r", "R", &[reps("Squat", 10, 1, 0)]).unwrap();
        let mut engine = Engine::new(routine, SilentCues);
        engine.start().unwrap();
        engine.complete_set().unwrap();
        assert!(engine.is_complete());
    }
}
