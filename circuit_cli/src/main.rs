use chrono::Local;
use circuit_core::*;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "circuit")]
#[command(about = "Guided interval and rep workout runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override config file location
    #[arg(long = "config", global = true, env = "CIRCUIT_CONFIG")]
    config_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the exercise library
    Exercises {
        #[command(subcommand)]
        action: Option<ExerciseAction>,
    },

    /// Manage saved routines (default: list them)
    Routines {
        #[command(subcommand)]
        action: Option<RoutineAction>,
    },

    /// Run a routine as a guided session
    Run {
        /// Routine id or name
        routine: String,

        /// Drive the session without waiting (for scripting and testing)
        #[arg(long)]
        auto: bool,
    },

    /// Show recently finished sessions
    History {
        /// Number of sessions to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Inspect or create the config file (default: show it)
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ExerciseAction {
    /// List all exercises
    List,

    /// Add an exercise
    Add {
        #[arg(long)]
        name: String,

        /// Work duration in seconds (time-based exercise)
        #[arg(
            long,
            conflicts_with = "reps",
            required_unless_present = "reps",
            allow_hyphen_values = true
        )]
        time: Option<i32>,

        /// Repetitions per set (repetition-based exercise)
        #[arg(long, allow_hyphen_values = true)]
        reps: Option<i32>,

        #[arg(long, default_value_t = 3, allow_hyphen_values = true)]
        sets: i32,

        /// Rest after each set in seconds (0 for none)
        #[arg(long, default_value_t = 60, allow_hyphen_values = true)]
        rest: i32,
    },

    /// Change an exercise (saved routines keep their copy)
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        /// Make it time-based with this work duration in seconds
        #[arg(long, conflicts_with = "reps", allow_hyphen_values = true)]
        time: Option<i32>,

        /// Make it repetition-based with this many reps per set
        #[arg(long, allow_hyphen_values = true)]
        reps: Option<i32>,

        #[arg(long, allow_hyphen_values = true)]
        sets: Option<i32>,

        /// Rest after each set in seconds (0 for none)
        #[arg(long, allow_hyphen_values = true)]
        rest: Option<i32>,
    },

    /// Remove an exercise (saved routines keep their copy)
    Remove { id: String },
}

#[derive(Subcommand)]
enum RoutineAction {
    /// List all routines
    List,

    /// Create a routine from exercise ids, in order
    Create {
        #[arg(long)]
        name: String,

        /// Exercise ids; repeat an id to do the exercise again
        #[arg(required = true)]
        exercises: Vec<String>,
    },

    /// Show a routine's exercises and timed length
    Show { routine: String },

    /// Rename or rearrange a routine
    ///
    /// Positions start at 1. Changes apply in this order: rename, removals
    /// (positions in the routine as it stands), additions, then moves.
    Edit {
        routine: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// Remove the exercise at this position
        #[arg(long = "remove", value_name = "POS", value_parser = parse_position)]
        remove: Vec<usize>,

        /// Add a library exercise at the end, or at a position with POS:ID
        #[arg(long = "add", value_name = "[POS:]ID", value_parser = parse_add)]
        add: Vec<RoutineEdit>,

        /// Move the exercise at FROM to position TO
        #[arg(long = "move", value_name = "FROM:TO", value_parser = parse_move)]
        moves: Vec<RoutineEdit>,
    },

    /// Delete a routine
    Remove { routine: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location and effective settings
    Show,

    /// Write a config file with default settings
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Turn a 1-based position into an index
fn parse_position(value: &str) -> std::result::Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(position) if position >= 1 => Ok(position - 1),
        _ => Err(format!("'{}' is not a position (1, 2, 3, ...)", value)),
    }
}

fn parse_move(value: &str) -> std::result::Result<RoutineEdit, String> {
    let (from, to) = value
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{}'", value))?;
    Ok(RoutineEdit::Move {
        from: parse_position(from)?,
        to: parse_position(to)?,
    })
}

fn parse_add(value: &str) -> std::result::Result<RoutineEdit, String> {
    let (at, exercise_id) = match value.split_once(':') {
        Some((position, id)) => (Some(parse_position(position)?), id),
        None => (None, value),
    };
    if exercise_id.is_empty() {
        return Err(format!("expected an exercise id, got '{}'", value));
    }
    Ok(RoutineEdit::Add {
        exercise_id: exercise_id.to_string(),
        at,
    })
}

/// File locations under the data directory
struct Paths {
    catalog: PathBuf,
    history: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        Self {
            catalog: data_dir.join("catalog.json"),
            history: data_dir.join("history.jsonl"),
        }
    }
}

fn main() -> Result<()> {
    // Keep the terminal for the session display; logs go to stderr
    circuit_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config_path = cli.config_file.unwrap_or_else(Config::default_config_path);
    // Replacing the file must work even when the current one doesn't parse
    if let Some(Commands::Config {
        action: Some(ConfigAction::Init { force }),
    }) = &cli.command
    {
        return cmd_config_init(&config_path, *force);
    }
    let config = Config::load_or_default(&config_path)?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = Paths::new(&data_dir);
    let seed = config.catalog.seed_defaults;

    match cli.command {
        Some(Commands::Exercises { action }) => match action.unwrap_or(ExerciseAction::List) {
            ExerciseAction::List => cmd_exercise_list(&paths, seed),
            ExerciseAction::Add {
                name,
                time,
                reps,
                sets,
                rest,
            } => cmd_exercise_add(&paths, seed, name, time, reps, sets, rest),
            ExerciseAction::Edit {
                id,
                name,
                time,
                reps,
                sets,
                rest,
            } => {
                let changes = ExerciseChanges {
                    name,
                    kind: exercise_kind(time, reps),
                    sets,
                    rest_seconds: rest,
                };
                cmd_exercise_edit(&paths, seed, &id, changes)
            }
            ExerciseAction::Remove { id } => cmd_exercise_remove(&paths, seed, &id),
        },
        Some(Commands::Routines { action }) => match action.unwrap_or(RoutineAction::List) {
            RoutineAction::List => cmd_routine_list(&paths, seed),
            RoutineAction::Create { name, exercises } => {
                cmd_routine_create(&paths, seed, &name, &exercises)
            }
            RoutineAction::Show { routine } => cmd_routine_show(&paths, seed, &routine),
            RoutineAction::Edit {
                routine,
                name,
                mut remove,
                add,
                moves,
            } => {
                // Highest position first so earlier removals don't shift later ones
                remove.sort_unstable_by(|a, b| b.cmp(a));
                remove.dedup();
                let edits: Vec<RoutineEdit> = name
                    .map(RoutineEdit::Rename)
                    .into_iter()
                    .chain(remove.into_iter().map(|at| RoutineEdit::Remove { at }))
                    .chain(add)
                    .chain(moves)
                    .collect();
                cmd_routine_edit(&paths, seed, &routine, &edits)
            }
            RoutineAction::Remove { routine } => cmd_routine_remove(&paths, seed, &routine),
        },
        Some(Commands::Run { routine, auto }) => cmd_run(&paths, seed, &routine, auto, &config),
        Some(Commands::History { limit }) => cmd_history(&paths, limit),
        Some(Commands::Config { action }) => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => cmd_config_show(&config_path, &config),
            ConfigAction::Init { force } => cmd_config_init(&config_path, force),
        },
        None => cmd_routine_list(&paths, seed),
    }
}

// ============================================================================
// Catalog commands
// ============================================================================

fn cmd_exercise_list(paths: &Paths, seed: bool) -> Result<()> {
    let catalog = Catalog::load(&paths.catalog, seed)?;

    if catalog.exercises.is_empty() {
        println!("No exercises yet. Add one with `circuit exercises add`.");
        return Ok(());
    }

    for exercise in &catalog.exercises {
        println!("  {:<12} {:<20} {}", exercise.id, exercise.name, exercise.summary());
    }
    Ok(())
}

/// The kind named by `--time` or `--reps`, if either was given
fn exercise_kind(time: Option<i32>, reps: Option<i32>) -> Option<ExerciseKind> {
    match (time, reps) {
        (Some(duration_seconds), _) => Some(ExerciseKind::Time { duration_seconds }),
        (None, Some(rep_count)) => Some(ExerciseKind::Reps { rep_count }),
        (None, None) => None,
    }
}

fn cmd_exercise_add(
    paths: &Paths,
    seed: bool,
    name: String,
    time: Option<i32>,
    reps: Option<i32>,
    sets: i32,
    rest: i32,
) -> Result<()> {
    let kind = exercise_kind(time, reps).ok_or_else(|| {
        Error::Validation("an exercise needs either --time or --reps".into())
    })?;

    let exercise = Exercise::new(name, kind, sets, rest);
    let summary = exercise.summary();
    let id = Catalog::update(&paths.catalog, seed, |catalog| catalog.add_exercise(exercise))?;

    println!("✓ Added exercise {} ({})", id, summary);
    Ok(())
}

fn cmd_exercise_edit(paths: &Paths, seed: bool, id: &str, changes: ExerciseChanges) -> Result<()> {
    let updated = Catalog::update(&paths.catalog, seed, |catalog| {
        catalog.update_exercise(id, changes)
    })?;
    println!("✓ Updated exercise {} ({})", updated.name, updated.summary());
    Ok(())
}

fn cmd_exercise_remove(paths: &Paths, seed: bool, id: &str) -> Result<()> {
    let removed = Catalog::update(&paths.catalog, seed, |catalog| catalog.remove_exercise(id))?;
    println!("✓ Removed exercise {}", removed.name);
    Ok(())
}

fn cmd_routine_list(paths: &Paths, seed: bool) -> Result<()> {
    let catalog = Catalog::load(&paths.catalog, seed)?;

    if catalog.routines.is_empty() {
        println!("No routines yet. Create one with `circuit routines create`.");
        return Ok(());
    }

    for definition in &catalog.routines {
        println!(
            "  {}  ({} exercises)  [{}]",
            definition.name,
            definition.exercises.len(),
            definition.id
        );
    }
    Ok(())
}

fn cmd_routine_create(paths: &Paths, seed: bool, name: &str, exercises: &[String]) -> Result<()> {
    let id = Catalog::update(&paths.catalog, seed, |catalog| {
        catalog.create_routine(name, exercises)
    })?;
    println!("✓ Created routine {} ({})", name.trim(), id);
    Ok(())
}

fn cmd_routine_show(paths: &Paths, seed: bool, key: &str) -> Result<()> {
    let catalog = Catalog::load(&paths.catalog, seed)?;
    let definition = find_routine(&catalog, key)?;
    let routine = Routine::from_definition(definition)?;

    println!("\n  {}", routine.name());
    println!();
    for (index, exercise) in definition.exercises.iter().enumerate() {
        println!("  {}. {:<20} {}", index + 1, exercise.name, exercise.summary());
    }
    println!();
    println!(
        "  Timed length: {}",
        format_clock(timing::total_timed_seconds(&routine))
    );
    Ok(())
}

fn cmd_routine_edit(paths: &Paths, seed: bool, key: &str, edits: &[RoutineEdit]) -> Result<()> {
    if edits.is_empty() {
        return Err(Error::Validation(format!(
            "Nothing to change for routine '{}'",
            key
        )));
    }
    let edited = Catalog::update(&paths.catalog, seed, |catalog| {
        catalog.edit_routine(key, edits)
    })?;

    println!("✓ Updated routine {}", edited.name);
    for (index, exercise) in edited.exercises.iter().enumerate() {
        println!("  {}. {:<20} {}", index + 1, exercise.name, exercise.summary());
    }
    Ok(())
}

fn cmd_routine_remove(paths: &Paths, seed: bool, key: &str) -> Result<()> {
    let removed = Catalog::update(&paths.catalog, seed, |catalog| catalog.remove_routine(key))?;
    println!("✓ Removed routine {}", removed.name);
    Ok(())
}

fn cmd_history(paths: &Paths, limit: usize) -> Result<()> {
    let records = recent_records(&paths.history, limit)?;

    if records.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    for record in records {
        println!(
            "  {}  {:<24} {:<9} timed {}",
            record.finished_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.routine_name,
            if record.completed { "complete" } else { "ended" },
            format_clock(record.timed_seconds_elapsed)
        );
    }
    Ok(())
}

fn cmd_config_show(path: &Path, config: &Config) -> Result<()> {
    let origin = if path.exists() { "" } else { " (not created; defaults)" };
    println!("# {}{}", path.display(), origin);
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn cmd_config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to replace it)",
            path.display()
        )));
    }
    Config::default().save_to(path)?;
    println!("✓ Wrote default config to {}", path.display());
    Ok(())
}

fn find_routine<'a>(catalog: &'a Catalog, key: &str) -> Result<&'a RoutineDefinition> {
    catalog
        .find_routine(key)
        .ok_or_else(|| Error::Catalog(format!("No routine matching '{}'", key)))
}

// ============================================================================
// Guided session
// ============================================================================

/// Phase-boundary cues rendered as terminal bells
struct TerminalCues {
    audible: bool,
}

impl TerminalCues {
    fn bell(&self) {
        if self.audible {
            print!("\x07");
            let _ = io::stdout().flush();
        }
    }
}

impl CueSink for TerminalCues {
    fn on_phase_boundary(&mut self) {
        self.bell();
    }

    fn on_complete(&mut self) {
        self.bell();
    }
}

/// Where the session is, for detecting transitions worth a banner
#[derive(Clone, Copy, PartialEq, Eq)]
struct Position {
    exercise_index: usize,
    set_number: u32,
    phase: Phase,
    complete: bool,
}

impl Position {
    fn of<C: CueSink>(engine: &Engine<C>) -> Self {
        let state = engine.state();
        Self {
            exercise_index: state.exercise_index,
            set_number: state.set_number,
            phase: state.phase,
            complete: state.complete,
        }
    }
}

fn cmd_run(paths: &Paths, seed: bool, key: &str, auto: bool, config: &Config) -> Result<()> {
    let catalog = Catalog::load(&paths.catalog, seed)?;
    let routine = Routine::from_definition(find_routine(&catalog, key)?)?;

    let cues = TerminalCues {
        audible: config.session.audible_cues && !auto,
    };
    let mut engine = Engine::new(routine, cues);
    let started_at = chrono::Utc::now();

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", engine.routine().name());
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  {} exercises, {} timed",
        engine.routine().len(),
        format_clock(engine.total_timed_seconds())
    );

    if auto {
        run_auto(&mut engine)?;
    } else {
        run_interactive(&mut engine, config.session.tick_interval())?;
    }

    let record = WorkoutRecord::from_session(&engine, started_at);
    JsonlSink::new(&paths.history).append(&record)?;

    if engine.is_complete() {
        println!("\n✓ Workout complete! Great job finishing {}.", record.routine_name);
    } else {
        println!(
            "\nSession ended early ({} of {} timed).",
            format_clock(record.timed_seconds_elapsed),
            format_clock(engine.total_timed_seconds())
        );
    }
    Ok(())
}

/// Run every phase back to back without waiting on a clock or the user
fn run_auto<C: CueSink>(engine: &mut Engine<C>) -> Result<()> {
    engine.start()?;
    print_banner(engine);

    while !engine.is_complete() {
        let before = Position::of(engine);
        if engine.has_active_countdown() {
            engine.tick();
        } else {
            engine.complete_set()?;
        }
        if Position::of(engine) != before && !engine.is_complete() {
            print_banner(engine);
        }
    }
    Ok(())
}

enum SessionEvent {
    /// Tick from the ticker of the given generation
    Tick(u64),
    Input(String),
    InputClosed,
}

fn run_interactive<C: CueSink>(engine: &mut Engine<C>, interval: Duration) -> Result<()> {
    let (tx, rx) = mpsc::channel();

    let input_tx = tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if input_tx.send(SessionEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = input_tx.send(SessionEvent::InputClosed);
    });

    print_help();
    print_banner(engine);
    print_status(engine);

    let mut ticker: Option<Ticker> = None;
    let mut gate = TickGate::new();

    while !engine.is_complete() {
        // Hold a ticker exactly while a countdown is running
        let wants_ticks = engine.is_running() && engine.has_active_countdown();
        if wants_ticks && ticker.is_none() {
            let generation = gate.acquire();
            let tick_tx = tx.clone();
            ticker = Some(Ticker::spawn(interval, move || {
                tick_tx.send(SessionEvent::Tick(generation)).is_ok()
            }));
        } else if !wants_ticks && ticker.is_some() {
            ticker = None;
            gate.release();
        }

        let Ok(event) = rx.recv() else { break };
        let before = Position::of(engine);

        match event {
            SessionEvent::Tick(generation) => {
                // Ticks queued before a pause belong to a released ticker
                if !gate.deliver(engine, generation) {
                    continue;
                }
            }
            SessionEvent::Input(line) => {
                let outcome = match line.trim().to_lowercase().as_str() {
                    "" => {
                        if engine.is_running() {
                            engine.pause()
                        } else {
                            engine.start()
                        }
                    }
                    "g" => engine.start(),
                    "p" => engine.pause(),
                    "d" => engine.complete_set(),
                    "s" => engine.skip(),
                    "q" => break,
                    _ => {
                        print_help();
                        Ok(())
                    }
                };
                if let Err(e) = outcome {
                    println!("\n  ! {}", e);
                }
            }
            SessionEvent::InputClosed => {
                tracing::debug!("Input closed, ending session");
                break;
            }
        }

        if Position::of(engine) != before && !engine.is_complete() {
            print_banner(engine);
        }
        if !engine.is_complete() {
            print_status(engine);
        }
    }

    // Release the tick source on every exit path
    drop(ticker);
    gate.release();
    println!();
    Ok(())
}

fn print_help() {
    println!("─────────────────────────────────────────");
    println!("  Enter  start / pause");
    println!("  'd'    set done (rep exercises)");
    println!("  's'    skip this phase");
    println!("  'q'    quit");
    println!("─────────────────────────────────────────");
}

fn print_banner<C: CueSink>(engine: &Engine<C>) {
    let Some(exercise) = engine.current_exercise() else {
        return;
    };

    println!();
    println!(
        "  Exercise {} of {}: {}",
        engine.state().exercise_index + 1,
        engine.routine().len(),
        exercise.name
    );
    println!(
        "  {}  ·  set {} of {}",
        engine.current_phase(),
        engine.current_set(),
        exercise.sets
    );
    if engine.current_phase() == Phase::Work {
        if let Work::Reps { count } = exercise.work {
            println!("  → {} reps, then 'd'", count);
        }
    }
    println!("  {}", engine.next_up());
}

fn print_status<C: CueSink>(engine: &Engine<C>) {
    let clock = if engine.has_active_countdown() {
        format_clock(u64::from(engine.seconds_remaining()))
    } else {
        "--:--".to_string()
    };
    let state = if engine.is_running() { "" } else { " (paused)" };

    print!(
        "\r  {}  |  timed {} / {}{}    ",
        clock,
        format_clock(engine.elapsed_timed_seconds()),
        format_clock(engine.total_timed_seconds()),
        state
    );
    let _ = io::stdout().flush();
}
