//! Adaptive execution loop: plan, send one move, observe, recover.
//!
//! The session never trusts its own prediction of where a move lands. After
//! every command the believed position is replaced by what the screen shows,
//! and the path is recomputed from there.

use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use crate::core::budget::{ProgressTracker, ProgressVerdict, SessionLimits};
use crate::core::classifier::{PromptKind, includes_resurrection};
use crate::core::path::shortest_path;
use crate::core::record::{SessionRecord, TraceEntry};
use crate::core::screen::StatusReadout;
use crate::core::terrain::TerrainGrid;
use crate::core::types::{Direction, GridDims, GridPosition, Outcome};
use crate::error::NavError;
use crate::exit_codes;
use crate::io::config::PlannerConfig;
use crate::io::driver::TerminalDriver;
use crate::io::extract::{ScreenState, extract_from, extract_state};
use crate::io::prompts::send_guarded;
use crate::io::terrain::acquire_terrain;

/// Keystroke that takes the staircase down.
pub const DESCEND_KEY: &str = ">";

/// Everything the loop needs besides the driver.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub limits: SessionLimits,
    pub dims: GridDims,
    pub prompt_limit: u32,
    pub acquisition_prompt_limit: u32,
    pub locate_retries: u32,
    /// File the game writes terrain dumps to.
    pub dump_path: PathBuf,
}

impl SessionSettings {
    pub fn from_config(cfg: &PlannerConfig, dump_path: PathBuf) -> Self {
        Self {
            limits: cfg.limits,
            dims: cfg.grid,
            prompt_limit: cfg.prompt_limit,
            acquisition_prompt_limit: cfg.acquisition_prompt_limit,
            locate_retries: cfg.locate_retries,
            dump_path,
        }
    }
}

/// Why terrain is being fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCause {
    /// Repeated moves without progress.
    Stuck,
    /// The current grid has no route to the goal.
    Unreachable,
    /// The actor stands on a cell the grid says cannot be entered.
    StaleTerrain,
}

#[derive(Debug)]
enum Phase {
    Planning,
    Moving(Direction),
    Recovering(RecoveryCause),
    Descending,
    Done { depth: Option<u32> },
    Failed(NavError),
}

/// Mutable state of one session. Single owner: the loop.
#[derive(Debug)]
pub struct NavigationState {
    pub position: GridPosition,
    pub grid: TerrainGrid,
    pub goal: GridPosition,
    pub progress: ProgressTracker,
    pub record: SessionRecord,
    pub moves_taken: u32,
    /// Depth shown when the session started.
    pub start_depth: Option<u32>,
    /// Prompts dismissed before the first trace entry existed.
    pub pending_dismissed: Vec<PromptKind>,
}

impl NavigationState {
    fn entry(&mut self, outcome: Outcome, state: Option<&ScreenState>) -> TraceEntry {
        let mut dismissed = std::mem::take(&mut self.pending_dismissed);
        if let Some(state) = state {
            dismissed.extend_from_slice(&state.dismissed);
        }
        TraceEntry {
            command: None,
            position: self.position,
            outcome,
            moves_taken: self.moves_taken,
            resurrected: includes_resurrection(&dismissed),
            dismissed,
            reacquired: false,
        }
    }
}

/// Reason why `run_session` stopped.
#[derive(Debug)]
pub enum SessionStop {
    /// The level transition was confirmed.
    Done { depth: Option<u32> },
    Failed(NavError),
}

impl SessionStop {
    pub fn is_done(&self) -> bool {
        matches!(self, SessionStop::Done { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            SessionStop::Done { .. } => exit_codes::OK,
            SessionStop::Failed(err) => err.exit_code(),
        }
    }
}

/// Summary of a session. The record is kept on failure too.
#[derive(Debug)]
pub struct SessionReport {
    pub start: Option<GridPosition>,
    pub goal: Option<GridPosition>,
    pub stop: SessionStop,
    pub moves_taken: u32,
    pub record: SessionRecord,
}

/// Progress notification for one sent command.
#[derive(Debug)]
pub struct StepEvent<'a> {
    /// 1-based command index.
    pub index: usize,
    pub entry: &'a TraceEntry,
    pub status: StatusReadout,
    pub message: &'a str,
}

/// Drive the actor from its current position to `goal` and descend.
///
/// With no `goal`, the staircase that is not the start cell is used. Fatal
/// conditions end the session with [`SessionStop::Failed`]; the commands sent
/// so far stay in the report.
#[instrument(skip_all, fields(max_moves = settings.limits.max_moves))]
pub fn run_session<D, F>(
    driver: &mut D,
    settings: &SessionSettings,
    goal: Option<GridPosition>,
    mut on_step: F,
) -> SessionReport
where
    D: TerminalDriver + ?Sized,
    F: FnMut(&StepEvent<'_>),
{
    let mut state = match initialize(driver, settings, goal) {
        Ok(state) => state,
        Err((start, err)) => {
            warn!(err = %err, "session could not start");
            return SessionReport {
                start,
                goal,
                stop: SessionStop::Failed(err),
                moves_taken: 0,
                record: SessionRecord::new(),
            };
        }
    };
    let start = state.position;
    info!(%start, goal = %state.goal, "session started");

    let mut phase = Phase::Planning;
    let mut replanned_unreachable = false;
    let stop = loop {
        phase = match phase {
            Phase::Planning => plan(&mut state, &mut replanned_unreachable),
            Phase::Moving(direction) => {
                step(driver, settings, &mut state, direction, &mut on_step)
            }
            Phase::Recovering(cause) => recover(driver, settings, &mut state, cause),
            Phase::Descending => descend(driver, settings, &mut state, &mut on_step),
            Phase::Done { depth } => break SessionStop::Done { depth },
            Phase::Failed(err) => break SessionStop::Failed(err),
        };
    };

    match &stop {
        SessionStop::Done { depth } => {
            info!(moves = state.moves_taken, depth = ?depth, "descended");
        }
        SessionStop::Failed(err) => {
            warn!(moves = state.moves_taken, kind = err.kind(), err = %err, "session failed");
        }
    }
    SessionReport {
        start: Some(start),
        goal: Some(state.goal),
        stop,
        moves_taken: state.moves_taken,
        record: state.record,
    }
}

type StartError = (Option<GridPosition>, NavError);

fn initialize<D: TerminalDriver + ?Sized>(
    driver: &mut D,
    settings: &SessionSettings,
    goal: Option<GridPosition>,
) -> Result<NavigationState, StartError> {
    let screen = extract_state(
        driver,
        settings.dims,
        settings.prompt_limit,
        settings.locate_retries,
    )
    .map_err(|err| (None, err))?;
    let start = screen.position;
    let acquired = acquire_terrain(
        driver,
        &settings.dump_path,
        settings.dims,
        settings.acquisition_prompt_limit,
    )
    .map_err(|err| (Some(start), err))?;
    let grid = acquired.grid;

    let goal = match goal {
        Some(goal) => goal,
        None => grid.find_downstairs(start).ok_or_else(|| {
            (
                Some(start),
                NavError::acquisition(format!("no staircase other than the start {start}")),
            )
        })?,
    };
    if !settings.dims.contains(goal.x as i64, goal.y as i64) {
        return Err((
            Some(start),
            NavError::acquisition(format!("goal {goal} is outside the grid")),
        ));
    }

    Ok(NavigationState {
        position: start,
        grid,
        goal,
        progress: ProgressTracker::default(),
        record: SessionRecord::new(),
        moves_taken: 0,
        start_depth: screen.status.depth,
        pending_dismissed: screen
            .dismissed
            .into_iter()
            .chain(acquired.dismissed)
            .collect(),
    })
}

fn plan(state: &mut NavigationState, replanned_unreachable: &mut bool) -> Phase {
    if state.position == state.goal {
        return Phase::Descending;
    }
    match shortest_path(&state.grid, state.position, state.goal) {
        Some(path) => {
            *replanned_unreachable = false;
            let Some(first) = path.first() else {
                return Phase::Descending;
            };
            debug!(steps = path.len(), next = first.direction.key(), "planned");
            Phase::Moving(first.direction)
        }
        None if !*replanned_unreachable => {
            *replanned_unreachable = true;
            info!(at = %state.position, "goal unreachable on current terrain, re-acquiring");
            let entry = state.entry(Outcome::Unreachable, None);
            state.record.push_note(entry);
            Phase::Recovering(RecoveryCause::Unreachable)
        }
        None => Phase::Failed(NavError::Unreachable {
            from: state.position,
            goal: state.goal,
        }),
    }
}

fn step<D, F>(
    driver: &mut D,
    settings: &SessionSettings,
    state: &mut NavigationState,
    direction: Direction,
    on_step: &mut F,
) -> Phase
where
    D: TerminalDriver + ?Sized,
    F: FnMut(&StepEvent<'_>),
{
    let budget = settings.limits.max_moves;
    if state.moves_taken >= budget {
        return Phase::Failed(NavError::BudgetExceeded {
            budget,
            at: state.position,
        });
    }

    let key = direction.key();
    state.moves_taken += 1;
    let observed = send_guarded(driver, key, settings.prompt_limit).and_then(|settled| {
        extract_from(
            driver,
            settled,
            settings.dims,
            settings.prompt_limit,
            settings.locate_retries,
        )
    });
    let screen = match observed {
        Ok(screen) => screen,
        Err(err) => {
            let entry = state.entry(Outcome::ExtractionFailed, None);
            state.record.push_command(key, entry);
            return Phase::Failed(err);
        }
    };

    let moved = screen.position != state.position;
    state.position = screen.position;
    let outcome = if state.position == state.goal {
        Outcome::GoalReached
    } else if moved {
        Outcome::Moved
    } else {
        Outcome::Stuck
    };
    if screen.resurrected() {
        info!(at = %state.position, "resurrected after death");
    }
    let entry = state.entry(outcome, Some(&screen));
    state.record.push_command(key, entry);
    notify(state, &screen, on_step);

    let verdict = state.progress.record(moved, &settings.limits);
    if verdict == ProgressVerdict::Abort {
        return Phase::Failed(NavError::StuckExceeded {
            at: state.position,
            stalled: state.progress.stalled(),
        });
    }
    if outcome == Outcome::GoalReached {
        return Phase::Descending;
    }
    if moved && !state.grid.is_walkable(state.position) {
        debug!(at = %state.position, "actor on a cell the grid calls blocked");
        return Phase::Recovering(RecoveryCause::StaleTerrain);
    }
    if verdict == ProgressVerdict::Reacquire {
        return Phase::Recovering(RecoveryCause::Stuck);
    }
    Phase::Planning
}

fn recover<D: TerminalDriver + ?Sized>(
    driver: &mut D,
    settings: &SessionSettings,
    state: &mut NavigationState,
    cause: RecoveryCause,
) -> Phase {
    info!(?cause, at = %state.position, stuck = state.progress.stuck(), "re-acquiring terrain");
    match acquire_terrain(
        driver,
        &settings.dump_path,
        settings.dims,
        settings.acquisition_prompt_limit,
    ) {
        Ok(acquired) => {
            if includes_resurrection(&acquired.dismissed) {
                info!(at = %state.position, "resurrected during terrain acquisition");
            }
            state.grid = acquired.grid;
            state.record.mark_reacquired(&acquired.dismissed);
            state.progress.reset_after_reacquire();
            Phase::Planning
        }
        Err(err) => Phase::Failed(err),
    }
}

fn descend<D, F>(
    driver: &mut D,
    settings: &SessionSettings,
    state: &mut NavigationState,
    on_step: &mut F,
) -> Phase
where
    D: TerminalDriver + ?Sized,
    F: FnMut(&StepEvent<'_>),
{
    let observed = send_guarded(driver, DESCEND_KEY, settings.prompt_limit).and_then(|settled| {
        extract_from(
            driver,
            settled,
            settings.dims,
            settings.prompt_limit,
            settings.locate_retries,
        )
    });
    let screen = match observed {
        Ok(screen) => screen,
        Err(err) => {
            let entry = state.entry(Outcome::ExtractionFailed, None);
            state.record.push_command(DESCEND_KEY, entry);
            return Phase::Failed(err);
        }
    };

    state.position = screen.position;
    let entry = state.entry(Outcome::GoalReached, Some(&screen));
    state.record.push_command(DESCEND_KEY, entry);
    notify(state, &screen, on_step);

    let before = state.start_depth;
    let after = screen.status.depth;
    match (before, after) {
        (Some(before), Some(after)) if after > before => Phase::Done { depth: Some(after) },
        _ => Phase::Failed(NavError::DescendUnconfirmed { before, after }),
    }
}

fn notify<F: FnMut(&StepEvent<'_>)>(state: &NavigationState, screen: &ScreenState, on_step: &mut F) {
    let commands = state.record.commands().len();
    if let Some(entry) = state.record.trace().last() {
        on_step(&StepEvent {
            index: commands,
            entry,
            status: screen.status,
            message: &screen.message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedGame, grid_from_ascii};

    fn settings(game: &ScriptedGame, dump_path: PathBuf) -> SessionSettings {
        SessionSettings {
            limits: SessionLimits::default(),
            dims: game.dims(),
            prompt_limit: 20,
            acquisition_prompt_limit: 5,
            locate_retries: 1,
            dump_path,
        }
    }

    #[test]
    fn straight_corridor_walks_then_descends() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dump = temp.path().join("dump.txt");
        let mut game = ScriptedGame::new(grid_from_ascii(&[" <###>"]), GridPosition::new(1, 0));
        game.set_dump_path(&dump);
        let settings = settings(&game, dump);

        let mut events = Vec::new();
        let report = run_session(&mut game, &settings, None, |event| {
            events.push((event.index, event.entry.outcome));
        });

        assert!(report.stop.is_done(), "{:?}", report.stop);
        assert_eq!(report.goal, Some(GridPosition::new(5, 0)));
        assert_eq!(report.record.script(), "llll>");
        assert_eq!(report.moves_taken, 4);
        assert_eq!(events.len(), 5);
        assert_eq!(events[3], (4, Outcome::GoalReached));
        assert_eq!(game.depth(), 2);
    }

    #[test]
    fn starting_on_goal_only_descends() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dump = temp.path().join("dump.txt");
        let mut game = ScriptedGame::new(grid_from_ascii(&[" .>."]), GridPosition::new(2, 0));
        game.set_dump_path(&dump);
        let settings = settings(&game, dump);

        let report = run_session(&mut game, &settings, Some(GridPosition::new(2, 0)), |_| {});
        assert!(report.stop.is_done());
        assert_eq!(report.record.script(), ">");
        assert_eq!(report.moves_taken, 0);
    }

    #[test]
    fn missing_goal_staircase_fails_at_start() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dump = temp.path().join("dump.txt");
        let mut game = ScriptedGame::new(grid_from_ascii(&[" <.."]), GridPosition::new(1, 0));
        game.set_dump_path(&dump);
        let settings = settings(&game, dump);

        let report = run_session(&mut game, &settings, None, |_| {});
        assert!(matches!(
            report.stop,
            SessionStop::Failed(NavError::Acquisition { .. })
        ));
        assert_eq!(report.start, Some(GridPosition::new(1, 0)));
        assert!(report.record.commands().is_empty());
    }

    #[test]
    fn descend_off_stairs_is_unconfirmed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dump = temp.path().join("dump.txt");
        let mut game = ScriptedGame::new(grid_from_ascii(&[" ...."]), GridPosition::new(1, 0));
        game.set_dump_path(&dump);
        let settings = settings(&game, dump);

        let report = run_session(&mut game, &settings, Some(GridPosition::new(3, 0)), |_| {});
        assert!(matches!(
            report.stop,
            SessionStop::Failed(NavError::DescendUnconfirmed {
                before: Some(1),
                after: Some(1)
            })
        ));
        assert_eq!(report.record.script(), "ll>");
    }
}
