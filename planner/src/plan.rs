//! Orchestration for `planner plan` and `planner replay`: prepare the game
//! home, launch the game in tmux, get past startup, run, and quit.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::core::types::GridPosition;
use crate::io::config::PlannerConfig;
use crate::io::driver::{LaunchSpec, TmuxDriver};
use crate::io::home::prepare_home;
use crate::io::prompts::resolve_prompts;
use crate::io::startup::{quit_game, wait_ready};
use crate::replay::replay;
use crate::session::{SessionReport, SessionSettings, StepEvent, run_session};

pub const FIXED_DATETIME_ENV: &str = "NETHACK_FIXED_DATETIME";

const DUMP_FILE: &str = "dumpmap.txt";
const RNG_LOG_FILE: &str = "rng.txt";

/// `NETHACK_FIXED_DATETIME` from the environment if set, else from config.
/// An empty value disables it.
pub fn fixed_datetime(configured: &str, env_value: Option<String>) -> Option<String> {
    let value = env_value.unwrap_or_else(|| configured.to_string());
    (!value.is_empty()).then_some(value)
}

pub fn session_name(prefix: &str, seed: u64) -> String {
    format!("{prefix}-{seed}-{}", process::id())
}

/// Command line and environment for one seeded game.
pub fn launch_spec(
    cfg: &PlannerConfig,
    seed: u64,
    scratch: &Path,
    fixed_datetime: Option<String>,
) -> Result<LaunchSpec> {
    let install_dir = std::path::absolute(&cfg.game.install_dir)
        .with_context(|| format!("resolve {}", cfg.game.install_dir.display()))?;
    let home_dir = std::path::absolute(&cfg.game.home_dir)
        .with_context(|| format!("resolve {}", cfg.game.home_dir.display()))?;

    let mut env = BTreeMap::new();
    if let Some(datetime) = fixed_datetime {
        env.insert(FIXED_DATETIME_ENV.to_string(), datetime);
    }
    env.insert(
        "NETHACKDIR".to_string(),
        install_dir.to_string_lossy().into_owned(),
    );
    env.insert("NETHACK_SEED".to_string(), seed.to_string());
    env.insert(
        "NETHACK_RNGLOG".to_string(),
        scratch.join(RNG_LOG_FILE).to_string_lossy().into_owned(),
    );
    env.insert(
        "NETHACK_DUMPMAP".to_string(),
        scratch.join(DUMP_FILE).to_string_lossy().into_owned(),
    );
    env.insert("HOME".to_string(), home_dir.to_string_lossy().into_owned());
    env.insert("TERM".to_string(), "xterm-256color".to_string());

    Ok(LaunchSpec {
        session_name: session_name(&cfg.terminal.session_prefix, seed),
        program: install_dir.join(&cfg.game.binary_name),
        args: vec![
            "-u".to_string(),
            cfg.character.name.clone(),
            "-D".to_string(),
        ],
        env,
    })
}

/// A running game plus the scratch directory its files live in.
pub struct GameSession {
    pub driver: TmuxDriver,
    pub dump_path: PathBuf,
    quit_attempts: u32,
    _scratch: tempfile::TempDir,
}

impl GameSession {
    /// Prepare the home, launch, and get past the startup screens.
    #[instrument(skip_all, fields(seed))]
    pub fn start(cfg: &PlannerConfig, seed: u64) -> Result<Self> {
        let binary = cfg.game.binary_path();
        if !binary.is_file() {
            bail!(
                "game binary not found at {} (set [game].install_dir in the config)",
                binary.display()
            );
        }
        prepare_home(&cfg.game, &cfg.character)?;

        let scratch = tempfile::Builder::new()
            .prefix("plan-session-")
            .tempdir()
            .context("create scratch dir")?;
        let datetime = fixed_datetime(&cfg.game.fixed_datetime, env::var(FIXED_DATETIME_ENV).ok());
        let spec = launch_spec(cfg, seed, scratch.path(), datetime)?;
        let mut driver = TmuxDriver::launch(&spec, &cfg.terminal)?;

        wait_ready(&mut driver, cfg.game.startup_attempts)?;
        resolve_prompts(&mut driver, cfg.prompt_limit)?;
        info!(session = driver.session_name(), "game ready");

        Ok(Self {
            driver,
            dump_path: scratch.path().join(DUMP_FILE),
            quit_attempts: cfg.game.quit_attempts,
            _scratch: scratch,
        })
    }

    /// Quit the game and kill the terminal. Failures are logged only.
    pub fn finish(mut self) {
        if let Err(err) = quit_game(&mut self.driver, self.quit_attempts) {
            warn!(err = %err, "quit failed");
        }
        if let Err(err) = self.driver.terminate() {
            warn!(err = %err, "terminate failed");
        }
    }
}

/// Plan and walk one seed.
pub fn run_plan<F: FnMut(&StepEvent<'_>)>(
    cfg: &PlannerConfig,
    seed: u64,
    goal: Option<GridPosition>,
    on_step: F,
) -> Result<SessionReport> {
    let mut game = GameSession::start(cfg, seed)?;
    let settings = SessionSettings::from_config(cfg, game.dump_path.clone());
    let report = run_session(&mut game.driver, &settings, goal, on_step);
    game.finish();
    Ok(report)
}

/// Replay `commands` against a fresh game of `seed`.
pub fn run_replay(cfg: &PlannerConfig, seed: u64, commands: &[String]) -> Result<Vec<GridPosition>> {
    let mut game = GameSession::start(cfg, seed)?;
    let settings = SessionSettings::from_config(cfg, game.dump_path.clone());
    let result = replay(&mut game.driver, commands, &settings);
    game.finish();
    Ok(result?)
}

/// One progress line per sent command.
pub fn format_step(event: &StepEvent<'_>) -> String {
    let entry = event.entry;
    let command = entry.command.as_deref().unwrap_or("-");
    let mut line = format!(
        "  [{:2}] {command} -> {} [{}]",
        event.index, entry.position, entry.outcome
    );
    if let (Some(hp), Some(max_hp)) = (event.status.hp, event.status.max_hp) {
        line.push_str(&format!(" HP:{hp}/{max_hp}"));
    }
    if entry.resurrected {
        line.push_str(" [RESURRECTED]");
    }
    let message: String = event.message.chars().take(60).collect();
    if !message.is_empty() {
        line.push(' ');
        line.push_str(&message);
    }
    line
}
