//! Adaptive stair-walk planner.
//!
//! Launches a seeded game in tmux, walks the actor from the arrival staircase
//! to the down staircase one observed step at a time, and prints the key
//! sequence that reproduces the walk.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};

use planner::core::types::GridPosition;
use planner::exit_codes;
use planner::io::config::{DEFAULT_CONFIG_PATH, PlannerConfig, load_config, write_config};
use planner::io::session_log::write_session_log;
use planner::logging;
use planner::plan::{format_step, run_plan, run_replay};
use planner::replay::split_script;
use planner::session::SessionStop;

#[derive(Parser)]
#[command(
    name = "planner",
    version,
    about = "Find the key sequence that walks a seeded game to the down staircase"
)]
struct Cli {
    /// Config file; defaults apply when it does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk to the down staircase of `seed` and print the replay script.
    Plan {
        seed: u64,
        /// Override `limits.max_moves`.
        #[arg(long)]
        max_moves: Option<u32>,
        /// Target cell as `x,y` instead of the discovered staircase.
        #[arg(long, value_parser = parse_position)]
        goal: Option<GridPosition>,
        /// Write keys.txt, trace.json and meta.json under this directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Re-send a replay script and print the position after each key.
    Replay { seed: u64, keys: String },
    /// Write the default config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            process::exit(exit_codes::FAILED);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Plan {
            seed,
            max_moves,
            goal,
            out,
        } => cmd_plan(&cli.config, seed, max_moves, goal, out.as_deref()),
        Command::Replay { seed, keys } => cmd_replay(&cli.config, seed, &keys),
        Command::InitConfig { force } => cmd_init_config(&cli.config, force),
    }
}

fn cmd_plan(
    config_path: &Path,
    seed: u64,
    max_moves: Option<u32>,
    goal: Option<GridPosition>,
    out: Option<&Path>,
) -> Result<i32> {
    let mut cfg = load_config(config_path)?;
    if let Some(max_moves) = max_moves {
        cfg.limits.max_moves = max_moves;
        cfg.validate().context("invalid --max-moves")?;
    }

    let report = run_plan(&cfg, seed, goal, |event| println!("{}", format_step(event)))?;

    if let (Some(start), Some(goal)) = (report.start, report.goal) {
        println!();
        println!("Seed {seed}: start {start}, target {goal}");
    }
    match &report.stop {
        SessionStop::Done { depth } => match depth {
            Some(depth) => println!("Descended to Dlvl:{depth} after {} moves", report.moves_taken),
            None => println!("Descended after {} moves", report.moves_taken),
        },
        SessionStop::Failed(err) => println!("ERROR: {err}"),
    }

    let script = report.record.script();
    println!();
    println!("{}", "=".repeat(60));
    println!("Move sequence ({} keys):", script.chars().count());
    println!("  {script}");
    if report.stop.is_done() {
        println!();
        println!("To capture this session:");
        println!("  run_session.py {seed} sessions/seed{seed}.session.json '{script}'");
    }

    if let Some(out) = out {
        let paths = write_session_log(out, seed, &report)?;
        println!();
        println!("Session log: {}", paths.dir.display());
    }
    Ok(report.stop.exit_code())
}

fn cmd_replay(config_path: &Path, seed: u64, keys: &str) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let commands = split_script(keys)?;
    let positions = run_replay(&cfg, seed, &commands)?;
    for (index, (command, position)) in commands.iter().zip(&positions).enumerate() {
        println!("  [{:2}] {command} -> {position}", index + 1);
    }
    Ok(exit_codes::OK)
}

fn cmd_init_config(config_path: &Path, force: bool) -> Result<i32> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    write_config(config_path, &PlannerConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn parse_position(raw: &str) -> Result<GridPosition> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("expected x,y, got {raw:?}"))?;
    let x = x.trim().parse().with_context(|| format!("invalid x in {raw:?}"))?;
    let y = y.trim().parse().with_context(|| format!("invalid y in {raw:?}"))?;
    Ok(GridPosition::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plan_with_options() {
        let cli = Cli::parse_from([
            "planner",
            "plan",
            "7",
            "--max-moves",
            "120",
            "--goal",
            "40,10",
        ]);
        match cli.command {
            Command::Plan {
                seed,
                max_moves,
                goal,
                out,
            } => {
                assert_eq!(seed, 7);
                assert_eq!(max_moves, Some(120));
                assert_eq!(goal, Some(GridPosition::new(40, 10)));
                assert!(out.is_none());
            }
            _ => panic!("expected plan"),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn parse_replay() {
        let cli = Cli::parse_from(["planner", "--config", "x.toml", "replay", "3", "llj>"]);
        assert!(matches!(cli.command, Command::Replay { seed: 3, ref keys } if keys == "llj>"));
        assert_eq!(cli.config, PathBuf::from("x.toml"));
    }

    #[test]
    fn parse_position_rejects_garbage() {
        assert_eq!(parse_position("3, 4").expect("pos"), GridPosition::new(3, 4));
        assert!(parse_position("34").is_err());
        assert!(parse_position("a,4").is_err());
    }
}
