//! Planner configuration stored in `planner.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::budget::SessionLimits;
use crate::core::types::GridDims;

pub const DEFAULT_CONFIG_PATH: &str = "planner.toml";

/// Planner configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to the values the harness was tuned with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Maximum captures spent dismissing prompts after one command.
    pub prompt_limit: u32,

    /// Maximum captures spent dismissing prompts after a terrain dump.
    pub acquisition_prompt_limit: u32,

    /// Extra captures when the actor marker is hidden.
    pub locate_retries: u32,

    pub limits: SessionLimits,
    pub grid: GridDims,
    pub terminal: TerminalConfig,
    pub game: GameConfig,
    pub character: CharacterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TerminalConfig {
    /// tmux session names are `<prefix>-<seed>-<pid>`.
    pub session_prefix: String,
    pub width: usize,
    pub height: usize,
    /// Pause after every send, since rendering is not acknowledged.
    pub send_settle_ms: u64,
    /// Pause after launching the game before the first capture.
    pub launch_settle_ms: u64,
    /// Wall-clock limit for a single tmux invocation.
    pub command_timeout_secs: u64,
    pub capture_limit_bytes: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            session_prefix: "plan-session".to_string(),
            width: 80,
            height: 24,
            send_settle_ms: 150,
            launch_settle_ms: 2_000,
            command_timeout_secs: 10,
            capture_limit_bytes: 64_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    /// Installed game directory (`NETHACKDIR`); holds the binary and save files.
    pub install_dir: PathBuf,
    pub binary_name: String,
    /// `HOME` for the game process; the generated `.nethackrc` lives here.
    pub home_dir: PathBuf,
    /// `NETHACK_FIXED_DATETIME`; empty disables it.
    pub fixed_datetime: String,
    /// Captures allowed while navigating startup prompts.
    pub startup_attempts: u32,
    /// Captures allowed while confirming the final quit.
    pub quit_attempts: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("nethack-c/install/games/lib/nethackdir"),
            binary_name: "nethack".to_string(),
            home_dir: PathBuf::from("test/comparison/c-harness/results"),
            fixed_datetime: "20000110090000".to_string(),
            startup_attempts: 60,
            quit_attempts: 15,
        }
    }
}

impl GameConfig {
    pub fn binary_path(&self) -> PathBuf {
        self.install_dir.join(&self.binary_name)
    }
}

/// Fixed character so every seed starts from the same role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CharacterConfig {
    pub name: String,
    pub role: String,
    pub race: String,
    pub gender: String,
    pub align: String,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            name: "Wizard".to_string(),
            role: "Valkyrie".to_string(),
            race: "human".to_string(),
            gender: "female".to_string(),
            align: "neutral".to_string(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            prompt_limit: 20,
            acquisition_prompt_limit: 5,
            locate_retries: 1,
            limits: SessionLimits::default(),
            grid: GridDims::default(),
            terminal: TerminalConfig::default(),
            game: GameConfig::default(),
            character: CharacterConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_moves == 0 {
            return Err(anyhow!("limits.max_moves must be > 0"));
        }
        if self.limits.stuck_replan_threshold == 0 {
            return Err(anyhow!("limits.stuck_replan_threshold must be > 0"));
        }
        if self.limits.stuck_abort_threshold < self.limits.stuck_replan_threshold {
            return Err(anyhow!(
                "limits.stuck_abort_threshold must be >= limits.stuck_replan_threshold"
            ));
        }
        if self.prompt_limit == 0 || self.acquisition_prompt_limit == 0 {
            return Err(anyhow!("prompt limits must be > 0"));
        }
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(anyhow!("grid dimensions must be > 0"));
        }
        // message line + map + two status lines
        if self.terminal.height < self.grid.height + 3 {
            return Err(anyhow!(
                "terminal.height {} cannot show a {}-row map with message and status lines",
                self.terminal.height,
                self.grid.height
            ));
        }
        if self.terminal.width + 1 < self.grid.width {
            return Err(anyhow!(
                "terminal.width {} cannot show a {}-column map",
                self.terminal.width,
                self.grid.width
            ));
        }
        if self.terminal.command_timeout_secs == 0 {
            return Err(anyhow!("terminal.command_timeout_secs must be > 0"));
        }
        if self.character.name.trim().is_empty() {
            return Err(anyhow!("character.name must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PlannerConfig::default()`.
pub fn load_config(path: &Path) -> Result<PlannerConfig> {
    if !path.exists() {
        let cfg = PlannerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PlannerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate().with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PlannerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, PlannerConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("planner.toml");
        let cfg = PlannerConfig::default();
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("planner.toml");
        fs::write(&path, "[limits]\nmax_moves = 200\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.limits.max_moves, 200);
        assert_eq!(cfg.limits.stuck_replan_threshold, 2);
        assert_eq!(cfg.limits.stuck_abort_threshold, 10);
        assert_eq!(cfg.terminal.height, 24);
    }

    #[test]
    fn rejects_abort_threshold_below_replan_threshold() {
        let mut cfg = PlannerConfig::default();
        cfg.limits.stuck_replan_threshold = 5;
        cfg.limits.stuck_abort_threshold = 3;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("stuck_abort_threshold"));
    }

    #[test]
    fn rejects_terminal_too_short_for_map() {
        let mut cfg = PlannerConfig::default();
        cfg.terminal.height = 21;
        assert!(cfg.validate().is_err());
    }
}
