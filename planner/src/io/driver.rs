//! Terminal driver abstraction and its tmux backend.
//!
//! The [`TerminalDriver`] trait decouples the navigation loop from the process
//! that hosts the game. Tests use a scripted in-memory game that implements the
//! same trait without spawning anything.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::screen::ScreenFrame;
use crate::io::config::TerminalConfig;
use crate::io::process::run_checked;

/// Keystroke-level access to the running application.
pub trait TerminalDriver {
    /// Transmit literal keystrokes.
    fn send(&mut self, keys: &str) -> Result<()>;

    /// Capture the currently rendered screen.
    fn capture(&mut self) -> Result<ScreenFrame>;

    /// Give the application time to draw when nothing was sent.
    fn pause(&mut self) {}
}

/// What to run inside the terminal.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub session_name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Environment passed to the program (sorted for stable command lines).
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// Shell command line for tmux.
    ///
    /// A trailing `sleep` keeps the pane alive after the game exits so the
    /// final screen can still be captured.
    pub fn shell_command(&self) -> String {
        let mut parts = Vec::new();
        if !self.env.is_empty() {
            parts.push("env".to_string());
            for (key, value) in &self.env {
                parts.push(format!("{key}={}", shell_quote(value)));
            }
        }
        parts.push(shell_quote(&self.program.to_string_lossy()));
        parts.extend(self.args.iter().map(|arg| shell_quote(arg)));
        format!("{}; sleep 999", parts.join(" "))
    }
}

/// Driver backed by a detached tmux session.
pub struct TmuxDriver {
    session: String,
    height: usize,
    settle: Duration,
    command_timeout: Duration,
    capture_limit_bytes: usize,
    alive: bool,
}

impl TmuxDriver {
    /// Start `spec` in a new detached tmux session sized per `cfg`.
    #[instrument(skip_all, fields(session = %spec.session_name))]
    pub fn launch(spec: &LaunchSpec, cfg: &TerminalConfig) -> Result<Self> {
        let mut driver = Self {
            session: spec.session_name.clone(),
            height: cfg.height,
            settle: Duration::from_millis(cfg.send_settle_ms),
            command_timeout: Duration::from_secs(cfg.command_timeout_secs),
            capture_limit_bytes: cfg.capture_limit_bytes,
            alive: false,
        };

        let command = spec.shell_command();
        debug!(%command, "launching");
        let mut cmd = Command::new("tmux");
        cmd.arg("new-session")
            .arg("-d")
            .arg("-s")
            .arg(&driver.session)
            .arg("-x")
            .arg(cfg.width.to_string())
            .arg("-y")
            .arg(cfg.height.to_string())
            .arg(command);
        run_checked(cmd, "tmux new-session", driver.command_timeout, 4096)?;
        driver.alive = true;
        info!("tmux session started");

        thread::sleep(Duration::from_millis(cfg.launch_settle_ms));
        Ok(driver)
    }

    pub fn session_name(&self) -> &str {
        &self.session
    }

    /// Kill the tmux session. Safe to call more than once.
    pub fn terminate(&mut self) -> Result<()> {
        if !self.alive {
            return Ok(());
        }
        self.alive = false;
        let mut cmd = Command::new("tmux");
        cmd.arg("kill-session").arg("-t").arg(&self.session);
        run_checked(cmd, "tmux kill-session", self.command_timeout, 4096)?;
        info!(session = %self.session, "tmux session killed");
        Ok(())
    }
}

impl TerminalDriver for TmuxDriver {
    fn send(&mut self, keys: &str) -> Result<()> {
        let mut cmd = Command::new("tmux");
        cmd.arg("send-keys")
            .arg("-t")
            .arg(&self.session)
            .arg("-l")
            .arg(keys);
        run_checked(cmd, "tmux send-keys", self.command_timeout, 4096)
            .with_context(|| format!("send {keys:?}"))?;
        thread::sleep(self.settle);
        Ok(())
    }

    fn pause(&mut self) {
        thread::sleep(self.settle * 3);
    }

    fn capture(&mut self) -> Result<ScreenFrame> {
        let last_row = self.height.saturating_sub(1).to_string();
        let mut cmd = Command::new("tmux");
        cmd.arg("capture-pane")
            .arg("-t")
            .arg(&self.session)
            .arg("-p")
            .arg("-S")
            .arg("0")
            .arg("-E")
            .arg(last_row);
        let raw = run_checked(
            cmd,
            "tmux capture-pane",
            self.command_timeout,
            self.capture_limit_bytes,
        )?;
        Ok(ScreenFrame::from_capture(&raw, self.height))
    }
}

impl Drop for TmuxDriver {
    fn drop(&mut self) {
        if let Err(err) = self.terminate() {
            warn!(err = %err, session = %self.session, "failed to kill tmux session");
        }
    }
}

/// Quote `value` for a POSIX shell unless it is made of safe characters only.
fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_command_quotes_and_keeps_pane_alive() {
        let mut env = BTreeMap::new();
        env.insert("NETHACK_SEED".to_string(), "7".to_string());
        env.insert("HOME".to_string(), "/tmp/a b".to_string());
        let spec = LaunchSpec {
            session_name: "plan-session-7-1".to_string(),
            program: PathBuf::from("/opt/nethack/nethack"),
            args: vec!["-u".to_string(), "Wizard".to_string(), "-D".to_string()],
            env,
        };
        assert_eq!(
            spec.shell_command(),
            "env HOME='/tmp/a b' NETHACK_SEED=7 /opt/nethack/nethack -u Wizard -D; sleep 999"
        );
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("plain-path/x.txt"), "plain-path/x.txt");
    }
}
