//! Session artifacts: replay script, step trace, and a summary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::types::GridPosition;
use crate::session::{SessionReport, SessionStop};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionMeta {
    pub seed: u64,
    pub start: Option<GridPosition>,
    pub goal: Option<GridPosition>,
    /// `done`, or the failure kind.
    pub outcome: String,
    pub depth: Option<u32>,
    pub error: Option<String>,
    pub moves_taken: u32,
    pub commands: usize,
    pub exit_code: i32,
}

impl SessionMeta {
    pub fn from_report(seed: u64, report: &SessionReport) -> Self {
        let (outcome, depth, error) = match &report.stop {
            SessionStop::Done { depth } => ("done".to_string(), *depth, None),
            SessionStop::Failed(err) => (err.kind().to_string(), None, Some(err.to_string())),
        };
        Self {
            seed,
            start: report.start,
            goal: report.goal,
            outcome,
            depth,
            error,
            moves_taken: report.moves_taken,
            commands: report.record.commands().len(),
            exit_code: report.stop.exit_code(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionLogPaths {
    pub dir: PathBuf,
    pub keys_path: PathBuf,
    pub trace_path: PathBuf,
    pub meta_path: PathBuf,
}

impl SessionLogPaths {
    pub fn new(out_dir: &Path, seed: u64) -> Self {
        let dir = out_dir.join(format!("seed{seed}"));
        Self {
            dir: dir.clone(),
            keys_path: dir.join("keys.txt"),
            trace_path: dir.join("trace.json"),
            meta_path: dir.join("meta.json"),
        }
    }
}

/// Write the artifacts of `report` under `out_dir/seed<seed>/`.
///
/// Failed sessions are written too; the partial script is what a human needs
/// to see where the walk went wrong.
pub fn write_session_log(out_dir: &Path, seed: u64, report: &SessionReport) -> Result<SessionLogPaths> {
    let paths = SessionLogPaths::new(out_dir, seed);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create session dir {}", paths.dir.display()))?;

    let mut keys = report.record.script();
    keys.push('\n');
    write_text(&paths.keys_path, &keys)?;
    write_json(&paths.trace_path, &report.record.trace())?;
    write_json(&paths.meta_path, &SessionMeta::from_report(seed, report))?;
    Ok(paths)
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_text(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{SessionRecord, TraceEntry};
    use crate::core::types::Outcome;
    use crate::error::NavError;
    use crate::exit_codes;

    fn report(stop: SessionStop) -> SessionReport {
        let mut record = SessionRecord::new();
        record.push_command(
            "l",
            TraceEntry {
                command: None,
                position: GridPosition::new(2, 0),
                outcome: Outcome::Moved,
                moves_taken: 1,
                resurrected: false,
                dismissed: Vec::new(),
                reacquired: false,
            },
        );
        SessionReport {
            start: Some(GridPosition::new(1, 0)),
            goal: Some(GridPosition::new(4, 0)),
            stop,
            moves_taken: 1,
            record,
        }
    }

    #[test]
    fn paths_are_stable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = SessionLogPaths::new(temp.path(), 7);
        assert!(paths.dir.ends_with("seed7"));
        assert!(paths.keys_path.ends_with("seed7/keys.txt"));
        assert!(paths.trace_path.ends_with("trace.json"));
        assert!(paths.meta_path.ends_with("meta.json"));
    }

    #[test]
    fn failed_session_is_logged_with_partial_script() {
        let temp = tempfile::tempdir().expect("tempdir");
        let report = report(SessionStop::Failed(NavError::BudgetExceeded {
            budget: 1,
            at: GridPosition::new(2, 0),
        }));
        let paths = write_session_log(temp.path(), 3, &report).expect("write");

        assert_eq!(fs::read_to_string(&paths.keys_path).expect("keys"), "l\n");
        let meta: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.meta_path).expect("meta"))
                .expect("json");
        assert_eq!(meta["outcome"], "budget_exceeded");
        assert_eq!(meta["exit_code"], exit_codes::BUDGET_EXCEEDED);
        assert_eq!(meta["start"]["x"], 1);

        let trace: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.trace_path).expect("trace"))
                .expect("json");
        assert_eq!(trace[0]["command"], "l");
        assert_eq!(trace[0]["outcome"], "moved");
    }

    #[test]
    fn done_meta_has_depth_and_no_error() {
        let meta = SessionMeta::from_report(1, &report(SessionStop::Done { depth: Some(2) }));
        assert_eq!(meta.outcome, "done");
        assert_eq!(meta.depth, Some(2));
        assert_eq!(meta.error, None);
        assert_eq!(meta.exit_code, exit_codes::OK);
    }
}
