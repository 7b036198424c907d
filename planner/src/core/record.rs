//! Recording of commands actually sent, plus the per-step diagnostic trace.

use serde::Serialize;

use crate::core::classifier::{PromptKind, includes_resurrection};
use crate::core::types::{GridPosition, Outcome};

/// Diagnostic record for one step. Never replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// Command sent for this step; `None` for planning-only entries.
    pub command: Option<String>,
    pub position: GridPosition,
    pub outcome: Outcome,
    pub moves_taken: u32,
    /// A death confirmation was declined while settling this step.
    pub resurrected: bool,
    /// Prompts dismissed after the command, in order.
    pub dismissed: Vec<PromptKind>,
    /// Terrain was re-acquired right after this step.
    pub reacquired: bool,
}

/// Append-only recorder for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    commands: Vec<String>,
    trace: Vec<TraceEntry>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command together with its diagnostic entry.
    pub fn push_command(&mut self, command: &str, mut entry: TraceEntry) {
        self.commands.push(command.to_string());
        entry.command = Some(command.to_string());
        self.trace.push(entry);
    }

    /// Record a diagnostic entry that did not send a command.
    pub fn push_note(&mut self, mut entry: TraceEntry) {
        entry.command = None;
        self.trace.push(entry);
    }

    /// Flag the latest entry as followed by a re-acquisition, together with
    /// the prompts that re-acquisition dismissed.
    pub fn mark_reacquired(&mut self, dismissed: &[PromptKind]) {
        if let Some(last) = self.trace.last_mut() {
            last.reacquired = true;
            last.dismissed.extend_from_slice(dismissed);
            last.resurrected |= includes_resurrection(dismissed);
        }
    }

    /// Commands in send order (the replay script).
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Replay script as one keystroke string.
    pub fn script(&self) -> String {
        self.commands.concat()
    }

    /// Believed positions after each command, in send order.
    pub fn positions(&self) -> Vec<GridPosition> {
        self.trace
            .iter()
            .filter(|entry| entry.command.is_some())
            .map(|entry| entry.position)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(x: usize, outcome: Outcome, moves_taken: u32) -> TraceEntry {
        TraceEntry {
            command: None,
            position: GridPosition::new(x, 0),
            outcome,
            moves_taken,
            resurrected: false,
            dismissed: Vec::new(),
            reacquired: false,
        }
    }

    #[test]
    fn commands_keep_send_order() {
        let mut record = SessionRecord::new();
        record.push_command("l", entry(1, Outcome::Moved, 1));
        record.push_command("l", entry(1, Outcome::Stuck, 2));
        record.push_command(">", entry(1, Outcome::GoalReached, 2));
        assert_eq!(record.script(), "ll>");
        assert_eq!(record.trace()[1].command.as_deref(), Some("l"));
        assert_eq!(record.positions().len(), 3);
    }

    #[test]
    fn notes_are_traced_but_not_replayed() {
        let mut record = SessionRecord::new();
        record.push_command("h", entry(2, Outcome::Moved, 1));
        record.push_note(entry(2, Outcome::Unreachable, 1));
        record.mark_reacquired(&[]);
        assert_eq!(record.commands(), ["h".to_string()]);
        assert_eq!(record.trace().len(), 2);
        assert!(record.trace()[1].reacquired);
        assert!(!record.trace()[0].reacquired);
        assert_eq!(record.positions(), vec![GridPosition::new(2, 0)]);
    }

    #[test]
    fn death_during_reacquisition_marks_the_entry() {
        let mut record = SessionRecord::new();
        record.push_command("l", entry(3, Outcome::Stuck, 4));
        record.mark_reacquired(&[PromptKind::Pagination, PromptKind::LethalConfirm]);
        let last = &record.trace()[0];
        assert!(last.reacquired);
        assert!(last.resurrected);
        assert_eq!(
            last.dismissed,
            vec![PromptKind::Pagination, PromptKind::LethalConfirm]
        );
    }
}
