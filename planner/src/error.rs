//! Failure taxonomy for a navigation session.

use thiserror::Error;

use crate::core::types::GridPosition;
use crate::exit_codes;

/// Fatal conditions that end a session.
///
/// Recoverable conditions (a single stuck step, a dismissed prompt) never
/// surface as a `NavError`.
#[derive(Debug, Error)]
pub enum NavError {
    /// Terrain dump missing, malformed, or of the wrong dimensions.
    #[error("terrain acquisition failed: {detail}")]
    Acquisition { detail: String },

    /// Actor marker not visible on a stable frame.
    #[error("actor marker not found after {attempts} captures")]
    Locate { attempts: u32 },

    #[error("no walkable path from {from} to {goal}")]
    Unreachable {
        from: GridPosition,
        goal: GridPosition,
    },

    #[error("no progress for {stalled} consecutive moves at {at}")]
    StuckExceeded { at: GridPosition, stalled: u32 },

    #[error("move budget of {budget} exhausted at {at}")]
    BudgetExceeded { budget: u32, at: GridPosition },

    /// Usually an unrecognized prompt class.
    #[error("prompt dismissal did not converge within {limit} captures")]
    PromptLoopExceeded { limit: u32 },

    #[error("level transition not confirmed (depth before {before:?}, after {after:?})")]
    DescendUnconfirmed {
        before: Option<u32>,
        after: Option<u32>,
    },

    /// Terminal driver I/O failure (tmux, dump file access).
    #[error(transparent)]
    Driver(#[from] anyhow::Error),
}

impl NavError {
    pub fn acquisition(detail: impl Into<String>) -> Self {
        NavError::Acquisition {
            detail: detail.into(),
        }
    }

    /// Stable snake_case tag for logs and `meta.json`.
    pub fn kind(&self) -> &'static str {
        match self {
            NavError::Acquisition { .. } => "acquisition",
            NavError::Locate { .. } => "locate",
            NavError::Unreachable { .. } => "unreachable",
            NavError::StuckExceeded { .. } => "stuck_exceeded",
            NavError::BudgetExceeded { .. } => "budget_exceeded",
            NavError::PromptLoopExceeded { .. } => "prompt_loop_exceeded",
            NavError::DescendUnconfirmed { .. } => "descend_unconfirmed",
            NavError::Driver(_) => "driver",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            NavError::BudgetExceeded { .. } => exit_codes::BUDGET_EXCEEDED,
            NavError::StuckExceeded { .. } => exit_codes::STUCK,
            NavError::Unreachable { .. } => exit_codes::UNREACHABLE,
            _ => exit_codes::FAILED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn budget_and_stuck_have_distinct_exit_codes() {
        let at = GridPosition::new(3, 4);
        let budget = NavError::BudgetExceeded { budget: 3, at };
        let stuck = NavError::StuckExceeded { at, stalled: 11 };
        assert_ne!(budget.exit_code(), stuck.exit_code());
        assert_eq!(budget.kind(), "budget_exceeded");
    }

    #[test]
    fn driver_errors_display_their_context() {
        let err = NavError::from(anyhow!("tmux send-keys failed"));
        assert_eq!(err.to_string(), "tmux send-keys failed");
        assert_eq!(err.exit_code(), exit_codes::FAILED);
    }
}
