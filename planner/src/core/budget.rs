//! Move budget and stuck-step bookkeeping for the execution loop.

use serde::{Deserialize, Serialize};

/// Bounds that guarantee a session terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    /// Movement commands allowed before giving up.
    pub max_moves: u32,
    /// Consecutive non-progress steps that trigger a terrain re-acquisition.
    pub stuck_replan_threshold: u32,
    /// Consecutive non-progress steps (across re-acquisitions) that abort the session.
    pub stuck_abort_threshold: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_moves: 80,
            stuck_replan_threshold: 2,
            stuck_abort_threshold: 10,
        }
    }
}

/// What the loop should do after classifying a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressVerdict {
    Continue,
    Reacquire,
    Abort,
}

/// Consecutive non-progress counters.
///
/// `stuck` resets on progress and after every re-acquisition; `stalled` resets
/// only on progress, so repeated re-acquisitions cannot hide a dead end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    stuck: u32,
    stalled: u32,
}

impl ProgressTracker {
    pub fn record(&mut self, moved: bool, limits: &SessionLimits) -> ProgressVerdict {
        if moved {
            self.stuck = 0;
            self.stalled = 0;
            return ProgressVerdict::Continue;
        }
        self.stuck += 1;
        self.stalled += 1;
        if self.stalled > limits.stuck_abort_threshold {
            ProgressVerdict::Abort
        } else if self.stuck >= limits.stuck_replan_threshold {
            ProgressVerdict::Reacquire
        } else {
            ProgressVerdict::Continue
        }
    }

    /// Fresh terrain gives the plan a clean slate.
    pub fn reset_after_reacquire(&mut self) {
        self.stuck = 0;
    }

    pub fn stuck(&self) -> u32 {
        self.stuck
    }

    pub fn stalled(&self) -> u32 {
        self.stalled
    }
}
