//! Stable exit codes for planner CLI commands.

/// Session reached the down staircase and descended.
pub const OK: i32 = 0;
/// Invalid config, driver failure, or any fatal session error without its own code.
pub const FAILED: i32 = 1;
/// Move budget exhausted before reaching the goal.
pub const BUDGET_EXCEEDED: i32 = 2;
/// No progress even after terrain re-acquisition.
pub const STUCK: i32 = 3;
/// Goal not reachable over the walkable terrain.
pub const UNREACHABLE: i32 = 4;
