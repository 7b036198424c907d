//! Adaptive, terminal-driven navigation planner.
//!
//! This crate walks the actor of a running text-mode game from the arrival
//! staircase to the down staircase and emits the keystrokes that reproduce the
//! walk. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (terrain, screen parsing, path
//!   search, budgets, recording). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (tmux, dump files, config, logs).
//!   The terminal sits behind [`io::driver::TerminalDriver`] so tests can
//!   substitute a scripted game.
//!
//! Orchestration modules ([`session`], [`replay`], [`plan`]) coordinate core
//! logic with I/O to implement CLI commands.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod plan;
pub mod replay;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
