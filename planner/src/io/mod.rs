//! I/O helpers for planner commands.

pub mod config;
pub mod driver;
pub mod extract;
pub mod home;
pub mod process;
pub mod prompts;
pub mod session_log;
pub mod startup;
pub mod terrain;
