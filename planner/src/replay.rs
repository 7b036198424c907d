//! Re-sending an emitted replay script.
//!
//! Replaying the script of a successful session against the same seed must
//! visit the same positions; this is how a script is checked before it is
//! handed to the recording tools.

use tracing::{debug, instrument};

use crate::core::types::{Direction, GridPosition};
use crate::error::NavError;
use crate::io::driver::TerminalDriver;
use crate::io::extract::extract_from;
use crate::io::prompts::send_guarded;
use crate::session::{DESCEND_KEY, SessionSettings};

/// Split a replay script into single-key commands.
///
/// Every command the planner emits is one key, so this is a per-character
/// split that rejects keys the planner never sends.
pub fn split_script(script: &str) -> Result<Vec<String>, NavError> {
    script
        .chars()
        .map(|key| {
            let key = key.to_string();
            if key == DESCEND_KEY || Direction::from_key(&key).is_some() {
                Ok(key)
            } else {
                Err(NavError::Driver(anyhow::anyhow!(
                    "replay script contains unsupported key {key:?}"
                )))
            }
        })
        .collect()
}

/// Send `commands` one at a time, settling prompts after each, and report the
/// position observed after every command.
#[instrument(skip_all, fields(commands = commands.len()))]
pub fn replay<D: TerminalDriver + ?Sized>(
    driver: &mut D,
    commands: &[String],
    settings: &SessionSettings,
) -> Result<Vec<GridPosition>, NavError> {
    let mut positions = Vec::with_capacity(commands.len());
    for command in commands {
        let settled = send_guarded(driver, command, settings.prompt_limit)?;
        let screen = extract_from(
            driver,
            settled,
            settings.dims,
            settings.prompt_limit,
            settings.locate_retries,
        )?;
        debug!(command = %command, position = %screen.position, "replayed");
        positions.push(screen.position);
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_accepts_moves_and_descend() {
        let commands = split_script("hjkl>").expect("split");
        assert_eq!(commands, ["h", "j", "k", "l", ">"]);
    }

    #[test]
    fn split_rejects_other_keys() {
        let err = split_script("ll y").unwrap_err();
        assert!(err.to_string().contains("unsupported key"));
    }

    #[test]
    fn empty_script_is_empty() {
        assert!(split_script("").expect("split").is_empty());
    }
}
