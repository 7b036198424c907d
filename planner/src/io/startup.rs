//! Startup prompt navigation and a clean quit.

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::screen::ScreenFrame;
use crate::io::driver::TerminalDriver;
use crate::io::prompts::CONTINUE_KEY;

/// Startup questions and the key that answers each.
///
/// Matching is case-insensitive and the first hit wins, so pagination is
/// checked before anything else.
const STARTUP_ANSWERS: &[(&str, &str)] = &[
    ("--more--", CONTINUE_KEY),
    ("keep the save file", "n"),
    ("keep save", "n"),
    ("destroy old game?", "y"),
    ("shall i pick", "y"),
    ("is this ok?", "y"),
    ("tutorial", "n"),
    ("pick a role", "v"),
    ("pick a race", "h"),
    ("pick a gender", "f"),
    ("pick an alignment", "n"),
];

/// Unrecognized screens are waited on this many times before being paged.
const PATIENT_ATTEMPTS: u32 = 3;

const QUIT_COMMAND: &str = "#quit\r";

fn ready(frame: &ScreenFrame) -> bool {
    frame.contains("Dlvl:") || frame.contains("HP:")
}

fn startup_answer(frame: &ScreenFrame) -> Option<(&'static str, &'static str)> {
    let text = frame.lines().join("\n").to_lowercase();
    STARTUP_ANSWERS
        .iter()
        .find(|(needle, _)| text.contains(needle))
        .copied()
}

/// Answer startup questions until the status line is visible.
///
/// Returns the number of captures it took.
#[instrument(skip_all, fields(max_attempts))]
pub fn wait_ready<D: TerminalDriver + ?Sized>(driver: &mut D, max_attempts: u32) -> Result<u32> {
    for attempt in 1..=max_attempts {
        let frame = driver.capture()?;
        if let Some((question, key)) = startup_answer(&frame) {
            debug!(attempt, question, key, "answering startup prompt");
            driver.send(key)?;
            continue;
        }
        if ready(&frame) {
            info!(attempt, "game ready");
            return Ok(attempt);
        }
        if attempt > PATIENT_ATTEMPTS {
            debug!(attempt, message = frame.message(), "paging unrecognized screen");
            driver.send(CONTINUE_KEY)?;
        } else {
            driver.pause();
        }
    }
    Err(anyhow!(
        "game not ready after {max_attempts} startup captures"
    ))
}

/// Quit the game, confirming and declining the end-of-game questions.
///
/// Best effort: the caller kills the terminal afterwards regardless.
#[instrument(skip_all, fields(max_attempts))]
pub fn quit_game<D: TerminalDriver + ?Sized>(driver: &mut D, max_attempts: u32) -> Result<()> {
    driver.send(QUIT_COMMAND)?;
    let mut answered = 0u32;
    for _ in 0..max_attempts {
        let frame = driver.capture()?;
        let text = frame.lines().join("\n").to_lowercase();
        let key = if text.contains("really quit") {
            "y"
        } else if text.contains("do you want your possessions") {
            "n"
        } else if text.contains("--more--") {
            CONTINUE_KEY
        } else if answered > 0 {
            info!(answered, "game quit");
            return Ok(());
        } else {
            driver.pause();
            continue;
        };
        driver.send(key)?;
        answered += 1;
    }
    warn!(max_attempts, "quit did not finish cleanly");
    Ok(())
}
