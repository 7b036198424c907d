//! Prompt-aware command sending.
//!
//! This is the only place that reacts to transient prompts. Callers get back a
//! stable frame plus the list of prompts that were dismissed on the way.

use tracing::{debug, info};

use crate::core::classifier::{PromptKind, classify_prompt};
use crate::core::screen::ScreenFrame;
use crate::error::NavError;
use crate::io::driver::TerminalDriver;

/// Dismisses message pagination.
pub const CONTINUE_KEY: &str = " ";

/// Declines a death confirmation; in wizard mode the actor is resurrected.
pub const DECLINE_KEY: &str = "n";

/// Frame with no open prompt, and the prompts dismissed to reach it.
#[derive(Debug, Clone)]
pub struct Settled {
    pub frame: ScreenFrame,
    pub dismissed: Vec<PromptKind>,
}

/// Capture until no prompt is open, answering each prompt on the way.
///
/// Fails with [`NavError::PromptLoopExceeded`] when `limit` captures all show
/// a prompt.
pub fn resolve_prompts<D: TerminalDriver + ?Sized>(
    driver: &mut D,
    limit: u32,
) -> Result<Settled, NavError> {
    let mut dismissed = Vec::new();
    for _ in 0..limit {
        let frame = driver.capture()?;
        match classify_prompt(&frame) {
            PromptKind::None => return Ok(Settled { frame, dismissed }),
            PromptKind::Pagination => {
                debug!(message = frame.message(), "dismissing pagination");
                driver.send(CONTINUE_KEY)?;
                dismissed.push(PromptKind::Pagination);
            }
            PromptKind::LethalConfirm => {
                info!("declining death confirmation (resurrected)");
                driver.send(DECLINE_KEY)?;
                dismissed.push(PromptKind::LethalConfirm);
            }
        }
    }
    Err(NavError::PromptLoopExceeded { limit })
}

/// Send `command`, then settle any prompts it raised.
pub fn send_guarded<D: TerminalDriver + ?Sized>(
    driver: &mut D,
    command: &str,
    limit: u32,
) -> Result<Settled, NavError> {
    driver.send(command)?;
    resolve_prompts(driver, limit)
}
