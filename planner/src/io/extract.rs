//! Reading the actor's position and status off a settled frame.

use tracing::{debug, warn};

use crate::core::classifier::{PromptKind, includes_resurrection};
use crate::core::screen::StatusReadout;
use crate::core::types::{GridDims, GridPosition};
use crate::error::NavError;
use crate::io::driver::TerminalDriver;
use crate::io::prompts::{Settled, resolve_prompts};

/// What one stable frame tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenState {
    pub position: GridPosition,
    pub status: StatusReadout,
    pub message: String,
    /// Prompts dismissed before the frame settled, across all captures.
    pub dismissed: Vec<PromptKind>,
}

impl ScreenState {
    pub fn resurrected(&self) -> bool {
        includes_resurrection(&self.dismissed)
    }
}

/// Extract state from `settled`, capturing again (up to `locate_retries` more
/// times, each after a settle pause) while the marker is hidden.
pub fn extract_from<D: TerminalDriver + ?Sized>(
    driver: &mut D,
    settled: Settled,
    dims: GridDims,
    prompt_limit: u32,
    locate_retries: u32,
) -> Result<ScreenState, NavError> {
    let Settled {
        mut frame,
        mut dismissed,
    } = settled;
    let attempts = locate_retries + 1;
    for attempt in 1..=attempts {
        if let Some(position) = frame.actor_position(dims) {
            debug!(%position, attempt, "actor located");
            return Ok(ScreenState {
                position,
                status: frame.status(),
                message: frame.message().to_string(),
                dismissed,
            });
        }
        if attempt == attempts {
            break;
        }
        warn!(attempt, "actor marker not visible, recapturing");
        driver.pause();
        let next = resolve_prompts(driver, prompt_limit)?;
        dismissed.extend(next.dismissed);
        frame = next.frame;
    }
    Err(NavError::Locate { attempts })
}

/// Settle prompts, then extract.
pub fn extract_state<D: TerminalDriver + ?Sized>(
    driver: &mut D,
    dims: GridDims,
    prompt_limit: u32,
    locate_retries: u32,
) -> Result<ScreenState, NavError> {
    let settled = resolve_prompts(driver, prompt_limit)?;
    extract_from(driver, settled, dims, prompt_limit, locate_retries)
}
