//! Deterministic classification of transient prompts on a captured frame.

use serde::{Deserialize, Serialize};

use crate::core::screen::ScreenFrame;

const PAGINATION_MARKER: &str = "--More--";
const LETHAL_CONFIRM_MARKER: &str = "Die?";

/// Transient prompt visible on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Message pagination; dismissed with the continue key.
    Pagination,
    /// Wizard-mode death confirmation; declining resurrects the actor.
    LethalConfirm,
    None,
}

/// Whether a death confirmation was declined among `dismissed`.
pub fn includes_resurrection(dismissed: &[PromptKind]) -> bool {
    dismissed.contains(&PromptKind::LethalConfirm)
}

/// Classify `frame` once.
///
/// Pagination wins over a death confirmation: the confirmation is only
/// reachable after the pending messages are paged through.
pub fn classify_prompt(frame: &ScreenFrame) -> PromptKind {
    if frame.contains(PAGINATION_MARKER) {
        PromptKind::Pagination
    } else if frame.contains(LETHAL_CONFIRM_MARKER) {
        PromptKind::LethalConfirm
    } else {
        PromptKind::None
    }
}
