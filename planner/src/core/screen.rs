//! Parsing of captured terminal frames.
//!
//! The rendered view is one message line, then the map (one screen row per
//! grid row), then two status lines. Map columns are shifted by one: grid
//! column 0 is never drawn.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::types::{GridDims, GridPosition};

/// Glyph of the controlled actor.
pub const ACTOR_MARKER: char = '@';

/// Screen rows above the map (the message line).
pub const MAP_TOP_ROW: usize = 1;

/// `grid_x = screen_col + MAP_COL_SHIFT`.
pub const MAP_COL_SHIFT: usize = 1;

static DEPTH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Dlvl:(\d+)").unwrap());
static HP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"HP:(\d+)\((\d+)\)").unwrap());

/// One captured instant of the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenFrame {
    lines: Vec<String>,
}

impl ScreenFrame {
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Split raw capture output, keeping at most `height` lines.
    pub fn from_capture(raw: &str, height: usize) -> Self {
        Self {
            lines: raw.lines().take(height).map(str::to_string).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    /// Top message line, trimmed.
    pub fn message(&self) -> &str {
        self.lines.first().map_or("", |line| line.trim())
    }

    /// Screen (col, row) of the first actor marker inside the map region.
    pub fn locate_marker(&self, dims: GridDims) -> Option<(usize, usize)> {
        self.lines
            .iter()
            .enumerate()
            .skip(MAP_TOP_ROW)
            .take(dims.height)
            .find_map(|(row, line)| {
                line.chars()
                    .position(|c| c == ACTOR_MARKER)
                    .map(|col| (col, row))
            })
    }

    /// Actor position in grid space, if the marker is visible and maps inside `dims`.
    pub fn actor_position(&self, dims: GridDims) -> Option<GridPosition> {
        let (col, row) = self.locate_marker(dims)?;
        screen_to_grid(col, row, dims)
    }

    /// Parse the two bottom status lines.
    pub fn status(&self) -> StatusReadout {
        let start = self.lines.len().saturating_sub(2);
        let mut readout = StatusReadout::default();
        for line in &self.lines[start..] {
            if let Some(caps) = DEPTH_RE.captures(line) {
                readout.depth = caps[1].parse().ok();
            }
            if let Some(caps) = HP_RE.captures(line) {
                readout.hp = caps[1].parse().ok();
                readout.max_hp = caps[2].parse().ok();
            }
        }
        readout
    }
}

/// Map a screen cell to a grid cell.
///
/// Screen row 0 is the message line, so `grid_y = row - 1`; the map is drawn
/// one column to the left, so `grid_x = col + 1`. Cells that fall outside the
/// grid yield `None`.
pub fn screen_to_grid(col: usize, row: usize, dims: GridDims) -> Option<GridPosition> {
    let y = row.checked_sub(MAP_TOP_ROW)?;
    let x = col + MAP_COL_SHIFT;
    dims.contains(x as i64, y as i64).then_some(GridPosition::new(x, y))
}

/// Inverse of [`screen_to_grid`]; `None` for grid column 0, which is not drawn.
pub fn grid_to_screen(pos: GridPosition) -> Option<(usize, usize)> {
    let col = pos.x.checked_sub(MAP_COL_SHIFT)?;
    Some((col, pos.y + MAP_TOP_ROW))
}

/// Diagnostic status text. Never used for control decisions except the
/// descend confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusReadout {
    pub depth: Option<u32>,
    pub hp: Option<u32>,
    pub max_hp: Option<u32>,
}
