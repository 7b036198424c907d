//! Shared deterministic types for planner core logic.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed grid dimensions of one dungeon level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDims {
    pub width: usize,
    pub height: usize,
}

impl Default for GridDims {
    fn default() -> Self {
        Self {
            width: 80,
            height: 21,
        }
    }
}

impl GridDims {
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// A (column, row) cell in grid space, 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: usize,
    pub y: usize,
}

impl GridPosition {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Neighbour in `direction`, or `None` when it would leave `dims`.
    pub fn step(self, direction: Direction, dims: GridDims) -> Option<Self> {
        let (dx, dy) = direction.offset();
        let nx = self.x as i64 + dx;
        let ny = self.y as i64 + dy;
        dims.contains(nx, ny).then(|| Self::new(nx as usize, ny as usize))
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Cardinal move. Diagonals are excluded because adjacent walls can block them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    West,
    South,
    North,
    East,
}

impl Direction {
    /// Exploration order used by path search. Changing it changes tie-breaks.
    pub const SEARCH_ORDER: [Direction; 4] = [
        Direction::West,
        Direction::South,
        Direction::North,
        Direction::East,
    ];

    /// Keystroke that issues this move.
    pub fn key(self) -> &'static str {
        match self {
            Direction::West => "h",
            Direction::South => "j",
            Direction::North => "k",
            Direction::East => "l",
        }
    }

    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::West => (-1, 0),
            Direction::South => (0, 1),
            Direction::North => (0, -1),
            Direction::East => (1, 0),
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::SEARCH_ORDER.into_iter().find(|dir| dir.key() == key)
    }
}

/// Result tag of one recorded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Moved,
    Stuck,
    GoalReached,
    Unreachable,
    ExtractionFailed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Moved => "MOVED",
            Outcome::Stuck => "STUCK",
            Outcome::GoalReached => "GOAL",
            Outcome::Unreachable => "UNREACHABLE",
            Outcome::ExtractionFailed => "LOST",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_stays_inside_dims() {
        let dims = GridDims {
            width: 3,
            height: 2,
        };
        let origin = GridPosition::new(0, 0);
        assert_eq!(origin.step(Direction::West, dims), None);
        assert_eq!(origin.step(Direction::North, dims), None);
        assert_eq!(
            origin.step(Direction::East, dims),
            Some(GridPosition::new(1, 0))
        );
        assert_eq!(
            origin.step(Direction::South, dims),
            Some(GridPosition::new(0, 1))
        );
        assert_eq!(GridPosition::new(0, 1).step(Direction::South, dims), None);
    }

    #[test]
    fn direction_keys_round_trip_through_search_order() {
        let keys: Vec<&str> = Direction::SEARCH_ORDER.iter().map(|d| d.key()).collect();
        assert_eq!(keys, vec!["h", "j", "k", "l"]);
        assert_eq!(Direction::from_key("k"), Some(Direction::North));
        assert_eq!(Direction::from_key(">"), None);
    }
}
