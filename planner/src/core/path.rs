//! Cardinal shortest-path search over walkable terrain.

use std::collections::VecDeque;

use crate::core::terrain::TerrainGrid;
use crate::core::types::{Direction, GridPosition};

/// One move of a planned path: the direction to press and the cell it leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    pub direction: Direction,
    pub to: GridPosition,
}

pub type PlannedPath = Vec<PathStep>;

/// Breadth-first search from `start` to `goal` using only cardinal moves onto
/// walkable cells.
///
/// Neighbours are expanded in [`Direction::SEARCH_ORDER`], so the same grid
/// always yields the same path. The start cell itself need not be walkable.
/// Returns an empty path when `start == goal` and `None` when the goal is not
/// reachable.
pub fn shortest_path(
    grid: &TerrainGrid,
    start: GridPosition,
    goal: GridPosition,
) -> Option<PlannedPath> {
    let dims = grid.dims();
    if grid.get(start).is_none() || grid.get(goal).is_none() {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }

    let mut parent: Vec<Option<(usize, Direction)>> = vec![None; dims.cell_count()];
    let mut visited = vec![false; dims.cell_count()];
    let mut queue = VecDeque::new();
    visited[grid.index(start)] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            return Some(unwind(grid, &parent, start, goal));
        }
        for direction in Direction::SEARCH_ORDER {
            let Some(next) = current.step(direction, dims) else {
                continue;
            };
            let index = grid.index(next);
            if visited[index] || !grid.is_walkable(next) {
                continue;
            }
            visited[index] = true;
            parent[index] = Some((grid.index(current), direction));
            queue.push_back(next);
        }
    }
    None
}

fn unwind(
    grid: &TerrainGrid,
    parent: &[Option<(usize, Direction)>],
    start: GridPosition,
    goal: GridPosition,
) -> PlannedPath {
    let mut steps = Vec::new();
    let mut cursor = goal;
    while cursor != start {
        let Some((prev, direction)) = parent[grid.index(cursor)] else {
            break;
        };
        steps.push(PathStep {
            direction,
            to: cursor,
        });
        cursor = grid.position(prev);
    }
    steps.reverse();
    steps
}
