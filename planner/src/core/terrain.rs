//! Terrain codes and the parsed level grid.

use crate::core::types::{GridDims, GridPosition};
use crate::error::NavError;

/// Level location types as written by `#dumpmap` (one integer per cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Terrain {
    Stone = 0,
    VWall,
    HWall,
    TlCorner,
    TrCorner,
    BlCorner,
    BrCorner,
    CrossWall,
    TuWall,
    TdWall,
    TlWall,
    TrWall,
    DbWall,
    Tree,
    SecretDoor,
    SecretCorridor,
    Pool,
    Moat,
    Water,
    DrawbridgeUp,
    LavaPool,
    LavaWall,
    IronBars,
    Door,
    Corridor,
    Room,
    Stairs,
    Ladder,
    Fountain,
    Throne,
    Sink,
    Grave,
    Altar,
    Ice,
    DrawbridgeDown,
    Air,
    Cloud,
}

impl Terrain {
    const ALL: [Terrain; 37] = [
        Terrain::Stone,
        Terrain::VWall,
        Terrain::HWall,
        Terrain::TlCorner,
        Terrain::TrCorner,
        Terrain::BlCorner,
        Terrain::BrCorner,
        Terrain::CrossWall,
        Terrain::TuWall,
        Terrain::TdWall,
        Terrain::TlWall,
        Terrain::TrWall,
        Terrain::DbWall,
        Terrain::Tree,
        Terrain::SecretDoor,
        Terrain::SecretCorridor,
        Terrain::Pool,
        Terrain::Moat,
        Terrain::Water,
        Terrain::DrawbridgeUp,
        Terrain::LavaPool,
        Terrain::LavaWall,
        Terrain::IronBars,
        Terrain::Door,
        Terrain::Corridor,
        Terrain::Room,
        Terrain::Stairs,
        Terrain::Ladder,
        Terrain::Fountain,
        Terrain::Throne,
        Terrain::Sink,
        Terrain::Grave,
        Terrain::Altar,
        Terrain::Ice,
        Terrain::DrawbridgeDown,
        Terrain::Air,
        Terrain::Cloud,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Cells the actor may step onto with a plain cardinal move.
    pub fn is_walkable(self) -> bool {
        matches!(
            self,
            Terrain::Door
                | Terrain::Corridor
                | Terrain::Room
                | Terrain::Stairs
                | Terrain::Ladder
                | Terrain::Fountain
        )
    }
}

/// Terrain snapshot of one level, row-major.
///
/// Replaced wholesale on re-acquisition, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainGrid {
    dims: GridDims,
    cells: Vec<Terrain>,
}

impl TerrainGrid {
    /// Build from rows of terrain; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<Terrain>>) -> Result<Self, NavError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(NavError::acquisition("empty terrain grid"));
        }
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(NavError::acquisition(format!(
                "row {y} has {} cells, expected {width}",
                row.len()
            )));
        }
        Ok(Self {
            dims: GridDims { width, height },
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Parse a `#dumpmap` file: exactly `dims.height` lines of `dims.width` integers.
    ///
    /// Only trailing blank lines are ignored; a blank line inside the grid is a
    /// missing row.
    pub fn parse_dump(text: &str, dims: GridDims) -> Result<Self, NavError> {
        let lines: Vec<&str> = text.trim_end().lines().collect();
        if lines.len() != dims.height {
            return Err(NavError::acquisition(format!(
                "dump has {} rows, expected {}",
                lines.len(),
                dims.height
            )));
        }

        let mut rows = Vec::with_capacity(dims.height);
        for (y, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                return Err(NavError::acquisition(format!("dump row {y} is blank")));
            }
            let row = line
                .split_whitespace()
                .map(|token| parse_code(token, y))
                .collect::<Result<Vec<_>, _>>()?;
            if row.len() != dims.width {
                return Err(NavError::acquisition(format!(
                    "dump row {y} has {} cells, expected {}",
                    row.len(),
                    dims.width
                )));
            }
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn get(&self, pos: GridPosition) -> Option<Terrain> {
        if pos.x >= self.dims.width || pos.y >= self.dims.height {
            return None;
        }
        self.cells.get(self.index(pos)).copied()
    }

    pub fn is_walkable(&self, pos: GridPosition) -> bool {
        self.get(pos).is_some_and(Terrain::is_walkable)
    }

    pub fn index(&self, pos: GridPosition) -> usize {
        pos.y * self.dims.width + pos.x
    }

    pub fn position(&self, index: usize) -> GridPosition {
        GridPosition::new(index % self.dims.width, index / self.dims.width)
    }

    /// All cells of the given terrain, row-major order.
    pub fn find_all(&self, terrain: Terrain) -> Vec<GridPosition> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == terrain)
            .map(|(index, _)| self.position(index))
            .collect()
    }

    /// First staircase that is not `start`.
    ///
    /// Up and down stairs share one terrain code; the actor arrives on the up
    /// staircase, so the other one is the way down.
    pub fn find_downstairs(&self, start: GridPosition) -> Option<GridPosition> {
        self.find_all(Terrain::Stairs)
            .into_iter()
            .find(|pos| *pos != start)
    }

    /// Serialize back into dump format.
    #[cfg(any(test, feature = "test-support"))]
    pub fn to_dump(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() * 3);
        for row in self.cells.chunks(self.dims.width) {
            let line: Vec<String> = row.iter().map(|cell| cell.code().to_string()).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }
}

fn parse_code(token: &str, row: usize) -> Result<Terrain, NavError> {
    let code: u8 = token.parse().map_err(|_| {
        NavError::acquisition(format!("dump row {row}: invalid terrain code '{token}'"))
    })?;
    Terrain::from_code(code)
        .ok_or_else(|| NavError::acquisition(format!("dump row {row}: unknown terrain code {code}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: usize, height: usize) -> GridDims {
        GridDims { width, height }
    }

    #[test]
    fn codes_match_dump_numbering() {
        assert_eq!(Terrain::Door.code(), 23);
        assert_eq!(Terrain::Corridor.code(), 24);
        assert_eq!(Terrain::Room.code(), 25);
        assert_eq!(Terrain::Stairs.code(), 26);
        assert_eq!(Terrain::Fountain.code(), 28);
        assert_eq!(Terrain::Cloud.code(), 36);
        assert_eq!(Terrain::from_code(37), None);
    }

    #[test]
    fn walkable_set_is_doors_floors_and_features() {
        let walkable: Vec<u8> = (0..=36)
            .filter_map(Terrain::from_code)
            .filter(|t| t.is_walkable())
            .map(Terrain::code)
            .collect();
        assert_eq!(walkable, vec![23, 24, 25, 26, 27, 28]);
    }

    #[test]
    fn parse_dump_reads_rows() {
        let grid = TerrainGrid::parse_dump("0 1 2\n25 26 24\n", dims(3, 2)).expect("parse");
        assert_eq!(grid.get(GridPosition::new(1, 1)), Some(Terrain::Stairs));
        assert!(grid.is_walkable(GridPosition::new(2, 1)));
        assert!(!grid.is_walkable(GridPosition::new(0, 0)));
        assert_eq!(grid.get(GridPosition::new(3, 0)), None);
    }

    #[test]
    fn parse_dump_rejects_wrong_row_count() {
        let err = TerrainGrid::parse_dump("0 0 0\n", dims(3, 2)).unwrap_err();
        assert!(err.to_string().contains("1 rows, expected 2"));
    }

    #[test]
    fn parse_dump_rejects_interior_blank_row() {
        let err = TerrainGrid::parse_dump("25 25 25\n\n26 26 26\n", dims(3, 2)).unwrap_err();
        assert!(matches!(err, NavError::Acquisition { .. }));
        assert!(err.to_string().contains("3 rows, expected 2"));

        let err = TerrainGrid::parse_dump("25 25 25\n  \n26 26 26\n", dims(3, 3)).unwrap_err();
        assert!(err.to_string().contains("row 1 is blank"));
    }

    #[test]
    fn parse_dump_tolerates_trailing_blank_lines() {
        let grid = TerrainGrid::parse_dump("25 25 25\n26 26 26\n\n\n", dims(3, 2)).expect("parse");
        assert_eq!(grid.get(GridPosition::new(0, 1)), Some(Terrain::Stairs));
    }

    #[test]
    fn parse_dump_rejects_wrong_width() {
        let err = TerrainGrid::parse_dump("0 0 0\n0 0\n", dims(3, 2)).unwrap_err();
        assert!(err.to_string().contains("row 1 has 2 cells"));
    }

    #[test]
    fn parse_dump_rejects_garbage_and_unknown_codes() {
        let err = TerrainGrid::parse_dump("0 x 0\n0 0 0\n", dims(3, 2)).unwrap_err();
        assert!(matches!(err, NavError::Acquisition { .. }));
        let err = TerrainGrid::parse_dump("0 99 0\n0 0 0\n", dims(3, 2)).unwrap_err();
        assert!(err.to_string().contains("unknown terrain code 99"));
    }

    #[test]
    fn dump_text_round_trips() {
        let text = "0 25 26\n24 23 28\n";
        let grid = TerrainGrid::parse_dump(text, dims(3, 2)).expect("parse");
        assert_eq!(grid.to_dump(), text);
    }

    #[test]
    fn downstairs_skips_start_staircase() {
        let grid = TerrainGrid::parse_dump("26 25 26\n", dims(3, 1)).expect("parse");
        assert_eq!(
            grid.find_downstairs(GridPosition::new(0, 0)),
            Some(GridPosition::new(2, 0))
        );
        assert_eq!(
            grid.find_downstairs(GridPosition::new(2, 0)),
            Some(GridPosition::new(0, 0))
        );
    }
}
