//! Terrain acquisition through the in-game `#dumpmap` extended command.
//!
//! The game writes the grid to the file named by `NETHACK_DUMPMAP`. The file
//! is removed first so a failed dump can never be mistaken for a fresh one.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::core::classifier::PromptKind;
use crate::core::terrain::TerrainGrid;
use crate::core::types::GridDims;
use crate::error::NavError;
use crate::io::driver::TerminalDriver;
use crate::io::prompts::send_guarded;

pub const EXTENDED_COMMAND_KEY: &str = "#";
pub const DUMP_COMMAND: &str = "dumpmap";
pub const SUBMIT_KEY: &str = "\r";

/// A parsed dump and the prompts dismissed while it was written.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub grid: TerrainGrid,
    pub dismissed: Vec<PromptKind>,
}

/// Ask the game for a fresh terrain dump and parse it.
#[instrument(skip_all, fields(dump = %dump_path.display()))]
pub fn acquire_terrain<D: TerminalDriver + ?Sized>(
    driver: &mut D,
    dump_path: &Path,
    dims: GridDims,
    prompt_limit: u32,
) -> Result<Acquired, NavError> {
    match fs::remove_file(dump_path) {
        Ok(()) => debug!("removed stale dump"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("remove stale dump {}", dump_path.display()))
                .into());
        }
    }

    driver.send(EXTENDED_COMMAND_KEY)?;
    driver.send(DUMP_COMMAND)?;
    let settled = send_guarded(driver, SUBMIT_KEY, prompt_limit)?;
    if !settled.dismissed.is_empty() {
        debug!(dismissed = settled.dismissed.len(), "prompts after dump");
    }

    if !dump_path.exists() {
        return Err(NavError::acquisition(format!(
            "dump file {} was not written",
            dump_path.display()
        )));
    }
    let text = fs::read_to_string(dump_path)
        .with_context(|| format!("read dump {}", dump_path.display()))?;
    let grid = TerrainGrid::parse_dump(&text, dims)?;
    info!(
        width = dims.width,
        height = dims.height,
        walkable = grid_walkable_count(&grid),
        "terrain acquired"
    );
    Ok(Acquired {
        grid,
        dismissed: settled.dismissed,
    })
}

fn grid_walkable_count(grid: &TerrainGrid) -> usize {
    let dims = grid.dims();
    (0..dims.cell_count())
        .filter(|index| grid.is_walkable(grid.position(*index)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::terrain::Terrain;
    use crate::core::types::GridPosition;
    use crate::test_support::{ScriptedGame, grid_from_ascii};

    fn scripted(dump_path: &Path) -> ScriptedGame {
        let mut game =
            ScriptedGame::new(grid_from_ascii(&[" ..>", " .. "]), GridPosition::new(1, 0));
        game.set_dump_path(dump_path);
        game
    }

    #[test]
    fn acquires_grid_written_by_game() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dump = temp.path().join("dumpmap.txt");
        let mut game = scripted(&dump);
        let dims = game.dims();
        let acquired = acquire_terrain(&mut game, &dump, dims, 5).expect("acquire");
        assert!(acquired.dismissed.is_empty());
        assert_eq!(acquired.grid.get(GridPosition::new(3, 0)), Some(Terrain::Stairs));
        assert_eq!(game.sent(), ["#", "dumpmap", "\r"]);
    }

    #[test]
    fn stale_dump_is_not_reused() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dump = temp.path().join("dumpmap.txt");
        fs::write(&dump, "25 25 25 25\n25 25 25 25\n").expect("write stale");
        let mut game = scripted(&dump);
        let dims = game.dims();
        game.suppress_dump();
        let err = acquire_terrain(&mut game, &dump, dims, 5).unwrap_err();
        assert!(matches!(err, NavError::Acquisition { .. }));
        assert!(!dump.exists());
    }

    #[test]
    fn malformed_dump_is_an_acquisition_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dump = temp.path().join("dumpmap.txt");
        let mut game = scripted(&dump);
        let dims = game.dims();
        game.override_dump("0 0\n");
        let err = acquire_terrain(&mut game, &dump, dims, 5).unwrap_err();
        assert!(matches!(err, NavError::Acquisition { .. }));
    }

    #[test]
    fn pagination_after_dump_is_dismissed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dump = temp.path().join("dumpmap.txt");
        let mut game = scripted(&dump);
        let dims = game.dims();
        game.paginate_dump();
        let acquired = acquire_terrain(&mut game, &dump, dims, 5).expect("acquire");
        assert_eq!(game.sent().last().map(String::as_str), Some(" "));
        assert_eq!(acquired.dismissed, vec![PromptKind::Pagination]);
    }

    #[test]
    fn death_during_dump_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dump = temp.path().join("dumpmap.txt");
        let mut game = scripted(&dump);
        let dims = game.dims();
        game.death_after_dump(1);
        let acquired = acquire_terrain(&mut game, &dump, dims, 5).expect("acquire");
        assert_eq!(
            acquired.dismissed,
            vec![PromptKind::Pagination, PromptKind::LethalConfirm]
        );
        assert_eq!(acquired.grid.dims(), dims);
    }
}
