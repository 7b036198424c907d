//! Test-only helpers: ASCII level fixtures and an in-memory scripted game.
//!
//! [`ScriptedGame`] implements [`TerminalDriver`] with the same screen layout
//! as the real terminal (message line, map shifted one column left, two status
//! lines), so the session loop can be exercised without tmux.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::screen::{ScreenFrame, grid_to_screen};
use crate::core::terrain::{Terrain, TerrainGrid};
use crate::core::types::{Direction, GridDims, GridPosition};
use crate::io::driver::TerminalDriver;

/// Build a grid from ASCII rows.
///
/// `.` room, `#` corridor, `+` door, `>`/`<` stairs, `{` fountain, `|`/`-`
/// walls, space (or anything else) stone. Rows shorter than the first are
/// padded with stone.
pub fn grid_from_ascii(rows: &[&str]) -> TerrainGrid {
    let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
    let cells = rows
        .iter()
        .map(|row| {
            let mut cells: Vec<Terrain> = row.chars().map(terrain_for).collect();
            cells.resize(width, Terrain::Stone);
            cells
        })
        .collect();
    TerrainGrid::from_rows(cells).expect("ascii grid")
}

fn terrain_for(c: char) -> Terrain {
    match c {
        '.' => Terrain::Room,
        '#' => Terrain::Corridor,
        '+' => Terrain::Door,
        '>' | '<' => Terrain::Stairs,
        '{' => Terrain::Fountain,
        '|' => Terrain::VWall,
        '-' => Terrain::HWall,
        _ => Terrain::Stone,
    }
}

fn glyph_for(terrain: Terrain) -> char {
    match terrain {
        Terrain::Room => '.',
        Terrain::Corridor => '#',
        Terrain::Door => '+',
        Terrain::Stairs => '>',
        Terrain::Fountain => '{',
        Terrain::VWall => '|',
        Terrain::HWall => '-',
        _ => ' ',
    }
}

#[derive(Debug, Clone)]
enum Pending {
    /// Pagination; only space dismisses it.
    More(String),
    /// Death confirmation; `n` resurrects.
    Die,
    /// A full-screen question answered by any key.
    Screen(String),
}

#[derive(Debug, Clone)]
enum DumpMode {
    Terrain,
    Suppressed,
    Override(String),
    Once(String),
}

/// In-memory game that reacts to keystrokes like the real terminal would.
pub struct ScriptedGame {
    grid: TerrainGrid,
    actor: GridPosition,
    depth: u32,
    turn: u32,
    moves: u32,
    sent: Vec<String>,
    answered: Vec<(String, char)>,
    pending: VecDeque<Pending>,
    message: String,
    blocked: BTreeMap<GridPosition, u32>,
    deaths: BTreeSet<u32>,
    vanish_at: Option<u32>,
    extended: Option<String>,
    dump_path: Option<PathBuf>,
    dump_mode: DumpMode,
    paginate_dump: bool,
    dump_deaths: BTreeSet<u32>,
    dumps: u32,
    hidden_captures: u32,
    hidden_until_pause: bool,
    pauses: u32,
    displacements: BTreeMap<u32, GridPosition>,
    sticky_prompt: Option<String>,
    quit: bool,
}

impl ScriptedGame {
    pub fn new(grid: TerrainGrid, actor: GridPosition) -> Self {
        Self {
            grid,
            actor,
            depth: 1,
            turn: 1,
            moves: 0,
            sent: Vec::new(),
            answered: Vec::new(),
            pending: VecDeque::new(),
            message: String::new(),
            blocked: BTreeMap::new(),
            deaths: BTreeSet::new(),
            vanish_at: None,
            extended: None,
            dump_path: None,
            dump_mode: DumpMode::Terrain,
            paginate_dump: false,
            dump_deaths: BTreeSet::new(),
            dumps: 0,
            hidden_captures: 0,
            hidden_until_pause: false,
            pauses: 0,
            displacements: BTreeMap::new(),
            sticky_prompt: None,
            quit: false,
        }
    }

    pub fn dims(&self) -> GridDims {
        self.grid.dims()
    }

    pub fn actor(&self) -> GridPosition {
        self.actor
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Every `send` call, verbatim.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Full-screen questions answered so far, with the key that answered them.
    pub fn answered(&self) -> &[(String, char)] {
        &self.answered
    }

    /// Number of terrain dumps the game wrote.
    pub fn dumps(&self) -> u32 {
        self.dumps
    }

    /// Settle pauses requested by the caller.
    pub fn pauses(&self) -> u32 {
        self.pauses
    }

    pub fn has_quit(&self) -> bool {
        self.quit
    }

    /// Where `#dumpmap` writes; without it the dump command does nothing.
    pub fn set_dump_path(&mut self, path: &Path) {
        self.dump_path = Some(path.to_path_buf());
    }

    /// `#dumpmap` silently writes nothing.
    pub fn suppress_dump(&mut self) {
        self.dump_mode = DumpMode::Suppressed;
    }

    /// `#dumpmap` writes `text` instead of the real terrain.
    pub fn override_dump(&mut self, text: &str) {
        self.dump_mode = DumpMode::Override(text.to_string());
    }

    /// The next `#dumpmap` writes `text`; later dumps are real again.
    pub fn override_dump_once(&mut self, text: &str) {
        self.dump_mode = DumpMode::Once(text.to_string());
    }

    /// `#dumpmap` leaves a pagination prompt behind.
    pub fn paginate_dump(&mut self) {
        self.paginate_dump = true;
    }

    /// The `nth` dump (1-based) is followed by a death.
    pub fn death_after_dump(&mut self, nth: u32) {
        self.dump_deaths.insert(nth);
    }

    /// Moves into `pos` fail `bumps` times before succeeding, like a stuck
    /// door or a monster in the way.
    pub fn block(&mut self, pos: GridPosition, bumps: u32) {
        self.blocked.insert(pos, bumps);
    }

    /// The `nth` movement command (1-based) kills the actor.
    pub fn death_at_move(&mut self, nth: u32) {
        self.deaths.insert(nth);
    }

    /// From the `nth` movement command on, the marker is never drawn again.
    pub fn vanish_at_move(&mut self, nth: u32) {
        self.vanish_at = Some(nth);
    }

    /// Open a death sequence right now.
    pub fn queue_death(&mut self) {
        self.open_death();
    }

    /// Push a full-screen question that any key answers.
    pub fn queue_screen(&mut self, text: &str) {
        self.pending.push_back(Pending::Screen(text.to_string()));
    }

    /// Show `text` on the message line forever; every key is ignored.
    pub fn set_sticky_prompt(&mut self, text: &str) {
        self.sticky_prompt = Some(text.to_string());
    }

    /// The next `captures` frames are drawn without the actor marker.
    pub fn hide_marker_for(&mut self, captures: u32) {
        self.hidden_captures = captures;
    }

    /// The marker stays hidden until the caller pauses once.
    pub fn hide_marker_until_pause(&mut self) {
        self.hidden_until_pause = true;
    }

    /// The `nth` movement command lands the actor on `pos` instead, like a
    /// trap door or a dug passage the last dump did not show.
    pub fn displace_at_move(&mut self, nth: u32, pos: GridPosition) {
        self.displacements.insert(nth, pos);
    }

    fn open_death(&mut self) {
        self.pending
            .push_back(Pending::More("You die...".to_string()));
        self.pending.push_back(Pending::Die);
    }

    fn press(&mut self, key: char) -> Result<()> {
        if let Some(buffer) = self.extended.as_mut() {
            if key == '\r' {
                let command = std::mem::take(buffer);
                self.extended = None;
                return self.run_extended(&command);
            }
            buffer.push(key);
            return Ok(());
        }

        if let Some(front) = self.pending.front() {
            let dismissed = match front {
                Pending::More(_) => key == ' ',
                Pending::Die => key == 'n',
                Pending::Screen(text) => {
                    self.answered.push((text.clone(), key));
                    true
                }
            };
            if dismissed {
                self.pending.pop_front();
                if self.pending.is_empty() {
                    self.message.clear();
                }
            }
            return Ok(());
        }

        if self.sticky_prompt.is_some() || self.quit {
            return Ok(());
        }

        match key {
            '#' => self.extended = Some(String::new()),
            '>' => self.descend(),
            _ => {
                if let Some(direction) = Direction::from_key(&key.to_string()) {
                    self.try_move(direction);
                }
            }
        }
        Ok(())
    }

    fn try_move(&mut self, direction: Direction) {
        self.moves += 1;
        self.turn += 1;
        self.message.clear();
        if let Some(target) = self.actor.step(direction, self.grid.dims())
            && self.grid.is_walkable(target)
        {
            match self.blocked.get_mut(&target) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    self.message = "This door is locked.".to_string();
                }
                _ => self.actor = target,
            }
        }
        if let Some(pos) = self.displacements.get(&self.moves) {
            self.actor = *pos;
        }
        if self.deaths.contains(&self.moves) {
            self.open_death();
        }
        if self.vanish_at == Some(self.moves) {
            self.hidden_captures = u32::MAX;
        }
    }

    fn descend(&mut self) {
        if self.grid.get(self.actor) == Some(Terrain::Stairs) {
            self.depth += 1;
            self.turn += 1;
            self.message.clear();
        } else {
            self.message = "You can't go down here.".to_string();
        }
    }

    fn run_extended(&mut self, command: &str) -> Result<()> {
        match command {
            "dumpmap" => self.write_dump(),
            "quit" => {
                self.pending
                    .push_back(Pending::Screen("Really quit? [yn] (n)".to_string()));
                self.pending.push_back(Pending::Screen(
                    "Do you want your possessions identified? [ynq] (n)".to_string(),
                ));
                self.quit = true;
                Ok(())
            }
            other => {
                self.message = format!("Unknown extended command: {other}");
                Ok(())
            }
        }
    }

    fn write_dump(&mut self) -> Result<()> {
        let Some(path) = self.dump_path.clone() else {
            return Ok(());
        };
        let text = match &self.dump_mode {
            DumpMode::Terrain => self.grid.to_dump(),
            DumpMode::Override(text) => text.clone(),
            DumpMode::Once(text) => {
                let text = text.clone();
                self.dump_mode = DumpMode::Terrain;
                text
            }
            DumpMode::Suppressed => return Ok(()),
        };
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        self.dumps += 1;
        if self.paginate_dump {
            self.pending
                .push_back(Pending::More("Map dumped.".to_string()));
        }
        if self.dump_deaths.contains(&self.dumps) {
            self.open_death();
        }
        Ok(())
    }

    fn render(&mut self) -> ScreenFrame {
        let dims = self.grid.dims();
        let show_marker = self.hidden_captures == 0 && !self.hidden_until_pause;
        self.hidden_captures = self.hidden_captures.saturating_sub(1);

        let top = match (&self.sticky_prompt, self.pending.front()) {
            (Some(text), _) => text.clone(),
            (None, Some(Pending::More(text))) => format!("{text}--More--"),
            (None, Some(Pending::Die)) => "Die? [yn] (n)".to_string(),
            (None, Some(Pending::Screen(text))) => text.clone(),
            (None, None) => self.message.clone(),
        };
        if matches!(self.pending.front(), Some(Pending::Screen(_))) || self.quit {
            return ScreenFrame::from_lines(vec![top]);
        }

        let mut lines = vec![top];
        for y in 0..dims.height {
            let mut row: Vec<char> = (1..dims.width)
                .map(|x| glyph_for(self.grid.get(GridPosition::new(x, y)).unwrap_or(Terrain::Stone)))
                .collect();
            if show_marker
                && self.actor.y == y
                && let Some((col, _)) = grid_to_screen(self.actor)
                && col < row.len()
            {
                row[col] = '@';
            }
            lines.push(row.into_iter().collect::<String>().trim_end().to_string());
        }
        lines.push("Wizard the Stripling  St:17 Dx:13 Co:18 In:7 Wi:10 Ch:8 Neutral".to_string());
        lines.push(format!(
            "Dlvl:{} $:0 HP:16(16) Pw:2(2) AC:6 Xp:1/0 T:{}",
            self.depth, self.turn
        ));
        ScreenFrame::from_lines(lines)
    }
}

impl TerminalDriver for ScriptedGame {
    fn send(&mut self, keys: &str) -> Result<()> {
        self.sent.push(keys.to_string());
        for key in keys.chars() {
            self.press(key)?;
        }
        Ok(())
    }

    fn capture(&mut self) -> Result<ScreenFrame> {
        Ok(self.render())
    }

    fn pause(&mut self) {
        self.pauses += 1;
        self.hidden_until_pause = false;
    }
}
