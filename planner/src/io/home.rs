//! Game home preparation: the options file and stale-state cleanup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::io::config::{CharacterConfig, GameConfig};

pub const OPTIONS_FILE: &str = ".nethackrc";

/// Options that keep the session free of pickup prompts and version alerts.
const FIXED_OPTIONS: [&str; 3] = ["!autopickup", "suppress_alert:3.4.3", "symset:DECgraphics"];

/// Render the options file for `character`.
pub fn render_options(character: &CharacterConfig) -> String {
    let mut out = String::new();
    for (key, value) in [
        ("name", &character.name),
        ("race", &character.race),
        ("role", &character.role),
        ("gender", &character.gender),
        ("align", &character.align),
    ] {
        out.push_str(&format!("OPTIONS={key}:{value}\n"));
    }
    for option in FIXED_OPTIONS {
        out.push_str(&format!("OPTIONS={option}\n"));
    }
    out
}

/// Write the options file into the game home. Returns its path.
pub fn write_options(home: &Path, character: &CharacterConfig) -> Result<PathBuf> {
    fs::create_dir_all(home).with_context(|| format!("create home {}", home.display()))?;
    let path = home.join(OPTIONS_FILE);
    fs::write(&path, render_options(character))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Remove save, level/lock, and bones files left by earlier runs.
///
/// Level scripts (`*.lua`) share the install directory and are kept.
/// Returns the removed paths.
pub fn clean_stale_state(install_dir: &Path, character_name: &str) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    let save_dir = install_dir.join("save");
    if save_dir.is_dir() {
        for path in list_files(&save_dir)? {
            remove(&path, &mut removed)?;
        }
    }

    if install_dir.is_dir() {
        let lowered = character_name.to_lowercase();
        for path in list_files(install_dir)? {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let player_file = (name.contains(&lowered) || name.contains(character_name))
                && !name.ends_with(".lua");
            if player_file || name.starts_with("bon") {
                remove(&path, &mut removed)?;
            }
        }
    }
    Ok(removed)
}

/// Options file plus cleanup, before every launch.
#[instrument(skip_all, fields(home = %game.home_dir.display()))]
pub fn prepare_home(game: &GameConfig, character: &CharacterConfig) -> Result<()> {
    let options = write_options(&game.home_dir, character)?;
    debug!(path = %options.display(), "options written");
    let removed = clean_stale_state(&game.install_dir, &character.name)?;
    if !removed.is_empty() {
        info!(count = removed.len(), "removed stale game state");
    }
    Ok(())
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn remove(path: &Path, removed: &mut Vec<PathBuf>) -> Result<()> {
    fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    debug!(path = %path.display(), "removed");
    removed.push(path.to_path_buf());
    Ok(())
}
