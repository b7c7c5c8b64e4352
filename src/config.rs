use crate::model::PersistedState;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "superspoty";
const STATE_FILE: &str = "state.json";
const PLAYLISTS_DIR: &str = "playlists";
const LOG_FILE: &str = "superspoty.log";

pub const CONFIG_DIR_ENV: &str = "SUPERSPOTY_CONFIG_DIR";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    Ok(home_dir()?.join(".config").join(APP_DIR))
}

pub fn home_dir() -> Result<PathBuf> {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .context("neither HOME nor USERPROFILE is set")
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn playlists_dir(root: &Path) -> PathBuf {
    root.join(PLAYLISTS_DIR)
}

pub fn log_path(root: &Path) -> PathBuf {
    root.join(LOG_FILE)
}

pub fn ensure_config_dir(root: &Path) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("failed to create {}", root.display()))
}

pub fn load_state(root: &Path) -> Result<PersistedState> {
    let path = state_path(root);
    if !path.exists() {
        return Ok(PersistedState::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let state: PersistedState = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;
    Ok(state)
}

pub fn save_state(root: &Path, state: &PersistedState) -> Result<()> {
    ensure_config_dir(root)?;
    let path = state_path(root);
    let json = serde_json::to_string_pretty(state)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn normalize_path(path: &Path) -> PathBuf {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    strip_windows_verbatim_prefix(&canonical)
}

pub fn strip_windows_verbatim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();

    if let Some(trimmed) = raw.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{trimmed}"));
    }

    if let Some(trimmed) = raw.strip_prefix(r"\\?\") {
        return PathBuf::from(trimmed);
    }

    path.to_path_buf()
}
