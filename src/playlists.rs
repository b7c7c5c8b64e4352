//! Named playlists, one JSON file per playlist.

use crate::model::Playlist;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("playlist name cannot be empty")]
    EmptyName,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode playlist {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PlaylistStore {
    dir: PathBuf,
}

impl PlaylistStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reads every `*.json` record in the directory. Files that cannot be read
    /// or parsed are skipped.
    pub fn load_all(&self) -> Vec<Playlist> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                log::warn!("cannot read playlist dir {}: {err}", self.dir.display());
                return Vec::new();
            }
        };

        let mut playlists: Vec<Playlist> = read_dir
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            })
            .filter_map(|path| match load_playlist_file(&path) {
                Ok(playlist) => Some(playlist),
                Err(err) => {
                    log::warn!("skipping playlist {}: {err:#}", path.display());
                    None
                }
            })
            .collect();

        playlists.sort_by_cached_key(|playlist| playlist.name.to_lowercase());
        log::info!(
            "loaded {} playlists from {}",
            playlists.len(),
            self.dir.display()
        );
        playlists
    }

    /// Writes `playlist`, replacing any earlier record with the same name.
    pub fn save(&self, playlist: &Playlist) -> Result<PathBuf, PlaylistError> {
        let name = playlist.name.trim();
        if name.is_empty() {
            return Err(PlaylistError::EmptyName);
        }

        fs::create_dir_all(&self.dir).map_err(|source| PlaylistError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let record = Playlist {
            name: name.to_string(),
            songs: playlist.songs.clone(),
        };
        let json = serde_json::to_string_pretty(&record).map_err(|source| {
            PlaylistError::Encode {
                name: record.name.clone(),
                source,
            }
        })?;

        let path = self.slot_for(name);
        fs::write(&path, json).map_err(|source| PlaylistError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("saved playlist {name} ({} songs)", record.songs.len());
        Ok(path)
    }

    /// File that holds (or will hold) the record called `name`. Distinct
    /// names can sanitise to the same stem, or differ only in case on a
    /// case-insensitive filesystem, so a file already owned by another
    /// record is skipped and a numbered sibling is tried next.
    fn slot_for(&self, name: &str) -> PathBuf {
        let stem = file_stem_for(name);
        (1_u32..)
            .map(|n| match n {
                1 => self.dir.join(format!("{stem}.json")),
                n => self.dir.join(format!("{stem}-{n}.json")),
            })
            .find(|path| match load_playlist_file(path) {
                Ok(existing) => existing.name == name,
                Err(_) => !path.exists(),
            })
            .unwrap_or_else(|| self.dir.join(format!("{stem}.json")))
    }
}

fn load_playlist_file(path: &Path) -> anyhow::Result<Playlist> {
    use anyhow::Context;

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let playlist: Playlist = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(playlist)
}

fn file_stem_for(name: &str) -> String {
    name.trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect()
}
