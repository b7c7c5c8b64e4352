use crate::model::Track;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: Option<String>,
}

/// Source of display metadata for a track. Implementations never fail; a file
/// without readable tags is shown under its file name.
pub trait TagReader {
    fn read_tags(&self, path: &Path) -> TrackTags;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> TrackTags {
        let fallback = fallback_title(path);
        let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
            Ok(file) => file,
            Err(err) => {
                log::debug!("no tags for {}: {err}", path.display());
                return TrackTags {
                    title: fallback,
                    artist: None,
                };
            }
        };

        let Some(tag) = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
        else {
            return TrackTags {
                title: fallback,
                artist: None,
            };
        };

        TrackTags {
            title: tag
                .title()
                .and_then(|value| clean_tag_value(&value))
                .unwrap_or(fallback),
            artist: tag.artist().and_then(|value| clean_tag_value(&value)),
        }
    }
}

/// Tag reader that only looks at file names.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileNameTagReader;

impl TagReader for FileNameTagReader {
    fn read_tags(&self, path: &Path) -> TrackTags {
        TrackTags {
            title: fallback_title(path),
            artist: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserEntryKind {
    Parent,
    Folder,
    Track,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserEntry {
    pub kind: BrowserEntryKind,
    pub path: PathBuf,
    pub label: String,
}

/// Every audio file below `root`, in sorted traversal order.
pub fn scan_folder(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_audio(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Audio files directly inside `dir`, sorted by name.
pub fn scan_directory_shallow(dir: &Path) -> Vec<PathBuf> {
    list_directory(dir)
        .into_iter()
        .filter(|entry| entry.kind == BrowserEntryKind::Track)
        .map(|entry| entry.path)
        .collect()
}

/// One level of `dir` for the file browser: a parent entry, then folders,
/// then audio files. Hidden entries are skipped.
pub fn list_directory(dir: &Path) -> Vec<BrowserEntry> {
    let mut entries = Vec::new();

    if let Some(parent) = dir.parent() {
        entries.push(BrowserEntry {
            kind: BrowserEntryKind::Parent,
            path: parent.to_path_buf(),
            label: String::from("[..]"),
        });
    }

    let Ok(read_dir) = fs::read_dir(dir) else {
        log::warn!("cannot list {}", dir.display());
        return entries;
    };

    let mut folders = Vec::new();
    let mut files = Vec::new();
    for entry in read_dir.filter_map(Result::ok) {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            folders.push(BrowserEntry {
                kind: BrowserEntryKind::Folder,
                path,
                label: format!("[DIR] {file_name}"),
            });
        } else if is_audio(&path) {
            files.push(BrowserEntry {
                kind: BrowserEntryKind::Track,
                path,
                label: file_name,
            });
        }
    }

    folders.sort_by_cached_key(|entry| entry.label.to_ascii_lowercase());
    files.sort_by_cached_key(|entry| entry.label.to_ascii_lowercase());
    entries.extend(folders);
    entries.extend(files);
    entries
}

pub fn load_tracks(paths: &[PathBuf], reader: &dyn TagReader) -> Vec<Track> {
    paths
        .iter()
        .map(|path| {
            let tags = reader.read_tags(path);
            Track {
                path: path.clone(),
                title: tags.title,
                artist: tags.artist,
            }
        })
        .collect()
}

pub fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

fn fallback_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn clean_tag_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
