use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "all" | "loop" => Some(Self::All),
            "one" | "single" => Some(Self::One),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
}

impl Track {
    /// Text shown in the track list and matched by search.
    pub fn label(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} - {}", self.title, artist),
            None => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub songs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    #[serde(default)]
    pub music_folder: Option<PathBuf>,
    #[serde(default)]
    pub shuffled: bool,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default = "default_seek_step_seconds")]
    pub seek_step_seconds: u16,
}

fn default_volume() -> u8 {
    crate::audio::DEFAULT_VOLUME
}

fn default_seek_step_seconds() -> u16 {
    5
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            music_folder: None,
            shuffled: false,
            repeat_mode: RepeatMode::Off,
            volume: default_volume(),
            seek_step_seconds: default_seek_step_seconds(),
        }
    }
}
