//! Playback sequencing over a flat track list.
//!
//! The transition logic lives in [`step`], a pure function from a [`Cursor`],
//! the list length and a [`SequencerEvent`] to the next cursor plus a
//! [`PlaybackAction`] describing what the playback engine should do.
//! [`PlaybackSequencer`] owns the track list and the random source and is
//! what the rest of the application talks to.

use crate::model::RepeatMode;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    #[error("track {index} is out of range for a list of {len} tracks")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEvent {
    Select(usize),
    Next,
    Previous,
    TrackEnded,
    TogglePlay,
    Stop,
    SetShuffled(bool),
    CycleRepeat,
}

/// What the engine has to do after an event has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Play(usize),
    Restart(usize),
    Pause,
    Resume,
    Stop,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub current: Option<usize>,
    pub playing: bool,
    pub shuffled: bool,
    pub repeat: RepeatMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub play_symbol: &'static str,
    pub shuffle_label: &'static str,
    pub repeat_label: &'static str,
    pub position: String,
}

/// Applies `event` to `cursor` for a list of `len` tracks.
///
/// `pick` is asked for a random index whenever a shuffled advance happens;
/// its result is reduced modulo `len`. Navigation on an empty list returns
/// the cursor unchanged with [`PlaybackAction::None`].
pub fn step(
    cursor: Cursor,
    len: usize,
    event: SequencerEvent,
    pick: &mut dyn FnMut(usize) -> usize,
) -> Result<(Cursor, PlaybackAction), SequencerError> {
    let cursor = Cursor {
        current: cursor.current.filter(|idx| *idx < len),
        ..cursor
    };

    let outcome = match event {
        SequencerEvent::Select(index) => {
            if index >= len {
                return Err(SequencerError::IndexOutOfRange { index, len });
            }
            play_at(cursor, index)
        }
        SequencerEvent::Next => advance(cursor, len, pick),
        SequencerEvent::Previous => retreat(cursor, len),
        SequencerEvent::TrackEnded => track_ended(cursor, len, pick),
        SequencerEvent::TogglePlay => toggle_play(cursor, len),
        SequencerEvent::Stop => (
            Cursor {
                playing: false,
                ..cursor
            },
            PlaybackAction::Stop,
        ),
        SequencerEvent::SetShuffled(shuffled) => {
            (Cursor { shuffled, ..cursor }, PlaybackAction::None)
        }
        SequencerEvent::CycleRepeat => (
            Cursor {
                repeat: cursor.repeat.next(),
                ..cursor
            },
            PlaybackAction::None,
        ),
    };
    Ok(outcome)
}

fn play_at(cursor: Cursor, index: usize) -> (Cursor, PlaybackAction) {
    (
        Cursor {
            current: Some(index),
            playing: true,
            ..cursor
        },
        PlaybackAction::Play(index),
    )
}

fn advance(
    cursor: Cursor,
    len: usize,
    pick: &mut dyn FnMut(usize) -> usize,
) -> (Cursor, PlaybackAction) {
    if len == 0 {
        return (cursor, PlaybackAction::None);
    }

    let next = if cursor.shuffled {
        pick(len) % len
    } else {
        cursor.current.map_or(0, |current| (current + 1) % len)
    };
    play_at(cursor, next)
}

fn retreat(cursor: Cursor, len: usize) -> (Cursor, PlaybackAction) {
    if len == 0 {
        return (cursor, PlaybackAction::None);
    }

    let previous = match cursor.current {
        Some(0) | None => len - 1,
        Some(current) => current - 1,
    };
    play_at(cursor, previous)
}

fn track_ended(
    cursor: Cursor,
    len: usize,
    pick: &mut dyn FnMut(usize) -> usize,
) -> (Cursor, PlaybackAction) {
    if len == 0 {
        return (cursor, PlaybackAction::None);
    }

    let Some(current) = cursor.current else {
        // the finished track is no longer part of the list
        return (
            Cursor {
                playing: false,
                ..cursor
            },
            PlaybackAction::Stop,
        );
    };

    match cursor.repeat {
        RepeatMode::One => (
            Cursor {
                playing: true,
                ..cursor
            },
            PlaybackAction::Restart(current),
        ),
        RepeatMode::All => advance(cursor, len, pick),
        RepeatMode::Off if current + 1 >= len => (
            Cursor {
                playing: false,
                ..cursor
            },
            PlaybackAction::Stop,
        ),
        RepeatMode::Off => advance(cursor, len, pick),
    }
}

fn toggle_play(cursor: Cursor, len: usize) -> (Cursor, PlaybackAction) {
    if cursor.playing {
        return (
            Cursor {
                playing: false,
                ..cursor
            },
            PlaybackAction::Pause,
        );
    }

    match cursor.current {
        Some(_) => (
            Cursor {
                playing: true,
                ..cursor
            },
            PlaybackAction::Resume,
        ),
        None if len > 0 => play_at(cursor, 0),
        None => (cursor, PlaybackAction::None),
    }
}

#[derive(Debug)]
pub struct PlaybackSequencer {
    tracks: Vec<PathBuf>,
    cursor: Cursor,
    rng: SmallRng,
}

impl Default for PlaybackSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSequencer {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    /// Deterministic shuffle order, for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            tracks: Vec::new(),
            cursor: Cursor::default(),
            rng,
        }
    }

    pub fn dispatch(&mut self, event: SequencerEvent) -> Result<PlaybackAction, SequencerError> {
        let rng = &mut self.rng;
        let (cursor, action) = step(self.cursor, self.tracks.len(), event, &mut |len: usize| {
            rng.random_range(0..len)
        })?;
        if cursor != self.cursor {
            log::debug!("sequencer {event:?}: {:?} -> {cursor:?}", self.cursor);
        }
        self.cursor = cursor;
        Ok(action)
    }

    pub fn select_index(&mut self, index: usize) -> Result<PlaybackAction, SequencerError> {
        self.dispatch(SequencerEvent::Select(index))
    }

    pub fn advance(&mut self) -> PlaybackAction {
        self.dispatch_infallible(SequencerEvent::Next)
    }

    pub fn retreat(&mut self) -> PlaybackAction {
        self.dispatch_infallible(SequencerEvent::Previous)
    }

    pub fn on_track_ended(&mut self) -> PlaybackAction {
        self.dispatch_infallible(SequencerEvent::TrackEnded)
    }

    pub fn toggle_play(&mut self) -> PlaybackAction {
        self.dispatch_infallible(SequencerEvent::TogglePlay)
    }

    pub fn stop(&mut self) -> PlaybackAction {
        self.dispatch_infallible(SequencerEvent::Stop)
    }

    pub fn set_shuffled(&mut self, shuffled: bool) {
        self.dispatch_infallible(SequencerEvent::SetShuffled(shuffled));
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.dispatch_infallible(SequencerEvent::CycleRepeat);
        self.cursor.repeat
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.cursor.repeat = mode;
    }

    fn dispatch_infallible(&mut self, event: SequencerEvent) -> PlaybackAction {
        self.dispatch(event).unwrap_or(PlaybackAction::None)
    }

    /// Replaces the list and forgets the current index. The engine is not
    /// touched; a track that is already playing keeps playing.
    pub fn replace_tracks(&mut self, tracks: Vec<PathBuf>) {
        self.tracks = tracks;
        self.cursor.current = None;
    }

    pub fn append_tracks(&mut self, tracks: impl IntoIterator<Item = PathBuf>) {
        self.tracks.extend(tracks);
    }

    pub fn tracks(&self) -> &[PathBuf] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn current_index(&self) -> Option<usize> {
        self.cursor.current
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.tracks.get(self.cursor.current?).map(PathBuf::as_path)
    }

    pub fn is_playing(&self) -> bool {
        self.cursor.playing
    }

    pub fn is_shuffled(&self) -> bool {
        self.cursor.shuffled
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.cursor.repeat
    }

    /// Path the engine should load for `action`, if any.
    pub fn path_for(&self, action: PlaybackAction) -> Option<&Path> {
        match action {
            PlaybackAction::Play(idx) | PlaybackAction::Restart(idx) => {
                self.tracks.get(idx).map(PathBuf::as_path)
            }
            _ => None,
        }
    }

    pub fn display(&self) -> DisplayState {
        display_state(self.cursor, self.tracks.len())
    }
}

pub fn display_state(cursor: Cursor, len: usize) -> DisplayState {
    DisplayState {
        play_symbol: if cursor.playing { "||" } else { ">" },
        shuffle_label: if cursor.shuffled {
            "shuffle on"
        } else {
            "shuffle off"
        },
        repeat_label: match cursor.repeat {
            RepeatMode::Off => "repeat off",
            RepeatMode::All => "repeat all",
            RepeatMode::One => "repeat one",
        },
        position: match cursor.current {
            Some(idx) => format!("{}/{len}", idx + 1),
            None => format!("-/{len}"),
        },
    }
}
