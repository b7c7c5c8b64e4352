use crate::config;
use crate::library::{self, BrowserEntry, BrowserEntryKind, TagReader};
use crate::model::{PersistedState, Playlist, RepeatMode, Track};
use crate::playlists::PlaylistStore;
use crate::search;
use crate::sequencer::{PlaybackAction, PlaybackSequencer, SequencerEvent};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Browser,
    Tracks,
    Playlists,
}

impl Pane {
    pub fn next(self) -> Self {
        match self {
            Self::Browser => Self::Tracks,
            Self::Tracks => Self::Playlists,
            Self::Playlists => Self::Browser,
        }
    }
}

pub struct PlayerCore {
    pub config_root: PathBuf,
    pub music_folder: Option<PathBuf>,
    pub browser_dir: PathBuf,
    pub browser_entries: Vec<BrowserEntry>,
    pub selected_browser: usize,
    pub tracks: Vec<Track>,
    pub sequencer: PlaybackSequencer,
    pub search_query: String,
    pub filtered: Vec<usize>,
    pub selected_track: usize,
    pub playlists: Vec<Playlist>,
    pub selected_playlist: usize,
    pub focus: Pane,
    pub volume: u8,
    pub seek_step_seconds: u16,
    pub dirty: bool,
    pub status: String,
    /// Track handed to the engine by the last successful `play`.
    pub now_playing: Option<Track>,
    store: PlaylistStore,
    tag_reader: Box<dyn TagReader>,
}

impl PlayerCore {
    pub fn from_persisted(
        config_root: PathBuf,
        state: PersistedState,
        tag_reader: Box<dyn TagReader>,
    ) -> Self {
        Self::with_sequencer(config_root, state, tag_reader, PlaybackSequencer::new())
    }

    pub fn with_sequencer(
        config_root: PathBuf,
        state: PersistedState,
        tag_reader: Box<dyn TagReader>,
        mut sequencer: PlaybackSequencer,
    ) -> Self {
        sequencer.set_shuffled(state.shuffled);
        sequencer.set_repeat_mode(state.repeat_mode);

        let store = PlaylistStore::new(config::playlists_dir(&config_root));
        let playlists = store.load_all();
        let browser_dir = state
            .music_folder
            .clone()
            .filter(|folder| folder.is_dir())
            .or_else(|| config::home_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let mut core = Self {
            config_root,
            music_folder: state.music_folder,
            browser_dir,
            browser_entries: Vec::new(),
            selected_browser: 0,
            tracks: Vec::new(),
            sequencer,
            search_query: String::new(),
            filtered: Vec::new(),
            selected_track: 0,
            playlists,
            selected_playlist: 0,
            focus: Pane::Browser,
            volume: state.volume.min(crate::audio::MAX_VOLUME),
            seek_step_seconds: state.seek_step_seconds.max(1),
            dirty: true,
            status: String::from("Ready"),
            now_playing: None,
            store,
            tag_reader,
        };
        core.refresh_browser_entries();
        core
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            music_folder: self.music_folder.clone(),
            shuffled: self.sequencer.is_shuffled(),
            repeat_mode: self.sequencer.repeat_mode(),
            volume: self.volume,
            seek_step_seconds: self.seek_step_seconds,
        }
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        config::save_state(&self.config_root, &self.persisted_state())?;
        self.set_status("Settings saved");
        Ok(())
    }

    /// Replaces the track list with every audio file below `folder`.
    pub fn open_folder(&mut self, folder: &Path) {
        let folder = config::normalize_path(folder);
        if !folder.is_dir() {
            self.set_status(&format!("Not a folder: {}", folder.display()));
            return;
        }

        let found = library::scan_folder(&folder);
        let count = found.len();
        self.replace_tracks(found);
        self.music_folder = Some(folder.clone());
        log::info!("opened {} with {count} tracks", folder.display());
        self.set_status(&format!("Loaded {count} tracks from {}", folder.display()));
    }

    /// Appends a folder (recursively) or a single audio file.
    pub fn append_path(&mut self, path: &Path) {
        let path = config::normalize_path(path);
        let found = if path.is_dir() {
            library::scan_folder(&path)
        } else if path.is_file() && library::is_audio(&path) {
            vec![path.clone()]
        } else {
            self.set_status(&format!("Nothing to add at {}", path.display()));
            return;
        };

        let count = found.len();
        self.tracks
            .extend(library::load_tracks(&found, self.tag_reader.as_ref()));
        self.sequencer.append_tracks(found);
        self.refresh_filter();
        self.set_status(&format!("Added {count} tracks"));
    }

    pub fn replace_tracks(&mut self, paths: Vec<PathBuf>) {
        self.tracks = library::load_tracks(&paths, self.tag_reader.as_ref());
        self.sequencer.replace_tracks(paths);
        self.selected_track = 0;
        self.refresh_filter();
    }

    pub fn load_playlist(&mut self, name: &str) {
        let Some(songs) = self
            .playlists
            .iter()
            .find(|playlist| playlist.name == name)
            .map(|playlist| playlist.songs.clone())
        else {
            self.set_status("Playlist not found");
            return;
        };

        self.replace_tracks(songs);
        self.set_status(&format!("Loaded playlist: {name}"));
    }

    pub fn save_playlist(&mut self, name: &str) {
        let playlist = Playlist {
            name: name.trim().to_string(),
            songs: self.sequencer.tracks().to_vec(),
        };

        match self.store.save(&playlist) {
            Ok(_) => {
                self.playlists.retain(|existing| existing.name != playlist.name);
                self.playlists.push(playlist.clone());
                self.playlists
                    .sort_by_cached_key(|existing| existing.name.to_lowercase());
                self.set_status(&format!("Saved playlist: {}", playlist.name));
            }
            Err(err) => {
                log::warn!("saving playlist failed: {err}");
                self.set_status(&format!("save error: {err}"));
            }
        }
    }

    pub fn set_search(&mut self, query: &str) {
        self.search_query = query.to_string();
        self.refresh_filter();
    }

    fn refresh_filter(&mut self) {
        let labels: Vec<String> = self.tracks.iter().map(Track::label).collect();
        self.filtered = search::filter_indices(&labels, &self.search_query);
        self.selected_track = clamp_selection(self.selected_track, self.filtered.len());
        self.dirty = true;
    }

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next();
        self.dirty = true;
    }

    pub fn select_next(&mut self) {
        let (selected, len) = match self.focus {
            Pane::Browser => (&mut self.selected_browser, self.browser_entries.len()),
            Pane::Tracks => (&mut self.selected_track, self.filtered.len()),
            Pane::Playlists => (&mut self.selected_playlist, self.playlists.len()),
        };
        if len > 0 {
            *selected = (*selected + 1).min(len - 1);
        }
        self.dirty = true;
    }

    pub fn select_prev(&mut self) {
        let selected = match self.focus {
            Pane::Browser => &mut self.selected_browser,
            Pane::Tracks => &mut self.selected_track,
            Pane::Playlists => &mut self.selected_playlist,
        };
        *selected = selected.saturating_sub(1);
        self.dirty = true;
    }

    /// Enter on the focused pane.
    pub fn activate_selected(&mut self) -> PlaybackAction {
        match self.focus {
            Pane::Browser => self.activate_browser_entry(),
            Pane::Tracks => match self.filtered.get(self.selected_track).copied() {
                Some(index) => self.dispatch(SequencerEvent::Select(index)),
                None => {
                    self.set_status("No track selected");
                    PlaybackAction::None
                }
            },
            Pane::Playlists => {
                if let Some(name) = self
                    .playlists
                    .get(self.selected_playlist)
                    .map(|playlist| playlist.name.clone())
                {
                    self.load_playlist(&name);
                } else {
                    self.set_status("No saved playlists");
                }
                PlaybackAction::None
            }
        }
    }

    fn activate_browser_entry(&mut self) -> PlaybackAction {
        let Some(entry) = self.browser_entries.get(self.selected_browser).cloned() else {
            self.set_status("Nothing selected");
            return PlaybackAction::None;
        };

        match entry.kind {
            BrowserEntryKind::Parent | BrowserEntryKind::Folder => {
                self.browser_dir = entry.path;
                self.selected_browser = 0;
                self.refresh_browser_entries();
                PlaybackAction::None
            }
            BrowserEntryKind::Track => {
                let folder = entry
                    .path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.browser_dir.clone());
                let siblings = library::scan_directory_shallow(&folder);
                let index = siblings.iter().position(|path| path == &entry.path);
                self.replace_tracks(siblings);
                self.music_folder = Some(folder);
                match index {
                    Some(index) => self.dispatch(SequencerEvent::Select(index)),
                    None => PlaybackAction::None,
                }
            }
        }
    }

    /// Loads the highlighted browser folder (or the current one) as the list.
    pub fn open_selected_folder(&mut self) {
        let folder = self.highlighted_folder();
        self.open_folder(&folder);
    }

    pub fn append_selected(&mut self) {
        let target = match self.browser_entries.get(self.selected_browser) {
            Some(entry) if entry.kind != BrowserEntryKind::Parent => entry.path.clone(),
            _ => self.browser_dir.clone(),
        };
        self.append_path(&target);
    }

    fn highlighted_folder(&self) -> PathBuf {
        self.browser_entries
            .get(self.selected_browser)
            .filter(|entry| entry.kind == BrowserEntryKind::Folder)
            .map(|entry| entry.path.clone())
            .unwrap_or_else(|| self.browser_dir.clone())
    }

    pub fn navigate_up(&mut self) {
        let Some(parent) = self.browser_dir.parent().map(Path::to_path_buf) else {
            return;
        };
        self.browser_dir = parent;
        self.selected_browser = 0;
        self.refresh_browser_entries();
    }

    pub fn refresh_browser_entries(&mut self) {
        self.browser_entries = library::list_directory(&self.browser_dir);
        self.selected_browser = clamp_selection(self.selected_browser, self.browser_entries.len());
        self.dirty = true;
    }

    pub fn dispatch(&mut self, event: SequencerEvent) -> PlaybackAction {
        match self.sequencer.dispatch(event) {
            Ok(action) => {
                self.describe(event, action);
                action
            }
            Err(err) => {
                self.set_status(&err.to_string());
                PlaybackAction::None
            }
        }
    }

    fn describe(&mut self, event: SequencerEvent, action: PlaybackAction) {
        match (event, action) {
            (SequencerEvent::SetShuffled(on), _) => {
                self.set_status(if on { "Shuffle on" } else { "Shuffle off" })
            }
            (SequencerEvent::CycleRepeat, _) => {
                let mode = self.sequencer.repeat_mode();
                self.set_status(&format!("Repeat {}", mode.label()));
            }
            (SequencerEvent::TrackEnded, PlaybackAction::Stop) => {
                self.set_status("Reached end of list")
            }
            (_, PlaybackAction::None) if self.sequencer.is_empty() => {
                self.set_status("Track list is empty")
            }
            _ => self.dirty = true,
        }
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.sequencer.set_repeat_mode(mode);
        self.set_status(&format!("Repeat {}", mode.label()));
    }

    pub fn track_for_path(&self, path: &Path) -> Option<&Track> {
        self.tracks.iter().find(|track| track.path == path)
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.sequencer.current_index()?)
    }

    /// Records `path` as the track now in the engine. Tags are read here at
    /// most once, only when the path has left the track list.
    pub fn begin_playing(&mut self, path: &Path) {
        let track = match self.track_for_path(path) {
            Some(track) => track.clone(),
            None => {
                let tags = self.tag_reader.read_tags(path);
                Track {
                    path: path.to_path_buf(),
                    title: tags.title,
                    artist: tags.artist,
                }
            }
        };
        self.set_status(&format!("Playing {}", track.title));
        self.now_playing = Some(track);
    }

    /// Track to show as playing, given what the engine has loaded. Never
    /// touches the filesystem.
    pub fn now_playing_for(&self, engine_track: Option<&Path>) -> Option<&Track> {
        match engine_track {
            Some(path) => self
                .now_playing
                .as_ref()
                .filter(|track| track.path == path)
                .or_else(|| self.track_for_path(path)),
            None => self.current_track(),
        }
    }

    pub fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

fn clamp_selection(selected: usize, len: usize) -> usize {
    if len == 0 { 0 } else { selected.min(len - 1) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::FileNameTagReader;
    use std::cell::Cell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::{TempDir, tempdir};

    fn core_in(dir: &TempDir) -> PlayerCore {
        let state = PersistedState {
            music_folder: Some(dir.path().to_path_buf()),
            ..PersistedState::default()
        };
        PlayerCore::with_sequencer(
            dir.path().join("config"),
            state,
            Box::new(FileNameTagReader),
            PlaybackSequencer::with_seed(11),
        )
    }

    fn music_dir() -> TempDir {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("album")).expect("mkdir");
        for name in ["a.mp3", "b.mp3", "c.wav"] {
            fs::write(dir.path().join("album").join(name), b"").expect("write");
        }
        fs::write(dir.path().join("loose.ogg"), b"").expect("write");
        dir
    }

    #[test]
    fn browser_starts_in_music_folder() {
        let dir = music_dir();
        let core = core_in(&dir);
        assert!(
            core.browser_entries
                .iter()
                .any(|entry| entry.kind == BrowserEntryKind::Folder && entry.label == "[DIR] album")
        );
    }

    #[test]
    fn opening_folder_replaces_list_and_resets_index() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        core.open_folder(&dir.path().join("album"));
        core.dispatch(SequencerEvent::Select(1));

        core.open_folder(dir.path());
        assert_eq!(core.sequencer.len(), 4);
        assert_eq!(core.tracks.len(), 4);
        assert_eq!(core.sequencer.current_index(), None);
    }

    #[test]
    fn activating_browser_track_loads_its_folder_and_plays_it() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        core.browser_dir = dir.path().join("album");
        core.refresh_browser_entries();
        core.selected_browser = core
            .browser_entries
            .iter()
            .position(|entry| entry.label == "b.mp3")
            .expect("b.mp3 listed");

        let action = core.activate_selected();
        assert_eq!(action, PlaybackAction::Play(1));
        assert_eq!(core.sequencer.len(), 3);
    }

    #[test]
    fn search_filters_track_pane_and_enter_uses_list_index() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        core.open_folder(&dir.path().join("album"));
        core.set_search("C.W");
        assert_eq!(core.filtered, vec![2]);

        core.focus = Pane::Tracks;
        assert_eq!(core.activate_selected(), PlaybackAction::Play(2));
    }

    #[test]
    fn saved_playlist_shows_up_and_loads() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        core.open_folder(&dir.path().join("album"));
        core.save_playlist("  road trip ");
        assert_eq!(core.playlists.len(), 1);
        assert_eq!(core.playlists[0].name, "road trip");

        core.replace_tracks(Vec::new());
        core.focus = Pane::Playlists;
        core.activate_selected();
        assert_eq!(core.sequencer.len(), 3);

        let reloaded = core_in(&dir);
        assert_eq!(reloaded.playlists, core.playlists);
    }

    #[test]
    fn blank_playlist_name_reports_error() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        core.save_playlist(" ");
        assert!(core.status.starts_with("save error"));
        assert!(core.playlists.is_empty());
    }

    #[test]
    fn append_keeps_current_track() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        core.open_folder(&dir.path().join("album"));
        core.dispatch(SequencerEvent::Select(2));
        core.append_path(&dir.path().join("loose.ogg"));

        assert_eq!(core.sequencer.current_index(), Some(2));
        assert_eq!(core.tracks.len(), 4);
        assert_eq!(core.filtered.len(), 4);
    }

    #[test]
    fn out_of_range_selection_is_reported() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        assert_eq!(core.dispatch(SequencerEvent::Select(5)), PlaybackAction::None);
        assert!(core.status.contains("out of range"));
    }

    #[test]
    fn colliding_playlist_names_both_survive_a_restart() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        core.open_folder(&dir.path().join("album"));
        core.save_playlist("a/b");
        core.replace_tracks(vec![dir.path().join("loose.ogg")]);
        core.save_playlist("a_b");

        let reloaded = core_in(&dir);
        let names: Vec<&str> = reloaded.playlists.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a/b", "a_b"]);
        assert_eq!(reloaded.playlists[0].songs.len(), 3);
    }

    struct CountingTagReader(Rc<Cell<usize>>);

    impl TagReader for CountingTagReader {
        fn read_tags(&self, path: &Path) -> library::TrackTags {
            self.0.set(self.0.get() + 1);
            FileNameTagReader.read_tags(path)
        }
    }

    #[test]
    fn now_playing_survives_list_replacement_without_rereading_tags() {
        let dir = music_dir();
        let reads = Rc::new(Cell::new(0));
        let mut core = PlayerCore::with_sequencer(
            dir.path().join("config"),
            PersistedState::default(),
            Box::new(CountingTagReader(Rc::clone(&reads))),
            PlaybackSequencer::with_seed(11),
        );
        core.open_folder(&dir.path().join("album"));
        let playing = core.sequencer.tracks()[1].clone();
        core.begin_playing(&playing);
        let reads_after_play = reads.get();

        core.replace_tracks(vec![dir.path().join("loose.ogg")]);
        let reads_after_replace = reads.get();
        for _ in 0..10 {
            let track = core.now_playing_for(Some(playing.as_path())).expect("still playing");
            assert_eq!(track.title, "b.mp3");
        }
        assert_eq!(reads.get(), reads_after_replace);
        assert!(reads_after_replace > reads_after_play);
    }

    #[test]
    fn track_started_outside_the_list_reads_tags_once() {
        let dir = music_dir();
        let reads = Rc::new(Cell::new(0));
        let mut core = PlayerCore::with_sequencer(
            dir.path().join("config"),
            PersistedState::default(),
            Box::new(CountingTagReader(Rc::clone(&reads))),
            PlaybackSequencer::with_seed(11),
        );
        let outside = dir.path().join("loose.ogg");
        core.begin_playing(&outside);
        assert_eq!(reads.get(), 1);
        assert_eq!(core.status, "Playing loose.ogg");

        for _ in 0..5 {
            let _ = core.now_playing_for(Some(outside.as_path()));
        }
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn idle_engine_shows_the_sequencer_selection() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        core.open_folder(&dir.path().join("album"));
        assert!(core.now_playing_for(None).is_none());

        core.dispatch(SequencerEvent::Select(2));
        assert_eq!(
            core.now_playing_for(None).map(|track| track.title.as_str()),
            Some("c.wav")
        );
    }

    #[test]
    fn persisted_state_reflects_modes() {
        let dir = music_dir();
        let mut core = core_in(&dir);
        core.dispatch(SequencerEvent::SetShuffled(true));
        core.dispatch(SequencerEvent::CycleRepeat);
        core.save().expect("save");

        let loaded = config::load_state(&core.config_root).expect("load");
        assert!(loaded.shuffled);
        assert_eq!(loaded.repeat_mode, RepeatMode::All);
    }
}
