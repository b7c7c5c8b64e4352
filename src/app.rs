use crate::audio::{AudioEngine, MAX_VOLUME, NullAudioEngine, RodioAudioEngine};
use crate::config;
use crate::core::{Pane, PlayerCore};
use crate::library::{FileNameTagReader, LoftyTagReader, TagReader};
use crate::model::RepeatMode;
use crate::sequencer::{PlaybackAction, SequencerEvent};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::Rect;
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const VOLUME_STEP: u8 = 5;

#[derive(Debug, Clone, Default)]
pub struct AppStartupOptions {
    pub config_root: PathBuf,
    pub music_dir: Option<PathBuf>,
    pub null_audio: bool,
    pub skip_tags: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    SaveName,
    Command,
}

#[derive(Debug)]
pub struct InputState {
    pub mode: InputMode,
    pub buffer: String,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            mode: InputMode::Normal,
            buffer: String::new(),
        }
    }
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<()> {
    let state = config::load_state(&options.config_root)?;
    let tag_reader: Box<dyn TagReader> = if options.skip_tags {
        Box::new(FileNameTagReader)
    } else {
        Box::new(LoftyTagReader)
    };
    let mut core = PlayerCore::from_persisted(options.config_root.clone(), state, tag_reader);
    if let Some(dir) = &options.music_dir {
        core.browser_dir = config::normalize_path(dir);
        core.refresh_browser_entries();
        core.open_folder(dir);
    }

    let mut audio: Box<dyn AudioEngine> = if options.null_audio {
        Box::new(NullAudioEngine::new())
    } else {
        match RodioAudioEngine::new() {
            Ok(engine) => Box::new(engine),
            Err(err) => {
                log::warn!("falling back to silent playback: {err:#}");
                core.set_status("No audio output available, playback is silent");
                Box::new(NullAudioEngine::new())
            }
        }
    };
    audio.set_volume(core.volume);
    log::info!("audio output: {}", audio.output_name().unwrap_or_default());

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut input = InputState::default();
    let mut last_tick = Instant::now();
    let mut pane_rects = crate::ui::PaneRects::default();

    let result: Result<()> = loop {
        maybe_auto_advance_track(&mut core, &mut *audio);

        if core.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| {
                pane_rects = crate::ui::pane_rects(frame.area());
                crate::ui::draw(frame, &core, &*audio, &input)
            })?;
            core.dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let event = event::read()?;
        if let Event::Mouse(mouse) = event {
            handle_mouse(&mut core, mouse, &pane_rects);
            continue;
        }

        let Event::Key(key) = event else {
            continue;
        };

        if key.kind != KeyEventKind::Press {
            continue;
        }

        if handle_key(&mut core, &mut *audio, &mut input, key) == KeyOutcome::Quit {
            break Ok(());
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    audio.stop();
    core.volume = audio.volume();
    let save_result = core.save();
    result?;
    save_result?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

pub fn handle_key(
    core: &mut PlayerCore,
    audio: &mut dyn AudioEngine,
    input: &mut InputState,
    key: KeyEvent,
) -> KeyOutcome {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyOutcome::Quit;
    }

    if input.mode != InputMode::Normal {
        handle_input_key(core, audio, input, key.code);
        return KeyOutcome::Continue;
    }

    match key.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Tab => core.cycle_focus(),
        KeyCode::Down => core.select_next(),
        KeyCode::Up => core.select_prev(),
        KeyCode::Enter => {
            let action = core.activate_selected();
            apply_action(core, audio, action);
        }
        KeyCode::Left | KeyCode::Backspace if core.focus == Pane::Browser => core.navigate_up(),
        KeyCode::Char('o') => core.open_selected_folder(),
        KeyCode::Char('a') => core.append_selected(),
        KeyCode::Char(' ') => dispatch(core, audio, SequencerEvent::TogglePlay),
        KeyCode::Char('n') => dispatch(core, audio, SequencerEvent::Next),
        KeyCode::Char('p') => dispatch(core, audio, SequencerEvent::Previous),
        KeyCode::Char('x') => dispatch(core, audio, SequencerEvent::Stop),
        KeyCode::Char('s') => {
            let shuffled = !core.sequencer.is_shuffled();
            dispatch(core, audio, SequencerEvent::SetShuffled(shuffled));
        }
        KeyCode::Char('r') => dispatch(core, audio, SequencerEvent::CycleRepeat),
        KeyCode::Char('[') => {
            let step = i64::from(core.seek_step_seconds);
            seek_relative(core, audio, -step);
        }
        KeyCode::Char(']') => {
            let step = i64::from(core.seek_step_seconds);
            seek_relative(core, audio, step);
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let volume = audio.volume().saturating_add(VOLUME_STEP);
            set_volume(core, audio, volume);
        }
        KeyCode::Char('-') => {
            let volume = audio.volume().saturating_sub(VOLUME_STEP);
            set_volume(core, audio, volume);
        }
        KeyCode::Char('/') => {
            input.mode = InputMode::Search;
            input.buffer = core.search_query.clone();
            core.focus = Pane::Tracks;
            core.dirty = true;
        }
        KeyCode::Char('w') => {
            input.mode = InputMode::SaveName;
            input.buffer.clear();
            core.dirty = true;
        }
        KeyCode::Char(':') => {
            input.mode = InputMode::Command;
            input.buffer.clear();
            core.dirty = true;
        }
        _ => {}
    }
    KeyOutcome::Continue
}

fn handle_input_key(
    core: &mut PlayerCore,
    audio: &mut dyn AudioEngine,
    input: &mut InputState,
    code: KeyCode,
) {
    match code {
        KeyCode::Esc => {
            if input.mode == InputMode::Search {
                core.set_search("");
            }
            input.mode = InputMode::Normal;
            input.buffer.clear();
        }
        KeyCode::Enter => {
            let value = std::mem::take(&mut input.buffer);
            match input.mode {
                InputMode::Search => {}
                InputMode::SaveName => core.save_playlist(&value),
                InputMode::Command => run_command(core, audio, &value),
                InputMode::Normal => {}
            }
            input.mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            input.buffer.pop();
            if input.mode == InputMode::Search {
                core.set_search(&input.buffer);
            }
        }
        KeyCode::Char(ch) => {
            input.buffer.push(ch);
            if input.mode == InputMode::Search {
                core.set_search(&input.buffer);
            }
        }
        _ => {}
    }
    core.dirty = true;
}

pub fn dispatch(core: &mut PlayerCore, audio: &mut dyn AudioEngine, event: SequencerEvent) {
    let action = core.dispatch(event);
    apply_action(core, audio, action);
}

/// Carries out what the sequencer decided.
pub fn apply_action(core: &mut PlayerCore, audio: &mut dyn AudioEngine, action: PlaybackAction) {
    match action {
        PlaybackAction::Play(_) | PlaybackAction::Restart(_) => {
            let Some(path) = core.sequencer.path_for(action).map(PathBuf::from) else {
                return;
            };
            play_path(core, audio, path);
        }
        PlaybackAction::Pause => {
            audio.pause();
            core.set_status("Paused");
        }
        PlaybackAction::Resume => {
            let engine_matches = audio.current_track().is_some()
                && audio.current_track() == core.sequencer.current_path();
            if engine_matches {
                audio.resume();
                core.set_status("Resumed");
            } else if let Some(path) = core.sequencer.current_path().map(PathBuf::from) {
                play_path(core, audio, path);
            }
        }
        PlaybackAction::Stop => {
            audio.stop();
            core.now_playing = None;
            core.dirty = true;
        }
        PlaybackAction::None => {}
    }
}

fn play_path(core: &mut PlayerCore, audio: &mut dyn AudioEngine, path: PathBuf) {
    match audio.play(&path) {
        Ok(()) => core.begin_playing(&path),
        Err(err) => {
            log::error!("playback failed for {}: {err:#}", path.display());
            core.sequencer.stop();
            core.set_status(&format!("playback error: {err:#}"));
        }
    }
}

/// Feeds end-of-media from the engine into the sequencer.
pub fn maybe_auto_advance_track(core: &mut PlayerCore, audio: &mut dyn AudioEngine) {
    if audio.current_track().is_none() || audio.is_paused() || !audio.is_finished() {
        return;
    }

    dispatch(core, audio, SequencerEvent::TrackEnded);
}

fn seek_relative(core: &mut PlayerCore, audio: &mut dyn AudioEngine, delta_seconds: i64) {
    let Some(position) = audio.position() else {
        core.set_status("Nothing is playing");
        return;
    };

    let current = i64::try_from(position.as_secs()).unwrap_or(i64::MAX);
    let target = Duration::from_secs(current.saturating_add(delta_seconds).max(0) as u64);
    seek_to(core, audio, target);
}

fn seek_to(core: &mut PlayerCore, audio: &mut dyn AudioEngine, target: Duration) {
    match audio.seek_to(target) {
        Ok(()) => core.dirty = true,
        Err(err) => core.set_status(&format!("seek error: {err:#}")),
    }
}

fn set_volume(core: &mut PlayerCore, audio: &mut dyn AudioEngine, volume: u8) {
    audio.set_volume(volume.min(MAX_VOLUME));
    core.volume = audio.volume();
    core.set_status(&format!("Volume: {}%", core.volume));
}

fn handle_mouse(core: &mut PlayerCore, mouse: MouseEvent, rects: &crate::ui::PaneRects) {
    let pane = [
        (Pane::Browser, rects.browser),
        (Pane::Tracks, rects.tracks),
        (Pane::Playlists, rects.playlists),
    ]
    .into_iter()
    .find(|(_, rect)| point_in_rect(mouse.column, mouse.row, *rect))
    .map(|(pane, _)| pane);

    let Some(pane) = pane else {
        return;
    };

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            core.focus = pane;
            core.select_next();
        }
        MouseEventKind::ScrollUp => {
            core.focus = pane;
            core.select_prev();
        }
        MouseEventKind::Down(_) => {
            core.focus = pane;
            core.dirty = true;
        }
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

pub const COMMAND_HELP: &str = "Commands: open <dir> | add <path> | save <name> | load <name> | shuffle <on|off> | repeat <off|all|one> | volume <0-100> | seek <seconds>";

pub fn run_command(core: &mut PlayerCore, audio: &mut dyn AudioEngine, raw: &str) {
    let input = raw.trim();
    if input.is_empty() {
        core.set_status("No command");
        return;
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" => core.set_status(COMMAND_HELP),
        "open" | "add" | "save" | "load" if rest.is_empty() => {
            core.set_status(&format!("Usage: {command} <{}>", argument_name(command)))
        }
        "open" => {
            let dir = PathBuf::from(rest);
            core.open_folder(&dir);
            if dir.is_dir() {
                core.browser_dir = config::normalize_path(&dir);
                core.selected_browser = 0;
                core.refresh_browser_entries();
            }
        }
        "add" => core.append_path(&PathBuf::from(rest)),
        "save" => core.save_playlist(rest),
        "load" => core.load_playlist(rest),
        "shuffle" => match rest {
            "on" => dispatch(core, audio, SequencerEvent::SetShuffled(true)),
            "off" => dispatch(core, audio, SequencerEvent::SetShuffled(false)),
            _ => core.set_status("Usage: shuffle <on|off>"),
        },
        "repeat" => match RepeatMode::parse(rest) {
            Some(mode) => core.set_repeat_mode(mode),
            None => core.set_status("Usage: repeat <off|all|one>"),
        },
        "volume" => match rest.parse::<u8>() {
            Ok(volume) if volume <= MAX_VOLUME => set_volume(core, audio, volume),
            _ => core.set_status("Usage: volume <0-100>"),
        },
        "seek" => match rest.parse::<u64>() {
            Ok(seconds) => seek_to(core, audio, Duration::from_secs(seconds)),
            Err(_) => core.set_status("Usage: seek <seconds>"),
        },
        _ => core.set_status("Unknown command. Use :help"),
    }
}

fn argument_name(command: &str) -> &'static str {
    match command {
        "open" => "dir",
        "add" => "path",
        _ => "name",
    }
}
