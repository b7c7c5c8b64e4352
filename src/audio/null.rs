use super::{AudioEngine, DEFAULT_VOLUME, LoadedTrack, MAX_VOLUME, decoded_length};
use anyhow::{Result, anyhow};
use std::path::Path;
use std::time::{Duration, Instant};

/// Position that runs with wall time while not paused.
#[derive(Debug, Clone, Copy, Default)]
struct Clock {
    banked: Duration,
    running_since: Option<Instant>,
}

impl Clock {
    fn started() -> Self {
        Self {
            banked: Duration::ZERO,
            running_since: Some(Instant::now()),
        }
    }

    fn now(&self) -> Duration {
        self.running_since
            .map_or(self.banked, |since| self.banked.saturating_add(since.elapsed()))
    }

    fn hold(&mut self) {
        self.banked = self.now();
        self.running_since = None;
    }

    fn run(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn set(&mut self, position: Duration) {
        self.banked = position;
        if self.running_since.is_some() {
            self.running_since = Some(Instant::now());
        }
    }
}

/// Silent engine with a wall-clock position. Stands in when no output device
/// can be opened, and under `--null-audio`.
#[derive(Debug)]
pub struct NullAudioEngine {
    loaded: Option<LoadedTrack>,
    clock: Clock,
    volume: u8,
}

impl NullAudioEngine {
    pub fn new() -> Self {
        Self {
            loaded: None,
            clock: Clock::default(),
            volume: DEFAULT_VOLUME,
        }
    }

    fn elapsed(&self) -> Option<Duration> {
        let track = self.loaded.as_ref()?;
        Some(track.clamp(self.clock.now()))
    }
}

impl Default for NullAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for NullAudioEngine {
    fn play(&mut self, path: &Path) -> Result<()> {
        self.loaded = Some(LoadedTrack {
            path: path.to_path_buf(),
            length: decoded_length(path),
        });
        self.clock = Clock::started();
        log::debug!("null output playing {}", path.display());
        Ok(())
    }

    fn pause(&mut self) {
        self.clock.hold();
    }

    fn resume(&mut self) {
        if self.loaded.is_some() {
            self.clock.run();
        }
    }

    fn stop(&mut self) {
        self.loaded = None;
        self.clock = Clock::default();
    }

    fn is_paused(&self) -> bool {
        self.loaded.is_some() && self.clock.running_since.is_none()
    }

    fn current_track(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|track| track.path.as_path())
    }

    fn position(&self) -> Option<Duration> {
        self.elapsed()
    }

    fn duration(&self) -> Option<Duration> {
        self.loaded.as_ref()?.length
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        let track = self.loaded.as_ref().ok_or_else(|| anyhow!("nothing is loaded"))?;
        let target = track.clamp(position);
        self.clock.set(target);
        Ok(())
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(MAX_VOLUME);
    }

    fn output_name(&self) -> Option<String> {
        Some(String::from("silent"))
    }

    fn is_finished(&self) -> bool {
        let Some(length) = self.duration() else {
            return false;
        };
        !self.is_paused() && self.clock.now() >= length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fixtures::silent_wav;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn clock_moves_only_while_playing() {
        let mut engine = NullAudioEngine::new();
        engine.play(Path::new("nowhere.mp3")).expect("play");
        thread::sleep(Duration::from_millis(20));
        engine.pause();
        assert!(engine.is_paused());

        let held = engine.position().expect("position");
        assert!(held >= Duration::from_millis(20));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.position(), Some(held));

        engine.resume();
        thread::sleep(Duration::from_millis(10));
        assert!(engine.position().expect("position") > held);
    }

    #[test]
    fn seeking_moves_the_clock() {
        let mut engine = NullAudioEngine::new();
        engine.play(Path::new("nowhere.mp3")).expect("play");
        engine.pause();
        engine.seek_to(Duration::from_secs(42)).expect("seek");
        assert_eq!(engine.position(), Some(Duration::from_secs(42)));
    }

    #[test]
    fn seeking_with_nothing_loaded_fails() {
        let mut engine = NullAudioEngine::new();
        assert!(engine.seek_to(Duration::from_secs(1)).is_err());
        assert_eq!(engine.position(), None);
    }

    #[test]
    fn known_length_runs_out() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("short.wav");
        silent_wav(&path, 60);

        let mut engine = NullAudioEngine::new();
        engine.play(&path).expect("play");
        assert!(engine.duration().is_some());
        assert!(!engine.is_finished());

        thread::sleep(Duration::from_millis(120));
        assert!(engine.is_finished());
        assert_eq!(engine.position(), engine.duration());
    }

    #[test]
    fn unknown_length_never_finishes() {
        let mut engine = NullAudioEngine::new();
        engine.play(Path::new("nowhere.mp3")).expect("play");
        thread::sleep(Duration::from_millis(10));
        assert!(!engine.is_finished());
    }

    #[test]
    fn volume_is_capped() {
        let mut engine = NullAudioEngine::new();
        assert_eq!(engine.volume(), DEFAULT_VOLUME);
        engine.set_volume(250);
        assert_eq!(engine.volume(), MAX_VOLUME);
    }

    #[test]
    fn stop_unloads_the_track() {
        let mut engine = NullAudioEngine::new();
        engine.play(Path::new("nowhere.mp3")).expect("play");
        engine.stop();
        assert_eq!(engine.current_track(), None);
        assert!(!engine.is_paused());
    }
}
