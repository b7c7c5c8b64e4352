//! Playback engines. The player only talks to [`AudioEngine`]; rodio backs the
//! real output and [`NullAudioEngine`] keeps time silently when no device
//! is available.

mod null;
mod output;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use null::NullAudioEngine;
pub use output::RodioAudioEngine;

pub const MAX_VOLUME: u8 = 100;
pub const DEFAULT_VOLUME: u8 = 50;

/// Playback backend. At most one stream is active; `play` replaces whatever
/// was loaded before.
pub trait AudioEngine {
    fn play(&mut self, path: &Path) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    fn is_paused(&self) -> bool;
    fn current_track(&self) -> Option<&Path>;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn seek_to(&mut self, position: Duration) -> Result<()>;
    /// Volume in percent, `0..=100`.
    fn volume(&self) -> u8;
    fn set_volume(&mut self, volume: u8);
    fn output_name(&self) -> Option<String>;
    /// True once the loaded track has played to its end.
    fn is_finished(&self) -> bool;
}

/// Path and length of the track an engine has loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadedTrack {
    path: PathBuf,
    length: Option<Duration>,
}

impl LoadedTrack {
    fn clamp(&self, position: Duration) -> Duration {
        self.length.map_or(position, |length| position.min(length))
    }
}

/// Length reported by the decoder, if the container carries one.
fn decoded_length(path: &Path) -> Option<Duration> {
    use rodio::Source;

    let file = std::fs::File::open(path).ok()?;
    rodio::Decoder::try_from(file)
        .ok()?
        .total_duration()
        .filter(|length| !length.is_zero())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::Path;

    /// Writes a silent 8 kHz mono PCM wav of the given length.
    pub(crate) fn silent_wav(path: &Path, millis: u32) {
        const RATE: u32 = 8_000;
        let samples = RATE * millis / 1_000;
        let data_len = samples * 2;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16_u32.to_le_bytes());
        bytes.extend_from_slice(&1_u16.to_le_bytes()); // pcm
        bytes.extend_from_slice(&1_u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&RATE.to_le_bytes());
        bytes.extend_from_slice(&(RATE * 2).to_le_bytes());
        bytes.extend_from_slice(&2_u16.to_le_bytes());
        bytes.extend_from_slice(&16_u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(bytes.len() + data_len as usize, 0);

        fs::write(path, bytes).expect("write wav fixture");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn wav_length_is_read_from_the_header() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        fixtures::silent_wav(&path, 500);

        let length = decoded_length(&path).expect("length");
        assert!(length >= Duration::from_millis(450) && length <= Duration::from_millis(550));
    }

    #[test]
    fn unreadable_file_has_no_length() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("junk.mp3");
        std::fs::write(&path, b"not audio").expect("write");
        assert_eq!(decoded_length(&path), None);
        assert_eq!(decoded_length(&dir.path().join("absent.wav")), None);
    }

    #[test]
    fn loaded_track_clamps_to_its_length() {
        let track = LoadedTrack {
            path: PathBuf::from("a.wav"),
            length: Some(Duration::from_secs(10)),
        };
        assert_eq!(track.clamp(Duration::from_secs(30)), Duration::from_secs(10));

        let unknown = LoadedTrack {
            length: None,
            ..track
        };
        assert_eq!(unknown.clamp(Duration::from_secs(30)), Duration::from_secs(30));
    }
}
