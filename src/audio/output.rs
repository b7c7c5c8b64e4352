use super::{AudioEngine, DEFAULT_VOLUME, LoadedTrack, MAX_VOLUME};
use anyhow::{Context, Result, anyhow};
use rodio::Source;
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// rodio sink on the system output. The sink is rebuilt for every track so
/// nothing queued from the previous one can leak into the next.
pub struct RodioAudioEngine {
    stream: OutputStream,
    sink: Sink,
    output: String,
    loaded: Option<LoadedTrack>,
    volume: u8,
}

impl RodioAudioEngine {
    pub fn new() -> Result<Self> {
        let (mut stream, output) = quiet_stderr::run(open_stream)?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        log::info!("audio output ready on {output}");
        Ok(Self {
            stream,
            sink,
            output,
            loaded: None,
            volume: DEFAULT_VOLUME,
        })
    }

    fn gain(&self) -> f32 {
        f32::from(self.volume) / f32::from(MAX_VOLUME)
    }
}

fn open_stream() -> Result<(OutputStream, String)> {
    let default = OutputStreamBuilder::from_default_device()
        .and_then(|builder| builder.with_error_callback(|_| {}).open_stream_or_fallback())
        .context("default output device unavailable");

    let default_err = match default {
        Ok(stream) => return Ok((stream, String::from("system default"))),
        Err(err) => err,
    };
    log::warn!("{default_err:#}; probing other outputs");

    let host = rodio::cpal::default_host();
    let mut candidates: Vec<_> = host
        .output_devices()
        .into_iter()
        .flatten()
        .filter_map(|device| Some((device.name().ok()?, device)))
        .collect();
    candidates.sort_by_cached_key(|(name, _)| (device_rank(name), name.to_lowercase()));

    for (name, device) in candidates {
        let attempt = OutputStreamBuilder::from_device(device)
            .and_then(|builder| builder.with_error_callback(|_| {}).open_stream_or_fallback());
        match attempt {
            Ok(stream) => return Ok((stream, name)),
            Err(err) => log::debug!("output {name} rejected: {err}"),
        }
    }

    Err(default_err).context("no audio output could be opened")
}

/// Sound servers first, then anything calling itself a default.
fn device_rank(name: &str) -> u8 {
    let name = name.to_ascii_lowercase();
    ["pulse", "pipewire", "default"]
        .iter()
        .position(|preferred| name.contains(preferred))
        .map_or(3, |rank| rank as u8)
}

impl AudioEngine for RodioAudioEngine {
    fn play(&mut self, path: &Path) -> Result<()> {
        self.sink.stop();
        self.loaded = None;

        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let source =
            Decoder::try_from(file).with_context(|| format!("cannot decode {}", path.display()))?;
        let length = source.total_duration().filter(|length| !length.is_zero());

        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.set_volume(self.gain());
        self.sink.append(source);
        self.loaded = Some(LoadedTrack {
            path: path.to_path_buf(),
            length,
        });
        log::info!("playing {}", path.display());
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.loaded = None;
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn current_track(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|track| track.path.as_path())
    }

    fn position(&self) -> Option<Duration> {
        self.loaded.as_ref().map(|_| self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.loaded.as_ref()?.length
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        let track = self.loaded.as_ref().ok_or_else(|| anyhow!("nothing is loaded"))?;
        let target = track.clamp(position);
        self.sink
            .try_seek(target)
            .map_err(|err| anyhow!("seek to {}s failed: {err}", target.as_secs()))
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(MAX_VOLUME);
        self.sink.set_volume(self.gain());
    }

    fn output_name(&self) -> Option<String> {
        Some(self.output.clone())
    }

    fn is_finished(&self) -> bool {
        self.loaded.is_some() && !self.sink.is_paused() && self.sink.empty()
    }
}

/// ALSA and JACK print probing noise straight to fd 2, which would tear up
/// the terminal UI while devices are opened.
#[cfg(unix)]
mod quiet_stderr {
    use std::os::fd::RawFd;

    struct Redirect {
        saved: RawFd,
    }

    impl Redirect {
        fn to_devnull() -> Option<Self> {
            // SAFETY: plain descriptor calls; every descriptor opened here is
            // closed again either below or in `Drop`.
            unsafe {
                let saved = libc::dup(libc::STDERR_FILENO);
                if saved < 0 {
                    return None;
                }
                let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
                if devnull < 0 {
                    libc::close(saved);
                    return None;
                }
                libc::dup2(devnull, libc::STDERR_FILENO);
                libc::close(devnull);
                Some(Self { saved })
            }
        }
    }

    impl Drop for Redirect {
        fn drop(&mut self) {
            // SAFETY: `saved` came from `dup` and is owned by this guard.
            unsafe {
                libc::dup2(self.saved, libc::STDERR_FILENO);
                libc::close(self.saved);
            }
        }
    }

    pub(super) fn run<T>(operation: impl FnOnce() -> T) -> T {
        let _redirect = Redirect::to_devnull();
        operation()
    }
}

#[cfg(not(unix))]
mod quiet_stderr {
    pub(super) fn run<T>(operation: impl FnOnce() -> T) -> T {
        operation()
    }
}

#[cfg(test)]
mod tests {
    use super::device_rank;

    #[test]
    fn sound_servers_are_tried_before_raw_devices() {
        assert_eq!(device_rank("PulseAudio Sound Server"), 0);
        assert_eq!(device_rank("pipewire"), 1);
        assert_eq!(device_rank("default:CARD=PCH"), 2);
        assert_eq!(device_rank("hw:CARD=PCH,DEV=0"), 3);
    }

    #[test]
    fn quiet_stderr_returns_the_closure_value() {
        assert_eq!(super::quiet_stderr::run(|| 41 + 1), 42);
    }
}
