#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::PathBuf;
use superspoty::sequencer::{PlaybackAction, PlaybackSequencer, SequencerEvent};

fuzz_target!(|data: &[u8]| {
    let Some((&first, events)) = data.split_first() else {
        return;
    };
    let mut sequencer = PlaybackSequencer::with_seed(u64::from(first));
    let len = usize::from(first % 16);
    sequencer.replace_tracks(
        (0..len)
            .map(|idx| PathBuf::from(format!("track_{idx}.mp3")))
            .collect(),
    );

    for byte in events {
        let event = match byte % 9 {
            0 => SequencerEvent::Select(usize::from(byte / 9)),
            1 => SequencerEvent::Next,
            2 => SequencerEvent::Previous,
            3 => SequencerEvent::TrackEnded,
            4 => SequencerEvent::TogglePlay,
            5 => SequencerEvent::Stop,
            6 => SequencerEvent::SetShuffled(byte & 0x80 != 0),
            7 => SequencerEvent::CycleRepeat,
            _ => {
                sequencer.append_tracks([PathBuf::from("extra.mp3")]);
                continue;
            }
        };

        let before = sequencer.current_index();
        match sequencer.dispatch(event) {
            Ok(PlaybackAction::Play(idx)) | Ok(PlaybackAction::Restart(idx)) => {
                assert!(idx < sequencer.len());
                assert_eq!(sequencer.current_index(), Some(idx));
            }
            Ok(_) => {}
            Err(_) => assert_eq!(sequencer.current_index(), before),
        }
        if let Some(idx) = sequencer.current_index() {
            assert!(idx < sequencer.len());
        }
    }
});
