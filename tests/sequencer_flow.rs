use std::path::PathBuf;
use superspoty::model::RepeatMode;
use superspoty::sequencer::{PlaybackAction, PlaybackSequencer, SequencerError, SequencerEvent};

fn sequencer_with(names: &[&str]) -> PlaybackSequencer {
    let mut sequencer = PlaybackSequencer::with_seed(3);
    sequencer.replace_tracks(names.iter().map(PathBuf::from).collect());
    sequencer
}

#[test]
fn last_track_ending_without_repeat_stops_in_place() {
    let mut sequencer = sequencer_with(&["a.mp3", "b.mp3", "c.mp3"]);
    sequencer.select_index(2).expect("select");

    assert_eq!(sequencer.on_track_ended(), PlaybackAction::Stop);
    assert_eq!(sequencer.current_index(), Some(2));
    assert!(!sequencer.is_playing());
    assert_eq!(sequencer.display().play_symbol, ">");
}

#[test]
fn last_track_ending_with_repeat_all_wraps_to_first() {
    let mut sequencer = sequencer_with(&["a.mp3", "b.mp3", "c.mp3"]);
    sequencer.set_repeat_mode(RepeatMode::All);
    sequencer.select_index(2).expect("select");

    assert_eq!(sequencer.on_track_ended(), PlaybackAction::Play(0));
    assert_eq!(sequencer.current_path(), Some(PathBuf::from("a.mp3").as_path()));
}

#[test]
fn repeat_one_restarts_the_same_track() {
    let mut sequencer = sequencer_with(&["a.mp3", "b.mp3"]);
    sequencer.select_index(1).expect("select");
    assert_eq!(sequencer.cycle_repeat_mode(), RepeatMode::All);
    assert_eq!(sequencer.cycle_repeat_mode(), RepeatMode::One);

    for _ in 0..3 {
        assert_eq!(sequencer.on_track_ended(), PlaybackAction::Restart(1));
    }
    assert_eq!(sequencer.current_index(), Some(1));
}

#[test]
fn empty_list_ignores_navigation() {
    let mut sequencer = sequencer_with(&[]);
    assert_eq!(sequencer.advance(), PlaybackAction::None);
    assert_eq!(sequencer.retreat(), PlaybackAction::None);
    assert_eq!(sequencer.on_track_ended(), PlaybackAction::None);
    assert_eq!(sequencer.current_index(), None);
    assert_eq!(sequencer.display().position, "-/0");
}

#[test]
fn out_of_range_selection_leaves_state_alone() {
    let mut sequencer = sequencer_with(&["a.mp3"]);
    sequencer.select_index(0).expect("select");

    assert_eq!(
        sequencer.dispatch(SequencerEvent::Select(4)),
        Err(SequencerError::IndexOutOfRange { index: 4, len: 1 })
    );
    assert_eq!(sequencer.current_index(), Some(0));
    assert!(sequencer.is_playing());
}

#[test]
fn previous_and_next_wrap_around_the_list() {
    let mut sequencer = sequencer_with(&["a.mp3", "b.mp3", "c.mp3"]);
    sequencer.select_index(0).expect("select");

    assert_eq!(sequencer.retreat(), PlaybackAction::Play(2));
    assert_eq!(sequencer.advance(), PlaybackAction::Play(0));
    assert_eq!(sequencer.display().position, "1/3");
}

#[test]
fn shuffle_toggle_is_reflected_in_display() {
    let mut sequencer = sequencer_with(&["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
    sequencer.set_shuffled(true);
    assert_eq!(sequencer.display().shuffle_label, "shuffle on");

    for _ in 0..20 {
        let PlaybackAction::Play(index) = sequencer.advance() else {
            panic!("shuffled advance must play");
        };
        assert!(index < 4);
    }
}

#[test]
fn replacing_tracks_forgets_the_current_index() {
    let mut sequencer = sequencer_with(&["a.mp3", "b.mp3"]);
    sequencer.select_index(1).expect("select");
    sequencer.replace_tracks(vec![PathBuf::from("z.mp3")]);

    assert_eq!(sequencer.current_index(), None);
    assert_eq!(sequencer.on_track_ended(), PlaybackAction::Stop);
    assert_eq!(sequencer.toggle_play(), PlaybackAction::Play(0));
}
