use pretty_assertions::assert_eq;
use tickchart::prelude::*;

fn sync_track() -> SyncTrack {
    let mut sync = SyncTrack::new(480);
    sync.add_tempo(0, 500_000);
    sync.add_tempo(1_000, 333_333);
    sync.add_time_sig(1_920, TimeSig::new(3, 2));
    sync.add_tempo(2_999, 612_245);
    sync.add_anchor(4_800, 6_000_000);
    sync.add_tempo(7_777, 250_000);
    sync.finalize_tempo_map();
    sync
}

#[test]
fn ticks_survive_a_round_trip_through_seconds() {
    let sync = sync_track();
    for tick in (0..12_000).step_by(37) {
        let seconds = sync.convert_to_seconds(tick);
        assert_eq!(sync.convert_to_ticks(seconds), tick, "at {seconds}s");
    }
}

#[test]
fn hinted_conversion_matches_binary_search() {
    let sync = sync_track();
    let mut hint = 0;
    let mut previous = -1.0;
    for tick in (0..12_000).step_by(53) {
        let hinted = sync.convert_to_seconds_from(tick, &mut hint);
        assert!((hinted - sync.convert_to_seconds(tick)).abs() < 1e-12);
        assert!(hinted > previous);
        previous = hinted;
    }
    assert_eq!(hint, sync.tempos().len() - 1);
}

#[test]
fn explicit_anchor_is_kept() {
    let sync = sync_track();
    let anchors: Vec<_> = sync
        .tempos()
        .iter()
        .map(|(&tick, tempo)| (tick, tempo.explicit_anchor))
        .collect();
    assert_eq!(
        anchors,
        vec![
            (0, false),
            (1_000, false),
            (2_999, false),
            (4_800, true),
            (7_777, false),
        ]
    );
    assert!((sync.convert_to_seconds(4_800) - 6.0).abs() < 1e-9);
    // 2977 ticks at 612245 us per quarter after the anchor.
    let expected = 6.0 + 2_977.0 / 480.0 * 0.612_245;
    assert!((sync.convert_to_seconds(7_777) - expected).abs() < 1e-6);
}

#[test]
fn dual_positions_and_beats() {
    let mut sync = sync_track();
    sync.generate_all_beats(3_000);

    let beat = sync.beat(0).unwrap();
    assert_eq!(beat.style, BeatStyle::Measure);
    assert_eq!(beat.position.tick, 0);

    // 4/4 until tick 1920, then 3/4 from there.
    let measures: Vec<_> = sync
        .beats()
        .iter()
        .filter(|(_, style)| **style == BeatStyle::Measure)
        .map(|(&tick, _)| tick)
        .collect();
    assert_eq!(measures, vec![0, 1_920]);
    assert_eq!(sync.beats().last(), Some((&2_880, &BeatStyle::Strong)));

    let position = sync.dual_position(1_000);
    assert!((position.seconds - 1_000.0 / 480.0 * 0.5).abs() < 1e-9);
}

#[test]
fn chart_with_extreme_time_sigs_finalizes() {
    let chart = b"[Song]\n{\n  Resolution = 192\n}\n[SyncTrack]\n{\n  0 = TS 4 28\n  0 = B 120000\n}\n";
    let song = SongChart::from_dotchart(chart, &ParseSettings::default()).unwrap();
    assert_eq!(song.sync.time_sig_at(0), TimeSig::new(4, 6));
    let ticks: Vec<_> = song.sync.beats().keys().copied().collect();
    assert_eq!(ticks, vec![0, 12, 24, 36]);

    let chart = b"[SyncTrack]\n{\n  0 = TS 4000000000\n}\n";
    let song = SongChart::from_dotchart(chart, &ParseSettings::default()).unwrap();
    assert_eq!(song.sync.time_sig_at(0), TimeSig::new(255, 2));
    assert_eq!(song.sync.beats().len(), 255);
}

#[test]
fn midi_with_extreme_time_sig_finalizes() {
    let track = [
        0x00, 0xFF, 0x58, 0x04, 0x04, 0x1E, 0x18, 0x08, //
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let mut data = b"MThd\x00\x00\x00\x06\x00\x01\x00\x01\x01\xE0MTrk".to_vec();
    data.extend_from_slice(&(track.len() as u32).to_be_bytes());
    data.extend_from_slice(&track);

    let song = SongChart::from_midi(&data, &ParseSettings::default()).unwrap();
    let time_sig = song.sync.time_sig_at(0);
    assert_eq!((time_sig.numerator, time_sig.denominator), (4, 6));
    let styles: Vec<_> = song
        .sync
        .beats()
        .iter()
        .map(|(&tick, &style)| (tick, style))
        .collect();
    assert_eq!(
        styles,
        vec![
            (0, BeatStyle::Measure),
            (30, BeatStyle::Weak),
            (60, BeatStyle::Weak),
            (90, BeatStyle::Weak),
        ]
    );
}
