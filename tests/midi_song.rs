use pretty_assertions::assert_eq;
use tickchart::{
    binary::encode_vlq,
    prelude::*,
    track::note::OPEN_LANE,
};

/// Appends events to an `MTrk` body with absolute ticks.
struct TrackBuilder {
    body: Vec<u8>,
    tick: u32,
}

impl TrackBuilder {
    fn new() -> Self {
        Self {
            body: Vec::new(),
            tick: 0,
        }
    }

    fn named(name: &str) -> Self {
        let mut track = Self::new();
        track.meta(0, 0x03, name.as_bytes());
        track
    }

    /// Raw bytes after the delta time, so a missing status byte exercises running status.
    fn raw(&mut self, tick: u32, bytes: &[u8]) -> &mut Self {
        self.body.extend(encode_vlq(tick - self.tick));
        self.body.extend_from_slice(bytes);
        self.tick = tick;
        self
    }

    fn meta(&mut self, tick: u32, kind: u8, data: &[u8]) -> &mut Self {
        let mut bytes = vec![0xFF, kind];
        bytes.extend(encode_vlq(data.len() as u32));
        bytes.extend_from_slice(data);
        self.raw(tick, &bytes)
    }

    fn text(&mut self, tick: u32, text: &str) -> &mut Self {
        self.meta(tick, 0x01, text.as_bytes())
    }

    fn on(&mut self, tick: u32, note: u8, velocity: u8) -> &mut Self {
        self.raw(tick, &[0x90, note, velocity])
    }

    fn off(&mut self, tick: u32, note: u8) -> &mut Self {
        self.raw(tick, &[0x80, note, 0x00])
    }

    fn sysex(&mut self, tick: u32, data: &[u8]) -> &mut Self {
        let mut bytes = vec![0xF0];
        bytes.extend(encode_vlq(data.len() as u32));
        bytes.extend_from_slice(data);
        self.raw(tick, &bytes)
    }

    fn build(&mut self) -> Vec<u8> {
        let tick = self.tick;
        self.meta(tick, 0x2F, &[]);
        let mut chunk = b"MTrk".to_vec();
        chunk.extend_from_slice(&(self.body.len() as u32).to_be_bytes());
        chunk.extend_from_slice(&self.body);
        chunk
    }
}

fn smf(tick_rate: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = b"MThd".to_vec();
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    bytes.extend_from_slice(&tick_rate.to_be_bytes());
    for track in tracks {
        bytes.extend_from_slice(track);
    }
    bytes
}

fn song() -> Vec<u8> {
    let sync = TrackBuilder::new()
        .meta(0, 0x51, &[0x07, 0xA1, 0x20])
        .meta(0, 0x58, &[0x04, 0x02, 0x18, 0x08])
        .meta(1920, 0x51, &[0x03, 0xD0, 0x90])
        .build();

    let events = TrackBuilder::named("EVENTS")
        .text(0, "[section Intro]")
        .text(0, "[music_start]")
        .build();

    let drums = TrackBuilder::named("PART DRUMS")
        .text(0, "[ENABLE_CHART_DYNAMICS]")
        .on(0, 97, 127)
        .raw(0, &[98, 1])
        .on(0, 110, 100)
        .off(480, 110)
        .on(480, 98, 100)
        .on(480, 95, 100)
        .on(480, 120, 100)
        .off(960, 120)
        .build();

    let guitar = TrackBuilder::named("PART GUITAR")
        .sysex(0, &[0x50, 0x53, 0x00, 0x00, 0x03, 0x01, 0x01, 0xF7])
        .on(0, 96, 100)
        .off(240, 96)
        .sysex(240, &[0x50, 0x53, 0x00, 0x00, 0x03, 0x01, 0x00, 0xF7])
        .on(480, 104, 100)
        .on(480, 97, 100)
        .off(720, 97)
        .off(720, 104)
        .build();

    let ghl = TrackBuilder::named("PART GUITAR GHL")
        .on(0, 98, 100)
        .off(60, 98)
        .build();

    let vocals = TrackBuilder::named("PART VOCALS")
        .on(0, 105, 100)
        .meta(0, 0x05, b"Sing")
        .on(0, 60, 100)
        .off(240, 60)
        .meta(240, 0x05, b"on+")
        .on(240, 62, 100)
        .text(300, "[tambourine_start]")
        .off(480, 62)
        .off(480, 105)
        .on(480, 116, 100)
        .off(720, 116)
        .build();

    smf(480, &[sync, events, drums, guitar, ghl, vocals])
}

#[test]
fn tempo_map() {
    let chart = SongChart::from_midi(&song(), &ParseSettings::default()).unwrap();
    let sync = &chart.sync;

    assert_eq!(sync.tick_rate(), 480);
    assert_eq!(sync.tempos().len(), 2);
    assert_eq!(sync.tempos()[1].micros_per_quarter, 250_000);
    assert_eq!(sync.tempos()[1].anchor, 2_000_000);
    assert!((sync.convert_to_seconds(2400) - 2.25).abs() < 1e-9);
    assert_eq!(sync.convert_to_ticks(2.25), 2400);
    assert_eq!(sync.time_sig_at(5000), TimeSig::new(4, 2));
}

#[test]
fn global_events_and_sections() {
    let chart = SongChart::from_midi(&song(), &ParseSettings::default()).unwrap();

    assert_eq!(chart.sections.get(&0).map(String::as_str), Some("Intro"));
    assert_eq!(
        chart.global_events.get(&0),
        Some(&vec!["[music_start]".to_owned()])
    );
}

#[test]
fn drums_dynamics_and_toms() {
    let chart = SongChart::from_midi(&song(), &ParseSettings::default()).unwrap();
    let expert = chart.drums.difficulty(Difficulty::Expert);

    assert_eq!(expert.notes.len(), 2);
    let first = expert.notes[0];
    assert_eq!(
        first.pads[1],
        Some(DrumPad {
            dynamics: Dynamics::Accent,
            cymbal: false,
        })
    );
    assert_eq!(
        first.pads[2],
        Some(DrumPad {
            dynamics: Dynamics::Ghost,
            cymbal: false,
        })
    );

    let second = expert.notes[1];
    assert_eq!(
        second.pads[2],
        Some(DrumPad {
            dynamics: Dynamics::Normal,
            cymbal: true,
        })
    );
    assert!(second.double_kick);
    assert_eq!(chart.drums_type, DrumsType::FourLane);

    let phrases: Vec<_> = chart
        .drums
        .phrases
        .iter()
        .flat_map(|(&tick, list)| list.iter().map(move |phrase| (tick, phrase.kind, phrase.length)))
        .collect();
    assert_eq!(
        phrases,
        vec![(480, SpecialPhraseType::DrumFill, Sustain::Closed(480))]
    );
}

#[test]
fn guitar_open_and_tap_switches() {
    let chart = SongChart::from_midi(&song(), &ParseSettings::default()).unwrap();
    let guitar = chart.fret_track(Instrument::Guitar).unwrap();
    let expert = guitar.difficulty(Difficulty::Expert);

    assert_eq!(expert.notes.len(), 2);
    assert_eq!(expert.notes[0].lane(OPEN_LANE), Some(Sustain::Closed(240)));
    assert_eq!(expert.notes[0].lane(1), None);
    assert_eq!(expert.notes[1].lane(2), Some(Sustain::Closed(240)));
    assert!(expert.notes[1].is_tap);
    assert_eq!(expert.notes[1].forcing, ForceState::Strum);
    assert!(guitar.difficulty(Difficulty::Hard).is_empty());
}

#[test]
fn six_fret_short_sustain_is_cut() {
    let chart = SongChart::from_midi(&song(), &ParseSettings::default()).unwrap();
    let ghl = chart.fret_track(Instrument::SixFretGuitar).unwrap();
    let note = ghl.difficulty(Difficulty::Expert).notes[0];

    assert_eq!(note.lane(4), Some(Sustain::Closed(0)));
    assert_eq!(note.lane_count(), 1);

    let tracks: Vec<_> = chart.fret_tracks().map(|(instrument, _)| instrument).collect();
    assert_eq!(tracks, vec![Instrument::Guitar, Instrument::SixFretGuitar]);
}

#[test]
fn sustain_cutoff_setting_overrides_default() {
    let settings = ParseSettings {
        sustain_cutoff_threshold: Some(0),
        ..ParseSettings::default()
    };
    let chart = SongChart::from_midi(&song(), &settings).unwrap();
    let ghl = chart.fret_track(Instrument::SixFretGuitar).unwrap();
    assert_eq!(
        ghl.difficulty(Difficulty::Expert).notes[0].lane(4),
        Some(Sustain::Closed(60))
    );
}

#[test]
fn data_byte_without_status_fails() {
    let broken = TrackBuilder::named("PART GUITAR").raw(0, &[96, 100]).build();
    let sync = TrackBuilder::new().build();
    let data = smf(480, &[sync, broken]);

    let error = SongChart::from_midi(&data, &ParseSettings::default()).unwrap_err();
    assert!(matches!(error, ReadError::MissingRunningStatus { .. }));
}

#[test]
fn bad_header_fails() {
    let mut data = smf(480, &[]);
    data[0] = b'X';
    let error = SongChart::from_midi(&data, &ParseSettings::default()).unwrap_err();
    assert!(matches!(
        error,
        ReadError::InvalidChunkTag {
            position: 0,
            expected: "MThd",
            ..
        }
    ));
}

#[test]
fn vocals_lyrics_and_lines() {
    let chart = SongChart::from_midi(&song(), &ParseSettings::default()).unwrap();
    let vocals = &chart.vocals;

    let notes: Vec<_> = vocals.notes.iter().map(|(&tick, note)| (tick, note.pitch, note.length)).collect();
    assert_eq!(
        notes,
        vec![(0, 60, Sustain::Closed(240)), (240, 62, Sustain::Closed(240))]
    );
    let lyrics: Vec<_> = vocals.lyrics.iter().map(|(&tick, text)| (tick, text.as_str())).collect();
    assert_eq!(lyrics, vec![(0, "Sing"), (240, "on+")]);
    let phrases: Vec<_> = vocals
        .phrases
        .iter()
        .flat_map(|(&tick, list)| list.iter().map(move |phrase| (tick, phrase.kind, phrase.length)))
        .collect();
    assert_eq!(
        phrases,
        vec![
            (0, SpecialPhraseType::LyricLine, Sustain::Closed(480)),
            (480, SpecialPhraseType::StarPower, Sustain::Closed(240)),
        ]
    );
    assert_eq!(
        vocals.events.get(&300),
        Some(&vec!["[tambourine_start]".to_owned()])
    );
}
