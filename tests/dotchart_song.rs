use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tickchart::prelude::*;

const CHART: &str = r#"[Song]
{
  Name = "Tick Tock"
  Resolution = 192
  Offset = 0
}
[SyncTrack]
{
  0 = TS 4
  0 = B 120000
  768 = TS 7 3
  768 = B 90000
  1536 = A 5000000
}
[Events]
{
  0 = E "section Intro"
  768 = E "section Verse 1"
  768 = E "lighting (strobe)"
}
[ExpertSingle]
{
  0 = N 0 0
  100 = N 1 0
  200 = N 2 0
  200 = N 3 0
  300 = S 2 100
}
[HardDoubleBass]
{
  0 = N 7 192
}
[ExpertDrums]
{
  0 = N 0 0
  0 = N 2 0
  0 = N 66 0
  192 = N 4 0
  192 = N 37 0
  192 = S 64 192
}
"#;

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("tickchart-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[test]
fn sync_track_and_anchor() {
    let chart = SongChart::from_dotchart(CHART.as_bytes(), &ParseSettings::default()).unwrap();
    let sync = &chart.sync;

    assert_eq!(sync.tempos().len(), 3);
    // Four quarters at 120 BPM, then four at 90 BPM would be 4.666s, but the anchor pins
    // tick 1536 at 5s.
    assert_eq!(sync.tempos()[1].anchor, 2_000_000);
    assert_eq!(sync.tempos()[2].anchor, 5_000_000);
    assert!(sync.tempos()[2].explicit_anchor);
    assert_eq!(sync.tempos()[2].micros_per_quarter, sync.tempos()[1].micros_per_quarter);
    assert!((sync.convert_to_seconds(1536) - 5.0).abs() < 1e-9);
    assert_eq!(sync.time_sig_at(800), TimeSig::new(7, 3));

    let measures = sync
        .beats()
        .iter()
        .filter(|(_, style)| **style == BeatStyle::Measure)
        .count();
    assert!(measures >= 2);
    assert_eq!(sync.beats().first(), Some((&0, &BeatStyle::Measure)));
}

#[test]
fn sections_and_events() {
    let chart = SongChart::from_dotchart(CHART.as_bytes(), &ParseSettings::default()).unwrap();

    let sections: Vec<_> = chart
        .sections
        .iter()
        .map(|(&tick, name)| (tick, name.as_str()))
        .collect();
    assert_eq!(sections, vec![(0, "Intro"), (768, "Verse 1")]);
    assert_eq!(
        chart.global_events.get(&768),
        Some(&vec!["lighting (strobe)".to_owned()])
    );
    assert_eq!(chart.modifiers.get_str("name"), Some("Tick Tock"));
}

#[test]
fn fret_tracks() {
    let chart = SongChart::from_dotchart(CHART.as_bytes(), &ParseSettings::default()).unwrap();

    let guitar = chart.fret_track(Instrument::Guitar).unwrap();
    let expert = guitar.difficulty(Difficulty::Expert);
    let notes: Vec<_> = expert
        .notes
        .iter()
        .map(|(&tick, note)| (tick, note.lane_mask(), note.forcing))
        .collect();
    assert_eq!(
        notes,
        vec![
            (0, 0b10, ForceState::Strum),
            (100, 0b100, ForceState::Strum),
            (200, 0b11000, ForceState::Strum),
        ]
    );
    assert_eq!(expert.phrases[0][0].kind, SpecialPhraseType::StarPower);

    let bass = chart.fret_track(Instrument::Bass).unwrap();
    assert_eq!(
        bass.difficulty(Difficulty::Hard).notes[0].lane(0),
        Some(Sustain::Closed(192))
    );
    assert!(chart.fret_track(Instrument::Drums).is_none());
}

#[test]
fn drums_modifiers() {
    let chart = SongChart::from_dotchart(CHART.as_bytes(), &ParseSettings::default()).unwrap();
    let expert = chart.drums.difficulty(Difficulty::Expert);

    assert_eq!(chart.drums_type, DrumsType::FourLane);
    assert_eq!(expert.notes[0].pads[0], Some(DrumPad::default()));
    assert_eq!(
        expert.notes[0].pads[2],
        Some(DrumPad {
            dynamics: Dynamics::Normal,
            cymbal: true,
        })
    );
    assert_eq!(
        expert.notes[1].pads[4],
        Some(DrumPad {
            dynamics: Dynamics::Accent,
            cymbal: false,
        })
    );
    assert_eq!(expert.phrases[0][0].kind, SpecialPhraseType::DrumFill);
}

#[test]
fn five_lane_setting_marks_cymbals() {
    let settings = ParseSettings {
        drums_type: DrumsType::FiveLane,
        ..ParseSettings::default()
    };
    let chart = SongChart::from_dotchart(CHART.as_bytes(), &settings).unwrap();
    let expert = chart.drums.difficulty(Difficulty::Expert);

    assert_eq!(chart.drums_type, DrumsType::FiveLane);
    assert_eq!(expert.notes[1].pads[4].map(|pad| pad.cymbal), Some(true));
}

#[test]
fn load_file_reads_song_ini() {
    let dir = TempDir::new("load");
    let chart_path = dir.0.join("notes.chart");
    std::fs::write(&chart_path, CHART).unwrap();
    std::fs::write(
        dir.0.join("song.ini"),
        "[Song]\nartist = Someone\nhopo_frequency = 120\n",
    )
    .unwrap();

    let chart = SongChart::load_file(&chart_path, &ParseSettings::default()).unwrap();
    let expert = chart
        .fret_track(Instrument::Guitar)
        .unwrap()
        .difficulty(Difficulty::Expert);
    assert_eq!(expert.notes[1].forcing, ForceState::Hopo);
    assert_eq!(expert.notes[2].forcing, ForceState::Strum);
    assert_eq!(chart.modifiers.get_str("artist"), Some("Someone"));
    assert_eq!(chart.modifiers.get_str("name"), Some("Tick Tock"));
}

#[test]
fn load_file_errors() {
    let dir = TempDir::new("errors");
    assert!(matches!(
        SongChart::load_file(dir.0.join("notes.txt"), &ParseSettings::default()),
        Err(LoadError::UnknownFormat(_))
    ));
    assert!(matches!(
        SongChart::load_file(dir.0.join("missing.mid"), &ParseSettings::default()),
        Err(LoadError::Io(_))
    ));

    let broken = dir.0.join("broken.chart");
    std::fs::write(&broken, "[ExpertSingle]\n{\n  10 = N 0 0\n  5 = N 0 0\n}\n").unwrap();
    assert!(matches!(
        SongChart::load_file(&broken, &ParseSettings::default()),
        Err(LoadError::Read(ReadError::OutOfOrderTick { previous: 10, found: 5 }))
    ));
}

#[test]
fn vocals_block() {
    let data = r#"[Song]
{
  Resolution = 192
}
[ExpertVocals]
{
  0 = VP 384
  0 = L "Do"
  0 = V 60 96
  192 = L "re"
  192 = V 62 96
  192 = S 2 192
}
[HardVocals]
{
  0 = L "ignored"
}
"#;
    let chart = SongChart::from_dotchart(data.as_bytes(), &ParseSettings::default()).unwrap();
    let vocals = &chart.vocals;

    let lyrics: Vec<_> = vocals.lyrics.values().map(String::as_str).collect();
    assert_eq!(lyrics, vec!["Do", "re"]);
    assert_eq!(
        vocals.notes.get(&192),
        Some(&VocalNote {
            pitch: 62,
            length: Sustain::Closed(96),
        })
    );
    let phrases: Vec<_> = vocals
        .phrases
        .iter()
        .flat_map(|(&tick, list)| list.iter().map(move |phrase| (tick, phrase.kind)))
        .collect();
    assert_eq!(
        phrases,
        vec![
            (0, SpecialPhraseType::LyricLine),
            (192, SpecialPhraseType::StarPower),
        ]
    );
    assert_eq!(chart.last_tick(), 384);
    assert!(chart.fret_track(Instrument::Vocals).is_none());
}
