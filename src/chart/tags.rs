//! Tag and section-name tables of the `.chart` format.

use phf::phf_map;

use super::ChartEventType;
use crate::{song::Instrument, track::Difficulty};

/// Tags recognised inside `[SyncTrack]`.
pub static SYNC_TRACK_TAGS: phf::Map<&'static str, ChartEventType> = phf_map! {
    "B" => ChartEventType::Bpm,
    "TS" => ChartEventType::TimeSig,
    "A" => ChartEventType::Anchor,
};

/// Tags recognised inside `[Events]`.
pub static EVENTS_TAGS: phf::Map<&'static str, ChartEventType> = phf_map! {
    "E" => ChartEventType::Text,
};

/// Tags recognised inside an instrument track.
pub static INSTRUMENT_TAGS: phf::Map<&'static str, ChartEventType> = phf_map! {
    "N" => ChartEventType::Note,
    "S" => ChartEventType::Special,
    "E" => ChartEventType::Text,
};

/// Tags recognised inside a vocals track.
pub static VOCALS_TAGS: phf::Map<&'static str, ChartEventType> = phf_map! {
    "L" => ChartEventType::Lyric,
    "V" => ChartEventType::VocalNote,
    "VP" => ChartEventType::VocalPhrase,
    "S" => ChartEventType::Special,
    "E" => ChartEventType::Text,
};

/// Difficulty prefixes of instrument track names.
pub static DIFFICULTY_PREFIXES: [(&str, Difficulty); 4] = [
    ("Easy", Difficulty::Easy),
    ("Medium", Difficulty::Medium),
    ("Hard", Difficulty::Hard),
    ("Expert", Difficulty::Expert),
];

/// Instrument suffixes of instrument track names.
pub static INSTRUMENT_SUFFIXES: phf::Map<&'static str, Instrument> = phf_map! {
    "Single" => Instrument::Guitar,
    "DoubleGuitar" => Instrument::GuitarCoop,
    "DoubleBass" => Instrument::Bass,
    "DoubleRhythm" => Instrument::Rhythm,
    "Keyboard" => Instrument::Keys,
    "Drums" => Instrument::Drums,
    "GHLGuitar" => Instrument::SixFretGuitar,
    "GHLBass" => Instrument::SixFretBass,
    "GHLRhythm" => Instrument::SixFretRhythm,
    "GHLCoop" => Instrument::SixFretCoop,
    "Vocals" => Instrument::Vocals,
};

/// Splits a track name such as `ExpertSingle` into its difficulty and instrument.
#[must_use]
pub fn instrument_track(name: &str) -> Option<(Instrument, Difficulty)> {
    DIFFICULTY_PREFIXES.iter().find_map(|&(prefix, difficulty)| {
        let instrument = INSTRUMENT_SUFFIXES.get(name.strip_prefix(prefix)?)?;
        Some((*instrument, difficulty))
    })
}
