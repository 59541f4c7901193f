//! Prelude module for the crate.
//!
//! Re-exports the types most callers need. `use tickchart::prelude::*;` brings them all
//! into scope at once.

pub use crate::{
    binary::{BinaryCheckpoint, BinaryCursor, Endian, FromBytes},
    buffer::OwnedBuffer,
    chart::{ChartEventType, ChartReader, ChartSection},
    dta::DtaReader,
    error::{LoadError, ReadError, Result, SectionNesting},
    flat_map::FlatMap,
    ini::{IniFile, IniSection},
    midi::{MidiEvent, MidiEventType, MidiHeader, MidiNote, MidiReader, PhaseShiftSysEx},
    settings::{DrumsType, ParseSettings, SourceFormat},
    song::{Instrument, InstrumentKind, SongChart},
    sync::{Beat, BeatStyle, DualPosition, SyncTrack, Tempo, TimeSig},
    text::{TextCursor, line::LineReader},
    track::{
        Difficulty, DifficultyTrack, InstrumentTrack, TextEvents,
        drums::{DrumNote, DrumPad, Dynamics},
        note::{ForceState, FretNote, Sustain, TrackNote},
        phrase::{PhraseTracker, SpecialPhrase, SpecialPhraseType},
        vocals::{VocalNote, VocalTrack},
    },
};
