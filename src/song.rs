//! A whole decoded chart: timeline, global events and every instrument track.
//!
//! [`SongChart::from_midi`] and [`SongChart::from_dotchart`] decode a buffer in one pass
//! and finalise the result, so the returned chart has a complete tempo map, a beat grid
//! through the last note and no open sustains or phrases.

pub mod dotchart;
pub mod midi;

use std::path::Path;

use crate::{
    buffer::OwnedBuffer,
    error::LoadError,
    flat_map::FlatMap,
    ini::{IniFile, IniSection},
    settings::{DrumsType, ParseSettings, SourceFormat},
    sync::SyncTrack,
    track::{
        InstrumentTrack, TextEvents,
        drums::{DrumNote, resolve_drums_type},
        fret::resolve_forcing,
        note::FretNote,
        vocals::VocalTrack,
    },
};

/// A playable part of a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instrument {
    /// Five-fret lead guitar.
    Guitar,
    /// Five-fret co-op guitar.
    GuitarCoop,
    /// Five-fret bass.
    Bass,
    /// Five-fret rhythm guitar.
    Rhythm,
    /// Five-fret keys.
    Keys,
    /// Six-fret lead guitar.
    SixFretGuitar,
    /// Six-fret bass.
    SixFretBass,
    /// Six-fret rhythm guitar.
    SixFretRhythm,
    /// Six-fret co-op guitar.
    SixFretCoop,
    /// Drums.
    Drums,
    /// Vocals.
    Vocals,
}

/// How an [`Instrument`] lays out its lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstrumentKind {
    /// Five frets plus open.
    FiveFret,
    /// Three white and three black frets plus open.
    SixFret,
    /// Kick plus four or five pads.
    Drums,
    /// Pitched notes and lyrics.
    Vocals,
}

/// Number of instruments with fretted notes.
pub const FRETTED_INSTRUMENTS: usize = 9;

impl Instrument {
    /// Every fretted instrument, in the order of [`Self::fret_index`].
    pub const FRETTED: [Self; FRETTED_INSTRUMENTS] = [
        Self::Guitar,
        Self::GuitarCoop,
        Self::Bass,
        Self::Rhythm,
        Self::Keys,
        Self::SixFretGuitar,
        Self::SixFretBass,
        Self::SixFretRhythm,
        Self::SixFretCoop,
    ];

    /// The lane layout of the instrument.
    #[must_use]
    pub const fn kind(self) -> InstrumentKind {
        match self {
            Self::Guitar | Self::GuitarCoop | Self::Bass | Self::Rhythm | Self::Keys => {
                InstrumentKind::FiveFret
            }
            Self::SixFretGuitar | Self::SixFretBass | Self::SixFretRhythm | Self::SixFretCoop => {
                InstrumentKind::SixFret
            }
            Self::Drums => InstrumentKind::Drums,
            Self::Vocals => InstrumentKind::Vocals,
        }
    }

    /// Position in [`Self::FRETTED`], `None` for drums and vocals.
    #[must_use]
    pub const fn fret_index(self) -> Option<usize> {
        match self.kind() {
            InstrumentKind::Drums | InstrumentKind::Vocals => None,
            InstrumentKind::FiveFret | InstrumentKind::SixFret => Some(self as usize),
        }
    }

    /// Resolves a MIDI track name such as `PART GUITAR`.
    #[must_use]
    pub fn from_midi_name(name: &str) -> Option<Self> {
        midi::INSTRUMENT_TRACKS.get(name).copied()
    }
}

/// A decoded chart.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SongChart {
    /// Tempos, time signatures and beats.
    pub sync: SyncTrack,
    /// Global text events other than sections.
    pub global_events: TextEvents,
    /// Practice section names by tick.
    pub sections: FlatMap<u64, String>,
    /// `[Song]` block of a `.chart`, merged with a sibling `song.ini` when loaded from disk.
    pub modifiers: IniSection,
    /// The resolved drums layout.
    pub drums_type: DrumsType,
    /// The drums track.
    pub drums: InstrumentTrack<DrumNote>,
    /// Vocal notes, lyrics and lyric lines.
    pub vocals: VocalTrack,
    fret_tracks: [InstrumentTrack<FretNote>; FRETTED_INSTRUMENTS],
}

impl SongChart {
    /// Creates an empty chart at `tick_rate` ticks per quarter note.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            sync: SyncTrack::new(tick_rate),
            global_events: TextEvents::new(),
            sections: FlatMap::new(),
            modifiers: IniSection::default(),
            drums_type: DrumsType::Unknown,
            drums: InstrumentTrack::new(),
            vocals: VocalTrack::new(),
            fret_tracks: std::array::from_fn(|_| InstrumentTrack::new()),
        }
    }

    /// The track of a fretted instrument. `None` for drums and vocals, see [`Self::drums`]
    /// and [`Self::vocals`].
    #[must_use]
    pub fn fret_track(&self, instrument: Instrument) -> Option<&InstrumentTrack<FretNote>> {
        self.fret_tracks.get(instrument.fret_index()?)
    }

    /// The track of a fretted instrument, mutably.
    pub fn fret_track_mut(
        &mut self,
        instrument: Instrument,
    ) -> Option<&mut InstrumentTrack<FretNote>> {
        self.fret_tracks.get_mut(instrument.fret_index()?)
    }

    /// Every fretted instrument that has notes.
    pub fn fret_tracks(&self) -> impl Iterator<Item = (Instrument, &InstrumentTrack<FretNote>)> {
        Instrument::FRETTED
            .into_iter()
            .zip(&self.fret_tracks)
            .filter(|(_, track)| !track.is_empty())
    }

    /// The last tick touched by any track or global event.
    #[must_use]
    pub fn last_tick(&self) -> u64 {
        self.fret_tracks
            .iter()
            .map(InstrumentTrack::last_tick)
            .chain([
                self.drums.last_tick(),
                self.vocals.last_tick(),
                self.global_events.last().map_or(0, |(&tick, _)| tick),
                self.sections.last().map_or(0, |(&tick, _)| tick),
            ])
            .max()
            .unwrap_or(0)
    }

    /// Completes the chart after decoding.
    ///
    /// Finalises the tempo map, closes and cuts sustains, prunes empty notes, resolves
    /// forcing and the drums layout, extends the beat grid through the last tick and
    /// releases spare capacity.
    pub fn finalize(&mut self, settings: &ParseSettings, format: SourceFormat) {
        let tick_rate = self.sync.tick_rate();
        let cutoff = settings.sustain_cutoff_for(format, tick_rate);
        let threshold = settings.hopo_threshold_for(format, tick_rate);
        self.sync.finalize_tempo_map();

        for track in &mut self.fret_tracks {
            track.finalize(cutoff);
            for difficulty in &mut track.difficulties {
                resolve_forcing(&mut difficulty.notes, threshold);
            }
        }
        self.drums_type = resolve_drums_type(&mut self.drums, settings.drums_type);
        self.drums.finalize(0);
        self.vocals.finalize();

        let last_tick = self.last_tick();
        self.sync.generate_leftover_beats(last_tick);

        self.sync.shrink_to_fit();
        self.global_events.shrink_to_fit();
        self.sections.shrink_to_fit();
    }

    /// Loads a `.mid`/`.midi` or `.chart` file, picking the format from its extension.
    ///
    /// A `song.ini` next to the file is read as well: its `[song]` entries are appended to
    /// [`Self::modifiers`] and override `settings` as in [`ParseSettings::apply_modifiers`].
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnknownFormat`] for any other extension, [`LoadError::Io`] if
    /// the file cannot be read and [`LoadError::Read`] if it is malformed.
    pub fn load_file(path: impl AsRef<Path>, settings: &ParseSettings) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)
            .ok_or_else(|| LoadError::UnknownFormat(path.display().to_string()))?;

        let ini = match path.parent().map(|dir| dir.join("song.ini")) {
            Some(ini_path) if ini_path.is_file() => {
                let buffer = OwnedBuffer::from_file(&ini_path)?;
                Some(IniFile::parse(buffer.as_slice()))
            }
            _ => None,
        };
        let mut settings = *settings;
        if let Some(song) = ini.as_ref().and_then(IniFile::song) {
            settings.apply_modifiers(song);
        }

        let buffer = OwnedBuffer::from_file(path)?;
        let mut chart = match format {
            SourceFormat::Midi => Self::from_midi(buffer.as_slice(), &settings)?,
            SourceFormat::DotChart => Self::from_dotchart(buffer.as_slice(), &settings)?,
        };
        if let Some(song) = ini.as_ref().and_then(IniFile::song) {
            for (key, value) in song.iter() {
                chart.modifiers.push(key, value);
            }
        }
        Ok(chart)
    }
}
