//! Assembles a [`SongChart`] from a standard MIDI file.
//!
//! The first track is the tempo map. Every other track is dispatched by its name:
//! `EVENTS` holds sections and global text, `BEAT` holds the authored beat grid and
//! `PART ...` tracks hold notes and lyrics. Tracks with any other name are skipped.

use phf::phf_map;

use super::{Instrument, InstrumentKind, SongChart};
use crate::{
    error::Result,
    midi::{MidiEventType, MidiReader},
    settings::{ParseSettings, SourceFormat},
    sync::{BeatStyle, SyncTrack},
    text::decode_text,
    track::{
        drums,
        fret::{self, FiveFret, SixFret},
        push_text_event, vocals,
    },
};

/// Instrument tracks by MIDI track name.
pub static INSTRUMENT_TRACKS: phf::Map<&'static str, Instrument> = phf_map! {
    "PART GUITAR" => Instrument::Guitar,
    "PART GUITAR COOP" => Instrument::GuitarCoop,
    "PART BASS" => Instrument::Bass,
    "PART RHYTHM" => Instrument::Rhythm,
    "PART KEYS" => Instrument::Keys,
    "PART GUITAR GHL" => Instrument::SixFretGuitar,
    "PART BASS GHL" => Instrument::SixFretBass,
    "PART RHYTHM GHL" => Instrument::SixFretRhythm,
    "PART GUITAR COOP GHL" => Instrument::SixFretCoop,
    "PART DRUMS" => Instrument::Drums,
    "PART VOCALS" => Instrument::Vocals,
};

const EVENTS_TRACK: &str = "EVENTS";
const BEAT_TRACK: &str = "BEAT";

const BEAT_MEASURE_NOTE: u8 = 12;
const BEAT_STRONG_NOTE: u8 = 13;

/// The section name carried by `[section Name]` or `[prc_name]`.
fn section_name(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    inner
        .strip_prefix("section ")
        .or_else(|| inner.strip_prefix("prc_"))
        .map(str::trim)
}

fn read_sync(reader: &mut MidiReader<'_>, sync: &mut SyncTrack) -> Result<()> {
    while let Some(event) = reader.try_parse_event()? {
        match event.kind {
            MidiEventType::Tempo => sync.add_tempo(event.tick, reader.extract_microseconds()?),
            MidiEventType::TimeSig => sync.add_time_sig(event.tick, reader.extract_time_sig()?),
            _ => {}
        }
    }
    Ok(())
}

fn read_beats(reader: &mut MidiReader<'_>, sync: &mut SyncTrack) -> Result<()> {
    while let Some(event) = reader.try_parse_event()? {
        if !event.kind.is_note() {
            continue;
        }
        let note = reader.extract_note()?;
        if !note.is_on(event.kind) {
            continue;
        }
        match note.value {
            BEAT_MEASURE_NOTE => sync.add_beat(event.tick, BeatStyle::Measure),
            BEAT_STRONG_NOTE => sync.add_beat(event.tick, BeatStyle::Strong),
            value => log::trace!("ignored beat note {value} at tick {}", event.tick),
        }
    }
    Ok(())
}

impl SongChart {
    /// Decodes and finalises a MIDI chart.
    ///
    /// # Errors
    ///
    /// Returns any [`crate::error::ReadError`] raised by the MIDI reader. A malformed track
    /// aborts the whole chart.
    pub fn from_midi(data: &[u8], settings: &ParseSettings) -> Result<Self> {
        let mut reader = MidiReader::new(data)?;
        let mut chart = Self::new(u32::from(reader.tick_rate()));

        if reader.start_track()? {
            read_sync(&mut reader, &mut chart.sync)?;
        }
        while reader.start_track()? {
            let Some(name) = reader.track_name().map(decode_text) else {
                log::debug!("skipping unnamed track {}", reader.track_number());
                continue;
            };
            log::debug!("track {} `{name}`", reader.track_number());
            match name.as_ref() {
                EVENTS_TRACK => chart.read_midi_events(&mut reader)?,
                BEAT_TRACK => read_beats(&mut reader, &mut chart.sync)?,
                other => match Instrument::from_midi_name(other) {
                    Some(instrument) => chart.read_instrument(&mut reader, instrument, settings)?,
                    None => log::warn!("skipping unknown MIDI track `{other}`"),
                },
            }
        }

        chart.finalize(settings, SourceFormat::Midi);
        Ok(chart)
    }

    fn read_midi_events(&mut self, reader: &mut MidiReader<'_>) -> Result<()> {
        while let Some(event) = reader.try_parse_event()? {
            if !event.kind.is_text() {
                continue;
            }
            let text = decode_text(reader.extract_text());
            match section_name(&text) {
                Some(name) => {
                    *self.sections.get_or_add_back(event.tick, String::new) = name.to_owned();
                }
                None => push_text_event(&mut self.global_events, event.tick, text),
            }
        }
        Ok(())
    }

    fn read_instrument(
        &mut self,
        reader: &mut MidiReader<'_>,
        instrument: Instrument,
        settings: &ParseSettings,
    ) -> Result<()> {
        if instrument.kind() == InstrumentKind::Drums {
            if !self.drums.is_empty() {
                log::debug!("skipping duplicate drums track");
                return Ok(());
            }
            return drums::decode_midi(reader, settings, &mut self.drums);
        }
        if instrument.kind() == InstrumentKind::Vocals {
            if !self.vocals.is_empty() {
                log::debug!("skipping duplicate vocals track");
                return Ok(());
            }
            return vocals::decode_midi(reader, settings, &mut self.vocals);
        }
        let Some(track) = self.fret_track_mut(instrument) else {
            return Ok(());
        };
        if !track.is_empty() {
            log::debug!("skipping duplicate {instrument:?} track");
            return Ok(());
        }
        match instrument.kind() {
            InstrumentKind::SixFret => fret::decode_midi::<SixFret>(reader, settings, track),
            _ => fret::decode_midi::<FiveFret>(reader, settings, track),
        }
    }
}
