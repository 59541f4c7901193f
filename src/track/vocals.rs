//! Vocal notes, lyrics and lyric lines.
//!
//! Vocals have no difficulty split: one [`VocalTrack`] holds pitched notes, the lyric
//! syllables sung on them and the [`SpecialPhraseType::LyricLine`] spans that group
//! syllables into the lines shown on screen.

use super::{
    TextEvents, push_text_event,
    note::Sustain,
    phrase::{
        PhraseMap, PhraseTracker, SpecialPhraseType, close_open_phrases, last_phrase_tick,
        push_chart_phrase, push_phrase,
    },
};
use crate::{
    chart::{ChartEventType, ChartReader},
    error::Result,
    flat_map::FlatMap,
    midi::{MidiEventType, MidiReader},
    settings::ParseSettings,
    text::decode_text,
};

/// Lowest singable MIDI pitch.
pub const MIN_PITCH: u8 = 36;
/// Highest singable MIDI pitch.
pub const MAX_PITCH: u8 = 84;

const LYRIC_LINE_NOTES: [u8; 2] = [105, 106];
const PERCUSSION_NOTES: [u8; 2] = [96, 97];

const CHART_LYRIC_PREFIX: &str = "lyric ";
const CHART_PHRASE_START: &str = "phrase_start";
const CHART_PHRASE_END: &str = "phrase_end";

/// A sung note.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VocalNote {
    /// MIDI pitch, [`MIN_PITCH`] to [`MAX_PITCH`] in MIDI files.
    pub pitch: u8,
    /// How long the note is held.
    pub length: Sustain,
}

/// The vocal part of a song.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VocalTrack {
    /// Notes by tick.
    pub notes: FlatMap<u64, VocalNote>,
    /// Lyric syllables by tick.
    pub lyrics: FlatMap<u64, String>,
    /// Lyric lines and star power.
    pub phrases: PhraseMap,
    /// Other text events.
    pub events: TextEvents,
}

impl VocalTrack {
    /// Creates an empty track.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether there are neither notes nor lyrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.lyrics.is_empty()
    }

    /// Records the syllable sung at `tick`. A second syllable at the same tick replaces
    /// the first.
    pub fn set_lyric(&mut self, tick: u64, text: impl Into<String>) {
        *self.lyrics.get_or_add_back(tick, String::new) = text.into();
    }

    /// The last tick touched by a note, lyric, phrase or event.
    #[must_use]
    pub fn last_tick(&self) -> u64 {
        [
            self.notes
                .iter()
                .map(|(&tick, note)| tick + note.length.length())
                .max()
                .unwrap_or(0),
            self.lyrics.last().map_or(0, |(&tick, _)| tick),
            self.events.last().map_or(0, |(&tick, _)| tick),
            last_phrase_tick(&self.phrases),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Closes open notes and phrases at zero length and releases spare capacity.
    pub fn finalize(&mut self) {
        for note in self.notes.values_mut() {
            note.length = Sustain::Closed(note.length.length());
        }
        close_open_phrases(&mut self.phrases);
        self.notes.shrink_to_fit();
        self.lyrics.shrink_to_fit();
        self.phrases.shrink_to_fit();
        self.events.shrink_to_fit();
    }
}

/// Stateful decoder of a MIDI vocals track.
#[derive(Debug, Default, Clone)]
pub struct MidiVocalsDecoder {
    open_note: Option<(u64, u8)>,
    phrases: PhraseTracker,
    star_power_note: u8,
}

impl MidiVocalsDecoder {
    /// Creates a decoder with nothing open.
    #[must_use]
    pub fn new(settings: &ParseSettings) -> Self {
        Self {
            star_power_note: settings.star_power_note,
            ..Self::default()
        }
    }

    fn phrase_of(&self, value: u8) -> Option<SpecialPhraseType> {
        if value == self.star_power_note {
            Some(SpecialPhraseType::StarPower)
        } else if LYRIC_LINE_NOTES.contains(&value) {
            Some(SpecialPhraseType::LyricLine)
        } else {
            None
        }
    }

    /// Handles a note-on. A pitch that starts while another is held ends the held one.
    pub fn note_on(&mut self, track: &mut VocalTrack, tick: u64, value: u8) {
        if (MIN_PITCH..=MAX_PITCH).contains(&value) {
            if let Some((_, pitch)) = self.open_note {
                self.note_off(track, tick, pitch);
            }
            *track.notes.get_or_add_back(tick, VocalNote::default) = VocalNote {
                pitch: value,
                length: Sustain::Open,
            };
            self.open_note = Some((tick, value));
        } else if let Some(kind) = self.phrase_of(value) {
            self.phrases.start(&mut track.phrases, kind, tick);
        } else if PERCUSSION_NOTES.contains(&value) {
            log::trace!("ignored vocal percussion at tick {tick}");
        } else {
            log::trace!("ignored vocals note {value} at tick {tick}");
        }
    }

    /// Handles a note-off.
    pub fn note_off(&mut self, track: &mut VocalTrack, tick: u64, value: u8) {
        if (MIN_PITCH..=MAX_PITCH).contains(&value) {
            let Some((start, pitch)) = self.open_note else {
                log::trace!("vocal note-off {value} at tick {tick} without a note-on");
                return;
            };
            if pitch != value {
                return;
            }
            self.open_note = None;
            if let Some(note) = track.notes.get_mut(&start) {
                note.length = Sustain::Closed(tick.saturating_sub(start));
            }
        } else if let Some(kind) = self.phrase_of(value) {
            self.phrases.end(&mut track.phrases, kind, tick);
        }
    }

    /// Handles a text or lyric event: bracketed text is an event, anything else a lyric.
    pub fn text(&mut self, track: &mut VocalTrack, tick: u64, text: &str) {
        if text.starts_with('[') {
            push_text_event(&mut track.events, tick, text);
        } else {
            track.set_lyric(tick, text);
        }
    }
}

/// Decodes a MIDI vocals track from the reader's current track.
///
/// # Errors
///
/// Propagates the errors of [`MidiReader::try_parse_event`] and the payload extractors.
pub fn decode_midi(
    reader: &mut MidiReader<'_>,
    settings: &ParseSettings,
    track: &mut VocalTrack,
) -> Result<()> {
    let mut decoder = MidiVocalsDecoder::new(settings);
    while let Some(event) = reader.try_parse_event()? {
        match event.kind {
            MidiEventType::NoteOn | MidiEventType::NoteOff => {
                let note = reader.extract_note()?;
                if note.is_on(event.kind) {
                    decoder.note_on(track, event.tick, note.value);
                } else {
                    decoder.note_off(track, event.tick, note.value);
                }
            }
            MidiEventType::Text | MidiEventType::Lyric => {
                let text = decode_text(reader.extract_text());
                decoder.text(track, event.tick, text.trim());
            }
            _ => {}
        }
    }
    Ok(())
}

/// Decodes a `.chart` vocals block until its end.
///
/// `L` carries a syllable, `V <pitch> <length>` a note, `VP <length>` a lyric line and
/// `S 2 <length>` star power.
///
/// # Errors
///
/// Propagates the errors of [`ChartReader::next_event`] and the payload extractors.
pub fn decode_chart(reader: &mut ChartReader<'_>, track: &mut VocalTrack) -> Result<()> {
    while let Some((tick, kind)) = reader.next_event()? {
        match kind {
            ChartEventType::Lyric => track.set_lyric(tick, reader.extract_text()),
            ChartEventType::VocalNote => {
                let (pitch, length) = reader.extract_vocal_note()?;
                *track.notes.get_or_add_back(tick, VocalNote::default) = VocalNote {
                    pitch,
                    length: Sustain::Closed(length),
                };
            }
            ChartEventType::VocalPhrase => {
                let length = reader.extract_length()?;
                push_phrase(&mut track.phrases, tick, SpecialPhraseType::LyricLine, length);
            }
            ChartEventType::Special => {
                let (value, length) = reader.extract_lane_and_sustain()?;
                push_chart_phrase(&mut track.phrases, tick, value, length);
            }
            ChartEventType::Text => push_text_event(&mut track.events, tick, reader.extract_text()),
            _ => {}
        }
    }
    Ok(())
}

/// Lyric events of a `.chart` `[Events]` block: `lyric X`, `phrase_start` and
/// `phrase_end`.
#[derive(Debug, Default, Clone)]
pub struct ChartLyricEvents {
    lines: PhraseTracker,
}

impl ChartLyricEvents {
    /// Creates a reader with no line open.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `text` to `track` if it is a lyric event. Returns `false` otherwise.
    ///
    /// A `phrase_start` while a line is open ends that line first.
    pub fn handle(&mut self, track: &mut VocalTrack, tick: u64, text: &str) -> bool {
        if let Some(lyric) = text.strip_prefix(CHART_LYRIC_PREFIX) {
            track.set_lyric(tick, lyric.trim());
            return true;
        }
        match text.trim() {
            CHART_PHRASE_START => {
                self.lines
                    .end(&mut track.phrases, SpecialPhraseType::LyricLine, tick);
                self.lines
                    .start(&mut track.phrases, SpecialPhraseType::LyricLine, tick);
                true
            }
            CHART_PHRASE_END => {
                self.lines
                    .end(&mut track.phrases, SpecialPhraseType::LyricLine, tick);
                true
            }
            _ => false,
        }
    }
}
