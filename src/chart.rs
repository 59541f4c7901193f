//! `.chart` tokenizer.
//!
//! A `.chart` file is a list of `[Section]` blocks wrapped in braces. Inside a block every
//! line reads `<tick> = <tag> <payload...>`. [`ChartReader::next_section`] resolves the
//! header and selects the tag table of that section, [`ChartReader::next_event`] yields
//! `(tick, type)` pairs, and the payload is read afterwards by the `extract_*` method
//! matching the type.

pub mod tags;

use std::borrow::Cow;

use crate::{
    error::{ReadError, Result},
    ini::IniSection,
    song::Instrument,
    sync::{DENOMINATOR_INHERIT, TimeSig},
    text::{decode_text, line::LineReader},
    track::Difficulty,
};

/// Ticks per quarter note when `[Song]` gives no `Resolution`.
pub const DEFAULT_RESOLUTION: u32 = 192;

/// The semantic type of a chart event tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChartEventType {
    /// `B`, a tempo in thousandths of a beat per minute.
    Bpm,
    /// `TS`, a time signature numerator with an optional denominator exponent.
    TimeSig,
    /// `A`, an explicit anchor in microseconds.
    Anchor,
    /// `E`, a text event.
    Text,
    /// `N`, a note lane and its sustain.
    Note,
    /// `S`, a special phrase type and its length.
    Special,
    /// `L`, a lyric syllable.
    Lyric,
    /// `V`, a vocal pitch and its length.
    VocalNote,
    /// `VP`, the length of a lyric line.
    VocalPhrase,
    /// Any tag not known in the current section.
    Unknown,
}

/// A resolved section header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChartSection {
    /// `[Song]`, the metadata block.
    Song,
    /// `[SyncTrack]`, tempos, anchors and time signatures.
    SyncTrack,
    /// `[Events]`, global text events.
    Events,
    /// A `[<Difficulty><Instrument>]` note track.
    Instrument(Instrument, Difficulty),
    /// Any other section, by name.
    Other(String),
}

type TagTable = phf::Map<&'static str, ChartEventType>;

/// A tokenizer over a `.chart` file held in memory.
#[derive(Debug, Clone)]
pub struct ChartReader<'a> {
    reader: LineReader<'a>,
    tags: Option<&'static TagTable>,
    tick: u64,
    in_event: bool,
}

impl<'a> ChartReader<'a> {
    /// Creates a reader at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: LineReader::new(data),
            tags: None,
            tick: 0,
            in_event: false,
        }
    }

    /// The tick of the last event returned.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Reads the next `[Section]` header and enters its block.
    ///
    /// Returns `None` at the end of the file.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidHeader`] if the current line is not a header.
    pub fn next_section(&mut self) -> Result<Option<ChartSection>> {
        self.in_event = false;
        if self.reader.is_end_of_data() {
            return Ok(None);
        }
        let position = self.reader.position();
        let line = self.reader.peek_line();
        let [b'[', name @ .., b']'] = line else {
            return Err(ReadError::InvalidHeader {
                position,
                message: format!("expected `[Section]`, found `{}`", decode_text(line)),
            });
        };
        let name = decode_text(name);
        log::debug!("chart section [{name}]");
        let section = match name.as_ref() {
            "Song" => ChartSection::Song,
            "SyncTrack" => ChartSection::SyncTrack,
            "Events" => ChartSection::Events,
            other => tags::instrument_track(other).map_or_else(
                || ChartSection::Other(other.to_owned()),
                |(instrument, difficulty)| ChartSection::Instrument(instrument, difficulty),
            ),
        };
        self.tags = match section {
            ChartSection::SyncTrack => Some(&tags::SYNC_TRACK_TAGS),
            ChartSection::Events => Some(&tags::EVENTS_TAGS),
            ChartSection::Instrument(Instrument::Vocals, _) => Some(&tags::VOCALS_TAGS),
            ChartSection::Instrument(..) => Some(&tags::INSTRUMENT_TAGS),
            ChartSection::Song | ChartSection::Other(_) => None,
        };
        self.tick = 0;
        self.reader.goto_next_line();
        Ok(Some(section))
    }

    /// Reads the tick and tag of the next event line.
    ///
    /// Returns `None` after consuming the closing `}` of the block. A tag that the current
    /// section does not know yields [`ChartEventType::Unknown`]; its payload is skipped by
    /// the next call.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if the line does not start with a tick and
    /// [`ReadError::OutOfOrderTick`] if the tick is lower than the previous one.
    pub fn next_event(&mut self) -> Result<Option<(u64, ChartEventType)>> {
        if self.in_event {
            self.reader.goto_next_line();
            self.in_event = false;
        }
        if self.reader.is_end_of_data() {
            return Ok(None);
        }
        if self.reader.peek_line() == b"}" {
            self.reader.goto_next_line();
            return Ok(None);
        }

        let tick = self.reader.read_integer::<u64>("event tick")?;
        if tick < self.tick {
            return Err(ReadError::OutOfOrderTick {
                previous: self.tick,
                found: tick,
            });
        }
        self.tick = tick;

        let tag = self.reader.read_alphabetic();
        let kind = std::str::from_utf8(tag)
            .ok()
            .and_then(|tag| self.tags?.get(tag))
            .copied()
            .unwrap_or(ChartEventType::Unknown);
        if kind == ChartEventType::Unknown {
            log::trace!("unknown chart tag `{}` at tick {tick}", decode_text(tag));
        }
        self.in_event = true;
        Ok(Some((tick, kind)))
    }

    /// Reads the `<lane> <length>` payload of an `N` or `S` event.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if either number is missing.
    pub fn extract_lane_and_sustain(&mut self) -> Result<(u32, u64)> {
        let lane = self.reader.read_integer::<u32>("lane")?;
        let sustain = self.reader.read_integer::<u64>("sustain")?;
        Ok((lane, sustain))
    }

    /// Reads the `<pitch> <length>` payload of a `V` event.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if either number is missing.
    pub fn extract_vocal_note(&mut self) -> Result<(u8, u64)> {
        let pitch = self.reader.read_integer::<u8>("pitch")?;
        let length = self.reader.read_integer::<u64>("length")?;
        Ok((pitch, length))
    }

    /// Reads the `<length>` payload of a `VP` event.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if the number is missing.
    pub fn extract_length(&mut self) -> Result<u64> {
        self.reader.read_integer("length")
    }

    /// Reads a `B` payload and converts it to microseconds per quarter note.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if the number is missing.
    pub fn extract_microseconds(&mut self) -> Result<u32> {
        let milli_bpm = self.reader.read_integer::<u64>("tempo")?;
        if milli_bpm == 0 {
            return Ok(0);
        }
        Ok((60e9 / milli_bpm as f64).round() as u32)
    }

    /// Reads an `A` payload in microseconds.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if the number is missing.
    pub fn extract_anchor(&mut self) -> Result<u64> {
        self.reader.read_integer("anchor")
    }

    /// Reads a `TS` payload. A missing exponent inherits the previous denominator.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if the numerator is missing.
    pub fn extract_time_sig(&mut self) -> Result<TimeSig> {
        let numerator = self.reader.read_integer::<u32>("numerator")?;
        let denominator = self
            .reader
            .try_read_integer::<u8>()
            .map_or(DENOMINATOR_INHERIT, |exponent| exponent.min(DENOMINATOR_INHERIT - 1));
        Ok(TimeSig::new(numerator, denominator))
    }

    /// Reads the rest of the line as text, without wrapping quotes.
    pub fn extract_text(&mut self) -> Cow<'a, str> {
        self.reader.extract_encoded_string(true)
    }

    /// Skips to the line after the closing `}` of the current block.
    ///
    /// Only a line holding nothing but `}` closes the block, so braces inside text
    /// payloads are not mistaken for it.
    pub fn skip_track(&mut self) {
        self.in_event = false;
        while !self.reader.is_end_of_data() {
            let closing = self.reader.peek_line() == b"}";
            self.reader.goto_next_line();
            if closing {
                return;
            }
        }
    }

    /// Reads the `key = value` lines of a `[Song]` block through to its closing `}`.
    pub fn extract_song_modifiers(&mut self) -> IniSection {
        self.in_event = false;
        let mut modifiers = IniSection::default();
        while !self.reader.is_end_of_data() {
            if self.reader.peek_line() == b"}" {
                self.reader.goto_next_line();
                break;
            }
            let key = decode_text(self.reader.read_key()).into_owned();
            let value = self.reader.extract_encoded_string(true).into_owned();
            if !key.is_empty() {
                modifiers.push(key, value);
            }
            self.reader.goto_next_line();
        }
        modifiers
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const CHART: &[u8] = b"\xEF\xBB\xBF[Song]\r\n{\r\n  Name = \"Test Song\"\r\n  Resolution = 480\r\n}\r\n\
[SyncTrack]\r\n{\r\n  0 = TS 4\r\n  0 = B 120000\r\n  960 = TS 6 3\r\n  960 = A 1000000\r\n}\r\n\
[Events]\r\n{\r\n  0 = E \"section Intro\"\r\n  100 = E \"}\"\r\n}\r\n\
[ExpertSingle]\r\n{\r\n  768 = N 5 480\r\n  768 = Q 1 2\r\n  800 = S 2 100\r\n}\r\n";

    #[test]
    fn reads_all_sections() {
        let mut reader = ChartReader::new(CHART);

        assert_eq!(reader.next_section().unwrap(), Some(ChartSection::Song));
        let modifiers = reader.extract_song_modifiers();
        assert_eq!(modifiers.get_str("name"), Some("Test Song"));
        assert_eq!(modifiers.get_u64("resolution"), Some(480));

        assert_eq!(reader.next_section().unwrap(), Some(ChartSection::SyncTrack));
        assert_eq!(reader.next_event().unwrap(), Some((0, ChartEventType::TimeSig)));
        assert_eq!(reader.extract_time_sig().unwrap(), TimeSig::new(4, DENOMINATOR_INHERIT));
        assert_eq!(reader.next_event().unwrap(), Some((0, ChartEventType::Bpm)));
        assert_eq!(reader.extract_microseconds().unwrap(), 500_000);
        assert_eq!(reader.next_event().unwrap(), Some((960, ChartEventType::TimeSig)));
        assert_eq!(reader.extract_time_sig().unwrap(), TimeSig::new(6, 3));
        assert_eq!(reader.next_event().unwrap(), Some((960, ChartEventType::Anchor)));
        assert_eq!(reader.extract_anchor().unwrap(), 1_000_000);
        assert_eq!(reader.next_event().unwrap(), None);

        assert_eq!(reader.next_section().unwrap(), Some(ChartSection::Events));
        assert_eq!(reader.next_event().unwrap(), Some((0, ChartEventType::Text)));
        assert_eq!(reader.extract_text(), "section Intro");
        assert_eq!(reader.next_event().unwrap(), Some((100, ChartEventType::Text)));
        assert_eq!(reader.next_event().unwrap(), None);

        assert_eq!(
            reader.next_section().unwrap(),
            Some(ChartSection::Instrument(Instrument::Guitar, Difficulty::Expert))
        );
        assert_eq!(reader.next_event().unwrap(), Some((768, ChartEventType::Note)));
        assert_eq!(reader.extract_lane_and_sustain().unwrap(), (5, 480));
        assert_eq!(reader.next_event().unwrap(), Some((768, ChartEventType::Unknown)));
        assert_eq!(reader.next_event().unwrap(), Some((800, ChartEventType::Special)));
        assert_eq!(reader.next_event().unwrap(), None);
        assert_eq!(reader.next_section().unwrap(), None);
    }

    #[test]
    fn rejects_decreasing_tick() {
        let mut reader = ChartReader::new(b"[ExpertSingle]\n{\n100 = N 0 0\n50 = N 1 0\n}\n");
        reader.next_section().unwrap();
        reader.next_event().unwrap();
        assert_eq!(
            reader.next_event(),
            Err(ReadError::OutOfOrderTick {
                previous: 100,
                found: 50,
            })
        );
    }

    #[test]
    fn skip_track_ignores_braces_in_text() {
        let data = b"[ExpertCustom]\n{\n0 = E \"}\"\n  }  \n[Events]\n{\n}\n";
        let mut reader = ChartReader::new(data);
        assert_eq!(
            reader.next_section().unwrap(),
            Some(ChartSection::Other("ExpertCustom".to_owned()))
        );
        reader.skip_track();
        assert_eq!(reader.next_section().unwrap(), Some(ChartSection::Events));
        assert_eq!(reader.next_event().unwrap(), None);
    }

    #[test]
    fn vocals_section_has_its_own_tags() {
        let mut reader = ChartReader::new(b"[HardVocals]\n{\n0 = VP 480\n0 = V 64 120\n0 = N 1 0\n}\n");
        assert_eq!(
            reader.next_section().unwrap(),
            Some(ChartSection::Instrument(Instrument::Vocals, Difficulty::Hard))
        );
        assert_eq!(reader.next_event().unwrap(), Some((0, ChartEventType::VocalPhrase)));
        assert_eq!(reader.extract_length().unwrap(), 480);
        assert_eq!(reader.next_event().unwrap(), Some((0, ChartEventType::VocalNote)));
        assert_eq!(reader.extract_vocal_note().unwrap(), (64, 120));
        assert_eq!(reader.next_event().unwrap(), Some((0, ChartEventType::Unknown)));
        assert_eq!(reader.next_event().unwrap(), None);
    }

    #[test]
    fn missing_header_is_an_error() {
        let mut reader = ChartReader::new(b"0 = B 120000\n");
        assert!(matches!(
            reader.next_section(),
            Err(ReadError::InvalidHeader { position: 0, .. })
        ));
    }

    #[test]
    fn missing_payload_is_an_error() {
        let mut reader = ChartReader::new(b"[ExpertSingle]\n{\n0 = N 3\n}\n");
        reader.next_section().unwrap();
        reader.next_event().unwrap();
        assert!(matches!(
            reader.extract_lane_and_sustain(),
            Err(ReadError::ExpectedValue {
                expected: "sustain",
                ..
            })
        ));
    }
}
