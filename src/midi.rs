//! Standard MIDI file tokenizer.
//!
//! [`MidiReader`] validates the `MThd` chunk, then walks `MTrk` chunks one event at a time.
//! Each track and each event payload is entered as a bounded section of the underlying
//! [`BinaryCursor`], so a corrupt length can never read past its track.

pub mod event;

use crate::{
    binary::{BinaryCheckpoint, BinaryCursor},
    error::{ReadError, Result},
    sync::TimeSig,
};

pub use self::event::{MidiEvent, MidiEventType, MidiNote, PhaseShiftKind, PhaseShiftSysEx};

const HEADER_TAG: &[u8; 4] = b"MThd";
const TRACK_TAG: &[u8; 4] = b"MTrk";

/// The fields of the `MThd` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiHeader {
    /// SMF format 0, 1 or 2.
    pub format: u16,
    /// Number of `MTrk` chunks announced.
    pub num_tracks: u16,
    /// Ticks per quarter note.
    pub tick_rate: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct TrackState {
    tick: u64,
    running_status: Option<u8>,
    status: u8,
    in_event: bool,
    in_track: bool,
}

/// A tokenizer over a MIDI file held in memory.
#[derive(Debug, Clone)]
pub struct MidiReader<'a> {
    cursor: BinaryCursor<'a>,
    header: MidiHeader,
    state: TrackState,
    track_name: Option<&'a [u8]>,
    track_number: u16,
}

fn read_tag(cursor: &mut BinaryCursor<'_>, expected: &'static [u8; 4]) -> Result<()> {
    let position = cursor.position();
    let found = cursor.read_bytes(4)?;
    if found == expected {
        return Ok(());
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(found);
    Err(ReadError::InvalidChunkTag {
        position,
        expected: std::str::from_utf8(expected).unwrap_or_default(),
        found: bytes,
    })
}

impl<'a> MidiReader<'a> {
    /// Reads the `MThd` chunk of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidChunkTag`] if the file does not start with `MThd`,
    /// [`ReadError::InvalidTickRate`] for a zero or SMPTE division, and
    /// [`ReadError::TruncatedData`] if the header is cut short.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut cursor = BinaryCursor::new(data);
        read_tag(&mut cursor, HEADER_TAG)?;
        let length = cursor.read_be::<u32>()? as usize;
        cursor.enter_section(length)?;
        let format = cursor.read_be::<u16>()?;
        let num_tracks = cursor.read_be::<u16>()?;
        let tick_rate = cursor.read_be::<u16>()?;
        cursor.exit_section()?;
        if tick_rate == 0 || tick_rate & 0x8000 != 0 {
            return Err(ReadError::InvalidTickRate(u32::from(tick_rate)));
        }
        log::debug!("MIDI format {format}, {num_tracks} tracks, {tick_rate} ticks per quarter");
        Ok(Self {
            cursor,
            header: MidiHeader {
                format,
                num_tracks,
                tick_rate,
            },
            state: TrackState::default(),
            track_name: None,
            track_number: 0,
        })
    }

    /// The header fields.
    #[must_use]
    pub const fn header(&self) -> MidiHeader {
        self.header
    }

    /// Ticks per quarter note.
    #[must_use]
    pub const fn tick_rate(&self) -> u16 {
        self.header.tick_rate
    }

    /// Number of tracks started so far.
    #[must_use]
    pub const fn track_number(&self) -> u16 {
        self.track_number
    }

    /// The name of the current track, if its first event was a track name.
    #[must_use]
    pub const fn track_name(&self) -> Option<&'a [u8]> {
        self.track_name
    }

    /// Moves to the next `MTrk` chunk. Returns `false` when there are no more tracks.
    ///
    /// If the first event is a track name it is consumed and exposed through
    /// [`Self::track_name`]; otherwise the cursor is rolled back so the caller still sees
    /// that event.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidChunkTag`] if the next chunk is not `MTrk`, or the
    /// errors of [`Self::try_parse_event`] for the first event.
    pub fn start_track(&mut self) -> Result<bool> {
        self.close_event()?;
        if self.state.in_track {
            self.cursor.exit_section()?;
            self.state.in_track = false;
        }
        if self.cursor.is_at_boundary() {
            return Ok(false);
        }

        read_tag(&mut self.cursor, TRACK_TAG)?;
        let length = self.cursor.read_be::<u32>()? as usize;
        self.cursor.enter_section(length)?;
        self.state = TrackState {
            in_track: true,
            ..TrackState::default()
        };
        self.track_name = None;
        self.track_number += 1;

        let checkpoint: (BinaryCheckpoint, TrackState) = (self.cursor.save_checkpoint(), self.state);
        match self.try_parse_event()? {
            Some(event) if event.kind == MidiEventType::TrackName => {
                self.track_name = Some(self.extract_text());
            }
            _ => {
                self.cursor.restore_checkpoint(checkpoint.0);
                self.state = checkpoint.1;
            }
        }
        Ok(true)
    }

    fn close_event(&mut self) -> Result<()> {
        if self.state.in_event {
            self.cursor.exit_section()?;
            self.state.in_event = false;
        }
        Ok(())
    }

    /// Decodes the next event header and enters its payload.
    ///
    /// Returns `None` at the End-Of-Track meta event (or the end of the chunk).
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::MissingRunningStatus`] for a data byte with no channel status to
    /// reuse, [`ReadError::MalformedVarint`] for an oversized delta or length, and
    /// [`ReadError::InvalidSectionNesting`] if the payload overruns the track.
    pub fn try_parse_event(&mut self) -> Result<Option<MidiEvent>> {
        self.close_event()?;
        if !self.state.in_track || self.cursor.is_at_boundary() {
            return Ok(None);
        }

        let delta = self.cursor.read_vlq()?;
        self.state.tick += u64::from(delta);

        let position = self.cursor.position();
        let status = match self.cursor.peek_u8() {
            Some(byte) if byte < 0x80 => self
                .state
                .running_status
                .ok_or(ReadError::MissingRunningStatus { position })?,
            _ => {
                let byte = self.cursor.read_u8()?;
                if (0x80..0xF0).contains(&byte) {
                    self.state.running_status = Some(byte);
                }
                byte
            }
        };
        self.state.status = status;

        let (kind, length) = match status {
            0x80..=0xEF => {
                let kind = MidiEventType::from_channel_status(status)
                    .ok_or(ReadError::MissingRunningStatus { position })?;
                (kind, kind.channel_payload_len())
            }
            0xFF => {
                let meta = self.cursor.read_u8()?;
                let length = self.cursor.read_vlq()? as usize;
                (MidiEventType::from_meta_type(meta), length)
            }
            0xF0 => (MidiEventType::SysEx, self.cursor.read_vlq()? as usize),
            0xF7 => (MidiEventType::SysExEnd, self.cursor.read_vlq()? as usize),
            0xF2 => (MidiEventType::SongPosition, 2),
            0xF3 => (MidiEventType::SongSelect, 1),
            other => (MidiEventType::System(other), 0),
        };

        self.cursor.enter_section(length)?;
        self.state.in_event = true;

        if kind == MidiEventType::EndOfTrack {
            self.close_event()?;
            self.cursor.exit_section()?;
            self.state.in_track = false;
            return Ok(None);
        }

        Ok(Some(MidiEvent {
            tick: self.state.tick,
            kind,
            channel: if status < 0xF0 { status & 0x0F } else { 0 },
            length,
        }))
    }

    /// Reads the payload of a note on / note off.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if the payload is shorter than two bytes.
    pub fn extract_note(&mut self) -> Result<MidiNote> {
        let value = self.cursor.read_u8()?;
        let velocity = self.cursor.read_u8()?;
        Ok(MidiNote { value, velocity })
    }

    /// Reads the controller number and value of a control change.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if the payload is shorter than two bytes.
    pub fn extract_control(&mut self) -> Result<(u8, u8)> {
        Ok((self.cursor.read_u8()?, self.cursor.read_u8()?))
    }

    /// The remaining payload of a text meta event.
    pub fn extract_text(&mut self) -> &'a [u8] {
        self.cursor.read_remaining()
    }

    /// The remaining payload of a SysEx event.
    pub fn extract_sysex(&mut self) -> &'a [u8] {
        self.cursor.read_remaining()
    }

    /// Reads the three-byte tempo of a tempo meta event.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if the payload is shorter than three bytes.
    pub fn extract_microseconds(&mut self) -> Result<u32> {
        let bytes = self.cursor.read_bytes(3)?;
        Ok(bytes
            .iter()
            .fold(0u32, |value, &byte| (value << 8) | u32::from(byte)))
    }

    /// Reads a time signature meta event.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if the payload is shorter than four bytes.
    pub fn extract_time_sig(&mut self) -> Result<TimeSig> {
        Ok(TimeSig {
            numerator: u32::from(self.cursor.read_u8()?),
            denominator: self.cursor.read_u8()?,
            metronome: self.cursor.read_u8()?,
            thirty_seconds: self.cursor.read_u8()?,
        })
    }
}
