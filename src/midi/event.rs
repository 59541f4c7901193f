//! MIDI event kinds and payload types.

/// The kind of a decoded MIDI event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MidiEventType {
    /// `0x8n`
    NoteOff,
    /// `0x9n`
    NoteOn,
    /// `0xAn`
    KeyPressure,
    /// `0xBn`
    ControlChange,
    /// `0xCn`
    ProgramChange,
    /// `0xDn`
    ChannelPressure,
    /// `0xEn`
    PitchWheel,
    /// `0xF0`
    SysEx,
    /// `0xF7`, a continuation or escape packet.
    SysExEnd,
    /// `0xF2`
    SongPosition,
    /// `0xF3`
    SongSelect,
    /// Any other system byte, carrying no payload.
    System(u8),
    /// Meta `0x00`
    SequenceNumber,
    /// Meta `0x01`
    Text,
    /// Meta `0x02`
    Copyright,
    /// Meta `0x03`
    TrackName,
    /// Meta `0x04`
    InstrumentName,
    /// Meta `0x05`
    Lyric,
    /// Meta `0x06`
    Marker,
    /// Meta `0x07`
    CuePoint,
    /// Meta `0x08..=0x0F`, text events without a standard meaning.
    OtherText(u8),
    /// Meta `0x20`
    ChannelPrefix,
    /// Meta `0x2F`
    EndOfTrack,
    /// Meta `0x51`
    Tempo,
    /// Meta `0x54`
    SmpteOffset,
    /// Meta `0x58`
    TimeSig,
    /// Meta `0x59`
    KeySig,
    /// Meta `0x7F`
    SequencerSpecific,
    /// Any other meta type.
    UnknownMeta(u8),
}

impl MidiEventType {
    /// Classifies a channel-voice status byte (`0x80..=0xEF`).
    #[must_use]
    pub const fn from_channel_status(status: u8) -> Option<Self> {
        Some(match status & 0xF0 {
            0x80 => Self::NoteOff,
            0x90 => Self::NoteOn,
            0xA0 => Self::KeyPressure,
            0xB0 => Self::ControlChange,
            0xC0 => Self::ProgramChange,
            0xD0 => Self::ChannelPressure,
            0xE0 => Self::PitchWheel,
            _ => return None,
        })
    }

    /// Classifies a meta type byte.
    #[must_use]
    pub const fn from_meta_type(meta: u8) -> Self {
        match meta {
            0x00 => Self::SequenceNumber,
            0x01 => Self::Text,
            0x02 => Self::Copyright,
            0x03 => Self::TrackName,
            0x04 => Self::InstrumentName,
            0x05 => Self::Lyric,
            0x06 => Self::Marker,
            0x07 => Self::CuePoint,
            0x08..=0x0F => Self::OtherText(meta),
            0x20 => Self::ChannelPrefix,
            0x2F => Self::EndOfTrack,
            0x51 => Self::Tempo,
            0x54 => Self::SmpteOffset,
            0x58 => Self::TimeSig,
            0x59 => Self::KeySig,
            0x7F => Self::SequencerSpecific,
            other => Self::UnknownMeta(other),
        }
    }

    /// Payload length of a channel-voice message.
    #[must_use]
    pub const fn channel_payload_len(self) -> usize {
        match self {
            Self::ProgramChange | Self::ChannelPressure => 1,
            _ => 2,
        }
    }

    /// Whether the payload is a text meta event.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::Copyright
                | Self::TrackName
                | Self::InstrumentName
                | Self::Lyric
                | Self::Marker
                | Self::CuePoint
                | Self::OtherText(_)
        )
    }

    /// Whether this is a note on or note off.
    #[must_use]
    pub const fn is_note(self) -> bool {
        matches!(self, Self::NoteOn | Self::NoteOff)
    }
}

/// A decoded event header. The payload is read through the reader's `extract_*` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiEvent {
    /// Absolute tick within the track.
    pub tick: u64,
    /// What the event is.
    pub kind: MidiEventType,
    /// The channel of a channel-voice message, 0 otherwise.
    pub channel: u8,
    /// Payload length in bytes.
    pub length: usize,
}

/// The payload of a note on or note off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiNote {
    /// Key number.
    pub value: u8,
    /// Velocity.
    pub velocity: u8,
}

impl MidiNote {
    /// Whether this note starts a span: a note on with non-zero velocity. A note on with
    /// velocity 0 is a note off.
    #[must_use]
    pub const fn is_on(&self, kind: MidiEventType) -> bool {
        matches!(kind, MidiEventType::NoteOn) && self.velocity > 0
    }
}

/// What a Phase Shift SysEx event switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhaseShiftKind {
    /// Green notes become open notes.
    OpenNote,
    /// Notes become tap notes.
    TapNote,
    /// Any other switch.
    Other(u8),
}

/// A Phase Shift SysEx event: `50 53 00 00 <difficulty> <kind> <enable> [F7]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseShiftSysEx {
    /// Difficulty index 0-3, or `None` for all difficulties.
    pub difficulty: Option<u8>,
    /// What is switched.
    pub kind: PhaseShiftKind,
    /// Whether the switch turns on.
    pub enabled: bool,
}

impl PhaseShiftSysEx {
    const TAG: [u8; 4] = [0x50, 0x53, 0x00, 0x00];
    const ALL_DIFFICULTIES: u8 = 0xFF;

    /// Parses a SysEx payload, returning `None` if it is not a Phase Shift event.
    #[must_use]
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let [tag @ .., difficulty, kind, enabled] = payload.get(..7)? else {
            return None;
        };
        if *tag != Self::TAG {
            return None;
        }
        Some(Self {
            difficulty: (*difficulty != Self::ALL_DIFFICULTIES).then_some(*difficulty),
            kind: match kind {
                0x01 => PhaseShiftKind::OpenNote,
                0x04 => PhaseShiftKind::TapNote,
                other => PhaseShiftKind::Other(*other),
            },
            enabled: *enabled != 0,
        })
    }

    /// Whether this event applies to difficulty `index`.
    #[must_use]
    pub fn applies_to(&self, index: usize) -> bool {
        self.difficulty
            .is_none_or(|difficulty| usize::from(difficulty) == index)
    }
}
