//! Drums notes and decoders.
//!
//! Lanes: 0 kick, 1 red, 2 yellow, 3 blue, 4 green (four-lane) or orange (five-lane),
//! 5 green (five-lane only). Whether lane 4 is green or orange is settled by
//! [`resolve_drums_type`] once the whole track is known.

use super::{
    Difficulty, DifficultyTrack, InstrumentTrack, push_text_event,
    note::TrackNote,
    phrase::{PhraseTracker, SpecialPhraseType, push_chart_phrase},
};
use crate::{
    chart::{ChartEventType, ChartReader},
    error::Result,
    flat_map::FlatMap,
    midi::{MidiEventType, MidiNote, MidiReader},
    settings::{DrumsType, ParseSettings},
    text::decode_text,
};

/// Number of drum lanes including the kick.
pub const DRUM_LANES: usize = 6;
/// Lane of the kick pedal.
pub const KICK: usize = 0;
/// Lane of the yellow pad.
pub const YELLOW: usize = 2;
/// Lane of the blue pad.
pub const BLUE: usize = 3;
/// Lane of the four-lane green pad, or the five-lane orange pad.
pub const FOURTH_PAD: usize = 4;
/// Lane of the five-lane green pad.
pub const FIFTH_PAD: usize = 5;

/// How hard a pad is hit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dynamics {
    /// A regular hit.
    #[default]
    Normal,
    /// A hard hit.
    Accent,
    /// A soft hit.
    Ghost,
}

/// One hit pad.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrumPad {
    /// How hard it is hit.
    pub dynamics: Dynamics,
    /// Whether the pad is a cymbal rather than a tom.
    pub cymbal: bool,
}

/// The pads hit at one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrumNote {
    /// Every pad that is hit.
    pub pads: [Option<DrumPad>; DRUM_LANES],
    /// Whether the kick is an expert+ double-pedal kick.
    pub double_kick: bool,
}

impl DrumNote {
    /// The pad on `lane` if it is hit.
    #[must_use]
    pub fn pad(&self, lane: usize) -> Option<DrumPad> {
        self.pads.get(lane).copied().flatten()
    }

    /// The pad on `lane`, mutably.
    pub fn pad_mut(&mut self, lane: usize) -> Option<&mut DrumPad> {
        self.pads.get_mut(lane).and_then(Option::as_mut)
    }

    /// Sets the pad on `lane`. Lanes out of range are ignored.
    pub fn set_pad(&mut self, lane: usize, pad: DrumPad) {
        if let Some(slot) = self.pads.get_mut(lane) {
            *slot = Some(pad);
        }
    }
}

impl TrackNote for DrumNote {
    fn is_empty(&self) -> bool {
        self.pads.iter().all(Option::is_none)
    }

    fn longest_sustain(&self) -> u64 {
        0
    }

    fn close_sustains(&mut self, _cutoff: u64) {}
}

const MIDI_BASES: [u8; 4] = [60, 72, 84, 96];
const MIDI_SPAN: u8 = DRUM_LANES as u8;
const EXPERT_PLUS_KICK: u8 = 95;
const SOLO_NOTE: u8 = 103;
const TOM_MARKERS: std::ops::RangeInclusive<u8> = 110..=112;
const DRUM_FILL_NOTE: u8 = 120;
const DRUM_ROLL_NOTE: u8 = 126;
const SPECIAL_DRUM_ROLL_NOTE: u8 = 127;
const ACCENT_VELOCITY: u8 = 127;
const GHOST_VELOCITY: u8 = 1;

const ENABLE_DYNAMICS: &str = "ENABLE_CHART_DYNAMICS";

const CHART_DOUBLE_KICK: u32 = 32;
const CHART_ACCENTS: std::ops::RangeInclusive<u32> = 34..=38;
const CHART_GHOSTS: std::ops::RangeInclusive<u32> = 40..=44;
const CHART_CYMBALS: std::ops::RangeInclusive<u32> = 66..=68;

/// Stateful decoder of a MIDI drums track.
#[derive(Debug, Default, Clone)]
pub struct MidiDrumsDecoder {
    toms: [bool; 3],
    dynamics: bool,
    phrases: PhraseTracker,
    star_power_note: u8,
}

impl MidiDrumsDecoder {
    /// Creates a decoder with no tom markers held.
    #[must_use]
    pub fn new(settings: &ParseSettings) -> Self {
        Self {
            star_power_note: settings.star_power_note,
            ..Self::default()
        }
    }

    fn phrase_of(&self, value: u8) -> Option<SpecialPhraseType> {
        match value {
            _ if value == self.star_power_note => Some(SpecialPhraseType::StarPower),
            SOLO_NOTE => Some(SpecialPhraseType::Solo),
            DRUM_FILL_NOTE => Some(SpecialPhraseType::DrumFill),
            DRUM_ROLL_NOTE => Some(SpecialPhraseType::DrumRoll),
            SPECIAL_DRUM_ROLL_NOTE => Some(SpecialPhraseType::SpecialDrumRoll),
            _ => None,
        }
    }

    fn is_tom(&self, lane: usize) -> bool {
        lane.checked_sub(YELLOW)
            .and_then(|index| self.toms.get(index))
            .copied()
            .unwrap_or(false)
    }

    fn dynamics_of(&self, velocity: u8) -> Dynamics {
        match velocity {
            ACCENT_VELOCITY if self.dynamics => Dynamics::Accent,
            GHOST_VELOCITY if self.dynamics => Dynamics::Ghost,
            _ => Dynamics::Normal,
        }
    }

    /// Handles a note-on.
    pub fn note_on(&mut self, track: &mut InstrumentTrack<DrumNote>, tick: u64, note: MidiNote) {
        let lane = Difficulty::ALL
            .into_iter()
            .zip(MIDI_BASES)
            .find_map(|(difficulty, base)| {
                let offset = note.value.checked_sub(base).filter(|&offset| offset < MIDI_SPAN)?;
                Some((difficulty, usize::from(offset)))
            });
        if let Some((difficulty, lane)) = lane {
            let pad = DrumPad {
                dynamics: self.dynamics_of(note.velocity),
                cymbal: (YELLOW..=FOURTH_PAD).contains(&lane) && !self.is_tom(lane),
            };
            track
                .difficulty_mut(difficulty)
                .notes
                .get_or_add_back(tick, DrumNote::default)
                .set_pad(lane, pad);
            return;
        }

        match note.value {
            EXPERT_PLUS_KICK => {
                let kick = track
                    .difficulty_mut(Difficulty::Expert)
                    .notes
                    .get_or_add_back(tick, DrumNote::default);
                kick.set_pad(KICK, DrumPad::default());
                kick.double_kick = true;
            }
            value if TOM_MARKERS.contains(&value) => {
                let lane = usize::from(value - TOM_MARKERS.start()) + YELLOW;
                if let Some(tom) = self.toms.get_mut(lane - YELLOW) {
                    *tom = true;
                }
                for difficulty in Difficulty::ALL {
                    let notes = &mut track.difficulty_mut(difficulty).notes;
                    if let Some(pad) = note_at(notes, tick).and_then(|note| note.pad_mut(lane)) {
                        pad.cymbal = false;
                    }
                }
            }
            value => match self.phrase_of(value) {
                Some(kind) => self.phrases.start(&mut track.phrases, kind, tick),
                None => log::trace!("ignored drums note {value} at tick {tick}"),
            },
        }
    }

    /// Handles a note-off. Pads have no length; only markers and phrases end here.
    pub fn note_off(&mut self, track: &mut InstrumentTrack<DrumNote>, tick: u64, value: u8) {
        if TOM_MARKERS.contains(&value) {
            if let Some(tom) = self.toms.get_mut(usize::from(value - TOM_MARKERS.start())) {
                *tom = false;
            }
        } else if let Some(kind) = self.phrase_of(value) {
            self.phrases.end(&mut track.phrases, kind, tick);
        }
    }

    /// Handles a text event: track flags are consumed, everything else is kept.
    pub fn text(&mut self, track: &mut InstrumentTrack<DrumNote>, tick: u64, text: &str) {
        if text.trim_matches(['[', ']']) == ENABLE_DYNAMICS {
            log::debug!("drum dynamics enabled");
            self.dynamics = true;
        } else {
            push_text_event(&mut track.events, tick, text);
        }
    }
}

fn note_at(notes: &mut FlatMap<u64, DrumNote>, tick: u64) -> Option<&mut DrumNote> {
    let index = notes.traverse_backwards_until(&tick)?;
    match notes.at_mut(index) {
        Some((&key, note)) if key == tick => Some(note),
        _ => None,
    }
}

/// Decodes a MIDI drums track from the reader's current track.
///
/// # Errors
///
/// Propagates the errors of [`MidiReader::try_parse_event`] and the payload extractors.
pub fn decode_midi(
    reader: &mut MidiReader<'_>,
    settings: &ParseSettings,
    track: &mut InstrumentTrack<DrumNote>,
) -> Result<()> {
    let mut decoder = MidiDrumsDecoder::new(settings);
    while let Some(event) = reader.try_parse_event()? {
        match event.kind {
            MidiEventType::NoteOn | MidiEventType::NoteOff => {
                let note = reader.extract_note()?;
                if note.is_on(event.kind) {
                    decoder.note_on(track, event.tick, note);
                } else {
                    decoder.note_off(track, event.tick, note.value);
                }
            }
            kind if kind.is_text() => {
                let text = decode_text(reader.extract_text());
                decoder.text(track, event.tick, &text);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Modifier flags seen at one tick, applied to pads that arrive later at the same tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PendingMarks {
    tick: u64,
    accents: u8,
    ghosts: u8,
    cymbals: u8,
}

impl PendingMarks {
    fn apply(&self, lane: usize, pad: &mut DrumPad) {
        let bit = 1u8 << lane;
        if self.cymbals & bit != 0 {
            pad.cymbal = true;
        }
        if self.accents & bit != 0 {
            pad.dynamics = Dynamics::Accent;
        } else if self.ghosts & bit != 0 {
            pad.dynamics = Dynamics::Ghost;
        }
    }
}

/// Decodes a `.chart` drums track until the end of its block.
///
/// # Errors
///
/// Propagates the errors of [`ChartReader::next_event`] and the payload extractors.
pub fn decode_chart(reader: &mut ChartReader<'_>, track: &mut DifficultyTrack<DrumNote>) -> Result<()> {
    let mut solos = PhraseTracker::new();
    let mut marks = PendingMarks::default();
    while let Some((tick, kind)) = reader.next_event()? {
        if marks.tick != tick {
            marks = PendingMarks {
                tick,
                ..PendingMarks::default()
            };
        }
        match kind {
            ChartEventType::Note => {
                let (value, _) = reader.extract_lane_and_sustain()?;
                let note = track.notes.get_or_add_back(tick, DrumNote::default);
                match value {
                    0..=5 => {
                        let lane = value as usize;
                        let mut pad = DrumPad::default();
                        marks.apply(lane, &mut pad);
                        note.set_pad(lane, pad);
                    }
                    CHART_DOUBLE_KICK => {
                        note.set_pad(KICK, DrumPad::default());
                        note.double_kick = true;
                    }
                    value => {
                        let (lane, field) = if CHART_ACCENTS.contains(&value) {
                            (value - 33, &mut marks.accents)
                        } else if CHART_GHOSTS.contains(&value) {
                            (value - 39, &mut marks.ghosts)
                        } else if CHART_CYMBALS.contains(&value) {
                            (value - 64, &mut marks.cymbals)
                        } else {
                            log::trace!("ignored chart drums lane {value} at tick {tick}");
                            continue;
                        };
                        *field |= 1 << lane;
                        let lane = lane as usize;
                        if let Some(pad) = note.pad_mut(lane) {
                            marks.apply(lane, pad);
                        }
                    }
                }
            }
            ChartEventType::Special => {
                let (value, length) = reader.extract_lane_and_sustain()?;
                push_chart_phrase(&mut track.phrases, tick, value, length);
            }
            ChartEventType::Text => {
                let text = reader.extract_text();
                match text.trim() {
                    "solo" => solos.start(&mut track.phrases, SpecialPhraseType::Solo, tick),
                    "soloend" => {
                        solos.end(&mut track.phrases, SpecialPhraseType::Solo, tick);
                    }
                    other => push_text_event(&mut track.events, tick, other),
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Settles the lane layout of a drums track and returns it.
///
/// [`DrumsType::Unknown`] becomes five-lane when any lane 5 note exists. A four-lane
/// track folds lane 5 onto lane 4. A five-lane track has cymbals on yellow and orange.
pub fn resolve_drums_type(track: &mut InstrumentTrack<DrumNote>, requested: DrumsType) -> DrumsType {
    let has_fifth_pad = || {
        track
            .difficulties
            .iter()
            .flat_map(|difficulty| difficulty.notes.values())
            .any(|note| note.pad(FIFTH_PAD).is_some())
    };
    let resolved = match requested {
        DrumsType::Unknown if has_fifth_pad() => DrumsType::FiveLane,
        DrumsType::Unknown => DrumsType::FourLane,
        known => known,
    };
    log::debug!("drums resolved as {resolved:?}");

    for difficulty in &mut track.difficulties {
        for note in difficulty.notes.values_mut() {
            match resolved {
                DrumsType::FiveLane => {
                    for (lane, pad) in note.pads.iter_mut().enumerate() {
                        if let Some(pad) = pad {
                            pad.cymbal = lane == YELLOW || lane == FOURTH_PAD;
                        }
                    }
                }
                _ => {
                    if let Some(pad) = note.pads.get_mut(FIFTH_PAD).and_then(Option::take)
                        && note.pad(FOURTH_PAD).is_none()
                    {
                        note.set_pad(FOURTH_PAD, pad);
                    }
                }
            }
        }
    }
    resolved
}
