//! Five-fret and six-fret guitar decoders.
//!
//! Both layouts share one note type, [`FretNote`], and one pair of decoders. A
//! [`FretLayout`] only says which MIDI notes and `.chart` lane numbers map to which lane
//! or marker.

use std::marker::PhantomData;

use super::{
    Difficulty, DifficultyTrack, InstrumentTrack, push_text_event,
    note::{ForceState, FretNote, OPEN_LANE, Sustain},
    phrase::{PhraseTracker, SpecialPhraseType, push_chart_phrase},
};
use crate::{
    chart::{ChartEventType, ChartReader},
    error::Result,
    flat_map::FlatMap,
    midi::{MidiEventType, MidiReader, PhaseShiftKind, PhaseShiftSysEx},
    settings::ParseSettings,
    text::decode_text,
};

/// What a MIDI note or `.chart` lane number means to a fretted track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FretAction {
    /// A note on this lane.
    Lane(usize),
    /// Forces notes to be hammer-ons.
    ForceHopo,
    /// Forces notes to be strummed.
    ForceStrum,
    /// Inverts the natural forcing of the note.
    Toggle,
    /// Makes the note a tap note.
    Tap,
}

/// The lane mapping of a fretted instrument.
pub trait FretLayout {
    /// Lowest MIDI note of each difficulty, in [`Difficulty::ALL`] order.
    const MIDI_BASES: [u8; 4];
    /// Number of MIDI notes per difficulty, starting at the base.
    const MIDI_SPAN: u8;

    /// The meaning of MIDI note `base + offset`.
    fn midi_action(offset: u8) -> Option<FretAction>;

    /// The meaning of `.chart` `N <value>`.
    fn chart_action(value: u32) -> Option<FretAction>;
}

/// Green, red, yellow, blue and orange frets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiveFret;

impl FretLayout for FiveFret {
    const MIDI_BASES: [u8; 4] = [60, 72, 84, 96];
    const MIDI_SPAN: u8 = 7;

    fn midi_action(offset: u8) -> Option<FretAction> {
        Some(match offset {
            0..=4 => FretAction::Lane(usize::from(offset) + 1),
            5 => FretAction::ForceHopo,
            6 => FretAction::ForceStrum,
            _ => return None,
        })
    }

    fn chart_action(value: u32) -> Option<FretAction> {
        Some(match value {
            0..=4 => FretAction::Lane(value as usize + 1),
            5 => FretAction::Toggle,
            6 => FretAction::Tap,
            7 => FretAction::Lane(OPEN_LANE),
            _ => return None,
        })
    }
}

/// Three white and three black frets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SixFret;

impl FretLayout for SixFret {
    const MIDI_BASES: [u8; 4] = [58, 70, 82, 94];
    const MIDI_SPAN: u8 = 9;

    fn midi_action(offset: u8) -> Option<FretAction> {
        Some(match offset {
            0..=6 => FretAction::Lane(usize::from(offset)),
            7 => FretAction::ForceHopo,
            8 => FretAction::ForceStrum,
            _ => return None,
        })
    }

    fn chart_action(value: u32) -> Option<FretAction> {
        Some(match value {
            0..=4 => FretAction::Lane(value as usize + 1),
            8 => FretAction::Lane(6),
            5 => FretAction::Toggle,
            6 => FretAction::Tap,
            7 => FretAction::Lane(OPEN_LANE),
            _ => return None,
        })
    }
}

const SOLO_NOTE: u8 = 103;
const TAP_NOTE: u8 = 104;
const FACE_OFF_P1_NOTE: u8 = 105;
const FACE_OFF_P2_NOTE: u8 = 106;
const TREMOLO_NOTE: u8 = 126;
const TRILL_NOTE: u8 = 127;

const ENHANCED_OPENS: &str = "ENHANCED_OPENS";

/// Note slots per difficulty: the enhanced open note below the base, then the span.
const MAX_SLOTS: usize = 10;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct DifficultyState {
    hopo_on: bool,
    strum_on: bool,
    open_sysex: bool,
    tap_sysex: bool,
    note_ons: [Option<(u64, usize)>; MAX_SLOTS],
}

impl DifficultyState {
    const fn forcing(&self) -> ForceState {
        if self.hopo_on {
            ForceState::Hopo
        } else if self.strum_on {
            ForceState::Strum
        } else {
            ForceState::Natural
        }
    }
}

/// The note at exactly `tick`, found by scanning back from the end.
fn note_at(notes: &mut FlatMap<u64, FretNote>, tick: u64) -> Option<&mut FretNote> {
    let index = notes.traverse_backwards_until(&tick)?;
    match notes.at_mut(index) {
        Some((&key, note)) if key == tick => Some(note),
        _ => None,
    }
}

/// Stateful decoder of one fretted MIDI track.
#[derive(Debug, Clone)]
pub struct MidiFretDecoder<L> {
    states: [DifficultyState; 4],
    phrases: PhraseTracker,
    star_power_note: u8,
    tap_active: bool,
    enhanced_opens: bool,
    layout: PhantomData<L>,
}

impl<L: FretLayout> MidiFretDecoder<L> {
    /// Creates a decoder with nothing held.
    #[must_use]
    pub fn new(settings: &ParseSettings) -> Self {
        Self {
            states: [DifficultyState::default(); 4],
            phrases: PhraseTracker::new(),
            star_power_note: settings.star_power_note,
            tap_active: false,
            enhanced_opens: false,
            layout: PhantomData,
        }
    }

    fn classify(&self, value: u8) -> Option<(Difficulty, usize, FretAction)> {
        Difficulty::ALL
            .into_iter()
            .zip(L::MIDI_BASES)
            .find_map(|(difficulty, base)| {
                if self.enhanced_opens && value.checked_add(1) == Some(base) {
                    return Some((difficulty, 0, FretAction::Lane(OPEN_LANE)));
                }
                let offset = value.checked_sub(base).filter(|&offset| offset < L::MIDI_SPAN)?;
                Some((difficulty, usize::from(offset) + 1, L::midi_action(offset)?))
            })
    }

    fn phrase_of(&self, value: u8) -> Option<SpecialPhraseType> {
        match value {
            _ if value == self.star_power_note => Some(SpecialPhraseType::StarPower),
            SOLO_NOTE => Some(SpecialPhraseType::Solo),
            FACE_OFF_P1_NOTE => Some(SpecialPhraseType::FaceOffP1),
            FACE_OFF_P2_NOTE => Some(SpecialPhraseType::FaceOffP2),
            TREMOLO_NOTE => Some(SpecialPhraseType::Tremolo),
            TRILL_NOTE => Some(SpecialPhraseType::Trill),
            _ => None,
        }
    }

    /// Handles a note-on.
    pub fn note_on(&mut self, track: &mut InstrumentTrack<FretNote>, tick: u64, value: u8) {
        if let Some((difficulty, slot, action)) = self.classify(value) {
            let tap_active = self.tap_active;
            let Some(state) = self.states.get_mut(difficulty.index()) else {
                return;
            };
            let notes = &mut track.difficulty_mut(difficulty).notes;
            match action {
                FretAction::Lane(lane) => {
                    let lane = if lane == 1 && state.open_sysex {
                        OPEN_LANE
                    } else {
                        lane
                    };
                    if let Some(entry) = state.note_ons.get_mut(slot) {
                        *entry = Some((tick, lane));
                    }
                    let forcing = state.forcing();
                    let is_tap = tap_active || state.tap_sysex;
                    notes
                        .get_or_add_back(tick, || FretNote::new(forcing, is_tap))
                        .set_lane(lane, Sustain::Open);
                }
                FretAction::ForceHopo | FretAction::ForceStrum => {
                    let forcing = if action == FretAction::ForceHopo {
                        state.hopo_on = true;
                        ForceState::Hopo
                    } else {
                        state.strum_on = true;
                        ForceState::Strum
                    };
                    if let Some(note) = note_at(notes, tick) {
                        note.forcing = forcing;
                    }
                }
                FretAction::Toggle | FretAction::Tap => {}
            }
            return;
        }

        if value == TAP_NOTE {
            self.tap_active = true;
            for difficulty in Difficulty::ALL {
                if let Some(note) = note_at(&mut track.difficulty_mut(difficulty).notes, tick) {
                    note.is_tap = true;
                }
            }
        } else if let Some(kind) = self.phrase_of(value) {
            self.phrases.start(&mut track.phrases, kind, tick);
        } else {
            log::trace!("ignored fret note {value} at tick {tick}");
        }
    }

    /// Handles a note-off, closing the sustain opened by the matching note-on.
    pub fn note_off(&mut self, track: &mut InstrumentTrack<FretNote>, tick: u64, value: u8) {
        if let Some((difficulty, slot, action)) = self.classify(value) {
            let Some(state) = self.states.get_mut(difficulty.index()) else {
                return;
            };
            match action {
                FretAction::Lane(_) => {
                    let Some((start, lane)) = state.note_ons.get_mut(slot).and_then(Option::take)
                    else {
                        log::trace!("note-off {value} at tick {tick} without a note-on");
                        return;
                    };
                    let notes = &mut track.difficulty_mut(difficulty).notes;
                    if let Some(note) = note_at(notes, start) {
                        note.set_lane(lane, Sustain::Closed(tick - start));
                    }
                }
                FretAction::ForceHopo => state.hopo_on = false,
                FretAction::ForceStrum => state.strum_on = false,
                FretAction::Toggle | FretAction::Tap => {}
            }
            return;
        }

        if value == TAP_NOTE {
            self.tap_active = false;
        } else if let Some(kind) = self.phrase_of(value) {
            self.phrases.end(&mut track.phrases, kind, tick);
        }
    }

    /// Applies a Phase Shift switch.
    ///
    /// A switch can arrive after the note it affects at the same tick, so a green note
    /// started at `tick` is moved to the open lane and a note at `tick` becomes a tap.
    pub fn sysex(&mut self, track: &mut InstrumentTrack<FretNote>, tick: u64, sysex: PhaseShiftSysEx) {
        for (index, (state, difficulty)) in self.states.iter_mut().zip(Difficulty::ALL).enumerate() {
            if !sysex.applies_to(index) {
                continue;
            }
            let notes = &mut track.difficulty_mut(difficulty).notes;
            match sysex.kind {
                PhaseShiftKind::OpenNote => {
                    state.open_sysex = sysex.enabled;
                    if !sysex.enabled {
                        continue;
                    }
                    for entry in state.note_ons.iter_mut().flatten() {
                        if *entry == (tick, 1) {
                            entry.1 = OPEN_LANE;
                            if let Some(note) = note_at(notes, tick) {
                                note.move_lane(1, OPEN_LANE);
                            }
                        }
                    }
                }
                PhaseShiftKind::TapNote => {
                    state.tap_sysex = sysex.enabled;
                    if sysex.enabled
                        && let Some(note) = note_at(notes, tick)
                    {
                        note.is_tap = true;
                    }
                }
                PhaseShiftKind::Other(kind) => {
                    log::trace!("ignored Phase Shift switch {kind} at tick {tick}");
                }
            }
        }
    }

    /// Handles a text event: track flags are consumed, everything else is kept.
    pub fn text(&mut self, track: &mut InstrumentTrack<FretNote>, tick: u64, text: &str) {
        if text.trim_matches(['[', ']']) == ENHANCED_OPENS {
            log::debug!("enhanced opens enabled");
            self.enhanced_opens = true;
        } else {
            push_text_event(&mut track.events, tick, text);
        }
    }
}

/// Decodes a fretted MIDI track from the reader's current track.
///
/// # Errors
///
/// Propagates the errors of [`MidiReader::try_parse_event`] and the payload extractors.
pub fn decode_midi<L: FretLayout>(
    reader: &mut MidiReader<'_>,
    settings: &ParseSettings,
    track: &mut InstrumentTrack<FretNote>,
) -> Result<()> {
    let mut decoder = MidiFretDecoder::<L>::new(settings);
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
            MidiEventType::SysEx | MidiEventType::SysExEnd => {
                if let Some(sysex) = PhaseShiftSysEx::parse(reader.extract_sysex()) {
                    decoder.sysex(track, event.tick, sysex);
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

/// Decodes a fretted `.chart` track until the end of its block.
///
/// # Errors
///
/// Propagates the errors of [`ChartReader::next_event`] and the payload extractors.
pub fn decode_chart<L: FretLayout>(
    reader: &mut ChartReader<'_>,
    track: &mut DifficultyTrack<FretNote>,
) -> Result<()> {
    let mut solos = PhraseTracker::new();
    while let Some((tick, kind)) = reader.next_event()? {
        match kind {
            ChartEventType::Note => {
                let (value, sustain) = reader.extract_lane_and_sustain()?;
                let Some(action) = L::chart_action(value) else {
                    log::trace!("ignored chart lane {value} at tick {tick}");
                    continue;
                };
                let note = track.notes.get_or_add_back(tick, FretNote::default);
                match action {
                    FretAction::Lane(lane) => note.set_lane(lane, Sustain::Closed(sustain)),
                    FretAction::Toggle => note.forcing = ForceState::Toggle,
                    FretAction::Tap => note.is_tap = true,
                    FretAction::ForceHopo => note.forcing = ForceState::Hopo,
                    FretAction::ForceStrum => note.forcing = ForceState::Strum,
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

/// Resolves natural and toggled forcing into HOPO or strum.
///
/// A note is a natural HOPO when it is a single lane, differs from the previous note and
/// starts at most `threshold` ticks after it. The first note is always strummed.
pub fn resolve_forcing(notes: &mut FlatMap<u64, FretNote>, threshold: u64) {
    let mut previous: Option<(u64, u8)> = None;
    for (&tick, note) in notes.iter_mut() {
        let mask = note.lane_mask();
        let natural_hopo = note.lane_count() == 1
            && previous.is_some_and(|(previous_tick, previous_mask)| {
                previous_mask != mask && tick - previous_tick <= threshold
            });
        note.forcing = match note.forcing {
            ForceState::Natural if natural_hopo => ForceState::Hopo,
            ForceState::Natural => ForceState::Strum,
            ForceState::Toggle if natural_hopo => ForceState::Strum,
            ForceState::Toggle => ForceState::Hopo,
            forced => forced,
        };
        previous = Some((tick, mask));
    }
}
