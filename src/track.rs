//! Per-instrument note tracks and the decoders that fill them.
//!
//! An [`InstrumentTrack`] holds one [`DifficultyTrack`] per [`Difficulty`] plus the phrases
//! and text events shared by all difficulties. Decoders append in a single forward pass,
//! and [`InstrumentTrack::finalize`] closes whatever is still open once the source is
//! exhausted.

pub mod drums;
pub mod fret;
pub mod note;
pub mod phrase;
pub mod vocals;

use self::{
    note::TrackNote,
    phrase::{PhraseMap, close_open_phrases, last_phrase_tick},
};
use crate::flat_map::FlatMap;

/// Text events by tick, in file order within a tick.
pub type TextEvents = FlatMap<u64, Vec<String>>;

/// Appends a text event. Ticks must be non-decreasing.
pub fn push_text_event(events: &mut TextEvents, tick: u64, text: impl Into<String>) {
    events.get_or_add_back(tick, Vec::new).push(text.into());
}

/// A chart difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Difficulty {
    /// Easy.
    Easy,
    /// Medium.
    Medium,
    /// Hard.
    Hard,
    /// Expert.
    Expert,
}

impl Difficulty {
    /// Every difficulty, easiest first.
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Expert];

    /// Position in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// The notes, phrases and text events of one difficulty.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DifficultyTrack<N> {
    /// Notes by tick.
    pub notes: FlatMap<u64, N>,
    /// Phrases that only apply to this difficulty.
    pub phrases: PhraseMap,
    /// Text events of this difficulty.
    pub events: TextEvents,
}

impl<N> Default for DifficultyTrack<N> {
    fn default() -> Self {
        Self {
            notes: FlatMap::new(),
            phrases: PhraseMap::new(),
            events: TextEvents::new(),
        }
    }
}

impl<N> DifficultyTrack<N> {
    /// Whether there are no notes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl<N: TrackNote> DifficultyTrack<N> {
    /// The last tick touched by a note, phrase or event.
    #[must_use]
    pub fn last_tick(&self) -> u64 {
        let notes = self
            .notes
            .iter()
            .map(|(&tick, note)| tick + note.longest_sustain())
            .max()
            .unwrap_or(0);
        let events = self.events.last().map_or(0, |(&tick, _)| tick);
        notes.max(events).max(last_phrase_tick(&self.phrases))
    }

    /// Closes open sustains and phrases, drops notes without lanes and releases spare
    /// capacity.
    pub fn finalize(&mut self, sustain_cutoff: u64) {
        for note in self.notes.values_mut() {
            note.close_sustains(sustain_cutoff);
        }
        let before = self.notes.len();
        self.notes.retain(|_, note| !note.is_empty());
        if self.notes.len() != before {
            log::trace!("pruned {} notes without lanes", before - self.notes.len());
        }
        close_open_phrases(&mut self.phrases);
        self.notes.shrink_to_fit();
        self.phrases.shrink_to_fit();
        self.events.shrink_to_fit();
    }
}

/// The tracks of one instrument across all difficulties.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstrumentTrack<N> {
    /// One track per difficulty, in [`Difficulty::ALL`] order.
    pub difficulties: [DifficultyTrack<N>; 4],
    /// Phrases shared by every difficulty.
    pub phrases: PhraseMap,
    /// Text events shared by every difficulty.
    pub events: TextEvents,
}

impl<N> Default for InstrumentTrack<N> {
    fn default() -> Self {
        Self {
            difficulties: std::array::from_fn(|_| DifficultyTrack::default()),
            phrases: PhraseMap::new(),
            events: TextEvents::new(),
        }
    }
}

impl<N> InstrumentTrack<N> {
    /// Creates an empty track.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The track of `difficulty`.
    #[must_use]
    pub const fn difficulty(&self, difficulty: Difficulty) -> &DifficultyTrack<N> {
        let [easy, medium, hard, expert] = &self.difficulties;
        match difficulty {
            Difficulty::Easy => easy,
            Difficulty::Medium => medium,
            Difficulty::Hard => hard,
            Difficulty::Expert => expert,
        }
    }

    /// The track of `difficulty`, mutably.
    pub const fn difficulty_mut(&mut self, difficulty: Difficulty) -> &mut DifficultyTrack<N> {
        let [easy, medium, hard, expert] = &mut self.difficulties;
        match difficulty {
            Difficulty::Easy => easy,
            Difficulty::Medium => medium,
            Difficulty::Hard => hard,
            Difficulty::Expert => expert,
        }
    }

    /// Whether no difficulty has notes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.difficulties.iter().all(DifficultyTrack::is_empty)
    }
}

impl<N: TrackNote> InstrumentTrack<N> {
    /// The last tick touched by any difficulty, phrase or event.
    #[must_use]
    pub fn last_tick(&self) -> u64 {
        self.difficulties
            .iter()
            .map(DifficultyTrack::last_tick)
            .chain([
                last_phrase_tick(&self.phrases),
                self.events.last().map_or(0, |(&tick, _)| tick),
            ])
            .max()
            .unwrap_or(0)
    }

    /// Finalises every difficulty. See [`DifficultyTrack::finalize`].
    pub fn finalize(&mut self, sustain_cutoff: u64) {
        for track in &mut self.difficulties {
            track.finalize(sustain_cutoff);
        }
        close_open_phrases(&mut self.phrases);
        self.phrases.shrink_to_fit();
        self.events.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        note::{FretNote, Sustain},
        phrase::{PhraseTracker, SpecialPhraseType},
        *,
    };

    #[test]
    fn finalize_prunes_and_closes() {
        let mut track = InstrumentTrack::<FretNote>::new();
        let expert = track.difficulty_mut(Difficulty::Expert);
        expert
            .notes
            .get_or_add_back(0, FretNote::default)
            .set_lane(1, Sustain::Closed(100));
        expert.notes.get_or_add_back(480, FretNote::default);
        expert
            .notes
            .get_or_add_back(960, FretNote::default)
            .set_lane(2, Sustain::Open);
        push_text_event(&mut expert.events, 2000, "lyric");

        let mut tracker = PhraseTracker::new();
        tracker.start(&mut track.phrases, SpecialPhraseType::StarPower, 0);

        assert_eq!(track.last_tick(), 2000);
        track.finalize(50);

        let expert = track.difficulty(Difficulty::Expert);
        let ticks: Vec<_> = expert.notes.keys().copied().collect();
        assert_eq!(ticks, vec![0, 960]);
        assert_eq!(expert.notes[1].lane(2), Some(Sustain::Closed(0)));
        assert_eq!(track.phrases[0][0].length, Sustain::Closed(0));
        assert!(track.difficulty(Difficulty::Easy).is_empty());
        assert!(!track.is_empty());
    }
}
