//! Special phrases: star power, solos, lanes, drum fills and lyric lines.
//!
//! MIDI declares a phrase as a note-on/note-off pair, so the phrase is inserted when it
//! opens and its length is filled in when the matching close arrives.
//! [`PhraseTracker`] remembers where each open phrase started.

use super::note::Sustain;
use crate::flat_map::FlatMap;

/// The kind of a special phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpecialPhraseType {
    /// Star power.
    StarPower,
    /// A solo section.
    Solo,
    /// A single-lane tremolo.
    Tremolo,
    /// A two-lane trill.
    Trill,
    /// Face-off section of player 1.
    FaceOffP1,
    /// Face-off section of player 2.
    FaceOffP2,
    /// A drum fill that activates star power.
    DrumFill,
    /// A single-pad drum roll.
    DrumRoll,
    /// A two-pad drum roll.
    SpecialDrumRoll,
    /// A line of lyrics shown together.
    LyricLine,
}

impl SpecialPhraseType {
    /// Resolves the phrase number of a `.chart` `S` event.
    #[must_use]
    pub const fn from_chart(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::FaceOffP1,
            1 => Self::FaceOffP2,
            2 => Self::StarPower,
            64 => Self::DrumFill,
            65 => Self::DrumRoll,
            66 => Self::SpecialDrumRoll,
            _ => return None,
        })
    }
}

/// A phrase and its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpecialPhrase {
    /// What the phrase is.
    pub kind: SpecialPhraseType,
    /// How long it lasts.
    pub length: Sustain,
}

/// Phrases by start tick. Several phrases may start at one tick.
pub type PhraseMap = FlatMap<u64, Vec<SpecialPhrase>>;

/// Adds a phrase with a known length. Ticks must be non-decreasing.
pub fn push_phrase(phrases: &mut PhraseMap, tick: u64, kind: SpecialPhraseType, length: u64) {
    phrases.get_or_add_back(tick, Vec::new).push(SpecialPhrase {
        kind,
        length: Sustain::Closed(length),
    });
}

/// Adds the phrase of a `.chart` `S` event, ignoring unknown phrase numbers.
pub fn push_chart_phrase(phrases: &mut PhraseMap, tick: u64, value: u32, length: u64) {
    match SpecialPhraseType::from_chart(value) {
        Some(kind) => push_phrase(phrases, tick, kind, length),
        None => log::warn!("unknown chart phrase type {value} at tick {tick}"),
    }
}

/// Closes phrases that never saw their end at zero length.
pub fn close_open_phrases(phrases: &mut PhraseMap) {
    for (tick, list) in phrases.iter_mut() {
        for phrase in list.iter_mut().filter(|phrase| phrase.length.is_open()) {
            log::debug!("{:?} at tick {tick} was never closed", phrase.kind);
            phrase.length = Sustain::Closed(0);
        }
    }
}

/// The end tick of the longest phrase.
#[must_use]
pub fn last_phrase_tick(phrases: &PhraseMap) -> u64 {
    phrases
        .iter()
        .flat_map(|(&tick, list)| list.iter().map(move |phrase| tick + phrase.length.length()))
        .max()
        .unwrap_or(0)
}

/// Start ticks of the phrases currently open.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PhraseTracker {
    open: FlatMap<SpecialPhraseType, u64>,
}

impl PhraseTracker {
    /// Creates a tracker with nothing open.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            open: FlatMap::new(),
        }
    }

    /// Whether a phrase of `kind` is open.
    #[must_use]
    pub fn is_open(&self, kind: SpecialPhraseType) -> bool {
        self.open.contains_key(&kind)
    }

    /// Opens a phrase of `kind` at `tick`. A phrase of the same kind that is already open
    /// stays as it is.
    pub fn start(&mut self, phrases: &mut PhraseMap, kind: SpecialPhraseType, tick: u64) {
        if let Some(start) = self.open.get(&kind) {
            log::trace!("{kind:?} at tick {tick} is already open since {start}");
            return;
        }
        phrases.get_or_add_back(tick, Vec::new).push(SpecialPhrase {
            kind,
            length: Sustain::Open,
        });
        self.open.insert(kind, tick);
    }

    /// Closes the open phrase of `kind` at `tick`. Returns `false` if none was open.
    pub fn end(&mut self, phrases: &mut PhraseMap, kind: SpecialPhraseType, tick: u64) -> bool {
        let Some(start) = self.open.remove(&kind) else {
            log::trace!("{kind:?} closed at tick {tick} without being opened");
            return false;
        };
        let phrase = phrases.get_mut(&start).and_then(|list| {
            list.iter_mut()
                .find(|phrase| phrase.kind == kind && phrase.length.is_open())
        });
        if let Some(phrase) = phrase {
            phrase.length = Sustain::Closed(tick.saturating_sub(start));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn interleaved_phrases_close_by_kind() {
        let mut phrases = PhraseMap::new();
        let mut tracker = PhraseTracker::new();
        tracker.start(&mut phrases, SpecialPhraseType::Solo, 0);
        tracker.start(&mut phrases, SpecialPhraseType::StarPower, 480);
        tracker.start(&mut phrases, SpecialPhraseType::Tremolo, 480);
        assert!(tracker.end(&mut phrases, SpecialPhraseType::StarPower, 960));
        assert!(tracker.end(&mut phrases, SpecialPhraseType::Solo, 1920));
        assert!(!tracker.end(&mut phrases, SpecialPhraseType::Trill, 1920));
        assert!(tracker.is_open(SpecialPhraseType::Tremolo));

        assert_eq!(
            phrases.get(&0),
            Some(&vec![SpecialPhrase {
                kind: SpecialPhraseType::Solo,
                length: Sustain::Closed(1920),
            }])
        );
        assert_eq!(
            phrases.get(&480),
            Some(&vec![
                SpecialPhrase {
                    kind: SpecialPhraseType::StarPower,
                    length: Sustain::Closed(480),
                },
                SpecialPhrase {
                    kind: SpecialPhraseType::Tremolo,
                    length: Sustain::Open,
                },
            ])
        );

        close_open_phrases(&mut phrases);
        assert_eq!(last_phrase_tick(&phrases), 1920);
        assert!(phrases.values().flatten().all(|phrase| !phrase.length.is_open()));
    }

    #[test]
    fn chart_phrase_numbers() {
        let mut phrases = PhraseMap::new();
        push_chart_phrase(&mut phrases, 10, 2, 100);
        push_chart_phrase(&mut phrases, 20, 99, 100);
        push_chart_phrase(&mut phrases, 20, 64, 50);
        assert_eq!(phrases.len(), 2);
        assert_eq!(phrases[1][0].kind, SpecialPhraseType::DrumFill);
    }
}
