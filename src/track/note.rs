//! Note payloads stored in the per-difficulty note maps.

/// The held length of a note lane or phrase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sustain {
    /// Started, but the matching note-off has not been seen yet.
    #[default]
    Open,
    /// Closed with a length in ticks.
    Closed(u64),
}

impl Sustain {
    /// The length in ticks, zero while still open.
    #[must_use]
    pub const fn length(self) -> u64 {
        match self {
            Self::Open => 0,
            Self::Closed(length) => length,
        }
    }

    /// Whether the end has not been seen yet.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// How a fretted note must be played.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ForceState {
    /// Decided from the note spacing when the track is finalised.
    #[default]
    Natural,
    /// Decided from the note spacing, then inverted. Only `.chart` produces this.
    Toggle,
    /// Hammer-on or pull-off.
    Hopo,
    /// Must be strummed.
    Strum,
}

/// Lane slots of a fretted note: the open lane at 0 followed by the frets.
pub const FRET_LANES: usize = 7;

/// Lane index of an open note.
pub const OPEN_LANE: usize = 0;

/// A chord of fretted lanes at one tick.
///
/// Five-fret tracks use lanes 1 to 5 (green to orange), six-fret tracks use 1 to 3 for
/// the white frets and 4 to 6 for the black ones.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FretNote {
    /// The sustain of every lane that is played.
    pub lanes: [Option<Sustain>; FRET_LANES],
    /// The forcing of the note.
    pub forcing: ForceState,
    /// Whether the note is a tap note.
    pub is_tap: bool,
}

impl FretNote {
    /// An empty chord with the given flags.
    #[must_use]
    pub fn new(forcing: ForceState, is_tap: bool) -> Self {
        Self {
            forcing,
            is_tap,
            ..Self::default()
        }
    }

    /// Sets the sustain of `lane`. Lanes out of range are ignored.
    pub fn set_lane(&mut self, lane: usize, sustain: Sustain) {
        if let Some(slot) = self.lanes.get_mut(lane) {
            *slot = Some(sustain);
        }
    }

    /// The sustain of `lane` if it is played.
    #[must_use]
    pub fn lane(&self, lane: usize) -> Option<Sustain> {
        self.lanes.get(lane).copied().flatten()
    }

    /// Moves the sustain of lane `from` to lane `to`.
    pub fn move_lane(&mut self, from: usize, to: usize) {
        if let Some(sustain) = self.lanes.get_mut(from).and_then(Option::take) {
            self.set_lane(to, sustain);
        }
    }

    /// Bit `n` is set when lane `n` is played.
    #[must_use]
    pub fn lane_mask(&self) -> u8 {
        self.lanes
            .iter()
            .enumerate()
            .filter(|(_, lane)| lane.is_some())
            .fold(0, |mask, (index, _)| mask | 1 << index)
    }

    /// Number of lanes played.
    #[must_use]
    pub fn lane_count(&self) -> u32 {
        self.lane_mask().count_ones()
    }
}

/// Behaviour shared by every note payload, used by track finalisation.
pub trait TrackNote: Default {
    /// Whether no lane is played.
    fn is_empty(&self) -> bool;

    /// The longest sustain of the note in ticks.
    fn longest_sustain(&self) -> u64;

    /// Closes still-open sustains at zero length and cuts sustains at or below `cutoff`.
    fn close_sustains(&mut self, cutoff: u64);
}

impl TrackNote for FretNote {
    fn is_empty(&self) -> bool {
        self.lanes.iter().all(Option::is_none)
    }

    fn longest_sustain(&self) -> u64 {
        self.lanes
            .iter()
            .flatten()
            .map(|sustain| sustain.length())
            .max()
            .unwrap_or(0)
    }

    fn close_sustains(&mut self, cutoff: u64) {
        for sustain in self.lanes.iter_mut().flatten() {
            let length = sustain.length();
            *sustain = Sustain::Closed(if length <= cutoff { 0 } else { length });
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lanes_and_masks() {
        let mut note = FretNote::default();
        note.set_lane(1, Sustain::Open);
        note.set_lane(3, Sustain::Closed(240));
        note.set_lane(FRET_LANES, Sustain::Open);
        assert_eq!(note.lane_mask(), 0b1010);
        assert_eq!(note.lane_count(), 2);
        assert_eq!(note.longest_sustain(), 240);

        note.move_lane(1, OPEN_LANE);
        assert_eq!(note.lane(OPEN_LANE), Some(Sustain::Open));
        assert_eq!(note.lane(1), None);
    }

    #[test]
    fn sustain_cutoff() {
        let mut note = FretNote::default();
        note.set_lane(1, Sustain::Open);
        note.set_lane(2, Sustain::Closed(100));
        note.set_lane(3, Sustain::Closed(161));
        note.close_sustains(160);
        assert_eq!(note.lane(1), Some(Sustain::Closed(0)));
        assert_eq!(note.lane(2), Some(Sustain::Closed(0)));
        assert_eq!(note.lane(3), Some(Sustain::Closed(161)));
        assert!(!note.is_empty());
        assert!(FretNote::default().is_empty());
    }
}
