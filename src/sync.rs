//! Tempo and time-signature timeline.
//!
//! [`SyncTrack`] collects tempo markers, anchors and time signatures while a chart is
//! decoded, then [`SyncTrack::finalize_tempo_map`] fills in defaults and propagates the
//! absolute microsecond anchor of every marker. After that ticks convert to seconds and
//! back, and [`beats`] synthesises the beat grid.

pub mod beats;

use crate::flat_map::FlatMap;

pub use self::beats::{Beat, BeatStyle};

/// Microseconds per quarter note at 120 BPM.
pub const DEFAULT_MICROS_PER_QUARTER: u32 = 500_000;
/// Denominator exponent meaning "same as the previous time signature".
pub const DENOMINATOR_INHERIT: u8 = 255;
/// Denominator exponent of a quarter note (`x/4`).
pub const DEFAULT_DENOMINATOR: u8 = 2;
/// Largest denominator exponent kept (`x/64`). Larger exponents are clamped to it.
pub const MAX_DENOMINATOR: u8 = 6;
/// Largest numerator kept. Larger numerators are clamped to it.
pub const MAX_NUMERATOR: u32 = 255;
/// MIDI clocks per metronome click for a quarter-note click.
pub const DEFAULT_METRONOME: u8 = 24;
/// Thirty-second notes per MIDI quarter note.
pub const DEFAULT_THIRTY_SECONDS: u8 = 8;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// A tempo marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tempo {
    /// Length of a quarter note.
    pub micros_per_quarter: u32,
    /// Absolute time of the marker in microseconds.
    pub anchor: u64,
    /// Whether `anchor` came from the chart instead of propagation.
    pub explicit_anchor: bool,
}

impl Tempo {
    /// A marker whose anchor will be propagated.
    #[must_use]
    pub const fn new(micros_per_quarter: u32) -> Self {
        Self {
            micros_per_quarter,
            anchor: 0,
            explicit_anchor: false,
        }
    }

    /// The tempo in beats per minute.
    #[must_use]
    pub fn bpm(&self) -> f64 {
        60_000_000.0 / f64::from(self.micros_per_quarter.max(1))
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(DEFAULT_MICROS_PER_QUARTER)
    }
}

/// A time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSig {
    /// Beats per measure.
    pub numerator: u32,
    /// Power-of-two exponent of the beat unit, or [`DENOMINATOR_INHERIT`].
    pub denominator: u8,
    /// MIDI clocks per metronome click.
    pub metronome: u8,
    /// Thirty-second notes per MIDI quarter note.
    pub thirty_seconds: u8,
}

impl TimeSig {
    /// A time signature with a quarter-note click.
    #[must_use]
    pub const fn new(numerator: u32, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
            metronome: DEFAULT_METRONOME,
            thirty_seconds: DEFAULT_THIRTY_SECONDS,
        }
    }

    /// The beat unit, e.g. `4` for `x/4`. An unresolved denominator reads as 4, and an
    /// exponent above [`MAX_DENOMINATOR`] reads as `x/64`.
    #[must_use]
    pub fn denominator_value(&self) -> u32 {
        if self.denominator == DENOMINATOR_INHERIT {
            return 1 << DEFAULT_DENOMINATOR;
        }
        1 << self.denominator.min(MAX_DENOMINATOR)
    }

    /// Limits the numerator to `1..=MAX_NUMERATOR` and the exponent to
    /// [`MAX_DENOMINATOR`]. [`DENOMINATOR_INHERIT`] is left as it is.
    #[must_use]
    pub fn clamped(self) -> Self {
        let denominator = if self.denominator == DENOMINATOR_INHERIT {
            DENOMINATOR_INHERIT
        } else {
            self.denominator.min(MAX_DENOMINATOR)
        };
        Self {
            numerator: self.numerator.clamp(1, MAX_NUMERATOR),
            denominator,
            ..self
        }
    }
}

impl Default for TimeSig {
    fn default() -> Self {
        Self::new(4, DEFAULT_DENOMINATOR)
    }
}

/// A tick paired with its time in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DualPosition {
    /// Position in ticks.
    pub tick: u64,
    /// Position in seconds.
    pub seconds: f64,
}

/// The tempo map, time signatures and beat grid of a chart.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncTrack {
    tick_rate: u32,
    tempos: FlatMap<u64, Tempo>,
    time_sigs: FlatMap<u64, TimeSig>,
    beats: FlatMap<u64, BeatStyle>,
}

impl SyncTrack {
    /// Creates an empty timeline. A zero `tick_rate` is raised to 1.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate: tick_rate.max(1),
            tempos: FlatMap::new(),
            time_sigs: FlatMap::new(),
            beats: FlatMap::new(),
        }
    }

    /// Ticks per quarter note.
    #[must_use]
    pub const fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Replaces the tick rate. A zero `tick_rate` is raised to 1.
    ///
    /// Anchors are only propagated by [`Self::finalize_tempo_map`], so this may be called
    /// at any point before it.
    pub fn set_tick_rate(&mut self, tick_rate: u32) {
        self.tick_rate = tick_rate.max(1);
    }

    /// Tempo markers by tick.
    #[must_use]
    pub const fn tempos(&self) -> &FlatMap<u64, Tempo> {
        &self.tempos
    }

    /// Time signatures by tick.
    #[must_use]
    pub const fn time_sigs(&self) -> &FlatMap<u64, TimeSig> {
        &self.time_sigs
    }

    /// Beat markers by tick.
    #[must_use]
    pub const fn beats(&self) -> &FlatMap<u64, BeatStyle> {
        &self.beats
    }

    /// Records a tempo change. Ticks must be fed in non-decreasing order; a second tempo at
    /// the same tick replaces the first.
    pub fn add_tempo(&mut self, tick: u64, micros_per_quarter: u32) {
        let micros_per_quarter = if micros_per_quarter == 0 {
            log::warn!("tempo of zero at tick {tick}, using 1µs per quarter");
            1
        } else {
            micros_per_quarter
        };
        self.tempos
            .get_or_add_back(tick, Tempo::default)
            .micros_per_quarter = micros_per_quarter;
    }

    /// Records an explicit anchor. Without a tempo at `tick` the previous tempo is carried.
    pub fn add_anchor(&mut self, tick: u64, anchor_micros: u64) {
        let carried = self
            .tempos
            .last()
            .map_or(DEFAULT_MICROS_PER_QUARTER, |(_, tempo)| {
                tempo.micros_per_quarter
            });
        let tempo = self
            .tempos
            .get_or_add_back(tick, || Tempo::new(carried));
        tempo.anchor = anchor_micros;
        tempo.explicit_anchor = true;
    }

    /// Records a time signature. A second one at the same tick replaces the first.
    ///
    /// Out-of-range numerators and exponents are clamped, see [`TimeSig::clamped`].
    pub fn add_time_sig(&mut self, tick: u64, time_sig: TimeSig) {
        let clamped = time_sig.clamped();
        if clamped != time_sig {
            log::warn!(
                "time signature {}/2^{} at tick {tick} clamped to {}/2^{}",
                time_sig.numerator,
                time_sig.denominator,
                clamped.numerator,
                clamped.denominator
            );
        }
        *self.time_sigs.get_or_add_back(tick, || clamped) = clamped;
    }

    /// Records an authored beat marker.
    pub fn add_beat(&mut self, tick: u64, style: BeatStyle) {
        *self.beats.get_or_add_back(tick, || style) = style;
    }

    /// Inserts the tick-0 defaults and propagates anchors.
    ///
    /// A missing tempo at tick 0 becomes 120 BPM, a missing time signature becomes 4/4,
    /// and every inherited denominator takes the previous one (`/4` at the start). Each
    /// marker without an explicit anchor is anchored at
    /// `previous anchor + (tick - previous tick) / tick rate * previous tempo`.
    pub fn finalize_tempo_map(&mut self) {
        if self.tempos.first().is_none_or(|(&tick, _)| tick != 0) {
            log::debug!("no tempo at tick 0, inserting 120 BPM");
            self.tempos.insert(0, Tempo::default());
        }
        if self.time_sigs.first().is_none_or(|(&tick, _)| tick != 0) {
            log::debug!("no time signature at tick 0, inserting 4/4");
            self.time_sigs.insert(0, TimeSig::default());
        }

        let mut previous_denominator = DEFAULT_DENOMINATOR;
        for time_sig in self.time_sigs.values_mut() {
            if time_sig.denominator == DENOMINATOR_INHERIT {
                time_sig.denominator = previous_denominator;
            }
            previous_denominator = time_sig.denominator;
        }

        let tick_rate = f64::from(self.tick_rate);
        let mut previous: Option<(u64, Tempo)> = None;
        for (&tick, tempo) in self.tempos.iter_mut() {
            if !tempo.explicit_anchor {
                tempo.anchor = previous.map_or(0, |(previous_tick, previous_tempo)| {
                    let elapsed = (tick - previous_tick) as f64 / tick_rate
                        * f64::from(previous_tempo.micros_per_quarter);
                    previous_tempo.anchor.saturating_add(elapsed.round() as u64)
                });
            }
            previous = Some((tick, *tempo));
        }
    }

    fn seconds_with(&self, index: usize, tick: u64) -> f64 {
        let Some((&marker_tick, tempo)) = self.tempos.at(index) else {
            return tick as f64 / f64::from(self.tick_rate) * 0.5;
        };
        let elapsed = tick.saturating_sub(marker_tick) as f64;
        (f64::from(tempo.micros_per_quarter) * elapsed / f64::from(self.tick_rate)
            + tempo.anchor as f64)
            / MICROS_PER_SECOND
    }

    /// Converts a tick to seconds by binary search over the tempo map.
    #[must_use]
    pub fn convert_to_seconds(&self, tick: u64) -> f64 {
        let index = self.tempos.lower_bound(&tick).unwrap_or(0);
        self.seconds_with(index, tick)
    }

    /// Converts a tick to seconds, scanning forward from `hint`.
    ///
    /// `hint` is updated to the marker used, so converting increasing ticks is amortised
    /// O(1). A hint past the tick falls back to binary search.
    pub fn convert_to_seconds_from(&self, tick: u64, hint: &mut usize) -> f64 {
        if self
            .tempos
            .at(*hint)
            .is_none_or(|(&marker_tick, _)| marker_tick > tick)
        {
            *hint = self.tempos.lower_bound(&tick).unwrap_or(0);
        }
        while self
            .tempos
            .at(*hint + 1)
            .is_some_and(|(&marker_tick, _)| marker_tick <= tick)
        {
            *hint += 1;
        }
        self.seconds_with(*hint, tick)
    }

    /// Converts seconds to the nearest tick.
    #[must_use]
    pub fn convert_to_ticks(&self, seconds: f64) -> u64 {
        let micros = seconds * MICROS_PER_SECOND;
        let markers = self.tempos.as_slice();
        let index = markers
            .partition_point(|(_, tempo)| tempo.anchor as f64 <= micros)
            .saturating_sub(1);
        let Some((marker_tick, tempo)) = markers.get(index) else {
            return (micros * f64::from(self.tick_rate) / f64::from(DEFAULT_MICROS_PER_QUARTER))
                .round()
                .max(0.0) as u64;
        };
        let offset = (micros - tempo.anchor as f64) * f64::from(self.tick_rate)
            / f64::from(tempo.micros_per_quarter);
        (*marker_tick as f64 + offset).round().max(0.0) as u64
    }

    /// Pairs `tick` with its time in seconds.
    #[must_use]
    pub fn dual_position(&self, tick: u64) -> DualPosition {
        DualPosition {
            tick,
            seconds: self.convert_to_seconds(tick),
        }
    }

    /// The time signature in effect at `tick`.
    #[must_use]
    pub fn time_sig_at(&self, tick: u64) -> TimeSig {
        self.time_sigs
            .lower_bound(&tick)
            .and_then(|index| self.time_sigs.at(index))
            .map_or_else(TimeSig::default, |(_, time_sig)| *time_sig)
    }

    /// Releases spare capacity of every map.
    pub fn shrink_to_fit(&mut self) {
        self.tempos.shrink_to_fit();
        self.time_sigs.shrink_to_fit();
        self.beats.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn finalize_inserts_defaults() {
        let mut sync = SyncTrack::new(480);
        sync.add_time_sig(960, TimeSig::new(3, DENOMINATOR_INHERIT));
        sync.finalize_tempo_map();
        assert_eq!(sync.tempos().first(), Some((&0, &Tempo::default())));
        assert_eq!(sync.time_sigs().first(), Some((&0, &TimeSig::default())));
        assert_eq!(sync.time_sigs().get(&960).map(|ts| ts.denominator), Some(2));
    }

    #[test]
    fn anchors_propagate() {
        let mut sync = SyncTrack::new(480);
        sync.add_tempo(0, 500_000);
        sync.add_tempo(960, 250_000);
        sync.add_tempo(1920, 1_000_000);
        sync.finalize_tempo_map();
        let anchors: Vec<_> = sync.tempos().values().map(|tempo| tempo.anchor).collect();
        assert_eq!(anchors, vec![0, 1_000_000, 1_500_000]);
        assert!((sync.convert_to_seconds(480) - 0.5).abs() < 1e-9);
        assert!((sync.convert_to_seconds(1440) - 1.25).abs() < 1e-9);
        assert!((sync.convert_to_seconds(2400) - 2.5).abs() < 1e-9);
        assert_eq!(sync.convert_to_ticks(1.25), 1440);
    }

    #[test]
    fn explicit_anchor_is_kept() {
        let mut sync = SyncTrack::new(192);
        sync.add_tempo(0, 500_000);
        sync.add_anchor(384, 2_000_000);
        sync.add_tempo(384, 400_000);
        sync.add_tempo(768, 400_000);
        sync.finalize_tempo_map();
        let tempos: Vec<_> = sync.tempos().iter().map(|(&tick, tempo)| (tick, *tempo)).collect();
        assert_eq!(tempos[1].1.anchor, 2_000_000);
        assert_eq!(tempos[1].1.micros_per_quarter, 400_000);
        assert_eq!(tempos[2].1.anchor, 2_800_000);
    }

    #[test]
    fn duplicate_tempo_at_same_tick_keeps_last() {
        let mut sync = SyncTrack::new(192);
        sync.add_tempo(0, 500_000);
        sync.add_tempo(0, 600_000);
        sync.finalize_tempo_map();
        assert_eq!(sync.tempos().len(), 1);
        assert_eq!(sync.tempos()[0].micros_per_quarter, 600_000);
    }

    #[test]
    fn anchor_propagation_saturates() {
        let mut sync = SyncTrack::new(1);
        sync.add_anchor(0, u64::MAX - 10);
        sync.add_tempo(u64::MAX / 2, 4_000_000_000);
        sync.finalize_tempo_map();
        assert_eq!(sync.tempos()[1].anchor, u64::MAX);
    }

    #[test]
    fn extreme_time_sigs_are_clamped() {
        let mut sync = SyncTrack::new(480);
        sync.add_time_sig(0, TimeSig::new(4_000_000_000, 28));
        sync.add_time_sig(960, TimeSig::new(0, 200));
        sync.add_time_sig(1920, TimeSig::new(7, DENOMINATOR_INHERIT));
        sync.finalize_tempo_map();
        let time_sigs: Vec<_> = sync
            .time_sigs()
            .values()
            .map(|ts| (ts.numerator, ts.denominator))
            .collect();
        assert_eq!(
            time_sigs,
            vec![
                (MAX_NUMERATOR, MAX_DENOMINATOR),
                (1, MAX_DENOMINATOR),
                (7, MAX_DENOMINATOR),
            ]
        );
        assert_eq!(TimeSig::new(3, 40).denominator_value(), 64);
    }

    #[test]
    fn inherited_first_denominator_is_a_quarter() {
        let mut sync = SyncTrack::new(480);
        sync.add_time_sig(0, TimeSig::new(3, DENOMINATOR_INHERIT));
        sync.finalize_tempo_map();
        assert_eq!(sync.time_sig_at(0), TimeSig::new(3, DEFAULT_DENOMINATOR));
    }

    #[test]
    fn hinted_conversion_matches_binary_search() {
        let mut sync = SyncTrack::new(480);
        sync.add_tempo(0, 500_000);
        sync.add_tempo(1000, 300_000);
        sync.add_tempo(5000, 700_000);
        sync.finalize_tempo_map();
        let mut hint = 0;
        for tick in (0..8000).step_by(250) {
            let hinted = sync.convert_to_seconds_from(tick, &mut hint);
            assert!((hinted - sync.convert_to_seconds(tick)).abs() < 1e-12);
        }
        assert_eq!(hint, 2);
    }
}
