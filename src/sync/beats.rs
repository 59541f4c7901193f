//! Beat grid synthesis from time signatures.
//!
//! One beat marker is placed every `tick_rate * 4 / denominator` ticks. The first marker
//! of a measure is a [`BeatStyle::Measure`], the first of every metronome click a
//! [`BeatStyle::Strong`], and the rest are [`BeatStyle::Weak`].

use super::{DualPosition, SyncTrack, TimeSig};

/// Kind of beat marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BeatStyle {
    /// First beat of a measure.
    Measure,
    /// First beat of a metronome click.
    Strong,
    /// Any other beat.
    Weak,
}

/// A beat marker with its position.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Beat {
    /// Where the beat is.
    pub position: DualPosition,
    /// What kind of beat it is.
    pub style: BeatStyle,
}

/// Beat placement derived from one time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Meter {
    ticks_per_marker: u64,
    numerator: u32,
    markers_per_click: u32,
    merge_leftover: bool,
}

impl Meter {
    fn new(time_sig: &TimeSig, tick_rate: u32) -> Self {
        let denominator = time_sig.denominator_value();
        let ticks_per_marker = (u64::from(tick_rate) * 4 / u64::from(denominator)).max(1);
        let numerator = time_sig.numerator.max(1);
        let markers_per_click = (u32::from(time_sig.metronome) * denominator / 96).max(1);
        let leftover_in_group = numerator % markers_per_click;
        // Odd or long measures: a short trailing group folds into the click before it
        // when the combined group is at most one and a half clicks long.
        let irregular = numerator > 4 || numerator % 2 == 1;
        let leftover = markers_per_click + leftover_in_group;
        let merge_leftover =
            irregular && leftover_in_group != 0 && 2 * leftover <= 3 * markers_per_click;
        Self {
            ticks_per_marker,
            numerator,
            markers_per_click,
            merge_leftover,
        }
    }

    fn style(&self, index_in_measure: u32) -> BeatStyle {
        if index_in_measure == 0 {
            return BeatStyle::Measure;
        }
        if index_in_measure % self.markers_per_click != 0 {
            return BeatStyle::Weak;
        }
        let trailing_group = self.numerator - self.numerator % self.markers_per_click;
        if self.merge_leftover && index_in_measure == trailing_group {
            BeatStyle::Weak
        } else {
            BeatStyle::Strong
        }
    }
}

impl SyncTrack {
    /// Replaces the beat grid with one synthesised from the time signatures.
    ///
    /// Beats are generated through the end of the measure that contains `last_tick`.
    pub fn generate_all_beats(&mut self, last_tick: u64) {
        self.beats.clear();
        for index in 0..self.time_sigs.len() {
            let Some((&start, _)) = self.time_sigs.at(index) else {
                break;
            };
            self.emit_span(index, start, 0, last_tick);
        }
        log::debug!(
            "generated {} beats through tick {last_tick}",
            self.beats.len()
        );
    }

    /// Extends an authored beat grid through the measure containing `last_tick`.
    ///
    /// The pattern continues from the last existing beat, counting from the most recent
    /// measure marker. Without any beats this is [`Self::generate_all_beats`].
    pub fn generate_leftover_beats(&mut self, last_tick: u64) {
        let Some((&last_beat, _)) = self.beats.last() else {
            self.generate_all_beats(last_tick);
            return;
        };
        let since_measure = self
            .beats
            .values()
            .rev()
            .position(|style| *style == BeatStyle::Measure)
            .unwrap_or(self.beats.len() - 1) as u32;
        let Some(sig_index) = self.time_sigs.lower_bound(&last_beat) else {
            return;
        };
        let meter = self.meter_at(sig_index);
        let next_tick = last_beat + meter.ticks_per_marker;
        let next_index = (since_measure + 1) % meter.numerator;
        self.emit_span(sig_index, next_tick, next_index, last_tick);
        for index in sig_index + 1..self.time_sigs.len() {
            let Some((&start, _)) = self.time_sigs.at(index) else {
                break;
            };
            if self.beats.last().is_some_and(|(&tick, _)| tick >= start) {
                continue;
            }
            self.emit_span(index, start, 0, last_tick);
        }
    }

    fn meter_at(&self, sig_index: usize) -> Meter {
        let time_sig = self
            .time_sigs
            .at(sig_index)
            .map_or_else(TimeSig::default, |(_, time_sig)| *time_sig);
        Meter::new(&time_sig, self.tick_rate)
    }

    fn emit_span(&mut self, sig_index: usize, mut tick: u64, mut index: u32, last_tick: u64) {
        let meter = self.meter_at(sig_index);
        let end = self.time_sigs.at(sig_index + 1).map(|(&tick, _)| tick);
        loop {
            if end.is_some_and(|end| tick >= end) {
                return;
            }
            if end.is_none() && tick > last_tick && index == 0 {
                return;
            }
            self.add_beat(tick, meter.style(index));
            tick += meter.ticks_per_marker;
            index = (index + 1) % meter.numerator;
        }
    }

    /// The beat at `index` with its time in seconds.
    #[must_use]
    pub fn beat(&self, index: usize) -> Option<Beat> {
        let (&tick, &style) = self.beats.at(index)?;
        Some(Beat {
            position: self.dual_position(tick),
            style,
        })
    }
}
