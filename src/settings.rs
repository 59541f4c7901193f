//! Options that change how notes are decoded.

use std::path::Path;

use crate::ini::IniSection;

/// How lane 4 and lane 5 of a drums track are read.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrumsType {
    /// Four pads plus kick. Lane 4 is green and a lane 5 note folds onto it.
    FourLane,
    /// Five pads plus kick. Lane 4 is orange and lane 5 is green.
    FiveLane,
    /// Decided per chart: five-lane if any lane 5 note exists.
    #[default]
    Unknown,
}

/// Which source format a chart came from. Selects the format defaults of [`ParseSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceFormat {
    /// A standard MIDI file.
    Midi,
    /// A `.chart` file.
    DotChart,
}

impl SourceFormat {
    /// Picks the format from a file extension: `mid`/`midi` or `chart`, in any case.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "mid" | "midi" => Some(Self::Midi),
            "chart" => Some(Self::DotChart),
            _ => None,
        }
    }
}

/// Decoding options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseSettings {
    /// The largest tick gap after which a note can still be a natural HOPO.
    /// `None` uses the format default.
    pub hopo_threshold: Option<u64>,
    /// Sustains at or below this length are cut to zero. `None` uses the format default.
    pub sustain_cutoff_threshold: Option<u64>,
    /// The MIDI note that marks star power phrases.
    pub star_power_note: u8,
    /// How drums lanes are read.
    pub drums_type: DrumsType,
}

/// The MIDI star power note of Rock Band charts.
pub const DEFAULT_STAR_POWER_NOTE: u8 = 116;

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            hopo_threshold: None,
            sustain_cutoff_threshold: None,
            star_power_note: DEFAULT_STAR_POWER_NOTE,
            drums_type: DrumsType::Unknown,
        }
    }
}

impl ParseSettings {
    /// The HOPO threshold in ticks for a chart of `format` at `tick_rate`.
    #[must_use]
    pub fn hopo_threshold_for(&self, format: SourceFormat, tick_rate: u32) -> u64 {
        self.hopo_threshold.unwrap_or_else(|| {
            let tick_rate = u64::from(tick_rate);
            match format {
                SourceFormat::DotChart => tick_rate * 65 / 192,
                SourceFormat::Midi => tick_rate * 170 / 480,
            }
        })
    }

    /// Overrides settings with the `song.ini` keys `hopo_frequency`,
    /// `sustain_cutoff_threshold`, `multiplier_note` and `five_lane_drums`.
    ///
    /// Negative or malformed values leave the setting unchanged.
    pub fn apply_modifiers(&mut self, modifiers: &IniSection) {
        let non_negative = |key: &str| {
            modifiers
                .get_i64(key)
                .and_then(|value| u64::try_from(value).ok())
        };
        if let Some(threshold) = non_negative("hopo_frequency") {
            self.hopo_threshold = Some(threshold);
        }
        if let Some(cutoff) = non_negative("sustain_cutoff_threshold") {
            self.sustain_cutoff_threshold = Some(cutoff);
        }
        if let Some(note) = non_negative("multiplier_note").and_then(|note| u8::try_from(note).ok()) {
            self.star_power_note = note;
        }
        if let Some(five_lane) = modifiers.get_bool("five_lane_drums") {
            self.drums_type = if five_lane {
                DrumsType::FiveLane
            } else {
                DrumsType::FourLane
            };
        }
    }

    /// The sustain cutoff in ticks for a chart of `format` at `tick_rate`.
    #[must_use]
    pub fn sustain_cutoff_for(&self, format: SourceFormat, tick_rate: u32) -> u64 {
        self.sustain_cutoff_threshold
            .unwrap_or_else(|| match format {
                SourceFormat::DotChart => 0,
                SourceFormat::Midi => u64::from(tick_rate) / 3,
            })
    }
}
