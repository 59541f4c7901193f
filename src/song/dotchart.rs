//! Assembles a [`SongChart`] from a `.chart` file.

use super::{Instrument, InstrumentKind, SongChart};
use crate::{
    chart::{ChartEventType, ChartReader, ChartSection, DEFAULT_RESOLUTION},
    error::{ReadError, Result},
    settings::{ParseSettings, SourceFormat},
    track::{
        Difficulty, drums,
        fret::{self, FiveFret, SixFret},
        push_text_event,
        vocals::{self, ChartLyricEvents},
    },
};

const SECTION_PREFIX: &str = "section ";

impl SongChart {
    /// Decodes and finalises a `.chart` file.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidTickRate`] for a `Resolution` of zero, and any error
    /// raised by the chart reader.
    pub fn from_dotchart(data: &[u8], settings: &ParseSettings) -> Result<Self> {
        let mut reader = ChartReader::new(data);
        let mut chart = Self::new(DEFAULT_RESOLUTION);

        while let Some(section) = reader.next_section()? {
            match section {
                ChartSection::Song => {
                    let modifiers = reader.extract_song_modifiers();
                    if let Some(resolution) = modifiers.get_u64("resolution") {
                        let tick_rate = u32::try_from(resolution).unwrap_or(u32::MAX);
                        if tick_rate == 0 {
                            return Err(ReadError::InvalidTickRate(tick_rate));
                        }
                        chart.sync.set_tick_rate(tick_rate);
                    }
                    chart.modifiers = modifiers;
                }
                ChartSection::SyncTrack => chart.read_sync_track(&mut reader)?,
                ChartSection::Events => chart.read_chart_events(&mut reader)?,
                ChartSection::Instrument(instrument, difficulty) => {
                    chart.read_difficulty(&mut reader, instrument, difficulty)?;
                }
                ChartSection::Other(name) => {
                    log::debug!("skipping chart section [{name}]");
                    reader.skip_track();
                }
            }
        }

        chart.finalize(settings, SourceFormat::DotChart);
        Ok(chart)
    }

    fn read_sync_track(&mut self, reader: &mut ChartReader<'_>) -> Result<()> {
        while let Some((tick, kind)) = reader.next_event()? {
            match kind {
                ChartEventType::Bpm => self.sync.add_tempo(tick, reader.extract_microseconds()?),
                ChartEventType::TimeSig => self.sync.add_time_sig(tick, reader.extract_time_sig()?),
                ChartEventType::Anchor => self.sync.add_anchor(tick, reader.extract_anchor()?),
                _ => {}
            }
        }
        Ok(())
    }

    fn read_chart_events(&mut self, reader: &mut ChartReader<'_>) -> Result<()> {
        let mut lyrics = ChartLyricEvents::new();
        while let Some((tick, kind)) = reader.next_event()? {
            if kind != ChartEventType::Text {
                continue;
            }
            let text = reader.extract_text();
            if lyrics.handle(&mut self.vocals, tick, &text) {
                continue;
            }
            match text.strip_prefix(SECTION_PREFIX) {
                Some(name) => {
                    *self.sections.get_or_add_back(tick, String::new) = name.trim().to_owned();
                }
                None => push_text_event(&mut self.global_events, tick, text),
            }
        }
        Ok(())
    }

    fn read_difficulty(
        &mut self,
        reader: &mut ChartReader<'_>,
        instrument: Instrument,
        difficulty: Difficulty,
    ) -> Result<()> {
        if instrument.kind() == InstrumentKind::Drums {
            let track = self.drums.difficulty_mut(difficulty);
            if !track.is_empty() {
                log::debug!("skipping duplicate {difficulty:?} drums");
                reader.skip_track();
                return Ok(());
            }
            return drums::decode_chart(reader, track);
        }
        if instrument.kind() == InstrumentKind::Vocals {
            if !self.vocals.is_empty() {
                log::debug!("skipping {difficulty:?} vocals, lyrics already read");
                reader.skip_track();
                return Ok(());
            }
            return vocals::decode_chart(reader, &mut self.vocals);
        }
        let Some(track) = self.fret_track_mut(instrument) else {
            reader.skip_track();
            return Ok(());
        };
        let track = track.difficulty_mut(difficulty);
        if !track.is_empty() {
            log::debug!("skipping duplicate {difficulty:?} {instrument:?}");
            reader.skip_track();
            return Ok(());
        }
        match instrument.kind() {
            InstrumentKind::SixFret => fret::decode_chart::<SixFret>(reader, track),
            _ => fret::decode_chart::<FiveFret>(reader, track),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        settings::DrumsType,
        track::{
            note::{ForceState, OPEN_LANE, Sustain},
            phrase::{SpecialPhrase, SpecialPhraseType},
        },
    };

    const CHART: &[u8] = b"[Song]\n{\n  Name = \"Song\"\n  Resolution = 192\n  Offset = 0\n}\n\
[SyncTrack]\n{\n  0 = TS 4\n  0 = B 120000\n  768 = B 240000\n}\n\
[Events]\n{\n  0 = E \"section Intro\"\n  384 = E \"lighting (flare)\"\n  384 = E phrase_start\n\
  400 = E \"lyric Hey\"\n  450 = E phrase_end\n}\n\
[ExpertSingle]\n{\n  0 = N 0 0\n  48 = N 1 0\n  96 = N 1 0\n  96 = N 5 0\n\
  192 = N 7 100\n  192 = S 2 192\n  384 = E solo\n  400 = N 2 0\n  400 = N 6 0\n  500 = E soloend\n}\n\
[ExpertGHLGuitar]\n{\n  0 = N 8 0\n  0 = N 3 0\n}\n\
[ExpertDrums]\n{\n  0 = N 5 0\n}\n\
[ExpertVocals]\n{\n  0 = E \"}\"\n}\n";

    #[test]
    fn decodes_every_section() {
        let chart = SongChart::from_dotchart(CHART, &ParseSettings::default()).unwrap();

        assert_eq!(chart.modifiers.get_str("name"), Some("Song"));
        assert_eq!(chart.sync.tick_rate(), 192);
        assert_eq!(chart.sync.tempos().len(), 2);
        assert!((chart.sync.convert_to_seconds(768) - 2.0).abs() < 1e-9);
        assert!((chart.sync.convert_to_seconds(960) - 2.25).abs() < 1e-9);
        assert_eq!(chart.sections.get(&0).map(String::as_str), Some("Intro"));
        assert_eq!(
            chart.global_events.get(&384),
            Some(&vec!["lighting (flare)".to_owned()])
        );

        let guitar = chart.fret_track(Instrument::Guitar).unwrap();
        let expert = guitar.difficulty(Difficulty::Expert);
        let forcing: Vec<_> = expert.notes.values().map(|note| note.forcing).collect();
        // 48 ticks apart is within 65, so the second note is a natural HOPO. The third
        // repeats its lane and would be strummed, but N 5 flips it.
        assert_eq!(
            forcing,
            vec![
                ForceState::Strum,
                ForceState::Hopo,
                ForceState::Hopo,
                ForceState::Strum,
                ForceState::Strum,
            ]
        );
        assert_eq!(expert.notes[3].lane(OPEN_LANE), Some(Sustain::Closed(100)));
        assert!(expert.notes[4].is_tap);
        let kinds: Vec<_> = expert
            .phrases
            .values()
            .flatten()
            .map(|phrase| (phrase.kind, phrase.length))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (SpecialPhraseType::StarPower, Sustain::Closed(192)),
                (SpecialPhraseType::Solo, Sustain::Closed(116)),
            ]
        );

        let ghl = chart.fret_track(Instrument::SixFretGuitar).unwrap();
        let chord = ghl.difficulty(Difficulty::Expert).notes[0];
        assert_eq!(chord.lane_mask(), 0b101_0000);

        assert_eq!(chart.drums_type, DrumsType::FiveLane);
        assert_eq!(chart.fret_tracks().count(), 2);

        // [Events] lyrics fill the vocals, so the [ExpertVocals] block is skipped.
        assert_eq!(chart.vocals.lyrics.get(&400).map(String::as_str), Some("Hey"));
        assert_eq!(
            chart.vocals.phrases.get(&384),
            Some(&vec![SpecialPhrase {
                kind: SpecialPhraseType::LyricLine,
                length: Sustain::Closed(66),
            }])
        );
        assert!(chart.vocals.events.is_empty());
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let data = b"[Song]\n{\n  Resolution = 0\n}\n";
        assert_eq!(
            SongChart::from_dotchart(data, &ParseSettings::default()),
            Err(ReadError::InvalidTickRate(0))
        );
    }

    #[test]
    fn out_of_order_ticks_fail() {
        let data = b"[ExpertSingle]\n{\n  10 = N 0 0\n  5 = N 1 0\n}\n";
        assert_eq!(
            SongChart::from_dotchart(data, &ParseSettings::default()),
            Err(ReadError::OutOfOrderTick {
                previous: 10,
                found: 5,
            })
        );
    }
}
