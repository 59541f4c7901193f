//! Readers for rhythm-game chart files.
//!
//! `tickchart` decodes standard MIDI files and `.chart` files into tick-indexed note
//! timelines, and reads the `.dta` and `.ini` metadata that usually ship next to them.
//!
//! The crate is layered:
//!
//! - [`buffer`] owns the bytes, [`binary`] and [`text`] read them through bounded cursors.
//! - [`midi`], [`chart`], [`dta`] and [`ini`] tokenize one format each.
//! - [`sync`] turns tempo markers and time signatures into a tick/second timeline and a
//!   beat grid, backed by the sorted [`flat_map::FlatMap`].
//! - [`track`] decodes fretted and drums notes, and [`song`] assembles a whole
//!   [`song::SongChart`] from a buffer.
//!
//! ```
//! use tickchart::prelude::*;
//!
//! let data = b"[SyncTrack]\n{\n  0 = B 120000\n}\n[ExpertSingle]\n{\n  0 = N 0 0\n  96 = N 1 0\n}\n";
//! let chart = SongChart::from_dotchart(data, &ParseSettings::default()).unwrap();
//! let guitar = chart.fret_track(Instrument::Guitar).unwrap();
//! assert_eq!(guitar.difficulty(Difficulty::Expert).notes.len(), 2);
//! assert_eq!(chart.sync.convert_to_seconds(192), 0.5);
//! ```
//!
//! Enable the `serde` feature to serialize decoded charts.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod binary;
pub mod buffer;
pub mod chart;
pub mod dta;
pub mod error;
pub mod flat_map;
pub mod ini;
pub mod midi;
pub mod prelude;
pub mod settings;
pub mod song;
pub mod sync;
pub mod text;
pub mod track;
