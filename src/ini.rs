//! `.ini` metadata reader.
//!
//! Parses `[section]` headers (matched case-insensitively) and `key = value` lines. Values
//! stay as strings; typed accessors parse them on demand with the same saturating number
//! parsers the chart readers use.

use std::collections::HashMap;

use itertools::Itertools;

use crate::text::{line::LineReader, number};

/// The `key = value` pairs of one section, in file order. Keys are lowercased.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IniSection {
    entries: Vec<(String, String)>,
}

impl IniSection {
    /// Adds an entry. Duplicate keys are kept in order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((key.into().to_ascii_lowercase(), value.into()));
    }

    /// All entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first value for `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Every value for `key`.
    pub fn get_all<'s>(&'s self, key: &'s str) -> impl Iterator<Item = &'s str> + 's {
        self.entries
            .iter()
            .filter(move |(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// The first value for `key` as a signed integer.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_str(key)
            .and_then(|value| number::parse_integer(value.trim().as_bytes()))
            .map(|(value, _)| value)
    }

    /// The first value for `key` as an unsigned integer.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get_str(key)
            .and_then(|value| number::parse_integer(value.trim().as_bytes()))
            .map(|(value, _)| value)
    }

    /// The first value for `key` as a decimal number.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_str(key)
            .and_then(|value| number::parse_float(value.trim().as_bytes()))
            .map(|(value, _)| value)
    }

    /// The first value for `key` as a boolean: `true`/`1` or `false`/`0`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let value = self.get_str(key)?.trim();
        if value.eq_ignore_ascii_case("true") || value == "1" {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") || value == "0" {
            Some(false)
        } else {
            None
        }
    }
}

/// A parsed `.ini` file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IniFile {
    sections: HashMap<String, IniSection>,
}

impl IniFile {
    /// Parses `data`. Lines before the first section header are ignored.
    #[must_use]
    pub fn parse(data: &[u8]) -> Self {
        let mut reader = LineReader::new(data);
        let mut sections: HashMap<String, IniSection> = HashMap::new();
        let mut current: Option<String> = None;
        while !reader.is_end_of_data() {
            let line = reader.peek_line();
            if let [b'[', name @ .., b']'] = line {
                let name = crate::text::decode_text(name).trim().to_ascii_lowercase();
                log::debug!("ini section [{name}]");
                sections.entry(name.clone()).or_default();
                current = Some(name);
            } else if let Some(section) = current.as_ref().and_then(|name| sections.get_mut(name))
            {
                let key = crate::text::decode_text(reader.read_key()).into_owned();
                if !key.is_empty() {
                    let value = reader.extract_encoded_string(true).into_owned();
                    section.push(key, value);
                }
            }
            reader.goto_next_line();
        }
        Self { sections }
    }

    /// The section named `name`, matched case-insensitively.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.get(&name.to_ascii_lowercase())
    }

    /// The `[song]` section of a `song.ini`.
    #[must_use]
    pub fn song(&self) -> Option<&IniSection> {
        self.section("song")
    }

    /// Names of all sections, lowercased and sorted.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str).sorted_unstable()
    }
}
