//! Line-oriented reader for `key = value` text (`.chart` and `.ini`).

use std::borrow::Cow;

use num::PrimInt;

use super::{TextCursor, is_whitespace};
use crate::error::Result;

/// A cursor over logical lines.
///
/// Blank lines, `//` and `;` comment lines, and lines holding only an opening brace are
/// skipped transparently by [`Self::goto_next_line`]. Inside a line `=` counts as
/// whitespace, so `768 = N 5 480` reads as the fields `768`, `N`, `5`, `480`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineReader<'a> {
    cursor: TextCursor<'a>,
}

impl<'a> LineReader<'a> {
    /// Creates a reader positioned on the first logical line of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        let mut reader = Self {
            cursor: TextCursor::new(data),
        };
        reader.settle_on_line();
        reader
    }

    /// The underlying cursor.
    #[must_use]
    pub const fn cursor(&self) -> &TextCursor<'a> {
        &self.cursor
    }

    /// The current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor.position()
    }

    /// The byte under the cursor within the current line.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.cursor.peek()
    }

    /// Whether the whole buffer was consumed.
    #[must_use]
    pub fn is_end_of_data(&self) -> bool {
        self.cursor.is_end_of_data()
    }

    /// Whether the current line was consumed.
    #[must_use]
    pub const fn is_end_of_line(&self) -> bool {
        self.cursor.is_end_of_scope()
    }

    /// Skips whitespace and `=` within the current line.
    pub fn skip_whitespace(&mut self) {
        let next = self.cursor.next();
        self.cursor
            .skip_while(next, |byte| is_whitespace(byte) || byte == b'=');
    }

    /// Advances by one byte and skips the whitespace after it.
    pub fn skip_byte(&mut self) {
        self.cursor.advance();
        self.skip_whitespace();
    }

    /// Moves to the start of the next logical line.
    pub fn goto_next_line(&mut self) {
        let next = self.cursor.next();
        self.cursor.set_position(next);
        self.settle_on_line();
    }

    fn settle_on_line(&mut self) {
        let len = self.cursor.data().len();
        loop {
            self.cursor.skip_while(len, is_whitespace);
            let start = self.cursor.position();
            let line_end = self.cursor.find_line_end(start);
            self.cursor.set_next(line_end);
            let line = super::trim_end(self.cursor.remaining_in_scope());
            let skippable = line.starts_with(b"//") || line.starts_with(b";") || line == b"{";
            if !skippable || start >= len {
                return;
            }
            self.cursor.set_position(line_end);
        }
    }

    /// The trimmed rest of the current line, without consuming it.
    #[must_use]
    pub fn peek_line(&self) -> &'a [u8] {
        super::trim_end(self.cursor.remaining_in_scope())
    }

    /// Reads a run of ASCII letters (a tag such as `TS` or `N`).
    pub fn read_alphabetic(&mut self) -> &'a [u8] {
        let start = self.cursor.position();
        let next = self.cursor.next();
        self.cursor.skip_while(next, |byte| byte.is_ascii_alphabetic());
        let tag = self
            .cursor
            .data()
            .get(start..self.cursor.position())
            .unwrap_or_default();
        self.skip_whitespace();
        tag
    }

    /// Reads a key up to whitespace or `=`.
    pub fn read_key(&mut self) -> &'a [u8] {
        let start = self.cursor.position();
        let next = self.cursor.next();
        self.cursor
            .skip_while(next, |byte| !is_whitespace(byte) && byte != b'=');
        let key = self
            .cursor
            .data()
            .get(start..self.cursor.position())
            .unwrap_or_default();
        self.skip_whitespace();
        key
    }

    /// Reads an integer field and skips the whitespace after it.
    pub fn try_read_integer<T: PrimInt>(&mut self) -> Option<T> {
        let value = self.cursor.try_read_integer()?;
        self.skip_whitespace();
        Some(value)
    }

    /// Reads an integer field and skips the whitespace after it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ReadError::ExpectedValue`] if no digits follow.
    pub fn read_integer<T: PrimInt>(&mut self, expected: &'static str) -> Result<T> {
        let value = self.cursor.read_integer(expected)?;
        self.skip_whitespace();
        Ok(value)
    }

    /// Reads a decimal field and skips the whitespace after it.
    pub fn try_read_f64(&mut self) -> Option<f64> {
        let value = self.cursor.try_read_f64()?;
        self.skip_whitespace();
        Some(value)
    }

    /// Returns the rest of the line as a span, removing wrapping quotes if `check_quotes`.
    pub fn extract_text_span(&mut self, check_quotes: bool) -> &'a [u8] {
        self.cursor.extract_text_span(check_quotes)
    }

    /// Returns the rest of the line as a string.
    pub fn extract_encoded_string(&mut self, check_quotes: bool) -> Cow<'a, str> {
        self.cursor.extract_encoded_string(check_quotes)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn skips_comments_and_braces() {
        let mut reader = LineReader::new(b"\n// comment\n{\n  768 = N 5 480\r\n; note\n\n}\n");
        assert_eq!(reader.try_read_integer::<u64>(), Some(768));
        assert_eq!(reader.read_alphabetic(), b"N");
        assert_eq!(reader.try_read_integer::<u32>(), Some(5));
        assert_eq!(reader.try_read_integer::<u64>(), Some(480));
        assert!(reader.is_end_of_line());
        reader.goto_next_line();
        assert_eq!(reader.peek(), Some(b'}'));
        reader.goto_next_line();
        assert!(reader.is_end_of_data());
    }

    #[test]
    fn key_value_pairs() {
        let mut reader = LineReader::new(b"Name = \"Song\"\nResolution=192\n");
        assert_eq!(reader.read_key(), b"Name");
        assert_eq!(reader.extract_encoded_string(true), "Song");
        reader.goto_next_line();
        assert_eq!(reader.read_key(), b"Resolution");
        assert_eq!(reader.try_read_integer::<u32>(), Some(192));
    }
}
