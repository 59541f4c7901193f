//! Zero-copy text cursors.
//!
//! [`TextCursor`] is the shared base: a position plus the end of the current logical scope
//! (`next`), which is the end of the line for [`line::LineReader`] and the closing
//! parenthesis of the current node for [`crate::dta::DtaReader`]. Every extraction stays
//! within `[position, next)` and works on bytes directly; strings are only decoded when a
//! caller asks for them.

pub mod line;
pub mod number;

use std::borrow::Cow;

use num::PrimInt;

use crate::error::{ReadError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Whether `byte` counts as whitespace (any control character or space).
#[must_use]
pub const fn is_whitespace(byte: u8) -> bool {
    byte <= b' '
}

/// Decodes bytes as UTF-8, widening each byte to a `char` (Latin-1) when validation fails.
#[must_use]
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&byte| char::from(byte)).collect()),
    }
}

/// The shared cursor state of the text readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCursor<'a> {
    data: &'a [u8],
    position: usize,
    next: usize,
}

impl<'a> TextCursor<'a> {
    /// Creates a cursor over `data`, skipping a UTF-8 byte order mark.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        let position = if data.starts_with(UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };
        Self {
            data,
            position,
            next: data.len(),
        }
    }

    /// The whole underlying slice.
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Moves to `position`.
    pub const fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// The end of the current scope.
    #[must_use]
    pub const fn next(&self) -> usize {
        self.next
    }

    /// Sets the end of the current scope.
    pub const fn set_next(&mut self, next: usize) {
        self.next = next;
    }

    /// The byte under the cursor if it is inside the current scope.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        if self.position < self.next {
            self.data.get(self.position).copied()
        } else {
            None
        }
    }

    /// The byte at `position` regardless of scope.
    #[must_use]
    pub fn byte_at(&self, position: usize) -> Option<u8> {
        self.data.get(position).copied()
    }

    /// Whether the cursor reached the end of the current scope.
    #[must_use]
    pub const fn is_end_of_scope(&self) -> bool {
        self.position >= self.next
    }

    /// Whether the cursor reached the end of the whole buffer.
    #[must_use]
    pub const fn is_end_of_data(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Advances by one byte.
    pub const fn advance(&mut self) {
        self.position += 1;
    }

    /// Advances while `predicate` holds, stopping at `limit`.
    pub fn skip_while(&mut self, limit: usize, mut predicate: impl FnMut(u8) -> bool) {
        while self.position < limit {
            match self.data.get(self.position) {
                Some(&byte) if predicate(byte) => self.position += 1,
                _ => break,
            }
        }
    }

    /// Skips whitespace inside the current scope.
    pub fn skip_spaces(&mut self) {
        self.skip_while(self.next, is_whitespace);
    }

    /// The offset of the next unescaped newline at or after `from`, or the buffer length.
    ///
    /// A newline preceded by an odd number of backslashes (before an optional `\r`) is
    /// part of the line.
    #[must_use]
    pub fn find_line_end(&self, from: usize) -> usize {
        let mut search = from;
        while let Some(offset) = self
            .data
            .get(search..)
            .and_then(|rest| rest.iter().position(|&byte| byte == b'\n'))
        {
            let newline = search + offset;
            if !is_escaped(self.data.get(from..newline).unwrap_or_default()) {
                return newline;
            }
            search = newline + 1;
        }
        self.data.len()
    }

    /// The bytes between the cursor and the end of the scope.
    #[must_use]
    pub fn remaining_in_scope(&self) -> &'a [u8] {
        self.data.get(self.position..self.next).unwrap_or_default()
    }

    /// Returns the rest of the scope as a span and moves the cursor to its end.
    ///
    /// Trailing whitespace is trimmed. With `check_quotes`, a wrapping pair of `"` is
    /// removed as well; quotes escaped with a backslash inside the span are kept.
    pub fn extract_text_span(&mut self, check_quotes: bool) -> &'a [u8] {
        let mut span = trim_end(self.remaining_in_scope());
        self.position = self.next.max(self.position);
        if check_quotes
            && span.len() >= 2
            && span.first() == Some(&b'"')
            && span.last() == Some(&b'"')
            && span.get(span.len() - 2) != Some(&b'\\')
        {
            span = span.get(1..span.len() - 1).unwrap_or_default();
        }
        span
    }

    /// Like [`Self::extract_text_span`], decoded as UTF-8 with a Latin-1 fallback.
    pub fn extract_encoded_string(&mut self, check_quotes: bool) -> Cow<'a, str> {
        decode_text(self.extract_text_span(check_quotes))
    }

    /// Reads an integer, saturating on overflow. Returns `None` if no digits follow.
    pub fn try_read_integer<T: PrimInt>(&mut self) -> Option<T> {
        let (value, used) = number::parse_integer::<T>(self.remaining_in_scope())?;
        self.position += used;
        Some(value)
    }

    /// Reads an integer, saturating on overflow.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if no digits follow.
    pub fn read_integer<T: PrimInt>(&mut self, expected: &'static str) -> Result<T> {
        self.try_read_integer().ok_or(ReadError::ExpectedValue {
            position: self.position,
            expected,
        })
    }

    /// Reads a decimal number. Returns `None` if no digits follow.
    pub fn try_read_f64(&mut self) -> Option<f64> {
        let (value, used) = number::parse_float(self.remaining_in_scope())?;
        self.position += used;
        Some(value)
    }

    /// Reads a decimal number as `f32`. Returns `None` if no digits follow.
    pub fn try_read_f32(&mut self) -> Option<f32> {
        self.try_read_f64().map(|value| value as f32)
    }
}

/// Trims trailing whitespace.
#[must_use]
pub fn trim_end(mut bytes: &[u8]) -> &[u8] {
    while let [rest @ .., last] = bytes {
        if !is_whitespace(*last) {
            break;
        }
        bytes = rest;
    }
    bytes
}

/// Whether a newline following `line` is escaped.
fn is_escaped(line: &[u8]) -> bool {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    line.iter().rev().take_while(|&&byte| byte == b'\\').count() % 2 == 1
}
