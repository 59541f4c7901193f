//! `.dta` S-expression tokenizer.
//!
//! A `.dta` file is a forest of parenthesised nodes whose atoms are bare words, numbers,
//! `'symbols'` or `"strings"`, with `;` comments running to the end of the line.
//! [`DtaReader::start_node`] finds the matching `)` of a node up front and narrows the
//! cursor scope to it, so everything read inside a node can never run past its end.

use std::borrow::Cow;

use num::PrimInt;

use crate::{
    error::{ReadError, Result, SectionNesting},
    text::{TextCursor, decode_text, is_whitespace},
};

/// A cursor over a `.dta` tree.
///
/// Cloning duplicates only the position and the node stack, so several readers can walk
/// the same buffer independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtaReader<'a> {
    cursor: TextCursor<'a>,
    node_ends: Vec<usize>,
}

impl<'a> DtaReader<'a> {
    /// Creates a reader positioned on the first token of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        let mut reader = Self {
            cursor: TextCursor::new(data),
            node_ends: Vec::new(),
        };
        reader.skip_whitespace();
        reader
    }

    /// The current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Number of nodes entered.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.node_ends.len()
    }

    /// The byte under the cursor within the current node.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.cursor.peek()
    }

    /// Whether every token of the current node (or of the file at depth 0) was read.
    #[must_use]
    pub const fn is_end_of_node(&self) -> bool {
        self.cursor.is_end_of_scope()
    }

    /// Skips whitespace and `;` comments within the current node.
    pub fn skip_whitespace(&mut self) {
        let next = self.cursor.next();
        loop {
            self.cursor.skip_while(next, is_whitespace);
            if self.cursor.peek() != Some(b';') {
                return;
            }
            self.cursor.skip_while(next, |byte| byte != b'\n');
        }
    }

    /// Enters the node opening at the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if the cursor is not on `(` and
    /// [`ReadError::UnterminatedToken`] if the node or a quoted atom inside it is never
    /// closed.
    pub fn start_node(&mut self) -> Result<()> {
        let start = self.cursor.position();
        if self.cursor.peek() != Some(b'(') {
            return Err(ReadError::ExpectedValue {
                position: start,
                expected: "`(`",
            });
        }
        let end = self.find_node_end(start)?;
        self.node_ends.push(end);
        self.cursor.set_next(end);
        self.cursor.advance();
        self.skip_whitespace();
        Ok(())
    }

    fn find_node_end(&self, start: usize) -> Result<usize> {
        let limit = self.cursor.next();
        let mut depth = 0usize;
        let mut position = start;
        while position < limit {
            let Some(byte) = self.cursor.byte_at(position) else {
                break;
            };
            match byte {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(position);
                    }
                }
                b'"' | b'\'' => {
                    position = self.find_closing_quote(position, byte, limit)?;
                }
                b';' => {
                    position = self.cursor.find_line_end(position).min(limit);
                    continue;
                }
                _ => {}
            }
            position += 1;
        }
        Err(ReadError::UnterminatedToken {
            position: start,
            expected: ')',
        })
    }

    fn find_closing_quote(&self, open: usize, quote: u8, limit: usize) -> Result<usize> {
        let mut position = open + 1;
        while position < limit {
            match self.cursor.byte_at(position) {
                Some(b'\\') if quote == b'"' => position += 2,
                Some(byte) if byte == quote => return Ok(position),
                Some(_) => position += 1,
                None => break,
            }
        }
        Err(ReadError::UnterminatedToken {
            position: open,
            expected: char::from(quote),
        })
    }

    /// Leaves the innermost node, moving past its `)`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidSectionNesting`] if no node is open.
    pub fn end_node(&mut self) -> Result<()> {
        let end = self.node_ends.pop().ok_or(SectionNesting::StackEmpty)?;
        let parent = self
            .node_ends
            .last()
            .copied()
            .unwrap_or(self.cursor.data().len());
        self.cursor.set_next(parent);
        self.cursor.set_position(end + 1);
        self.skip_whitespace();
        Ok(())
    }

    /// Reads the name atom right after `(`: a `'symbol'` or a bare word.
    ///
    /// Returns an empty span when the node starts with something else.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::UnterminatedToken`] for an unclosed `'symbol'`.
    pub fn get_name_of_node(&mut self) -> Result<&'a [u8]> {
        match self.cursor.peek() {
            Some(b'\'') => self.read_quoted(b'\''),
            Some(b'(' | b'"') | None => Ok(&[]),
            Some(_) => Ok(self.read_bare()),
        }
    }

    fn read_quoted(&mut self, quote: u8) -> Result<&'a [u8]> {
        let open = self.cursor.position();
        let close = self.find_closing_quote(open, quote, self.cursor.next())?;
        let span = self
            .cursor
            .data()
            .get(open + 1..close)
            .unwrap_or_default();
        self.cursor.set_position(close + 1);
        self.skip_whitespace();
        Ok(span)
    }

    fn read_bare(&mut self) -> &'a [u8] {
        let start = self.cursor.position();
        let next = self.cursor.next();
        self.cursor.skip_while(next, |byte| {
            !is_whitespace(byte) && !matches!(byte, b'(' | b')' | b';')
        });
        let span = self
            .cursor
            .data()
            .get(start..self.cursor.position())
            .unwrap_or_default();
        self.skip_whitespace();
        span
    }

    /// Reads a text atom: `"string"`, `'symbol'` or a bare word.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::UnterminatedToken`] for an unclosed quote and
    /// [`ReadError::ExpectedValue`] at the end of the node.
    pub fn extract_text(&mut self) -> Result<Cow<'a, str>> {
        let span = match self.cursor.peek() {
            Some(quote @ (b'"' | b'\'')) => self.read_quoted(quote)?,
            Some(b'(') | None => {
                return Err(ReadError::ExpectedValue {
                    position: self.cursor.position(),
                    expected: "text",
                });
            }
            Some(_) => self.read_bare(),
        };
        Ok(decode_text(span))
    }

    /// Reads an integer atom, saturating on overflow.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if the atom is not a number.
    pub fn extract_integer<T: PrimInt>(&mut self) -> Result<T> {
        let value = self.cursor.read_integer("integer")?;
        self.skip_whitespace();
        Ok(value)
    }

    /// Reads a decimal atom.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] if the atom is not a number.
    pub fn extract_float(&mut self) -> Result<f64> {
        let position = self.cursor.position();
        let value = self.cursor.try_read_f64().ok_or(ReadError::ExpectedValue {
            position,
            expected: "decimal",
        })?;
        self.skip_whitespace();
        Ok(value)
    }

    /// Reads a boolean atom: `TRUE`/`FALSE` in any case, or `1`/`0`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ExpectedValue`] for anything else.
    pub fn extract_bool(&mut self) -> Result<bool> {
        let position = self.cursor.position();
        let atom = self.read_bare();
        if atom.eq_ignore_ascii_case(b"true") || atom == b"1" {
            Ok(true)
        } else if atom.eq_ignore_ascii_case(b"false") || atom == b"0" {
            Ok(false)
        } else {
            Err(ReadError::ExpectedValue {
                position,
                expected: "boolean",
            })
        }
    }

    fn extract_list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        self.start_node()?;
        let mut items = Vec::new();
        while !self.is_end_of_node() {
            items.push(item(self)?);
        }
        self.end_node()?;
        Ok(items)
    }

    /// Reads a node of integers such as `(0 1 2)`.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::start_node`] and [`Self::extract_integer`].
    pub fn extract_list_integer<T: PrimInt>(&mut self) -> Result<Vec<T>> {
        self.extract_list(Self::extract_integer)
    }

    /// Reads a node of decimals.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::start_node`] and [`Self::extract_float`].
    pub fn extract_list_float(&mut self) -> Result<Vec<f64>> {
        self.extract_list(Self::extract_float)
    }

    /// Reads a node of text atoms.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::start_node`] and [`Self::extract_text`].
    pub fn extract_list_text(&mut self) -> Result<Vec<String>> {
        self.extract_list(|reader| reader.extract_text().map(Cow::into_owned))
    }
}
