//! Bounds-checked binary cursor with nested sections.
//!
//! A [`BinaryCursor`] walks a borrowed byte slice. Sections narrow the readable range: after
//! [`BinaryCursor::enter_section`] every read is checked against the new boundary, and
//! [`BinaryCursor::exit_section`] jumps to the end of the section regardless of how much of
//! it was consumed. The invariant `position <= top boundary <= parent boundary <= ... <= len`
//! holds at all times.

use arrayvec::ArrayVec;

use crate::error::{ReadError, Result, SectionNesting};

/// Maximum depth of nested sections.
pub const MAX_SECTION_DEPTH: usize = 8;

/// Byte order of a fixed-width read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// A primitive that can be decoded from a fixed number of bytes.
pub trait FromBytes: Sized {
    /// Width in bytes.
    const SIZE: usize;

    /// Decodes from exactly [`Self::SIZE`] bytes.
    fn from_bytes(bytes: &[u8], endian: Endian) -> Self;
}

macro_rules! impl_from_bytes {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromBytes for $ty {
                const SIZE: usize = size_of::<$ty>();

                fn from_bytes(bytes: &[u8], endian: Endian) -> Self {
                    let mut raw = [0u8; size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    match endian {
                        Endian::Little => <$ty>::from_le_bytes(raw),
                        Endian::Big => <$ty>::from_be_bytes(raw),
                    }
                }
            }
        )*
    };
}

impl_from_bytes!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// A saved cursor state, restorable with [`BinaryCursor::restore_checkpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryCheckpoint {
    position: usize,
    boundaries: ArrayVec<usize, MAX_SECTION_DEPTH>,
}

/// A cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    data: &'a [u8],
    position: usize,
    boundaries: ArrayVec<usize, MAX_SECTION_DEPTH>,
}

impl<'a> BinaryCursor<'a> {
    /// Creates a cursor at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            boundaries: ArrayVec::new(),
        }
    }

    /// The current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// The end offset of the innermost section, or the buffer length outside of any section.
    #[must_use]
    pub fn boundary(&self) -> usize {
        self.boundaries.last().copied().unwrap_or(self.data.len())
    }

    /// Number of open sections.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.boundaries.len()
    }

    /// Bytes left before the current boundary.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.boundary() - self.position
    }

    /// Whether the cursor reached the current boundary.
    #[must_use]
    pub fn is_at_boundary(&self) -> bool {
        self.position >= self.boundary()
    }

    /// Saves the current state.
    #[must_use]
    pub fn save_checkpoint(&self) -> BinaryCheckpoint {
        BinaryCheckpoint {
            position: self.position,
            boundaries: self.boundaries.clone(),
        }
    }

    /// Restores a state saved by [`Self::save_checkpoint`].
    pub fn restore_checkpoint(&mut self, checkpoint: BinaryCheckpoint) {
        self.position = checkpoint.position;
        self.boundaries = checkpoint.boundaries;
    }

    /// Narrows the readable range to the next `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidSectionNesting`] if the section would end past the
    /// enclosing boundary or if [`MAX_SECTION_DEPTH`] sections are already open.
    pub fn enter_section(&mut self, len: usize) -> Result<()> {
        let parent = self.boundary();
        let requested = self.position.saturating_add(len);
        if requested > parent {
            return Err(SectionNesting::BeyondParent { requested, parent }.into());
        }
        self.boundaries
            .try_push(requested)
            .map_err(|_| SectionNesting::StackFull)?;
        Ok(())
    }

    /// Jumps to the end of the innermost section and closes it.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidSectionNesting`] if no section is open.
    pub fn exit_section(&mut self) -> Result<()> {
        let end = self.boundaries.pop().ok_or(SectionNesting::StackEmpty)?;
        self.position = end;
        Ok(())
    }

    fn truncated(&self, requested: usize) -> ReadError {
        ReadError::TruncatedData {
            position: self.position,
            requested,
            available: self.remaining(),
        }
    }

    /// Reads `len` raw bytes without copying, or `None` if they cross the boundary.
    pub fn try_read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.remaining() {
            return None;
        }
        let bytes = self.data.get(self.position..self.position + len)?;
        self.position += len;
        Some(bytes)
    }

    /// Reads `len` raw bytes without copying.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if they cross the boundary.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let error = self.truncated(len);
        self.try_read_bytes(len).ok_or(error)
    }

    /// Reads every byte up to the boundary.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let start = self.position;
        self.position = self.boundary();
        self.data.get(start..self.position).unwrap_or_default()
    }

    /// Advances by `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if they cross the boundary.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Returns the next byte without consuming it.
    #[must_use]
    pub fn peek_u8(&self) -> Option<u8> {
        if self.is_at_boundary() {
            return None;
        }
        self.data.get(self.position).copied()
    }

    /// Reads a primitive, or `None` if it crosses the boundary.
    pub fn try_read<T: FromBytes>(&mut self, endian: Endian) -> Option<T> {
        self.try_read_bytes(T::SIZE)
            .map(|bytes| T::from_bytes(bytes, endian))
    }

    /// Reads a primitive.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if it crosses the boundary.
    pub fn read<T: FromBytes>(&mut self, endian: Endian) -> Result<T> {
        self.read_bytes(T::SIZE)
            .map(|bytes| T::from_bytes(bytes, endian))
    }

    /// Reads a little-endian primitive.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if it crosses the boundary.
    pub fn read_le<T: FromBytes>(&mut self) -> Result<T> {
        self.read(Endian::Little)
    }

    /// Reads a big-endian primitive.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if it crosses the boundary.
    pub fn read_be<T: FromBytes>(&mut self) -> Result<T> {
        self.read(Endian::Big)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] at the boundary.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read(Endian::Little)
    }

    /// Reads a boolean stored as one byte.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] at the boundary.
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_u8().map(|byte| byte != 0)
    }

    /// Decodes an unsigned LEB128 integer of at most five bytes.
    ///
    /// The fifth byte may only carry the four high bits of a `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::MalformedVarint`] if the value does not fit, or
    /// [`ReadError::TruncatedData`] if the bytes run past the boundary.
    pub fn read_leb128(&mut self) -> Result<u32> {
        const LAST_BYTE_MASK: u8 = 0xF0;
        let start = self.position;
        let mut value = 0u32;
        for index in 0..5 {
            let byte = self.read_u8()?;
            if index == 4 {
                if byte & LAST_BYTE_MASK != 0 {
                    return Err(ReadError::MalformedVarint { position: start });
                }
                return Ok(value | (u32::from(byte) << 28));
            }
            value |= u32::from(byte & 0x7F) << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ReadError::MalformedVarint { position: start })
    }

    /// Decodes a MIDI variable-length quantity of at most four bytes (28 bits).
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::MalformedVarint`] if a fourth byte still has its continuation
    /// bit set, or [`ReadError::TruncatedData`] if the bytes run past the boundary.
    pub fn read_vlq(&mut self) -> Result<u32> {
        let start = self.position;
        let mut value = 0u32;
        for _ in 0..4 {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ReadError::MalformedVarint { position: start })
    }

    /// Splits off a cursor over the next `len` bytes and advances past them.
    ///
    /// The sub-cursor borrows the same slice, so several of them can be handed to different
    /// threads without synchronisation.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::TruncatedData`] if the range crosses the boundary.
    pub fn create_sub_reader(&mut self, len: usize) -> Result<BinaryCursor<'a>> {
        self.read_bytes(len).map(BinaryCursor::new)
    }
}

/// Encodes `value` as unsigned LEB128.
#[must_use]
pub fn encode_leb128(mut value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Encodes `value` as a MIDI variable-length quantity. Values above 28 bits are encoded as
/// they are, which readers reject.
#[must_use]
pub fn encode_vlq(value: u32) -> Vec<u8> {
    let mut groups = vec![(value & 0x7F) as u8];
    let mut rest = value >> 7;
    while rest != 0 {
        groups.push((rest & 0x7F) as u8 | 0x80);
        rest >>= 7;
    }
    groups.reverse();
    groups
}
