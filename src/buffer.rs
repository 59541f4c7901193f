//! Owned and borrowed byte buffers that every cursor reads from.
//!
//! An [`OwnedBuffer`] is either a heap allocation (usually a whole file), a shared
//! reference-counted allocation, or a borrowed range of memory owned by someone else.
//! Cursors never own bytes: they borrow `&'a [u8]` from the buffer, so the compiler
//! rejects any cursor that would outlive its buffer.

use std::{ops::Range, path::Path, sync::Arc};

use crate::binary::BinaryCursor;

/// A contiguous byte range with exactly one owner.
#[derive(Debug, Clone)]
pub enum OwnedBuffer<'a> {
    /// Bytes allocated by this buffer, e.g. loaded from a file.
    Heap(Box<[u8]>),
    /// Bytes supplied by the caller and shared with it.
    Shared(Arc<[u8]>),
    /// A borrowed view into memory owned elsewhere.
    Borrowed(&'a [u8]),
}

impl OwnedBuffer<'static> {
    /// Loads the whole file at `path` into a heap buffer.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        log::debug!("loaded {} bytes from {}", bytes.len(), path.as_ref().display());
        Ok(Self::Heap(bytes.into_boxed_slice()))
    }

    /// Takes ownership of `bytes`.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self::Heap(bytes.into_boxed_slice())
    }

    /// Shares an existing reference-counted allocation.
    #[must_use]
    pub const fn from_shared(bytes: Arc<[u8]>) -> Self {
        Self::Shared(bytes)
    }
}

impl<'a> OwnedBuffer<'a> {
    /// Wraps a caller-owned slice without copying.
    #[must_use]
    pub const fn borrowed(bytes: &'a [u8]) -> Self {
        Self::Borrowed(bytes)
    }

    /// The bytes held by this buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Heap(bytes) => bytes,
            Self::Shared(bytes) => bytes,
            Self::Borrowed(bytes) => bytes,
        }
    }

    /// Number of bytes in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Borrows a sub-range of this buffer. Returns `None` when the range is out of bounds.
    #[must_use]
    pub fn sub_buffer(&self, range: Range<usize>) -> Option<OwnedBuffer<'_>> {
        self.as_slice().get(range).map(OwnedBuffer::Borrowed)
    }

    /// Whether this buffer owns its bytes rather than borrowing them.
    #[must_use]
    pub const fn is_owner(&self) -> bool {
        !matches!(self, Self::Borrowed(_))
    }

    /// Creates a binary cursor over the whole buffer.
    #[must_use]
    pub fn binary_cursor(&self) -> BinaryCursor<'_> {
        BinaryCursor::new(self.as_slice())
    }

    /// Moves borrowed bytes into a heap allocation so the buffer no longer borrows anything.
    #[must_use]
    pub fn into_owned(self) -> OwnedBuffer<'static> {
        match self {
            Self::Heap(bytes) => OwnedBuffer::Heap(bytes),
            Self::Shared(bytes) => OwnedBuffer::Shared(bytes),
            Self::Borrowed(bytes) => OwnedBuffer::Heap(bytes.into()),
        }
    }
}

impl AsRef<[u8]> for OwnedBuffer<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::ops::Deref for OwnedBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl From<Vec<u8>> for OwnedBuffer<'static> {
    fn from(value: Vec<u8>) -> Self {
        Self::from_vec(value)
    }
}

impl<'a> From<&'a [u8]> for OwnedBuffer<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self::Borrowed(value)
    }
}
