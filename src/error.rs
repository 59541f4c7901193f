//! Errors raised by the readers and decoders.
//!
//! Every reader fails fast: once a [`ReadError`] is returned the reader instance should be
//! discarded. [`LoadError`] additionally covers the file-system entry points.

use thiserror::Error;

/// Why a section boundary could not be pushed or popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SectionNesting {
    /// The boundary stack already holds the maximum number of sections.
    StackFull,
    /// There was no section to exit.
    StackEmpty,
    /// The requested boundary lies past the enclosing one.
    BeyondParent {
        /// The absolute end offset that was requested.
        requested: usize,
        /// The absolute end offset of the enclosing section.
        parent: usize,
    },
}

impl std::fmt::Display for SectionNesting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StackFull => write!(f, "section stack is full"),
            Self::StackEmpty => write!(f, "no section to exit"),
            Self::BeyondParent { requested, parent } => {
                write!(f, "section end {requested} exceeds enclosing end {parent}")
            }
        }
    }
}

/// An error occurred while reading chart data.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ReadError {
    /// A read would cross the current section boundary.
    #[error("truncated data at {position}: needed {requested} bytes, {available} available")]
    TruncatedData {
        /// Cursor position when the read was attempted.
        position: usize,
        /// Bytes the read needed.
        requested: usize,
        /// Bytes left before the boundary.
        available: usize,
    },
    /// A LEB128 or VLQ integer used more bytes or bits than allowed.
    #[error("malformed variable-length integer at {position}")]
    MalformedVarint {
        /// Position of the first byte of the integer.
        position: usize,
    },
    /// A tick went backwards within a single pass.
    #[error("tick {found} is lower than the previous tick {previous}")]
    OutOfOrderTick {
        /// The last accepted tick.
        previous: u64,
        /// The offending tick.
        found: u64,
    },
    /// Section stack overflow or underflow, or a child section exceeding its parent.
    #[error("invalid section nesting: {0}")]
    InvalidSectionNesting(SectionNesting),
    /// A node or quoted text was never closed.
    #[error("unterminated token starting at {position}, expected `{expected}`")]
    UnterminatedToken {
        /// Where the token starts.
        position: usize,
        /// The terminator that was never found.
        expected: char,
    },
    /// A MIDI chunk carried the wrong four-byte tag.
    #[error("expected chunk `{expected}` at {position}, found {found:?}")]
    InvalidChunkTag {
        /// Position of the tag.
        position: usize,
        /// The tag that was required.
        expected: &'static str,
        /// The bytes that were found.
        found: [u8; 4],
    },
    /// A MIDI data byte appeared with no channel status to reuse.
    #[error("data byte at {position} without an established running status")]
    MissingRunningStatus {
        /// Position of the data byte.
        position: usize,
    },
    /// A `.chart` section header could not be read.
    #[error("invalid section header at {position}: {message}")]
    InvalidHeader {
        /// Position of the header.
        position: usize,
        /// What was wrong with it.
        message: String,
    },
    /// A required field was absent.
    #[error("expected {expected} at {position}")]
    ExpectedValue {
        /// Cursor position.
        position: usize,
        /// What was expected.
        expected: &'static str,
    },
    /// The tick rate (resolution) was zero or a SMPTE division.
    #[error("invalid tick rate {0}")]
    InvalidTickRate(u32),
}

impl From<SectionNesting> for ReadError {
    fn from(value: SectionNesting) -> Self {
        Self::InvalidSectionNesting(value)
    }
}

/// Type alias of `core::result::Result<T, ReadError>`
pub type Result<T> = core::result::Result<T, ReadError>;

/// An error occurred while loading a chart from disk.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// The file contents were malformed.
    #[error("read: {0}")]
    Read(#[from] ReadError),
    /// The file extension names no supported chart format.
    #[error("unknown chart format: {0}")]
    UnknownFormat(String),
}
