use std::fmt;

use thiserror::Error;

use crate::pool::Handle;

/// Attribute stream a handle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Vertex,
    Normal,
    TexCoord,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Attribute::Vertex => "vertex",
            Attribute::Normal => "normal",
            Attribute::TexCoord => "texture coordinate",
        })
    }
}

/// Caller contract violations reported by [`crate::builder::MeshBuilder`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuilderError {
    #[error("Primitive size must be at least 1, got {0}")]
    InvalidPrimitiveSize(usize),

    #[error("{count} vertex handles cannot be split into elements of size {size}")]
    ElementCount { size: usize, count: usize },

    #[error("Expected {expected} {attribute} handles, got {actual}")]
    AttributeCount {
        attribute: Attribute,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown {attribute} handle {handle} (pool holds {len})")]
    UnknownHandle {
        attribute: Attribute,
        handle: Handle,
        len: usize,
    },
}

/// Failures while reading or writing TDM/TDB streams.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(
        "Invalid magic tag {:?}, expected {:?}",
        String::from_utf8_lossy(.found),
        String::from_utf8_lossy(.expected)
    )]
    InvalidMagic { expected: [u8; 3], found: [u8; 3] },

    #[error("Format version {version} is outside the accepted window {min}..={max}")]
    UnsupportedVersion { version: u8, min: u8, max: u8 },

    #[error("The stream is violating the expected format, because: {reason}")]
    Format { reason: &'static str },

    #[error("Unknown primitive mode {0}")]
    UnknownPrimitiveMode(u8),

    #[error("Too many {what}: {len} (at most {max})")]
    TooLarge {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Invalid UTF-8 in {context}")]
    Utf8 {
        context: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("I/O error while {context} at byte {offset}")]
    Io {
        context: &'static str,
        offset: u64,
        #[source]
        source: std::io::Error,
    },
}

impl CodecError {
    /// Wrong magic tag or a version outside the accepted window.
    pub fn is_format_rejection(&self) -> bool {
        matches!(self, CodecError::InvalidMagic { .. } | CodecError::UnsupportedVersion { .. })
    }
}

/// An index plus the builder's offset does not fit in 32 bits.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Index {value} rebased by {offset} overflows u32")]
pub struct IndexOverflow {
    pub value: u32,
    pub offset: u32,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MergeError {
    #[error("No groups to merge")]
    Empty,

    #[error("Group {index} differs from the first group in material, primitive or attributes")]
    Incompatible { index: usize },

    #[error(transparent)]
    IndexOverflow(#[from] IndexOverflow),
}
