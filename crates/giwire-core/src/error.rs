//! Error types for the giwire-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for the cursor, wire, codec and envelope layers.

use thiserror::Error;

/// Result type alias for giwire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all giwire operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A read needed more bytes than the reader's bound allows
    #[error("buffer underflow at offset {offset}: need {needed} byte(s), {remaining} remaining")]
    BufferUnderflow {
        /// Cursor position when the read was attempted
        offset: usize,
        /// Number of bytes the read required
        needed: usize,
        /// Number of bytes left before the bound
        remaining: usize,
    },

    /// A write needed more room than the pre-sized buffer has
    #[error("buffer overflow at offset {offset}: need {needed} byte(s), {remaining} remaining")]
    BufferOverflow {
        /// Cursor position when the write was attempted
        offset: usize,
        /// Number of bytes the write required
        needed: usize,
        /// Number of bytes left in the buffer
        remaining: usize,
    },

    /// Seek target falls outside the cursor's bounds
    #[error("seek target {target} is outside {start}..={end}")]
    SeekOutOfRange {
        /// Requested absolute position
        target: i128,
        /// Lowest addressable position
        start: usize,
        /// Highest addressable position
        end: usize,
    },

    /// Varint ran for ten bytes without a terminating byte
    #[error("malformed varint at offset {offset}: no terminating byte within 10 bytes")]
    MalformedVarint {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// Group-delimited or reserved wire type
    #[error("unsupported wire type code {code}")]
    UnsupportedWireType {
        /// The raw 3-bit wire type code
        code: u8,
    },

    /// Invalid field number in a tag
    #[error("invalid field number {number}: must be between 1 and {max}")]
    InvalidFieldNumber {
        /// The invalid field number
        number: u64,
        /// Maximum valid field number
        max: u32,
    },

    /// Length-prefixed string payload is not UTF-8
    #[error("invalid UTF-8 string at offset {offset}: {source}")]
    InvalidUtf8 {
        /// Byte offset of the string payload
        offset: usize,
        /// Underlying decode error
        #[source]
        source: std::str::Utf8Error,
    },

    /// Wire data or schema declaration disagrees with the declared field kind
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Field id not declared by the schema (strict decoding only)
    #[error("unknown field {id} in {type_name}")]
    UnknownField {
        /// Rust type being decoded
        type_name: &'static str,
        /// Field id found on the wire
        id: u32,
    },

    /// Nested objects exceed the configured depth
    #[error("nesting exceeds the maximum depth of {limit}")]
    RecursionLimit {
        /// The configured limit
        limit: usize,
    },

    /// Every identifier above the first assigned one has been handed out
    #[error("guid space exhausted")]
    GuidExhausted,

    /// File header or trailer failed validation
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[from] EnvelopeFault),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// The specific envelope invariant that was violated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnvelopeFault {
    /// File is shorter than the fixed 24-byte overhead
    #[error("file is {len} bytes, shorter than the 24-byte header and trailer")]
    TooShort {
        /// Actual file length
        len: usize,
    },

    /// `total_size + 4` does not equal the file length
    #[error("total size {total_size} does not match file length {file_len}")]
    SizeMismatch {
        /// Value stored in the header
        total_size: u32,
        /// Actual file length
        file_len: usize,
    },

    /// Head magic number is wrong
    #[error("head magic {found:#010x} is not {expected:#010x}")]
    HeadMagic {
        /// Value found in the header
        found: u32,
        /// Required value
        expected: u32,
    },

    /// Type code differs from the one the caller expects
    #[error("file type {found} does not match expected type {expected}")]
    TypeMismatch {
        /// Value found in the header
        found: u32,
        /// Type code requested by the caller
        expected: u32,
    },

    /// `content_length + 24` does not equal the file length
    #[error("content length {content_length} does not match file length {file_len}")]
    ContentLengthMismatch {
        /// Value stored in the header
        content_length: u32,
        /// Actual file length
        file_len: usize,
    },

    /// Tail magic number is wrong
    #[error("tail magic {found:#010x} is not {expected:#010x}")]
    TailMagic {
        /// Value found in the trailer
        found: u32,
        /// Required value
        expected: u32,
    },

    /// Type code has no known file kind
    #[error("unknown file kind {code}")]
    UnknownFileKind {
        /// The unrecognised type code
        code: u32,
    },

    /// Payload too large for the 32-bit size fields
    #[error("payload of {len} bytes cannot be framed in a 32-bit envelope")]
    PayloadTooLarge {
        /// Payload length
        len: usize,
    },
}

impl Error {
    /// Creates a new buffer underflow error
    pub fn underflow(offset: usize, needed: usize, remaining: usize) -> Self {
        Self::BufferUnderflow {
            offset,
            needed,
            remaining,
        }
    }

    /// Creates a new buffer overflow error
    pub fn overflow(offset: usize, needed: usize, remaining: usize) -> Self {
        Self::BufferOverflow {
            offset,
            needed,
            remaining,
        }
    }

    /// Creates a new schema mismatch error
    pub fn schema_mismatch(details: impl Into<String>) -> Self {
        Self::SchemaMismatch(details.into())
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the error was caused by malformed input bytes rather
    /// than by a schema declaration or a programming error
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::BufferUnderflow { .. }
                | Self::MalformedVarint { .. }
                | Self::UnsupportedWireType { .. }
                | Self::InvalidFieldNumber { .. }
                | Self::InvalidUtf8 { .. }
                | Self::UnknownField { .. }
                | Self::RecursionLimit { .. }
                | Self::InvalidEnvelope(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::underflow(12, 4, 1);
        let msg = err.to_string();
        assert!(msg.contains("offset 12"));
        assert!(msg.contains("need 4"));
    }

    #[test]
    fn test_envelope_fault_display() {
        let err = Error::from(EnvelopeFault::HeadMagic {
            found: 0x0327,
            expected: 0x0326,
        });
        assert_eq!(
            err.to_string(),
            "invalid envelope: head magic 0x00000327 is not 0x00000326"
        );
    }

    #[test]
    fn test_is_malformed_input() {
        assert!(Error::MalformedVarint { offset: 0 }.is_malformed_input());
        assert!(Error::from(EnvelopeFault::TooShort { len: 3 }).is_malformed_input());
        assert!(!Error::schema_mismatch("field 1").is_malformed_input());
        assert!(!Error::overflow(0, 1, 0).is_malformed_input());
    }
}
