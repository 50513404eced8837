//! Bounded, position-tracked access to byte buffers.
//!
//! [`ByteReader`] walks an immutable slice and [`ByteWriter`] fills a
//! caller-provided, pre-sized mutable slice. Neither type owns or grows its
//! buffer. Every operation checks the remaining capacity first and fails with
//! [`Error::BufferUnderflow`](crate::Error::BufferUnderflow) or
//! [`Error::BufferOverflow`](crate::Error::BufferOverflow) instead of touching
//! memory outside the bound.
//!
//! Multi-byte integers come in `_le` and `_be` flavours; floats are always
//! little-endian, matching the wire format.

mod reader;
mod writer;

pub use reader::ByteReader;
pub use writer::ByteWriter;

/// Resolves a signed seek delta against a base position.
///
/// Returns `None` when the result would be negative or not addressable.
fn offset_position(base: usize, delta: i64) -> Option<usize> {
    if delta >= 0 {
        base.checked_add(usize::try_from(delta).ok()?)
    } else {
        base.checked_sub(usize::try_from(delta.unsigned_abs()).ok()?)
    }
}
