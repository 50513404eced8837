//! Low-level protobuf-style wire encoding.
//!
//! ## Wire Format Overview
//!
//! Each field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (bool, integers, enums)
//! - 1: FIXED64 (u64, i64, f64), little-endian
//! - 2: LENGTH-DELIMITED (strings, nested objects, one list element)
//! - 5: FIXED32 (u32, i32, f32), little-endian
//!
//! Group-delimited fields (3, 4) are rejected, and repeated values are
//! never packed: every list element carries its own tag.

pub mod tag;
pub mod varint;

pub use tag::{consume_field, WireTag, WireType};
pub use varint::{zigzag_decode, zigzag_encode, Varint, MAX_VARINT_LEN};
