//! # giwire-core
//!
//! A schema-driven codec for protobuf-style binary payloads and the file
//! envelope that frames them.
//!
//! This crate provides the core functionality for:
//! - Bounds-checked reading and writing over byte slices
//! - Varint and field-tag encoding
//! - Mapping typed Rust objects to and from wire bytes through declared schemas
//! - Validating and writing the fixed file header and trailer
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`cursor`]: Bounded byte readers and pre-sized byte writers
//! - [`wire`]: Varints, zig-zag and field tags
//! - [`codec`]: Schemas and the two-pass object codec
//! - [`envelope`]: File header/trailer validation and framing
//! - [`gia`]: The `.gia` asset file schema
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use giwire_core::{Asset, AssetInfo, GiaDocument, GiaFile, Guid};
//!
//! let document = GiaDocument {
//!     version: 1,
//!     file: GiaFile {
//!         assets: vec![Asset {
//!             info: AssetInfo { special_type: 1, category: 2, guid: Guid::assign()? },
//!             name: "Lantern".into(),
//!             kind: 3,
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     },
//! };
//!
//! let bytes = document.to_bytes()?;
//! assert_eq!(GiaDocument::from_bytes(&bytes)?, document);
//! # Ok::<(), giwire_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! Any type becomes encodable by implementing [`Message`]. Scalar field
//! types implement [`WireValue`]; closed enumerations can implement
//! [`VarintEnum`] instead.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod cursor;
pub mod envelope;
pub mod error;
pub mod gia;
pub mod wire;

// Re-export primary types for convenience
pub use codec::{
    CodecConfig, EncodingPlan, FieldDescriptor, FieldKind, Message, ObjectCodec, Schema,
    SchemaBuilder, VarintEnum, WireValue, WrapConfig, ZigZag,
};
pub use cursor::{ByteReader, ByteWriter};
pub use envelope::{Envelope, EnvelopeHeader};
pub use error::{EnvelopeFault, Error, Result};
pub use gia::{Asset, AssetInfo, FileKind, GiaDocument, GiaFile, Guid};
pub use wire::{WireTag, WireType};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum valid field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;
