//! Schema-driven object codec.
//!
//! Types describe their fields once through a [`Schema`]; [`ObjectCodec`]
//! then maps between those types and protobuf-style bytes:
//!
//! - **Decoding** reads tags until the bound is reached. Known ids go to their
//!   field accessor, unknown ids are skipped (or rejected in strict mode).
//! - **Encoding** runs in two passes through an [`EncodingPlan`]: the size
//!   pass measures every nested container, the write pass fills a buffer of
//!   exactly that size. Default-valued scalars and empty objects are omitted.
//!
//! ## Example
//!
//! ```
//! use giwire_core::codec::{Message, ObjectCodec, Schema};
//! use std::sync::OnceLock;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Note {
//!     text: String,
//! }
//!
//! impl Message for Note {
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: OnceLock<Schema<Note>> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::builder()
//!                 .string(3, |n: &Note| &n.text, |n| &mut n.text)
//!                 .build()
//!         })
//!     }
//! }
//!
//! let codec = ObjectCodec::new();
//! let note = Note { text: "héllo".into() };
//! let bytes = codec.encode(&note)?;
//! assert_eq!(&bytes[..2], &[0x1A, 0x06]);
//! assert_eq!(codec.decode_from_slice::<Note>(&bytes)?, note);
//! # Ok::<(), giwire_core::Error>(())
//! ```

mod field;
mod plan;
pub mod schema;
pub mod value;

pub use plan::EncodingPlan;
pub use schema::{FieldDescriptor, FieldKind, Message, Schema, SchemaBuilder, WrapConfig};
pub use value::{VarintEnum, WireValue, ZigZag};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::wire::WireTag;
use field::expect_wire_type;
use plan::{PlanBuilder, PlanCursor};
use tracing::{debug, trace};

/// Default limit on object nesting while decoding
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for the object codec
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Deepest nested object the decoder will enter
    pub max_depth: usize,
    /// Fail on field ids the schema does not declare instead of skipping them
    pub reject_unknown_fields: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            reject_unknown_fields: false,
        }
    }
}

impl CodecConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting limit
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Enable or disable strict handling of unknown field ids
    pub fn with_reject_unknown_fields(mut self, reject: bool) -> Self {
        self.reject_unknown_fields = reject;
        self
    }
}

/// State threaded through one decode call
#[derive(Debug)]
pub(crate) struct DecodeContext<'c> {
    config: &'c CodecConfig,
    depth: usize,
}

impl<'c> DecodeContext<'c> {
    fn new(config: &'c CodecConfig) -> Self {
        Self { config, depth: 0 }
    }

    /// Decodes a nested object one level deeper
    pub(crate) fn merge_nested<M: Message>(&self, target: &mut M, scope: &mut ByteReader<'_>) -> Result<()> {
        let depth = self.depth + 1;
        if depth > self.config.max_depth {
            return Err(Error::RecursionLimit {
                limit: self.config.max_depth,
            });
        }
        let nested = DecodeContext {
            config: self.config,
            depth,
        };
        merge_message(target, scope, &nested)
    }
}

/// Reads fields into `target` until `reader` is exhausted
pub(crate) fn merge_message<M: Message>(
    target: &mut M,
    reader: &mut ByteReader<'_>,
    ctx: &DecodeContext<'_>,
) -> Result<()> {
    let schema = M::schema();
    schema.check()?;

    while !reader.is_empty() {
        let tag = WireTag::read(reader)?;
        let Some(field) = schema.field(tag.id) else {
            if ctx.config.reject_unknown_fields {
                return Err(Error::UnknownField {
                    type_name: schema.type_name(),
                    id: tag.id,
                });
            }
            trace!("Skipping unknown field {} in {}", tag, schema.type_name());
            tag.consume(reader)?;
            continue;
        };
        expect_wire_type(schema.type_name(), &field.descriptor, tag)?;
        field.access.decode(target, &field.descriptor, tag, reader, ctx)?;
    }
    Ok(())
}

/// Size pass over one message body
pub(crate) fn size_message<M: Message>(message: &M, plan: &mut PlanBuilder) -> Result<usize> {
    let schema = M::schema();
    schema.check()?;

    let mut total = 0;
    for field in schema.fields() {
        total += field.access.size(message, &field.descriptor, plan)?;
    }
    Ok(total)
}

/// Write pass over one message body
pub(crate) fn write_message<M: Message>(
    message: &M,
    writer: &mut ByteWriter<'_>,
    plan: &mut PlanCursor<'_>,
) -> Result<()> {
    for field in M::schema().fields() {
        field.access.write(message, &field.descriptor, writer, plan)?;
    }
    Ok(())
}

/// Encodes and decodes [`Message`] types
#[derive(Debug, Clone, Default)]
pub struct ObjectCodec {
    config: CodecConfig,
}

impl ObjectCodec {
    /// Create a codec with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with custom configuration
    pub fn with_config(config: CodecConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Decodes a message from the next `len` bytes of `reader`.
    ///
    /// On success the reader sits exactly `len` bytes further on, whatever
    /// the body contained.
    pub fn decode<M: Message>(&self, reader: &mut ByteReader<'_>, len: usize) -> Result<M> {
        let mut message = M::default();
        self.merge(&mut message, reader, len)?;
        Ok(message)
    }

    /// Decodes fields from the next `len` bytes into an existing message.
    ///
    /// Scalars present on the wire overwrite, list elements append, nested
    /// objects merge recursively.
    pub fn merge<M: Message>(&self, target: &mut M, reader: &mut ByteReader<'_>, len: usize) -> Result<()> {
        let offset = reader.position();
        let mut scope = reader.split(len)?;
        merge_message(target, &mut scope, &DecodeContext::new(&self.config))?;
        debug!(
            "Decoded {} from {} byte(s) at offset {}",
            M::schema().type_name(),
            len,
            offset
        );
        Ok(())
    }

    /// Decodes a message spanning all of `bytes`
    pub fn decode_from_slice<M: Message>(&self, bytes: &[u8]) -> Result<M> {
        let mut reader = ByteReader::new(bytes);
        self.decode(&mut reader, bytes.len())
    }

    /// Runs the size pass and returns a plan ready to write
    pub fn plan<'m, M: Message>(&self, message: &'m M) -> Result<EncodingPlan<'m, M>> {
        EncodingPlan::new(message)
    }

    /// Encodes `message` into a buffer of exactly its encoded size
    pub fn encode<M: Message>(&self, message: &M) -> Result<Vec<u8>> {
        let plan = self.plan(message)?;
        let bytes = plan.to_vec()?;
        debug!("Encoded {} into {} byte(s)", M::schema().type_name(), bytes.len());
        Ok(bytes)
    }

    /// Encodes `message` at the writer's position
    pub fn encode_into<M: Message>(&self, message: &M, writer: &mut ByteWriter<'_>) -> Result<usize> {
        let plan = self.plan(message)?;
        plan.write_to(writer)?;
        Ok(plan.len())
    }
}
