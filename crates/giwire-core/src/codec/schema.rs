//! Field descriptors and per-type schemas.
//!
//! A type opts into the codec by implementing [`Message`] and returning a
//! [`Schema`] built once with [`SchemaBuilder`]. Accessors are plain `fn`
//! pointers (non-capturing closures coerce to them), so a schema is immutable,
//! `Sync`, and lives in a `static` for the rest of the process.
//!
//! ```
//! use giwire_core::codec::{Message, Schema};
//! use std::sync::OnceLock;
//!
//! #[derive(Debug, Default)]
//! struct Point {
//!     x: u32,
//!     label: String,
//! }
//!
//! impl Message for Point {
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: OnceLock<Schema<Point>> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::builder()
//!                 .varint(1, |p: &Point| &p.x, |p| &mut p.x)
//!                 .string(2, |p: &Point| &p.label, |p| &mut p.label)
//!                 .build()
//!         })
//!     }
//! }
//! ```

use super::field::{FieldAccess, ListField, NullField, ObjectField, ScalarField, WrappedField};
use super::value::WireValue;
use crate::error::{Error, Result};
use crate::wire::WireType;
use crate::MAX_FIELD_NUMBER;
use std::fmt;

/// How a field's value is laid out on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Varint-encoded integer, bool or enum
    Varint,
    /// 4-byte little-endian scalar
    Fixed32,
    /// 8-byte little-endian scalar
    Fixed64,
    /// Length-prefixed UTF-8
    String,
    /// Length-prefixed nested object
    Object,
    /// One nested object per tag occurrence
    List,
    /// Always-present, always-empty marker
    Null,
    /// Leaf value nested inside anonymous wrapper objects
    Wrapped,
}

impl FieldKind {
    /// The wire type a tag for this kind must carry
    pub const fn wire_type(self) -> WireType {
        match self {
            FieldKind::Varint => WireType::Varint,
            FieldKind::Fixed32 => WireType::Fixed32,
            FieldKind::Fixed64 => WireType::Fixed64,
            FieldKind::String
            | FieldKind::Object
            | FieldKind::List
            | FieldKind::Null
            | FieldKind::Wrapped => WireType::LengthDelimited,
        }
    }

    /// Whether a value of this kind may sit at the bottom of a wrapper chain
    pub const fn is_wrappable(self) -> bool {
        matches!(
            self,
            FieldKind::Varint
                | FieldKind::Fixed32
                | FieldKind::Fixed64
                | FieldKind::String
                | FieldKind::Object
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Varint => "varint",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::String => "string",
            FieldKind::Object => "object",
            FieldKind::List => "list",
            FieldKind::Null => "null",
            FieldKind::Wrapped => "wrapped",
        };
        f.write_str(name)
    }
}

/// Where a wrapped field's leaf lives.
///
/// The owning message carries a length-delimited field `wrapper_id`; inside
/// it, each id in `levels` (outer to inner) is another length-delimited
/// container; the innermost one holds the leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapConfig {
    /// Outermost container id, the tag seen by the owning message
    pub wrapper_id: u32,
    /// Remaining container ids, outer to inner
    pub levels: Vec<u32>,
    /// Kind of the leaf value
    pub leaf_kind: FieldKind,
}

/// Declaration of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field id; for wrapped fields, the id of the leaf inside the wrappers
    pub id: u32,
    /// Declared kind
    pub kind: FieldKind,
    /// Wrapper chain, required when `kind` is [`FieldKind::Wrapped`]
    pub wrap: Option<WrapConfig>,
    /// Each tag occurrence adds one element
    pub repeated: bool,
}

impl FieldDescriptor {
    /// Creates a plain (unwrapped) descriptor
    pub fn new(id: u32, kind: FieldKind) -> Self {
        Self {
            id,
            kind,
            wrap: None,
            repeated: kind == FieldKind::List,
        }
    }

    /// Creates a wrapped descriptor
    pub fn wrapped(
        leaf_id: u32,
        leaf_kind: FieldKind,
        wrapper_id: u32,
        levels: impl Into<Vec<u32>>,
    ) -> Self {
        Self {
            id: leaf_id,
            kind: FieldKind::Wrapped,
            wrap: Some(WrapConfig {
                wrapper_id,
                levels: levels.into(),
                leaf_kind,
            }),
            repeated: false,
        }
    }

    /// The id this field occupies in its owning message
    pub fn tag_id(&self) -> u32 {
        match (&self.kind, &self.wrap) {
            (FieldKind::Wrapped, Some(wrap)) => wrap.wrapper_id,
            _ => self.id,
        }
    }

    /// The kind of the value stored on the object
    pub fn value_kind(&self) -> FieldKind {
        match (&self.kind, &self.wrap) {
            (FieldKind::Wrapped, Some(wrap)) => wrap.leaf_kind,
            _ => self.kind,
        }
    }

    /// The descriptor of the leaf inside the wrapper chain
    pub(crate) fn leaf(&self) -> Option<FieldDescriptor> {
        match (&self.kind, &self.wrap) {
            (FieldKind::Wrapped, Some(wrap)) => Some(FieldDescriptor::new(self.id, wrap.leaf_kind)),
            _ => None,
        }
    }

    /// Checks ids and the wrap configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        let valid_id = |id: u32| (1..=MAX_FIELD_NUMBER).contains(&id);
        if !valid_id(self.id) {
            return Err(format!("field id {} is out of range", self.id));
        }
        match (self.kind, &self.wrap) {
            (FieldKind::Wrapped, None) => Err(format!(
                "field {} is declared wrapped without a wrap configuration",
                self.id
            )),
            (FieldKind::Wrapped, Some(wrap)) => {
                if !wrap.leaf_kind.is_wrappable() {
                    return Err(format!(
                        "field {} wraps a {} leaf, which cannot be wrapped",
                        self.id, wrap.leaf_kind
                    ));
                }
                match std::iter::once(&wrap.wrapper_id)
                    .chain(&wrap.levels)
                    .find(|id| !valid_id(**id))
                {
                    Some(id) => Err(format!("wrapper id {} of field {} is out of range", id, self.id)),
                    None => Ok(()),
                }
            }
            (_, Some(_)) => Err(format!(
                "field {} has a wrap configuration but is declared {}",
                self.id, self.kind
            )),
            (_, None) => Ok(()),
        }
    }
}

/// A type the object codec can encode and decode.
///
/// Decoding starts from `Default::default()` and fills in fields as their
/// tags arrive, so absent fields keep their default values.
pub trait Message: Default + Send + Sync + 'static {
    /// The type's field table, built once and cached
    fn schema() -> &'static Schema<Self>;
}

pub(crate) struct Field<T> {
    pub(crate) descriptor: FieldDescriptor,
    pub(crate) access: Box<dyn FieldAccess<T>>,
}

/// The field table of one message type, sorted by tag id
pub struct Schema<T> {
    type_name: &'static str,
    fields: Vec<Field<T>>,
    fault: Option<String>,
}

impl<T: 'static> Schema<T> {
    /// Starts declaring a schema
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder {
            fields: Vec::new(),
            fault: None,
        }
    }

    /// Name of the Rust type this schema describes
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Descriptors in ascending tag-id order
    pub fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.fields.iter().map(|field| &field.descriptor)
    }

    /// Looks up the descriptor occupying `tag_id`
    pub fn descriptor(&self, tag_id: u32) -> Option<&FieldDescriptor> {
        self.field(tag_id).map(|field| &field.descriptor)
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fails with [`Error::SchemaMismatch`] if the declaration is faulty
    pub fn check(&self) -> Result<()> {
        match &self.fault {
            Some(reason) => Err(Error::schema_mismatch(reason.clone())),
            None => Ok(()),
        }
    }

    pub(crate) fn field(&self, tag_id: u32) -> Option<&Field<T>> {
        self.fields
            .binary_search_by_key(&tag_id, |field| field.descriptor.tag_id())
            .ok()
            .map(|index| &self.fields[index])
    }

    pub(crate) fn fields(&self) -> &[Field<T>] {
        &self.fields
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field(
                "fields",
                &self.fields.iter().map(|field| &field.descriptor).collect::<Vec<_>>(),
            )
            .field("fault", &self.fault)
            .finish()
    }
}

/// Collects field declarations for a [`Schema`].
///
/// Declaration mistakes (duplicate tag ids, a Rust type that cannot carry
/// the declared kind, a wrapped field without wrap configuration) do not
/// panic; they are recorded and reported as [`Error::SchemaMismatch`] every
/// time the schema is used.
pub struct SchemaBuilder<T> {
    fields: Vec<Field<T>>,
    fault: Option<String>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Declares a varint field
    pub fn varint<V: WireValue>(self, id: u32, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        self.value(FieldDescriptor::new(id, FieldKind::Varint), get, get_mut)
    }

    /// Declares a fixed 32-bit field
    pub fn fixed32<V: WireValue>(self, id: u32, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        self.value(FieldDescriptor::new(id, FieldKind::Fixed32), get, get_mut)
    }

    /// Declares a fixed 64-bit field
    pub fn fixed64<V: WireValue>(self, id: u32, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        self.value(FieldDescriptor::new(id, FieldKind::Fixed64), get, get_mut)
    }

    /// Declares a string field
    pub fn string<V: WireValue>(self, id: u32, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        self.value(FieldDescriptor::new(id, FieldKind::String), get, get_mut)
    }

    /// Declares a scalar or string field from an explicit descriptor,
    /// wrapped or not
    pub fn value<V: WireValue>(
        self,
        descriptor: FieldDescriptor,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        let supported = V::supports(descriptor.value_kind());
        self.push(descriptor, supported, Box::new(ScalarField::new(get, get_mut)))
    }

    /// Declares a wrapped scalar or string field.
    ///
    /// `levels` lists the containers inside `wrapper_id`, outer to inner.
    pub fn wrapped<V: WireValue>(
        self,
        leaf_id: u32,
        leaf_kind: FieldKind,
        wrapper_id: u32,
        levels: &[u32],
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.value(
            FieldDescriptor::wrapped(leaf_id, leaf_kind, wrapper_id, levels),
            get,
            get_mut,
        )
    }

    /// Declares a nested object field
    pub fn object<M: Message>(self, id: u32, get: fn(&T) -> &M, get_mut: fn(&mut T) -> &mut M) -> Self {
        self.push(
            FieldDescriptor::new(id, FieldKind::Object),
            true,
            Box::new(ObjectField::new(get, get_mut)),
        )
    }

    /// Declares a nested object buried inside wrapper containers
    pub fn wrapped_object<M: Message>(
        self,
        leaf_id: u32,
        wrapper_id: u32,
        levels: &[u32],
        get: fn(&T) -> &M,
        get_mut: fn(&mut T) -> &mut M,
    ) -> Self {
        self.push(
            FieldDescriptor::wrapped(leaf_id, FieldKind::Object, wrapper_id, levels),
            true,
            Box::new(ObjectField::new(get, get_mut)),
        )
    }

    /// Declares a repeated object field; every element gets its own tag
    pub fn list<M: Message>(
        self,
        id: u32,
        get: fn(&T) -> &Vec<M>,
        get_mut: fn(&mut T) -> &mut Vec<M>,
    ) -> Self {
        self.push(
            FieldDescriptor::new(id, FieldKind::List),
            true,
            Box::new(ListField::new(get, get_mut)),
        )
    }

    /// Declares an always-present empty marker with no storage on the object
    pub fn null(self, id: u32) -> Self {
        self.push(FieldDescriptor::new(id, FieldKind::Null), true, Box::new(NullField))
    }

    /// Finishes the schema
    pub fn build(mut self) -> Schema<T> {
        self.fields.sort_by_key(|field| field.descriptor.tag_id());
        Schema {
            type_name: std::any::type_name::<T>(),
            fields: self.fields,
            fault: self.fault,
        }
    }

    fn push(mut self, descriptor: FieldDescriptor, supported: bool, inner: Box<dyn FieldAccess<T>>) -> Self {
        let tag_id = descriptor.tag_id();
        let fault = descriptor
            .validate()
            .err()
            .or_else(|| {
                (!supported).then(|| {
                    format!(
                        "field {} cannot hold a {} value",
                        descriptor.id,
                        descriptor.value_kind()
                    )
                })
            })
            .or_else(|| {
                self.fields
                    .iter()
                    .any(|field| field.descriptor.tag_id() == tag_id)
                    .then(|| format!("tag id {} is declared more than once", tag_id))
            });
        if let Some(reason) = fault {
            self.fault
                .get_or_insert_with(|| format!("{}: {}", std::any::type_name::<T>(), reason));
        }

        let access = match descriptor.leaf() {
            Some(leaf) => {
                let levels = descriptor.wrap.as_ref().map(|wrap| wrap.levels.clone()).unwrap_or_default();
                Box::new(WrappedField::new(leaf, levels, inner)) as Box<dyn FieldAccess<T>>
            }
            None => inner,
        };
        self.fields.push(Field { descriptor, access });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct Sample {
        count: u32,
        ratio: f32,
        name: String,
    }

    #[test]
    fn test_descriptor_tag_id() {
        let plain = FieldDescriptor::new(7, FieldKind::Varint);
        assert_eq!(plain.tag_id(), 7);
        assert!(!plain.repeated);
        assert!(FieldDescriptor::new(2, FieldKind::List).repeated);

        let wrapped = FieldDescriptor::wrapped(99, FieldKind::Varint, 10, [11]);
        assert_eq!(wrapped.tag_id(), 10);
        assert_eq!(wrapped.value_kind(), FieldKind::Varint);
        assert_eq!(wrapped.leaf(), Some(FieldDescriptor::new(99, FieldKind::Varint)));
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(FieldDescriptor::new(0, FieldKind::Varint).validate().is_err());
        assert!(FieldDescriptor::new(1, FieldKind::Wrapped).validate().is_err());
        assert!(FieldDescriptor::wrapped(1, FieldKind::List, 2, []).validate().is_err());
        assert!(FieldDescriptor::wrapped(1, FieldKind::Varint, 2, [0]).validate().is_err());
        assert!(FieldDescriptor::wrapped(1, FieldKind::Object, 2, [3, 4]).validate().is_ok());
    }

    #[test]
    fn test_builder_sorts_by_tag_id() {
        let schema = Schema::<Sample>::builder()
            .string(3, |s: &Sample| &s.name, |s| &mut s.name)
            .varint(1, |s: &Sample| &s.count, |s| &mut s.count)
            .null(2)
            .build();

        let ids: Vec<u32> = schema.descriptors().map(FieldDescriptor::tag_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(schema.descriptor(2).map(|d| d.kind), Some(FieldKind::Null));
        assert!(schema.descriptor(4).is_none());
        assert!(schema.check().is_ok());
        assert!(schema.type_name().ends_with("Sample"));
    }

    #[test]
    fn test_builder_records_faults() {
        let duplicate = Schema::<Sample>::builder()
            .varint(1, |s: &Sample| &s.count, |s| &mut s.count)
            .null(1)
            .build();
        assert!(matches!(duplicate.check(), Err(Error::SchemaMismatch(msg)) if msg.contains("more than once")));

        let unsupported = Schema::<Sample>::builder()
            .varint(1, |s: &Sample| &s.ratio, |s| &mut s.ratio)
            .build();
        assert!(matches!(unsupported.check(), Err(Error::SchemaMismatch(msg)) if msg.contains("cannot hold")));

        let unwrapped = Schema::<Sample>::builder()
            .value(
                FieldDescriptor::new(5, FieldKind::Wrapped),
                |s: &Sample| &s.count,
                |s| &mut s.count,
            )
            .build();
        assert!(matches!(unwrapped.check(), Err(Error::SchemaMismatch(msg)) if msg.contains("wrap configuration")));
    }
}
