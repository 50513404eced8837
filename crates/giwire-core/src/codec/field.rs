//! Type-erased field accessors, one per field kind.

use super::plan::{framed_len, write_frame, PlanBuilder, PlanCursor};
use super::schema::FieldDescriptor;
use super::value::WireValue;
use super::{size_message, write_message, DecodeContext, Message};
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::wire::{WireTag, WireType};
use std::any::type_name;
use tracing::trace;

/// Reads and writes one field of `T`
pub(crate) trait FieldAccess<T>: Send + Sync {
    /// Encoded size including tags, zero when the field is omitted.
    /// Records one plan slot per length-delimited container.
    fn size(&self, message: &T, field: &FieldDescriptor, plan: &mut PlanBuilder) -> Result<usize>;

    /// Writes the field, consuming the slots `size` recorded
    fn write(
        &self,
        message: &T,
        field: &FieldDescriptor,
        writer: &mut ByteWriter<'_>,
        plan: &mut PlanCursor<'_>,
    ) -> Result<()>;

    /// Decodes one occurrence; `reader` sits just past `tag`
    fn decode(
        &self,
        message: &mut T,
        field: &FieldDescriptor,
        tag: WireTag,
        reader: &mut ByteReader<'_>,
        ctx: &DecodeContext<'_>,
    ) -> Result<()>;
}

/// Fails unless `tag` carries the wire type `field` was declared with
pub(crate) fn expect_wire_type(owner: &str, field: &FieldDescriptor, tag: WireTag) -> Result<()> {
    let expected = field.kind.wire_type();
    if tag.wire_type != expected {
        return Err(Error::schema_mismatch(format!(
            "{}: field {} is declared {} but the wire carries {}",
            owner, tag.id, field.kind, tag.wire_type
        )));
    }
    Ok(())
}

pub(crate) struct ScalarField<T, V> {
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T, V> ScalarField<T, V> {
    pub(crate) fn new(get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        Self { get, get_mut }
    }
}

impl<T, V: WireValue> FieldAccess<T> for ScalarField<T, V> {
    fn size(&self, message: &T, field: &FieldDescriptor, _plan: &mut PlanBuilder) -> Result<usize> {
        let value = (self.get)(message);
        if value.is_default() {
            return Ok(0);
        }
        let tag = WireTag::new(field.id, field.kind.wire_type());
        Ok(tag.encoded_len() + value.encoded_len(field.kind)?)
    }

    fn write(
        &self,
        message: &T,
        field: &FieldDescriptor,
        writer: &mut ByteWriter<'_>,
        _plan: &mut PlanCursor<'_>,
    ) -> Result<()> {
        let value = (self.get)(message);
        if value.is_default() {
            return Ok(());
        }
        WireTag::new(field.id, field.kind.wire_type()).write(writer)?;
        value.encode(field.kind, writer)
    }

    fn decode(
        &self,
        message: &mut T,
        field: &FieldDescriptor,
        _tag: WireTag,
        reader: &mut ByteReader<'_>,
        _ctx: &DecodeContext<'_>,
    ) -> Result<()> {
        *(self.get_mut)(message) = V::decode(field.kind, reader)?;
        Ok(())
    }
}

pub(crate) struct ObjectField<T, M> {
    get: fn(&T) -> &M,
    get_mut: fn(&mut T) -> &mut M,
}

impl<T, M> ObjectField<T, M> {
    pub(crate) fn new(get: fn(&T) -> &M, get_mut: fn(&mut T) -> &mut M) -> Self {
        Self { get, get_mut }
    }
}

impl<T, M: Message> FieldAccess<T> for ObjectField<T, M> {
    fn size(&self, message: &T, field: &FieldDescriptor, plan: &mut PlanBuilder) -> Result<usize> {
        let slot = plan.reserve();
        let len = size_message((self.get)(message), plan)?;
        plan.close(slot, len);
        Ok(if len == 0 { 0 } else { framed_len(field.id, len) })
    }

    fn write(
        &self,
        message: &T,
        field: &FieldDescriptor,
        writer: &mut ByteWriter<'_>,
        plan: &mut PlanCursor<'_>,
    ) -> Result<()> {
        let len = plan.next()?;
        if len == 0 {
            return Ok(());
        }
        write_frame(writer, field.id, len)?;
        write_nested((self.get)(message), len, writer, plan)
    }

    fn decode(
        &self,
        message: &mut T,
        _field: &FieldDescriptor,
        _tag: WireTag,
        reader: &mut ByteReader<'_>,
        ctx: &DecodeContext<'_>,
    ) -> Result<()> {
        let len = reader.read_len()?;
        let mut scope = reader.split(len)?;
        ctx.merge_nested((self.get_mut)(message), &mut scope)
    }
}

pub(crate) struct ListField<T, M> {
    get: fn(&T) -> &Vec<M>,
    get_mut: fn(&mut T) -> &mut Vec<M>,
}

impl<T, M> ListField<T, M> {
    pub(crate) fn new(get: fn(&T) -> &Vec<M>, get_mut: fn(&mut T) -> &mut Vec<M>) -> Self {
        Self { get, get_mut }
    }
}

impl<T, M: Message> FieldAccess<T> for ListField<T, M> {
    fn size(&self, message: &T, field: &FieldDescriptor, plan: &mut PlanBuilder) -> Result<usize> {
        let mut total = 0;
        for element in (self.get)(message) {
            let slot = plan.reserve();
            let len = size_message(element, plan)?;
            plan.close(slot, len);
            if len > 0 {
                total += framed_len(field.id, len);
            }
        }
        Ok(total)
    }

    fn write(
        &self,
        message: &T,
        field: &FieldDescriptor,
        writer: &mut ByteWriter<'_>,
        plan: &mut PlanCursor<'_>,
    ) -> Result<()> {
        for element in (self.get)(message) {
            let len = plan.next()?;
            if len == 0 {
                continue;
            }
            write_frame(writer, field.id, len)?;
            write_nested(element, len, writer, plan)?;
        }
        Ok(())
    }

    fn decode(
        &self,
        message: &mut T,
        _field: &FieldDescriptor,
        _tag: WireTag,
        reader: &mut ByteReader<'_>,
        ctx: &DecodeContext<'_>,
    ) -> Result<()> {
        let len = reader.read_len()?;
        let mut scope = reader.split(len)?;
        let mut element = M::default();
        ctx.merge_nested(&mut element, &mut scope)?;
        (self.get_mut)(message).push(element);
        Ok(())
    }
}

pub(crate) struct NullField;

impl<T> FieldAccess<T> for NullField {
    fn size(&self, _message: &T, field: &FieldDescriptor, _plan: &mut PlanBuilder) -> Result<usize> {
        Ok(framed_len(field.id, 0))
    }

    fn write(
        &self,
        _message: &T,
        field: &FieldDescriptor,
        writer: &mut ByteWriter<'_>,
        _plan: &mut PlanCursor<'_>,
    ) -> Result<()> {
        write_frame(writer, field.id, 0)
    }

    fn decode(
        &self,
        _message: &mut T,
        field: &FieldDescriptor,
        _tag: WireTag,
        reader: &mut ByteReader<'_>,
        _ctx: &DecodeContext<'_>,
    ) -> Result<()> {
        let len = reader.read_len()?;
        if len != 0 {
            return Err(Error::schema_mismatch(format!(
                "{}: null field {} carries {} byte(s)",
                type_name::<T>(),
                field.id,
                len
            )));
        }
        Ok(())
    }
}

/// A leaf accessor behind a chain of anonymous containers.
///
/// Plan slots: one for the outer wrapper, one per inner level, then whatever
/// the leaf records.
pub(crate) struct WrappedField<T> {
    leaf: FieldDescriptor,
    levels: Vec<u32>,
    inner: Box<dyn FieldAccess<T>>,
}

impl<T> WrappedField<T> {
    pub(crate) fn new(leaf: FieldDescriptor, levels: Vec<u32>, inner: Box<dyn FieldAccess<T>>) -> Self {
        Self { leaf, levels, inner }
    }
}

impl<T> FieldAccess<T> for WrappedField<T> {
    fn size(&self, message: &T, field: &FieldDescriptor, plan: &mut PlanBuilder) -> Result<usize> {
        let first = plan.reserve_many(1 + self.levels.len());
        let leaf_len = self.inner.size(message, &self.leaf, plan)?;
        if leaf_len == 0 {
            plan.close(first, 0);
            return Ok(0);
        }

        let mut len = leaf_len;
        for (index, &level) in self.levels.iter().enumerate().rev() {
            plan.set(first + 1 + index, len);
            len = framed_len(level, len);
        }
        plan.set(first, len);
        Ok(framed_len(field.tag_id(), len))
    }

    fn write(
        &self,
        message: &T,
        field: &FieldDescriptor,
        writer: &mut ByteWriter<'_>,
        plan: &mut PlanCursor<'_>,
    ) -> Result<()> {
        let outer = plan.next()?;
        if outer == 0 {
            return Ok(());
        }
        write_frame(writer, field.tag_id(), outer)?;
        for &level in &self.levels {
            let len = plan.next()?;
            write_frame(writer, level, len)?;
        }
        self.inner.write(message, &self.leaf, writer, plan)
    }

    fn decode(
        &self,
        message: &mut T,
        field: &FieldDescriptor,
        _tag: WireTag,
        reader: &mut ByteReader<'_>,
        ctx: &DecodeContext<'_>,
    ) -> Result<()> {
        // The parent moves past the whole outer wrapper here, whatever the
        // scan below finds.
        let len = reader.read_len()?;
        let mut scope = reader.split(len)?;

        for &level in &self.levels {
            match scan_for(&mut scope, level)? {
                Some(tag) if tag.wire_type == WireType::LengthDelimited => {
                    let len = scope.read_len()?;
                    scope = scope.split(len)?;
                }
                Some(tag) => {
                    return Err(Error::schema_mismatch(format!(
                        "{}: wrapper level {} of field {} carries {}",
                        type_name::<T>(),
                        level,
                        field.id,
                        tag.wire_type
                    )))
                }
                None => {
                    trace!("Wrapper level {} of field {} is absent", level, field.id);
                    return Ok(());
                }
            }
        }

        match scan_for(&mut scope, self.leaf.id)? {
            Some(tag) => {
                expect_wire_type(type_name::<T>(), &self.leaf, tag)?;
                self.inner.decode(message, &self.leaf, tag, &mut scope, ctx)
            }
            None => {
                trace!("Leaf {} is absent from its wrapper", field.id);
                Ok(())
            }
        }
    }
}

/// Advances to the first tag with `id`, consuming every other field.
/// Leaves the reader just past the matching tag.
fn scan_for(reader: &mut ByteReader<'_>, id: u32) -> Result<Option<WireTag>> {
    while !reader.is_empty() {
        let tag = WireTag::read(reader)?;
        if tag.id == id {
            return Ok(Some(tag));
        }
        tag.consume(reader)?;
    }
    Ok(None)
}

fn write_nested<M: Message>(
    message: &M,
    len: usize,
    writer: &mut ByteWriter<'_>,
    plan: &mut PlanCursor<'_>,
) -> Result<()> {
    let start = writer.position();
    write_message(message, writer, plan)?;
    let written = writer.position() - start;
    if written != len {
        return Err(Error::internal(format!(
            "{}: planned {} byte(s), wrote {}",
            type_name::<M>(),
            len,
            written
        )));
    }
    Ok(())
}
