//! Two-pass encoding: sizes first, bytes second.
//!
//! The size pass walks the object graph and records the payload length of
//! every length-delimited container (nested objects, list elements, wrapper
//! levels) in pre-order. The write pass walks the same graph in the same
//! order and consumes those lengths instead of measuring again.

use super::{size_message, write_message, Message};
use crate::cursor::ByteWriter;
use crate::error::{Error, Result};
use crate::wire::{varint, WireTag, WireType};

/// Length slots recorded by the size pass
#[derive(Debug, Default)]
pub(crate) struct PlanBuilder {
    sizes: Vec<usize>,
}

impl PlanBuilder {
    /// Reserves the next slot and returns its index
    pub(crate) fn reserve(&mut self) -> usize {
        self.reserve_many(1)
    }

    /// Reserves `count` consecutive slots and returns the first index
    pub(crate) fn reserve_many(&mut self, count: usize) -> usize {
        let first = self.sizes.len();
        self.sizes.resize(first + count, 0);
        first
    }

    pub(crate) fn set(&mut self, slot: usize, len: usize) {
        self.sizes[slot] = len;
    }

    /// Records the final length of `slot`.
    ///
    /// An empty container is omitted from the output, so anything recorded
    /// beneath it is dropped as well.
    pub(crate) fn close(&mut self, slot: usize, len: usize) {
        self.sizes[slot] = len;
        if len == 0 {
            self.sizes.truncate(slot + 1);
        }
    }

    fn finish(self) -> Vec<usize> {
        self.sizes
    }
}

/// Replays the slots recorded by [`PlanBuilder`]
#[derive(Debug)]
pub(crate) struct PlanCursor<'p> {
    sizes: &'p [usize],
    next: usize,
}

impl<'p> PlanCursor<'p> {
    fn new(sizes: &'p [usize]) -> Self {
        Self { sizes, next: 0 }
    }

    pub(crate) fn next(&mut self) -> Result<usize> {
        let len = self.sizes.get(self.next).copied().ok_or_else(|| {
            Error::internal(format!(
                "encoding plan exhausted after {} slot(s)",
                self.sizes.len()
            ))
        })?;
        self.next += 1;
        Ok(len)
    }

    fn is_exhausted(&self) -> bool {
        self.next == self.sizes.len()
    }
}

/// Tag, length prefix and payload of a length-delimited field
pub(crate) fn framed_len(id: u32, len: usize) -> usize {
    WireTag::new(id, WireType::LengthDelimited).encoded_len() + varint::encoded_len(len as u64) + len
}

/// Writes a length-delimited tag and its length prefix
pub(crate) fn write_frame(writer: &mut ByteWriter<'_>, id: u32, len: usize) -> Result<()> {
    WireTag::new(id, WireType::LengthDelimited).write(writer)?;
    writer.write_varint(len as u64)
}

/// A message measured and ready to write.
///
/// The plan borrows the message, so the object cannot change between the
/// size pass and the write pass.
#[derive(Debug)]
pub struct EncodingPlan<'m, M> {
    message: &'m M,
    sizes: Vec<usize>,
    len: usize,
}

impl<'m, M: Message> EncodingPlan<'m, M> {
    /// Runs the size pass over `message`
    pub fn new(message: &'m M) -> Result<Self> {
        let mut builder = PlanBuilder::default();
        let len = size_message(message, &mut builder)?;
        Ok(Self {
            message,
            sizes: builder.finish(),
            len,
        })
    }

    /// Exact number of bytes [`write_to`](Self::write_to) will produce
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the message encodes to nothing
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The message being encoded
    pub fn message(&self) -> &'m M {
        self.message
    }

    /// Runs the write pass at the writer's position
    pub fn write_to(&self, writer: &mut ByteWriter<'_>) -> Result<()> {
        if writer.remaining() < self.len {
            return Err(Error::overflow(writer.position(), self.len, writer.remaining()));
        }
        let start = writer.position();
        let mut cursor = PlanCursor::new(&self.sizes);
        write_message(self.message, writer, &mut cursor)?;

        let written = writer.position() - start;
        if written != self.len || !cursor.is_exhausted() {
            return Err(Error::internal(format!(
                "wrote {} byte(s) for a {}-byte plan",
                written, self.len
            )));
        }
        Ok(())
    }

    /// Runs the write pass into a freshly allocated buffer
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.len];
        self.write_to(&mut ByteWriter::new(&mut buf))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_close_drops_children_of_empty_slot() {
        let mut builder = PlanBuilder::default();
        let outer = builder.reserve();
        let inner = builder.reserve_many(2);
        builder.set(inner, 3);
        builder.set(inner + 1, 5);
        builder.close(outer, 0);
        let kept = builder.reserve();
        builder.close(kept, 7);
        assert_eq!(builder.finish(), vec![0, 7]);
    }

    #[test]
    fn test_cursor_reports_exhaustion() {
        let sizes = [4, 0];
        let mut cursor = PlanCursor::new(&sizes);
        assert_eq!(cursor.next().unwrap(), 4);
        assert!(!cursor.is_exhausted());
        assert_eq!(cursor.next().unwrap(), 0);
        assert!(cursor.is_exhausted());
        assert!(matches!(cursor.next(), Err(Error::Internal(_))));
    }

    #[test]
    fn test_framed_len() {
        assert_eq!(framed_len(1, 0), 2);
        assert_eq!(framed_len(16, 200), 2 + 2 + 200);
    }
}
