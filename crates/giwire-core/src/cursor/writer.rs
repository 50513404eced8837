use super::offset_position;
use crate::error::{Error, Result};
use crate::wire::varint;
use std::io::SeekFrom;

/// Generates fixed-width writers on top of `put`.
macro_rules! write_fixed {
    ($($(#[$doc:meta])* $name:ident($ty:ty), $convert:ident;)*) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                self.put(&value.$convert())
            }
        )*
    };
}

/// A bounds-checked writer into a pre-sized mutable slice.
///
/// The writer never grows the buffer: callers size it up front (the object
/// codec does this from its size pass) and any write past the end fails with
/// [`Error::BufferOverflow`].
#[derive(Debug)]
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    /// Creates a writer positioned at the start of `buf`
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total capacity of the underlying buffer
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes left before the end of the buffer
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Bytes written so far (everything before the cursor)
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Moves the cursor and returns the new position.
    ///
    /// Used for back-references, e.g. writing a trailer at `End(-4)` before
    /// returning to fill in the header.
    pub fn seek(&mut self, to: SeekFrom) -> Result<usize> {
        let target = match to {
            SeekFrom::Start(offset) => usize::try_from(offset).ok(),
            SeekFrom::Current(delta) => offset_position(self.pos, delta),
            SeekFrom::End(delta) => offset_position(self.buf.len(), delta),
        };
        match target {
            Some(target) if target <= self.buf.len() => {
                self.pos = target;
                Ok(target)
            }
            _ => Err(Error::SeekOutOfRange {
                target: match to {
                    SeekFrom::Start(offset) => i128::from(offset),
                    SeekFrom::Current(delta) => self.pos as i128 + i128::from(delta),
                    SeekFrom::End(delta) => self.buf.len() as i128 + i128::from(delta),
                },
                start: 0,
                end: self.buf.len(),
            }),
        }
    }

    /// Writes raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.put(bytes)
    }

    /// Writes an unsigned byte
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.put(&[value])
    }

    /// Writes a signed byte
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.put(&[value as u8])
    }

    write_fixed! {
        /// Writes a little-endian `u16`
        write_u16_le(u16), to_le_bytes;
        /// Writes a big-endian `u16`
        write_u16_be(u16), to_be_bytes;
        /// Writes a little-endian `i16`
        write_i16_le(i16), to_le_bytes;
        /// Writes a big-endian `i16`
        write_i16_be(i16), to_be_bytes;
        /// Writes a little-endian `u32`
        write_u32_le(u32), to_le_bytes;
        /// Writes a big-endian `u32`
        write_u32_be(u32), to_be_bytes;
        /// Writes a little-endian `i32`
        write_i32_le(i32), to_le_bytes;
        /// Writes a big-endian `i32`
        write_i32_be(i32), to_be_bytes;
        /// Writes a little-endian `u64`
        write_u64_le(u64), to_le_bytes;
        /// Writes a big-endian `u64`
        write_u64_be(u64), to_be_bytes;
        /// Writes a little-endian `i64`
        write_i64_le(i64), to_le_bytes;
        /// Writes a big-endian `i64`
        write_i64_be(i64), to_be_bytes;
        /// Writes a little-endian IEEE-754 single
        write_f32(f32), to_le_bytes;
        /// Writes a little-endian IEEE-754 double
        write_f64(f64), to_le_bytes;
    }

    /// Writes a base-128 varint
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        varint::write(self, value)
    }

    /// Writes a varint length prefix followed by the UTF-8 bytes of `value`
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let needed = varint::encoded_len(value.len() as u64) + value.len();
        if needed > self.remaining() {
            return Err(Error::overflow(self.pos, needed, self.remaining()));
        }
        self.write_varint(value.len() as u64)?;
        self.put(value.as_bytes())
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(Error::overflow(self.pos, bytes.len(), self.remaining()));
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_endianness() {
        let mut buf = [0u8; 8];
        let mut writer = ByteWriter::new(&mut buf);
        writer.write_u32_be(0x0102_0304).unwrap();
        writer.write_u32_le(0x0102_0304).unwrap();
        assert_eq!(writer.remaining(), 0);
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_overflow_leaves_buffer_untouched() {
        let mut buf = [0u8; 3];
        let mut writer = ByteWriter::new(&mut buf);
        writer.write_u8(0x7F).unwrap();
        let err = writer.write_u32_le(0xFFFF_FFFF).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferOverflow {
                offset: 1,
                needed: 4,
                remaining: 2
            }
        ));
        assert_eq!(writer.position(), 1);
        assert_eq!(buf, [0x7F, 0, 0]);
    }

    #[test]
    fn test_back_reference_with_seek() {
        let mut buf = [0u8; 10];
        let mut writer = ByteWriter::new(&mut buf);
        writer.seek(SeekFrom::End(-4)).unwrap();
        writer.write_u32_be(0x0679).unwrap();
        writer.seek(SeekFrom::Start(0)).unwrap();
        writer.write_u16_be(0xBEEF).unwrap();
        assert_eq!(writer.position(), 2);
        assert!(writer.seek(SeekFrom::Current(-3)).is_err());
        assert_eq!(buf, [0xBE, 0xEF, 0, 0, 0, 0, 0, 0, 0x06, 0x79]);
    }

    #[test]
    fn test_write_string_is_atomic() {
        let mut buf = [0u8; 4];
        let mut writer = ByteWriter::new(&mut buf);
        assert!(writer.write_string("héllo").is_err());
        assert_eq!(writer.position(), 0);
        writer.write_string("hé").unwrap();
        assert_eq!(writer.written(), &[0x03, b'h', 0xC3, 0xA9]);
    }

    #[test]
    fn test_floats_are_little_endian() {
        let mut buf = [0u8; 12];
        let mut writer = ByteWriter::new(&mut buf);
        writer.write_f32(1.0).unwrap();
        writer.write_f64(2.0).unwrap();
        assert_eq!(&buf[..4], &1.0f32.to_le_bytes());
        assert_eq!(&buf[4..], &2.0f64.to_le_bytes());
    }
}
