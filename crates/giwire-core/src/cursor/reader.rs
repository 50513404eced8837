use super::offset_position;
use crate::error::{Error, Result};
use crate::wire::varint;
use std::io::SeekFrom;

/// Generates fixed-width readers on top of `take_array`.
macro_rules! read_fixed {
    ($($(#[$doc:meta])* $name:ident -> $ty:ty, $convert:ident;)*) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $name(&mut self) -> Result<$ty> {
                Ok(<$ty>::$convert(self.take_array()?))
            }
        )*
    };
}

/// A bounds-checked reader over an immutable byte slice.
///
/// Positions are absolute offsets into the underlying slice, so a reader
/// bounded to a sub-range (see [`ByteReader::bounded`] and
/// [`ByteReader::split`]) still reports offsets that match the original
/// file. Reads never go past `end`.
///
/// # Example
///
/// ```
/// use giwire_core::ByteReader;
///
/// let data = [0x00, 0x00, 0x03, 0x26, 0x96, 0x01];
/// let mut reader = ByteReader::new(&data);
///
/// assert_eq!(reader.read_u32_be()?, 0x0326);
/// assert_eq!(reader.read_varint()?, 150);
/// assert!(reader.is_empty());
/// # Ok::<(), giwire_core::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    start: usize,
    pos: usize,
    end: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader over the whole slice
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            start: 0,
            pos: 0,
            end: data.len(),
        }
    }

    /// Creates a reader positioned at `start` that may read `len` bytes
    pub fn bounded(data: &'a [u8], start: usize, len: usize) -> Result<Self> {
        let available = data.len().saturating_sub(start);
        if start > data.len() || len > available {
            return Err(Error::underflow(start, len, available));
        }
        Ok(Self {
            data,
            start,
            pos: start,
            end: start + len,
        })
    }

    /// Current absolute position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Exclusive upper bound of this reader
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of bytes left before the bound
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Returns true when no bytes are left
    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    /// The unread part of the bounded range, without advancing
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.pos..self.end]
    }

    /// Moves the cursor and returns the new absolute position.
    ///
    /// `Start` is an absolute offset, `End` is relative to the reader's bound.
    /// The target must stay within the reader's range.
    pub fn seek(&mut self, to: SeekFrom) -> Result<usize> {
        let (base, delta) = match to {
            SeekFrom::Start(offset) => (0, i128::from(offset)),
            SeekFrom::Current(delta) => (self.pos, i128::from(delta)),
            SeekFrom::End(delta) => (self.end, i128::from(delta)),
        };
        let target = match to {
            SeekFrom::Start(offset) => usize::try_from(offset).ok(),
            SeekFrom::Current(delta) | SeekFrom::End(delta) => offset_position(base, delta),
        };
        match target {
            Some(target) if (self.start..=self.end).contains(&target) => {
                self.pos = target;
                Ok(target)
            }
            _ => Err(Error::SeekOutOfRange {
                target: base as i128 + delta,
                start: self.start,
                end: self.end,
            }),
        }
    }

    /// Advances the cursor by `len` bytes
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Returns the next `len` bytes and advances past them
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Splits off a reader over the next `len` bytes.
    ///
    /// `self` is advanced past the split range whether or not the child is
    /// read to completion.
    pub fn split(&mut self, len: usize) -> Result<ByteReader<'a>> {
        if len > self.remaining() {
            return Err(Error::underflow(self.pos, len, self.remaining()));
        }
        let child = ByteReader {
            data: self.data,
            start: self.pos,
            pos: self.pos,
            end: self.pos + len,
        };
        self.pos += len;
        Ok(child)
    }

    /// Reads an unsigned byte
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        let [byte] = self.take_array()?;
        Ok(byte)
    }

    /// Reads a signed byte
    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        let [byte] = self.take_array()?;
        Ok(byte as i8)
    }

    read_fixed! {
        /// Reads a little-endian `u16`
        read_u16_le -> u16, from_le_bytes;
        /// Reads a big-endian `u16`
        read_u16_be -> u16, from_be_bytes;
        /// Reads a little-endian `i16`
        read_i16_le -> i16, from_le_bytes;
        /// Reads a big-endian `i16`
        read_i16_be -> i16, from_be_bytes;
        /// Reads a little-endian `u32`
        read_u32_le -> u32, from_le_bytes;
        /// Reads a big-endian `u32`
        read_u32_be -> u32, from_be_bytes;
        /// Reads a little-endian `i32`
        read_i32_le -> i32, from_le_bytes;
        /// Reads a big-endian `i32`
        read_i32_be -> i32, from_be_bytes;
        /// Reads a little-endian `u64`
        read_u64_le -> u64, from_le_bytes;
        /// Reads a big-endian `u64`
        read_u64_be -> u64, from_be_bytes;
        /// Reads a little-endian `i64`
        read_i64_le -> i64, from_le_bytes;
        /// Reads a big-endian `i64`
        read_i64_be -> i64, from_be_bytes;
        /// Reads a little-endian IEEE-754 single
        read_f32 -> f32, from_le_bytes;
        /// Reads a little-endian IEEE-754 double
        read_f64 -> f64, from_le_bytes;
    }

    /// Reads a base-128 varint
    pub fn read_varint(&mut self) -> Result<u64> {
        varint::read(self)
    }

    /// Reads a varint length prefix
    pub fn read_len(&mut self) -> Result<usize> {
        let offset = self.pos;
        let len = self.read_varint()?;
        usize::try_from(len).map_err(|_| Error::underflow(offset, usize::MAX, self.remaining()))
    }

    /// Reads a varint-length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let offset = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|source| Error::InvalidUtf8 { offset, source })
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::underflow(self.pos, len, self.remaining()));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_endianness() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u32_be().unwrap(), 0x0102_0304);
        assert_eq!(reader.read_u32_le().unwrap(), 0x0403_0201);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_signed_and_floats() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-2i64).to_le_bytes());
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-0.25f64).to_le_bytes());
        data.push(0xFF);

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_i64_le().unwrap(), -2);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_f64().unwrap(), -0.25);
        assert_eq!(reader.read_i8().unwrap(), -1);
    }

    #[test]
    fn test_underflow_does_not_advance() {
        let data = [0x01, 0x02];
        let mut reader = ByteReader::new(&data);
        let err = reader.read_u32_le().unwrap_err();
        assert!(matches!(
            err,
            Error::BufferUnderflow {
                offset: 0,
                needed: 4,
                remaining: 2
            }
        ));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u16_be().unwrap(), 0x0102);
    }

    #[test]
    fn test_bounded_reader_respects_end() {
        let data = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        let mut reader = ByteReader::bounded(&data, 1, 2).unwrap();
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.read_u8().unwrap(), 0xBB);
        assert_eq!(reader.read_u8().unwrap(), 0xCC);
        assert!(reader.read_u8().is_err());

        assert!(ByteReader::bounded(&data, 4, 2).is_err());
        assert!(ByteReader::bounded(&data, 6, 0).is_err());
    }

    #[test]
    fn test_split_advances_parent() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut reader = ByteReader::new(&data);
        reader.skip(1).unwrap();
        let mut child = reader.split(2).unwrap();
        assert_eq!(reader.position(), 3);
        assert_eq!(child.remaining_bytes(), &[0x02, 0x03]);
        assert_eq!(child.read_u8().unwrap(), 0x02);
        assert!(reader.split(2).is_err());
    }

    #[test]
    fn test_seek_origins() {
        let data = [0u8; 8];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.seek(SeekFrom::End(-4)).unwrap(), 4);
        assert_eq!(reader.seek(SeekFrom::Current(-1)).unwrap(), 3);
        assert_eq!(reader.seek(SeekFrom::Start(8)).unwrap(), 8);
        assert!(matches!(
            reader.seek(SeekFrom::Current(1)),
            Err(Error::SeekOutOfRange { target: 9, .. })
        ));

        let mut bounded = ByteReader::bounded(&data, 2, 4).unwrap();
        assert!(bounded.seek(SeekFrom::Start(1)).is_err());
        assert_eq!(bounded.seek(SeekFrom::End(0)).unwrap(), 6);
    }

    #[test]
    fn test_read_string() {
        let mut data = vec![0x06];
        data.extend_from_slice("héllo".as_bytes());
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_string().unwrap(), "héllo");

        let bad = [0x02, 0xC3, 0x28];
        let err = ByteReader::new(&bad).read_string().unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8 { offset: 1, .. }));
    }
}
