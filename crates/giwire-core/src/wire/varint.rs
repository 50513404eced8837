//! Base-128 variable-length integers and zig-zag transforms.
//!
//! Each byte carries seven value bits, least significant group first, with
//! the high bit set when more bytes follow. A 64-bit value needs at most ten
//! bytes; zero still takes one byte.

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};

/// Maximum encoded length of a 64-bit varint
pub const MAX_VARINT_LEN: usize = 10;

/// A varint encoded onto the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Varint {
    buf: [u8; MAX_VARINT_LEN],
    len: u8,
}

impl Varint {
    /// Encodes `value`
    pub fn new(mut value: u64) -> Self {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let mut len = 0;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                buf[len] = byte;
                len += 1;
                break;
            }
            buf[len] = byte | 0x80;
            len += 1;
        }
        Self {
            buf,
            len: len as u8,
        }
    }

    /// The encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..usize::from(self.len)]
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Always false; even zero occupies one byte
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Number of bytes `value` occupies once encoded, without encoding it
#[inline]
pub const fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    if bits == 0 {
        1
    } else {
        bits.div_ceil(7)
    }
}

/// Encodes `value` onto the stack
pub fn encode(value: u64) -> Varint {
    Varint::new(value)
}

/// Writes `value` at the writer's position
pub fn write(writer: &mut ByteWriter<'_>, value: u64) -> Result<()> {
    writer.write_bytes(Varint::new(value).as_bytes())
}

/// Reads a varint at the reader's position.
///
/// Running past the reader's bound is a [`Error::BufferUnderflow`]; ten
/// continuation bytes without a terminator is [`Error::MalformedVarint`].
pub fn read(reader: &mut ByteReader<'_>) -> Result<u64> {
    let offset = reader.position();
    let mut result: u64 = 0;

    for i in 0..MAX_VARINT_LEN {
        let byte = reader.read_u8()?;
        result |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }

    Err(Error::MalformedVarint { offset })
}

/// Decodes a varint from the front of `data`.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode(data: &[u8]) -> Result<(u64, usize)> {
    let mut reader = ByteReader::new(data);
    let value = read(&mut reader)?;
    Ok((value, reader.position()))
}

/// Advances past a varint without assembling its value
pub fn skip(reader: &mut ByteReader<'_>) -> Result<()> {
    let offset = reader.position();
    for _ in 0..MAX_VARINT_LEN {
        if reader.read_u8()? & 0x80 == 0 {
            return Ok(());
        }
    }
    Err(Error::MalformedVarint { offset })
}

/// Maps a signed 64-bit value onto the unsigned range, small magnitudes first
#[inline]
pub const fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`]
#[inline]
pub const fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// 32-bit variant of [`zigzag_encode`]
#[inline]
pub const fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// 32-bit variant of [`zigzag_decode`]
#[inline]
pub const fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLES: [u64; 9] = [
        0,
        1,
        127,
        128,
        16_383,
        16_384,
        u32::MAX as u64,
        1 << 63,
        u64::MAX,
    ];

    #[test]
    fn test_decode_varint_single_byte() {
        let data = [0x08];
        let (value, len) = decode(&data).unwrap();
        assert_eq!(value, 8);
        assert_eq!(len, 1);
    }

    #[test]
    fn test_decode_varint_multi_byte() {
        let data = [0xAC, 0x02];
        let (value, len) = decode(&data).unwrap();
        assert_eq!(value, 300);
        assert_eq!(len, 2);
    }

    #[test]
    fn test_decode_varint_max() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let (value, len) = decode(&data).unwrap();
        assert_eq!(value, u64::MAX);
        assert_eq!(len, 10);
    }

    #[test]
    fn test_samples_round_trip_with_predicted_size() {
        for value in SAMPLES {
            let encoded = encode(value);
            assert_eq!(encoded.len(), encoded_len(value), "size of {value}");
            assert_eq!(decode(encoded.as_bytes()).unwrap(), (value, encoded.len()));
        }
    }

    #[test]
    fn test_size_boundaries() {
        assert_eq!(encoded_len(0), 1);
        assert_eq!(encoded_len(127), 1);
        assert_eq!(encoded_len(128), 2);
        assert_eq!(encoded_len(16_383), 2);
        assert_eq!(encoded_len(16_384), 3);
        assert_eq!(encoded_len(u64::MAX), MAX_VARINT_LEN);
        assert_eq!(encode(0).as_bytes(), &[0x00]);
    }

    #[test]
    fn test_malformed_varint() {
        let data = [0x80; 11];
        assert!(matches!(
            decode(&data),
            Err(Error::MalformedVarint { offset: 0 })
        ));
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            skip(&mut reader),
            Err(Error::MalformedVarint { .. })
        ));
    }

    #[test]
    fn test_truncated_varint_underflows() {
        let data = [0x96];
        assert!(matches!(decode(&data), Err(Error::BufferUnderflow { .. })));
    }

    #[test]
    fn test_skip_stops_at_terminator() {
        let data = [0x96, 0x01, 0x05];
        let mut reader = ByteReader::new(&data);
        skip(&mut reader).unwrap();
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_write_into_writer() {
        let mut buf = [0u8; 3];
        let mut writer = ByteWriter::new(&mut buf);
        write(&mut writer, 300).unwrap();
        assert!(write(&mut writer, 300).is_err());
        assert_eq!(writer.written(), &[0xAC, 0x02]);
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
        for value in [0, 1, -1, 63, -64, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(value)), value);
        }
        for value in [0, 1, -1, i32::MAX, i32::MIN] {
            assert_eq!(zigzag_decode32(zigzag_encode32(value)), value);
        }
        assert_eq!(zigzag_encode32(-1), 1);
    }
}
