//! Field tags: a field id and wire type packed into one varint.

use super::varint;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::MAX_FIELD_NUMBER;
use std::fmt;

/// Protobuf wire types supported by the codec.
///
/// Group start/end (3 and 4) are deprecated in protobuf and rejected here,
/// along with the unassigned codes 6 and 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width, little-endian
    Fixed64 = 1,
    /// Varint length followed by that many bytes
    LengthDelimited = 2,
    /// 32-bit fixed-width, little-endian
    Fixed32 = 5,
}

impl WireType {
    /// The 3-bit code stored in a tag
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            _ => Err(Error::UnsupportedWireType { code }),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Varint => "varint",
            WireType::Fixed64 => "fixed64",
            WireType::LengthDelimited => "length-delimited",
            WireType::Fixed32 => "fixed32",
        };
        f.write_str(name)
    }
}

/// A decoded field tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireTag {
    /// Field id (1..=2^29-1)
    pub id: u32,
    /// Encoding shape of the value that follows
    pub wire_type: WireType,
}

impl WireTag {
    /// Creates a tag
    pub const fn new(id: u32, wire_type: WireType) -> Self {
        Self { id, wire_type }
    }

    /// The packed `(id << 3) | code` value
    pub const fn value(&self) -> u64 {
        ((self.id as u64) << 3) | self.wire_type.code() as u64
    }

    /// Unpacks a tag value, validating the field id and wire type
    pub fn from_value(value: u64) -> Result<Self> {
        let wire_type = WireType::try_from((value & 0b111) as u8)?;
        let number = value >> 3;
        if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
            return Err(Error::InvalidFieldNumber {
                number,
                max: MAX_FIELD_NUMBER,
            });
        }
        Ok(Self {
            id: number as u32,
            wire_type,
        })
    }

    /// Reads a tag at the reader's position
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Self::from_value(reader.read_varint()?)
    }

    /// Writes this tag at the writer's position
    pub fn write(&self, writer: &mut ByteWriter<'_>) -> Result<()> {
        writer.write_varint(self.value())
    }

    /// Encoded length of the tag varint
    pub const fn encoded_len(&self) -> usize {
        varint::encoded_len(self.value())
    }

    /// Skips the value that follows this tag without materializing it.
    ///
    /// Used to step over fields the current schema does not know.
    pub fn consume(&self, reader: &mut ByteReader<'_>) -> Result<()> {
        match self.wire_type {
            WireType::Varint => varint::skip(reader),
            WireType::Fixed64 => reader.skip(8),
            WireType::Fixed32 => reader.skip(4),
            WireType::LengthDelimited => {
                let len = reader.read_len()?;
                reader.skip(len)
            }
        }
    }
}

impl fmt::Display for WireTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.id, self.wire_type)
    }
}

/// Reads one field and returns its tag together with the field's total
/// length in bytes (tag included).
pub fn consume_field(reader: &mut ByteReader<'_>) -> Result<(WireTag, usize)> {
    let start = reader.position();
    let tag = WireTag::read(reader)?;
    tag.consume(reader)?;
    Ok((tag, reader.position() - start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_type_conversion() {
        assert_eq!(WireType::try_from(0).unwrap(), WireType::Varint);
        assert_eq!(WireType::try_from(1).unwrap(), WireType::Fixed64);
        assert_eq!(WireType::try_from(2).unwrap(), WireType::LengthDelimited);
        assert_eq!(WireType::try_from(5).unwrap(), WireType::Fixed32);
        for code in [3, 4, 6, 7] {
            assert!(matches!(
                WireType::try_from(code),
                Err(Error::UnsupportedWireType { code: c }) if c == code
            ));
        }
    }

    #[test]
    fn test_tag_packing() {
        let tag = WireTag::new(3, WireType::LengthDelimited);
        assert_eq!(tag.value(), 0x1A);
        assert_eq!(tag.encoded_len(), 1);
        assert_eq!(WireTag::from_value(0x1A).unwrap(), tag);

        let wide = WireTag::new(16, WireType::Varint);
        assert_eq!(wide.value(), 0x80);
        assert_eq!(wide.encoded_len(), 2);
    }

    #[test]
    fn test_invalid_field_number() {
        assert!(matches!(
            WireTag::from_value(0x00),
            Err(Error::InvalidFieldNumber { number: 0, .. })
        ));
        let too_big = (u64::from(MAX_FIELD_NUMBER) + 1) << 3;
        assert!(WireTag::from_value(too_big).is_err());
    }

    #[test]
    fn test_group_tags_rejected() {
        // field 1, start group
        let data = [0x0B];
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            WireTag::read(&mut reader),
            Err(Error::UnsupportedWireType { code: 3 })
        ));
    }

    #[test]
    fn test_consume_varint_field() {
        // Field 1, varint, value 150
        let data = [0x08, 0x96, 0x01];
        let mut reader = ByteReader::new(&data);
        let (tag, len) = consume_field(&mut reader).unwrap();
        assert_eq!(tag.id, 1);
        assert_eq!(len, 3);
    }

    #[test]
    fn test_consume_len_field() {
        // Field 1, length-delimited, "hello"
        let data = [0x0A, 0x05, b'h', b'e', b'l', b'l', b'o'];
        let mut reader = ByteReader::new(&data);
        let (tag, len) = consume_field(&mut reader).unwrap();
        assert_eq!(tag, WireTag::new(1, WireType::LengthDelimited));
        assert_eq!(len, 7);
    }

    #[test]
    fn test_consume_fixed_fields() {
        let data = [
            0x0D, 0x01, 0x02, 0x03, 0x04, // field 1, fixed32
            0x11, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, // field 2, fixed64
        ];
        let mut reader = ByteReader::new(&data);
        assert_eq!(consume_field(&mut reader).unwrap().1, 5);
        assert_eq!(consume_field(&mut reader).unwrap().1, 9);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_consume_truncated_len_field() {
        let data = [0x0A, 0x05, b'h', b'i'];
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            consume_field(&mut reader),
            Err(Error::BufferUnderflow { needed: 5, .. })
        ));
    }
}
