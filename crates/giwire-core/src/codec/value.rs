//! Rust types that can sit in a scalar or string field.

use super::schema::FieldKind;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::wire::varint;

/// A value that encodes as a single varint, fixed-width or string payload.
///
/// `kind` is always one the type reported as supported; schemas that pair a
/// type with a kind it cannot carry are rejected before any bytes move.
pub trait WireValue: Default + Send + Sync + 'static {
    /// Whether this type can be stored under `kind`
    fn supports(kind: FieldKind) -> bool;

    /// Default values are omitted from the output
    fn is_default(&self) -> bool;

    /// Payload size in bytes, tag excluded
    fn encoded_len(&self, kind: FieldKind) -> Result<usize>;

    /// Writes the payload, tag excluded
    fn encode(&self, kind: FieldKind, writer: &mut ByteWriter<'_>) -> Result<()>;

    /// Reads a payload written under `kind`
    fn decode(kind: FieldKind, reader: &mut ByteReader<'_>) -> Result<Self>;
}

fn unsupported<V>(kind: FieldKind) -> Error {
    Error::schema_mismatch(format!(
        "{} cannot be encoded as {}",
        std::any::type_name::<V>(),
        kind
    ))
}

// Varint integers are sign-extended to 64 bits on the way out and truncated
// on the way in, so negative values always take ten bytes.
macro_rules! impl_integer {
    ($($ty:ty $(=> $fixed:ident, $read:ident, $write:ident, $width:literal)?;)*) => {$(
        impl WireValue for $ty {
            fn supports(kind: FieldKind) -> bool {
                kind == FieldKind::Varint $(|| kind == FieldKind::$fixed)?
            }

            fn is_default(&self) -> bool {
                *self == 0
            }

            fn encoded_len(&self, kind: FieldKind) -> Result<usize> {
                match kind {
                    FieldKind::Varint => Ok(varint::encoded_len(*self as i64 as u64)),
                    $(FieldKind::$fixed => Ok($width),)?
                    _ => Err(unsupported::<Self>(kind)),
                }
            }

            fn encode(&self, kind: FieldKind, writer: &mut ByteWriter<'_>) -> Result<()> {
                match kind {
                    FieldKind::Varint => writer.write_varint(*self as i64 as u64),
                    $(FieldKind::$fixed => writer.$write(*self),)?
                    _ => Err(unsupported::<Self>(kind)),
                }
            }

            fn decode(kind: FieldKind, reader: &mut ByteReader<'_>) -> Result<Self> {
                match kind {
                    FieldKind::Varint => Ok(reader.read_varint()? as $ty),
                    $(FieldKind::$fixed => reader.$read(),)?
                    _ => Err(unsupported::<Self>(kind)),
                }
            }
        }
    )*};
}

impl_integer! {
    u8;
    u16;
    i8;
    i16;
    u32 => Fixed32, read_u32_le, write_u32_le, 4;
    i32 => Fixed32, read_i32_le, write_i32_le, 4;
    u64 => Fixed64, read_u64_le, write_u64_le, 8;
    i64 => Fixed64, read_i64_le, write_i64_le, 8;
}

impl WireValue for bool {
    fn supports(kind: FieldKind) -> bool {
        kind == FieldKind::Varint
    }

    fn is_default(&self) -> bool {
        !*self
    }

    fn encoded_len(&self, kind: FieldKind) -> Result<usize> {
        match kind {
            FieldKind::Varint => Ok(1),
            _ => Err(unsupported::<Self>(kind)),
        }
    }

    fn encode(&self, kind: FieldKind, writer: &mut ByteWriter<'_>) -> Result<()> {
        match kind {
            FieldKind::Varint => writer.write_u8(u8::from(*self)),
            _ => Err(unsupported::<Self>(kind)),
        }
    }

    fn decode(kind: FieldKind, reader: &mut ByteReader<'_>) -> Result<Self> {
        match kind {
            FieldKind::Varint => Ok(reader.read_varint()? != 0),
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

macro_rules! impl_float {
    ($($ty:ty => $fixed:ident, $read:ident, $write:ident, $width:literal;)*) => {$(
        impl WireValue for $ty {
            fn supports(kind: FieldKind) -> bool {
                kind == FieldKind::$fixed
            }

            fn is_default(&self) -> bool {
                *self == 0.0
            }

            fn encoded_len(&self, kind: FieldKind) -> Result<usize> {
                match kind {
                    FieldKind::$fixed => Ok($width),
                    _ => Err(unsupported::<Self>(kind)),
                }
            }

            fn encode(&self, kind: FieldKind, writer: &mut ByteWriter<'_>) -> Result<()> {
                match kind {
                    FieldKind::$fixed => writer.$write(*self),
                    _ => Err(unsupported::<Self>(kind)),
                }
            }

            fn decode(kind: FieldKind, reader: &mut ByteReader<'_>) -> Result<Self> {
                match kind {
                    FieldKind::$fixed => reader.$read(),
                    _ => Err(unsupported::<Self>(kind)),
                }
            }
        }
    )*};
}

impl_float! {
    f32 => Fixed32, read_f32, write_f32, 4;
    f64 => Fixed64, read_f64, write_f64, 8;
}

impl WireValue for String {
    fn supports(kind: FieldKind) -> bool {
        kind == FieldKind::String
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }

    fn encoded_len(&self, kind: FieldKind) -> Result<usize> {
        match kind {
            FieldKind::String => Ok(varint::encoded_len(self.len() as u64) + self.len()),
            _ => Err(unsupported::<Self>(kind)),
        }
    }

    fn encode(&self, kind: FieldKind, writer: &mut ByteWriter<'_>) -> Result<()> {
        match kind {
            FieldKind::String => writer.write_string(self),
            _ => Err(unsupported::<Self>(kind)),
        }
    }

    fn decode(kind: FieldKind, reader: &mut ByteReader<'_>) -> Result<Self> {
        match kind {
            FieldKind::String => reader.read_string(),
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

/// A signed integer stored with zig-zag varint encoding (`sint32`/`sint64`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ZigZag<T>(pub T);

macro_rules! impl_zigzag {
    ($($ty:ty => $encode:path, $decode:path, $unsigned:ty;)*) => {$(
        impl WireValue for ZigZag<$ty> {
            fn supports(kind: FieldKind) -> bool {
                kind == FieldKind::Varint
            }

            fn is_default(&self) -> bool {
                self.0 == 0
            }

            fn encoded_len(&self, kind: FieldKind) -> Result<usize> {
                match kind {
                    FieldKind::Varint => Ok(varint::encoded_len(u64::from($encode(self.0)))),
                    _ => Err(unsupported::<Self>(kind)),
                }
            }

            fn encode(&self, kind: FieldKind, writer: &mut ByteWriter<'_>) -> Result<()> {
                match kind {
                    FieldKind::Varint => writer.write_varint(u64::from($encode(self.0))),
                    _ => Err(unsupported::<Self>(kind)),
                }
            }

            fn decode(kind: FieldKind, reader: &mut ByteReader<'_>) -> Result<Self> {
                match kind {
                    FieldKind::Varint => Ok(ZigZag($decode(reader.read_varint()? as $unsigned))),
                    _ => Err(unsupported::<Self>(kind)),
                }
            }
        }
    )*};
}

impl_zigzag! {
    i32 => varint::zigzag_encode32, varint::zigzag_decode32, u32;
    i64 => varint::zigzag_encode, varint::zigzag_decode, u64;
}

/// A closed set of values carried as a varint.
///
/// Raw values without a variant should map to a fallback variant rather than
/// fail, so files written by newer producers still load.
pub trait VarintEnum: Copy + Default + Send + Sync + 'static {
    /// The raw wire value
    fn to_raw(self) -> u64;

    /// Maps a raw wire value back to a variant
    fn from_raw(raw: u64) -> Self;
}

impl<E: VarintEnum> WireValue for E {
    fn supports(kind: FieldKind) -> bool {
        kind == FieldKind::Varint
    }

    fn is_default(&self) -> bool {
        self.to_raw() == 0
    }

    fn encoded_len(&self, kind: FieldKind) -> Result<usize> {
        match kind {
            FieldKind::Varint => Ok(varint::encoded_len(self.to_raw())),
            _ => Err(unsupported::<Self>(kind)),
        }
    }

    fn encode(&self, kind: FieldKind, writer: &mut ByteWriter<'_>) -> Result<()> {
        match kind {
            FieldKind::Varint => writer.write_varint(self.to_raw()),
            _ => Err(unsupported::<Self>(kind)),
        }
    }

    fn decode(kind: FieldKind, reader: &mut ByteReader<'_>) -> Result<Self> {
        match kind {
            FieldKind::Varint => Ok(E::from_raw(reader.read_varint()?)),
            _ => Err(unsupported::<Self>(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode_value<V: WireValue>(value: &V, kind: FieldKind) -> Vec<u8> {
        let mut buf = vec![0u8; value.encoded_len(kind).unwrap()];
        value.encode(kind, &mut ByteWriter::new(&mut buf)).unwrap();
        buf
    }

    fn decode_value<V: WireValue>(bytes: &[u8], kind: FieldKind) -> V {
        let mut reader = ByteReader::new(bytes);
        let value = V::decode(kind, &mut reader).unwrap();
        assert!(reader.is_empty());
        value
    }

    #[test]
    fn test_negative_int32_sign_extends() {
        let bytes = encode_value(&-1i32, FieldKind::Varint);
        assert_eq!(bytes, vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert_eq!(decode_value::<i32>(&bytes, FieldKind::Varint), -1);
    }

    #[test]
    fn test_varint_narrowing_truncates() {
        // 300 read into a u8 keeps the low byte
        assert_eq!(decode_value::<u8>(&[0xAC, 0x02], FieldKind::Varint), 44);
        assert!(decode_value::<bool>(&[0x02], FieldKind::Varint));
    }

    #[test]
    fn test_fixed_width_little_endian() {
        assert_eq!(encode_value(&0x0102_0304u32, FieldKind::Fixed32), vec![0x04, 0x03, 0x02, 0x01]);
        assert_eq!(encode_value(&1.5f64, FieldKind::Fixed64), 1.5f64.to_le_bytes().to_vec());
        assert_eq!(decode_value::<i64>(&(-2i64).to_le_bytes(), FieldKind::Fixed64), -2);
    }

    #[test]
    fn test_zigzag_values() {
        assert_eq!(encode_value(&ZigZag(-1i32), FieldKind::Varint), vec![0x01]);
        assert_eq!(encode_value(&ZigZag(1i64), FieldKind::Varint), vec![0x02]);
        assert_eq!(decode_value::<ZigZag<i32>>(&[0x03], FieldKind::Varint), ZigZag(-2));
    }

    #[test]
    fn test_string_payload() {
        assert_eq!(
            encode_value(&"héllo".to_string(), FieldKind::String),
            vec![0x06, b'h', 0xC3, 0xA9, b'l', b'l', b'o']
        );
        let mut reader = ByteReader::new(&[0x02, 0xFF, 0xFE]);
        assert!(matches!(
            String::decode(FieldKind::String, &mut reader),
            Err(Error::InvalidUtf8 { offset: 1, .. })
        ));
    }

    #[test]
    fn test_supported_kinds() {
        assert!(u32::supports(FieldKind::Fixed32));
        assert!(!u16::supports(FieldKind::Fixed32));
        assert!(!f32::supports(FieldKind::Varint));
        assert!(!String::supports(FieldKind::Object));
        assert!(matches!(
            1.0f32.encoded_len(FieldKind::Varint),
            Err(Error::SchemaMismatch(_))
        ));
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    enum Shade {
        #[default]
        Unset,
        Light,
        Dark,
    }

    impl VarintEnum for Shade {
        fn to_raw(self) -> u64 {
            self as u64
        }

        fn from_raw(raw: u64) -> Self {
            match raw {
                1 => Shade::Light,
                2 => Shade::Dark,
                _ => Shade::Unset,
            }
        }
    }

    #[test]
    fn test_varint_enum() {
        assert!(Shade::Unset.is_default());
        assert_eq!(encode_value(&Shade::Dark, FieldKind::Varint), vec![0x02]);
        assert_eq!(decode_value::<Shade>(&[0x01], FieldKind::Varint), Shade::Light);
        assert_eq!(decode_value::<Shade>(&[0x09], FieldKind::Varint), Shade::Unset);
    }
}
