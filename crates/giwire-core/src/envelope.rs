//! Fixed header and trailer framing a codec payload on disk.
//!
//! ```text
//! offset 0   u32 total_size      file length - 4
//! offset 4   u32 version
//! offset 8   u32 head magic      0x0326
//! offset 12  u32 type code
//! offset 16  u32 content_length  file length - 24
//! offset 20  payload
//! last 4     u32 tail magic      0x0679
//! ```
//!
//! All header and trailer fields are big-endian.

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{EnvelopeFault, Error, Result};
use std::io::SeekFrom;
use tracing::debug;

/// Magic number at offset 8
pub const HEAD_MAGIC: u32 = 0x0326;

/// Magic number in the last four bytes
pub const TAIL_MAGIC: u32 = 0x0679;

/// Bytes before the payload
pub const HEADER_LEN: usize = 20;

/// Bytes after the payload
pub const TRAILER_LEN: usize = 4;

/// Fixed framing cost of every file
pub const OVERHEAD: usize = HEADER_LEN + TRAILER_LEN;

/// Header fields of a validated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// File length minus four
    pub total_size: u32,
    /// Producer version, carried through unchecked
    pub version: u32,
    /// File type code
    pub type_code: u32,
    /// Payload length
    pub content_length: u32,
}

/// A validated file: its header and the payload span it frames
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    header: EnvelopeHeader,
    bytes: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Validates `bytes` as a file of type `expected_type` and returns a
    /// reader bounded to the payload
    pub fn read(bytes: &'a [u8], expected_type: u32) -> Result<ByteReader<'a>> {
        Self::open(bytes, expected_type)?.reader()
    }

    /// Validates `bytes` as a file of type `expected_type`
    pub fn open(bytes: &'a [u8], expected_type: u32) -> Result<Self> {
        Self::validate(bytes, Some(expected_type))
    }

    /// Validates `bytes` without constraining the type code
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        Self::validate(bytes, None)
    }

    /// Parsed header fields
    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    /// The payload bytes
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[HEADER_LEN..self.bytes.len() - TRAILER_LEN]
    }

    /// A reader over the payload, positioned at its first byte.
    ///
    /// Positions reported by the reader are file offsets.
    pub fn reader(&self) -> Result<ByteReader<'a>> {
        ByteReader::bounded(self.bytes, HEADER_LEN, self.header.content_length as usize)
    }

    /// Frames `payload` into a complete file
    pub fn write(payload: &[u8], version: u32, type_code: u32) -> Result<Vec<u8>> {
        let too_large = || Error::from(EnvelopeFault::PayloadTooLarge { len: payload.len() });
        let content_length = u32::try_from(payload.len()).map_err(|_| too_large())?;
        let total_size = payload
            .len()
            .checked_add(HEADER_LEN)
            .and_then(|size| u32::try_from(size).ok())
            .ok_or_else(too_large)?;

        let mut buf = vec![0u8; OVERHEAD + payload.len()];
        let mut writer = ByteWriter::new(&mut buf);
        writer.write_u32_be(total_size)?;
        writer.write_u32_be(version)?;
        writer.write_u32_be(HEAD_MAGIC)?;
        writer.write_u32_be(type_code)?;
        writer.write_u32_be(content_length)?;
        writer.write_bytes(payload)?;
        writer.seek(SeekFrom::End(-(TRAILER_LEN as i64)))?;
        writer.write_u32_be(TAIL_MAGIC)?;

        debug!(
            "Framed {} payload byte(s) as type {} version {}",
            payload.len(),
            type_code,
            version
        );
        Ok(buf)
    }

    fn validate(bytes: &'a [u8], expected_type: Option<u32>) -> Result<Self> {
        let file_len = bytes.len();
        if file_len < OVERHEAD {
            return Err(EnvelopeFault::TooShort { len: file_len }.into());
        }

        let mut reader = ByteReader::new(bytes);
        let total_size = reader.read_u32_be()?;
        if u64::from(total_size) + TRAILER_LEN as u64 != file_len as u64 {
            return Err(EnvelopeFault::SizeMismatch { total_size, file_len }.into());
        }

        let version = reader.read_u32_be()?;

        let head = reader.read_u32_be()?;
        if head != HEAD_MAGIC {
            return Err(EnvelopeFault::HeadMagic {
                found: head,
                expected: HEAD_MAGIC,
            }
            .into());
        }

        let type_code = reader.read_u32_be()?;
        if let Some(expected) = expected_type {
            if type_code != expected {
                return Err(EnvelopeFault::TypeMismatch {
                    found: type_code,
                    expected,
                }
                .into());
            }
        }

        let content_length = reader.read_u32_be()?;
        if u64::from(content_length) + OVERHEAD as u64 != file_len as u64 {
            return Err(EnvelopeFault::ContentLengthMismatch {
                content_length,
                file_len,
            }
            .into());
        }

        reader.seek(SeekFrom::End(-(TRAILER_LEN as i64)))?;
        let tail = reader.read_u32_be()?;
        if tail != TAIL_MAGIC {
            return Err(EnvelopeFault::TailMagic {
                found: tail,
                expected: TAIL_MAGIC,
            }
            .into());
        }

        debug!(
            "Validated envelope: type {}, version {}, {} payload byte(s)",
            type_code, version, content_length
        );
        Ok(Self {
            header: EnvelopeHeader {
                total_size,
                version,
                type_code,
                content_length,
            },
            bytes,
        })
    }
}
