//! Asset files (`.gia`) and the identifiers shared across the file family.
//!
//! A `.gia` file is an [`Envelope`] of type [`FileKind::Gia`] whose payload
//! is a [`GiaFile`] message.

use crate::codec::{FieldKind, Message, ObjectCodec, Schema, WireValue};
use crate::cursor::{ByteReader, ByteWriter};
use crate::envelope::Envelope;
use crate::error::{EnvelopeFault, Error, Result};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

static NEXT_GUID: AtomicU32 = AtomicU32::new(Guid::FIRST_ASSIGNED);

/// Globally unique identifier of an asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Guid(pub u32);

impl Guid {
    /// First value handed out by [`Guid::assign`]
    pub const FIRST_ASSIGNED: u32 = 0x4000_0000;

    /// Mints a fresh identifier.
    ///
    /// Values increase monotonically for the life of the process; nothing is
    /// persisted, so identifiers may repeat across runs. Fails with
    /// [`Error::GuidExhausted`] once the counter reaches `u32::MAX`.
    pub fn assign() -> Result<Self> {
        Self::assign_from(&NEXT_GUID)
    }

    fn assign_from(counter: &AtomicU32) -> Result<Self> {
        counter
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                // u32::MAX is the exhausted marker, never a handed-out value
                (next != u32::MAX).then(|| next + 1)
            })
            .map(Guid)
            .map_err(|_| Error::GuidExhausted)
    }

    /// The raw value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns true for the unset identifier
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Guid {
    fn from(value: u32) -> Self {
        Guid(value)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl WireValue for Guid {
    fn supports(kind: FieldKind) -> bool {
        kind == FieldKind::Varint
    }

    fn is_default(&self) -> bool {
        self.is_zero()
    }

    fn encoded_len(&self, kind: FieldKind) -> Result<usize> {
        self.0.encoded_len(kind)
    }

    fn encode(&self, kind: FieldKind, writer: &mut ByteWriter<'_>) -> Result<()> {
        self.0.encode(kind, writer)
    }

    fn decode(kind: FieldKind, reader: &mut ByteReader<'_>) -> Result<Self> {
        u32::decode(kind, reader).map(Guid)
    }
}

/// Envelope type codes of the file family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
#[repr(u32)]
pub enum FileKind {
    /// `.gip`
    Gip = 1,
    /// `.gil`
    Gil = 2,
    /// `.gia`, asset bundles
    Gia = 3,
    /// `.gir`
    Gir = 4,
}

impl FileKind {
    /// All kinds, in type-code order
    pub const ALL: [FileKind; 4] = [FileKind::Gip, FileKind::Gil, FileKind::Gia, FileKind::Gir];

    /// The envelope type code
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// File extension without the dot
    pub const fn extension(self) -> &'static str {
        match self {
            FileKind::Gip => "gip",
            FileKind::Gil => "gil",
            FileKind::Gia => "gia",
            FileKind::Gir => "gir",
        }
    }

    /// Matches a path's extension, ignoring case
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|kind| kind.extension().eq_ignore_ascii_case(ext))
    }
}

impl TryFrom<u32> for FileKind {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or_else(|| EnvelopeFault::UnknownFileKind { code }.into())
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Identity and classification of an asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct AssetInfo {
    /// Special-type code; most assets carry 1
    pub special_type: u32,
    /// Category code
    pub category: u32,
    /// Identifier
    pub guid: Guid,
}

impl Message for AssetInfo {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<AssetInfo>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .varint(2, |a: &AssetInfo| &a.special_type, |a| &mut a.special_type)
                .varint(3, |a: &AssetInfo| &a.category, |a| &mut a.category)
                .varint(4, |a: &AssetInfo| &a.guid, |a| &mut a.guid)
                .build()
        })
    }
}

/// One asset entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Asset {
    /// The asset's own metadata
    pub info: AssetInfo,
    /// Metadata of related assets
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub related: Vec<AssetInfo>,
    /// Display name
    pub name: String,
    /// Asset type code
    pub kind: u32,
}

impl Message for Asset {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Asset>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .object(1, |a: &Asset| &a.info, |a| &mut a.info)
                .list(2, |a: &Asset| &a.related, |a| &mut a.related)
                .string(3, |a: &Asset| &a.name, |a| &mut a.name)
                .varint(5, |a: &Asset| &a.kind, |a| &mut a.kind)
                .build()
        })
    }
}

/// Payload of a `.gia` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct GiaFile {
    /// Exported assets
    pub assets: Vec<Asset>,
    /// Assets the exported ones depend on
    pub dependent_assets: Vec<Asset>,
    /// Free-form export description
    pub export_info: String,
}

impl Message for GiaFile {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<GiaFile>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .list(1, |g: &GiaFile| &g.assets, |g| &mut g.assets)
                .list(2, |g: &GiaFile| &g.dependent_assets, |g| &mut g.dependent_assets)
                .string(3, |g: &GiaFile| &g.export_info, |g| &mut g.export_info)
                .build()
        })
    }
}

/// A complete `.gia` file: envelope version plus payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct GiaDocument {
    /// Envelope version, carried through unchanged
    pub version: u32,
    /// Decoded payload
    pub file: GiaFile,
}

impl GiaDocument {
    /// Parses a complete `.gia` file with the default codec
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with(bytes, &ObjectCodec::new())
    }

    /// Parses a complete `.gia` file
    pub fn from_bytes_with(bytes: &[u8], codec: &ObjectCodec) -> Result<Self> {
        let envelope = Envelope::open(bytes, FileKind::Gia.code())?;
        let mut reader = envelope.reader()?;
        let len = reader.remaining();
        let file: GiaFile = codec.decode(&mut reader, len)?;
        debug!(
            "Loaded .gia version {} with {} asset(s), {} dependency(ies)",
            envelope.header().version,
            file.assets.len(),
            file.dependent_assets.len()
        );
        Ok(Self {
            version: envelope.header().version,
            file,
        })
    }

    /// Encodes the payload and frames it
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = ObjectCodec::new().encode(&self.file)?;
        Envelope::write(&payload, self.version, FileKind::Gia.code())
    }

    /// Size of [`to_bytes`](Self::to_bytes) output, without building it
    pub fn encoded_len(&self) -> Result<usize> {
        let plan = ObjectCodec::new().plan(&self.file)?;
        Ok(crate::envelope::OVERHEAD + plan.len())
    }
}
