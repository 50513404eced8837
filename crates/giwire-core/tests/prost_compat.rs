//! Cross-checks the object codec against prost for the shared wire subset.

use giwire_core::{Asset, AssetInfo, GiaFile, Guid, Message, ObjectCodec, Schema, ZigZag};
use pretty_assertions::assert_eq;
use std::sync::OnceLock;

#[derive(Clone, PartialEq, prost::Message)]
struct ProstAssetInfo {
    #[prost(uint32, tag = "2")]
    special_type: u32,
    #[prost(uint32, tag = "3")]
    category: u32,
    #[prost(uint32, tag = "4")]
    guid: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
struct ProstAsset {
    #[prost(message, optional, tag = "1")]
    info: Option<ProstAssetInfo>,
    #[prost(message, repeated, tag = "2")]
    related: Vec<ProstAssetInfo>,
    #[prost(string, tag = "3")]
    name: String,
    #[prost(uint32, tag = "5")]
    kind: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
struct ProstGiaFile {
    #[prost(message, repeated, tag = "1")]
    assets: Vec<ProstAsset>,
    #[prost(message, repeated, tag = "2")]
    dependent_assets: Vec<ProstAsset>,
    #[prost(string, tag = "3")]
    export_info: String,
}

#[derive(Clone, PartialEq, prost::Message)]
struct ProstLevel {
    #[prost(uint32, tag = "99")]
    leaf: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
struct ProstWrapper {
    #[prost(message, optional, tag = "11")]
    level: Option<ProstLevel>,
}

#[derive(Clone, PartialEq, prost::Message)]
struct ProstScalars {
    #[prost(int32, tag = "1")]
    count: i32,
    #[prost(sint64, tag = "2")]
    offset: i64,
    #[prost(fixed32, tag = "3")]
    checksum: u32,
    #[prost(double, tag = "4")]
    ratio: f64,
    #[prost(bool, tag = "5")]
    enabled: bool,
    #[prost(string, tag = "6")]
    label: String,
    #[prost(message, optional, tag = "10")]
    wrapper: Option<ProstWrapper>,
}

#[derive(Debug, Default, PartialEq)]
struct Scalars {
    count: i32,
    offset: ZigZag<i64>,
    checksum: u32,
    ratio: f64,
    enabled: bool,
    label: String,
    buried: u32,
}

impl Message for Scalars {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Scalars>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .varint(1, |s: &Scalars| &s.count, |s| &mut s.count)
                .varint(2, |s: &Scalars| &s.offset, |s| &mut s.offset)
                .fixed32(3, |s: &Scalars| &s.checksum, |s| &mut s.checksum)
                .fixed64(4, |s: &Scalars| &s.ratio, |s| &mut s.ratio)
                .varint(5, |s: &Scalars| &s.enabled, |s| &mut s.enabled)
                .string(6, |s: &Scalars| &s.label, |s| &mut s.label)
                .wrapped(
                    99,
                    giwire_core::FieldKind::Varint,
                    10,
                    &[11],
                    |s: &Scalars| &s.buried,
                    |s| &mut s.buried,
                )
                .build()
        })
    }
}

fn sample_scalars() -> (Scalars, ProstScalars) {
    let ours = Scalars {
        count: -5,
        offset: ZigZag(-300),
        checksum: 0xCAFE_F00D,
        ratio: 2.75,
        enabled: true,
        label: "héllo".into(),
        buried: 42,
    };
    let theirs = ProstScalars {
        count: -5,
        offset: -300,
        checksum: 0xCAFE_F00D,
        ratio: 2.75,
        enabled: true,
        label: "héllo".into(),
        wrapper: Some(ProstWrapper {
            level: Some(ProstLevel { leaf: 42 }),
        }),
    };
    (ours, theirs)
}

fn sample_file() -> (GiaFile, ProstGiaFile) {
    let info = |guid: u32| AssetInfo {
        special_type: 1,
        category: 2,
        guid: Guid(guid),
    };
    let prost_info = |guid: u32| ProstAssetInfo {
        special_type: 1,
        category: 2,
        guid,
    };

    let ours = GiaFile {
        assets: vec![
            Asset {
                info: info(0x4000_0000),
                related: vec![info(0x4000_0001), info(0x4000_0002)],
                name: "Lantern".into(),
                kind: 3,
            },
            Asset {
                info: info(0x4000_0003),
                name: "Bridge".into(),
                ..Default::default()
            },
        ],
        dependent_assets: vec![Asset {
            info: info(7),
            kind: 28,
            ..Default::default()
        }],
        export_info: "exported by giwire".into(),
    };
    let theirs = ProstGiaFile {
        assets: vec![
            ProstAsset {
                info: Some(prost_info(0x4000_0000)),
                related: vec![prost_info(0x4000_0001), prost_info(0x4000_0002)],
                name: "Lantern".into(),
                kind: 3,
            },
            ProstAsset {
                info: Some(prost_info(0x4000_0003)),
                related: vec![],
                name: "Bridge".into(),
                kind: 0,
            },
        ],
        dependent_assets: vec![ProstAsset {
            info: Some(prost_info(7)),
            related: vec![],
            name: String::new(),
            kind: 28,
        }],
        export_info: "exported by giwire".into(),
    };
    (ours, theirs)
}

#[test]
fn test_scalar_encoding_matches_prost() {
    let (ours, theirs) = sample_scalars();
    let encoded = ObjectCodec::new().encode(&ours).unwrap();
    assert_eq!(encoded, prost::Message::encode_to_vec(&theirs));
}

#[test]
fn test_decodes_prost_scalars() {
    let (ours, theirs) = sample_scalars();
    let bytes = prost::Message::encode_to_vec(&theirs);
    let decoded: Scalars = ObjectCodec::new().decode_from_slice(&bytes).unwrap();
    assert_eq!(decoded, ours);
}

#[test]
fn test_prost_decodes_our_scalars() {
    let (ours, theirs) = sample_scalars();
    let encoded = ObjectCodec::new().encode(&ours).unwrap();
    let decoded = <ProstScalars as prost::Message>::decode(encoded.as_slice()).unwrap();
    assert_eq!(decoded, theirs);
}

#[test]
fn test_gia_payload_matches_prost() {
    let (ours, theirs) = sample_file();
    let encoded = ObjectCodec::new().encode(&ours).unwrap();
    assert_eq!(encoded, prost::Message::encode_to_vec(&theirs));

    let decoded: GiaFile = ObjectCodec::new()
        .decode_from_slice(&prost::Message::encode_to_vec(&theirs))
        .unwrap();
    assert_eq!(decoded, ours);
}

#[test]
fn test_all_defaults_encode_to_nothing() {
    assert!(ObjectCodec::new().encode(&Scalars::default()).unwrap().is_empty());
    assert!(prost::Message::encode_to_vec(&ProstScalars::default()).is_empty());
}
