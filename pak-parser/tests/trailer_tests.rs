mod common;

use std::io::Cursor;

use common::{build_legacy_archive, build_modern_archive, patterned, TestFile, PAK_MAGIC};
use pak_parser::{locate_magic, trailer_size, Error, Trailer};

/// Bytes before the magic inside the trailer: the encryption GUID (v7+)
/// and the encrypted-index flag (v4+).
fn prefix_len(version: u32) -> u64 {
    let mut len = 0;
    if version >= 7 {
        len += 16;
    }
    if version >= 4 {
        len += 1;
    }
    len
}

fn build(version: u32) -> Vec<u8> {
    let files = [TestFile::stored("a.bin", patterned(512))];
    if version >= 10 {
        build_modern_archive(version, "../../../Game/", &["Zlib"], &files)
    } else {
        build_legacy_archive(version, "../../../Game/", &files)
    }
}

#[test]
fn test_magic_distance_matches_trailer_size() {
    for version in [3u32, 4, 5, 7, 8, 9, 10, 11] {
        let archive = build(version);
        let len = archive.len() as u64;
        let (magic_offset, located) = locate_magic(&mut Cursor::new(&archive)).unwrap();
        assert_eq!(located, version);
        assert_eq!(
            len - magic_offset,
            trailer_size(version) - prefix_len(version),
            "version {version}"
        );
    }
}

#[test]
fn test_trailer_fields_v3() {
    let archive = build(3);
    let mut cursor = Cursor::new(&archive);
    let (_, version) = locate_magic(&mut cursor).unwrap();
    let trailer = Trailer::parse(&mut cursor, version).unwrap();
    assert_eq!(trailer.version, 3);
    assert!(trailer.encryption_guid.is_none());
    assert!(!trailer.encrypted_index);
    assert!(trailer.compression_methods.is_empty());
    assert!(trailer.index_offset > 0);
    assert!(trailer.index_size > 0);
}

#[test]
fn test_trailer_method_table_v8() {
    let archive = build(8);
    let mut cursor = Cursor::new(&archive);
    let (_, version) = locate_magic(&mut cursor).unwrap();
    let trailer = Trailer::parse(&mut cursor, version).unwrap();
    // Five slots, populated from the front, empties preserved.
    assert_eq!(trailer.compression_methods, vec!["Zlib", "", "", "", ""]);
}

#[test]
fn test_trailer_v11_carries_guid() {
    let archive = build(11);
    let mut cursor = Cursor::new(&archive);
    let (_, version) = locate_magic(&mut cursor).unwrap();
    let trailer = Trailer::parse(&mut cursor, version).unwrap();
    assert_eq!(trailer.encryption_guid, Some([0u8; 16]));
    assert!(!trailer.frozen_index);
}

#[test]
fn test_unsupported_version_byte() {
    // Valid v8 layout, then the version byte is bumped to 12.
    let mut archive = build(8);
    let (magic_offset, _) = locate_magic(&mut Cursor::new(&archive)).unwrap();
    archive[magic_offset as usize + 4] = 0x0C;
    let err = locate_magic(&mut Cursor::new(&archive)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedVersion(12)));
}

#[test]
fn test_truncated_archive() {
    let err = locate_magic(&mut Cursor::new(vec![0u8; 100])).unwrap_err();
    assert!(matches!(err, Error::TooSmall(100)));
}

#[test]
fn test_no_magic() {
    let err = locate_magic(&mut Cursor::new(vec![0x11u8; 600])).unwrap_err();
    assert!(matches!(err, Error::MagicNotFound));
}

#[test]
fn test_magic_on_disk_byte_order() {
    let archive = build(3);
    let (magic_offset, _) = locate_magic(&mut Cursor::new(&archive)).unwrap();
    let at = magic_offset as usize;
    assert_eq!(&archive[at..at + 4], &[0xE1, 0x12, 0x6F, 0x5A]);
    assert_eq!(PAK_MAGIC, 0x5A6F_12E1);
}

#[test]
fn test_trailer_rejects_misframed_version() {
    // Claiming v8 against a v3 archive puts the magic elsewhere.
    let archive = build(3);
    let err = Trailer::parse(&mut Cursor::new(&archive), 8).unwrap_err();
    assert!(matches!(err, Error::MagicNotFound));
}
