//! Builders that assemble complete PAK archives in memory, byte for byte.
#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

pub const PAK_MAGIC: u32 = 0x5A6F_12E1;

/// Payloads are split into blocks of this size before compression.
pub const BLOCK_SIZE: usize = 4096;

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Length-prefixed, NUL-terminated string.
pub fn pak_string(s: &str) -> Vec<u8> {
    let mut out = ((s.len() + 1) as i32).to_le_bytes().to_vec();
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    out
}

/// Deterministic patterned content of `len` bytes.
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

pub struct TestFile {
    pub name: &'static str,
    /// "" for files at the archive root; modern builds group by this.
    pub directory: &'static str,
    pub content: Vec<u8>,
    /// Compression method index: 0 = stored, 1 = first table entry (zlib
    /// in every builder here).
    pub method: u32,
    pub encrypted: bool,
}

impl TestFile {
    pub fn stored(name: &'static str, content: Vec<u8>) -> Self {
        Self {
            name,
            directory: "",
            content,
            method: 0,
            encrypted: false,
        }
    }

    pub fn zlib(name: &'static str, content: Vec<u8>) -> Self {
        Self {
            name,
            directory: "",
            content,
            method: 1,
            encrypted: false,
        }
    }
}

/// Serialize one record. `blocks` holds the on-disk offset pairs, so
/// absolute values for v4 and older and record-relative ones for v7+.
#[allow(clippy::too_many_arguments)]
pub fn record_bytes(
    version: u32,
    offset: i64,
    compressed: i64,
    uncompressed: i64,
    method: u32,
    blocks: &[(i64, i64)],
    encrypted: bool,
    block_uncompressed: u32,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&compressed.to_le_bytes());
    out.extend_from_slice(&uncompressed.to_le_bytes());
    out.extend_from_slice(&method.to_le_bytes());
    if version <= 1 {
        out.extend_from_slice(&0u64.to_le_bytes()); // timestamp
    }
    out.extend_from_slice(&[0u8; 20]); // data hash
    if version >= 3 {
        if method != 0 {
            out.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
            for (start, end) in blocks {
                out.extend_from_slice(&start.to_le_bytes());
                out.extend_from_slice(&end.to_le_bytes());
            }
        }
        out.push(u8::from(encrypted));
        out.extend_from_slice(&block_uncompressed.to_le_bytes());
    }
    out
}

fn record_size(version: u32, method: u32, block_count: usize) -> u64 {
    record_bytes(
        version,
        0,
        0,
        0,
        method,
        &vec![(0, 0); block_count],
        false,
        0,
    )
    .len() as u64
}

/// A file placed in the payload region: where its record starts and the
/// record bytes shared by the payload side and the index.
pub struct Placed {
    pub record_offset: u64,
    pub record: Vec<u8>,
    pub compressed_size: u64,
}

/// Append the payload-side record and payload for one file.
pub fn place_file(archive: &mut Vec<u8>, version: u32, file: &TestFile) -> Placed {
    let record_offset = archive.len() as u64;
    if file.method == 0 {
        let len = file.content.len() as i64;
        let record = record_bytes(
            version,
            record_offset as i64,
            len,
            len,
            0,
            &[],
            file.encrypted,
            0,
        );
        archive.extend_from_slice(&record);
        archive.extend_from_slice(&file.content);
        Placed {
            record_offset,
            record,
            compressed_size: file.content.len() as u64,
        }
    } else {
        let chunks: Vec<Vec<u8>> = file.content.chunks(BLOCK_SIZE).map(|c| zlib(c)).collect();
        let compressed: i64 = chunks.iter().map(|c| c.len() as i64).sum();
        let data_offset = record_offset + record_size(version, file.method, chunks.len());

        let mut absolute = Vec::new();
        let mut at = data_offset as i64;
        for chunk in &chunks {
            absolute.push((at, at + chunk.len() as i64));
            at += chunk.len() as i64;
        }
        let on_disk: Vec<(i64, i64)> = if version >= 7 {
            absolute
                .iter()
                .map(|(s, e)| (s - record_offset as i64, e - record_offset as i64))
                .collect()
        } else {
            absolute
        };

        let record = record_bytes(
            version,
            record_offset as i64,
            compressed,
            file.content.len() as i64,
            file.method,
            &on_disk,
            file.encrypted,
            BLOCK_SIZE as u32,
        );
        archive.extend_from_slice(&record);
        for chunk in &chunks {
            archive.extend_from_slice(chunk);
        }
        Placed {
            record_offset,
            record,
            compressed_size: compressed as u64,
        }
    }
}

/// Append a trailer. `methods` fills the first slots of the v8+ table.
pub fn write_trailer(
    archive: &mut Vec<u8>,
    version: u32,
    index_offset: u64,
    index_size: u64,
    methods: &[&str],
) {
    if version >= 7 {
        archive.extend_from_slice(&[0u8; 16]); // encryption key GUID
    }
    if version >= 4 {
        archive.push(0); // encrypted-index flag
    }
    archive.extend_from_slice(&PAK_MAGIC.to_le_bytes());
    archive.extend_from_slice(&version.to_le_bytes());
    archive.extend_from_slice(&(index_offset as i64).to_le_bytes());
    archive.extend_from_slice(&(index_size as i64).to_le_bytes());
    archive.extend_from_slice(&[0u8; 20]); // index hash
    if version == 9 {
        archive.push(0); // frozen-index flag
    }
    if version >= 8 {
        for slot_index in 0..5 {
            let mut slot = [0u8; 32];
            if let Some(name) = methods.get(slot_index) {
                slot[..name.len()].copy_from_slice(name.as_bytes());
            }
            archive.extend_from_slice(&slot);
        }
    }
}

/// The magic scan covers the trailing 226 bytes; keep every fixture
/// comfortably past that.
fn pad_for_scan(archive: &mut Vec<u8>) {
    while archive.len() < 300 {
        archive.push(0);
    }
}

/// A complete v1..=9 archive: payload region, flat index, trailer.
pub fn build_legacy_archive(version: u32, mount: &str, files: &[TestFile]) -> Vec<u8> {
    assert!(version < 10);
    let mut archive = Vec::new();

    let placed: Vec<Placed> = files
        .iter()
        .map(|file| place_file(&mut archive, version, file))
        .collect();

    let index_offset = archive.len() as u64;
    archive.extend_from_slice(&pak_string(mount));
    archive.extend_from_slice(&(files.len() as u32).to_le_bytes());
    for (file, placed) in files.iter().zip(&placed) {
        archive.extend_from_slice(&pak_string(file.name));
        archive.extend_from_slice(&placed.record);
    }
    let index_size = archive.len() as u64 - index_offset;

    pad_for_scan(&mut archive);
    write_trailer(
        &mut archive,
        version,
        index_offset,
        index_size,
        if version >= 8 { &["Zlib"] } else { &[] },
    );
    archive
}

/// Pack an encoded-entry descriptor word, LSB first.
pub fn pack_entry_flags(
    block_size: u32,
    block_count: u32,
    encrypted: bool,
    method: u32,
    size32: bool,
    uncompressed32: bool,
    offset32: bool,
) -> u32 {
    block_size
        | block_count << 6
        | u32::from(encrypted) << 22
        | method << 23
        | u32::from(size32) << 29
        | u32::from(uncompressed32) << 30
        | u32::from(offset32) << 31
}

/// A complete v10/v11 archive: payload region, primary index with the
/// encoded-entry blob, full directory index, trailer. No path-hash index.
pub fn build_modern_archive(
    version: u32,
    mount: &str,
    methods: &[&str],
    files: &[TestFile],
) -> Vec<u8> {
    assert!(version >= 10);
    let mut archive = Vec::new();

    let placed: Vec<Placed> = files
        .iter()
        .map(|file| place_file(&mut archive, version, file))
        .collect();

    // Encoded-entry blob, one entry per file, all words 32-bit safe.
    let mut blob = Vec::new();
    let mut encoded_offsets = Vec::new();
    for (file, placed) in files.iter().zip(&placed) {
        encoded_offsets.push(blob.len() as u32);
        let block_count = if file.method == 0 {
            0
        } else {
            file.content.len().div_ceil(BLOCK_SIZE) as u32
        };
        let word = pack_entry_flags(
            0,
            block_count,
            file.encrypted,
            file.method,
            true,
            true,
            true,
        );
        blob.extend_from_slice(&word.to_le_bytes());
        blob.extend_from_slice(&(placed.record_offset as u32).to_le_bytes());
        blob.extend_from_slice(&(file.content.len() as u32).to_le_bytes());
        if file.method != 0 {
            blob.extend_from_slice(&(placed.compressed_size as u32).to_le_bytes());
        }
    }

    // Group files by directory, preserving first-seen order.
    let mut directories: Vec<(&str, Vec<(usize, &TestFile)>)> = Vec::new();
    for (i, file) in files.iter().enumerate() {
        match directories.iter_mut().find(|(d, _)| *d == file.directory) {
            Some((_, members)) => members.push((i, file)),
            None => directories.push((file.directory, vec![(i, file)])),
        }
    }

    let mut directory_index = Vec::new();
    directory_index.extend_from_slice(&(directories.len() as u32).to_le_bytes());
    for (directory, members) in &directories {
        directory_index.extend_from_slice(&pak_string(directory));
        directory_index.extend_from_slice(&(members.len() as u32).to_le_bytes());
        for (i, file) in members {
            directory_index.extend_from_slice(&pak_string(file.name));
            directory_index.extend_from_slice(&encoded_offsets[*i].to_le_bytes());
        }
    }

    let index_offset = archive.len() as u64;
    let mount_bytes = pak_string(mount);
    // mount + entry count + seed + hasPHI + hasFDI + FDI locator
    // + blob length prefix + blob + trailing record count
    let index_size = mount_bytes.len() as u64 + 4 + 8 + 4 + 4 + 36 + 4 + blob.len() as u64 + 4;
    let directory_index_offset = index_offset + index_size;

    archive.extend_from_slice(&mount_bytes);
    archive.extend_from_slice(&(files.len() as i32).to_le_bytes());
    archive.extend_from_slice(&0xC0FF_EEu64.to_le_bytes()); // path-hash seed
    archive.extend_from_slice(&0u32.to_le_bytes()); // no path-hash index
    archive.extend_from_slice(&1u32.to_le_bytes()); // full directory index
    archive.extend_from_slice(&(directory_index_offset as i64).to_le_bytes());
    archive.extend_from_slice(&(directory_index.len() as i64).to_le_bytes());
    archive.extend_from_slice(&[0u8; 20]); // directory index hash
    archive.extend_from_slice(&(blob.len() as i32).to_le_bytes());
    archive.extend_from_slice(&blob);
    archive.extend_from_slice(&(files.len() as u32).to_le_bytes());
    assert_eq!(archive.len() as u64, directory_index_offset);

    archive.extend_from_slice(&directory_index);

    pad_for_scan(&mut archive);
    write_trailer(&mut archive, version, index_offset, index_size, methods);
    archive
}
