//! Index decoding.
//!
//! Version 9 and older archives carry a flat list of named records right
//! at the index offset. Version 10 and newer moved to a header with a
//! path-hash seed, optional secondary index locators, a blob of packed
//! encoded entries, and a full directory tree stored elsewhere in the
//! archive.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, trace};

use crate::entry::EncodedRecord;
use crate::ioutils::{stream_len, ReadExt};
use crate::record::{DataRecord, Record};
use crate::trailer::Trailer;
use crate::{Error, Result, Sha1};

/// Location of a secondary index region (v10+).
#[derive(Debug, Clone)]
pub struct IndexLocator {
    pub offset: i64,
    pub size: i64,
    /// SHA-1 over the region; captured, never verified.
    pub hash: Sha1,
}

/// One entry of a legacy (v<10) index.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub file_name: String,
    /// The record as stored in the index.
    pub record: Record,
    /// The payload-side copy resolved at `record.offset`.
    pub data: DataRecord,
}

#[derive(Debug, Clone)]
pub struct LegacyIndex {
    pub mount_point: String,
    pub records: Vec<IndexRecord>,
}

/// One file of a full directory index, pointing into the
/// encoded-entry-info blob.
#[derive(Debug, Clone)]
pub struct DirectoryFile {
    pub file_name: String,
    pub encoded_offset: u32,
}

#[derive(Debug, Clone)]
pub struct Directory {
    pub name: String,
    pub files: Vec<DirectoryFile>,
}

/// Directory tree stored at the full-directory-index locator (v10+).
#[derive(Debug, Clone)]
pub struct FullDirectoryIndex {
    pub directories: Vec<Directory>,
}

impl FullDirectoryIndex {
    pub fn parse<R: Read + Seek>(f: &mut R, locator: &IndexLocator) -> Result<Self> {
        let len = stream_len(f)?;
        f.seek(SeekFrom::Start(locator.offset as u64))?;

        let count_at = f.stream_position()?;
        let dir_count = f.read_u32::<LittleEndian>()?;
        // A directory takes at least a one-byte name with its prefix and
        // NUL, plus the file count.
        if u64::from(dir_count) * 9 > len.saturating_sub(count_at) {
            return Err(Error::MalformedLength {
                entity: "directory count",
                offset: count_at,
                declared: i64::from(dir_count),
            });
        }

        let mut directories = Vec::with_capacity(dir_count as usize);
        for _ in 0..dir_count {
            let name = f.read_pak_string()?;
            let files_at = f.stream_position()?;
            let file_count = f.read_u32::<LittleEndian>()?;
            if u64::from(file_count) * 9 > len.saturating_sub(files_at) {
                return Err(Error::MalformedLength {
                    entity: "directory file count",
                    offset: files_at,
                    declared: i64::from(file_count),
                });
            }
            let mut files = Vec::with_capacity(file_count as usize);
            for _ in 0..file_count {
                let file_name = f.read_pak_string()?;
                let encoded_offset = f.read_u32::<LittleEndian>()?;
                files.push(DirectoryFile {
                    file_name,
                    encoded_offset,
                });
            }
            trace!("directory {name:?}: {} files", files.len());
            directories.push(Directory { name, files });
        }

        Ok(Self { directories })
    }
}

/// One file of a modern index, fully resolved: its position in the
/// directory tree, the expanded encoded entry, and the payload-side
/// record.
#[derive(Debug, Clone)]
pub struct ModernEntry {
    pub directory: String,
    pub file_name: String,
    pub encoded: EncodedRecord,
    pub data: DataRecord,
}

#[derive(Debug, Clone)]
pub struct ModernIndex {
    pub mount_point: String,
    pub entry_count: i32,
    pub path_hash_seed: u64,
    pub path_hash_index: Option<IndexLocator>,
    pub full_directory_index: Option<IndexLocator>,
    /// Raw encoded-entry-info blob, addressed by the directory index.
    pub encoded_entries: Vec<u8>,
    pub record_count: u32,
    pub entries: Vec<ModernEntry>,
}

/// Decoded archive index, either layout.
#[derive(Debug, Clone)]
pub enum Index {
    Legacy(LegacyIndex),
    Modern(ModernIndex),
}

impl Index {
    /// Decode the index the trailer points at. An encrypted index is
    /// rejected up front; nothing else about the archive is reachable
    /// without it.
    pub fn parse<R: Read + Seek>(f: &mut R, trailer: &Trailer) -> Result<Self> {
        if trailer.encrypted_index {
            return Err(Error::EncryptionUnsupported("index".to_string()));
        }

        let len = stream_len(f)?;
        if trailer.index_offset < 0 || trailer.index_offset as u64 >= len {
            return Err(Error::OffsetOutOfRange {
                entity: "index",
                offset: trailer.index_offset as u64,
                len,
            });
        }
        f.seek(SeekFrom::Start(trailer.index_offset as u64))?;

        if trailer.version < 10 {
            Ok(Self::Legacy(parse_legacy(f, trailer.version)?))
        } else {
            Ok(Self::Modern(parse_modern(f, trailer.version, len)?))
        }
    }

    pub fn mount_point(&self) -> &str {
        match self {
            Self::Legacy(index) => &index.mount_point,
            Self::Modern(index) => &index.mount_point,
        }
    }

    /// Number of files listed.
    pub fn len(&self) -> usize {
        match self {
            Self::Legacy(index) => index.records.len(),
            Self::Modern(index) => index.entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_legacy<R: Read + Seek>(f: &mut R, version: u32) -> Result<LegacyIndex> {
    let mount_point = f.read_pak_string()?;
    let count_at = f.stream_position()?;
    let count = f.read_u32::<LittleEndian>()?;

    // The smallest record is 48 bytes; a count that cannot fit is bogus.
    let remaining = stream_len(f)?.saturating_sub(count_at);
    if u64::from(count) * 48 > remaining {
        return Err(Error::MalformedLength {
            entity: "index record count",
            offset: count_at,
            declared: i64::from(count),
        });
    }

    debug!("legacy index: mount {mount_point:?}, {count} records");

    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let file_name = f.read_pak_string()?;
        let record = Record::parse(f, version)?;

        // Resolving the payload-side copy moves the cursor; the index
        // walk resumes where it left off.
        let resume = f.stream_position()?;
        let data = DataRecord::resolve(f, record.offset, version)?;
        f.seek(SeekFrom::Start(resume))?;

        records.push(IndexRecord {
            file_name,
            record,
            data,
        });
    }

    Ok(LegacyIndex {
        mount_point,
        records,
    })
}

fn read_locator<R: Read + Seek>(
    f: &mut R,
    entity: &'static str,
    len: u64,
) -> Result<IndexLocator> {
    let at = f.stream_position()?;
    let offset = f.read_i64::<LittleEndian>()?;
    let size = f.read_i64::<LittleEndian>()?;
    let hash = f.read_sha1()?;
    if offset < 0 || offset as u64 >= len {
        return Err(Error::OffsetOutOfRange {
            entity,
            offset: offset as u64,
            len,
        });
    }
    if size < 0 || offset as u64 + size as u64 > len {
        return Err(Error::MalformedLength {
            entity,
            offset: at,
            declared: size,
        });
    }
    Ok(IndexLocator { offset, size, hash })
}

fn parse_modern<R: Read + Seek>(f: &mut R, version: u32, len: u64) -> Result<ModernIndex> {
    let mount_point = f.read_pak_string()?;
    let entry_count = f.read_i32::<LittleEndian>()?;
    let path_hash_seed = f.read_u64::<LittleEndian>()?;

    let path_hash_index = if f.read_u32::<LittleEndian>()? != 0 {
        Some(read_locator(f, "path hash index", len)?)
    } else {
        None
    };
    let full_directory_index = if f.read_u32::<LittleEndian>()? != 0 {
        Some(read_locator(f, "full directory index", len)?)
    } else {
        None
    };

    let blob_at = f.stream_position()?;
    let blob_len = f.read_i32::<LittleEndian>()?;
    if blob_len < 0 || blob_len as u64 > len.saturating_sub(blob_at) {
        return Err(Error::MalformedLength {
            entity: "encoded entry info",
            offset: blob_at,
            declared: i64::from(blob_len),
        });
    }
    let mut encoded_entries = vec![0u8; blob_len as usize];
    f.read_exact(&mut encoded_entries)?;
    let record_count = f.read_u32::<LittleEndian>()?;

    debug!(
        "modern index: mount {mount_point:?}, {entry_count} entries, \
         path_hash_index={}, full_directory_index={}, blob={blob_len} bytes",
        path_hash_index.is_some(),
        full_directory_index.is_some()
    );

    let mut entries = Vec::new();
    if let Some(locator) = &full_directory_index {
        let tree = FullDirectoryIndex::parse(f, locator)?;
        for directory in &tree.directories {
            for file in &directory.files {
                if file.encoded_offset as usize >= encoded_entries.len() {
                    return Err(Error::OffsetOutOfRange {
                        entity: "encoded entry",
                        offset: u64::from(file.encoded_offset),
                        len: encoded_entries.len() as u64,
                    });
                }
                // The blob gets its own cursor so expanding an entry
                // never disturbs the archive position.
                let mut blob = Cursor::new(encoded_entries.as_slice());
                blob.seek(SeekFrom::Start(u64::from(file.encoded_offset)))?;
                let encoded = EncodedRecord::parse(&mut blob)?;
                let data = DataRecord::resolve(f, encoded.offset as i64, version)?;
                entries.push(ModernEntry {
                    directory: directory.name.clone(),
                    file_name: file.file_name.clone(),
                    encoded,
                    data,
                });
            }
        }
    }

    Ok(ModernIndex {
        mount_point,
        entry_count,
        path_hash_seed,
        path_hash_index,
        full_directory_index,
        encoded_entries,
        record_count,
        entries,
    })
}
