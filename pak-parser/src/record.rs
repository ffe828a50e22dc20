//! Per-file metadata records and their compression block tables.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::trace;

use crate::ioutils::{stream_len, ReadExt};
use crate::{Error, Result, Sha1};

/// One compressed chunk of a record's payload.
///
/// Offsets are absolute into the archive. On disk they are absolute for
/// v4 and older and relative to the record's start for v7 and newer;
/// [`Record::parse`] rebases the relative form so callers never see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionBlock {
    pub start_offset: i64,
    pub end_offset: i64,
}

impl CompressionBlock {
    /// Bytes covered by this block.
    pub fn size(&self) -> i64 {
        self.end_offset - self.start_offset
    }
}

/// Full per-file metadata record.
#[derive(Debug, Clone)]
pub struct Record {
    /// Absolute offset of the payload-side record copy.
    pub offset: i64,
    pub compressed_size: i64,
    pub uncompressed_size: i64,
    /// Index into the trailer's method table; 0 means uncompressed.
    pub compression_method: u32,
    /// v1 and older only.
    pub timestamp: Option<u64>,
    /// SHA-1 over the payload; captured, never verified.
    pub data_hash: Sha1,
    pub compression_blocks: Vec<CompressionBlock>,
    pub encrypted: bool,
    /// Declared upper bound on a single decompressed block.
    pub compression_block_uncompressed_size: u32,
}

impl Record {
    /// Parse a record at the cursor. The position where the record begins
    /// is the base for v7+ compression block offsets.
    pub fn parse<R: Read + Seek>(f: &mut R, version: u32) -> Result<Self> {
        let start = f.stream_position()?;

        let offset = f.read_i64::<LittleEndian>()?;
        let compressed_size = f.read_i64::<LittleEndian>()?;
        let uncompressed_size = f.read_i64::<LittleEndian>()?;
        let compression_method = f.read_u32::<LittleEndian>()?;
        let timestamp = if version <= 1 {
            Some(f.read_u64::<LittleEndian>()?)
        } else {
            None
        };
        let data_hash = f.read_sha1()?;

        let mut compression_blocks = Vec::new();
        let mut encrypted = false;
        let mut compression_block_uncompressed_size = 0;
        if version >= 3 {
            if compression_method != 0 {
                let count_at = f.stream_position()?;
                let count = f.read_u32::<LittleEndian>()?;
                // 16 bytes per pair; the table cannot extend past EOF.
                let remaining = stream_len(f)?.saturating_sub(f.stream_position()?);
                if u64::from(count) * 16 > remaining {
                    return Err(Error::MalformedLength {
                        entity: "compression block table",
                        offset: count_at,
                        declared: i64::from(count),
                    });
                }
                compression_blocks = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let mut block_start = f.read_i64::<LittleEndian>()?;
                    let mut block_end = f.read_i64::<LittleEndian>()?;
                    if version >= 7 {
                        block_start += start as i64;
                        block_end += start as i64;
                    }
                    compression_blocks.push(CompressionBlock {
                        start_offset: block_start,
                        end_offset: block_end,
                    });
                }
            }
            encrypted = f.read_u8()? != 0;
            compression_block_uncompressed_size = f.read_u32::<LittleEndian>()?;
        }

        trace!(
            "record at {start:#x}: offset={offset:#x} compressed={compressed_size} \
             uncompressed={uncompressed_size} method={compression_method} \
             blocks={} encrypted={encrypted}",
            compression_blocks.len()
        );

        Ok(Self {
            offset,
            compressed_size,
            uncompressed_size,
            compression_method,
            timestamp,
            data_hash,
            compression_blocks,
            encrypted,
            compression_block_uncompressed_size,
        })
    }

    /// SHA-1 of the payload as uppercase hex.
    pub fn data_hash_hex(&self) -> String {
        crate::hash_to_hex(&self.data_hash)
    }
}

/// A record resolved against its payload: the record copy stored at
/// `Record::offset` plus the position right after it, where the payload
/// bytes begin. The payload itself is never read eagerly.
#[derive(Debug, Clone)]
pub struct DataRecord {
    pub record: Record,
    pub data_offset: u64,
}

impl DataRecord {
    /// Seek to `offset`, decode the payload-side record there, and capture
    /// the payload start. Validates that the record and its declared
    /// compressed size fit inside the archive.
    pub fn resolve<R: Read + Seek>(f: &mut R, offset: i64, version: u32) -> Result<Self> {
        let len = stream_len(f)?;
        if offset < 0 || offset as u64 >= len {
            return Err(Error::OffsetOutOfRange {
                entity: "record",
                offset: offset as u64,
                len,
            });
        }

        f.seek(SeekFrom::Start(offset as u64))?;
        let record = Record::parse(f, version)?;
        let data_offset = f.stream_position()?;

        if record.compressed_size < 0
            || record.compressed_size as u64 > len - offset as u64
        {
            return Err(Error::MalformedLength {
                entity: "record payload",
                offset: offset as u64,
                declared: record.compressed_size,
            });
        }

        Ok(Self {
            record,
            data_offset,
        })
    }
}
