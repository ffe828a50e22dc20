//! Encoded entry descriptors from the v10+ index blob.
//!
//! Each entry starts with one 32-bit packed word followed by one to three
//! conditionally-sized words. The packed layout is declared as a bitfield
//! so the on-disk shape is explicit rather than buried in shifts.

use std::io::{Read, Seek};

use byteorder::{LittleEndian, ReadBytesExt};
use modular_bitfield::{bitfield, prelude::*};
use tracing::trace;

use crate::Result;

/// Packed per-entry descriptor, LSB first.
#[bitfield(bytes = 4)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub struct EntryFlags {
    /// Raw 6-bit block-size field; kept opaque, block sizes are derived
    /// from the block offsets instead.
    pub compression_block_size: B6,
    pub compression_block_count: B16,
    pub encrypted: bool,
    /// Index into the trailer's method table; 0 means uncompressed.
    pub compression_method: B6,
    /// Compressed size fits in 32 bits.
    pub size_32bit_safe: bool,
    /// Uncompressed size fits in 32 bits.
    pub uncompressed_size_32bit_safe: bool,
    /// Offset fits in 32 bits.
    pub offset_32bit_safe: bool,
}

/// A compact entry expanded from the encoded-entry-info blob. The full
/// [`Record`](crate::Record) lives at `offset` in the archive.
#[derive(Debug, Clone)]
pub struct EncodedRecord {
    pub flags: EntryFlags,
    pub offset: u64,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
}

impl EncodedRecord {
    /// Expand one encoded entry at the cursor, normally a position inside
    /// a [`Cursor`](std::io::Cursor) over the encoded-entry-info blob.
    pub fn parse<R: Read + Seek>(f: &mut R) -> Result<Self> {
        let word = f.read_u32::<LittleEndian>()?;
        let flags = EntryFlags::from(word);

        let offset = if flags.offset_32bit_safe() {
            u64::from(f.read_u32::<LittleEndian>()?)
        } else {
            f.read_u64::<LittleEndian>()?
        };
        let uncompressed_size = if flags.uncompressed_size_32bit_safe() {
            u64::from(f.read_u32::<LittleEndian>()?)
        } else {
            f.read_u64::<LittleEndian>()?
        };
        let compressed_size = if flags.compression_method() != 0 {
            if flags.size_32bit_safe() {
                u64::from(f.read_u32::<LittleEndian>()?)
            } else {
                f.read_u64::<LittleEndian>()?
            }
        } else {
            uncompressed_size
        };

        trace!(
            "encoded entry: offset={offset:#x} uncompressed={uncompressed_size} \
             compressed={compressed_size} method={} blocks={} raw_block_size={}",
            flags.compression_method(),
            flags.compression_block_count(),
            flags.compression_block_size()
        );

        Ok(Self {
            flags,
            offset,
            uncompressed_size,
            compressed_size,
        })
    }
}
