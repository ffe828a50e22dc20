//! Trailer location and decoding.
//!
//! A PAK archive ends with a version-dependent fixed-layout trailer
//! carrying the magic, the format version, and the index locator. The
//! trailer's size depends on the version, and the version lives inside the
//! trailer, so the only way in is a bounded scan for the magic over the
//! trailing bytes.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use crate::ioutils::{stream_len, ReadExt};
use crate::{Error, Guid, Result, Sha1};

/// Trailer magic, stored on disk as `E1 12 6F 5A`.
pub const PAK_MAGIC: u32 = 0x5A6F_12E1;

/// Versions 1 through 11 are decodable.
pub const MAX_SUPPORTED_VERSION: u32 = 11;

/// Upper bound on the distance from the start of any supported trailer to
/// the end of the archive; the magic scan covers this many trailing bytes.
pub const MAX_TRAILER_SIZE: u64 = 226;

/// Number of 32-byte name slots in the v8+ compression method table.
const METHOD_NAME_SLOTS: usize = 5;

/// Width of one method table slot.
const METHOD_NAME_LEN: usize = 32;

/// Size in bytes of the trailer for a given format version.
pub fn trailer_size(version: u32) -> u64 {
    // magic + version + index offset + index size + index hash
    let mut size: u64 = 4 + 4 + 8 + 8 + 20;
    if version >= 4 {
        size += 1; // encrypted-index flag
    }
    if version >= 7 {
        size += 16; // encryption key GUID
    }
    if version == 9 {
        size += 1; // frozen-index flag
    }
    if version >= 8 {
        size += (METHOD_NAME_SLOTS * METHOD_NAME_LEN) as u64;
    }
    size
}

/// Scan for the trailer magic over the trailing [`MAX_TRAILER_SIZE`] bytes.
///
/// Reads a little-endian u32 at each successive byte offset from
/// `len - MAX_TRAILER_SIZE` until the magic matches or the read position
/// reaches `len - 4`. Returns the magic's absolute offset and the version
/// byte that follows it.
pub fn locate_magic<R: Read + Seek>(f: &mut R) -> Result<(u64, u32)> {
    let len = stream_len(f)?;
    if len < MAX_TRAILER_SIZE {
        return Err(Error::TooSmall(len));
    }

    let scan_start = len - MAX_TRAILER_SIZE;
    f.seek(SeekFrom::Start(scan_start))?;
    let mut tail = [0u8; MAX_TRAILER_SIZE as usize];
    f.read_exact(&mut tail)?;

    for i in 0..tail.len() - 4 {
        let word = u32::from_le_bytes([tail[i], tail[i + 1], tail[i + 2], tail[i + 3]]);
        if word != PAK_MAGIC {
            continue;
        }
        let version = u32::from(tail[i + 4]);
        if version == 0 || version > MAX_SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let magic_offset = scan_start + i as u64;
        debug!("PAK magic at {magic_offset:#x}, version {version}");
        return Ok((magic_offset, version));
    }

    Err(Error::MagicNotFound)
}

/// Decoded archive trailer.
#[derive(Debug, Clone)]
pub struct Trailer {
    pub version: u32,
    /// Key GUID for encrypted archives (v7+); zero when unencrypted.
    pub encryption_guid: Option<Guid>,
    /// Whether the index itself is encrypted (v4+).
    pub encrypted_index: bool,
    pub index_offset: i64,
    pub index_size: i64,
    /// SHA-1 over the index bytes; captured, never verified.
    pub index_hash: Sha1,
    /// v9 only.
    pub frozen_index: bool,
    /// Ordered method names from the v8+ table. Method index 0 means "no
    /// compression" and is not stored; index `n` refers to entry `n - 1`.
    pub compression_methods: Vec<String>,
}

impl Trailer {
    /// Decode the trailer for a version already established by
    /// [`locate_magic`]. Seeks to `len - trailer_size(version)` and reads
    /// the fields in physical order.
    pub fn parse<R: Read + Seek>(f: &mut R, version: u32) -> Result<Self> {
        if version == 0 || version > MAX_SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let len = stream_len(f)?;
        let size = trailer_size(version);
        if len < size {
            return Err(Error::TooSmall(len));
        }
        f.seek(SeekFrom::Start(len - size))?;

        let encryption_guid = if version >= 7 {
            Some(f.read_guid()?)
        } else {
            None
        };
        let encrypted_index = if version >= 4 { f.read_u8()? != 0 } else { false };

        // The version byte from the scan fixed the layout; the magic must
        // now sit exactly where that layout says it does.
        let magic = f.read_u32::<LittleEndian>()?;
        if magic != PAK_MAGIC {
            return Err(Error::MagicNotFound);
        }
        let disk_version = f.read_u32::<LittleEndian>()?;
        if disk_version != version {
            return Err(Error::UnsupportedVersion(disk_version));
        }

        let index_offset = f.read_i64::<LittleEndian>()?;
        let index_size = f.read_i64::<LittleEndian>()?;
        let index_hash = f.read_sha1()?;
        let frozen_index = if version == 9 { f.read_u8()? != 0 } else { false };

        let compression_methods = if version >= 8 {
            read_method_table(f)?
        } else {
            Vec::new()
        };

        debug!(
            "trailer v{version}: index at {index_offset:#x} ({index_size} bytes), \
             encrypted_index={encrypted_index}, methods={compression_methods:?}"
        );

        Ok(Self {
            version,
            encryption_guid,
            encrypted_index,
            index_offset,
            index_size,
            index_hash,
            frozen_index,
            compression_methods,
        })
    }
}

/// Five fixed-width 32-byte slots, each holding a NUL-terminated ASCII
/// name or all-NUL for an empty entry. Empty slots are kept so method
/// indices stay aligned.
fn read_method_table<R: Read + Seek>(f: &mut R) -> Result<Vec<String>> {
    let mut methods = Vec::with_capacity(METHOD_NAME_SLOTS);
    for _ in 0..METHOD_NAME_SLOTS {
        let at = f.stream_position()?;
        let mut slot = [0u8; METHOD_NAME_LEN];
        f.read_exact(&mut slot)?;
        if slot[0] == 0 {
            methods.push(String::new());
            continue;
        }
        let nul = slot.iter().position(|&b| b == 0).unwrap_or(METHOD_NAME_LEN);
        let name =
            std::str::from_utf8(&slot[..nul]).map_err(|_| Error::MalformedString {
                offset: at,
                reason: "method name is not valid ASCII".to_string(),
            })?;
        methods.push(name.to_string());
    }
    Ok(methods)
}
