//! Internal primitive decoders shared by the trailer, index, and record
//! parsers.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{Error, Guid, Result, Sha1};

/// Longest length prefix accepted for any string in the archive.
pub const MAX_STRING_LEN: i32 = 4096;

/// Total length of a seekable source, preserving the cursor.
pub fn stream_len<S: Seek>(f: &mut S) -> std::io::Result<u64> {
    let pos = f.stream_position()?;
    let len = f.seek(SeekFrom::End(0))?;
    if pos != len {
        f.seek(SeekFrom::Start(pos))?;
    }
    Ok(len)
}

/// Extension trait for the fixed-width and string primitives the PAK
/// format is built from. All integers are little-endian.
pub trait ReadExt {
    /// Read a 16-byte GUID.
    fn read_guid(&mut self) -> Result<Guid>;

    /// Read a raw 20-byte SHA-1.
    fn read_sha1(&mut self) -> Result<Sha1>;

    /// Read a length-prefixed, NUL-terminated string.
    ///
    /// The i32 length prefix counts the terminator. The decoded value is
    /// the bytes up to the first NUL. A prefix of zero or less, or larger
    /// than [`MAX_STRING_LEN`], is malformed.
    fn read_pak_string(&mut self) -> Result<String>;
}

impl<T: Read + Seek> ReadExt for T {
    fn read_guid(&mut self) -> Result<Guid> {
        let mut guid = [0u8; 16];
        self.read_exact(&mut guid)?;
        Ok(guid)
    }

    fn read_sha1(&mut self) -> Result<Sha1> {
        let mut hash = [0u8; 20];
        self.read_exact(&mut hash)?;
        Ok(hash)
    }

    fn read_pak_string(&mut self) -> Result<String> {
        let at = self.stream_position()?;
        let declared = self.read_i32::<LittleEndian>()?;
        if declared <= 0 || declared > MAX_STRING_LEN {
            return Err(Error::MalformedString {
                offset: at,
                reason: format!("declared length {declared}"),
            });
        }

        let mut buf = vec![0u8; declared as usize];
        self.read_exact(&mut buf)?;

        let nul = buf
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::MalformedString {
                offset: at,
                reason: "missing NUL terminator".to_string(),
            })?;
        buf.truncate(nul);

        String::from_utf8(buf).map_err(|_| Error::MalformedString {
            offset: at,
            reason: "not valid ASCII".to_string(),
        })
    }
}
