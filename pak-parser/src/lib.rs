//! Reader for the Unreal Engine PAK archive format.
//!
//! PAK archives end with a version-dependent trailer that locates the
//! index; the index lists every contained file and where its payload and
//! compression blocks live. This crate decodes format versions 1 through
//! 11, including the v10+ "full directory" index with its packed encoded
//! entries, and streams payloads through pluggable decompressors.
//!
//! ```no_run
//! use pak_parser::{CancelFlag, PakReader};
//!
//! let mut pak = PakReader::open("Game.pak")?;
//! for entry in pak.entries() {
//!     println!("{} ({} bytes)", entry.path, entry.data.record.uncompressed_size);
//! }
//! pak.extract_all("out".as_ref(), &CancelFlag::new())?;
//! # Ok::<(), pak_parser::Error>(())
//! ```

pub mod decompress;
pub mod entry;
pub mod error;
pub mod extract;
pub mod index;
mod ioutils;
pub mod reader;
pub mod record;
pub mod trailer;

pub use decompress::{method_name, CodecRegistry, Decompressor, ZlibDecompressor};
pub use entry::{EncodedRecord, EntryFlags};
pub use error::{Error, Result};
pub use extract::{extract_record, output_path, CancelFlag};
pub use index::{
    Directory, DirectoryFile, FullDirectoryIndex, Index, IndexLocator, IndexRecord, LegacyIndex,
    ModernEntry, ModernIndex,
};
pub use reader::{ExtractionFailure, ExtractionSummary, PakEntry, PakReader};
pub use record::{CompressionBlock, DataRecord, Record};
pub use trailer::{
    locate_magic, trailer_size, Trailer, MAX_SUPPORTED_VERSION, MAX_TRAILER_SIZE, PAK_MAGIC,
};

/// Raw 20-byte SHA-1 as stored in trailers and records.
pub type Sha1 = [u8; 20];

/// 16-byte encryption key GUID from v7+ trailers.
pub type Guid = [u8; 16];

/// Render a hash as uppercase hex without separators.
pub fn hash_to_hex(hash: &Sha1) -> String {
    hex::encode_upper(hash)
}
