//! Streaming extraction of resolved records.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::decompress::CodecRegistry;
use crate::ioutils::stream_len;
use crate::record::DataRecord;
use crate::{Error, Result};

/// Cap on a single raw-copy chunk.
const COPY_CHUNK: usize = 1024 * 1024;

/// Cooperative cancellation handle. The extraction engine checks it
/// between blocks; a cancelled extraction returns [`Error::Cancelled`]
/// and leaves any partial output in place.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Map a logical archive path onto `root`, one segment per path
/// component. Empty, `.`, and `..` segments are dropped, so mount points
/// like `../../../Game/` cannot climb out of the output root.
pub fn output_path(root: &Path, logical: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for segment in logical.split('/') {
        match segment {
            "" | "." | ".." => continue,
            s => out.push(s),
        }
    }
    out
}

/// Stream one record's payload into `sink`.
///
/// Uncompressed records are copied in bounded chunks. Compressed records
/// go block by block through the codec the method index resolves to, with
/// the record's declared per-block uncompressed size as the output bound.
pub fn extract_record<R: Read + Seek, W: Write>(
    f: &mut R,
    entry_path: &str,
    data: &DataRecord,
    methods: &[String],
    codecs: &CodecRegistry,
    sink: &mut W,
    cancel: &CancelFlag,
) -> Result<()> {
    let record = &data.record;
    if record.encrypted {
        return Err(Error::EncryptionUnsupported(entry_path.to_string()));
    }

    if record.compression_method == 0 {
        return copy_raw(f, data, sink, cancel);
    }

    let len = stream_len(f)?;
    let codec = codecs.resolve(record.compression_method, methods)?;

    // The block table must tile the declared compressed size exactly and
    // stay inside the archive; checked before the first write so a bad
    // table never produces output.
    let mut covered: u64 = 0;
    for block in &record.compression_blocks {
        if block.start_offset < 0 || block.end_offset < block.start_offset {
            return Err(Error::OffsetOutOfRange {
                entity: "compression block",
                offset: block.start_offset as u64,
                len,
            });
        }
        if block.end_offset as u64 > len {
            return Err(Error::OffsetOutOfRange {
                entity: "compression block",
                offset: block.end_offset as u64,
                len,
            });
        }
        covered += block.size() as u64;
    }
    if covered != record.compressed_size as u64 {
        return Err(Error::BlockMismatch {
            covered,
            declared: record.compressed_size as u64,
        });
    }

    let bound = record.compression_block_uncompressed_size as usize;
    let mut scratch = Vec::new();
    for (i, block) in record.compression_blocks.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        f.seek(SeekFrom::Start(block.start_offset as u64))?;
        scratch.resize(block.size() as usize, 0);
        f.read_exact(&mut scratch)?;
        let out = codec.decompress(&scratch, bound)?;
        sink.write_all(&out)?;
        trace!(
            "{entry_path}: block {i} {} -> {} bytes",
            scratch.len(),
            out.len()
        );
    }

    Ok(())
}

fn copy_raw<R: Read + Seek, W: Write>(
    f: &mut R,
    data: &DataRecord,
    sink: &mut W,
    cancel: &CancelFlag,
) -> Result<()> {
    f.seek(SeekFrom::Start(data.data_offset))?;
    let mut remaining = data.record.compressed_size as u64;
    let mut buf = vec![0u8; COPY_CHUNK.min(remaining as usize).max(1)];
    while remaining > 0 {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let n = remaining.min(COPY_CHUNK as u64) as usize;
        f.read_exact(&mut buf[..n])?;
        sink.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Extract one record to a file under `root`, creating parent directories
/// and truncating any previous output.
pub fn extract_to_path<R: Read + Seek>(
    f: &mut R,
    entry_path: &str,
    data: &DataRecord,
    methods: &[String],
    codecs: &CodecRegistry,
    root: &Path,
    cancel: &CancelFlag,
) -> Result<PathBuf> {
    let target = output_path(root, entry_path);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(&target)?;
    extract_record(f, entry_path, data, methods, codecs, &mut file, cancel)?;
    debug!("extracted {entry_path} -> {}", target.display());
    Ok(target)
}
