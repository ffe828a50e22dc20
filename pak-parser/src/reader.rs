//! Archive session: open, locate the trailer, decode the index, extract.

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::decompress::CodecRegistry;
use crate::extract::{extract_record, extract_to_path, CancelFlag};
use crate::index::Index;
use crate::ioutils::stream_len;
use crate::record::DataRecord;
use crate::trailer::{locate_magic, Trailer};
use crate::{Error, Result};

/// One listed file: the logical path with the mount point applied, and
/// the resolved payload record.
#[derive(Debug, Clone)]
pub struct PakEntry {
    /// Forward-slash logical path (mount point + directory + file name).
    pub path: String,
    pub data: DataRecord,
}

/// A failed per-file extraction, reported without aborting the walk.
#[derive(Debug)]
pub struct ExtractionFailure {
    pub path: String,
    pub error: Error,
}

/// Outcome of [`PakReader::extract_all`].
#[derive(Debug, Default)]
pub struct ExtractionSummary {
    pub extracted: usize,
    pub failures: Vec<ExtractionFailure>,
}

/// Read session over one archive.
///
/// Opening decodes the trailer and the whole index; everything after that
/// is read-only apart from the archive cursor, so distinct files can be
/// extracted by parallel callers holding independent sessions over the
/// same archive.
pub struct PakReader<R: Read + Seek> {
    source: R,
    length: u64,
    trailer: Trailer,
    index: Index,
    entries: Vec<PakEntry>,
    codecs: CodecRegistry,
}

impl PakReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> PakReader<R> {
    /// Decode the trailer and index of `source`.
    pub fn new(mut source: R) -> Result<Self> {
        let length = stream_len(&mut source)?;
        let (magic_offset, version) = locate_magic(&mut source)?;
        debug!("opening archive: {length} bytes, magic at {magic_offset:#x}");
        let trailer = Trailer::parse(&mut source, version)?;
        let index = Index::parse(&mut source, &trailer)?;
        let entries = list_entries(&index);
        debug!("index decoded: {} entries", entries.len());
        Ok(Self {
            source,
            length,
            trailer,
            index,
            entries,
            codecs: CodecRegistry::new(),
        })
    }

    pub fn version(&self) -> u32 {
        self.trailer.version
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn mount_point(&self) -> &str {
        self.index.mount_point()
    }

    pub fn entries(&self) -> &[PakEntry] {
        &self.entries
    }

    /// Registry used to resolve compression methods; register a
    /// host-provided codec here before extracting.
    pub fn codecs_mut(&mut self) -> &mut CodecRegistry {
        &mut self.codecs
    }

    /// Stream the payload of `entries()[index]` into `sink`.
    pub fn extract_entry<W: Write>(
        &mut self,
        index: usize,
        sink: &mut W,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let entry = &self.entries[index];
        extract_record(
            &mut self.source,
            &entry.path,
            &entry.data,
            &self.trailer.compression_methods,
            &self.codecs,
            sink,
            cancel,
        )
    }

    /// Extract `entries()[index]` to its normalized path under `root`.
    pub fn extract_to(
        &mut self,
        index: usize,
        root: &Path,
        cancel: &CancelFlag,
    ) -> Result<PathBuf> {
        let entry = &self.entries[index];
        extract_to_path(
            &mut self.source,
            &entry.path,
            &entry.data,
            &self.trailer.compression_methods,
            &self.codecs,
            root,
            cancel,
        )
    }

    /// Extract every listed file under `root`. Per-file failures are
    /// collected and the walk continues; cancellation stops it.
    pub fn extract_all(&mut self, root: &Path, cancel: &CancelFlag) -> Result<ExtractionSummary> {
        let mut summary = ExtractionSummary::default();
        for index in 0..self.entries.len() {
            match self.extract_to(index, root, cancel) {
                Ok(_) => summary.extracted += 1,
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(error) => {
                    let path = self.entries[index].path.clone();
                    warn!("failed to extract {path}: {error}");
                    summary.failures.push(ExtractionFailure { path, error });
                }
            }
        }
        Ok(summary)
    }
}

/// Flatten the index into logical paths: mount point + file name for the
/// legacy layout, mount point + directory + file name for the modern one.
fn list_entries(index: &Index) -> Vec<PakEntry> {
    match index {
        Index::Legacy(legacy) => legacy
            .records
            .iter()
            .map(|r| PakEntry {
                path: format!("{}{}", legacy.mount_point, r.file_name),
                data: r.data.clone(),
            })
            .collect(),
        Index::Modern(modern) => modern
            .entries
            .iter()
            .map(|e| PakEntry {
                path: format!("{}{}{}", modern.mount_point, e.directory, e.file_name),
                data: e.data.clone(),
            })
            .collect(),
    }
}
