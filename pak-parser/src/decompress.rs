//! Pluggable block decompressors.
//!
//! The extraction engine never links codec libraries for proprietary
//! formats; it resolves a method index through the trailer's name table to
//! whatever the host registered. Zlib ships built in.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::trace;

use crate::{Error, Result};

/// A block decompressor.
///
/// `decompress` must return at most `max_output` bytes; `max_output` is
/// the record's declared per-block uncompressed size.
pub trait Decompressor: Send + Sync {
    /// Lowercase codec name as it appears in the method table.
    fn name(&self) -> &'static str;

    fn decompress(&self, input: &[u8], max_output: usize) -> Result<Vec<u8>>;
}

/// Zlib inflate via flate2.
pub struct ZlibDecompressor;

impl Decompressor for ZlibDecompressor {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn decompress(&self, input: &[u8], max_output: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(max_output.min(input.len() * 4));
        let mut decoder = ZlibDecoder::new(input).take(max_output as u64);
        decoder.read_to_end(&mut out).map_err(|e| Error::CodecFailure {
            codec: "zlib".to_string(),
            reason: e.to_string(),
        })?;
        trace!("zlib: {} bytes -> {} bytes", input.len(), out.len());
        Ok(out)
    }
}

/// Name for a method index. Index 0 is reserved for "no compression" and
/// never reaches a codec. Archives older than v8 carry no name table;
/// there, index 1 is zlib and anything else is the proprietary slot.
pub fn method_name(method: u32, table: &[String]) -> String {
    if method == 0 {
        return "none".to_string();
    }
    if table.is_empty() {
        return if method == 1 { "zlib" } else { "oodle" }.to_string();
    }
    table
        .get(method as usize - 1)
        .map(|name| name.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Registry mapping lowercased method names to decompressors.
pub struct CodecRegistry {
    codecs: HashMap<&'static str, Box<dyn Decompressor>>,
}

impl CodecRegistry {
    /// A registry with the built-in zlib codec.
    pub fn new() -> Self {
        let mut registry = Self {
            codecs: HashMap::new(),
        };
        registry.register(Box::new(ZlibDecompressor));
        registry
    }

    /// Add or replace a codec, e.g. a host-provided Oodle implementation.
    pub fn register(&mut self, codec: Box<dyn Decompressor>) {
        self.codecs.insert(codec.name(), codec);
    }

    /// Resolve a non-zero method index through the trailer's name table.
    pub fn resolve(&self, method: u32, table: &[String]) -> Result<&dyn Decompressor> {
        let name = method_name(method, table);
        self.codecs
            .get(name.as_str())
            .map(AsRef::as_ref)
            .ok_or_else(|| Error::CodecFailure {
                codec: name,
                reason: format!("no decompressor registered for method index {method}"),
            })
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
