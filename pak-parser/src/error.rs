use thiserror::Error;

/// Result type for PAK operations
pub type Result<T> = std::result::Result<T, Error>;

/// PAK parsing and extraction error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive is shorter than the largest possible trailer
    #[error("Archive is {0} bytes, too small to hold a PAK trailer")]
    TooSmall(u64),

    /// No trailer magic in the scanned region
    #[error("PAK magic not found near the end of the archive")]
    MagicNotFound,

    /// Version byte outside the decodable range (1..=11)
    #[error("Unsupported PAK version: {0}")]
    UnsupportedVersion(u32),

    /// String with a bad length prefix, missing terminator, or bad bytes
    #[error("Malformed string at offset {offset:#x}: {reason}")]
    MalformedString { offset: u64, reason: String },

    /// Declared length exceeds what the archive can hold
    #[error("Malformed length for {entity} at offset {offset:#x}: {declared}")]
    MalformedLength {
        entity: &'static str,
        offset: u64,
        declared: i64,
    },

    /// Referenced offset falls outside the archive
    #[error("{entity} offset {offset:#x} is outside the archive ({len} bytes)")]
    OffsetOutOfRange {
        entity: &'static str,
        offset: u64,
        len: u64,
    },

    /// Compression blocks do not cover the declared compressed size
    #[error("Compression blocks cover {covered} bytes, record declares {declared}")]
    BlockMismatch { covered: u64, declared: u64 },

    /// Encrypted index or entry; decryption is not supported
    #[error("\"{0}\" is encrypted; decryption is not supported")]
    EncryptionUnsupported(String),

    /// A decompressor rejected its input or is not registered
    #[error("Codec \"{codec}\" failed: {reason}")]
    CodecFailure { codec: String, reason: String },

    /// Extraction was cancelled between blocks
    #[error("Extraction cancelled")]
    Cancelled,
}
