use std::io;
use thiserror::Error;

/// Result type for BBF operations
pub type Result<T> = std::result::Result<T, BbfError>;

/// Unified error type for all BBF operations
#[derive(Debug, Error)]
pub enum BbfError {
    // Format errors
    #[error("Invalid magic number in archive header")]
    InvalidHeaderMagic,

    #[error("Invalid magic number in archive footer")]
    InvalidFooterMagic,

    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    // Table lookups
    #[error("String offset {offset} out of bounds (pool is {pool_len} bytes)")]
    InvalidStringOffset { offset: u32, pool_len: usize },

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    // Integrity
    #[error("Hash mismatch in asset {index}: expected {expected:016x}, got {actual:016x}")]
    IntegrityMismatch {
        index: usize,
        expected: u64,
        actual: u64,
    },

    // Build-time validation
    #[error("Validation failed: {0}")]
    Validation(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Configuration errors
    #[error("Invalid build plan: {0}")]
    Config(String),
}

impl BbfError {
    /// Whether this error means the archive bytes themselves are malformed
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            BbfError::InvalidHeaderMagic | BbfError::InvalidFooterMagic | BbfError::InvalidFormat(_)
        )
    }
}

impl From<toml::de::Error> for BbfError {
    fn from(err: toml::de::Error) -> Self {
        BbfError::Config(err.to_string())
    }
}
