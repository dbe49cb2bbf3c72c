//! Error types for hybridtree operations.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, HybridError>;

/// Errors produced while building, persisting, or serving a hybrid tree.
#[derive(Debug, Error)]
pub enum HybridError {
    /// Underlying IO failure while reading or writing an index file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An index file ended before a complete record could be read.
    #[error("unexpected end of index file")]
    UnexpectedEof,

    /// An index file contains data that does not match the expected layout.
    #[error("invalid index file format: {0}")]
    InvalidFormat(String),

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An index file was written under a different build configuration.
    ///
    /// Degree, dimensionality, and Hilbert order are baked into the tree
    /// layout; a file built under different values cannot be reused.
    #[error("index file configuration mismatch: {0}")]
    ConfigMismatch(String),
}
