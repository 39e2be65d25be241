//! Format Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A decoding error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for decoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The catalog file does not exist (or isn't a file).
    #[display("catalog not found: {}", _0.display())]
    CatalogNotFound(#[error(not(source))] PathBuf),
    /// A file handed to a decoder does not exist.
    #[display("file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    /// The bytes are structurally wrong for the format being decoded. The
    /// whole read must be discarded.
    #[display("malformed data: {_0}")]
    MalformedCatalog(#[error(not(source))] String),
    /// The stream ended in the middle of a field.
    #[display("unexpected end of stream")]
    UnexpectedEof,
    /// A length-prefixed string did not contain valid UTF-8.
    #[display("string is not valid UTF-8")]
    InvalidString,
    /// Any other I/O failure while reading.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The bytes on disk either decode or they don't.
        false
    }
}
