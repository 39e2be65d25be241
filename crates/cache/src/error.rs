//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// The osu! installation directory does not exist.
    #[display("osu! directory not found: {}", _0.display())]
    RootNotFound(#[error(not(source))] PathBuf),
    /// The `osu!.db` catalog does not exist.
    #[display("catalog not found: {}", _0.display())]
    CatalogNotFound(#[error(not(source))] PathBuf),
    /// The catalog couldn't be decoded; nothing was written.
    #[display("failed to read catalog")]
    Catalog,
    /// A write was attempted from a thread or task other than the one that
    /// opened the index. This is a bug in the caller.
    #[display("index written from outside its owning context")]
    CrossContextWrite,
    /// Serialization/deserialization error.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Nothing in the index is retried automatically; a failed build stays
        // failed until the caller decides otherwise.
        false
    }
}
