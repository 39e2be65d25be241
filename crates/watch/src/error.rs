//! Watch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A watch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for watch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Per-replay failures (`ResultDecode`, `MapNotFound`, `MapDecode`) are logged
/// and drop that one replay; the rest stop startup.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The replay couldn't be decoded.
    #[display("failed to decode result")]
    ResultDecode,
    /// The beatmap file the index points at isn't on disk.
    #[display("map not found: {}", _0.display())]
    MapNotFound(#[error(not(source))] PathBuf),
    /// The beatmap file exists but couldn't be decoded.
    #[display("failed to decode map")]
    MapDecode,
    #[display("map index error")]
    Index,
    #[display("configuration error")]
    Config,
    #[display("osu! directory not found: {}", _0.display())]
    RootNotFound(#[error(not(source))] PathBuf),
    #[display("replay directory not found: {}", _0.display())]
    ReplayDirNotFound(#[error(not(source))] PathBuf),
    /// The filesystem watcher couldn't be created or attached.
    #[display("filesystem watcher error")]
    Watch,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Each replay gets exactly one pass.
        false
    }
}
