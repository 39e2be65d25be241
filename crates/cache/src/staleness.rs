//! Decides what to do with an existing index given the live catalog.

use crate::models::IndexMeta;

/// How the live catalog differs from the snapshot the index was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    /// Same record count, same modification time.
    None,
    /// The catalog file was rewritten. Whatever the record count says, the
    /// index is left as-is and the condition is only reported.
    Modified,
    /// The record count changed while the modification time did not: rebuild.
    CountChanged,
}

impl Drift {
    /// Compares a stored snapshot against the live one.
    ///
    /// | count | modified | result |
    /// |-------|----------|--------|
    /// | same  | same     | [`None`](Self::None) |
    /// | same  | changed  | [`Modified`](Self::Modified) |
    /// | changed | same   | [`CountChanged`](Self::CountChanged) |
    /// | changed | changed | [`Modified`](Self::Modified) |
    ///
    /// Modification times are compared bit for bit, exactly as stored.
    pub fn assess(stored: &IndexMeta, live: &IndexMeta) -> Self {
        if stored.catalog_modified.to_bits() != live.catalog_modified.to_bits() {
            Self::Modified
        } else if stored.record_count != live.record_count {
            Self::CountChanged
        } else {
            Self::None
        }
    }

    /// Only a count change (with an untouched file) triggers a write.
    pub fn requires_rebuild(self) -> bool {
        matches!(self, Self::CountChanged)
    }
}
