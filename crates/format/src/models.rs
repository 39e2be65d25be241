/// Catalog-level fields preceding the records.
///
/// Only `record_count` drives decoding; the format version is carried along but
/// never branched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogHeader {
    pub format_version: u32,
    pub folder_count: u32,
    pub account_unlocked: bool,
    /// .NET ticks; zero while the account is unlocked.
    pub unlock_date: u64,
    pub player_name: String,
    pub record_count: u32,
}

/// The part of a catalog record that survives decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapRecord {
    /// MD5 of the `.osu` file, as 32 lowercase hex characters.
    pub hash: String,
    /// Directory under `Songs/`.
    pub folder_name: String,
    /// `.osu` file name inside `folder_name`.
    pub file_name: String,
}

impl MapRecord {
    /// Path of the `.osu` file relative to the `Songs/` directory.
    ///
    /// The client pads some names with whitespace, which is trimmed from both
    /// components. Always joined with `/` regardless of platform.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.folder_name.trim(), self.file_name.trim())
    }
}
