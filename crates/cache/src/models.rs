use exn::ResultExt;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::error::{Error, ErrorKind, Result};

/// Snapshot of the catalog an index was built from.
///
/// Compared against the live catalog to decide whether the index is stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexMeta {
    pub record_count: u32,
    /// Catalog modification time, in (fractional) seconds since the Unix epoch.
    pub catalog_modified: f64,
}

impl IndexMeta {
    /// Reads the record count and modification time of the catalog at `path`.
    pub fn of_catalog(path: &Path) -> Result<Self> {
        let record_count = osurec_format::read_record_count(path).or_raise(|| ErrorKind::Catalog)?;
        Ok(Self { record_count, catalog_modified: modified_seconds(path)? })
    }
}

/// Modification time of `path` as seconds since the Unix epoch.
pub(crate) fn modified_seconds(path: &Path) -> Result<f64> {
    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .or_raise(|| ErrorKind::CatalogNotFound(path.to_path_buf()))?;
    let seconds = match modified.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    };
    Ok(seconds)
}

#[derive(sqlx::FromRow)]
pub(crate) struct MetaRow {
    record_count: i64,
    catalog_modified: f64,
}

impl TryFrom<MetaRow> for IndexMeta {
    type Error = Error;
    fn try_from(row: MetaRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            record_count: u32::try_from(row.record_count).or_raise(|| ErrorKind::InvalidData("record count"))?,
            catalog_modified: row.catalog_modified,
        })
    }
}
