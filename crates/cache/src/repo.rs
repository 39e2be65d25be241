//! SQL access to the `maps` and `meta` tables.
//!
//! Nothing here knows about ownership; [`MapIndex`](crate::MapIndex) is the
//! only caller of the write half and guards it.

use exn::ResultExt;
use osurec_format::MapRecord;
use sqlx::SqlitePool;

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{IndexMeta, MetaRow};

#[derive(Debug, Clone)]
pub(crate) struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    // =========================================================================
    // Read
    // =========================================================================

    /// Number of indexed maps.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_maps.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("map count"))
    }

    /// Path (relative to `Songs/`) stored for a content hash.
    pub async fn get_path(&self, hash: impl AsRef<str>) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>(include_str!("../queries/get_path_by_hash.sql"))
            .bind(hash.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    pub async fn get_meta(&self) -> Result<Option<IndexMeta>> {
        let row: Option<MetaRow> = sqlx::query_as(include_str!("../queries/get_meta.sql"))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(IndexMeta::try_from).transpose()
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Replaces every entry and the meta row in a single transaction.
    ///
    /// Readers see either the old set or the new one. Duplicate hashes keep
    /// the last record. Returns the number of distinct hashes stored.
    pub async fn replace_all(&self, records: &[MapRecord], meta: IndexMeta) -> Result<u64> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/clear_maps.sql"))
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        for record in records {
            sqlx::query(include_str!("../queries/upsert_map.sql"))
                .bind(record.hash.as_str())
                .bind(record.relative_path())
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        sqlx::query(include_str!("../queries/upsert_meta.sql"))
            .bind(i64::from(meta.record_count))
            .bind(meta.catalog_modified)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let stored: i64 = sqlx::query_scalar(include_str!("../queries/count_maps.sql"))
            .fetch_one(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        u64::try_from(stored).or_raise(|| ErrorKind::InvalidData("map count"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, folder: &str, file: &str) -> MapRecord {
        MapRecord { hash: hash.to_string(), folder_name: folder.to_string(), file_name: file.to_string() }
    }

    fn meta(record_count: u32) -> IndexMeta {
        IndexMeta { record_count, catalog_modified: 1_700_000_000.5 }
    }

    #[tokio::test]
    async fn test_empty() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.get_meta().await.unwrap(), None);
        assert_eq!(repo.get_path("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replace_all() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let stored = repo
            .replace_all(&[record("aaa", " 1 A ", "a.osu"), record("bbb", "2 B", " b.osu ")], meta(2))
            .await
            .unwrap();
        assert_eq!(stored, 2);
        assert_eq!(repo.get_path("aaa").await.unwrap().as_deref(), Some("1 A/a.osu"));
        assert_eq!(repo.get_path("bbb").await.unwrap().as_deref(), Some("2 B/b.osu"));
        assert_eq!(repo.get_meta().await.unwrap(), Some(meta(2)));

        // A second pass drops entries that are no longer in the catalog.
        let stored = repo.replace_all(&[record("ccc", "3 C", "c.osu")], meta(1)).await.unwrap();
        assert_eq!(stored, 1);
        assert_eq!(repo.get_path("aaa").await.unwrap(), None);
        assert_eq!(repo.get_meta().await.unwrap(), Some(meta(1)));
    }

    #[tokio::test]
    async fn test_duplicate_hash_last_write_wins() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let stored = repo
            .replace_all(&[record("aaa", "old", "a.osu"), record("aaa", "new", "a.osu")], meta(2))
            .await
            .unwrap();
        assert_eq!(stored, 1);
        assert_eq!(repo.get_path("aaa").await.unwrap().as_deref(), Some("new/a.osu"));
    }

    #[tokio::test]
    async fn test_modified_time_round_trips_exactly() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let precise = IndexMeta { record_count: 7, catalog_modified: 1_712_345_678.987_654_3 };
        repo.replace_all(&[], precise).await.unwrap();
        let stored = repo.get_meta().await.unwrap().unwrap();
        assert_eq!(stored.catalog_modified.to_bits(), precise.catalog_modified.to_bits());
    }
}
