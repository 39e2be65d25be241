//! Content hash → beatmap path index, kept in step with `osu!.db`.

use exn::ResultExt;
use osurec_format::MapRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Instrument, Span, instrument};

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{IndexMeta, modified_seconds};
use crate::owner::OwnerToken;
use crate::repo::Repository;
use crate::staleness::Drift;

/// File name of the catalog inside the osu! directory.
pub const CATALOG_FILE_NAME: &str = "osu!.db";
/// Directory (inside the osu! directory) that stored paths are relative to.
pub const SONGS_DIR_NAME: &str = "Songs";

/// What [`MapIndex::reconcile`] (or [`MapIndex::rebuild`]) did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The store was empty and has been built from the catalog.
    Built { maps: u64 },
    /// The index matches the catalog.
    Fresh,
    /// The record count changed and the index was rebuilt. `added` is the
    /// difference in record count, negative if maps were removed.
    Rebuilt { added: i64 },
    /// The catalog was rewritten since the last build. Nothing was written;
    /// maps added since then won't resolve until an explicit rebuild.
    Modified,
}

/// Persistent index from beatmap content hash to `.osu` file path.
///
/// # Ownership
///
/// The context (thread, or Tokio task) that calls [`open`](Self::open) owns
/// the index. Only the owner may write to it: the initial build, drift
/// rebuilds and explicit [`rebuild`](Self::rebuild)s all fail with
/// [`ErrorKind::CrossContextWrite`] anywhere else, before touching the store.
/// Lookups are allowed from anywhere, and clones share the same owner.
#[derive(Debug, Clone)]
pub struct MapIndex {
    repo: Repository,
    root: Arc<PathBuf>,
    catalog: Arc<PathBuf>,
    owner: OwnerToken,
    span: Span,
}

impl MapIndex {
    /// Opens the index for the osu! installation at `root`, reading maps from
    /// the catalog at `catalog` (usually `root/osu!.db`), and reconciles it.
    ///
    /// Events are recorded under `span`.
    pub async fn open(db: &Database, root: impl AsRef<Path>, catalog: impl AsRef<Path>, span: Span) -> Result<Self> {
        let index = Self::attach(db, root, catalog, span)?;
        index.reconcile().await?;
        Ok(index)
    }

    /// Like [`open`](Self::open), without reconciling. Whatever is stored is
    /// served as-is until [`reconcile`](Self::reconcile) or
    /// [`rebuild`](Self::rebuild) is called.
    pub fn attach(db: &Database, root: impl AsRef<Path>, catalog: impl AsRef<Path>, span: Span) -> Result<Self> {
        let root = root.as_ref();
        let catalog = catalog.as_ref();
        if !root.is_dir() {
            exn::bail!(ErrorKind::RootNotFound(root.to_path_buf()));
        }
        if !catalog.is_file() {
            exn::bail!(ErrorKind::CatalogNotFound(catalog.to_path_buf()));
        }
        Ok(Self {
            repo: Repository::from(db),
            root: Arc::new(root.to_path_buf()),
            catalog: Arc::new(catalog.to_path_buf()),
            owner: OwnerToken::current(),
            span,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog(&self) -> &Path {
        &self.catalog
    }

    /// Directory that stored relative paths are resolved against.
    pub fn songs_dir(&self) -> PathBuf {
        self.root.join(SONGS_DIR_NAME)
    }

    /// Number of maps in the index.
    pub async fn len(&self) -> Result<u64> {
        self.repo.count().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Snapshot of the catalog the current entries were built from, if any.
    pub async fn meta(&self) -> Result<Option<IndexMeta>> {
        self.repo.get_meta().await
    }

    /// Brings the index in line with the catalog, according to [`Drift`].
    ///
    /// - Nothing stored yet: full build.
    /// - Unchanged: no-op.
    /// - Record count changed, file untouched: full rebuild.
    /// - File rewritten (whatever the count): reported, nothing written.
    pub async fn reconcile(&self) -> Result<Reconciliation> {
        self.reconcile_inner().instrument(self.span.clone()).await
    }

    #[instrument(level = "debug", name = "reconcile", skip(self), fields(catalog = %self.catalog.display()))]
    async fn reconcile_inner(&self) -> Result<Reconciliation> {
        let Some(stored) = self.repo.get_meta().await? else {
            tracing::info!("index is empty, building from catalog");
            let (maps, _) = self.build().await?;
            tracing::info!(maps, "index containing {maps} maps built");
            return Ok(Reconciliation::Built { maps });
        };
        let live = IndexMeta::of_catalog(&self.catalog)?;
        match Drift::assess(&stored, &live) {
            Drift::None => {
                tracing::debug!(records = live.record_count, "index is up to date");
                Ok(Reconciliation::Fresh)
            },
            Drift::Modified => {
                tracing::info!(
                    stored = stored.record_count,
                    live = live.record_count,
                    "osu!.db was modified; maps added or changed since the last build won't be found until the index is rebuilt"
                );
                Ok(Reconciliation::Modified)
            },
            Drift::CountChanged => {
                let (_, rebuilt) = self.build().await?;
                let added = i64::from(rebuilt.record_count) - i64::from(stored.record_count);
                tracing::info!(added, "added {added} new maps");
                Ok(Reconciliation::Rebuilt { added })
            },
        }
    }

    /// Drops every entry and rebuilds from the catalog, whatever the drift.
    pub async fn rebuild(&self) -> Result<Reconciliation> {
        self.ensure_owner()?;
        async {
            let previous = self.repo.get_meta().await?;
            let (maps, rebuilt) = self.build().await?;
            Ok(match previous {
                Some(previous) => {
                    let added = i64::from(rebuilt.record_count) - i64::from(previous.record_count);
                    tracing::info!(added, maps, "index rebuilt");
                    Reconciliation::Rebuilt { added }
                },
                None => Reconciliation::Built { maps },
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Absolute path of the `.osu` file with the given content hash.
    ///
    /// The file itself is not checked for existence.
    pub async fn lookup(&self, hash: impl AsRef<str>) -> Result<Option<PathBuf>> {
        let relative = self.repo.get_path(hash).await?;
        Ok(relative.map(|relative| self.resolve(&relative)))
    }

    /// Stored paths always use `/`. A blank folder name leaves a leading one,
    /// which must not make the result absolute.
    fn resolve(&self, relative: &str) -> PathBuf {
        let mut path = self.songs_dir();
        path.extend(relative.split('/').filter(|part| !part.is_empty()));
        path
    }

    fn ensure_owner(&self) -> Result<()> {
        if !self.owner.is_current() {
            tracing::error!(owner = ?self.owner, current = ?OwnerToken::current(), "refusing index write from another context");
            exn::bail!(ErrorKind::CrossContextWrite);
        }
        Ok(())
    }

    /// Decodes the whole catalog, then swaps it in. Returns the number of
    /// distinct hashes stored and the snapshot recorded alongside them.
    async fn build(&self) -> Result<(u64, IndexMeta)> {
        self.ensure_owner()?;
        let catalog = Arc::clone(&self.catalog);
        let (meta, records) = tokio::task::spawn_blocking(move || decode_catalog(&catalog))
            .await
            .or_raise(|| ErrorKind::Catalog)??;
        let maps = self.repo.replace_all(&records, meta).await?;
        Ok((maps, meta))
    }
}

/// Reads the catalog in full. Any decode error fails the whole read.
fn decode_catalog(path: &Path) -> Result<(IndexMeta, Vec<MapRecord>)> {
    let catalog_modified = modified_seconds(path)?;
    let mut records = osurec_format::read_map_index(path).or_raise(|| ErrorKind::Catalog)?;
    let record_count = records.header().record_count;
    let decoded = records.by_ref().collect::<osurec_format::error::Result<Vec<_>>>().or_raise(|| ErrorKind::Catalog)?;
    Ok((IndexMeta { record_count, catalog_modified }, decoded))
}
