//! Everything needed to watch an osu! installation, wired from [`Config`].

use exn::ResultExt;
use osurec_cache::{Database, MapIndex};
use osurec_config::Config;
use osurec_format::{Beatmap, ReplayHeader};
use tracing::Span;

use crate::correlator::{Correlator, CorrelatorOptions};
use crate::decode::{BeatmapDecoder, ReplayDecoder};
use crate::error::{ErrorKind, Result};
use crate::watcher::WatchHandle;

/// Watches an installation's replay directory and hands each new replay,
/// with its beatmap, to a consumer.
#[derive(Debug)]
pub struct Recorder {
    correlator: Correlator<ReplayDecoder, BeatmapDecoder>,
    replays: std::path::PathBuf,
    handle: Option<WatchHandle>,
}

impl Recorder {
    /// Checks the installation layout and opens (building if needed) the map
    /// index. Doesn't start watching.
    pub async fn open(
        db: &Database,
        config: &Config,
        consumer: impl Fn(Option<Beatmap>, ReplayHeader) + Send + Sync + 'static,
        span: Span,
    ) -> Result<Self> {
        let root = config.osu_root().or_raise(|| ErrorKind::Config)?;
        if !root.is_dir() {
            exn::bail!(ErrorKind::RootNotFound(root.to_path_buf()));
        }
        let replays = config.replay_dir().or_raise(|| ErrorKind::Config)?;
        if !replays.is_dir() {
            exn::bail!(ErrorKind::ReplayDirNotFound(replays));
        }
        let catalog = config.catalog_path().or_raise(|| ErrorKind::Config)?;
        let index = MapIndex::open(db, root, catalog, span.clone()).await.or_raise(|| ErrorKind::Index)?;

        let options = CorrelatorOptions {
            settle_delay: config.settle_delay(),
            result_suffix: config.result_suffix.clone(),
            span,
        };
        let correlator = Correlator::new(index, ReplayDecoder, BeatmapDecoder, consumer, options);
        Ok(Self { correlator, replays, handle: None })
    }

    pub fn index(&self) -> &MapIndex {
        self.correlator.index()
    }

    pub fn correlator(&self) -> &Correlator<ReplayDecoder, BeatmapDecoder> {
        &self.correlator
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Starts watching. Does nothing if already started.
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            tracing::info!("replay monitoring already started");
            return Ok(());
        }
        self.handle = Some(self.correlator.watch(&self.replays)?);
        Ok(())
    }

    /// Stops watching and waits for results in flight. Does nothing if not
    /// started.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osurec_cache::{CATALOG_FILE_NAME, SONGS_DIR_NAME};
    use osurec_format::CatalogWriter;
    use std::path::{Path, PathBuf};

    fn install(dir: &Path) -> PathBuf {
        let root = dir.join("osu!");
        std::fs::create_dir_all(root.join(SONGS_DIR_NAME)).unwrap();
        std::fs::create_dir_all(root.join("Data").join("r")).unwrap();
        CatalogWriter::new("peppy").write_to_path(root.join(CATALOG_FILE_NAME)).unwrap();
        root
    }

    fn config(root: PathBuf) -> Config {
        Config { osu_root: Some(root), ..Config::default() }
    }

    #[tokio::test]
    async fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        let root = dir.path().join("nope");
        let error = Recorder::open(&db, &config(root.clone()), |_, _| {}, Span::none()).await.unwrap_err();
        assert_eq!(*error, ErrorKind::RootNotFound(root));
    }

    #[tokio::test]
    async fn test_missing_replay_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = install(dir.path());
        std::fs::remove_dir(root.join("Data").join("r")).unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        let error = Recorder::open(&db, &config(root.clone()), |_, _| {}, Span::none()).await.unwrap_err();
        assert_eq!(*error, ErrorKind::ReplayDirNotFound(root.join("Data").join("r")));
    }

    #[tokio::test]
    async fn test_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let root = install(dir.path());
        std::fs::remove_file(root.join(CATALOG_FILE_NAME)).unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        let error = Recorder::open(&db, &config(root), |_, _| {}, Span::none()).await.unwrap_err();
        assert_eq!(*error, ErrorKind::Index);
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = install(dir.path());
        let db = Database::connect_in_memory().await.unwrap();
        let mut recorder = Recorder::open(&db, &config(root), |_, _| {}, Span::none()).await.unwrap();
        assert!(!recorder.is_running());
        recorder.start().unwrap();
        recorder.start().unwrap();
        assert!(recorder.is_running());
        recorder.stop().await;
        recorder.stop().await;
        assert!(!recorder.is_running());
        // Can be restarted.
        recorder.start().unwrap();
        recorder.stop().await;
    }
}
