//! Resolve a finished play to the map it was played on.

use exn::ResultExt;
use osurec_cache::MapIndex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span};

use crate::decode::{MapDecoder, ResultDecoder, ResultRecord};
use crate::error::{ErrorKind, Result};

/// Receives every resolved result, with the decoded map when there is one.
///
/// Runs on a runtime worker; it should hand work off rather than block.
pub type Consumer<M, R> = Arc<dyn Fn(Option<M>, R) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct CorrelatorOptions {
    /// Pause between noticing a result and reading it, so the writer can finish.
    pub settle_delay: Duration,
    /// Only files whose name ends with this are treated as results.
    pub result_suffix: String,
    pub span: Span,
}

impl Default for CorrelatorOptions {
    fn default() -> Self {
        Self { settle_delay: Duration::from_secs(2), result_suffix: ".osr".to_string(), span: Span::none() }
    }
}

/// What happened to one result file. The consumer was called exactly for
/// [`Resolved`](Self::Resolved) and [`Unresolved`](Self::Unresolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The map was found, decoded and delivered.
    Resolved(PathBuf),
    /// The index doesn't know the hash. Delivered without a map.
    Unresolved { hash: String },
    /// The result file couldn't be decoded. Nothing delivered.
    DecodeFailed,
    /// The index couldn't be queried. Nothing delivered.
    LookupFailed,
    /// The index knows the hash but the file is gone. Nothing delivered.
    MapMissing(PathBuf),
    /// The map file exists but couldn't be decoded. Nothing delivered.
    MapDecodeFailed(PathBuf),
}

impl Outcome {
    pub fn delivered(&self) -> bool {
        matches!(self, Self::Resolved(_) | Self::Unresolved { .. })
    }
}

/// Joins result files to beatmaps through a [`MapIndex`].
///
/// Cheap to clone; clones share the decoders and the consumer.
pub struct Correlator<D: ResultDecoder, B: MapDecoder> {
    pub(crate) inner: Arc<Inner<D, B>>,
}

pub(crate) struct Inner<D: ResultDecoder, B: MapDecoder> {
    index: MapIndex,
    results: D,
    maps: B,
    consumer: Consumer<B::Map, D::Record>,
    pub(crate) settle_delay: Duration,
    pub(crate) result_suffix: String,
    pub(crate) span: Span,
}

impl<D: ResultDecoder, B: MapDecoder> Clone for Correlator<D, B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<D: ResultDecoder, B: MapDecoder> fmt::Debug for Correlator<D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correlator")
            .field("index", &self.inner.index)
            .field("settle_delay", &self.inner.settle_delay)
            .field("result_suffix", &self.inner.result_suffix)
            .finish_non_exhaustive()
    }
}

impl<D: ResultDecoder, B: MapDecoder> Correlator<D, B> {
    /// The consumer is fixed for the correlator's lifetime.
    pub fn new(
        index: MapIndex,
        results: D,
        maps: B,
        consumer: impl Fn(Option<B::Map>, D::Record) + Send + Sync + 'static,
        options: CorrelatorOptions,
    ) -> Self {
        let CorrelatorOptions { settle_delay, result_suffix, span } = options;
        Self {
            inner: Arc::new(Inner {
                index,
                results,
                maps,
                consumer: Arc::new(consumer),
                settle_delay,
                result_suffix,
                span,
            }),
        }
    }

    pub fn index(&self) -> &MapIndex {
        &self.inner.index
    }

    /// Whether `path` names a result file.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&self.inner.result_suffix))
    }

    /// Waits out the settle delay, then decodes, resolves and delivers one
    /// result file.
    ///
    /// Never fails: every failure is logged and reported in the [`Outcome`].
    pub async fn handle(&self, path: impl AsRef<Path>) -> Outcome {
        let path = path.as_ref().to_path_buf();
        let span = tracing::info_span!(parent: &self.inner.span, "correlate", path = %path.display());
        self.handle_inner(path).instrument(span).await
    }

    async fn handle_inner(&self, path: PathBuf) -> Outcome {
        tracing::debug!("processing result");
        tokio::time::sleep(self.inner.settle_delay).await;

        let record = match self.decode_result(path).await {
            Ok(record) => record,
            Err(error) => {
                tracing::error!(?error, "error opening result");
                return Outcome::DecodeFailed;
            },
        };
        let hash = record.map_hash().to_string();
        tracing::debug!(%hash, "determining beatmap");

        let map_path = match self.inner.index.lookup(&hash).await {
            Ok(Some(map_path)) => map_path,
            Ok(None) => {
                tracing::info!(%hash, "unable to resolve beatmap for result");
                (self.inner.consumer)(None, record);
                return Outcome::Unresolved { hash };
            },
            Err(error) => {
                tracing::error!(%hash, ?error, "map index lookup failed");
                return Outcome::LookupFailed;
            },
        };

        if !map_path.is_file() {
            tracing::warn!(path = %map_path.display(), "map does not exist");
            return Outcome::MapMissing(map_path);
        }
        match self.decode_map(map_path.clone()).await {
            Ok(map) => {
                tracing::info!(map = %map_path.display(), "result resolved");
                (self.inner.consumer)(Some(map), record);
                Outcome::Resolved(map_path)
            },
            // Removed between the check and the read.
            Err(error) if matches!(*error, ErrorKind::MapNotFound(_)) => {
                tracing::warn!(path = %map_path.display(), "map does not exist");
                Outcome::MapMissing(map_path)
            },
            Err(error) => {
                tracing::error!(path = %map_path.display(), ?error, "error opening map");
                Outcome::MapDecodeFailed(map_path)
            },
        }
    }

    async fn decode_result(&self, path: PathBuf) -> Result<D::Record> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.results.decode(&path))
            .await
            .or_raise(|| ErrorKind::ResultDecode)?
    }

    async fn decode_map(&self, path: PathBuf) -> Result<B::Map> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.maps.decode(&path))
            .await
            .or_raise(|| ErrorKind::MapDecode)?
    }
}
