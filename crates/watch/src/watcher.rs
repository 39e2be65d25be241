//! Filesystem watching with `notify`.

use exn::ResultExt;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;

use crate::correlator::Correlator;
use crate::decode::{MapDecoder, ResultDecoder};
use crate::error::{ErrorKind, Result};

/// A running watch over one directory.
///
/// Dropping the handle stops the watch too, but only [`stop`](Self::stop)
/// waits for results already being handled.
#[derive(Debug)]
pub struct WatchHandle {
    dir: PathBuf,
    watcher: RecommendedWatcher,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stops watching, then waits for results already being handled (including
    /// any still in their settle delay) to be delivered or dropped. No new
    /// events are picked up once this is called.
    pub async fn stop(self) {
        let Self { dir, watcher, shutdown, task } = self;
        drop(watcher);
        let _ = shutdown.send(());
        if let Err(error) = task.await {
            tracing::warn!(?error, "watch loop ended abnormally");
        }
        tracing::info!(dir = %dir.display(), "stopped watching for results");
    }
}

impl<D: ResultDecoder, B: MapDecoder> Correlator<D, B> {
    /// Watches `dir` (not its subdirectories) for new result files and
    /// [`handle`](Self::handle)s each on its own task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch(&self, dir: impl AsRef<Path>) -> Result<WatchHandle> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            exn::bail!(ErrorKind::ReplayDirNotFound(dir));
        }

        let (events, mut created) = mpsc::unbounded_channel::<PathBuf>();
        let callback_span = self.inner.span.clone();
        let mut watcher = recommended_watcher(move |event: notify::Result<Event>| match event {
            Ok(Event { kind: EventKind::Create(_), paths, .. }) => {
                for path in paths {
                    // Closed only once the loop has stopped.
                    let _ = events.send(path);
                }
            },
            Ok(_) => {},
            Err(error) => tracing::warn!(parent: &callback_span, ?error, "filesystem watcher error"),
        })
        .or_raise(|| ErrorKind::Watch)?;
        watcher.watch(&dir, RecursiveMode::NonRecursive).or_raise(|| ErrorKind::Watch)?;

        let (shutdown, mut stopped) = oneshot::channel::<()>();
        let correlator = self.clone();
        let span = tracing::info_span!(parent: &self.inner.span, "watch", dir = %dir.display());
        let task = tokio::spawn(
            async move {
                let mut handlers = JoinSet::new();
                loop {
                    tokio::select! {
                        biased;
                        _ = &mut stopped => break,
                        Some(joined) = handlers.join_next(), if !handlers.is_empty() => reap(joined),
                        path = created.recv() => {
                            let Some(path) = path else { break };
                            if !correlator.matches(&path) {
                                tracing::trace!(path = %path.display(), "ignoring non-result file");
                                continue;
                            }
                            let correlator = correlator.clone();
                            handlers.spawn(async move {
                                correlator.handle(path).await;
                            });
                        },
                    }
                }
                if !handlers.is_empty() {
                    tracing::debug!(in_flight = handlers.len(), "waiting for results in flight");
                }
                while let Some(joined) = handlers.join_next().await {
                    reap(joined);
                }
            }
            .instrument(span),
        );

        tracing::info!(dir = %dir.display(), "watching for results");
        Ok(WatchHandle { dir, watcher, shutdown, task })
    }
}

fn reap(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(error) = joined {
        tracing::error!(?error, "result handler failed");
    }
}
