//! Collaborators that turn files into values the consumer receives.

use exn::ResultExt;
use osurec_format::error::ErrorKind as FormatErrorKind;
use osurec_format::{Beatmap, ReplayHeader};
use std::path::Path;

use crate::error::{ErrorKind, Result};

/// A decoded result artifact. Only the referenced map hash matters here.
pub trait ResultRecord {
    /// Content hash of the map the result was played on.
    fn map_hash(&self) -> &str;
}

/// Decodes a result artifact. Fails with [`ErrorKind::ResultDecode`].
pub trait ResultDecoder: Send + Sync + 'static {
    type Record: ResultRecord + Send + 'static;
    fn decode(&self, path: &Path) -> Result<Self::Record>;
}

/// Decodes the map file a result resolved to.
///
/// Must fail with [`ErrorKind::MapNotFound`] when there is no file at `path`;
/// other failures use [`ErrorKind::MapDecode`].
pub trait MapDecoder: Send + Sync + 'static {
    type Map: Send + 'static;
    fn decode(&self, path: &Path) -> Result<Self::Map>;
}

impl ResultRecord for ReplayHeader {
    fn map_hash(&self) -> &str {
        &self.beatmap_hash
    }
}

/// Reads `.osr` replay headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayDecoder;

impl ResultDecoder for ReplayDecoder {
    type Record = ReplayHeader;

    fn decode(&self, path: &Path) -> Result<ReplayHeader> {
        ReplayHeader::from_path(path).or_raise(|| ErrorKind::ResultDecode)
    }
}

/// Reads `.osu` beatmap metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeatmapDecoder;

impl MapDecoder for BeatmapDecoder {
    type Map = Beatmap;

    fn decode(&self, path: &Path) -> Result<Beatmap> {
        match Beatmap::from_path(path) {
            Ok(beatmap) => Ok(beatmap),
            Err(error) if matches!(*error, FormatErrorKind::FileNotFound(_)) => {
                Err(error).or_raise(|| ErrorKind::MapNotFound(path.to_path_buf()))
            },
            Err(error) => Err(error).or_raise(|| ErrorKind::MapDecode),
        }
    }
}
