//! Resolve new osu! replays to the beatmaps they were played on.
//!
//! A [`Correlator`] watches a directory for result files. Each new one is
//! given a moment to finish writing, decoded, and its map hash looked up in
//! the [`MapIndex`](osurec_cache::MapIndex). The consumer then receives the
//! result together with the decoded map, or with `None` when the index has
//! never heard of the hash. A hash the index knows but whose file has since
//! been deleted is logged and dropped without reaching the consumer.
//!
//! [`Recorder`] wires all of that up for a real installation.

mod correlator;
mod decode;
pub mod error;
mod recorder;
mod watcher;

pub use crate::correlator::{Consumer, Correlator, CorrelatorOptions, Outcome};
pub use crate::decode::{BeatmapDecoder, MapDecoder, ReplayDecoder, ResultDecoder, ResultRecord};
pub use crate::recorder::Recorder;
pub use crate::watcher::WatchHandle;
