//! Byte-exact readers for the osu! client's file formats.
//!
//! - [`catalog`]: the `osu!.db` beatmap catalog, decoded into a lazy sequence
//!   of [`MapRecord`]s (content hash, folder, file name).
//! - [`ReplayHeader`]: the header of an `.osr` replay, which names the map it
//!   was played on by content hash.
//! - [`Beatmap`]: identity metadata of a `.osu` file.
//!
//! All three are built on [`BinaryCursor`] (or plain text, for `.osu`). The
//! layouts are dictated by the game client and reproduced field for field.
//! [`BinaryWriter`] and [`CatalogWriter`] produce the same layouts for fixtures.

mod beatmap;
pub mod catalog;
mod cursor;
pub mod error;
mod models;
mod replay;
mod write;

pub use crate::beatmap::Beatmap;
pub use crate::catalog::{CatalogWriter, MapRecords, read_map_index, read_record_count};
pub use crate::cursor::BinaryCursor;
pub use crate::models::{CatalogHeader, MapRecord};
pub use crate::replay::{HitCounts, ReplayHeader};
pub use crate::write::BinaryWriter;
