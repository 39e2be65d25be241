//! Persistent beatmap index for resolving replays.
//!
//! Replays name the map they were played on by the MD5 of its `.osu` file.
//! Finding that file means decoding `osu!.db`, which is slow enough (tens of
//! megabytes, no random access) that it's done once and the result stored in
//! SQLite: one table mapping content hash to the path under `Songs/`, one row
//! remembering the record count and modification time of the catalog it came
//! from.
//!
//! The store is a cache, not a source of truth. Deleting it just means the next
//! [`MapIndex::open`] rebuilds it from the catalog.

mod db;
pub mod error;
mod index;
mod models;
mod owner;
mod repo;
mod staleness;

pub use crate::db::Database;
pub use crate::index::{CATALOG_FILE_NAME, MapIndex, Reconciliation, SONGS_DIR_NAME};
pub use crate::models::IndexMeta;
pub use crate::owner::OwnerToken;
pub use crate::staleness::Drift;
