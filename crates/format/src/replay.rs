//! Header decoder for `.osr` replay files.
//!
//! A replay starts with a fixed run of fields describing the play (which map,
//! who, how well), followed by an LZMA stream of cursor frames. Only the header
//! is decoded here; the frame data is left untouched.

use exn::ResultExt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use time::UtcDateTime;
use tracing::instrument;

use crate::cursor::BinaryCursor;
use crate::error::{ErrorKind, Result};
use crate::write::BinaryWriter;

/// .NET ticks (100ns since 0001-01-01) at the Unix epoch.
const TICKS_AT_UNIX_EPOCH: u64 = 621_355_968_000_000_000;
const NANOS_PER_TICK: i128 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitCounts {
    pub count_300: u16,
    pub count_100: u16,
    pub count_50: u16,
    pub geki: u16,
    pub katu: u16,
    pub miss: u16,
}

/// Everything in a replay before the compressed frame data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayHeader {
    /// 0 standard, 1 taiko, 2 catch, 3 mania.
    pub mode: u8,
    /// Client version that wrote the replay.
    pub version: u32,
    /// MD5 of the `.osu` file that was played.
    pub beatmap_hash: String,
    pub player: String,
    pub replay_hash: String,
    pub hits: HitCounts,
    pub score: u32,
    pub max_combo: u16,
    pub perfect: bool,
    pub mods: u32,
    /// Comma separated `time|life` pairs.
    pub life_bar: String,
    /// .NET ticks.
    pub timestamp: u64,
    /// Length in bytes of the compressed frame data that follows.
    pub replay_length: u32,
}

impl ReplayHeader {
    pub fn read<R: Read>(cursor: &mut BinaryCursor<R>) -> Result<Self> {
        Ok(Self {
            mode: cursor.read_u8()?,
            version: cursor.read_u32()?,
            beatmap_hash: cursor.read_string()?,
            player: cursor.read_string()?,
            replay_hash: cursor.read_string()?,
            hits: HitCounts {
                count_300: cursor.read_u16()?,
                count_100: cursor.read_u16()?,
                count_50: cursor.read_u16()?,
                geki: cursor.read_u16()?,
                katu: cursor.read_u16()?,
                miss: cursor.read_u16()?,
            },
            score: cursor.read_u32()?,
            max_combo: cursor.read_u16()?,
            perfect: cursor.read_bool()?,
            mods: cursor.read_u32()?,
            life_bar: cursor.read_string()?,
            timestamp: cursor.read_u64()?,
            replay_length: cursor.read_u32()?,
        })
    }

    /// Decodes the header of the replay at `path`.
    #[instrument(level = "debug")]
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
        }
        let file = File::open(path).or_raise(|| ErrorKind::FileNotFound(path.to_path_buf()))?;
        let mut cursor = BinaryCursor::new(BufReader::new(file));
        Self::read(&mut cursor)
    }

    /// When the play finished, if the timestamp is representable.
    pub fn played_at(&self) -> Option<UtcDateTime> {
        let ticks = self.timestamp.checked_sub(TICKS_AT_UNIX_EPOCH)?;
        UtcDateTime::from_unix_timestamp_nanos(i128::from(ticks) * NANOS_PER_TICK).ok()
    }

    /// Writes the header. No frame data follows; `replay_length` is written as-is.
    pub fn write_to(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.mode);
        writer.write_u32(self.version);
        writer.write_string(&self.beatmap_hash);
        writer.write_string(&self.player);
        writer.write_string(&self.replay_hash);
        for count in [
            self.hits.count_300,
            self.hits.count_100,
            self.hits.count_50,
            self.hits.geki,
            self.hits.katu,
            self.hits.miss,
        ] {
            writer.write_u16(count);
        }
        writer.write_u32(self.score);
        writer.write_u16(self.max_combo);
        writer.write_bool(self.perfect);
        writer.write_u32(self.mods);
        writer.write_string(&self.life_bar);
        writer.write_u64(self.timestamp);
        writer.write_u32(self.replay_length);
    }

    /// A minimal replay of `beatmap_hash`, for fixtures.
    pub fn for_beatmap(beatmap_hash: impl Into<String>) -> Self {
        Self {
            mode: 0,
            version: 20_240_101,
            beatmap_hash: beatmap_hash.into(),
            player: "peppy".to_string(),
            replay_hash: String::new(),
            hits: HitCounts::default(),
            score: 0,
            max_combo: 0,
            perfect: false,
            mods: 0,
            life_bar: String::new(),
            timestamp: TICKS_AT_UNIX_EPOCH,
            replay_length: 0,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}
