//! Decoder for the `osu!.db` beatmap catalog.
//!
//! The catalog is a header followed by `record_count` records laid end to end.
//! Records have no length prefix, so the only way to reach record `n` is to
//! consume every field of records `0..n` with exactly the right width. Only the
//! content hash, folder name and `.osu` file name survive decoding; everything
//! else is read past.

use exn::ResultExt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::instrument;

use crate::cursor::BinaryCursor;
use crate::error::{ErrorKind, Result};
use crate::models::{CatalogHeader, MapRecord};
use crate::write::BinaryWriter;

/// Width of one per-mod star rating entry: flag(u8), mods(u32), flag(u8), stars(f64).
const STAR_RATING_WIDTH: u64 = 1 + 4 + 1 + 8;
/// Width of one timing point: bpm(f64), offset(f64), inherited(bool).
const TIMING_POINT_WIDTH: u64 = 8 + 8 + 1;
/// Standard, Taiko, Catch, Mania.
const STAR_RATING_TABLES: usize = 4;

impl CatalogHeader {
    pub fn read<R: Read>(cursor: &mut BinaryCursor<R>) -> Result<Self> {
        Ok(Self {
            format_version: cursor.read_u32()?,
            folder_count: cursor.read_u32()?,
            account_unlocked: cursor.read_bool()?,
            unlock_date: cursor.read_u64()?,
            player_name: cursor.read_string()?,
            record_count: cursor.read_u32()?,
        })
    }

    pub fn write_to(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.format_version);
        writer.write_u32(self.folder_count);
        writer.write_bool(self.account_unlocked);
        writer.write_u64(self.unlock_date);
        writer.write_string(&self.player_name);
        writer.write_u32(self.record_count);
    }
}

fn open(path: &Path) -> Result<BinaryCursor<BufReader<File>>> {
    if !path.is_file() {
        exn::bail!(ErrorKind::CatalogNotFound(path.to_path_buf()));
    }
    let file = File::open(path).or_raise(|| ErrorKind::CatalogNotFound(path.to_path_buf()))?;
    Ok(BinaryCursor::new(BufReader::new(file)))
}

/// Reads just enough of the catalog to return its record count.
#[instrument(level = "debug")]
pub fn read_record_count(path: &Path) -> Result<u32> {
    let mut cursor = open(path)?;
    let header = CatalogHeader::read(&mut cursor)?;
    Ok(header.record_count)
}

/// Opens the catalog and returns a lazy sequence of its map records.
#[instrument(level = "debug")]
pub fn read_map_index(path: &Path) -> Result<MapRecords<BufReader<File>>> {
    let records = MapRecords::new(open(path)?)?;
    tracing::debug!(
        version = records.header().format_version,
        records = records.header().record_count,
        "catalog header decoded"
    );
    Ok(records)
}

/// Single-pass iterator over catalog records.
///
/// Yields exactly `record_count` items unless decoding fails, in which case the
/// error is yielded once and the iterator is exhausted: the stream position is
/// meaningless after a failed field and nothing further can be trusted.
#[derive(Debug)]
pub struct MapRecords<R> {
    cursor: BinaryCursor<R>,
    header: CatalogHeader,
    remaining: u32,
    failed: bool,
}

impl<R: Read> MapRecords<R> {
    /// Reads the header from `cursor`, leaving it positioned on the first record.
    pub fn new(mut cursor: BinaryCursor<R>) -> Result<Self> {
        let header = CatalogHeader::read(&mut cursor)?;
        Ok(Self { remaining: header.record_count, cursor, header, failed: false })
    }

    pub fn from_reader(reader: R) -> Result<Self> {
        Self::new(BinaryCursor::new(reader))
    }

    pub fn header(&self) -> &CatalogHeader {
        &self.header
    }

    /// Records not yet yielded.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Bytes consumed from the underlying stream.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }
}

impl<R: Read> Iterator for MapRecords<R> {
    type Item = Result<MapRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        match read_record(&mut self.cursor) {
            Ok(record) => {
                self.remaining -= 1;
                Some(Ok(record))
            },
            Err(error) => {
                self.failed = true;
                let index = self.header.record_count - self.remaining;
                Some(Err(error).or_raise(|| {
                    ErrorKind::MalformedCatalog(format!("record {index} of {}", self.header.record_count))
                }))
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = self.remaining as usize;
        (0, Some(remaining))
    }
}

/// Consumes one full record, in the exact order and width the client writes it.
fn read_record<R: Read>(cursor: &mut BinaryCursor<R>) -> Result<MapRecord> {
    // Artist, artist (unicode), title, title (unicode), mapper, difficulty, audio file.
    for _ in 0..7 {
        cursor.skip_string()?;
    }
    let hash = cursor.read_string()?;
    let file_name = cursor.read_string()?;
    cursor.read_u8()?; // ranked status
    cursor.skip(3 * 2)?; // hit circle, slider, spinner counts
    cursor.read_u64()?; // last modified
    cursor.skip(4 * 4)?; // AR, CS, HP, OD
    cursor.read_f64()?; // slider velocity
    for _ in 0..STAR_RATING_TABLES {
        let entries = cursor.read_u32()?;
        cursor.skip(u64::from(entries) * STAR_RATING_WIDTH)?;
    }
    cursor.skip(3 * 4)?; // drain, total, preview time
    let timing_points = cursor.read_u32()?;
    cursor.skip(u64::from(timing_points) * TIMING_POINT_WIDTH)?;
    cursor.skip(3 * 4)?; // beatmap, beatmap set, thread ID
    cursor.skip(4)?; // grades: standard, taiko, catch, mania
    cursor.read_u16()?; // local offset
    cursor.read_f32()?; // stack leniency
    cursor.read_u8()?; // gameplay mode
    cursor.skip_string()?; // source
    cursor.skip_string()?; // tags
    cursor.read_u16()?; // online offset
    cursor.skip_string()?; // title font
    cursor.read_bool()?; // unplayed
    cursor.read_u64()?; // last played
    cursor.read_bool()?; // osz2
    let folder_name = cursor.read_string()?;
    cursor.read_u64()?; // last checked against the online listing
    // Ignore sounds, ignore skin, disable storyboard, disable video, visual override.
    cursor.skip(5)?;
    cursor.read_u32()?; // last modified (again, 32-bit)
    cursor.read_u8()?; // mania scroll speed
    Ok(MapRecord { hash, folder_name, file_name })
}

/// Builds complete catalogs, every field included.
///
/// Unretained fields get plausible filler values; each record carries star
/// ratings and timing points so decoders have to skip variable-length arrays.
#[derive(Debug, Clone)]
pub struct CatalogWriter {
    header: CatalogHeader,
    records: Vec<MapRecord>,
    declared_count: Option<u32>,
}

impl CatalogWriter {
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            header: CatalogHeader {
                format_version: 20_191_106,
                folder_count: 0,
                account_unlocked: true,
                unlock_date: 0,
                player_name: player_name.into(),
                record_count: 0,
            },
            records: Vec::new(),
            declared_count: None,
        }
    }

    pub fn record(mut self, hash: impl Into<String>, folder_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.records.push(MapRecord { hash: hash.into(), folder_name: folder_name.into(), file_name: file_name.into() });
        self
    }

    /// Overrides the record count written to the header, which otherwise
    /// matches the number of records added.
    pub fn declared_count(mut self, count: u32) -> Self {
        self.declared_count = Some(count);
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut header = self.header.clone();
        header.record_count = self.declared_count.unwrap_or(self.records.len() as u32);
        header.folder_count = self.records.len() as u32;
        let mut writer = BinaryWriter::new();
        header.write_to(&mut writer);
        for (i, record) in self.records.iter().enumerate() {
            write_record(&mut writer, record, i as u32);
        }
        writer.into_bytes()
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.encode())
    }
}

fn write_record(writer: &mut BinaryWriter, record: &MapRecord, seed: u32) {
    writer.write_string("Artist");
    writer.write_string("");
    writer.write_string("Title");
    writer.write_string("タイトル");
    writer.write_string("Mapper");
    writer.write_string("Insane");
    writer.write_string("audio.mp3");
    writer.write_string(&record.hash);
    writer.write_string(&record.file_name);
    writer.write_u8(4); // ranked
    writer.write_u16(300);
    writer.write_u16(120);
    writer.write_u16(2);
    writer.write_u64(637_000_000_000_000_000);
    for stat in [9.0f32, 4.0, 6.0, 8.0] {
        writer.write_f32(stat);
    }
    writer.write_f64(1.4);
    for table in 0..STAR_RATING_TABLES as u32 {
        let entries = (seed + table) % 3;
        writer.write_u32(entries);
        for mods in 0..entries {
            writer.write_u8(0x08);
            writer.write_u32(mods);
            writer.write_u8(0x0D);
            writer.write_f64(5.25);
        }
    }
    writer.write_u32(95_000);
    writer.write_u32(101_000);
    writer.write_u32(40_000);
    let timing_points = 1 + seed % 2;
    writer.write_u32(timing_points);
    for i in 0..timing_points {
        writer.write_f64(333.33);
        writer.write_f64(f64::from(i) * 1000.0);
        writer.write_bool(i == 0);
    }
    writer.write_u32(1_000 + seed);
    writer.write_u32(500 + seed);
    writer.write_u32(0);
    writer.write_bytes(&[9, 9, 9, 9]);
    writer.write_u16(0);
    writer.write_f32(0.7);
    writer.write_u8(0);
    writer.write_string("");
    writer.write_string("stream jumps");
    writer.write_u16(0);
    writer.write_string("");
    writer.write_bool(true);
    writer.write_u64(0);
    writer.write_bool(false);
    writer.write_string(&record.folder_name);
    writer.write_u64(637_000_000_000_000_000);
    for flag in [false, false, true, false, false] {
        writer.write_bool(flag);
    }
    writer.write_u32(0);
    writer.write_u8(0);
}
