//! Identity of a `.osu` beatmap file.
//!
//! Reads the format line and the `[Metadata]` section, which is enough to
//! tell a human which map a replay belongs to. Hit objects, timing and the
//! rest of the file are not parsed.

use exn::ResultExt;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

const FORMAT_PREFIX: &str = "osu file format v";
const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Beatmap {
    pub path: PathBuf,
    pub format_version: Option<u32>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    /// Difficulty name.
    pub version: Option<String>,
    pub beatmap_id: Option<u32>,
}

impl Beatmap {
    /// Reads the beatmap at `path`.
    ///
    /// Fails with [`ErrorKind::FileNotFound`] if there is no file there, which
    /// callers treat differently from an unreadable file.
    #[instrument(level = "debug")]
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).or_raise(|| ErrorKind::Io)?;
        Ok(Self::parse(path, &String::from_utf8_lossy(&bytes)))
    }

    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Self {
        let mut beatmap = Self { path: path.into(), ..Self::default() };
        let mut lines = text.trim_start_matches(BOM).lines().map(str::trim).filter(|line| !line.is_empty());
        if let Some(first) = lines.next()
            && let Some(version) = first.strip_prefix(FORMAT_PREFIX)
        {
            beatmap.format_version = version.parse().ok();
        }
        let mut in_metadata = false;
        for line in lines {
            if line.starts_with('[') {
                if in_metadata {
                    break;
                }
                in_metadata = line == "[Metadata]";
                continue;
            }
            if !in_metadata {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "Artist" => beatmap.artist = Some(value),
                "Title" => beatmap.title = Some(value),
                "Creator" => beatmap.creator = Some(value),
                "Version" => beatmap.version = Some(value),
                "BeatmapID" => beatmap.beatmap_id = value.parse().ok(),
                _ => {},
            }
        }
        beatmap
    }
}

impl fmt::Display for Beatmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => write!(f, "{artist} - {title}")?,
            (None, Some(title)) => write!(f, "{title}")?,
            _ => write!(f, "{}", self.path.display())?,
        }
        if let Some(version) = &self.version {
            write!(f, " [{version}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}osu file format v14\r\n\
        \r\n\
        [General]\r\n\
        AudioFilename: audio.mp3\r\n\
        Title: not metadata\r\n\
        \r\n\
        [Metadata]\r\n\
        Title:FREEDOM DiVE\r\n\
        TitleUnicode:FREEDOM DiVE\r\n\
        Artist:xi\r\n\
        Creator:Nakagawa-Kanon\r\n\
        Version:FOUR DIMENSIONS\r\n\
        BeatmapID:129891\r\n\
        \r\n\
        [HitObjects]\r\n\
        Title: also not metadata\r\n";

    #[test]
    fn parse_metadata() {
        let beatmap = Beatmap::parse("map.osu", SAMPLE);
        assert_eq!(beatmap.format_version, Some(14));
        assert_eq!(beatmap.artist.as_deref(), Some("xi"));
        assert_eq!(beatmap.title.as_deref(), Some("FREEDOM DiVE"));
        assert_eq!(beatmap.creator.as_deref(), Some("Nakagawa-Kanon"));
        assert_eq!(beatmap.version.as_deref(), Some("FOUR DIMENSIONS"));
        assert_eq!(beatmap.beatmap_id, Some(129_891));
        assert_eq!(beatmap.to_string(), "xi - FREEDOM DiVE [FOUR DIMENSIONS]");
    }

    #[test]
    fn parse_without_metadata_falls_back_to_path() {
        let beatmap = Beatmap::parse("Songs/1/map.osu", "garbage");
        assert_eq!(beatmap.format_version, None);
        assert_eq!(beatmap.to_string(), "Songs/1/map.osu");
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.osu");
        let error = Beatmap::from_path(&path).unwrap_err();
        assert_eq!(*error, ErrorKind::FileNotFound(path));
    }

    #[test]
    fn from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.osu");
        std::fs::write(&path, SAMPLE).unwrap();
        let beatmap = Beatmap::from_path(&path).unwrap();
        assert_eq!(beatmap.path, path);
        assert_eq!(beatmap.title.as_deref(), Some("FREEDOM DiVE"));
    }
}
