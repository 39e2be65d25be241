//! Forward-only little-endian field reader.
//!
//! Every osu! binary format is a flat sequence of fixed-width little-endian
//! primitives and length-prefixed strings, with no framing around records. The
//! [`BinaryCursor`] reads those primitives one after the other and counts how
//! many bytes it has consumed; it never seeks.

use byteorder::{LittleEndian, ReadBytesExt};
use exn::ResultExt;
use std::io::{self, Read};

use crate::error::{ErrorKind, Result};

/// Flag byte announcing an empty string (no further bytes).
pub const STRING_EMPTY: u8 = 0x00;
/// Flag byte announcing a ULEB128 length followed by that many UTF-8 bytes.
pub const STRING_PRESENT: u8 = 0x0B;

// Upper bound for the up-front allocation of a string buffer, so that a
// corrupted length can't make us reserve gigabytes before hitting EOF.
const MAX_PREALLOCATION: usize = 64 * 1024;

/// Sequential reader over any byte source.
#[derive(Debug)]
pub struct BinaryCursor<R> {
    reader: R,
    position: u64,
}

impl<R: Read> BinaryCursor<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, position: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Maps a failed primitive read onto the error taxonomy, keeping the I/O
    /// error as the source.
    fn raise<T>(result: io::Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                let kind = match e.kind() {
                    io::ErrorKind::UnexpectedEof => ErrorKind::UnexpectedEof,
                    _ => ErrorKind::Io,
                };
                Err(e).or_raise(|| kind)
            },
        }
    }

    fn advance<T>(&mut self, width: u64, result: io::Result<T>) -> Result<T> {
        let value = Self::raise(result)?;
        self.position += width;
        Ok(value)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let result = self.reader.read_u8();
        self.advance(1, result)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let result = self.reader.read_u16::<LittleEndian>();
        self.advance(2, result)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let result = self.reader.read_u32::<LittleEndian>();
        self.advance(4, result)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let result = self.reader.read_u64::<LittleEndian>();
        self.advance(8, result)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let result = self.reader.read_f32::<LittleEndian>();
        self.advance(4, result)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let result = self.reader.read_f64::<LittleEndian>();
        self.advance(8, result)
    }

    /// Reads an unsigned LEB128 integer: 7 data bits per byte, least
    /// significant group first, high bit set on every byte but the last.
    pub fn read_uleb128(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.read_u8()?;
            // The tenth group only has room for bit 63.
            if shift >= u64::BITS || (shift == 63 && byte & 0x7E != 0) {
                exn::bail!(ErrorKind::MalformedCatalog("ULEB128 length overflows 64 bits".to_string()));
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Reads the length flag and, if present, the ULEB128 byte length.
    fn read_string_length(&mut self) -> Result<u64> {
        match self.read_u8()? {
            STRING_EMPTY => Ok(0),
            STRING_PRESENT => self.read_uleb128(),
            flag => exn::bail!(ErrorKind::MalformedCatalog(format!("invalid string flag 0x{flag:02X}"))),
        }
    }

    fn read_exact_bytes(&mut self, length: u64) -> Result<Vec<u8>> {
        let capacity = usize::try_from(length).unwrap_or(usize::MAX).min(MAX_PREALLOCATION);
        let mut buffer = Vec::with_capacity(capacity);
        let read = Self::raise((&mut self.reader).take(length).read_to_end(&mut buffer))?;
        self.position += read as u64;
        if (read as u64) < length {
            exn::bail!(ErrorKind::UnexpectedEof);
        }
        Ok(buffer)
    }

    /// Reads an osu!-style string: flag byte, then (for `0x0B`) a ULEB128 byte
    /// length and that many UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_string_length()?;
        if length == 0 {
            return Ok(String::new());
        }
        let bytes = self.read_exact_bytes(length)?;
        String::from_utf8(bytes).or_raise(|| ErrorKind::InvalidString)
    }

    /// Consumes a string without decoding or keeping it.
    pub fn skip_string(&mut self) -> Result<()> {
        let length = self.read_string_length()?;
        self.skip(length)
    }

    /// Consumes exactly `count` bytes.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let skipped = Self::raise(io::copy(&mut (&mut self.reader).take(count), &mut io::sink()))?;
        self.position += skipped;
        if skipped < count {
            exn::bail!(ErrorKind::UnexpectedEof);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::BinaryWriter;
    use rstest::rstest;
    use std::io::Cursor;

    fn cursor(bytes: &[u8]) -> BinaryCursor<Cursor<&[u8]>> {
        BinaryCursor::new(Cursor::new(bytes))
    }

    #[test]
    fn primitives_are_little_endian() {
        let bytes = [
            0x01, // bool
            0xFE, // u8
            0x34, 0x12, // u16
            0x78, 0x56, 0x34, 0x12, // u32
            0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, // u64
        ];
        let mut reader = cursor(&bytes);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_u8().unwrap(), 0xFE);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(reader.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(reader.position(), bytes.len() as u64);
    }

    #[test]
    fn floats_are_little_endian() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&9.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.4f64).to_le_bytes());
        let mut reader = cursor(&bytes);
        assert_eq!(reader.read_f32().unwrap(), 9.5);
        assert_eq!(reader.read_f64().unwrap(), -1.4);
        assert_eq!(reader.position(), 12);
    }

    #[test]
    fn reading_past_the_end_is_unexpected_eof() {
        let mut reader = cursor(&[0x01, 0x02, 0x03]);
        let error = reader.read_u32().unwrap_err();
        assert_eq!(*error, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn empty_string_flag_consumes_one_byte() {
        let mut reader = cursor(&[STRING_EMPTY, 0xAA]);
        assert_eq!(reader.read_string().unwrap(), "");
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.read_u8().unwrap(), 0xAA);
    }

    #[rstest]
    #[case(0x01)]
    #[case(0x0A)]
    #[case(0x0C)]
    #[case(0xFF)]
    fn unknown_string_flag_is_malformed(#[case] flag: u8) {
        let bytes = [flag, 0x01, b'a'];
        let mut reader = cursor(&bytes);
        let error = reader.read_string().unwrap_err();
        assert!(matches!(*error, ErrorKind::MalformedCatalog(_)));
    }

    #[test]
    fn truncated_string_is_unexpected_eof() {
        let mut reader = cursor(&[STRING_PRESENT, 0x05, b'a', b'b']);
        let error = reader.read_string().unwrap_err();
        assert_eq!(*error, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut reader = cursor(&[STRING_PRESENT, 0x02, 0xC3, 0x28]);
        let error = reader.read_string().unwrap_err();
        assert_eq!(*error, ErrorKind::InvalidString);
    }

    #[rstest]
    #[case(&[0x00], 0)]
    #[case(&[0x7F], 127)]
    #[case(&[0x80, 0x01], 128)]
    #[case(&[0xE5, 0x8E, 0x26], 624_485)]
    #[case(&[0x80, 0x80, 0x01], 16_384)]
    fn uleb128_decoding(#[case] bytes: &[u8], #[case] expected: u64) {
        let mut reader = cursor(bytes);
        assert_eq!(reader.read_uleb128().unwrap(), expected);
        assert_eq!(reader.position(), bytes.len() as u64);
    }

    #[test]
    fn uleb128_max_value() {
        let mut bytes = [0xFF; 10];
        bytes[9] = 0x01;
        assert_eq!(cursor(&bytes).read_uleb128().unwrap(), u64::MAX);
    }

    #[rstest]
    #[case(&[0xFF; 11])]
    #[case(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02])]
    #[case(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x7F])]
    fn uleb128_overflow_is_malformed(#[case] bytes: &[u8]) {
        let error = cursor(bytes).read_uleb128().unwrap_err();
        assert!(matches!(*error, ErrorKind::MalformedCatalog(_)));
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(127)]
    #[case(128)]
    #[case(16_384)]
    fn string_round_trip_across_length_boundaries(#[case] length: usize) {
        let original: String = "abcdefghijklmnopqrstuvwxyz".chars().cycle().take(length).collect();
        let mut writer = BinaryWriter::new();
        writer.write_string(&original);
        writer.write_u8(0x5A);
        let bytes = writer.into_bytes();
        let mut reader = cursor(&bytes);
        assert_eq!(reader.read_string().unwrap(), original);
        // The sentinel proves the cursor stopped exactly after the string.
        assert_eq!(reader.read_u8().unwrap(), 0x5A);
    }

    #[test]
    fn multibyte_utf8_length_counts_bytes() {
        let mut writer = BinaryWriter::new();
        writer.write_string("ぼくのフレンド");
        let bytes = writer.into_bytes();
        assert_eq!(bytes[1] as usize, "ぼくのフレンド".len());
        assert_eq!(cursor(&bytes).read_string().unwrap(), "ぼくのフレンド");
    }

    #[test]
    fn skip_string_advances_like_read_string() {
        let mut writer = BinaryWriter::new();
        writer.write_string("Camellia");
        writer.write_u16(727);
        let bytes = writer.into_bytes();
        let mut reader = cursor(&bytes);
        reader.skip_string().unwrap();
        assert_eq!(reader.read_u16().unwrap(), 727);
    }

    #[test]
    fn skip_past_the_end_is_unexpected_eof() {
        let mut reader = cursor(&[0x00, 0x00]);
        let error = reader.skip(3).unwrap_err();
        assert_eq!(*error, ErrorKind::UnexpectedEof);
        assert_eq!(reader.position(), 2);
    }
}
