//! Encoder counterpart to [`BinaryCursor`](crate::BinaryCursor).
//!
//! The game client is the only real producer of these files; the writer exists
//! so catalogs and replays can be synthesized (tests in this and downstream
//! crates, fixtures for bug reports). Do NOT gate behind `#[cfg(test)]`, other
//! crates build their fixtures with it.

use crate::cursor::{STRING_EMPTY, STRING_PRESENT};

/// Append-only little-endian byte buffer.
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_uleb128(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.buffer.push(byte);
                return;
            }
            self.buffer.push(byte | 0x80);
        }
    }

    /// Writes the flag byte, and for non-empty strings the ULEB128 length (in
    /// bytes, not characters) followed by the UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) {
        if value.is_empty() {
            self.buffer.push(STRING_EMPTY);
            return;
        }
        self.buffer.push(STRING_PRESENT);
        self.write_uleb128(value.len() as u64);
        self.buffer.extend_from_slice(value.as_bytes());
    }
}
