//! Fixed-width wire primitives shared by the program and result log formats
//!
//! Every scalar on the wire is a 4-byte little-endian IEEE-754 single, including
//! integers and booleans. Strings come in two flavours: the padded form used for
//! mechanical unit names (length + 32 bytes) and the exact form used for
//! timestamps and log headers (length + exactly that many bytes).

use crate::{MotionProgramError, Result};

/// Width of the padded string field
pub const PADDED_STR_LEN: usize = 32;

/// Types with a fixed binary layout on the controller side
pub trait WireCodec: Sized {
    fn encode(&self, w: &mut WireWriter) -> Result<()>;
    fn decode(r: &mut WireReader<'_>) -> Result<Self>;
}

/// Append-only buffer writer
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_num(&mut self, value: f64) {
        self.buf.extend_from_slice(&(value as f32).to_le_bytes());
    }

    pub fn put_nums(&mut self, values: &[f64]) {
        for &value in values {
            self.put_num(value);
        }
    }

    pub fn put_bool(&mut self, value: bool) {
        self.put_num(if value { 1.0 } else { 0.0 });
    }

    /// Length-prefixed string padded with spaces to [`PADDED_STR_LEN`] bytes
    pub fn put_padded_str(&mut self, value: &str) -> Result<()> {
        check_ascii(value)?;
        if value.len() > PADDED_STR_LEN {
            return Err(MotionProgramError::Validation(format!(
                "String '{}' exceeds {} bytes",
                value, PADDED_STR_LEN
            )));
        }
        self.put_num(value.len() as f64);
        self.buf.extend_from_slice(value.as_bytes());
        self.buf
            .extend(std::iter::repeat(b' ').take(PADDED_STR_LEN - value.len()));
        Ok(())
    }

    /// Length-prefixed string with no padding
    pub fn put_str(&mut self, value: &str) -> Result<()> {
        check_ascii(value)?;
        self.put_num(value.len() as f64);
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn check_ascii(value: &str) -> Result<()> {
    if value.is_ascii() {
        Ok(())
    } else {
        Err(MotionProgramError::Validation(format!(
            "String '{}' is not ASCII",
            value
        )))
    }
}

/// Cursor over an encoded buffer. Every read is bounds checked and a short
/// buffer is a format error, never zero-filled.
#[derive(Debug)]
pub struct WireReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.offset + len > self.data.len() {
            return Err(MotionProgramError::Format(format!(
                "Insufficient data for {} at offset {} (need {} bytes, {} remaining)",
                what,
                self.offset,
                len,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_num(&mut self) -> Result<f64> {
        let bytes = self.take(4, "number")?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64)
    }

    pub fn read_nums<const N: usize>(&mut self) -> Result<[f64; N]> {
        let mut values = [0.0; N];
        for value in values.iter_mut() {
            *value = self.read_num()?;
        }
        Ok(values)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_num()? != 0.0)
    }

    /// Read a float that must hold a non-negative integer (lengths, opcodes, counters)
    pub fn read_count(&mut self, what: &str) -> Result<usize> {
        let value = self.read_num()?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(MotionProgramError::Format(format!(
                "Invalid {}: {}",
                what, value
            )));
        }
        Ok(value as usize)
    }

    pub fn read_str(&mut self) -> Result<String> {
        let len = self.read_count("string length")?;
        let bytes = self.take(len, "string")?;
        ascii_string(bytes)
    }

    pub fn read_padded_str(&mut self) -> Result<String> {
        let len = self.read_count("string length")?;
        if len > PADDED_STR_LEN {
            return Err(MotionProgramError::Format(format!(
                "Padded string length {} exceeds {}",
                len, PADDED_STR_LEN
            )));
        }
        let bytes = self.take(PADDED_STR_LEN, "padded string")?;
        ascii_string(&bytes[..len])
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume and return everything left in the buffer
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.offset..];
        self.offset = self.data.len();
        rest
    }
}

fn ascii_string(bytes: &[u8]) -> Result<String> {
    if !bytes.is_ascii() {
        return Err(MotionProgramError::Format(
            "String field contains non-ASCII bytes".to_string(),
        ));
    }
    // ASCII is valid UTF-8
    Ok(String::from_utf8_lossy(bytes).into_owned())
}
