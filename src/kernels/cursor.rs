// In: src/kernels/cursor.rs

//! The byte cursor every component parser is built on.
//!
//! A `ByteCursor` is a sequential, bounds-checked reader over an immutable,
//! fully resident byte slice. All multi-byte fixed-width integers in SSTable
//! components are big-endian. Reads advance the position by exactly the number
//! of bytes consumed and never read past the end of the slice; a short read
//! fails with `TruncatedInput` and leaves the cursor where it was.
//!
//! Sub-cursors created with [`ByteCursor::sub_cursor`] keep reporting absolute
//! offsets, so an error raised inside a row body still points into the file.

use byteorder::{BigEndian, ByteOrder};

use crate::error::SstableError;
use crate::kernels::vint;

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Absolute offset of `buf[0]` within the original file.
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute position of the next byte to be read.
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Moves the cursor to an absolute offset. This is the only way the cursor
    /// ever moves backwards and is used for index-driven random access.
    pub fn seek(&mut self, offset: usize) -> Result<(), SstableError> {
        let relative = offset.checked_sub(self.base).filter(|&r| r <= self.buf.len());
        match relative {
            Some(r) => {
                self.pos = r;
                Ok(())
            }
            None => Err(SstableError::TruncatedInput {
                offset,
                needed: 0,
                remaining: 0,
            }),
        }
    }

    /// Returns the next `n` bytes without copying and advances past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], SstableError> {
        if self.remaining() < n {
            return Err(SstableError::TruncatedInput {
                offset: self.position(),
                needed: n,
                remaining: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..self.pos])
    }

    pub fn skip(&mut self, n: usize) -> Result<(), SstableError> {
        self.read_bytes(n).map(|_| ())
    }

    /// Splits off the next `n` bytes as an independent cursor and advances
    /// this cursor past them.
    pub fn sub_cursor(&mut self, n: usize) -> Result<ByteCursor<'a>, SstableError> {
        let base = self.position();
        let buf = self.read_bytes(n)?;
        Ok(ByteCursor { buf, pos: 0, base })
    }

    //==============================================================================
    // Fixed-width reads
    //==============================================================================

    pub fn read_u8(&mut self) -> Result<u8, SstableError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, SstableError> {
        self.read_bytes(2).map(BigEndian::read_u16)
    }

    pub fn read_u32(&mut self) -> Result<u32, SstableError> {
        self.read_bytes(4).map(BigEndian::read_u32)
    }

    pub fn read_i32(&mut self) -> Result<i32, SstableError> {
        self.read_bytes(4).map(BigEndian::read_i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, SstableError> {
        self.read_bytes(8).map(BigEndian::read_i64)
    }

    pub fn read_f64(&mut self) -> Result<f64, SstableError> {
        self.read_bytes(8).map(BigEndian::read_f64)
    }

    /// Reads a big-endian unsigned integer of `width` bytes (1 to 8).
    pub fn read_fixed(&mut self, width: usize) -> Result<u64, SstableError> {
        if width == 0 || width > 8 {
            return Err(SstableError::InternalError(format!(
                "fixed-width read of {} bytes is not supported",
                width
            )));
        }
        self.read_bytes(width).map(|b| BigEndian::read_uint(b, width))
    }

    //==============================================================================
    // Variable-width reads
    //==============================================================================

    pub fn read_unsigned_vint(&mut self) -> Result<u64, SstableError> {
        vint::decode_unsigned(self)
    }

    pub fn read_signed_vint(&mut self) -> Result<i64, SstableError> {
        vint::decode_signed(self)
    }

    /// Reads an unsigned varint that must fit in 32 bits.
    pub fn read_unsigned_vint32(&mut self) -> Result<u32, SstableError> {
        let offset = self.position();
        let value = vint::decode_unsigned(self)?;
        u32::try_from(value).map_err(|_| SstableError::MalformedVarint {
            offset,
            reason: format!("value {} exceeds the 32-bit field width", value),
        })
    }

    /// Reads an unsigned varint used as a length or count and checks that it
    /// cannot possibly address more bytes than remain.
    pub fn read_vint_length(&mut self) -> Result<usize, SstableError> {
        let offset = self.position();
        let value = vint::decode_unsigned(self)?;
        usize::try_from(value).map_err(|_| SstableError::MalformedVarint {
            offset,
            reason: format!("length {} does not fit in memory", value),
        })
    }

    //==============================================================================
    // Length-prefixed blocks
    //==============================================================================

    /// Reads a varint length followed by that many bytes.
    pub fn read_length_prefixed_bytes(&mut self) -> Result<&'a [u8], SstableError> {
        let len = self.read_vint_length()?;
        self.read_bytes(len)
    }

    /// Reads a varint length followed by that many bytes of UTF-8 text.
    pub fn read_length_prefixed_text(&mut self) -> Result<&'a str, SstableError> {
        let offset = self.position();
        let bytes = self.read_length_prefixed_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| SstableError::InvalidText { offset })
    }

    /// Reads a `u16` length followed by that many bytes (partition and index keys).
    pub fn read_short_length_bytes(&mut self) -> Result<&'a [u8], SstableError> {
        let len = self.read_u16()? as usize;
        self.read_bytes(len)
    }

    /// Reads a `u16` length followed by that many bytes of UTF-8 text.
    pub fn read_short_length_text(&mut self) -> Result<&'a str, SstableError> {
        let offset = self.position();
        let bytes = self.read_short_length_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| SstableError::InvalidText { offset })
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
