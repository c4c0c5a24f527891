//! This module contains the kernels for the SSTable variable-width integer
//! ("vint") encoding.
//!
//! Unlike LEB128, the length of a vint is self-described by its first byte:
//! the number of leading set bits gives the number of extra bytes that follow
//! (0 to 8). The remaining low bits of the first byte are the most significant
//! bits of the value and the extra bytes follow in big-endian order. A value
//! therefore occupies 1 to [`MAX_VINT_SIZE`] bytes. Signed values are
//! zig-zagged before encoding.
//!
//! Encoding is only used to build test fixtures and benchmarks; the decoder
//! never writes SSTables.

use crate::error::SstableError;
use crate::kernels::cursor::ByteCursor;
use crate::kernels::zigzag;

/// The widest encoding of a 64-bit value: one prefix byte plus eight payload bytes.
pub const MAX_VINT_SIZE: usize = 9;

//==================================================================================
// 1. Decoding
//==================================================================================

/// Decodes a single unsigned vint from the cursor.
pub fn decode_unsigned(cursor: &mut ByteCursor<'_>) -> Result<u64, SstableError> {
    let offset = cursor.position();
    let first = cursor.read_u8()?;
    if first & 0x80 == 0 {
        return Ok(first as u64);
    }

    let extra = first.leading_ones() as usize;
    if extra + 1 > MAX_VINT_SIZE {
        return Err(SstableError::MalformedVarint {
            offset,
            reason: format!("{} continuation bytes exceed the maximum width", extra),
        });
    }

    let tail = cursor.read_bytes(extra).map_err(|e| {
        // Keep the error pointing at the start of the integer.
        match e {
            SstableError::TruncatedInput { remaining, .. } => SstableError::TruncatedInput {
                offset,
                needed: extra + 1,
                remaining: remaining + 1,
            },
            other => other,
        }
    })?;

    // `checked_shr` yields None for extra == 8, where the prefix byte carries no payload.
    let mut value = 0xFFu8.checked_shr(extra as u32).map_or(0, |mask| first & mask) as u64;
    for &byte in tail {
        value = (value << 8) | byte as u64;
    }
    Ok(value)
}

/// Decodes a single zig-zagged signed vint from the cursor.
pub fn decode_signed(cursor: &mut ByteCursor<'_>) -> Result<i64, SstableError> {
    decode_unsigned(cursor).map(zigzag::decode_val)
}

//==================================================================================
// 2. Encoding
//==================================================================================

/// Returns the number of bytes `value` occupies once encoded.
pub fn encoded_size(value: u64) -> usize {
    // Each additional byte buys 7 more bits of magnitude.
    let magnitude = (value | 1).leading_zeros() as usize;
    (639 - magnitude * 9) >> 6
}

/// Encodes a single unsigned integer as a vint, appending to `buffer`.
pub fn encode_unsigned(value: u64, buffer: &mut Vec<u8>) {
    let size = encoded_size(value);
    if size == 1 {
        buffer.push(value as u8);
        return;
    }

    let extra = size - 1;
    let prefix = !0xFFu8.checked_shr(extra as u32).unwrap_or(0);
    let be = value.to_be_bytes();
    if size == MAX_VINT_SIZE {
        buffer.push(prefix);
        buffer.extend_from_slice(&be);
    } else {
        let payload = &be[8 - size..];
        buffer.push(payload[0] | prefix);
        buffer.extend_from_slice(&payload[1..]);
    }
}

/// Encodes a single signed integer as a zig-zagged vint, appending to `buffer`.
pub fn encode_signed(value: i64, buffer: &mut Vec<u8>) {
    encode_unsigned(zigzag::encode_val(value), buffer)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_unsigned(value: u64) -> (u64, usize) {
        let mut encoded = Vec::new();
        encode_unsigned(value, &mut encoded);
        let mut cursor = ByteCursor::new(&encoded);
        let decoded = decode_unsigned(&mut cursor).unwrap();
        assert!(cursor.is_at_end(), "decoder must consume the whole encoding");
        (decoded, encoded.len())
    }

    #[test]
    fn test_unsigned_boundaries() {
        let cases: [(u64, usize); 8] = [
            (0, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            ((1 << 56) - 1, 8),
            (1 << 56, 9),
            (u64::MAX, 9),
        ];
        for (value, expected_len) in cases {
            let (decoded, len) = roundtrip_unsigned(value);
            assert_eq!(decoded, value);
            assert_eq!(len, expected_len, "encoded size of {}", value);
        }
    }

    #[test]
    fn test_signed_zigzag_boundaries() {
        for value in [0i64, -1, 1, -64, 63, -65, i64::MAX, i64::MIN] {
            let mut encoded = Vec::new();
            encode_signed(value, &mut encoded);
            let mut cursor = ByteCursor::new(&encoded);
            assert_eq!(decode_signed(&mut cursor).unwrap(), value);
        }
    }

    #[test]
    fn test_known_encodings() {
        let mut encoded = Vec::new();
        encode_unsigned(300, &mut encoded);
        // 0b10_000001 0b00101100: one extra byte, high bits 0b000001.
        assert_eq!(encoded, vec![0x81, 0x2C]);

        let mut encoded = Vec::new();
        encode_unsigned(u64::MAX, &mut encoded);
        assert_eq!(encoded, vec![0xFF; 9]);
    }

    #[test]
    fn test_decode_truncated_buffer() {
        let mut encoded = Vec::new();
        encode_unsigned(624_485, &mut encoded);
        let truncated = &encoded[..encoded.len() - 1];
        let mut cursor = ByteCursor::new(truncated);
        let err = decode_unsigned(&mut cursor).unwrap_err();
        assert!(matches!(err, SstableError::TruncatedInput { offset: 0, .. }));
    }

    #[test]
    fn test_value_wider_than_field_is_malformed() {
        let mut encoded = Vec::new();
        encode_unsigned(u32::MAX as u64 + 1, &mut encoded);
        let mut cursor = ByteCursor::new(&encoded);
        let err = cursor.read_unsigned_vint32().unwrap_err();
        assert!(matches!(err, SstableError::MalformedVarint { offset: 0, .. }));
    }
}
