//! This module contains the pure, stateless kernels for Zig-zag encoding and
//! decoding.
//!
//! Zig-zag is a lossless bitwise mapping of signed integers to unsigned
//! integers so that small magnitudes of either sign stay small. Signed varint
//! fields (e.g. duration components) are zig-zagged before their varint
//! encoding. This module is PURE RUST and panic-free.

use num_traits::{AsPrimitive, PrimInt, Signed, Unsigned};

use crate::traits::{HasSigned, HasUnsigned};

//==================================================================================
// 1. Generic Core Logic (The "Engine")
//==================================================================================

/// Encodes a single signed integer using the Zig-zag algorithm.
pub fn encode_val<T>(n: T) -> T::Unsigned
where
    T: PrimInt + Signed + HasUnsigned + AsPrimitive<T::Unsigned>,
{
    let bits = std::mem::size_of::<T>() * 8;
    // The right shift on a signed primitive is arithmetic, producing all ones
    // for negative inputs.
    let shifted = (n << 1) ^ (n >> (bits - 1));
    shifted.as_()
}

/// Decodes a single unsigned integer back to its signed representation.
pub fn decode_val<U>(n: U) -> U::Signed
where
    U: PrimInt + Unsigned + HasSigned + AsPrimitive<U::Signed>,
{
    // The formula is (n >> 1) ^ -(n & 1)
    let shifted: U::Signed = (n >> 1).as_();
    let lsb: U::Signed = (n & U::one()).as_();
    shifted ^ (-lsb)
}

//==================================================================================
// 2. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag_core_logic_i32() {
        assert_eq!(encode_val(0i32), 0u32);
        assert_eq!(encode_val(-1i32), 1u32);
        assert_eq!(encode_val(1i32), 2u32);
        assert_eq!(encode_val(-5i32), 9u32);

        assert_eq!(decode_val(0u32), 0i32);
        assert_eq!(decode_val(1u32), -1i32);
        assert_eq!(decode_val(2u32), 1i32);
        assert_eq!(decode_val(9u32), -5i32);
    }

    #[test]
    fn test_max_min_values_i64() {
        for original in [i64::MAX, i64::MIN, -1, 0, 1] {
            assert_eq!(decode_val(encode_val(original)), original);
        }
        assert_eq!(encode_val(i64::MIN), u64::MAX);
        assert_eq!(encode_val(i64::MAX), u64::MAX - 1);
    }
}
