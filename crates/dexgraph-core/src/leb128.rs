//! LEB128 variable-length integers.
//!
//! Dex uses three flavors, each carrying at most 32 bits in at most 5 bytes:
//! - `uleb128`: unsigned
//! - `sleb128`: signed, sign-extended from bit 6 of the last byte
//! - `uleb128p1`: unsigned value plus one, so `NO_INDEX` (-1) encodes as `0`

/// Maximum encoded length of a 32-bit LEB128 value.
pub const MAX_LEN: usize = 5;

/// Number of bytes `value` takes as `uleb128`.
pub fn uleb128_size(mut value: u32) -> usize {
    let mut size = 1;
    while value >= 0x80 {
        value >>= 7;
        size += 1;
    }
    size
}

/// Number of bytes `value` takes as `sleb128`.
pub fn sleb128_size(value: i32) -> usize {
    let mut buf = [0u8; MAX_LEN];
    encode_sleb128(value, &mut buf)
}

/// Number of bytes `value` takes as `uleb128p1`.
pub fn uleb128p1_size(value: u32) -> usize {
    uleb128_size(value.wrapping_add(1))
}

/// Encode `value` as `uleb128` into `buf`, returning the encoded length.
pub fn encode_uleb128(mut value: u32, buf: &mut [u8; MAX_LEN]) -> usize {
    let mut len = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf[len] = byte;
            return len + 1;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
}

/// Encode `value` as `sleb128` into `buf`, returning the encoded length.
pub fn encode_sleb128(mut value: i32, buf: &mut [u8; MAX_LEN]) -> usize {
    let mut len = 0;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let sign_clear = byte & 0x40 == 0;
        if (value == 0 && sign_clear) || (value == -1 && !sign_clear) {
            buf[len] = byte;
            return len + 1;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
}

/// Decode a `uleb128` from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` if the input
/// ends early or the encoding runs past [`MAX_LEN`] bytes.
pub fn decode_uleb128(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut result: u32 = 0;
    for (i, &byte) in bytes.iter().take(MAX_LEN).enumerate() {
        result |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }
    }
    None
}

/// Decode a `sleb128` from the start of `bytes`.
pub fn decode_sleb128(bytes: &[u8]) -> Option<(i32, usize)> {
    let mut result: u32 = 0;
    let mut shift = 0;
    for (i, &byte) in bytes.iter().take(MAX_LEN).enumerate() {
        result |= u32::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 32 && byte & 0x40 != 0 {
                result |= u32::MAX << shift;
            }
            return Some((result as i32, i + 1));
        }
    }
    None
}

/// Decode a `uleb128p1`; an encoded `0` yields `NO_INDEX`.
pub fn decode_uleb128p1(bytes: &[u8]) -> Option<(u32, usize)> {
    decode_uleb128(bytes).map(|(value, len)| (value.wrapping_sub(1), len))
}
