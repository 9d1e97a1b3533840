//! Modified UTF-8, the encoding of dex `string_data_item` bytes.
//!
//! Two differences from standard UTF-8: U+0000 is written as `C0 80` so the
//! data never contains a NUL before its terminator, and characters outside the
//! BMP are written as a UTF-16 surrogate pair, three bytes per surrogate.

/// Encode `s` as MUTF-8.
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        let c = ch as u32;
        match c {
            0 => out.extend_from_slice(&[0xc0, 0x80]),
            0x01..=0x7f => out.push(c as u8),
            0x80..=0x7ff => {
                out.push(0xc0 | (c >> 6) as u8);
                out.push(0x80 | (c & 0x3f) as u8);
            }
            0x800..=0xffff => push_three(&mut out, c),
            _ => {
                let mut units = [0u16; 2];
                for &unit in ch.encode_utf16(&mut units).iter() {
                    push_three(&mut out, u32::from(unit));
                }
            }
        }
    }
    out
}

fn push_three(out: &mut Vec<u8>, unit: u32) {
    out.push(0xe0 | ((unit >> 12) & 0x0f) as u8);
    out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
    out.push(0x80 | (unit & 0x3f) as u8);
}

/// Length of `s` in UTF-16 code units, the dex `utf16_size`.
pub fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// Length of MUTF-8 `bytes` in UTF-16 code units.
pub fn utf16_len_of(bytes: &[u8]) -> u32 {
    code_points(bytes)
        .map(|cp| if cp > 0xffff { 2 } else { 1 })
        .sum()
}

/// Iterate the values encoded by MUTF-8 `bytes`, one per byte sequence.
///
/// Surrogates are not recombined: a supplementary character stored as a pair
/// yields two values, which is exactly the UTF-16 code unit order dex sorts
/// strings by. A truncated or stray byte yields its own value.
pub fn code_points(bytes: &[u8]) -> CodePoints<'_> {
    CodePoints { bytes, pos: 0 }
}

/// Iterator returned by [`code_points`].
#[derive(Clone, Debug)]
pub struct CodePoints<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Iterator for CodePoints<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let rest = &self.bytes[self.pos..];
        let &lead = rest.first()?;
        let (value, len) = match lead {
            0x00..=0x7f => (u32::from(lead), 1),
            0xc0..=0xdf => decode_sequence(rest, 2, 0x1f),
            0xe0..=0xef => decode_sequence(rest, 3, 0x0f),
            0xf0..=0xf7 => decode_sequence(rest, 4, 0x07),
            _ => (u32::from(lead), 1),
        };
        self.pos += len;
        Some(value)
    }
}

fn decode_sequence(rest: &[u8], len: usize, lead_mask: u8) -> (u32, usize) {
    let Some(seq) = rest.get(..len) else {
        return (u32::from(rest[0]), 1);
    };
    if seq[1..].iter().any(|&b| b & 0xc0 != 0x80) {
        return (u32::from(rest[0]), 1);
    }
    let value = seq[1..]
        .iter()
        .fold(u32::from(seq[0] & lead_mask), |acc, &b| {
            (acc << 6) | u32::from(b & 0x3f)
        });
    (value, len)
}

/// Decode MUTF-8 `bytes` to a `String`, replacing anything unpaired or invalid
/// with U+FFFD.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    for cp in code_points(bytes) {
        match char::from_u32(cp) {
            Some(ch) if cp > 0xffff => {
                let mut pair = [0u16; 2];
                units.extend_from_slice(ch.encode_utf16(&mut pair));
            }
            _ if cp <= 0xffff => units.push(cp as u16),
            _ => units.push(0xfffd),
        }
    }
    String::from_utf16_lossy(&units)
}
