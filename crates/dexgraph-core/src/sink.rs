//! Byte sinks: the same writer code either emits bytes or counts them.
//!
//! Encoders are written once against [`ByteSink`]. Running them over a
//! [`SizeCounter`] yields the exact size a later run over a `Vec<u8>` will
//! write, which is what lets callers pre-allocate section space.

use crate::leb128;

/// Destination for encoded bytes.
pub trait ByteSink {
    fn put_slice(&mut self, bytes: &[u8]);

    fn put_u8(&mut self, value: u8) {
        self.put_slice(&[value]);
    }

    fn put_u16(&mut self, value: u16) {
        self.put_slice(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.put_slice(&value.to_le_bytes());
    }

    fn put_uleb128(&mut self, value: u32) {
        let mut buf = [0u8; leb128::MAX_LEN];
        let len = leb128::encode_uleb128(value, &mut buf);
        self.put_slice(&buf[..len]);
    }

    fn put_sleb128(&mut self, value: i32) {
        let mut buf = [0u8; leb128::MAX_LEN];
        let len = leb128::encode_sleb128(value, &mut buf);
        self.put_slice(&buf[..len]);
    }

    /// Write `value + 1` as `uleb128`; `NO_INDEX` becomes `0`.
    fn put_uleb128p1(&mut self, value: u32) {
        self.put_uleb128(value.wrapping_add(1));
    }
}

impl ByteSink for Vec<u8> {
    fn put_slice(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Sink that only counts bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SizeCounter {
    len: usize,
}

impl SizeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes counted so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl ByteSink for SizeCounter {
    fn put_slice(&mut self, bytes: &[u8]) {
        self.len += bytes.len();
    }
}
