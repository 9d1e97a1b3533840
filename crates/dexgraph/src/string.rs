//! Canonical string values.

use std::fmt;
use std::sync::Arc;

use dexgraph_core::{ByteSink, leb128, mutf8};

/// Immutable MUTF-8 string data with its UTF-16 length.
///
/// Cloning is cheap; the context hands these out by value. Identity lives in
/// [`StringId`](crate::StringId), not here: two `DexString`s compare equal by
/// content.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DexString {
    bytes: Arc<[u8]>,
    utf16_size: u32,
}

impl DexString {
    pub(crate) fn new(bytes: Arc<[u8]>, utf16_size: u32) -> Self {
        Self { bytes, utf16_size }
    }

    /// MUTF-8 bytes, without the terminating NUL.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in UTF-16 code units (the dex `utf16_size`).
    #[inline]
    pub fn utf16_size(&self) -> u32 {
        self.utf16_size
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Every character is a single byte (and a single UTF-16 unit).
    #[inline]
    pub fn is_simple(&self) -> bool {
        self.utf16_size as usize == self.bytes.len()
    }

    pub fn to_string_lossy(&self) -> String {
        mutf8::decode_lossy(&self.bytes)
    }

    /// Size of the `string_data_item`: length prefix, bytes, NUL.
    pub fn entry_size(&self) -> usize {
        leb128::uleb128_size(self.utf16_size) + self.bytes.len() + 1
    }

    pub(crate) fn write<S: ByteSink + ?Sized>(&self, out: &mut S) {
        out.put_uleb128(self.utf16_size);
        out.put_slice(&self.bytes);
        out.put_u8(0);
    }
}

impl fmt::Debug for DexString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DexString({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for DexString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}
