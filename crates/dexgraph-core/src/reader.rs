//! Bounds-checked cursor over container bytes.

use crate::leb128;

/// Failure to read a value from container bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("unexpected end of data at offset {offset:#x} (wanted {wanted} bytes)")]
    UnexpectedEof { offset: usize, wanted: usize },
    #[error("malformed LEB128 value at offset {0:#x}")]
    MalformedLeb128(usize),
}

/// Little-endian reader positioned at an absolute offset of a byte slice.
///
/// Offsets reported in errors and by [`position`](Self::position) are
/// absolute, so they line up with the `*_off` fields of dex items.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Reader at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reader at `offset` within `data`.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self, ReadError> {
        if offset > data.len() {
            return Err(ReadError::UnexpectedEof { offset, wanted: 0 });
        }
        Ok(Self { data, pos: offset })
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Move to an absolute offset.
    pub fn seek(&mut self, offset: usize) -> Result<(), ReadError> {
        if offset > self.data.len() {
            return Err(ReadError::UnexpectedEof { offset, wanted: 0 });
        }
        self.pos = offset;
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ReadError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(ReadError::UnexpectedEof {
                offset: self.pos,
                wanted: len,
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_uleb128(&mut self) -> Result<u32, ReadError> {
        self.read_leb(leb128::decode_uleb128)
    }

    pub fn read_sleb128(&mut self) -> Result<i32, ReadError> {
        self.read_leb(leb128::decode_sleb128)
    }

    /// Read a `uleb128p1`; an encoded `0` yields [`NO_INDEX`](crate::NO_INDEX).
    pub fn read_uleb128p1(&mut self) -> Result<u32, ReadError> {
        self.read_leb(leb128::decode_uleb128p1)
    }

    fn read_leb<T>(&mut self, decode: fn(&[u8]) -> Option<(T, usize)>) -> Result<T, ReadError> {
        let rest = &self.data[self.pos..];
        match decode(rest) {
            Some((value, len)) => {
                self.pos += len;
                Ok(value)
            }
            None if rest.len() < leb128::MAX_LEN && rest.iter().all(|b| b & 0x80 != 0) => {
                Err(ReadError::UnexpectedEof {
                    offset: self.pos,
                    wanted: rest.len() + 1,
                })
            }
            None => Err(ReadError::MalformedLeb128(self.pos)),
        }
    }

    /// Read bytes up to (not including) the next NUL and skip the NUL.
    pub fn read_cstr(&mut self) -> Result<&'a [u8], ReadError> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ReadError::UnexpectedEof {
                offset: self.data.len(),
                wanted: 1,
            })?;
        let bytes = &rest[..len];
        self.pos += len + 1;
        Ok(bytes)
    }
}
