#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Byte-level primitives for the dex container format.
//!
//! - [`leb128`]: the three LEB128 flavors dex uses (`uleb128`, `sleb128`, `uleb128p1`)
//! - [`mutf8`]: modified UTF-8, the encoding of dex string data
//! - [`ByteReader`]: bounds-checked little-endian reads at container offsets
//! - [`ByteSink`]: write target shared by real output and size computation

pub mod leb128;
pub mod mutf8;
mod reader;
mod sink;


pub use reader::{ByteReader, ReadError};
pub use sink::{ByteSink, SizeCounter};

/// "No index" sentinel used by dex tables (`NO_INDEX`).
pub const NO_INDEX: u32 = 0xffff_ffff;
