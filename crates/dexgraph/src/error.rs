//! Error types for loading and encoding.

use dexgraph_core::ReadError;

use crate::{FieldId, IdKind, MethodId, TypeId};

/// An on-disk index that the source container does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} index {index} out of range (table has {len} entries)")]
pub struct ResolveError {
    pub kind: IdKind,
    pub index: u32,
    pub len: usize,
}

/// Failure to build a class, code or debug item from container bytes.
///
/// Loading never produces a partially built entity: on error nothing from
/// the failed item is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("unsupported opcode {opcode:#04x} at code unit {position}")]
    UnsupportedOpcode { opcode: u8, position: usize },
    #[error("instruction at code unit {position} runs past the end of the code")]
    TruncatedInstruction { position: usize },
    #[error("unknown payload identifier {ident:#06x} at code unit {position}")]
    BadPayload { ident: u16, position: usize },
    #[error("malformed encoded value (type {value_type:#04x}, arg {value_arg}) at offset {offset:#x}")]
    BadEncodedValue {
        value_type: u8,
        value_arg: u8,
        offset: usize,
    },
    #[error("invalid annotation visibility {0:#04x}")]
    BadVisibility(u8),
    #[error("member index delta overflows at offset {0:#x}")]
    IndexOverflow(usize),
    #[error("field {0:?} is already defined")]
    DuplicateField(FieldId),
    #[error("method {0:?} is already defined")]
    DuplicateMethod(MethodId),
}

/// Failure to encode an entity against an output index.
///
/// All of these are caller errors: the output index must be complete and the
/// graph well formed before encoding starts. Nothing is appended to the output
/// when an error is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("{kind} handle {handle} has no output index")]
    Unindexed { kind: IdKind, handle: u32 },
    #[error("{kind} index {index} does not fit in {bits} bits")]
    IndexOverflow { kind: IdKind, index: u32, bits: u8 },
    #[error("too many {what}: {count} (max {max})")]
    TooMany {
        what: &'static str,
        count: usize,
        max: usize,
    },
    #[error("method {0:?} has code but no code offset")]
    MissingCodeOffset(MethodId),
    #[error("{kind} indices are not strictly increasing at index {index}")]
    UnsortedMembers { kind: IdKind, index: u32 },
    #[error("output offset {offset:#x} is not {align}-byte aligned")]
    Misaligned { offset: usize, align: usize },
    #[error("external class {0:?} has no class data to encode")]
    ExternalClass(TypeId),
}
