//! Method prototypes.

use crate::{StringId, TypeId, TypeListId};

/// Return type, argument list and shorty of a method signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DexProto {
    pub(crate) rtype: TypeId,
    pub(crate) args: TypeListId,
    pub(crate) shorty: StringId,
}

impl DexProto {
    #[inline]
    pub fn rtype(&self) -> TypeId {
        self.rtype
    }

    #[inline]
    pub fn args(&self) -> TypeListId {
        self.args
    }

    #[inline]
    pub fn shorty(&self) -> StringId {
        self.shorty
    }
}

/// Shorty character for a type descriptor: references and arrays collapse to `L`.
pub fn shorty_char(descriptor: &[u8]) -> u8 {
    match descriptor.first() {
        Some(b'L' | b'[') => b'L',
        Some(&c) => c,
        None => b'V',
    }
}
