//! Shared test fixtures.

use crate::error::ResolveError;
use crate::index::DexIdx;
use crate::{FieldId, IdKind, MethodId, ProtoId, StringId, TypeId};

/// In-memory container: raw bytes plus id tables already resolved to handles.
#[derive(Default)]
pub struct TableIdx {
    pub data: Vec<u8>,
    pub strings: Vec<StringId>,
    pub types: Vec<TypeId>,
    pub protos: Vec<ProtoId>,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
}

impl TableIdx {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }
}

fn at<T: Copy>(table: &[T], kind: IdKind, index: u32) -> Result<T, ResolveError> {
    table.get(index as usize).copied().ok_or(ResolveError {
        kind,
        index,
        len: table.len(),
    })
}

impl DexIdx for TableIdx {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn string_at(&self, index: u32) -> Result<StringId, ResolveError> {
        at(&self.strings, IdKind::String, index)
    }

    fn type_at(&self, index: u32) -> Result<TypeId, ResolveError> {
        at(&self.types, IdKind::Type, index)
    }

    fn proto_at(&self, index: u32) -> Result<ProtoId, ResolveError> {
        at(&self.protos, IdKind::Proto, index)
    }

    fn field_at(&self, index: u32) -> Result<FieldId, ResolveError> {
        at(&self.fields, IdKind::Field, index)
    }

    fn method_at(&self, index: u32) -> Result<MethodId, ResolveError> {
        at(&self.methods, IdKind::Method, index)
    }
}

/// Lowercase hex, one space between bytes.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
