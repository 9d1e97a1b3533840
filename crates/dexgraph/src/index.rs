//! The two index seams between the object model and the container.
//!
//! - [`DexIdx`]: consumed while loading. Maps on-disk indices of the source
//!   container to canonical handles and exposes its raw bytes.
//! - [`OutputIndex`]: consumed while encoding. Maps canonical handles to
//!   indices in the target container; it must be complete before any encode
//!   call.

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexSet;

use crate::error::{EncodeError, ResolveError};
use crate::{DexClass, DexContext, FieldId, IdKind, MethodId, ProtoId, StringId, TypeId};

/// Index resolution for one source container.
pub trait DexIdx {
    /// The whole container; item offsets are relative to its start.
    fn data(&self) -> &[u8];
    fn string_at(&self, index: u32) -> Result<StringId, ResolveError>;
    fn type_at(&self, index: u32) -> Result<TypeId, ResolveError>;
    fn proto_at(&self, index: u32) -> Result<ProtoId, ResolveError>;
    fn field_at(&self, index: u32) -> Result<FieldId, ResolveError>;
    fn method_at(&self, index: u32) -> Result<MethodId, ResolveError>;
}

/// Canonical handle → index in the container being written.
pub trait OutputIndex {
    fn string_index(&self, id: StringId) -> Option<u32>;
    fn type_index(&self, id: TypeId) -> Option<u32>;
    fn proto_index(&self, id: ProtoId) -> Option<u32>;
    fn field_index(&self, id: FieldId) -> Option<u32>;
    fn method_index(&self, id: MethodId) -> Option<u32>;
}

/// Lookups that turn a miss into [`EncodeError::Unindexed`].
pub(crate) trait OutputIndexExt: OutputIndex {
    fn string_idx(&self, id: StringId) -> Result<u32, EncodeError> {
        self.string_index(id).ok_or(unindexed(IdKind::String, id.as_u32()))
    }

    fn type_idx(&self, id: TypeId) -> Result<u32, EncodeError> {
        self.type_index(id).ok_or(unindexed(IdKind::Type, id.as_u32()))
    }

    fn field_idx(&self, id: FieldId) -> Result<u32, EncodeError> {
        self.field_index(id).ok_or(unindexed(IdKind::Field, id.as_u32()))
    }

    fn method_idx(&self, id: MethodId) -> Result<u32, EncodeError> {
        self.method_index(id).ok_or(unindexed(IdKind::Method, id.as_u32()))
    }
}

impl<T: OutputIndex + ?Sized> OutputIndexExt for T {}

fn unindexed(kind: IdKind, handle: u32) -> EncodeError {
    EncodeError::Unindexed { kind, handle }
}

/// Entities collected by gather passes, in visit order, duplicates allowed.
#[derive(Clone, Debug, Default)]
pub struct Gathered {
    pub strings: Vec<StringId>,
    pub types: Vec<TypeId>,
    pub protos: Vec<ProtoId>,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
}

impl Gathered {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything the given classes reference, closed over what the
    /// references themselves need: member keys, prototypes and the names of
    /// every type.
    pub fn from_classes(ctx: &DexContext, classes: &[DexClass]) -> Self {
        let mut g = Self::new();
        for class in classes {
            class.gather_strings(ctx, &mut g.strings);
            class.gather_types(ctx, &mut g.types);
            class.gather_fields(ctx, &mut g.fields);
            class.gather_methods(ctx, &mut g.methods);
            class.gather_protos(ctx, &mut g.protos);
        }

        for &field in &g.fields {
            let field = ctx.field(field);
            field.gather_types_shallow(&mut g.types);
            field.gather_strings_shallow(&mut g.strings);
        }
        for &method in &g.methods {
            let (class, name, proto) = ctx.method_key(method);
            g.types.push(class);
            g.strings.push(name);
            g.protos.push(proto);
        }
        for &proto in &g.protos {
            ctx.gather_proto_types(proto, &mut g.types);
            ctx.gather_proto_strings(proto, &mut g.strings);
        }
        for &ty in &g.types {
            g.strings.push(ctx.type_name(ty));
        }
        g
    }
}

/// Plain map implementation of [`OutputIndex`].
#[derive(Clone, Debug, Default)]
pub struct OutputIdx {
    strings: HashMap<StringId, u32>,
    types: HashMap<TypeId, u32>,
    protos: HashMap<ProtoId, u32>,
    fields: HashMap<FieldId, u32>,
    methods: HashMap<MethodId, u32>,
}

impl OutputIdx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dedupe each kind, sort it in dex order and number it densely from 0.
    pub fn build(ctx: &DexContext, gathered: &Gathered) -> Self {
        let idx = Self {
            strings: numbered(&gathered.strings, |v| ctx.sort_strings(v)),
            types: numbered(&gathered.types, |v| ctx.sort_types(v)),
            protos: numbered(&gathered.protos, |v| ctx.sort_protos(v)),
            fields: numbered(&gathered.fields, |v| ctx.sort_fields(v)),
            methods: numbered(&gathered.methods, |v| ctx.sort_methods(v)),
        };
        tracing::debug!(
            strings = idx.strings.len(),
            types = idx.types.len(),
            protos = idx.protos.len(),
            fields = idx.fields.len(),
            methods = idx.methods.len(),
            "built output index"
        );
        idx
    }

    pub fn insert_string(&mut self, id: StringId, index: u32) {
        self.strings.insert(id, index);
    }

    pub fn insert_type(&mut self, id: TypeId, index: u32) {
        self.types.insert(id, index);
    }

    pub fn insert_proto(&mut self, id: ProtoId, index: u32) {
        self.protos.insert(id, index);
    }

    pub fn insert_field(&mut self, id: FieldId, index: u32) {
        self.fields.insert(id, index);
    }

    pub fn insert_method(&mut self, id: MethodId, index: u32) {
        self.methods.insert(id, index);
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

fn numbered<T: Copy + Eq + Hash>(items: &[T], sort: impl FnOnce(&mut [T])) -> HashMap<T, u32> {
    let unique: IndexSet<T> = items.iter().copied().collect();
    let mut sorted: Vec<T> = unique.into_iter().collect();
    sort(&mut sorted);
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, item)| (item, i as u32))
        .collect()
}

impl OutputIndex for OutputIdx {
    fn string_index(&self, id: StringId) -> Option<u32> {
        self.strings.get(&id).copied()
    }

    fn type_index(&self, id: TypeId) -> Option<u32> {
        self.types.get(&id).copied()
    }

    fn proto_index(&self, id: ProtoId) -> Option<u32> {
        self.protos.get(&id).copied()
    }

    fn field_index(&self, id: FieldId) -> Option<u32> {
        self.fields.get(&id).copied()
    }

    fn method_index(&self, id: MethodId) -> Option<u32> {
        self.methods.get(&id).copied()
    }
}
