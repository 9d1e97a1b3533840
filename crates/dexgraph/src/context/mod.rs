//! The interning authority.
//!
//! [`DexContext`] owns one arena per canonical entity kind and hands out
//! `Copy` handles into them. `make_*` creates on first use and returns the
//! existing handle afterwards; `get_*` only looks up.
//!
//! Each table sits behind its own `RwLock`. A call holds at most one table
//! lock at a time, so tables never wait on each other. Creation checks under
//! the read lock first and re-checks under the write lock, which keeps the
//! common hit path shared.

mod members;
mod signatures;


use std::borrow::Borrow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::sync::Arc;

use dexgraph_core::mutf8;
use parking_lot::RwLock;

use crate::field::DexField;
use crate::invariants;
use crate::method::DexMethod;
use crate::{DexProto, DexString, IdKind, ProtoId, StringId, TypeId, TypeListId};

/// Key → index map plus the arena the indices point into.
#[derive(Debug)]
pub(crate) struct InternTable<K, V> {
    map: HashMap<K, u32>,
    entries: Vec<V>,
}

impl<K, V> Default for InternTable<K, V> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash, V> InternTable<K, V> {
    pub(crate) fn lookup<Q>(&self, key: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).copied()
    }

    /// Index for `key`, creating the entry with `make` if absent.
    /// The flag is `true` when a new entry was created.
    pub(crate) fn intern(&mut self, kind: IdKind, key: K, make: impl FnOnce(u32) -> V) -> (u32, bool) {
        let Self { map, entries } = self;
        match map.entry(key) {
            Entry::Occupied(e) => (*e.get(), false),
            Entry::Vacant(e) => {
                let index = u32::try_from(entries.len())
                    .unwrap_or_else(|_| panic!("{kind} table exceeds u32 handles"));
                entries.push(make(index));
                e.insert(index);
                (index, true)
            }
        }
    }

    /// Move entry `index` from `old` to `new`, mutating it in between.
    ///
    /// Panics without touching the table if `new` already names another entry.
    pub(crate) fn rekey(&mut self, kind: IdKind, index: u32, old: &K, new: K, mutate: impl FnOnce(&mut V)) {
        if let Some(&owner) = self.map.get(&new)
            && owner != index
        {
            invariants::rekey_collision(kind, index, owner);
        }
        self.map.remove(old);
        mutate(&mut self.entries[index as usize]);
        self.map.insert(new, index);
    }

    #[inline]
    pub(crate) fn entry(&self, index: usize) -> &V {
        &self.entries[index]
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut V {
        &mut self.entries[index]
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Canonical-entity registry for one graph of dex classes.
///
/// Pass it explicitly to every call site that creates or looks up entities.
/// Independent contexts share nothing, so handles from one context are
/// meaningless in another.
#[derive(Debug, Default)]
pub struct DexContext {
    strings: RwLock<InternTable<Arc<[u8]>, DexString>>,
    types: RwLock<InternTable<StringId, StringId>>,
    type_lists: RwLock<InternTable<Arc<[TypeId]>, Arc<[TypeId]>>>,
    protos: RwLock<InternTable<(TypeId, TypeListId), DexProto>>,
    fields: RwLock<InternTable<(TypeId, StringId, TypeId), DexField>>,
    methods: RwLock<InternTable<(TypeId, StringId, ProtoId), DexMethod>>,
}

impl DexContext {
    pub fn new() -> Self {
        Self::default()
    }

    // Strings

    /// Intern `s`, converting it to MUTF-8.
    pub fn make_string(&self, s: &str) -> StringId {
        let bytes = mutf8::encode(s);
        self.make_string_mutf8(&bytes, mutf8::utf16_len(s))
    }

    /// Intern raw MUTF-8 bytes (no terminator) with their UTF-16 length.
    ///
    /// The length is trusted; it is what gets written as the string's size.
    pub fn make_string_mutf8(&self, bytes: &[u8], utf16_size: u32) -> StringId {
        if let Some(index) = self.strings.read().lookup(bytes) {
            return StringId::new(index);
        }
        let key: Arc<[u8]> = Arc::from(bytes);
        let (index, created) = self.strings.write().intern(IdKind::String, key.clone(), |_| {
            DexString::new(key, utf16_size)
        });
        if created {
            tracing::trace!(index, utf16_size, "interned string");
        }
        StringId::new(index)
    }

    pub fn get_string(&self, s: &str) -> Option<StringId> {
        self.get_string_mutf8(&mutf8::encode(s))
    }

    pub fn get_string_mutf8(&self, bytes: &[u8]) -> Option<StringId> {
        self.strings.read().lookup(bytes).map(StringId::new)
    }

    /// The string behind `id`. Cheap: the bytes are shared.
    pub fn string(&self, id: StringId) -> DexString {
        self.strings.read().entry(id.index()).clone()
    }

    /// Every interned string, in creation order.
    pub fn all_strings(&self) -> Vec<StringId> {
        (0..self.string_count() as u32).map(StringId::new).collect()
    }

    pub fn string_count(&self) -> usize {
        self.strings.read().len()
    }

    // Types

    pub fn make_type(&self, name: StringId) -> TypeId {
        if let Some(index) = self.types.read().lookup(&name) {
            return TypeId::new(index);
        }
        let (index, created) = self.types.write().intern(IdKind::Type, name, |_| name);
        if created {
            tracing::trace!(index, name = name.as_u32(), "interned type");
        }
        TypeId::new(index)
    }

    /// Intern the type with descriptor `descriptor`, e.g. `"Ljava/lang/Object;"`.
    pub fn make_type_named(&self, descriptor: &str) -> TypeId {
        self.make_type(self.make_string(descriptor))
    }

    pub fn get_type(&self, name: StringId) -> Option<TypeId> {
        self.types.read().lookup(&name).map(TypeId::new)
    }

    pub fn get_type_named(&self, descriptor: &str) -> Option<TypeId> {
        self.get_string(descriptor).and_then(|name| self.get_type(name))
    }

    /// Descriptor string of `ty`.
    pub fn type_name(&self, ty: TypeId) -> StringId {
        *self.types.read().entry(ty.index())
    }

    /// Rename `ty` to `new_name`, keeping its handle.
    ///
    /// After the call, lookups by the old name miss and lookups by the new
    /// name return `ty`. Panics if another type already has `new_name`.
    pub fn alias_type_name(&self, ty: TypeId, new_name: StringId) {
        let mut types = self.types.write();
        let old_name = *types.entry(ty.index());
        if old_name == new_name {
            return;
        }
        types.rekey(IdKind::Type, ty.as_u32(), &old_name, new_name, |name| *name = new_name);
        drop(types);
        tracing::debug!(
            ty = ty.as_u32(),
            old = old_name.as_u32(),
            new = new_name.as_u32(),
            "aliased type name"
        );
    }

    /// Every interned type, in creation order.
    pub fn all_types(&self) -> Vec<TypeId> {
        (0..self.type_count() as u32).map(TypeId::new).collect()
    }

    pub fn type_count(&self) -> usize {
        self.types.read().len()
    }

    /// Descriptor bytes of `ty`. Takes the type and string locks in turn.
    pub(crate) fn type_descriptor(&self, ty: TypeId) -> DexString {
        self.string(self.type_name(ty))
    }
}
