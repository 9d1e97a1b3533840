//! Dex canonical ordering.
//!
//! Every comparator returns [`Ordering`]; `Equal` means the two sides are the
//! same value, which for interned entities means the same handle. Ordering is
//! only used for layout and never for interning.

use std::cmp::Ordering;

use dexgraph_core::mutf8;

use crate::{DexContext, DexString, FieldId, MethodId, ProtoId, StringId, TypeId, TypeListId};

/// Order two strings the way dex sorts its string table.
///
/// Strings made of single-byte characters compare by bytes. Otherwise the
/// MUTF-8 sequences are decoded in lockstep and the first differing value
/// decides; a strict prefix sorts first.
pub fn compare_dex_strings(a: &DexString, b: &DexString) -> Ordering {
    if a.is_simple() && b.is_simple() {
        return a.as_bytes().cmp(b.as_bytes());
    }
    mutf8::code_points(a.as_bytes()).cmp(mutf8::code_points(b.as_bytes()))
}

impl DexContext {
    pub fn compare_strings(&self, a: StringId, b: StringId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        compare_dex_strings(&self.string(a), &self.string(b))
    }

    /// By descriptor.
    pub fn compare_types(&self, a: TypeId, b: TypeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.compare_strings(self.type_name(a), self.type_name(b))
    }

    /// Element by element; a strict prefix sorts first.
    pub fn compare_type_lists(&self, a: TypeListId, b: TypeListId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let (a, b) = (self.type_list(a), self.type_list(b));
        for (&x, &y) in a.iter().zip(b.iter()) {
            match self.compare_types(x, y) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        a.len().cmp(&b.len())
    }

    /// Return type, then arguments.
    pub fn compare_protos(&self, a: ProtoId, b: ProtoId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let (a, b) = (self.proto(a), self.proto(b));
        self.compare_types(a.rtype(), b.rtype())
            .then_with(|| self.compare_type_lists(a.args(), b.args()))
    }

    /// Declaring class, name, type.
    pub fn compare_fields(&self, a: FieldId, b: FieldId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let (a, b) = (self.field_key(a), self.field_key(b));
        self.compare_types(a.0, b.0)
            .then_with(|| self.compare_strings(a.1, b.1))
            .then_with(|| self.compare_types(a.2, b.2))
    }

    /// Declaring class, name, proto.
    pub fn compare_methods(&self, a: MethodId, b: MethodId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let (a, b) = (self.method_key(a), self.method_key(b));
        self.compare_types(a.0, b.0)
            .then_with(|| self.compare_strings(a.1, b.1))
            .then_with(|| self.compare_protos(a.2, b.2))
    }

    pub fn sort_strings(&self, items: &mut [StringId]) {
        items.sort_by(|&a, &b| self.compare_strings(a, b));
    }

    pub fn sort_types(&self, items: &mut [TypeId]) {
        items.sort_by(|&a, &b| self.compare_types(a, b));
    }

    pub fn sort_protos(&self, items: &mut [ProtoId]) {
        items.sort_by(|&a, &b| self.compare_protos(a, b));
    }

    pub fn sort_fields(&self, items: &mut [FieldId]) {
        items.sort_by(|&a, &b| self.compare_fields(a, b));
    }

    pub fn sort_methods(&self, items: &mut [MethodId]) {
        items.sort_by(|&a, &b| self.compare_methods(a, b));
    }
}
