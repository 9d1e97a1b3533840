//! Field and method references, and method re-keying.

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard};

use super::DexContext;
use crate::field::DexField;
use crate::method::DexMethod;
use crate::{FieldId, IdKind, MethodId, ProtoId, StringId, TypeId};

impl DexContext {
    // Fields

    /// Intern the field reference `class.name:ty`.
    pub fn make_field(&self, class: TypeId, name: StringId, ty: TypeId) -> FieldId {
        let key = (class, name, ty);
        if let Some(index) = self.fields.read().lookup(&key) {
            return FieldId::new(index);
        }
        let (index, created) = self.fields.write().intern(IdKind::Field, key, |index| {
            DexField::new(FieldId::new(index), class, name, ty)
        });
        if created {
            tracing::trace!(index, "interned field");
        }
        FieldId::new(index)
    }

    pub fn get_field(&self, class: TypeId, name: StringId, ty: TypeId) -> Option<FieldId> {
        self.fields.read().lookup(&(class, name, ty)).map(FieldId::new)
    }

    /// Shared access to a field. Holds the field table's read lock.
    pub fn field(&self, id: FieldId) -> MappedRwLockReadGuard<'_, DexField> {
        RwLockReadGuard::map(self.fields.read(), |t| t.entry(id.index()))
    }

    /// Exclusive access to a field's definition state. Holds the field
    /// table's write lock, so no other field can be made or read meanwhile.
    pub fn field_mut(&self, id: FieldId) -> MappedRwLockWriteGuard<'_, DexField> {
        RwLockWriteGuard::map(self.fields.write(), |t| t.entry_mut(id.index()))
    }

    /// `(class, name, type)` of `id`.
    pub fn field_key(&self, id: FieldId) -> (TypeId, StringId, TypeId) {
        let field = self.field(id);
        (field.class(), field.name(), field.field_type())
    }

    pub fn field_count(&self) -> usize {
        self.fields.read().len()
    }

    // Methods

    /// Intern the method reference `class.name proto`.
    pub fn make_method(&self, class: TypeId, name: StringId, proto: ProtoId) -> MethodId {
        let key = (class, name, proto);
        if let Some(index) = self.methods.read().lookup(&key) {
            return MethodId::new(index);
        }
        let (index, created) = self.methods.write().intern(IdKind::Method, key, |index| {
            DexMethod::new(MethodId::new(index), class, name, proto)
        });
        if created {
            tracing::trace!(index, "interned method");
        }
        MethodId::new(index)
    }

    /// Intern a method from descriptors, creating every piece on the way.
    pub fn make_method_from_descriptors(
        &self,
        class: &str,
        name: &str,
        rtype: &str,
        args: &[&str],
    ) -> MethodId {
        let class = self.make_type_named(class);
        let name = self.make_string(name);
        let rtype = self.make_type_named(rtype);
        let args = args.iter().map(|d| self.make_type_named(d)).collect();
        let proto = self.make_proto(rtype, self.make_type_list(args));
        self.make_method(class, name, proto)
    }

    pub fn get_method(&self, class: TypeId, name: StringId, proto: ProtoId) -> Option<MethodId> {
        self.methods.read().lookup(&(class, name, proto)).map(MethodId::new)
    }

    /// Shared access to a method. Holds the method table's read lock.
    pub fn method(&self, id: MethodId) -> MappedRwLockReadGuard<'_, DexMethod> {
        RwLockReadGuard::map(self.methods.read(), |t| t.entry(id.index()))
    }

    /// Exclusive access to a method's definition state. Holds the method
    /// table's write lock.
    pub fn method_mut(&self, id: MethodId) -> MappedRwLockWriteGuard<'_, DexMethod> {
        RwLockWriteGuard::map(self.methods.write(), |t| t.entry_mut(id.index()))
    }

    /// `(class, name, proto)` of `id`.
    pub fn method_key(&self, id: MethodId) -> (TypeId, StringId, ProtoId) {
        let method = self.method(id);
        (method.class(), method.name(), method.proto())
    }

    pub fn method_count(&self) -> usize {
        self.methods.read().len()
    }

    /// Move `method` to `new_class`, keeping its handle.
    ///
    /// Panics if `new_class` already has a method with the same name and
    /// prototype.
    pub fn change_method_class(&self, method: MethodId, new_class: TypeId) {
        let mut methods = self.methods.write();
        let old @ (class, name, proto) = key_of(methods.entry(method.index()));
        if class == new_class {
            return;
        }
        methods.rekey(IdKind::Method, method.as_u32(), &old, (new_class, name, proto), |m| {
            m.set_class(new_class)
        });
        drop(methods);
        tracing::debug!(
            method = method.as_u32(),
            old = class.as_u32(),
            new = new_class.as_u32(),
            "moved method to another class"
        );
    }

    /// Give `method` the prototype `new_proto`, keeping its handle.
    ///
    /// Panics if the class already has a method with the same name and
    /// `new_proto`.
    pub fn change_method_proto(&self, method: MethodId, new_proto: ProtoId) {
        let mut methods = self.methods.write();
        let old @ (class, name, proto) = key_of(methods.entry(method.index()));
        if proto == new_proto {
            return;
        }
        methods.rekey(IdKind::Method, method.as_u32(), &old, (class, name, new_proto), |m| {
            m.set_proto(new_proto)
        });
        drop(methods);
        tracing::debug!(
            method = method.as_u32(),
            old = proto.as_u32(),
            new = new_proto.as_u32(),
            "changed method proto"
        );
    }
}

fn key_of(method: &DexMethod) -> (TypeId, StringId, ProtoId) {
    (method.class(), method.name(), method.proto())
}
