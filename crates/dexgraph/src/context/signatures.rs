//! Type lists and prototypes.

use std::sync::Arc;

use super::DexContext;
use crate::proto::shorty_char;
use crate::{DexProto, IdKind, ProtoId, StringId, TypeId, TypeListId};

impl DexContext {
    pub fn make_type_list(&self, types: Vec<TypeId>) -> TypeListId {
        if let Some(index) = self.type_lists.read().lookup(types.as_slice()) {
            return TypeListId::new(index);
        }
        let list: Arc<[TypeId]> = types.into();
        let len = list.len();
        let (index, created) = self
            .type_lists
            .write()
            .intern(IdKind::TypeList, list.clone(), |_| list);
        if created {
            tracing::trace!(index, len, "interned type list");
        }
        TypeListId::new(index)
    }

    pub fn get_type_list(&self, types: &[TypeId]) -> Option<TypeListId> {
        self.type_lists.read().lookup(types).map(TypeListId::new)
    }

    pub fn type_list(&self, id: TypeListId) -> Arc<[TypeId]> {
        self.type_lists.read().entry(id.index()).clone()
    }

    /// Intern the prototype `rtype (args)`, deriving its shorty.
    pub fn make_proto(&self, rtype: TypeId, args: TypeListId) -> ProtoId {
        if let Some(proto) = self.get_proto(rtype, args) {
            return proto;
        }
        let shorty = self.make_shorty(rtype, args);
        self.make_proto_with_shorty(rtype, args, shorty)
    }

    /// Intern a prototype with a caller-supplied shorty.
    ///
    /// The shorty is a function of `rtype` and `args`; when the prototype
    /// already exists its stored shorty is kept.
    pub fn make_proto_with_shorty(&self, rtype: TypeId, args: TypeListId, shorty: StringId) -> ProtoId {
        let key = (rtype, args);
        if let Some(index) = self.protos.read().lookup(&key) {
            return ProtoId::new(index);
        }
        let (index, created) = self.protos.write().intern(IdKind::Proto, key, |_| DexProto {
            rtype,
            args,
            shorty,
        });
        if created {
            tracing::trace!(index, shorty = shorty.as_u32(), "interned proto");
        }
        ProtoId::new(index)
    }

    pub fn get_proto(&self, rtype: TypeId, args: TypeListId) -> Option<ProtoId> {
        self.protos.read().lookup(&(rtype, args)).map(ProtoId::new)
    }

    pub fn proto(&self, id: ProtoId) -> DexProto {
        *self.protos.read().entry(id.index())
    }

    pub fn proto_count(&self) -> usize {
        self.protos.read().len()
    }

    fn make_shorty(&self, rtype: TypeId, args: TypeListId) -> StringId {
        let args = self.type_list(args);
        let shorty: Vec<u8> = std::iter::once(rtype)
            .chain(args.iter().copied())
            .map(|ty| shorty_char(self.type_descriptor(ty).as_bytes()))
            .collect();
        self.make_string_mutf8(&shorty, shorty.len() as u32)
    }

    pub fn gather_type_list_types(&self, list: TypeListId, out: &mut Vec<TypeId>) {
        out.extend(self.type_list(list).iter().copied());
    }

    /// Return type, then argument types.
    pub fn gather_proto_types(&self, proto: ProtoId, out: &mut Vec<TypeId>) {
        let proto = self.proto(proto);
        out.push(proto.rtype);
        self.gather_type_list_types(proto.args, out);
    }

    pub fn gather_proto_strings(&self, proto: ProtoId, out: &mut Vec<StringId>) {
        out.push(self.proto(proto).shorty);
    }
}
