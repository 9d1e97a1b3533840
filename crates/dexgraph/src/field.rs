//! Field references and definitions.

use crate::annotation::DexAnnotationSet;
use crate::value::EncodedValue;
use crate::{AccessFlags, FieldId, MethodId, ProtoId, StringId, TypeId};

/// A canonical field.
///
/// The `(class, name, type)` key makes it a reference. Loading a class that
/// declares it makes it *concrete*; marking it *external* records that it is
/// declared outside the classes being written. Either way the access flags
/// become readable and the field stops accepting annotations.
#[derive(Debug)]
pub struct DexField {
    id: FieldId,
    class: TypeId,
    name: StringId,
    ty: TypeId,
    access: AccessFlags,
    static_value: Option<EncodedValue>,
    annotations: Option<DexAnnotationSet>,
    concrete: bool,
    external: bool,
}

impl DexField {
    pub(crate) fn new(id: FieldId, class: TypeId, name: StringId, ty: TypeId) -> Self {
        Self {
            id,
            class,
            name,
            ty,
            access: AccessFlags::empty(),
            static_value: None,
            annotations: None,
            concrete: false,
            external: false,
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Declaring class.
    pub fn class(&self) -> TypeId {
        self.class
    }

    pub fn name(&self) -> StringId {
        self.name
    }

    pub fn field_type(&self) -> TypeId {
        self.ty
    }

    pub fn is_concrete(&self) -> bool {
        self.concrete
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Panics on a bare reference.
    pub fn access(&self) -> AccessFlags {
        self.ensure_defined();
        self.access
    }

    pub fn set_access(&mut self, access: AccessFlags) {
        self.ensure_not_external("change access flags");
        self.access = access;
    }

    pub fn static_value(&self) -> Option<&EncodedValue> {
        self.static_value.as_ref()
    }

    pub fn annotations(&self) -> Option<&DexAnnotationSet> {
        self.annotations.as_ref()
    }

    pub fn set_external(&mut self) {
        self.ensure_undefined("mark it external");
        self.external = true;
    }

    /// Back the reference with a definition.
    pub fn make_concrete(&mut self, access: AccessFlags, static_value: Option<EncodedValue>) {
        self.ensure_undefined("make it concrete");
        self.access = access;
        self.static_value = static_value;
        self.concrete = true;
    }

    /// Attach the field's annotations. Allowed once, before the field is
    /// defined.
    pub fn attach_annotation_set(&mut self, set: DexAnnotationSet) {
        self.ensure_undefined("attach annotations");
        assert!(
            self.annotations.is_none(),
            "field {:?} already has annotations",
            self.id
        );
        self.annotations = Some(set);
    }

    pub fn clear_annotations(&mut self) {
        self.ensure_not_external("clear annotations");
        self.annotations = None;
    }

    /// Declaring class and field type.
    pub fn gather_types_shallow(&self, out: &mut Vec<TypeId>) {
        out.push(self.class);
        out.push(self.ty);
    }

    pub fn gather_strings_shallow(&self, out: &mut Vec<StringId>) {
        out.push(self.name);
    }

    pub fn gather_types(&self, out: &mut Vec<TypeId>) {
        self.gather_types_shallow(out);
        if let Some(value) = &self.static_value {
            value.gather_types(out);
        }
        if let Some(set) = &self.annotations {
            set.gather_types(out);
        }
    }

    pub fn gather_strings(&self, out: &mut Vec<StringId>) {
        self.gather_strings_shallow(out);
        if let Some(value) = &self.static_value {
            value.gather_strings(out);
        }
        if let Some(set) = &self.annotations {
            set.gather_strings(out);
        }
    }

    /// Fields referenced from the static value and annotations.
    pub fn gather_fields(&self, out: &mut Vec<FieldId>) {
        if let Some(value) = &self.static_value {
            value.gather_fields(out);
        }
        if let Some(set) = &self.annotations {
            set.gather_fields(out);
        }
    }

    pub fn gather_methods(&self, out: &mut Vec<MethodId>) {
        if let Some(value) = &self.static_value {
            value.gather_methods(out);
        }
        if let Some(set) = &self.annotations {
            set.gather_methods(out);
        }
    }

    /// Prototypes named by method-type constants.
    pub fn gather_protos(&self, out: &mut Vec<ProtoId>) {
        if let Some(value) = &self.static_value {
            value.gather_protos(out);
        }
        if let Some(set) = &self.annotations {
            set.gather_protos(out);
        }
    }
}
