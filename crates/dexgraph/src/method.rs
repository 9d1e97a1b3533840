//! Method references and definitions.

use std::collections::BTreeMap;

use crate::annotation::{DexAnnotationSet, ParamAnnotations};
use crate::code::DexCode;
use crate::{AccessFlags, DexContext, FieldId, MethodId, ProtoId, StringId, TypeId};

/// A canonical method.
///
/// Keyed by `(class, name, proto)`. Class and proto can change after
/// creation, but only through [`DexContext::change_method_class`] and
/// [`DexContext::change_method_proto`], which re-key the method table.
#[derive(Debug)]
pub struct DexMethod {
    id: MethodId,
    class: TypeId,
    name: StringId,
    proto: ProtoId,
    access: AccessFlags,
    is_virtual: bool,
    code: Option<Box<DexCode>>,
    annotations: Option<DexAnnotationSet>,
    param_annotations: ParamAnnotations,
    concrete: bool,
    external: bool,
}

impl DexMethod {
    pub(crate) fn new(id: MethodId, class: TypeId, name: StringId, proto: ProtoId) -> Self {
        Self {
            id,
            class,
            name,
            proto,
            access: AccessFlags::empty(),
            is_virtual: false,
            code: None,
            annotations: None,
            param_annotations: BTreeMap::new(),
            concrete: false,
            external: false,
        }
    }

    pub fn id(&self) -> MethodId {
        self.id
    }

    pub fn class(&self) -> TypeId {
        self.class
    }

    pub fn name(&self) -> StringId {
        self.name
    }

    pub fn proto(&self) -> ProtoId {
        self.proto
    }

    pub(crate) fn set_class(&mut self, class: TypeId) {
        self.class = class;
    }

    pub(crate) fn set_proto(&mut self, proto: ProtoId) {
        self.proto = proto;
    }

    pub fn is_concrete(&self) -> bool {
        self.concrete
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
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

    pub fn set_virtual(&mut self, is_virtual: bool) {
        self.ensure_not_external("change its dispatch kind");
        self.is_virtual = is_virtual;
    }

    pub fn code(&self) -> Option<&DexCode> {
        self.code.as_deref()
    }

    pub fn code_mut(&mut self) -> Option<&mut DexCode> {
        self.code.as_deref_mut()
    }

    pub fn set_code(&mut self, code: Option<DexCode>) {
        self.ensure_not_external("replace its code");
        self.code = code.map(Box::new);
    }

    pub fn take_code(&mut self) -> Option<DexCode> {
        self.ensure_not_external("take its code");
        self.code.take().map(|code| *code)
    }

    pub fn annotations(&self) -> Option<&DexAnnotationSet> {
        self.annotations.as_ref()
    }

    /// `None` when no parameter carries annotations.
    pub fn param_annotations(&self) -> Option<&ParamAnnotations> {
        if self.param_annotations.is_empty() {
            None
        } else {
            Some(&self.param_annotations)
        }
    }

    pub fn set_external(&mut self) {
        self.ensure_undefined("mark it external");
        self.external = true;
    }

    /// Back the reference with a definition.
    pub fn make_concrete(&mut self, access: AccessFlags, code: Option<DexCode>, is_virtual: bool) {
        self.ensure_undefined("make it concrete");
        self.access = access;
        self.code = code.map(Box::new);
        self.is_virtual = is_virtual;
        self.concrete = true;
    }

    pub fn attach_annotation_set(&mut self, set: DexAnnotationSet) {
        self.ensure_undefined("attach annotations");
        assert!(
            self.annotations.is_none(),
            "method {:?} already has annotations",
            self.id
        );
        self.annotations = Some(set);
    }

    pub fn attach_param_annotation_set(&mut self, param: u16, set: DexAnnotationSet) {
        self.ensure_undefined("attach parameter annotations");
        assert!(
            !self.param_annotations.contains_key(&param),
            "method {:?} already has annotations on parameter {param}",
            self.id
        );
        self.param_annotations.insert(param, set);
    }

    pub fn clear_annotations(&mut self) {
        self.ensure_not_external("clear annotations");
        self.annotations = None;
        self.param_annotations.clear();
    }

    /// Declaring class, then return and argument types.
    pub fn gather_types_shallow(&self, ctx: &DexContext, out: &mut Vec<TypeId>) {
        out.push(self.class);
        ctx.gather_proto_types(self.proto, out);
    }

    /// Name, then shorty.
    pub fn gather_strings_shallow(&self, ctx: &DexContext, out: &mut Vec<StringId>) {
        out.push(self.name);
        ctx.gather_proto_strings(self.proto, out);
    }

    pub fn gather_types(&self, ctx: &DexContext, out: &mut Vec<TypeId>) {
        self.gather_types_shallow(ctx, out);
        if let Some(code) = &self.code {
            code.gather_types(out);
        }
        self.annotation_sets().for_each(|set| set.gather_types(out));
    }

    pub fn gather_strings(&self, ctx: &DexContext, out: &mut Vec<StringId>) {
        self.gather_strings_shallow(ctx, out);
        if let Some(code) = &self.code {
            code.gather_strings(out);
        }
        self.annotation_sets().for_each(|set| set.gather_strings(out));
    }

    pub fn gather_fields(&self, out: &mut Vec<FieldId>) {
        if let Some(code) = &self.code {
            code.gather_fields(out);
        }
        self.annotation_sets().for_each(|set| set.gather_fields(out));
    }

    pub fn gather_methods(&self, out: &mut Vec<MethodId>) {
        if let Some(code) = &self.code {
            code.gather_methods(out);
        }
        self.annotation_sets().for_each(|set| set.gather_methods(out));
    }

    /// Prototypes named by annotation values. The method's own proto is
    /// not included.
    pub fn gather_protos(&self, out: &mut Vec<ProtoId>) {
        self.annotation_sets().for_each(|set| set.gather_protos(out));
    }

    /// Method annotations, then parameter annotations by parameter index.
    fn annotation_sets(&self) -> impl Iterator<Item = &DexAnnotationSet> {
        self.annotations.iter().chain(self.param_annotations.values())
    }
}
