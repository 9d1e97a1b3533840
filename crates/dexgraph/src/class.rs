//! Classes: the unit that is either defined here or external.

use std::collections::HashSet;

use dexgraph_core::{ByteReader, NO_INDEX, ReadError};

use crate::annotation::{DexAnnotationDirectory, DexAnnotationSet};
use crate::code::DexCode;
use crate::error::LoadError;
use crate::index::DexIdx;
use crate::value::EncodedValue;
use crate::{AccessFlags, DexContext, FieldId, MethodId, ProtoId, StringId, TypeId, TypeListId};

/// A raw `class_def_item`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassDef {
    pub class_idx: u32,
    pub access_flags: u32,
    pub superclass_idx: u32,
    pub interfaces_off: u32,
    pub source_file_idx: u32,
    pub annotations_off: u32,
    pub class_data_off: u32,
    pub static_values_off: u32,
}

impl ClassDef {
    pub const SIZE: usize = 32;

    /// Decode the item at the start of `bytes`.
    pub fn read(bytes: &[u8]) -> Result<Self, ReadError> {
        let mut r = ByteReader::new(bytes);
        Ok(Self {
            class_idx: r.read_u32()?,
            access_flags: r.read_u32()?,
            superclass_idx: r.read_u32()?,
            interfaces_off: r.read_u32()?,
            source_file_idx: r.read_u32()?,
            annotations_off: r.read_u32()?,
            class_data_off: r.read_u32()?,
            static_values_off: r.read_u32()?,
        })
    }
}

/// A class and its member lists.
///
/// Member lists are kept in caller order; the encoder sorts copies of them.
/// An external class only names its members: its lists are read-only until
/// [`make_defined`](Self::make_defined) is called.
#[derive(Clone, Debug)]
pub struct DexClass {
    access: AccessFlags,
    super_class: Option<TypeId>,
    self_type: TypeId,
    interfaces: Option<TypeListId>,
    source_file: Option<StringId>,
    annotations: Option<DexAnnotationSet>,
    static_fields: Vec<FieldId>,
    instance_fields: Vec<FieldId>,
    direct_methods: Vec<MethodId>,
    virtual_methods: Vec<MethodId>,
    has_class_data: bool,
    external: bool,
}

impl DexClass {
    /// A fresh class defined here, with no members yet and a class data
    /// item to hold them.
    pub fn new(self_type: TypeId, access: AccessFlags, super_class: Option<TypeId>) -> Self {
        Self {
            access,
            super_class,
            self_type,
            interfaces: None,
            source_file: None,
            annotations: None,
            static_fields: Vec::new(),
            instance_fields: Vec::new(),
            direct_methods: Vec::new(),
            virtual_methods: Vec::new(),
            has_class_data: true,
            external: false,
        }
    }

    /// A class defined outside the set being written.
    pub fn new_external(self_type: TypeId) -> Self {
        Self {
            has_class_data: false,
            external: true,
            ..Self::new(self_type, AccessFlags::empty(), None)
        }
    }

    /// Turn an external class into one defined here. Allowed once.
    pub fn make_defined(&mut self, access: AccessFlags, super_class: Option<TypeId>) {
        self.ensure_external();
        self.access = access;
        self.super_class = super_class;
        self.has_class_data = true;
        self.external = false;
    }

    pub fn access(&self) -> AccessFlags {
        self.access
    }

    pub fn super_class(&self) -> Option<TypeId> {
        self.super_class
    }

    pub fn self_type(&self) -> TypeId {
        self.self_type
    }

    pub fn interfaces(&self) -> Option<TypeListId> {
        self.interfaces
    }

    pub fn source_file(&self) -> Option<StringId> {
        self.source_file
    }

    pub fn annotations(&self) -> Option<&DexAnnotationSet> {
        self.annotations.as_ref()
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Whether the class carries a `class_data_item`, possibly an empty one.
    /// A loaded class has one iff its definition gave a class data offset.
    pub fn has_class_data(&self) -> bool {
        self.has_class_data
    }

    pub fn set_has_class_data(&mut self, has_class_data: bool) {
        self.ensure_mutable();
        self.has_class_data = has_class_data;
    }

    pub fn static_fields(&self) -> &[FieldId] {
        &self.static_fields
    }

    pub fn instance_fields(&self) -> &[FieldId] {
        &self.instance_fields
    }

    pub fn direct_methods(&self) -> &[MethodId] {
        &self.direct_methods
    }

    pub fn virtual_methods(&self) -> &[MethodId] {
        &self.virtual_methods
    }

    pub fn static_fields_mut(&mut self) -> &mut Vec<FieldId> {
        self.ensure_mutable();
        &mut self.static_fields
    }

    pub fn instance_fields_mut(&mut self) -> &mut Vec<FieldId> {
        self.ensure_mutable();
        &mut self.instance_fields
    }

    pub fn direct_methods_mut(&mut self) -> &mut Vec<MethodId> {
        self.ensure_mutable();
        &mut self.direct_methods
    }

    pub fn virtual_methods_mut(&mut self) -> &mut Vec<MethodId> {
        self.ensure_mutable();
        &mut self.virtual_methods
    }

    pub fn set_access(&mut self, access: AccessFlags) {
        self.ensure_mutable();
        self.access = access;
    }

    pub fn set_super_class(&mut self, super_class: Option<TypeId>) {
        self.ensure_mutable();
        self.super_class = super_class;
    }

    pub fn set_interfaces(&mut self, interfaces: Option<TypeListId>) {
        self.ensure_mutable();
        self.interfaces = interfaces;
    }

    pub fn set_source_file(&mut self, source_file: Option<StringId>) {
        self.ensure_mutable();
        self.source_file = source_file;
    }

    pub fn set_annotations(&mut self, annotations: Option<DexAnnotationSet>) {
        self.ensure_mutable();
        self.annotations = annotations;
    }

    /// Build a class from its `class_def_item`.
    ///
    /// Every member the class data lists is made concrete, with its static
    /// value, code and annotations. All bytes are decoded before any member is
    /// touched, so a failed load leaves the context's members unchanged.
    pub fn load<I: DexIdx + ?Sized>(ctx: &DexContext, idx: &I, def: &ClassDef) -> Result<Self, LoadError> {
        let self_type = idx.type_at(def.class_idx)?;
        let super_class = match def.superclass_idx {
            NO_INDEX => None,
            index => Some(idx.type_at(index)?),
        };
        let source_file = match def.source_file_idx {
            NO_INDEX => None,
            index => Some(idx.string_at(index)?),
        };
        let interfaces = match def.interfaces_off {
            0 => None,
            off => Some(load_type_list(ctx, idx, off)?),
        };
        let mut dir = DexAnnotationDirectory::load(idx, def.annotations_off)?;
        let static_values = match def.static_values_off {
            0 => Vec::new(),
            off => EncodedValue::read_array(&mut ByteReader::at(idx.data(), off as usize)?, idx)?,
        };
        let data = match def.class_data_off {
            0 => ClassData::default(),
            off => ClassData::load(idx, off)?,
        };

        data.ensure_undefined(ctx)?;
        ensure_unannotated(ctx, &dir)?;

        for (field, set) in dir.fields.drain(..) {
            ctx.field_mut(field).attach_annotation_set(set);
        }
        for (method, set) in dir.methods.drain(..) {
            ctx.method_mut(method).attach_annotation_set(set);
        }
        for (method, params) in dir.params.drain(..) {
            let mut method = ctx.method_mut(method);
            for (param, set) in params {
                method.attach_param_annotation_set(param, set);
            }
        }

        let mut static_values = static_values.into_iter();
        let mut class = Self {
            interfaces,
            source_file,
            annotations: dir.class,
            has_class_data: def.class_data_off != 0,
            ..Self::new(self_type, AccessFlags::from_raw(def.access_flags), super_class)
        };
        for (field, access) in data.static_fields {
            ctx.field_mut(field).make_concrete(access, static_values.next());
            class.static_fields.push(field);
        }
        for (field, access) in data.instance_fields {
            ctx.field_mut(field).make_concrete(access, None);
            class.instance_fields.push(field);
        }
        for (method, access, code) in data.direct_methods {
            ctx.method_mut(method).make_concrete(access, code, false);
            class.direct_methods.push(method);
        }
        for (method, access, code) in data.virtual_methods {
            ctx.method_mut(method).make_concrete(access, code, true);
            class.virtual_methods.push(method);
        }

        tracing::debug!(
            class = self_type.as_u32(),
            fields = class.static_fields.len() + class.instance_fields.len(),
            methods = class.direct_methods.len() + class.virtual_methods.len(),
            "loaded class"
        );
        Ok(class)
    }

    /// Move a direct method to the virtual list and mark it virtual. The
    /// virtual list stays in dex order if it was in dex order.
    ///
    /// Panics if the class is external or `method` is not one of its direct
    /// methods.
    pub fn become_virtual(&mut self, ctx: &DexContext, method: MethodId) {
        self.ensure_mutable();
        let pos = self.ensure_direct_method(method);
        self.direct_methods.remove(pos);
        ctx.method_mut(method).set_virtual(true);
        let at = self
            .virtual_methods
            .partition_point(|&m| ctx.compare_methods(m, method).is_lt());
        self.virtual_methods.insert(at, method);
    }

    /// The `encoded_array` of static field initializers, in dex field order.
    ///
    /// Fields without a value take the zero of their type; trailing zeros
    /// are dropped. `None` when nothing is left.
    pub fn static_values(&self, ctx: &DexContext) -> Option<Vec<EncodedValue>> {
        let mut fields = self.static_fields.clone();
        ctx.sort_fields(&mut fields);
        let mut values: Vec<EncodedValue> = fields
            .into_iter()
            .map(|f| {
                let field = ctx.field(f);
                match field.static_value() {
                    Some(value) => value.clone(),
                    None => {
                        let descriptor = ctx.string(ctx.type_name(field.field_type()));
                        EncodedValue::zero_for(&descriptor.to_string_lossy())
                    }
                }
            })
            .collect();
        while values.last().is_some_and(EncodedValue::is_zero) {
            values.pop();
        }
        (!values.is_empty()).then_some(values)
    }

    /// Collect the class's annotation set and its members' sets into an
    /// `annotations_directory_item`, members in dex order. `None` when
    /// nothing is annotated.
    pub fn annotation_directory(&self, ctx: &DexContext) -> Option<DexAnnotationDirectory> {
        let mut fields: Vec<FieldId> = self.fields().collect();
        ctx.sort_fields(&mut fields);
        let mut methods: Vec<MethodId> = self.methods().collect();
        ctx.sort_methods(&mut methods);

        let mut dir = DexAnnotationDirectory {
            class: self.annotations.clone(),
            ..DexAnnotationDirectory::default()
        };
        for f in fields {
            if let Some(set) = ctx.field(f).annotations() {
                dir.fields.push((f, set.clone()));
            }
        }
        for m in methods {
            let method = ctx.method(m);
            if let Some(set) = method.annotations() {
                dir.methods.push((m, set.clone()));
            }
            if let Some(params) = method.param_annotations() {
                dir.params.push((m, params.clone()));
            }
        }
        (!dir.is_empty()).then_some(dir)
    }

    fn fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.static_fields.iter().chain(&self.instance_fields).copied()
    }

    fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.direct_methods.iter().chain(&self.virtual_methods).copied()
    }

    /// Self, super, interfaces, annotations, then every member's types.
    pub fn gather_types(&self, ctx: &DexContext, out: &mut Vec<TypeId>) {
        out.push(self.self_type);
        out.extend(self.super_class);
        if let Some(interfaces) = self.interfaces {
            ctx.gather_type_list_types(interfaces, out);
        }
        if let Some(set) = &self.annotations {
            set.gather_types(out);
        }
        self.fields().for_each(|f| ctx.field(f).gather_types(out));
        self.methods().for_each(|m| ctx.method(m).gather_types(ctx, out));
    }

    pub fn gather_strings(&self, ctx: &DexContext, out: &mut Vec<StringId>) {
        out.extend(self.source_file);
        if let Some(set) = &self.annotations {
            set.gather_strings(out);
        }
        self.fields().for_each(|f| ctx.field(f).gather_strings(out));
        self.methods().for_each(|m| ctx.method(m).gather_strings(ctx, out));
    }

    /// Own fields first, then fields the members reference.
    pub fn gather_fields(&self, ctx: &DexContext, out: &mut Vec<FieldId>) {
        out.extend(self.fields());
        if let Some(set) = &self.annotations {
            set.gather_fields(out);
        }
        self.fields().for_each(|f| ctx.field(f).gather_fields(out));
        self.methods().for_each(|m| ctx.method(m).gather_fields(out));
    }

    /// Own methods first, then methods the members reference.
    pub fn gather_methods(&self, ctx: &DexContext, out: &mut Vec<MethodId>) {
        out.extend(self.methods());
        if let Some(set) = &self.annotations {
            set.gather_methods(out);
        }
        self.fields().for_each(|f| ctx.field(f).gather_methods(out));
        self.methods().for_each(|m| ctx.method(m).gather_methods(out));
    }

    /// Prototypes named by method-type constants in annotations and static
    /// values.
    pub fn gather_protos(&self, ctx: &DexContext, out: &mut Vec<ProtoId>) {
        if let Some(set) = &self.annotations {
            set.gather_protos(out);
        }
        self.fields().for_each(|f| ctx.field(f).gather_protos(out));
        self.methods().for_each(|m| ctx.method(m).gather_protos(out));
    }
}

fn load_type_list<I: DexIdx + ?Sized>(
    ctx: &DexContext,
    idx: &I,
    offset: u32,
) -> Result<TypeListId, LoadError> {
    let mut r = ByteReader::at(idx.data(), offset as usize)?;
    let size = r.read_u32()?;
    let types = (0..size)
        .map(|_| Ok(idx.type_at(u32::from(r.read_u16()?))?))
        .collect::<Result<Vec<_>, LoadError>>()?;
    Ok(ctx.make_type_list(types))
}

/// A decoded `class_data_item`.
#[derive(Default)]
struct ClassData {
    static_fields: Vec<(FieldId, AccessFlags)>,
    instance_fields: Vec<(FieldId, AccessFlags)>,
    direct_methods: Vec<(MethodId, AccessFlags, Option<DexCode>)>,
    virtual_methods: Vec<(MethodId, AccessFlags, Option<DexCode>)>,
}

impl ClassData {
    fn load<I: DexIdx + ?Sized>(idx: &I, offset: u32) -> Result<Self, LoadError> {
        let mut r = ByteReader::at(idx.data(), offset as usize)?;
        let static_size = r.read_uleb128()?;
        let instance_size = r.read_uleb128()?;
        let direct_size = r.read_uleb128()?;
        let virtual_size = r.read_uleb128()?;
        Ok(Self {
            static_fields: read_fields(&mut r, idx, static_size)?,
            instance_fields: read_fields(&mut r, idx, instance_size)?,
            direct_methods: read_methods(&mut r, idx, direct_size)?,
            virtual_methods: read_methods(&mut r, idx, virtual_size)?,
        })
    }

    /// Fail with a duplicate error if any member is already defined, either
    /// by an earlier load or twice in this class.
    fn ensure_undefined(&self, ctx: &DexContext) -> Result<(), LoadError> {
        let mut seen = HashSet::new();
        for &(field, _) in self.static_fields.iter().chain(&self.instance_fields) {
            let defined = {
                let f = ctx.field(field);
                f.is_concrete() || f.is_external()
            };
            if defined || !seen.insert(field) {
                return Err(LoadError::DuplicateField(field));
            }
        }
        let mut seen = HashSet::new();
        for (method, _, _) in self.direct_methods.iter().chain(&self.virtual_methods) {
            let defined = {
                let m = ctx.method(*method);
                m.is_concrete() || m.is_external()
            };
            if defined || !seen.insert(*method) {
                return Err(LoadError::DuplicateMethod(*method));
            }
        }
        Ok(())
    }
}

/// Annotations attach once, before definition; report anything that would
/// trip that, including a member the directory lists twice, as a duplicate.
fn ensure_unannotated(ctx: &DexContext, dir: &DexAnnotationDirectory) -> Result<(), LoadError> {
    let mut seen = HashSet::new();
    for &(field, _) in &dir.fields {
        let f = ctx.field(field);
        if f.is_concrete() || f.is_external() || f.annotations().is_some() || !seen.insert(field) {
            return Err(LoadError::DuplicateField(field));
        }
    }
    let annotated = dir.methods.iter().map(|(m, _)| *m);
    for method in annotated.chain(dir.params.iter().map(|(m, _)| *m)) {
        let m = ctx.method(method);
        if m.is_concrete() || m.is_external() {
            return Err(LoadError::DuplicateMethod(method));
        }
    }
    let mut seen = HashSet::new();
    for &(method, _) in &dir.methods {
        if ctx.method(method).annotations().is_some() || !seen.insert(method) {
            return Err(LoadError::DuplicateMethod(method));
        }
    }
    let mut seen = HashSet::new();
    for (method, _) in &dir.params {
        if ctx.method(*method).param_annotations().is_some() || !seen.insert(*method) {
            return Err(LoadError::DuplicateMethod(*method));
        }
    }
    Ok(())
}

fn read_fields<I: DexIdx + ?Sized>(
    r: &mut ByteReader<'_>,
    idx: &I,
    count: u32,
) -> Result<Vec<(FieldId, AccessFlags)>, LoadError> {
    let mut index: u32 = 0;
    let mut fields = Vec::new();
    for _ in 0..count {
        index = next_index(r, index)?;
        let access = AccessFlags::from_raw(r.read_uleb128()?);
        fields.push((idx.field_at(index)?, access));
    }
    Ok(fields)
}

fn read_methods<I: DexIdx + ?Sized>(
    r: &mut ByteReader<'_>,
    idx: &I,
    count: u32,
) -> Result<Vec<(MethodId, AccessFlags, Option<DexCode>)>, LoadError> {
    let mut index: u32 = 0;
    let mut methods = Vec::new();
    for _ in 0..count {
        index = next_index(r, index)?;
        let access = AccessFlags::from_raw(r.read_uleb128()?);
        let code = match r.read_uleb128()? {
            0 => None,
            off => Some(DexCode::load(idx, off)?),
        };
        methods.push((idx.method_at(index)?, access, code));
    }
    Ok(methods)
}

fn next_index(r: &mut ByteReader<'_>, prev: u32) -> Result<u32, LoadError> {
    let at = r.position();
    let delta = r.read_uleb128()?;
    prev.checked_add(delta).ok_or(LoadError::IndexOverflow(at))
}
