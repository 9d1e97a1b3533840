//! Annotations and the items that group them.

use std::collections::BTreeMap;

use dexgraph_core::ByteReader;

use crate::error::LoadError;
use crate::index::DexIdx;
use crate::value::EncodedValue;
use crate::{FieldId, MethodId, ProtoId, StringId, TypeId};

/// An `encoded_annotation`: the annotation type and its named elements.
#[derive(Clone, Debug, PartialEq)]
pub struct DexEncodedAnnotation {
    pub ty: TypeId,
    pub elements: Vec<AnnotationElement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationElement {
    pub name: StringId,
    pub value: EncodedValue,
}

impl DexEncodedAnnotation {
    pub fn read<I: DexIdx + ?Sized>(r: &mut ByteReader<'_>, idx: &I) -> Result<Self, LoadError> {
        Self::read_nested(r, idx, 0)
    }

    /// Read an annotation whose element values sit `depth` levels deep.
    pub(crate) fn read_nested<I: DexIdx + ?Sized>(
        r: &mut ByteReader<'_>,
        idx: &I,
        depth: usize,
    ) -> Result<Self, LoadError> {
        let ty = idx.type_at(r.read_uleb128()?)?;
        let size = r.read_uleb128()?;
        let elements = (0..size)
            .map(|_| {
                let name = idx.string_at(r.read_uleb128()?)?;
                let value = EncodedValue::read_nested(r, idx, depth)?;
                Ok(AnnotationElement { name, value })
            })
            .collect::<Result<_, LoadError>>()?;
        Ok(Self { ty, elements })
    }

    pub fn gather_types(&self, out: &mut Vec<TypeId>) {
        out.push(self.ty);
        self.elements.iter().for_each(|e| e.value.gather_types(out));
    }

    pub fn gather_strings(&self, out: &mut Vec<StringId>) {
        for element in &self.elements {
            out.push(element.name);
            element.value.gather_strings(out);
        }
    }

    pub fn gather_fields(&self, out: &mut Vec<FieldId>) {
        self.elements.iter().for_each(|e| e.value.gather_fields(out));
    }

    pub fn gather_methods(&self, out: &mut Vec<MethodId>) {
        self.elements.iter().for_each(|e| e.value.gather_methods(out));
    }

    pub fn gather_protos(&self, out: &mut Vec<ProtoId>) {
        self.elements.iter().for_each(|e| e.value.gather_protos(out));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationVisibility {
    Build,
    Runtime,
    System,
}

impl AnnotationVisibility {
    pub fn from_raw(raw: u8) -> Result<Self, LoadError> {
        match raw {
            0x00 => Ok(Self::Build),
            0x01 => Ok(Self::Runtime),
            0x02 => Ok(Self::System),
            other => Err(LoadError::BadVisibility(other)),
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            Self::Build => 0x00,
            Self::Runtime => 0x01,
            Self::System => 0x02,
        }
    }
}

/// An `annotation_item`.
#[derive(Clone, Debug, PartialEq)]
pub struct DexAnnotation {
    pub visibility: AnnotationVisibility,
    pub annotation: DexEncodedAnnotation,
}

/// An `annotation_set_item`, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DexAnnotationSet {
    annotations: Vec<DexAnnotation>,
}

/// Annotation sets keyed by parameter index.
pub type ParamAnnotations = BTreeMap<u16, DexAnnotationSet>;

impl DexAnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, annotation: DexAnnotation) {
        self.annotations.push(annotation);
    }

    pub fn annotations(&self) -> &[DexAnnotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Load the set at `offset`; offset 0 means "no set".
    pub fn load<I: DexIdx + ?Sized>(idx: &I, offset: u32) -> Result<Option<Self>, LoadError> {
        if offset == 0 {
            return Ok(None);
        }
        let data = idx.data();
        let mut r = ByteReader::at(data, offset as usize)?;
        let size = r.read_u32()?;
        let mut annotations = Vec::new();
        for _ in 0..size {
            let item_off = r.read_u32()?;
            let mut item = ByteReader::at(data, item_off as usize)?;
            let visibility = AnnotationVisibility::from_raw(item.read_u8()?)?;
            let annotation = DexEncodedAnnotation::read(&mut item, idx)?;
            annotations.push(DexAnnotation {
                visibility,
                annotation,
            });
        }
        Ok(Some(Self { annotations }))
    }

    pub fn gather_types(&self, out: &mut Vec<TypeId>) {
        self.annotations.iter().for_each(|a| a.annotation.gather_types(out));
    }

    pub fn gather_strings(&self, out: &mut Vec<StringId>) {
        self.annotations.iter().for_each(|a| a.annotation.gather_strings(out));
    }

    pub fn gather_fields(&self, out: &mut Vec<FieldId>) {
        self.annotations.iter().for_each(|a| a.annotation.gather_fields(out));
    }

    pub fn gather_methods(&self, out: &mut Vec<MethodId>) {
        self.annotations.iter().for_each(|a| a.annotation.gather_methods(out));
    }

    pub fn gather_protos(&self, out: &mut Vec<ProtoId>) {
        self.annotations.iter().for_each(|a| a.annotation.gather_protos(out));
    }
}

/// Load an `annotation_set_ref_list`; entries with offset 0 are skipped.
fn load_param_annotations<I: DexIdx + ?Sized>(
    idx: &I,
    offset: u32,
) -> Result<ParamAnnotations, LoadError> {
    if offset == 0 {
        return Ok(ParamAnnotations::new());
    }
    let mut r = ByteReader::at(idx.data(), offset as usize)?;
    let size = r.read_u32()?;
    let mut params = ParamAnnotations::new();
    for param in 0..size {
        if let Some(set) = DexAnnotationSet::load(idx, r.read_u32()?)? {
            params.insert(param as u16, set);
        }
    }
    Ok(params)
}

/// An `annotations_directory_item`: the class's own set plus the sets of its
/// annotated members.
///
/// Built by [`DexClass::annotation_directory`](crate::DexClass::annotation_directory)
/// with member entries in dex order, the order the item requires.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DexAnnotationDirectory {
    pub class: Option<DexAnnotationSet>,
    pub fields: Vec<(FieldId, DexAnnotationSet)>,
    pub methods: Vec<(MethodId, DexAnnotationSet)>,
    pub params: Vec<(MethodId, ParamAnnotations)>,
}

impl DexAnnotationDirectory {
    pub fn is_empty(&self) -> bool {
        self.class.is_none() && self.fields.is_empty() && self.methods.is_empty() && self.params.is_empty()
    }

    /// Load the item at `offset`; offset 0 yields an empty directory.
    pub fn load<I: DexIdx + ?Sized>(idx: &I, offset: u32) -> Result<Self, LoadError> {
        if offset == 0 {
            return Ok(Self::default());
        }
        let mut r = ByteReader::at(idx.data(), offset as usize)?;
        let class_off = r.read_u32()?;
        let fields_size = r.read_u32()?;
        let methods_size = r.read_u32()?;
        let params_size = r.read_u32()?;

        let mut dir = Self {
            class: DexAnnotationSet::load(idx, class_off)?,
            ..Self::default()
        };
        for _ in 0..fields_size {
            let field = idx.field_at(r.read_u32()?)?;
            if let Some(set) = DexAnnotationSet::load(idx, r.read_u32()?)? {
                dir.fields.push((field, set));
            }
        }
        for _ in 0..methods_size {
            let method = idx.method_at(r.read_u32()?)?;
            if let Some(set) = DexAnnotationSet::load(idx, r.read_u32()?)? {
                dir.methods.push((method, set));
            }
        }
        for _ in 0..params_size {
            let method = idx.method_at(r.read_u32()?)?;
            let params = load_param_annotations(idx, r.read_u32()?)?;
            if !params.is_empty() {
                dir.params.push((method, params));
            }
        }
        Ok(dir)
    }
}
