//! Encoded values: static field initializers and annotation element values.

use dexgraph_core::ByteReader;

use crate::annotation::DexEncodedAnnotation;
use crate::error::LoadError;
use crate::index::DexIdx;
use crate::{FieldId, MethodId, ProtoId, StringId, TypeId};

const VALUE_BYTE: u8 = 0x00;
const VALUE_SHORT: u8 = 0x02;
const VALUE_CHAR: u8 = 0x03;
const VALUE_INT: u8 = 0x04;
const VALUE_LONG: u8 = 0x06;
const VALUE_FLOAT: u8 = 0x10;
const VALUE_DOUBLE: u8 = 0x11;
const VALUE_METHOD_TYPE: u8 = 0x15;
const VALUE_METHOD_HANDLE: u8 = 0x16;
const VALUE_STRING: u8 = 0x17;
const VALUE_TYPE: u8 = 0x18;
const VALUE_FIELD: u8 = 0x19;
const VALUE_METHOD: u8 = 0x1a;
const VALUE_ENUM: u8 = 0x1b;
const VALUE_ARRAY: u8 = 0x1c;
const VALUE_ANNOTATION: u8 = 0x1d;
const VALUE_NULL: u8 = 0x1e;
const VALUE_BOOLEAN: u8 = 0x1f;

/// Deepest array or annotation nesting `read` accepts.
pub const MAX_NESTING: usize = 32;

/// A dex `encoded_value` with its references resolved to handles.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodedValue {
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    MethodType(ProtoId),
    /// Index into the container's method handle table, kept raw.
    MethodHandle(u32),
    String(StringId),
    Type(TypeId),
    Field(FieldId),
    Method(MethodId),
    Enum(FieldId),
    Array(Vec<EncodedValue>),
    Annotation(DexEncodedAnnotation),
    Null,
    Boolean(bool),
}

impl EncodedValue {
    /// Read one `encoded_value`.
    pub fn read<I: DexIdx + ?Sized>(r: &mut ByteReader<'_>, idx: &I) -> Result<Self, LoadError> {
        Self::read_nested(r, idx, 0)
    }

    /// Read a value inside `depth` enclosing arrays or annotations.
    pub(crate) fn read_nested<I: DexIdx + ?Sized>(
        r: &mut ByteReader<'_>,
        idx: &I,
        depth: usize,
    ) -> Result<Self, LoadError> {
        let offset = r.position();
        let header = r.read_u8()?;
        let value_type = header & 0x1f;
        let value_arg = header >> 5;
        let bad = LoadError::BadEncodedValue {
            value_type,
            value_arg,
            offset,
        };
        let size = usize::from(value_arg) + 1;
        if matches!(value_type, VALUE_ARRAY | VALUE_ANNOTATION) && depth >= MAX_NESTING {
            return Err(bad);
        }

        let value = match value_type {
            VALUE_BYTE if size == 1 => Self::Byte(r.read_u8()? as i8),
            VALUE_SHORT if size <= 2 => Self::Short(sign_extend(read_sized(r, size)?, size) as i16),
            VALUE_CHAR if size <= 2 => Self::Char(read_sized(r, size)? as u16),
            VALUE_INT if size <= 4 => Self::Int(sign_extend(read_sized(r, size)?, size) as i32),
            VALUE_LONG => Self::Long(sign_extend(read_sized(r, size)?, size)),
            VALUE_FLOAT if size <= 4 => {
                let bits = (read_sized(r, size)? as u32) << (8 * (4 - size));
                Self::Float(f32::from_bits(bits))
            }
            VALUE_DOUBLE => {
                let bits = read_sized(r, size)? << (8 * (8 - size));
                Self::Double(f64::from_bits(bits))
            }
            VALUE_METHOD_TYPE if size <= 4 => Self::MethodType(idx.proto_at(read_index(r, size)?)?),
            VALUE_METHOD_HANDLE if size <= 4 => Self::MethodHandle(read_index(r, size)?),
            VALUE_STRING if size <= 4 => Self::String(idx.string_at(read_index(r, size)?)?),
            VALUE_TYPE if size <= 4 => Self::Type(idx.type_at(read_index(r, size)?)?),
            VALUE_FIELD if size <= 4 => Self::Field(idx.field_at(read_index(r, size)?)?),
            VALUE_METHOD if size <= 4 => Self::Method(idx.method_at(read_index(r, size)?)?),
            VALUE_ENUM if size <= 4 => Self::Enum(idx.field_at(read_index(r, size)?)?),
            VALUE_ARRAY if value_arg == 0 => Self::Array(Self::read_array_nested(r, idx, depth + 1)?),
            VALUE_ANNOTATION if value_arg == 0 => {
                Self::Annotation(DexEncodedAnnotation::read_nested(r, idx, depth + 1)?)
            }
            VALUE_NULL if value_arg == 0 => Self::Null,
            VALUE_BOOLEAN if value_arg <= 1 => Self::Boolean(value_arg == 1),
            _ => return Err(bad),
        };
        Ok(value)
    }

    /// Read an `encoded_array`: `uleb128` count, then that many values.
    pub fn read_array<I: DexIdx + ?Sized>(
        r: &mut ByteReader<'_>,
        idx: &I,
    ) -> Result<Vec<Self>, LoadError> {
        Self::read_array_nested(r, idx, 0)
    }

    fn read_array_nested<I: DexIdx + ?Sized>(
        r: &mut ByteReader<'_>,
        idx: &I,
        depth: usize,
    ) -> Result<Vec<Self>, LoadError> {
        let count = r.read_uleb128()?;
        (0..count).map(|_| Self::read_nested(r, idx, depth)).collect()
    }

    /// The value a field of type `descriptor` holds before any initializer
    /// runs.
    pub fn zero_for(descriptor: &str) -> Self {
        match descriptor.as_bytes().first() {
            Some(b'Z') => Self::Boolean(false),
            Some(b'B') => Self::Byte(0),
            Some(b'S') => Self::Short(0),
            Some(b'C') => Self::Char(0),
            Some(b'I') => Self::Int(0),
            Some(b'J') => Self::Long(0),
            Some(b'F') => Self::Float(0.0),
            Some(b'D') => Self::Double(0.0),
            _ => Self::Null,
        }
    }

    /// Whether this is a zero, `false` or null constant. Negative zero
    /// floats are not.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Byte(v) => *v == 0,
            Self::Short(v) => *v == 0,
            Self::Char(v) => *v == 0,
            Self::Int(v) => *v == 0,
            Self::Long(v) => *v == 0,
            Self::Float(v) => v.to_bits() == 0,
            Self::Double(v) => v.to_bits() == 0,
            Self::Null | Self::Boolean(false) => true,
            _ => false,
        }
    }

    pub fn gather_types(&self, out: &mut Vec<TypeId>) {
        match self {
            Self::Type(ty) => out.push(*ty),
            Self::Array(values) => values.iter().for_each(|v| v.gather_types(out)),
            Self::Annotation(anno) => anno.gather_types(out),
            _ => {}
        }
    }

    pub fn gather_strings(&self, out: &mut Vec<StringId>) {
        match self {
            Self::String(s) => out.push(*s),
            Self::Array(values) => values.iter().for_each(|v| v.gather_strings(out)),
            Self::Annotation(anno) => anno.gather_strings(out),
            _ => {}
        }
    }

    pub fn gather_fields(&self, out: &mut Vec<FieldId>) {
        match self {
            Self::Field(f) | Self::Enum(f) => out.push(*f),
            Self::Array(values) => values.iter().for_each(|v| v.gather_fields(out)),
            Self::Annotation(anno) => anno.gather_fields(out),
            _ => {}
        }
    }

    pub fn gather_methods(&self, out: &mut Vec<MethodId>) {
        match self {
            Self::Method(m) => out.push(*m),
            Self::Array(values) => values.iter().for_each(|v| v.gather_methods(out)),
            Self::Annotation(anno) => anno.gather_methods(out),
            _ => {}
        }
    }

    pub fn gather_protos(&self, out: &mut Vec<ProtoId>) {
        match self {
            Self::MethodType(proto) => out.push(*proto),
            Self::Array(values) => values.iter().for_each(|v| v.gather_protos(out)),
            Self::Annotation(anno) => anno.gather_protos(out),
            _ => {}
        }
    }
}

/// Little-endian value of `size` bytes, zero-extended.
fn read_sized(r: &mut ByteReader<'_>, size: usize) -> Result<u64, LoadError> {
    let bytes = r.read_bytes(size)?;
    Ok(bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

fn read_index(r: &mut ByteReader<'_>, size: usize) -> Result<u32, LoadError> {
    Ok(read_sized(r, size)? as u32)
}

fn sign_extend(raw: u64, size: usize) -> i64 {
    let shift = 64 - 8 * size as u32;
    ((raw << shift) as i64) >> shift
}
