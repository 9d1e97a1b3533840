//! Instruction stream container.
//!
//! Only two facts about an opcode are known here: how many code units it
//! takes and which pool, if any, its index operand points into. Everything
//! else stays raw code units.

use dexgraph_core::ByteSink;

use crate::error::{EncodeError, LoadError};
use crate::index::{DexIdx, OutputIndex, OutputIndexExt};
use crate::{FieldId, IdKind, MethodId, StringId, TypeId};

const CONST_STRING_JUMBO: u8 = 0x1b;

const PACKED_SWITCH_PAYLOAD: u16 = 0x0100;
const SPARSE_SWITCH_PAYLOAD: u16 = 0x0200;
const FILL_ARRAY_DATA_PAYLOAD: u16 = 0x0300;

/// The interned entity an instruction's index operand names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InsnRef {
    String(StringId),
    Type(TypeId),
    Field(FieldId),
    Method(MethodId),
}

impl InsnRef {
    pub(crate) fn kind(self) -> RefKind {
        match self {
            Self::String(_) => RefKind::String,
            Self::Type(_) => RefKind::Type,
            Self::Field(_) => RefKind::Field,
            Self::Method(_) => RefKind::Method,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefKind {
    String,
    Type,
    Field,
    Method,
}

pub(crate) fn ref_kind(opcode: u8) -> Option<RefKind> {
    match opcode {
        0x1a | 0x1b => Some(RefKind::String),
        0x1c | 0x1f | 0x20 | 0x22..=0x25 => Some(RefKind::Type),
        0x52..=0x6d => Some(RefKind::Field),
        0x6e..=0x72 | 0x74..=0x78 => Some(RefKind::Method),
        _ => None,
    }
}

/// Width in code units of a non-payload opcode, or `None` if unsupported.
pub(crate) fn opcode_width(opcode: u8) -> Option<usize> {
    let width = match opcode {
        0x18 => 5,
        0x03 | 0x06 | 0x09 | 0x14 | 0x17 | 0x1b | 0x24..=0x26 | 0x2a..=0x2c => 3,
        0x6e..=0x72 | 0x74..=0x78 => 3,
        0x02 | 0x05 | 0x08 | 0x13 | 0x15 | 0x16 | 0x19 | 0x1a | 0x1c | 0x1f | 0x20 => 2,
        0x22 | 0x23 | 0x29 | 0x2d..=0x3d | 0x44..=0x6d | 0x90..=0xaf | 0xd0..=0xe2 => 2,
        0xfa..=0xff => return None,
        _ => 1,
    };
    Some(width)
}

/// One instruction or payload pseudo-instruction.
///
/// `units` holds the raw code units. When `reference` is set, the index
/// operand inside `units` is stale and gets rewritten from the output index
/// on encode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DexInstruction {
    units: Vec<u16>,
    reference: Option<InsnRef>,
}

impl DexInstruction {
    /// Panics if `units` is empty, or if `reference` is set but the opcode
    /// takes no operand of that kind or `units` is too short to hold it.
    pub fn new(units: Vec<u16>, reference: Option<InsnRef>) -> Self {
        assert!(!units.is_empty(), "instruction needs at least one code unit");
        let insn = Self { units, reference };
        insn.ensure_reference_fits();
        insn
    }

    pub fn opcode(&self) -> u8 {
        (self.units[0] & 0xff) as u8
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Size in code units.
    pub fn size(&self) -> usize {
        self.units.len()
    }

    pub fn is_payload(&self) -> bool {
        self.opcode() == 0 && self.units[0] >> 8 != 0
    }

    pub fn reference(&self) -> Option<InsnRef> {
        self.reference
    }

    /// Same checks as [`new`](Self::new).
    pub fn set_reference(&mut self, reference: Option<InsnRef>) {
        self.reference = reference;
        self.ensure_reference_fits();
    }

    /// Split `units` into instructions, resolving index operands.
    pub fn read_all<I: DexIdx + ?Sized>(units: &[u16], idx: &I) -> Result<Vec<Self>, LoadError> {
        let mut insns = Vec::new();
        let mut pos = 0;
        while pos < units.len() {
            let width = instruction_width(units, pos)?;
            let end = pos + width;
            if end > units.len() {
                return Err(LoadError::TruncatedInstruction { position: pos });
            }
            let raw = &units[pos..end];
            let opcode = (raw[0] & 0xff) as u8;
            let reference = ref_kind(opcode)
                .map(|kind| resolve(kind, operand_index(opcode, raw), idx))
                .transpose()?;
            insns.push(Self {
                units: raw.to_vec(),
                reference,
            });
            pos = end;
        }
        Ok(insns)
    }

    pub(crate) fn write<I, S>(&self, index: &I, out: &mut S) -> Result<(), EncodeError>
    where
        I: OutputIndex + ?Sized,
        S: ByteSink + ?Sized,
    {
        let Some(reference) = self.reference else {
            self.units.iter().for_each(|&u| out.put_u16(u));
            return Ok(());
        };
        let (kind, idx) = match reference {
            InsnRef::String(s) => (IdKind::String, index.string_idx(s)?),
            InsnRef::Type(t) => (IdKind::Type, index.type_idx(t)?),
            InsnRef::Field(f) => (IdKind::Field, index.field_idx(f)?),
            InsnRef::Method(m) => (IdKind::Method, index.method_idx(m)?),
        };
        let mut units = self.units.clone();
        if self.opcode() == CONST_STRING_JUMBO {
            units[1] = idx as u16;
            units[2] = (idx >> 16) as u16;
        } else {
            units[1] = u16::try_from(idx).map_err(|_| EncodeError::IndexOverflow {
                kind,
                index: idx,
                bits: 16,
            })?;
        }
        units.iter().for_each(|&u| out.put_u16(u));
        Ok(())
    }

    pub fn gather_types(&self, out: &mut Vec<TypeId>) {
        if let Some(InsnRef::Type(t)) = self.reference {
            out.push(t);
        }
    }

    pub fn gather_strings(&self, out: &mut Vec<StringId>) {
        if let Some(InsnRef::String(s)) = self.reference {
            out.push(s);
        }
    }

    pub fn gather_fields(&self, out: &mut Vec<FieldId>) {
        if let Some(InsnRef::Field(f)) = self.reference {
            out.push(f);
        }
    }

    pub fn gather_methods(&self, out: &mut Vec<MethodId>) {
        if let Some(InsnRef::Method(m)) = self.reference {
            out.push(m);
        }
    }
}

fn instruction_width(units: &[u16], pos: usize) -> Result<usize, LoadError> {
    let unit = units[pos];
    let opcode = (unit & 0xff) as u8;
    if opcode != 0 || unit >> 8 == 0 {
        return opcode_width(opcode).ok_or(LoadError::UnsupportedOpcode {
            opcode,
            position: pos,
        });
    }
    let header = |n: usize| {
        units
            .get(pos + n)
            .map(|&u| usize::from(u))
            .ok_or(LoadError::TruncatedInstruction { position: pos })
    };
    match unit {
        PACKED_SWITCH_PAYLOAD => Ok(4 + header(1)? * 2),
        SPARSE_SWITCH_PAYLOAD => Ok(2 + header(1)? * 4),
        FILL_ARRAY_DATA_PAYLOAD => {
            let element_width = header(1)?;
            let size = header(2)? | (header(3)? << 16);
            Ok(4 + (size * element_width).div_ceil(2))
        }
        ident => Err(LoadError::BadPayload {
            ident,
            position: pos,
        }),
    }
}

fn operand_index(opcode: u8, raw: &[u16]) -> u32 {
    if opcode == CONST_STRING_JUMBO {
        u32::from(raw[1]) | (u32::from(raw[2]) << 16)
    } else {
        u32::from(raw[1])
    }
}

fn resolve<I: DexIdx + ?Sized>(kind: RefKind, index: u32, idx: &I) -> Result<InsnRef, LoadError> {
    Ok(match kind {
        RefKind::String => InsnRef::String(idx.string_at(index)?),
        RefKind::Type => InsnRef::Type(idx.type_at(index)?),
        RefKind::Field => InsnRef::Field(idx.field_at(index)?),
        RefKind::Method => InsnRef::Method(idx.method_at(index)?),
    })
}
