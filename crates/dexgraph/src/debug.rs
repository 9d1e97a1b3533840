//! Debug info: the line/local-variable state machine program of a method.

use dexgraph_core::{ByteReader, ByteSink, NO_INDEX};

use crate::error::{EncodeError, LoadError};
use crate::index::{DexIdx, OutputIndex, OutputIndexExt};
use crate::{StringId, TypeId};

const DBG_END_SEQUENCE: u8 = 0x00;
const DBG_ADVANCE_PC: u8 = 0x01;
const DBG_ADVANCE_LINE: u8 = 0x02;
const DBG_START_LOCAL: u8 = 0x03;
const DBG_START_LOCAL_EXTENDED: u8 = 0x04;
const DBG_END_LOCAL: u8 = 0x05;
const DBG_RESTART_LOCAL: u8 = 0x06;
const DBG_SET_PROLOGUE_END: u8 = 0x07;
const DBG_SET_EPILOGUE_BEGIN: u8 = 0x08;
const DBG_SET_FILE: u8 = 0x09;

/// One debug state machine opcode. `DBG_END_SEQUENCE` is implied by the end
/// of the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DexDebugInstruction {
    AdvancePc(u32),
    AdvanceLine(i32),
    StartLocal {
        register: u32,
        name: Option<StringId>,
        ty: Option<TypeId>,
    },
    StartLocalExtended {
        register: u32,
        name: Option<StringId>,
        ty: Option<TypeId>,
        signature: Option<StringId>,
    },
    EndLocal(u32),
    RestartLocal(u32),
    SetPrologueEnd,
    SetEpilogueBegin,
    SetFile(Option<StringId>),
    /// Special opcodes `0x0a..=0xff`: advance line and address, emit a row.
    Special(u8),
}

impl DexDebugInstruction {
    fn read<I: DexIdx + ?Sized>(
        opcode: u8,
        r: &mut ByteReader<'_>,
        idx: &I,
    ) -> Result<Self, LoadError> {
        let insn = match opcode {
            DBG_ADVANCE_PC => Self::AdvancePc(r.read_uleb128()?),
            DBG_ADVANCE_LINE => Self::AdvanceLine(r.read_sleb128()?),
            DBG_START_LOCAL => Self::StartLocal {
                register: r.read_uleb128()?,
                name: opt_string(r, idx)?,
                ty: opt_type(r, idx)?,
            },
            DBG_START_LOCAL_EXTENDED => Self::StartLocalExtended {
                register: r.read_uleb128()?,
                name: opt_string(r, idx)?,
                ty: opt_type(r, idx)?,
                signature: opt_string(r, idx)?,
            },
            DBG_END_LOCAL => Self::EndLocal(r.read_uleb128()?),
            DBG_RESTART_LOCAL => Self::RestartLocal(r.read_uleb128()?),
            DBG_SET_PROLOGUE_END => Self::SetPrologueEnd,
            DBG_SET_EPILOGUE_BEGIN => Self::SetEpilogueBegin,
            DBG_SET_FILE => Self::SetFile(opt_string(r, idx)?),
            special => Self::Special(special),
        };
        Ok(insn)
    }

    fn write<I, S>(&self, index: &I, out: &mut S) -> Result<(), EncodeError>
    where
        I: OutputIndex + ?Sized,
        S: ByteSink + ?Sized,
    {
        match *self {
            Self::AdvancePc(delta) => {
                out.put_u8(DBG_ADVANCE_PC);
                out.put_uleb128(delta);
            }
            Self::AdvanceLine(delta) => {
                out.put_u8(DBG_ADVANCE_LINE);
                out.put_sleb128(delta);
            }
            Self::StartLocal { register, name, ty } => {
                let name = opt_string_idx(index, name)?;
                let ty = opt_type_idx(index, ty)?;
                out.put_u8(DBG_START_LOCAL);
                out.put_uleb128(register);
                out.put_uleb128p1(name);
                out.put_uleb128p1(ty);
            }
            Self::StartLocalExtended {
                register,
                name,
                ty,
                signature,
            } => {
                let name = opt_string_idx(index, name)?;
                let ty = opt_type_idx(index, ty)?;
                let signature = opt_string_idx(index, signature)?;
                out.put_u8(DBG_START_LOCAL_EXTENDED);
                out.put_uleb128(register);
                out.put_uleb128p1(name);
                out.put_uleb128p1(ty);
                out.put_uleb128p1(signature);
            }
            Self::EndLocal(register) => {
                out.put_u8(DBG_END_LOCAL);
                out.put_uleb128(register);
            }
            Self::RestartLocal(register) => {
                out.put_u8(DBG_RESTART_LOCAL);
                out.put_uleb128(register);
            }
            Self::SetPrologueEnd => out.put_u8(DBG_SET_PROLOGUE_END),
            Self::SetEpilogueBegin => out.put_u8(DBG_SET_EPILOGUE_BEGIN),
            Self::SetFile(name) => {
                let name = opt_string_idx(index, name)?;
                out.put_u8(DBG_SET_FILE);
                out.put_uleb128p1(name);
            }
            Self::Special(opcode) => out.put_u8(opcode),
        }
        Ok(())
    }
}

/// A `debug_info_item`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DexDebugItem {
    pub line_start: u32,
    pub param_names: Vec<Option<StringId>>,
    pub insns: Vec<DexDebugInstruction>,
}

impl DexDebugItem {
    pub fn new(line_start: u32) -> Self {
        Self {
            line_start,
            ..Self::default()
        }
    }

    pub fn load<I: DexIdx + ?Sized>(idx: &I, offset: u32) -> Result<Self, LoadError> {
        let mut r = ByteReader::at(idx.data(), offset as usize)?;
        let line_start = r.read_uleb128()?;
        let params_size = r.read_uleb128()?;
        let param_names = (0..params_size)
            .map(|_| opt_string(&mut r, idx))
            .collect::<Result<_, _>>()?;
        let mut insns = Vec::new();
        loop {
            let opcode = r.read_u8()?;
            if opcode == DBG_END_SEQUENCE {
                break;
            }
            insns.push(DexDebugInstruction::read(opcode, &mut r, idx)?);
        }
        Ok(Self {
            line_start,
            param_names,
            insns,
        })
    }

    pub(crate) fn write<I, S>(&self, index: &I, out: &mut S) -> Result<(), EncodeError>
    where
        I: OutputIndex + ?Sized,
        S: ByteSink + ?Sized,
    {
        out.put_uleb128(self.line_start);
        out.put_uleb128(self.param_names.len() as u32);
        for &name in &self.param_names {
            out.put_uleb128p1(opt_string_idx(index, name)?);
        }
        for insn in &self.insns {
            insn.write(index, out)?;
        }
        out.put_u8(DBG_END_SEQUENCE);
        Ok(())
    }

    pub fn gather_types(&self, out: &mut Vec<TypeId>) {
        for insn in &self.insns {
            match insn {
                DexDebugInstruction::StartLocal { ty: Some(ty), .. }
                | DexDebugInstruction::StartLocalExtended { ty: Some(ty), .. } => out.push(*ty),
                _ => {}
            }
        }
    }

    /// Parameter names, then names referenced by the program.
    pub fn gather_strings(&self, out: &mut Vec<StringId>) {
        out.extend(self.param_names.iter().flatten().copied());
        for insn in &self.insns {
            match insn {
                DexDebugInstruction::StartLocal { name, .. } => out.extend(*name),
                DexDebugInstruction::StartLocalExtended {
                    name, signature, ..
                } => {
                    out.extend(*name);
                    out.extend(*signature);
                }
                DexDebugInstruction::SetFile(name) => out.extend(*name),
                _ => {}
            }
        }
    }
}

fn opt_string<I: DexIdx + ?Sized>(
    r: &mut ByteReader<'_>,
    idx: &I,
) -> Result<Option<StringId>, LoadError> {
    match r.read_uleb128p1()? {
        NO_INDEX => Ok(None),
        index => Ok(Some(idx.string_at(index)?)),
    }
}

fn opt_type<I: DexIdx + ?Sized>(
    r: &mut ByteReader<'_>,
    idx: &I,
) -> Result<Option<TypeId>, LoadError> {
    match r.read_uleb128p1()? {
        NO_INDEX => Ok(None),
        index => Ok(Some(idx.type_at(index)?)),
    }
}

fn opt_string_idx<I: OutputIndex + ?Sized>(
    index: &I,
    id: Option<StringId>,
) -> Result<u32, EncodeError> {
    id.map_or(Ok(NO_INDEX), |s| index.string_idx(s))
}

fn opt_type_idx<I: OutputIndex + ?Sized>(index: &I, id: Option<TypeId>) -> Result<u32, EncodeError> {
    id.map_or(Ok(NO_INDEX), |t| index.type_idx(t))
}
