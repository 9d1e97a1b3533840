//! Method bodies: `code_item` with its try/catch tables.

use dexgraph_core::{ByteReader, ByteSink, leb128};
use indexmap::IndexSet;

use crate::debug::DexDebugItem;
use crate::error::{EncodeError, LoadError};
use crate::index::{DexIdx, OutputIndex, OutputIndexExt};
use crate::instruction::DexInstruction;
use crate::{FieldId, MethodId, StringId, TypeId};

/// One try region and its handlers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DexTryItem {
    /// First covered code unit.
    pub start_addr: u32,
    /// Number of covered code units.
    pub insn_count: u16,
    /// `(exception type, handler address)` in match order.
    pub catches: Vec<(TypeId, u32)>,
    pub catch_all: Option<u32>,
}

impl DexTryItem {
    pub fn new(start_addr: u32, insn_count: u16) -> Self {
        Self {
            start_addr,
            insn_count,
            ..Self::default()
        }
    }
}

/// A method body. Owned by exactly one method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DexCode {
    pub registers_size: u16,
    pub ins_size: u16,
    pub outs_size: u16,
    pub insns: Vec<DexInstruction>,
    pub tries: Vec<DexTryItem>,
    pub debug: Option<DexDebugItem>,
}

/// A handler with its type indices resolved, ready to write.
struct EncodedHandler {
    pairs: Vec<(u32, u32)>,
    catch_all: Option<u32>,
}

impl EncodedHandler {
    fn size(&self) -> i32 {
        let n = self.pairs.len() as i32;
        if self.catch_all.is_some() { -n } else { n }
    }

    fn encoded_len(&self) -> usize {
        leb128::sleb128_size(self.size())
            + self
                .pairs
                .iter()
                .map(|&(ty, addr)| leb128::uleb128_size(ty) + leb128::uleb128_size(addr))
                .sum::<usize>()
            + self.catch_all.map_or(0, leb128::uleb128_size)
    }

    fn write<S: ByteSink + ?Sized>(&self, out: &mut S) {
        out.put_sleb128(self.size());
        for &(ty, addr) in &self.pairs {
            out.put_uleb128(ty);
            out.put_uleb128(addr);
        }
        if let Some(addr) = self.catch_all {
            out.put_uleb128(addr);
        }
    }
}

impl DexCode {
    pub fn new(registers_size: u16, ins_size: u16, outs_size: u16) -> Self {
        Self {
            registers_size,
            ins_size,
            outs_size,
            ..Self::default()
        }
    }

    /// Total instruction size in code units.
    pub fn insns_size(&self) -> usize {
        self.insns.iter().map(DexInstruction::size).sum()
    }

    /// Load the `code_item` at `offset` and the debug item it links to.
    pub fn load<I: DexIdx + ?Sized>(idx: &I, offset: u32) -> Result<Self, LoadError> {
        let data = idx.data();
        let mut r = ByteReader::at(data, offset as usize)?;
        let registers_size = r.read_u16()?;
        let ins_size = r.read_u16()?;
        let outs_size = r.read_u16()?;
        let tries_size = r.read_u16()?;
        let debug_info_off = r.read_u32()?;
        let insns_size = r.read_u32()? as usize;

        let units = (0..insns_size)
            .map(|_| r.read_u16())
            .collect::<Result<Vec<_>, _>>()?;
        let insns = DexInstruction::read_all(&units, idx)?;

        let mut tries = Vec::with_capacity(usize::from(tries_size));
        if tries_size > 0 {
            if insns_size % 2 == 1 {
                r.read_u16()?;
            }
            let mut raw = Vec::with_capacity(usize::from(tries_size));
            for _ in 0..tries_size {
                raw.push((r.read_u32()?, r.read_u16()?, r.read_u16()?));
            }
            let handlers_start = r.position();
            for (start_addr, insn_count, handler_off) in raw {
                let mut h = ByteReader::at(data, handlers_start + usize::from(handler_off))?;
                let size = h.read_sleb128()?;
                let mut item = DexTryItem::new(start_addr, insn_count);
                for _ in 0..size.unsigned_abs() {
                    let ty = idx.type_at(h.read_uleb128()?)?;
                    item.catches.push((ty, h.read_uleb128()?));
                }
                if size <= 0 {
                    item.catch_all = Some(h.read_uleb128()?);
                }
                tries.push(item);
            }
        }

        let debug = match debug_info_off {
            0 => None,
            off => Some(DexDebugItem::load(idx, off)?),
        };

        Ok(Self {
            registers_size,
            ins_size,
            outs_size,
            insns,
            tries,
            debug,
        })
    }

    /// Write the `code_item`. The debug item is not included; its offset is
    /// supplied by the caller.
    pub(crate) fn write<I, S>(&self, index: &I, debug_info_off: u32, out: &mut S) -> Result<(), EncodeError>
    where
        I: OutputIndex + ?Sized,
        S: ByteSink + ?Sized,
    {
        let tries_size = u16::try_from(self.tries.len()).map_err(|_| EncodeError::TooMany {
            what: "try items",
            count: self.tries.len(),
            max: usize::from(u16::MAX),
        })?;
        let insns_size = self.insns_size();

        out.put_u16(self.registers_size);
        out.put_u16(self.ins_size);
        out.put_u16(self.outs_size);
        out.put_u16(tries_size);
        out.put_u32(debug_info_off);
        out.put_u32(insns_size as u32);
        for insn in &self.insns {
            insn.write(index, out)?;
        }
        if self.tries.is_empty() {
            return Ok(());
        }
        if insns_size % 2 == 1 {
            out.put_u16(0);
        }

        // Identical handlers are written once and shared by offset.
        let mut keys: IndexSet<(&[(TypeId, u32)], Option<u32>)> = IndexSet::new();
        let slots: Vec<usize> = self
            .tries
            .iter()
            .map(|t| keys.insert_full((t.catches.as_slice(), t.catch_all)).0)
            .collect();
        let handlers = keys
            .iter()
            .map(|&(catches, catch_all)| {
                let pairs = catches
                    .iter()
                    .map(|&(ty, addr)| Ok((index.type_idx(ty)?, addr)))
                    .collect::<Result<_, EncodeError>>()?;
                Ok(EncodedHandler { pairs, catch_all })
            })
            .collect::<Result<Vec<_>, EncodeError>>()?;

        let mut offsets = Vec::with_capacity(handlers.len());
        let mut off = leb128::uleb128_size(handlers.len() as u32);
        for handler in &handlers {
            let handler_off = u16::try_from(off).map_err(|_| EncodeError::TooMany {
                what: "catch handler bytes",
                count: off,
                max: usize::from(u16::MAX),
            })?;
            offsets.push(handler_off);
            off += handler.encoded_len();
        }

        for (t, &slot) in self.tries.iter().zip(&slots) {
            out.put_u32(t.start_addr);
            out.put_u16(t.insn_count);
            out.put_u16(offsets[slot]);
        }
        out.put_uleb128(handlers.len() as u32);
        for handler in &handlers {
            handler.write(out);
        }
        Ok(())
    }

    /// Types named by instructions, catch clauses and debug info.
    pub fn gather_types(&self, out: &mut Vec<TypeId>) {
        self.insns.iter().for_each(|i| i.gather_types(out));
        self.gather_catch_types(out);
        if let Some(debug) = &self.debug {
            debug.gather_types(out);
        }
    }

    pub fn gather_catch_types(&self, out: &mut Vec<TypeId>) {
        for t in &self.tries {
            out.extend(t.catches.iter().map(|&(ty, _)| ty));
        }
    }

    pub fn gather_strings(&self, out: &mut Vec<StringId>) {
        self.insns.iter().for_each(|i| i.gather_strings(out));
        if let Some(debug) = &self.debug {
            debug.gather_strings(out);
        }
    }

    pub fn gather_fields(&self, out: &mut Vec<FieldId>) {
        self.insns.iter().for_each(|i| i.gather_fields(out));
    }

    pub fn gather_methods(&self, out: &mut Vec<MethodId>) {
        self.insns.iter().for_each(|i| i.gather_methods(out));
    }
}
