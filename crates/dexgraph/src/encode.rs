//! Byte-exact encoding of entities against an output index.
//!
//! Every item kind has a `*_size` and an `encode_*` method. Both drive the
//! same writer, once over a [`SizeCounter`] and once over the output vector,
//! so a size computed ahead of time is the size that gets written.

use std::collections::HashMap;

use dexgraph_core::{ByteSink, SizeCounter};

use crate::class::DexClass;
use crate::code::DexCode;
use crate::debug::DexDebugItem;
use crate::error::EncodeError;
use crate::index::{OutputIndex, OutputIndexExt};
use crate::invariants;
use crate::{DexContext, FieldId, IdKind, MethodId, StringId, TypeListId};

/// Encoder settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeConfig {
    verify_sizes: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self { verify_sizes: true }
    }
}

impl EncodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-measure every item before writing it and panic if the written
    /// length differs. On by default.
    pub fn with_verify_sizes(mut self, verify: bool) -> Self {
        self.verify_sizes = verify;
        self
    }

    pub fn verify_sizes(&self) -> bool {
        self.verify_sizes
    }
}

/// Method → offset of its `code_item` in the output.
pub type CodeOffsets = HashMap<MethodId, u32>;

/// One `class_data_item` entry, ready to delta-encode.
struct MemberEntry {
    index: u32,
    access: u32,
    code_off: Option<u32>,
}

/// Writes entities of one context using one output index.
pub struct Encoder<'a, I: OutputIndex + ?Sized> {
    ctx: &'a DexContext,
    index: &'a I,
    config: EncodeConfig,
}

impl<'a, I: OutputIndex + ?Sized> Encoder<'a, I> {
    pub fn new(ctx: &'a DexContext, index: &'a I) -> Self {
        Self {
            ctx,
            index,
            config: EncodeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EncodeConfig) -> Self {
        self.config = config;
        self
    }

    // string_data_item

    pub fn string_size(&self, s: StringId) -> usize {
        self.ctx.string(s).entry_size()
    }

    pub fn encode_string(&self, s: StringId, out: &mut Vec<u8>) -> usize {
        let string = self.ctx.string(s);
        let start = out.len();
        string.write(out);
        let written = out.len() - start;
        if self.config.verify_sizes {
            invariants::ensure_size_agreement("string_data_item", string.entry_size(), written);
        }
        written
    }

    // type_list

    pub fn type_list_size(&self, list: TypeListId) -> usize {
        4 + 2 * self.ctx.type_list(list).len()
    }

    /// `out.len()` must be 4-aligned.
    pub fn encode_type_list(&self, list: TypeListId, out: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let types = self.ctx.type_list(list);
        let expected = 4 + 2 * types.len();
        let indices = types
            .iter()
            .map(|&ty| {
                let index = self.index.type_idx(ty)?;
                u16::try_from(index).map_err(|_| EncodeError::IndexOverflow {
                    kind: IdKind::Type,
                    index,
                    bits: 16,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let expected = self.config.verify_sizes.then_some(expected);
        self.emit("type_list", 4, expected, out, |sink| {
            sink.put_u32(indices.len() as u32);
            indices.iter().for_each(|&i| sink.put_u16(i));
            Ok(())
        })
    }

    // code_item

    pub fn code_size(&self, code: &DexCode) -> Result<usize, EncodeError> {
        measure(|sink| code.write(self.index, 0, sink))
    }

    /// Write `code` with `debug_info_off` linking its separately encoded
    /// debug item (0 for none). `out.len()` must be 4-aligned.
    pub fn encode_code(&self, code: &DexCode, debug_info_off: u32, out: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let expected = self.expected(|sink| code.write(self.index, debug_info_off, sink))?;
        self.emit("code_item", 4, expected, out, |sink| {
            code.write(self.index, debug_info_off, sink)
        })
    }

    // debug_info_item

    pub fn debug_item_size(&self, debug: &DexDebugItem) -> Result<usize, EncodeError> {
        measure(|sink| debug.write(self.index, sink))
    }

    pub fn encode_debug_item(&self, debug: &DexDebugItem, out: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let expected = self.expected(|sink| debug.write(self.index, sink))?;
        self.emit("debug_info_item", 1, expected, out, |sink| {
            debug.write(self.index, sink)
        })
    }

    // class_data_item

    pub fn class_data_size(&self, class: &DexClass, code_offsets: &CodeOffsets) -> Result<usize, EncodeError> {
        let lists = self.class_entries(class, code_offsets)?;
        measure(|sink| {
            write_class_data(&lists, sink);
            Ok(())
        })
    }

    /// Write the class's `class_data_item`: each member list sorted in dex
    /// order, indices delta-encoded.
    pub fn encode_class_data(
        &self,
        class: &DexClass,
        code_offsets: &CodeOffsets,
        out: &mut Vec<u8>,
    ) -> Result<usize, EncodeError> {
        let lists = self.class_entries(class, code_offsets)?;
        let write = |sink: &mut dyn ByteSink| {
            write_class_data(&lists, sink);
            Ok(())
        };
        let expected = self.expected(write)?;
        let written = self.emit("class_data_item", 1, expected, out, write)?;
        tracing::debug!(
            class = class.self_type().as_u32(),
            bytes = written,
            "encoded class data"
        );
        Ok(written)
    }

    fn class_entries(&self, class: &DexClass, code_offsets: &CodeOffsets) -> Result<[Vec<MemberEntry>; 4], EncodeError> {
        if class.is_external() {
            return Err(EncodeError::ExternalClass(class.self_type()));
        }
        Ok([
            self.field_entries(class.static_fields())?,
            self.field_entries(class.instance_fields())?,
            self.method_entries(class.direct_methods(), code_offsets)?,
            self.method_entries(class.virtual_methods(), code_offsets)?,
        ])
    }

    fn field_entries(&self, fields: &[FieldId]) -> Result<Vec<MemberEntry>, EncodeError> {
        let mut sorted = fields.to_vec();
        self.ctx.sort_fields(&mut sorted);
        let entries = sorted
            .into_iter()
            .map(|f| {
                Ok(MemberEntry {
                    index: self.index.field_idx(f)?,
                    access: self.ctx.field(f).access().bits(),
                    code_off: None,
                })
            })
            .collect::<Result<Vec<_>, EncodeError>>()?;
        ensure_increasing(IdKind::Field, &entries)?;
        Ok(entries)
    }

    fn method_entries(&self, methods: &[MethodId], code_offsets: &CodeOffsets) -> Result<Vec<MemberEntry>, EncodeError> {
        let mut sorted = methods.to_vec();
        self.ctx.sort_methods(&mut sorted);
        let entries = sorted
            .into_iter()
            .map(|m| {
                let (access, has_code) = {
                    let method = self.ctx.method(m);
                    (method.access().bits(), method.code().is_some())
                };
                let code_off = if has_code {
                    code_offsets
                        .get(&m)
                        .copied()
                        .ok_or(EncodeError::MissingCodeOffset(m))?
                } else {
                    0
                };
                Ok(MemberEntry {
                    index: self.index.method_idx(m)?,
                    access,
                    code_off: Some(code_off),
                })
            })
            .collect::<Result<Vec<_>, EncodeError>>()?;
        ensure_increasing(IdKind::Method, &entries)?;
        Ok(entries)
    }

    /// Size to check the written bytes against, when checking is on.
    fn expected(
        &self,
        write: impl Fn(&mut dyn ByteSink) -> Result<(), EncodeError>,
    ) -> Result<Option<usize>, EncodeError> {
        if self.config.verify_sizes {
            measure(write).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Run `write` over `out`. On error `out` is restored to its old length.
    fn emit(
        &self,
        what: &str,
        align: usize,
        expected: Option<usize>,
        out: &mut Vec<u8>,
        write: impl Fn(&mut dyn ByteSink) -> Result<(), EncodeError>,
    ) -> Result<usize, EncodeError> {
        let start = out.len();
        if start % align != 0 {
            return Err(EncodeError::Misaligned {
                offset: start,
                align,
            });
        }
        if let Err(err) = write(out) {
            out.truncate(start);
            return Err(err);
        }
        let written = out.len() - start;
        if let Some(expected) = expected {
            invariants::ensure_size_agreement(what, expected, written);
        }
        tracing::trace!(item = what, offset = start, bytes = written, "encoded item");
        Ok(written)
    }
}

fn measure(write: impl Fn(&mut dyn ByteSink) -> Result<(), EncodeError>) -> Result<usize, EncodeError> {
    let mut counter = SizeCounter::new();
    write(&mut counter)?;
    Ok(counter.len())
}

fn ensure_increasing(kind: IdKind, entries: &[MemberEntry]) -> Result<(), EncodeError> {
    match entries.windows(2).find(|w| w[1].index <= w[0].index) {
        Some(w) => Err(EncodeError::UnsortedMembers {
            kind,
            index: w[1].index,
        }),
        None => Ok(()),
    }
}

fn write_class_data<S: ByteSink + ?Sized>(lists: &[Vec<MemberEntry>; 4], out: &mut S) {
    for list in lists {
        out.put_uleb128(list.len() as u32);
    }
    for list in lists {
        let mut prev = 0;
        for entry in list {
            out.put_uleb128(entry.index - prev);
            out.put_uleb128(entry.access);
            if let Some(code_off) = entry.code_off {
                out.put_uleb128(code_off);
            }
            prev = entry.index;
        }
    }
}
