#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! In-memory object model for dex class files.
//!
//! - [`DexContext`]: the interning authority. One canonical entry per distinct
//!   string, type, type list, prototype, field and method, addressed by `Copy`
//!   handles whose equality is value equality.
//! - Entities: [`DexField`], [`DexMethod`], [`DexCode`], [`DexDebugItem`],
//!   [`DexClass`], loaded from container bytes through a [`DexIdx`].
//! - [`order`]: the dex canonical order for every entity kind.
//! - [`Encoder`]: byte-exact item encoding against an [`OutputIndex`], with
//!   sizes that agree with the written bytes.
//! - `gather_*` methods on every entity collect what it references, feeding
//!   [`OutputIdx::build`].

mod access;
mod annotation;
mod class;
mod code;
mod context;
mod debug;
mod encode;
mod error;
mod field;
mod ids;
mod index;
mod instruction;
mod invariants;
mod method;
pub mod order;
mod proto;
mod string;
mod value;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod class_tests;
#[cfg(test)]
mod code_tests;
#[cfg(test)]
mod debug_tests;
#[cfg(test)]
mod index_tests;
#[cfg(test)]
mod method_tests;

pub use access::AccessFlags;
pub use annotation::{
    AnnotationElement, AnnotationVisibility, DexAnnotation, DexAnnotationDirectory, DexAnnotationSet,
    DexEncodedAnnotation, ParamAnnotations,
};
pub use class::{ClassDef, DexClass};
pub use code::{DexCode, DexTryItem};
pub use context::DexContext;
pub use debug::{DexDebugInstruction, DexDebugItem};
pub use encode::{CodeOffsets, EncodeConfig, Encoder};
pub use error::{EncodeError, LoadError, ResolveError};
pub use field::DexField;
pub use ids::{FieldId, IdKind, MethodId, ProtoId, StringId, TypeId, TypeListId};
pub use index::{DexIdx, Gathered, OutputIdx, OutputIndex};
pub use instruction::{DexInstruction, InsnRef};
pub use method::DexMethod;
pub use proto::{DexProto, shorty_char};
pub use string::DexString;
pub use value::EncodedValue;
