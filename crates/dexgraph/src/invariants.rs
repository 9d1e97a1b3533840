//! Invariant checks excluded from coverage reports.
//!
//! Each of these panics: a violation is a caller bug, and continuing would
//! leave the canonical graph inconsistent.

#![cfg_attr(coverage_nightly, coverage(off))]

use crate::class::DexClass;
use crate::field::DexField;
use crate::instruction::{self, DexInstruction};
use crate::method::DexMethod;
use crate::{IdKind, MethodId};

pub(crate) fn rekey_collision(kind: IdKind, index: u32, owner: u32) -> ! {
    panic!("re-keying {kind} {index} would collide with existing {kind} {owner}")
}

pub(crate) fn ensure_size_agreement(what: &str, expected: usize, written: usize) {
    assert_eq!(
        expected, written,
        "{what}: computed size {expected} disagrees with {written} bytes written"
    );
}

impl DexField {
    pub(crate) fn ensure_defined(&self) {
        assert!(
            self.is_concrete() || self.is_external(),
            "field {:?} is a bare reference; it has no access flags",
            self.id()
        );
    }

    pub(crate) fn ensure_not_external(&self, op: &str) {
        assert!(
            !self.is_external(),
            "field {:?} is external; cannot {op}",
            self.id()
        );
    }

    pub(crate) fn ensure_undefined(&self, op: &str) {
        assert!(
            !self.is_concrete() && !self.is_external(),
            "field {:?} is already {}; cannot {op}",
            self.id(),
            if self.is_external() { "external" } else { "concrete" }
        );
    }
}

impl DexMethod {
    pub(crate) fn ensure_defined(&self) {
        assert!(
            self.is_concrete() || self.is_external(),
            "method {:?} is a bare reference; it has no access flags",
            self.id()
        );
    }

    pub(crate) fn ensure_not_external(&self, op: &str) {
        assert!(
            !self.is_external(),
            "method {:?} is external; cannot {op}",
            self.id()
        );
    }

    pub(crate) fn ensure_undefined(&self, op: &str) {
        assert!(
            !self.is_concrete() && !self.is_external(),
            "method {:?} is already {}; cannot {op}",
            self.id(),
            if self.is_external() { "external" } else { "concrete" }
        );
    }
}

impl DexClass {
    pub(crate) fn ensure_mutable(&self) {
        assert!(
            !self.is_external(),
            "class {:?} is external; its member lists are read-only",
            self.self_type()
        );
    }

    /// Position of `method` in the direct list.
    pub(crate) fn ensure_direct_method(&self, method: MethodId) -> usize {
        match self.direct_methods().iter().position(|&m| m == method) {
            Some(pos) => pos,
            None => panic!(
                "method {method:?} is not a direct method of class {:?}",
                self.self_type()
            ),
        }
    }

    pub(crate) fn ensure_external(&self) {
        assert!(
            self.is_external(),
            "class {:?} is already defined",
            self.self_type()
        );
    }
}

impl DexInstruction {
    pub(crate) fn ensure_reference_fits(&self) {
        let Some(reference) = self.reference() else {
            return;
        };
        let opcode = self.opcode();
        let expected = if self.is_payload() {
            None
        } else {
            instruction::ref_kind(opcode)
        };
        assert!(
            expected == Some(reference.kind()),
            "opcode {opcode:#04x} takes no {:?} operand",
            reference.kind()
        );
        let width = instruction::opcode_width(opcode).unwrap_or(0);
        assert!(
            self.size() >= width,
            "opcode {opcode:#04x} needs {width} code units, got {}",
            self.size()
        );
    }
}
