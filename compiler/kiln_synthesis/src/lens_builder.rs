//! Lens builder used while finalizing.
//!
//! Records the synthetic moves decided by naming, then serves as the
//! [`FixupMapping`] of the tree fixer so that every change the fixer makes
//! lands in the same delta.

use crate::invariant;
use kiln_ir::{FieldRef, FixupMapping, LensDelta, LensDeltaBuilder, MethodRef, TypeId};
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct FinalizationLensBuilder {
    /// Internal holder to final holder, for class and method synthetics.
    synthetic_types: FxHashMap<TypeId, TypeId>,
    synthetic_methods: FxHashMap<MethodRef, MethodRef>,
    delta: LensDeltaBuilder,
}

impl FinalizationLensBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_synthetic_class(&mut self, from: TypeId, to: TypeId) {
        let previous = self.synthetic_types.insert(from, to);
        invariant!(previous.is_none(), "synthetic class {from:?} moved twice");
        self.delta.move_type(from, to);
    }

    pub fn move_synthetic_method(&mut self, from: MethodRef, to: MethodRef) {
        let previous = self.synthetic_methods.insert(from, to);
        invariant!(previous.is_none(), "synthetic method {from:?} moved twice");
        self.synthetic_types.insert(from.holder, to.holder);
        self.delta.move_method(from, to);
        self.delta.move_type(from.holder, to.holder);
    }

    pub fn synthetic_type(&self, ty: TypeId) -> Option<TypeId> {
        self.synthetic_types.get(&ty).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }

    /// The delta, or `None` when finalization renamed nothing.
    pub fn build(self) -> Option<LensDelta> {
        if self.delta.is_empty() {
            return None;
        }
        Some(self.delta.build())
    }
}

impl FixupMapping for FinalizationLensBuilder {
    fn map_type(&self, ty: TypeId) -> TypeId {
        self.synthetic_type(ty).unwrap_or(ty)
    }

    fn map_method(&self, method: MethodRef) -> Option<MethodRef> {
        self.synthetic_methods.get(&method).copied()
    }

    fn record_class_change(&mut self, from: TypeId, to: TypeId) {
        self.delta.move_type(from, to);
    }

    fn record_field_change(&mut self, from: FieldRef, to: FieldRef) {
        self.delta.move_field(from, to);
    }

    fn record_method_change(&mut self, from: MethodRef, to: MethodRef) {
        self.delta.move_method(from, to);
    }
}

#[cfg(test)]
mod tests;
