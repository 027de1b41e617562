//! Rewrite lenses.
//!
//! A [`LensDelta`] records how one pass renamed or merged types, fields and
//! methods. A [`RewriteLens`] is the chain of deltas applied so far; lookups
//! walk the chain front to back, original-name queries walk it back to front.

use crate::{FieldRef, ItemFactory, MethodRef, TypeId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Renamings produced by a single pass.
#[derive(Debug, Default)]
pub struct LensDelta {
    types: FxHashMap<TypeId, TypeId>,
    original_types: FxHashMap<TypeId, Vec<TypeId>>,
    fields: FxHashMap<FieldRef, FieldRef>,
    /// Many-to-one field moves keep the first source as representative.
    field_representatives: FxHashMap<FieldRef, FieldRef>,
    methods: FxHashMap<MethodRef, MethodRef>,
    original_method_signatures: FxHashMap<MethodRef, Vec<MethodRef>>,
}

impl LensDelta {
    pub fn builder() -> LensDeltaBuilder {
        LensDeltaBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.fields.is_empty() && self.methods.is_empty()
    }

    pub fn lookup_type(&self, ty: TypeId) -> TypeId {
        self.types.get(&ty).copied().unwrap_or(ty)
    }

    pub fn has_type_move(&self, ty: TypeId) -> bool {
        self.types.contains_key(&ty)
    }

    pub fn lookup_field(&self, field: FieldRef) -> FieldRef {
        if let Some(moved) = self.fields.get(&field) {
            return *moved;
        }
        FieldRef {
            holder: self.lookup_type(field.holder),
            name: field.name,
            ty: self.lookup_type(field.ty),
        }
    }

    pub fn lookup_method(&self, method: MethodRef, factory: &ItemFactory) -> MethodRef {
        if let Some(moved) = self.methods.get(&method) {
            return *moved;
        }
        MethodRef {
            holder: self.lookup_type(method.holder),
            name: method.name,
            proto: factory.map_proto(method.proto, |ty| self.lookup_type(ty)),
        }
    }

    /// Types that were moved onto `ty`; empty when `ty` is not a move target.
    pub fn original_types(&self, ty: TypeId) -> &[TypeId] {
        self.original_types.get(&ty).map_or(&[], Vec::as_slice)
    }

    pub fn representative_field(&self, field: FieldRef) -> Option<FieldRef> {
        self.field_representatives.get(&field).copied()
    }

    pub fn original_method_signatures(&self, method: MethodRef) -> &[MethodRef] {
        self.original_method_signatures
            .get(&method)
            .map_or(&[], Vec::as_slice)
    }

    pub fn type_moves(&self) -> impl Iterator<Item = (TypeId, TypeId)> + '_ {
        self.types.iter().map(|(from, to)| (*from, *to))
    }
}

#[derive(Debug, Default)]
pub struct LensDeltaBuilder {
    delta: LensDelta,
}

impl LensDeltaBuilder {
    pub fn move_type(&mut self, from: TypeId, to: TypeId) {
        if from == to {
            return;
        }
        self.delta.types.insert(from, to);
        let originals = self.delta.original_types.entry(to).or_default();
        if !originals.contains(&from) {
            originals.push(from);
        }
    }

    pub fn move_field(&mut self, from: FieldRef, to: FieldRef) {
        if from == to {
            return;
        }
        self.delta.fields.insert(from, to);
        self.delta.field_representatives.entry(to).or_insert(from);
    }

    pub fn move_method(&mut self, from: MethodRef, to: MethodRef) {
        if from == to {
            return;
        }
        self.delta.methods.insert(from, to);
        let originals = self
            .delta
            .original_method_signatures
            .entry(to)
            .or_default();
        if !originals.contains(&from) {
            originals.push(from);
        }
    }

    pub fn type_move(&self, from: TypeId) -> Option<TypeId> {
        self.delta.types.get(&from).copied()
    }

    pub fn method_move(&self, from: MethodRef) -> Option<MethodRef> {
        self.delta.methods.get(&from).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }

    pub fn build(self) -> LensDelta {
        self.delta
    }
}

/// Chain of deltas, oldest first.
#[derive(Clone, Debug, Default)]
pub struct RewriteLens {
    deltas: Vec<Arc<LensDelta>>,
}

impl RewriteLens {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.deltas.iter().all(|delta| delta.is_empty())
    }

    /// A lens that applies `delta` after every delta of `self`.
    #[must_use]
    pub fn with_delta(&self, delta: Arc<LensDelta>) -> Self {
        let mut deltas = self.deltas.clone();
        deltas.push(delta);
        RewriteLens { deltas }
    }

    pub fn deltas(&self) -> &[Arc<LensDelta>] {
        &self.deltas
    }

    pub fn lookup_type(&self, ty: TypeId) -> TypeId {
        self.deltas
            .iter()
            .fold(ty, |current, delta| delta.lookup_type(current))
    }

    pub fn lookup_field(&self, field: FieldRef) -> FieldRef {
        self.deltas
            .iter()
            .fold(field, |current, delta| delta.lookup_field(current))
    }

    pub fn lookup_method(&self, method: MethodRef, factory: &ItemFactory) -> MethodRef {
        self.deltas
            .iter()
            .fold(method, |current, delta| delta.lookup_method(current, factory))
    }

    /// Every type before the first delta that maps onto `ty`.
    pub fn all_original_types(&self, ty: TypeId) -> SmallVec<[TypeId; 2]> {
        let mut current: SmallVec<[TypeId; 2]> = SmallVec::new();
        current.push(ty);
        for delta in self.deltas.iter().rev() {
            let mut previous: SmallVec<[TypeId; 2]> = SmallVec::new();
            for ty in current {
                let originals = delta.original_types(ty);
                let sources = if originals.is_empty() {
                    std::slice::from_ref(&ty)
                } else {
                    originals
                };
                for source in sources {
                    if !previous.contains(source) {
                        previous.push(*source);
                    }
                }
            }
            current = previous;
        }
        current
    }

    /// First original type of `ty`, or `ty` itself.
    pub fn original_type(&self, ty: TypeId) -> TypeId {
        self.all_original_types(ty).first().copied().unwrap_or(ty)
    }

    /// Whether `from` was renamed to `to` without anything else merging into `to`.
    pub fn is_simple_renaming(&self, from: TypeId, to: TypeId) -> bool {
        if from == to || self.lookup_type(from) != to {
            return false;
        }
        let originals = self.all_original_types(to);
        originals.len() == 1 && originals[0] == from
    }

    /// Every signature before the first delta that maps onto `method`.
    pub fn original_method_signatures(&self, method: MethodRef) -> Vec<MethodRef> {
        let mut current = vec![method];
        for delta in self.deltas.iter().rev() {
            let mut previous = Vec::new();
            for method in current {
                let originals = delta.original_method_signatures(method);
                let sources = if originals.is_empty() {
                    std::slice::from_ref(&method)
                } else {
                    originals
                };
                for source in sources {
                    if !previous.contains(source) {
                        previous.push(*source);
                    }
                }
            }
            current = previous;
        }
        current
    }
}
