//! Pending synthetics: items created since the last commit.
//!
//! Workers insert concurrently. Ensure-or-create of a fixed class takes a
//! lock scoped to the target type only, so requests for different helpers
//! never contend.

use crate::{invariant, SyntheticDefinition};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kiln_ir::{DexClass, ItemFactory, TypeId};
use parking_lot::Mutex;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::sync::Arc;

type KeyLocks = DashMap<TypeId, Arc<Mutex<()>>, FxBuildHasher>;

#[derive(Default)]
pub struct PendingSynthetics {
    definitions: DashMap<TypeId, SyntheticDefinition, FxBuildHasher>,
    /// Contexts of global synthetics requested since the last commit.
    global_contexts: DashMap<TypeId, FxHashSet<TypeId>, FxBuildHasher>,
    class_locks: KeyLocks,
    member_locks: KeyLocks,
}

impl PendingSynthetics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn contains_type(&self, ty: TypeId) -> bool {
        self.definitions.contains_key(&ty)
    }

    pub fn definition(&self, ty: TypeId) -> Option<SyntheticDefinition> {
        self.definitions.get(&ty).map(|entry| entry.value().clone())
    }

    pub fn holder(&self, ty: TypeId) -> Option<Arc<DexClass>> {
        self.definitions
            .get(&ty)
            .map(|entry| Arc::clone(entry.value().holder()))
    }

    /// Add a newly created item. Each type is created once.
    pub fn insert(&self, definition: SyntheticDefinition) {
        let ty = definition.holder().ty;
        let previous = self.definitions.insert(ty, definition);
        invariant!(previous.is_none(), "synthetic {ty:?} created twice");
    }

    /// Add `definition` unless its type is already pending. Returns whether
    /// it was added.
    pub fn try_insert(&self, definition: SyntheticDefinition) -> bool {
        match self.definitions.entry(definition.holder().ty) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(definition);
                true
            }
        }
    }

    /// Replace the pending definition of a fixed class that gained members.
    pub fn amend(&self, definition: SyntheticDefinition) {
        let ty = definition.holder().ty;
        invariant!(
            definition.kind().is_fixed_suffix(),
            "only fixed synthetics gain members after creation"
        );
        self.definitions.insert(ty, definition);
    }

    pub fn add_global_context(&self, global: TypeId, context: TypeId) {
        self.global_contexts.entry(global).or_default().insert(context);
    }

    pub(crate) fn class_lock(&self, ty: TypeId) -> Arc<Mutex<()>> {
        Arc::clone(self.class_locks.entry(ty).or_default().value())
    }

    pub(crate) fn member_lock(&self, ty: TypeId) -> Arc<Mutex<()>> {
        Arc::clone(self.member_locks.entry(ty).or_default().value())
    }

    /// Program holders in descriptor order.
    pub fn program_classes(&self, factory: &ItemFactory) -> Vec<Arc<DexClass>> {
        let mut classes: Vec<_> = self
            .definitions
            .iter()
            .filter(|entry| entry.value().holder().is_program_class())
            .map(|entry| Arc::clone(entry.value().holder()))
            .collect();
        classes.sort_by(|a, b| factory.cmp_types(a.ty, b.ty));
        classes
    }

    /// Drain every definition in descriptor order, plus the global contexts.
    pub(crate) fn take_sorted(
        self,
        factory: &ItemFactory,
    ) -> (Vec<SyntheticDefinition>, Vec<(TypeId, FxHashSet<TypeId>)>) {
        let mut definitions: Vec<_> = self
            .definitions
            .into_iter()
            .map(|(_, definition)| definition)
            .collect();
        definitions.sort_by(|a, b| factory.cmp_types(a.holder().ty, b.holder().ty));
        let global_contexts = self.global_contexts.into_iter().collect();
        (definitions, global_contexts)
    }

    /// Whether no pending item refers to a type that `rename` would change.
    pub fn verify_not_rewritten(&self, rename: impl Fn(TypeId) -> TypeId) -> bool {
        self.definitions.iter().all(|entry| {
            let definition = entry.value();
            rename(definition.holder().ty) == definition.holder().ty
                && rename(definition.context().synthesizing_context_type())
                    == definition.context().synthesizing_context_type()
        })
    }
}
