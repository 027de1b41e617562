//! Committed synthetics.
//!
//! A [`CommittedItems`] snapshot binds a committed collection to the
//! application it was committed into. Snapshots are never mutated: a commit,
//! prune or rewrite builds a new one and the previous one is dropped.

use crate::{invariant, HasHolder, Rewritable, Rewritten, SyntheticDefinition, SyntheticItem, SyntheticReference};
use kiln_ir::{Application, ItemFactory, PrunedItems, RewriteLens, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Id counter value once synthetics are final. No creation is valid after.
pub const INVALID_ID_AFTER_SYNTHETIC_FINALIZATION: i32 = -1;

type ReferenceMap = FxHashMap<TypeId, Vec<SyntheticReference>>;

#[derive(Clone, Debug, Default)]
pub struct CommittedSyntheticsCollection {
    methods: Arc<ReferenceMap>,
    classes: Arc<ReferenceMap>,
    /// Synthetics read from the input rather than created in this run.
    synthetic_inputs: Arc<FxHashSet<TypeId>>,
    /// Global synthetic type to the contexts that requested it.
    global_contexts: Arc<FxHashMap<TypeId, FxHashSet<TypeId>>>,
}

impl CommittedSyntheticsCollection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder(&self) -> CommittedSyntheticsBuilder {
        CommittedSyntheticsBuilder {
            methods: (*self.methods).clone(),
            classes: (*self.classes).clone(),
            synthetic_inputs: (*self.synthetic_inputs).clone(),
            global_contexts: (*self.global_contexts).clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len() + self.classes.len()
    }

    pub fn contains_type(&self, ty: TypeId) -> bool {
        self.methods.contains_key(&ty) || self.classes.contains_key(&ty)
    }

    pub fn contains_synthetic_input(&self, ty: TypeId) -> bool {
        self.synthetic_inputs.contains(&ty)
    }

    pub fn synthetic_inputs(&self) -> &FxHashSet<TypeId> {
        &self.synthetic_inputs
    }

    /// Every reference whose holder is `ty`.
    pub fn items(&self, ty: TypeId) -> impl Iterator<Item = &SyntheticReference> {
        self.methods
            .get(&ty)
            .into_iter()
            .chain(self.classes.get(&ty))
            .flatten()
    }

    pub fn methods(&self) -> &ReferenceMap {
        &self.methods
    }

    pub fn classes(&self) -> &ReferenceMap {
        &self.classes
    }

    pub fn all_items(&self) -> impl Iterator<Item = &SyntheticReference> {
        self.methods.values().chain(self.classes.values()).flatten()
    }

    /// Contexts recorded for a global synthetic, in descriptor order.
    pub fn global_contexts(&self, ty: TypeId, factory: &ItemFactory) -> Vec<TypeId> {
        let mut contexts: Vec<_> = self
            .global_contexts
            .get(&ty)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        contexts.sort_by(|a, b| factory.cmp_types(*a, *b));
        contexts
    }

    /// Every synthetic input is a committed item.
    pub fn verify_containment(&self) -> bool {
        self.synthetic_inputs.iter().all(|ty| self.contains_type(*ty))
    }

    /// Rewrite every reference; references claimed by another pass drop out.
    #[must_use]
    pub fn rewrite_with_lens(&self, lens: &RewriteLens, factory: &ItemFactory) -> Self {
        if lens.is_identity() {
            return self.clone();
        }
        let mut builder = CommittedSyntheticsBuilder::default();
        for reference in self.all_items() {
            match reference.rewrite_with(lens, factory) {
                Rewritten::Unchanged => builder.add_reference(reference.clone()),
                Rewritten::Changed(rewritten) => builder.add_reference(rewritten),
                Rewritten::NoLongerSynthetic => {
                    tracing::trace!(
                        ty = factory.descriptor(reference.holder_type()),
                        "synthetic rewritten to an ordinary class"
                    );
                }
            }
        }
        for ty in self.synthetic_inputs.iter() {
            let rewritten = lens.lookup_type(*ty);
            if builder.contains_type(rewritten) {
                builder.synthetic_inputs.insert(rewritten);
            }
        }
        for (global, contexts) in self.global_contexts.iter() {
            let entry = builder
                .global_contexts
                .entry(lens.lookup_type(*global))
                .or_default();
            entry.extend(contexts.iter().map(|context| lens.lookup_type(*context)));
        }
        builder.build()
    }

    /// Drop items whose holder was removed or made ordinary.
    #[must_use]
    pub fn prune_items(&self, pruned: &PrunedItems) -> Self {
        if pruned.is_empty() {
            return self.clone();
        }
        let keep = |ty: &TypeId| !pruned.is_no_longer_synthetic(*ty);
        let prune_map = |map: &ReferenceMap| -> ReferenceMap {
            map.iter()
                .filter(|(ty, _)| keep(ty))
                .map(|(ty, references)| (*ty, references.clone()))
                .collect()
        };
        let global_contexts = self
            .global_contexts
            .iter()
            .filter(|(ty, _)| keep(ty))
            .map(|(ty, contexts)| {
                let live = contexts
                    .iter()
                    .copied()
                    .filter(|context| !pruned.is_removed(*context))
                    .collect();
                (*ty, live)
            })
            .collect();
        CommittedSyntheticsCollection {
            methods: Arc::new(prune_map(&self.methods)),
            classes: Arc::new(prune_map(&self.classes)),
            synthetic_inputs: Arc::new(self.synthetic_inputs.iter().copied().filter(keep).collect()),
            global_contexts: Arc::new(global_contexts),
        }
    }
}

#[derive(Debug, Default)]
pub struct CommittedSyntheticsBuilder {
    methods: ReferenceMap,
    classes: ReferenceMap,
    synthetic_inputs: FxHashSet<TypeId>,
    global_contexts: FxHashMap<TypeId, FxHashSet<TypeId>>,
}

impl CommittedSyntheticsBuilder {
    pub fn contains_type(&self, ty: TypeId) -> bool {
        self.methods.contains_key(&ty) || self.classes.contains_key(&ty)
    }

    pub fn add_item(&mut self, definition: &SyntheticDefinition) -> &mut Self {
        self.add_reference(definition.to_reference());
        self
    }

    /// Equal references are only recorded once.
    pub fn add_reference(&mut self, reference: SyntheticReference) {
        let map = match reference.item() {
            SyntheticItem::Method(_) => &mut self.methods,
            SyntheticItem::Class => &mut self.classes,
        };
        let references = map.entry(reference.holder_type()).or_default();
        if !references.contains(&reference) {
            references.push(reference);
        }
    }

    pub fn add_global_contexts(
        &mut self,
        global: TypeId,
        contexts: impl IntoIterator<Item = TypeId>,
    ) -> &mut Self {
        self.global_contexts.entry(global).or_default().extend(contexts);
        self
    }

    /// Mark everything added so far as read from the input.
    pub fn collect_synthetic_inputs(&mut self) -> &mut Self {
        self.synthetic_inputs
            .extend(self.methods.keys().chain(self.classes.keys()).copied());
        self
    }

    pub fn build(&mut self) -> CommittedSyntheticsCollection {
        let committed = CommittedSyntheticsCollection {
            methods: Arc::new(std::mem::take(&mut self.methods)),
            classes: Arc::new(std::mem::take(&mut self.classes)),
            synthetic_inputs: Arc::new(std::mem::take(&mut self.synthetic_inputs)),
            global_contexts: Arc::new(std::mem::take(&mut self.global_contexts)),
        };
        invariant!(
            committed.verify_containment(),
            "synthetic input outside the committed items"
        );
        committed
    }
}

/// Immutable commit: the id counter, the application and its synthetics.
#[derive(Clone, Debug)]
pub struct CommittedItems {
    next_synthetic_id: i32,
    application: Application,
    committed: CommittedSyntheticsCollection,
    committed_program_types: Arc<[TypeId]>,
}

impl CommittedItems {
    /// First snapshot of a freshly read application.
    pub fn initial(application: Application) -> Self {
        CommittedItems::new(0, application, CommittedSyntheticsCollection::empty(), Vec::new())
    }

    pub(crate) fn new(
        next_synthetic_id: i32,
        application: Application,
        committed: CommittedSyntheticsCollection,
        committed_program_types: Vec<TypeId>,
    ) -> Self {
        CommittedItems {
            next_synthetic_id,
            application,
            committed,
            committed_program_types: committed_program_types.into(),
        }
    }

    pub fn next_synthetic_id(&self) -> i32 {
        self.next_synthetic_id
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn committed(&self) -> &CommittedSyntheticsCollection {
        &self.committed
    }

    /// Program types added to the application by this commit.
    pub fn committed_program_types(&self) -> &[TypeId] {
        &self.committed_program_types
    }

    pub fn is_finalized(&self) -> bool {
        self.next_synthetic_id == INVALID_ID_AFTER_SYNTHETIC_FINALIZATION
    }
}
