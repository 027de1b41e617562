//! Synthetic item registry.
//!
//! [`SyntheticItems`] pairs the committed collection of the current
//! application with the items created since the last commit. Creation takes
//! `&self` and may run on any number of worker threads; commits consume the
//! registry and yield an immutable [`CommittedItems`] snapshot.
//!
//! # Lifecycle
//!
//! ```text
//! Active --finalize--> Finalizing --commit--> Finalized
//! ```
//!
//! Creation is only valid while active.

use crate::builder::{SyntheticClassBuilder, SyntheticMethodBuilder};
use crate::committed::{
    CommittedItems, CommittedSyntheticsCollection, INVALID_ID_AFTER_SYNTHETIC_FINALIZATION,
};
use crate::marker::strip_marker_from_class;
use crate::{
    invariant, naming, AppView, PendingSynthetics, SynthesisError, SynthesizingContext,
    SyntheticDefinition, SyntheticKind, UniqueContext,
};
use kiln_diagnostic::{Diagnostic, ErrorCode, ErrorGuaranteed};
use kiln_ir::{
    Application, ClassKind, DefinitionLookup, DexClass, FeatureSplit, ItemFactory, MethodRef,
    Origin, ProgramMethod, ProtoId, PrunedItems, RewriteLens, TypeId,
};
use std::fmt;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SynthesisPhase {
    #[default]
    Active,
    Finalizing,
    Finalized,
}

impl fmt::Display for SynthesisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SynthesisPhase::Active => "active",
            SynthesisPhase::Finalizing => "finalizing",
            SynthesisPhase::Finalized => "finalized",
        })
    }
}

#[derive(Default)]
pub struct SyntheticItems {
    next_synthetic_id: i32,
    committed: CommittedSyntheticsCollection,
    pending: PendingSynthetics,
    phase: SynthesisPhase,
}

impl SyntheticItems {
    /// Registry resuming from `commit`, with nothing pending.
    pub fn from_commit(commit: &CommittedItems) -> Self {
        SyntheticItems {
            next_synthetic_id: commit.next_synthetic_id(),
            committed: commit.committed().clone(),
            pending: PendingSynthetics::new(),
            phase: if commit.is_finalized() {
                SynthesisPhase::Finalized
            } else {
                SynthesisPhase::Active
            },
        }
    }

    pub fn phase(&self) -> SynthesisPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: SynthesisPhase) {
        self.phase = phase;
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == SynthesisPhase::Finalized
    }

    pub fn committed(&self) -> &CommittedSyntheticsCollection {
        &self.committed
    }

    pub fn pending(&self) -> &PendingSynthetics {
        &self.pending
    }

    /// Pending holders shadow the application.
    pub fn definition_for(&self, ty: TypeId, app: &Application) -> Option<Arc<DexClass>> {
        if let Some(holder) = self.pending.holder(ty) {
            invariant!(
                !app.has_non_program_type(ty)
                    || holder.is_classpath_class()
                    || self
                        .pending
                        .definition(ty)
                        .is_some_and(|definition| definition.kind().may_override_non_program_type()),
                "pending synthetic {ty:?} shadows a non-program type"
            );
            return Some(holder);
        }
        app.definition_for(ty)
    }

    // Queries

    pub fn is_pending_synthetic(&self, ty: TypeId) -> bool {
        self.pending.contains_type(ty)
    }

    pub fn is_committed_synthetic(&self, ty: TypeId) -> bool {
        self.committed.contains_type(ty)
    }

    pub fn is_synthetic_class(&self, ty: TypeId) -> bool {
        self.is_pending_synthetic(ty) || self.is_committed_synthetic(ty)
    }

    pub fn is_synthetic_input(&self, ty: TypeId) -> bool {
        self.committed.contains_synthetic_input(ty)
    }

    /// Synthetics created by this compilation are never matched by keep
    /// rules; synthetics read from the input are.
    pub fn is_subject_to_keep_rules(&self, ty: TypeId) -> bool {
        !self.is_synthetic_class(ty) || self.is_synthetic_input(ty)
    }

    pub fn is_synthetic_of_kind(&self, ty: TypeId, kind: SyntheticKind) -> bool {
        if let Some(definition) = self.pending.definition(ty) {
            return definition.kind() == kind;
        }
        self.committed.items(ty).any(|reference| reference.kind() == kind)
    }

    pub fn is_synthetic_lambda(&self, ty: TypeId) -> bool {
        self.is_synthetic_of_kind(ty, SyntheticKind::Lambda)
    }

    /// Static interface call stubs are already in their final form.
    pub fn should_not_be_double_processed(&self, ty: TypeId) -> bool {
        self.is_synthetic_of_kind(ty, SyntheticKind::StaticInterfaceCall)
    }

    /// Feature split inherited from the context, for synthetic types only.
    pub fn contextual_feature_split(&self, ty: TypeId, factory: &ItemFactory) -> Option<FeatureSplit> {
        if let Some(definition) = self.pending.definition(ty) {
            return Some(definition.context().feature_split());
        }
        self.committed
            .items(ty)
            .min_by(|a, b| a.compare(b, factory))
            .map(|reference| reference.context().feature_split())
    }

    /// Context types recorded for `ty`, in descriptor order.
    pub fn synthesizing_context_types(&self, ty: TypeId, factory: &ItemFactory) -> Vec<TypeId> {
        let mut contexts: Vec<TypeId> = self
            .pending
            .definition(ty)
            .map(|definition| definition.context().synthesizing_context_type())
            .into_iter()
            .chain(
                self.committed
                    .items(ty)
                    .map(|reference| reference.context().synthesizing_context_type()),
            )
            .collect();
        contexts.sort_by(|a, b| factory.cmp_types(*a, *b));
        contexts.dedup();
        contexts
    }

    pub fn pending_program_classes(&self, factory: &ItemFactory) -> Vec<Arc<DexClass>> {
        self.pending.program_classes(factory)
    }

    pub fn has_pending_synthetic_classes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Context for an item requested while compiling `context_type`.
    ///
    /// Synthetic requesters pass on their own context, so contexts are
    /// always input classes.
    pub fn synthesizing_context(
        &self,
        context_type: TypeId,
        origin: &Origin,
        app_view: &AppView,
    ) -> SynthesizingContext {
        let factory = app_view.factory();
        if let Some(definition) = self.pending.definition(context_type) {
            invariant!(
                definition.kind().may_be_context(),
                "{} synthetic {} used as a context",
                definition.kind(),
                factory.descriptor(context_type)
            );
            return definition.context().clone();
        }
        if let Some(reference) = self
            .committed
            .items(context_type)
            .min_by(|a, b| a.compare(b, factory))
        {
            invariant!(
                reference.kind().may_be_context(),
                "{} synthetic {} used as a context",
                reference.kind(),
                factory.descriptor(context_type)
            );
            return reference.context().clone();
        }
        SynthesizingContext::from_non_synthetic_input_context(
            context_type,
            origin.clone(),
            app_view.features().feature_split_for(context_type),
        )
    }

    fn check_creation(&self, kind: SyntheticKind) -> Result<(), SynthesisError> {
        if self.phase == SynthesisPhase::Active {
            return Ok(());
        }
        Err(SynthesisError::CreationAfterFinalization {
            kind: kind.to_string(),
            phase: self.phase.to_string(),
        })
    }

    /// Internal names are never reused, whether the earlier item is still
    /// pending, already committed or an input class.
    fn check_unused(&self, ty: TypeId, app_view: &AppView) -> Result<(), SynthesisError> {
        if self.is_synthetic_class(ty) || app_view.app().contains_type(ty) {
            return Err(existing_type(ty, app_view.factory()));
        }
        Ok(())
    }

    // Creation

    /// Create a numbered class under an internal name unique to `unique`.
    pub fn create_class(
        &self,
        kind: SyntheticKind,
        unique: &UniqueContext,
        app_view: &AppView,
        build: impl FnOnce(&mut SyntheticClassBuilder<'_>),
    ) -> Result<Arc<DexClass>, SynthesisError> {
        self.check_creation(kind)?;
        invariant!(
            !kind.is_single_method() && !kind.is_fixed_suffix(),
            "{kind} is not a numbered class kind"
        );
        let factory = app_view.factory();
        let context = self.synthesizing_context(unique.class_context(), unique.origin(), app_view);
        let ty = naming::create_internal_type(
            kind,
            &context,
            unique.synthetic_suffix(),
            app_view.options().intermediate,
            factory,
        );
        self.check_unused(ty, app_view)?;
        let mut builder = SyntheticClassBuilder::new(
            factory,
            ty,
            ClassKind::Program,
            context.input_context_origin().clone(),
        );
        build(&mut builder);
        let class = Arc::new(builder.build());
        let definition = SyntheticDefinition::class(kind, context, Arc::clone(&class));
        if !self.pending.try_insert(definition) {
            return Err(existing_type(ty, factory));
        }
        tracing::trace!(kind = %kind, ty = factory.descriptor(ty), "synthetic class created");
        Ok(class)
    }

    /// Create a single-method holder; the method is named `m`.
    pub fn create_method(
        &self,
        kind: SyntheticKind,
        unique: &UniqueContext,
        app_view: &AppView,
        build: impl FnOnce(&mut SyntheticMethodBuilder<'_>),
    ) -> Result<ProgramMethod, SynthesisError> {
        self.check_creation(kind)?;
        invariant!(kind.is_single_method(), "{kind} is not a method kind");
        let factory = app_view.factory();
        let context = self.synthesizing_context(unique.class_context(), unique.origin(), app_view);
        let ty = naming::create_internal_type(
            kind,
            &context,
            unique.synthetic_suffix(),
            app_view.options().intermediate,
            factory,
        );
        self.check_unused(ty, app_view)?;
        let mut method_builder = SyntheticMethodBuilder::for_synthetic_method(factory, ty);
        build(&mut method_builder);
        let method = method_builder.build();
        let reference = method.reference;

        let mut class_builder = SyntheticClassBuilder::new(
            factory,
            ty,
            ClassKind::Program,
            context.input_context_origin().clone(),
        );
        class_builder.add_method_def(method);
        let holder = Arc::new(class_builder.build());
        let definition = SyntheticDefinition::method(kind, context, Arc::clone(&holder), reference);
        if !self.pending.try_insert(definition) {
            return Err(existing_type(ty, factory));
        }
        tracing::trace!(
            kind = %kind,
            method = factory.method_to_string(reference),
            "synthetic method created"
        );
        Ok(ProgramMethod::new(holder, reference))
    }

    /// Create a fixed class named after the context of `context_class`.
    pub fn create_fixed_class(
        &self,
        kind: SyntheticKind,
        context_class: &DexClass,
        app_view: &AppView,
        build: impl FnOnce(&mut SyntheticClassBuilder<'_>),
    ) -> Result<Arc<DexClass>, SynthesisError> {
        self.check_creation(kind)?;
        invariant!(
            kind.is_fixed_suffix() && !kind.is_global(),
            "{kind} is not a fixed kind"
        );
        let context = self.synthesizing_context(context_class.ty, &context_class.origin, app_view);
        let ty = naming::create_fixed_type(kind, &context, app_view.factory());
        Ok(self.create_holder(kind, context, ty, ClassKind::Program, app_view, build))
    }

    /// The fixed class for the context of `context_class`, created on first
    /// request. `on_creation` runs once, for the request that created it.
    pub fn ensure_fixed_class(
        &self,
        kind: SyntheticKind,
        context_class: &DexClass,
        app_view: &AppView,
        build: impl FnOnce(&mut SyntheticClassBuilder<'_>),
        on_creation: impl FnOnce(&Arc<DexClass>),
    ) -> Result<Arc<DexClass>, SynthesisError> {
        self.check_creation(kind)?;
        invariant!(
            kind.is_fixed_suffix() && !kind.is_global(),
            "{kind} is not a fixed kind"
        );
        let context = self.synthesizing_context(context_class.ty, &context_class.origin, app_view);
        let ty = naming::create_fixed_type(kind, &context, app_view.factory());
        self.ensure_holder(kind, context, ty, ClassKind::Program, app_view, build, on_creation)
    }

    /// A method of the fixed class for `context_class`, added on first request.
    #[allow(clippy::too_many_arguments, reason = "mirrors ensure_fixed_class plus the method")]
    pub fn ensure_fixed_class_method(
        &self,
        name: &str,
        proto: ProtoId,
        kind: SyntheticKind,
        context_class: &DexClass,
        app_view: &AppView,
        build_class: impl FnOnce(&mut SyntheticClassBuilder<'_>),
        build_method: impl FnOnce(&mut SyntheticMethodBuilder<'_>),
    ) -> Result<ProgramMethod, SynthesisError> {
        let holder = self.ensure_fixed_class(kind, context_class, app_view, build_class, |_| {})?;
        let (holder, method) = self.ensure_member(kind, &holder, name, proto, app_view, build_method);
        Ok(ProgramMethod::new(holder, method))
    }

    /// Create a fixed class on the classpath of the current compilation.
    pub fn create_fixed_classpath_class(
        &self,
        kind: SyntheticKind,
        context_class: &DexClass,
        app_view: &AppView,
        build: impl FnOnce(&mut SyntheticClassBuilder<'_>),
    ) -> Result<Arc<DexClass>, SynthesisError> {
        self.check_creation(kind)?;
        invariant!(kind.is_fixed_suffix(), "{kind} is not a fixed kind");
        let context = classpath_context(context_class, app_view);
        let ty = naming::create_fixed_type(kind, &context, app_view.factory());
        Ok(self.create_holder(kind, context, ty, ClassKind::Classpath, app_view, build))
    }

    pub fn ensure_fixed_classpath_class(
        &self,
        kind: SyntheticKind,
        context_class: &DexClass,
        app_view: &AppView,
        build: impl FnOnce(&mut SyntheticClassBuilder<'_>),
        on_creation: impl FnOnce(&Arc<DexClass>),
    ) -> Result<Arc<DexClass>, SynthesisError> {
        self.check_creation(kind)?;
        invariant!(kind.is_fixed_suffix(), "{kind} is not a fixed kind");
        let context = classpath_context(context_class, app_view);
        let ty = naming::create_fixed_type(kind, &context, app_view.factory());
        self.ensure_holder(kind, context, ty, ClassKind::Classpath, app_view, build, on_creation)
    }

    #[allow(clippy::too_many_arguments, reason = "mirrors ensure_fixed_classpath_class plus the method")]
    pub fn ensure_fixed_classpath_class_method(
        &self,
        name: &str,
        proto: ProtoId,
        kind: SyntheticKind,
        context_class: &DexClass,
        app_view: &AppView,
        build_class: impl FnOnce(&mut SyntheticClassBuilder<'_>),
        build_method: impl FnOnce(&mut SyntheticMethodBuilder<'_>),
    ) -> Result<(Arc<DexClass>, MethodRef), SynthesisError> {
        let holder =
            self.ensure_fixed_classpath_class(kind, context_class, app_view, build_class, |_| {})?;
        Ok(self.ensure_member(kind, &holder, name, proto, app_view, build_method))
    }

    /// The program-wide class `global_type`, created on first request.
    ///
    /// Every request records `contexts` as users of the class.
    pub fn ensure_global_class(
        &self,
        kind: SyntheticKind,
        global_type: TypeId,
        contexts: impl IntoIterator<Item = TypeId>,
        app_view: &AppView,
        build: impl FnOnce(&mut SyntheticClassBuilder<'_>),
        on_creation: impl FnOnce(&Arc<DexClass>),
    ) -> Result<Arc<DexClass>, SynthesisError> {
        self.check_creation(kind)?;
        invariant!(kind.is_global(), "{kind} is not a global kind");
        for context in contexts {
            self.pending.add_global_context(global_type, context);
        }
        let context = SynthesizingContext::from_type(global_type);
        self.ensure_holder(
            kind,
            context,
            global_type,
            ClassKind::Program,
            app_view,
            build,
            on_creation,
        )
    }

    fn create_holder(
        &self,
        kind: SyntheticKind,
        context: SynthesizingContext,
        ty: TypeId,
        class_kind: ClassKind,
        app_view: &AppView,
        build: impl FnOnce(&mut SyntheticClassBuilder<'_>),
    ) -> Arc<DexClass> {
        let factory = app_view.factory();
        let mut builder =
            SyntheticClassBuilder::new(factory, ty, class_kind, context.input_context_origin().clone());
        build(&mut builder);
        let class = Arc::new(builder.build());
        tracing::trace!(kind = %kind, ty = factory.descriptor(ty), "synthetic class created");
        self.pending
            .insert(SyntheticDefinition::class(kind, context, Arc::clone(&class)));
        class
    }

    /// Existing holder of `ty` with the requested class kind.
    fn existing_holder(
        &self,
        kind: SyntheticKind,
        ty: TypeId,
        class_kind: ClassKind,
        app: &Application,
    ) -> Option<Arc<DexClass>> {
        if let Some(holder) = self.pending.holder(ty) {
            invariant!(holder.kind == class_kind, "synthetic {ty:?} requested with another class kind");
            return Some(holder);
        }
        let existing = match class_kind {
            ClassKind::Program => app.program_definition_for(ty),
            ClassKind::Classpath => app.classpath_definition_for(ty),
        };
        if let Some(existing) = existing {
            return Some(Arc::clone(existing));
        }
        invariant!(
            class_kind == ClassKind::Classpath
                || kind.may_override_non_program_type()
                || !app.has_non_program_type(ty),
            "{kind} synthetic {ty:?} collides with a non-program type"
        );
        None
    }

    #[allow(clippy::too_many_arguments, reason = "shared by every ensure operation")]
    fn ensure_holder(
        &self,
        kind: SyntheticKind,
        context: SynthesizingContext,
        ty: TypeId,
        class_kind: ClassKind,
        app_view: &AppView,
        build: impl FnOnce(&mut SyntheticClassBuilder<'_>),
        on_creation: impl FnOnce(&Arc<DexClass>),
    ) -> Result<Arc<DexClass>, SynthesisError> {
        if let Some(existing) = self.existing_holder(kind, ty, class_kind, app_view.app()) {
            return Ok(existing);
        }
        let lock = self.pending.class_lock(ty);
        let _guard = lock.lock();
        if let Some(existing) = self.existing_holder(kind, ty, class_kind, app_view.app()) {
            return Ok(existing);
        }
        let class = self.create_holder(kind, context, ty, class_kind, app_view, build);
        on_creation(&class);
        Ok(class)
    }

    /// Add the method `name` with `proto` to a fixed holder unless present.
    fn ensure_member(
        &self,
        kind: SyntheticKind,
        holder: &Arc<DexClass>,
        name: &str,
        proto: ProtoId,
        app_view: &AppView,
        build_method: impl FnOnce(&mut SyntheticMethodBuilder<'_>),
    ) -> (Arc<DexClass>, MethodRef) {
        let factory = app_view.factory();
        let ty = holder.ty;
        let method = factory.create_method(ty, name, proto);
        if holder.find_method(method).is_some() {
            return (Arc::clone(holder), method);
        }
        let lock = self.pending.member_lock(ty);
        let _guard = lock.lock();
        let current = self
            .definition_for(ty, app_view.app())
            .unwrap_or_else(|| Arc::clone(holder));
        if current.find_method(method).is_some() {
            return (current, method);
        }

        let mut method_builder = SyntheticMethodBuilder::new(factory, ty, name);
        method_builder.set_proto(proto);
        build_method(&mut method_builder);
        let mut amended = (*current).clone();
        amended.methods.push(method_builder.build());
        amended
            .methods
            .sort_by(|a, b| factory.cmp_methods(a.reference, b.reference));
        let amended = Arc::new(amended);

        let definition = match self.pending.definition(ty) {
            Some(definition) => definition.with_holder(Arc::clone(&amended)),
            None => {
                let context = self
                    .committed
                    .items(ty)
                    .min_by(|a, b| a.compare(b, factory))
                    .map_or_else(
                        || SynthesizingContext::from_type(ty),
                        |reference| reference.context().clone(),
                    );
                SyntheticDefinition::class(kind, context, Arc::clone(&amended))
            }
        };
        tracing::trace!(method = factory.method_to_string(method), "synthetic member added");
        self.pending.amend(definition);
        (amended, method)
    }

    // Commit

    /// Move every pending item into `app`, producing the next snapshot.
    pub fn commit(self, app: Application, factory: &ItemFactory) -> CommittedItems {
        self.commit_pruned_items(&PrunedItems::empty(app), factory)
    }

    /// Commit into the pruned application, forgetting pruned synthetics.
    pub fn commit_pruned_items(self, pruned: &PrunedItems, factory: &ItemFactory) -> CommittedItems {
        self.commit_inner(pruned, None, factory)
    }

    /// Commit into an application already rewritten by `lens`.
    ///
    /// Pending items must not refer to anything the lens renames.
    pub fn commit_rewritten_with_lens(
        self,
        app: Application,
        lens: &RewriteLens,
        factory: &ItemFactory,
    ) -> CommittedItems {
        self.commit_inner(&PrunedItems::empty(app), Some(lens), factory)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(pending = self.pending.len()))]
    fn commit_inner(
        self,
        pruned: &PrunedItems,
        lens: Option<&RewriteLens>,
        factory: &ItemFactory,
    ) -> CommittedItems {
        let SyntheticItems {
            next_synthetic_id,
            committed,
            pending,
            phase,
        } = self;
        invariant!(
            phase == SynthesisPhase::Active || pending.is_empty(),
            "pending synthetics while {phase}"
        );

        let mut committed = committed.prune_items(pruned);
        if let Some(lens) = lens {
            invariant!(
                pending.verify_not_rewritten(|ty| lens.lookup_type(ty)),
                "pending synthetic refers to a renamed type"
            );
            committed = committed.rewrite_with_lens(lens, factory);
        }

        let (definitions, global_contexts) = pending.take_sorted(factory);
        let mut app = pruned.pruned_app().builder();
        let mut builder = committed.builder();
        let mut committed_program_types = Vec::new();
        for definition in &definitions {
            let holder = definition.holder();
            if pruned.is_no_longer_synthetic(holder.ty) {
                continue;
            }
            if holder.is_program_class() {
                if definition.kind().may_override_non_program_type() {
                    app.add_program_class_overriding_non_program(Arc::clone(holder));
                } else {
                    app.add_program_class(Arc::clone(holder));
                }
                committed_program_types.push(holder.ty);
            } else {
                app.add_classpath_class(Arc::clone(holder));
            }
            builder.add_item(definition);
        }
        for (global, contexts) in global_contexts {
            let contexts = contexts.into_iter().filter(|context| !pruned.is_removed(*context));
            builder.add_global_contexts(global, contexts);
        }
        committed_program_types.dedup();

        let next_synthetic_id = if next_synthetic_id == INVALID_ID_AFTER_SYNTHETIC_FINALIZATION {
            next_synthetic_id
        } else {
            next_synthetic_id + 1
        };
        tracing::debug!(
            added = definitions.len(),
            next_synthetic_id,
            "synthetics committed"
        );
        CommittedItems::new(
            next_synthetic_id,
            app.build(),
            builder.build(),
            committed_program_types,
        )
    }
}

fn existing_type(ty: TypeId, factory: &ItemFactory) -> SynthesisError {
    SynthesisError::ExistingSyntheticType {
        ty: factory.descriptor(ty).to_owned(),
    }
}

/// Context of a classpath synthetic: the classpath class itself.
fn classpath_context(context_class: &DexClass, app_view: &AppView) -> SynthesizingContext {
    SynthesizingContext::from_non_synthetic_input_context(
        context_class.ty,
        context_class.origin.clone(),
        app_view.features().feature_split_for(context_class.ty),
    )
}

/// Strip markers from every input class and seed the committed collection
/// with the synthetics they describe.
///
/// All problems are reported before returning, so one bad input does not
/// hide the others.
pub(crate) fn collect_synthetic_inputs(
    app_view: &AppView,
) -> Result<CommittedItems, ErrorGuaranteed> {
    let factory = app_view.factory();
    let reporter = app_view.reporter();
    let app = app_view.app();
    let errors_before = reporter.error_count();

    let mut app_builder = app.builder();
    let mut builder = app_view.synthetics().committed().builder();
    for class in app.program_classes_sorted(factory) {
        let stripped = strip_marker_from_class(class, factory, app_view.features(), reporter);
        if !Arc::ptr_eq(&stripped.class, class) {
            app_builder.add_program_class(Arc::clone(&stripped.class));
        }
        let Some(marker) = stripped.marker else {
            continue;
        };
        let (kind, context) = marker.into_parts();
        let context_type = context.synthesizing_context_type();
        if !app_view.options().intermediate
            && !kind.is_global()
            && app.program_definition_for(context_type).is_none()
        {
            reporter.error(
                Diagnostic::error(ErrorCode::E7001)
                    .with_message("Attempt at compiling intermediate artifact without its context")
                    .with_origin(class.origin.clone())
                    .with_note(format!(
                        "`{}` was synthesized from `{}`, which is not a program class",
                        factory.descriptor(class.ty),
                        factory.descriptor(context_type)
                    )),
            );
            continue;
        }
        let holder = stripped.class;
        let definition = if kind.is_single_method() {
            let [method] = holder.methods.as_slice() else {
                reporter.error(
                    Diagnostic::error(ErrorCode::E7004)
                        .with_message(format!(
                            "{kind} synthetic `{}` must hold exactly one method",
                            factory.descriptor(holder.ty)
                        ))
                        .with_origin(holder.origin.clone()),
                );
                continue;
            };
            let reference = method.reference;
            SyntheticDefinition::method(kind, context, Arc::clone(&holder), reference)
        } else {
            SyntheticDefinition::class(kind, context, Arc::clone(&holder))
        };
        tracing::trace!(kind = %kind, ty = factory.descriptor(holder.ty), "synthetic input");
        builder.add_item(&definition);
    }
    for class in app.classpath_classes() {
        let stripped = strip_marker_from_class(class, factory, app_view.features(), reporter);
        if !Arc::ptr_eq(&stripped.class, class) {
            app_builder.add_classpath_class(stripped.class);
        }
    }

    if let Some(guarantee) =
        ErrorGuaranteed::from_error_count(reporter.error_count().saturating_sub(errors_before))
    {
        return Err(guarantee);
    }
    builder.collect_synthetic_inputs();
    let synthetics = app_view.synthetics();
    Ok(CommittedItems::new(
        synthetics.next_synthetic_id,
        app_builder.build(),
        builder.build(),
        Vec::new(),
    ))
}
