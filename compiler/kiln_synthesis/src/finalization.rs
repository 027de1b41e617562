//! Synthetic finalization.
//!
//! Runs once, after the last pass that creates synthetics. Every committed
//! program synthetic is resolved, clustered with the structurally equal
//! ones, and the cluster is renamed to a single external type:
//!
//! 1. Resolve references and check that passes kept the synthetic shape
//! 2. Bucket by structural hash, with synthetic types seen as one sentinel
//! 3. Split buckets into groups of equivalent items
//! 4. Pick the smallest reference of each group as its representative
//! 5. Name groups by prefix, in representative order
//! 6. Rebuild the program around the representatives and fix references
//!
//! Method kinds go first; both runs share the per-prefix id generators.

use crate::committed::{
    CommittedItems, CommittedSyntheticsBuilder, INVALID_ID_AFTER_SYNTHETIC_FINALIZATION,
};
use crate::items::SynthesisPhase;
use crate::marker::add_marker_to_class;
use crate::naming::{self, INTERNAL_SYNTHETIC_METHOD_NAME};
use crate::{
    invariant, AppView, CommittedSyntheticsCollection, EquivalenceGroup, FinalizationLensBuilder,
    HasHolder, SynthesisError, SyntheticClassBuilder, SyntheticDefinition, SyntheticKind,
    SyntheticMethodBuilder, SyntheticReference,
};
use kiln_ir::{
    Application, ClassKind, DexClass, ItemFactory, LensDelta, MainDexInfo, PrunedItems, TreeFixer,
    TypeId,
};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of [`compute_final_synthetics`].
#[derive(Debug)]
pub struct FinalizationResult {
    /// Final snapshot; its id counter is the finalization sentinel.
    pub commit: CommittedItems,
    /// Renamings to apply to everything outside the program, if any.
    pub lens: Option<LensDelta>,
    /// Every synthetic holder that did not survive as a final type.
    pub pruned_items: PrunedItems,
    pub main_dex: MainDexInfo,
}

/// Next free id per external name prefix.
type Generators = BTreeMap<String, u32>;

/// Final type and its group, in naming order.
type NamedGroups = Vec<(TypeId, EquivalenceGroup)>;

type FinalProgram = (Application, CommittedSyntheticsCollection, Option<LensDelta>);

/// Finalize the synthetics of `app_view` and install the result.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(committed = app_view.synthetics().committed().len())
)]
pub fn finalize(app_view: &mut AppView) -> Result<(), SynthesisError> {
    if app_view.synthetics().phase() != SynthesisPhase::Active {
        return Err(SynthesisError::AlreadyFinalized);
    }
    if app_view.synthetics().has_pending_synthetic_classes() {
        app_view.commit();
    }
    app_view
        .synthetics_mut()
        .set_phase(SynthesisPhase::Finalizing);

    let result = compute_final_synthetics(app_view)?;
    app_view.set_main_dex(result.main_dex);
    app_view.set_commit(result.commit);
    if let Some(delta) = result.lens {
        app_view.append_lens(delta);
    }
    app_view.prune_items(&result.pruned_items);
    Ok(())
}

/// Compute the final program without installing it.
pub fn compute_final_synthetics(app_view: &AppView) -> Result<FinalizationResult, SynthesisError> {
    verify_no_nested_synthetics(app_view);
    let committed = app_view.synthetics().committed();
    let factory = app_view.factory();

    let mut generators = Generators::new();
    let method_groups = compute_equivalences(app_view, committed.methods().values().flatten(), &mut generators)?;
    let class_groups = compute_equivalences(
        app_view,
        committed
            .classes()
            .values()
            .flatten()
            .filter(|reference| reference.is_program()),
        &mut generators,
    )?;
    tracing::debug!(
        method_groups = method_groups.len(),
        class_groups = class_groups.len(),
        "synthetic equivalences computed"
    );

    let mut main_dex = app_view.main_dex().clone();
    let (application, final_committed, lens) =
        build_lens_and_program(app_view, &method_groups, &class_groups, &mut main_dex)?;

    let final_types: FxHashSet<TypeId> = method_groups
        .iter()
        .chain(&class_groups)
        .map(|(ty, _)| *ty)
        .collect();
    let mut removed: Vec<TypeId> = committed
        .all_items()
        .filter(|reference| reference.is_program())
        .map(HasHolder::holder_type)
        .filter(|ty| !final_types.contains(ty))
        .collect();
    removed.sort_by(|a, b| factory.cmp_types(*a, *b));
    removed.dedup();
    tracing::debug!(pruned = removed.len(), "synthetic holders pruned");

    let pruned_items = PrunedItems::builder()
        .set_pruned_app(application.clone())
        .add_removed_classes(removed)
        .build();
    Ok(FinalizationResult {
        commit: CommittedItems::new(
            INVALID_ID_AFTER_SYNTHETIC_FINALIZATION,
            application,
            final_committed,
            Vec::new(),
        ),
        lens,
        pruned_items,
        main_dex,
    })
}

/// Contexts are always input classes.
fn verify_no_nested_synthetics(app_view: &AppView) {
    let committed = app_view.synthetics().committed();
    for reference in committed.all_items() {
        if reference.kind().is_global() {
            continue;
        }
        let context_type = reference.context().synthesizing_context_type();
        invariant!(
            !committed.contains_type(context_type),
            "synthetic {} has the synthetic context {}",
            app_view.factory().descriptor(reference.holder_type()),
            app_view.factory().descriptor(context_type)
        );
    }
}

fn lookup_definitions<'r>(
    app_view: &AppView,
    references: impl Iterator<Item = &'r SyntheticReference>,
) -> Result<Vec<SyntheticDefinition>, SynthesisError> {
    let factory = app_view.factory();
    let mut definitions = Vec::new();
    for reference in references {
        let definition = reference.lookup_definition(app_view.app()).ok_or_else(|| {
            SynthesisError::UnresolvedReference {
                ty: factory.descriptor(reference.holder_type()).to_owned(),
            }
        })?;
        definition.check_valid(factory)?;
        definitions.push(definition);
    }
    definitions.sort_by(|a, b| a.to_reference().compare(&b.to_reference(), factory));
    Ok(definitions)
}

fn compute_equivalences<'r>(
    app_view: &AppView,
    references: impl Iterator<Item = &'r SyntheticReference>,
    generators: &mut Generators,
) -> Result<NamedGroups, SynthesisError> {
    let definitions = lookup_definitions(app_view, references)?;
    if definitions.is_empty() {
        return Ok(Vec::new());
    }
    let factory = app_view.factory();
    let lens = app_view.lens();
    let intermediate = app_view.options().intermediate;

    // Every synthetic type, and its name before any renaming, hashes as
    // void. No input class can be named void.
    let mut synthetic_types: FxHashSet<TypeId> = FxHashSet::default();
    for definition in &definitions {
        let ty = definition.holder_type();
        synthetic_types.insert(ty);
        if !lens.is_identity() {
            synthetic_types.insert(lens.original_type(ty));
        }
    }
    let void = factory.void_type();
    let map = |ty: TypeId| if synthetic_types.contains(&ty) { void } else { ty };

    let mut buckets: BTreeMap<u64, Vec<SyntheticDefinition>> = BTreeMap::new();
    for definition in definitions {
        let hash = definition.compute_hash(&map, intermediate, factory);
        buckets.entry(hash).or_default().push(definition);
    }

    let mut groups_per_prefix: BTreeMap<String, Vec<EquivalenceGroup>> = BTreeMap::new();
    for bucket in buckets.into_values() {
        for members in group_equivalent(bucket, intermediate, app_view) {
            let group = EquivalenceGroup::new(members, factory);
            let prefix = group
                .representative()
                .prefix_for_external_synthetic_type(factory)?;
            groups_per_prefix.entry(prefix).or_default().push(group);
        }
    }

    let mut named: NamedGroups = Vec::new();
    for (prefix, mut groups) in groups_per_prefix {
        groups.sort_by(|a, b| a.compare_including_context(b, lens, factory));
        let mut fixed_kinds = FxHashSet::default();
        for (index, group) in groups.into_iter().enumerate() {
            if let (true, Some((_, previous))) = (index > 0, named.last()) {
                invariant!(
                    previous.compare_including_context(&group, lens, factory) != Ordering::Equal,
                    "indistinguishable synthetic groups under prefix {prefix}"
                );
            }
            let kind = group.representative().kind();
            // Fixed names only carry the kind, so each may appear once per prefix.
            let first_of_kind = !kind.is_fixed_suffix() || fixed_kinds.insert(kind);
            invariant!(first_of_kind, "two fixed {kind} synthetics under prefix {prefix}");
            let ty = create_external_type(app_view, kind, &prefix, generators)?;
            tracing::debug!(
                ty = factory.descriptor(ty),
                members = group.len(),
                "synthetic named"
            );
            named.push((ty, group));
        }
    }
    Ok(named)
}

/// Greedy split: each item joins the first group whose first member it
/// is equivalent to.
fn group_equivalent(
    bucket: Vec<SyntheticDefinition>,
    intermediate: bool,
    app_view: &AppView,
) -> Vec<Vec<SyntheticDefinition>> {
    let mut groups: Vec<Vec<SyntheticDefinition>> = Vec::new();
    for definition in bucket {
        let existing = groups.iter_mut().find(|group| {
            definition.is_equivalent_to(&group[0], intermediate, app_view.lens(), app_view.factory())
        });
        match existing {
            Some(group) => group.push(definition),
            None => groups.push(vec![definition]),
        }
    }
    groups
}

fn create_external_type(
    app_view: &AppView,
    kind: SyntheticKind,
    prefix: &str,
    generators: &mut Generators,
) -> Result<TypeId, SynthesisError> {
    let factory = app_view.factory();
    if kind.is_fixed_suffix() {
        return Ok(naming::create_external_type(kind, prefix, "", factory));
    }
    let committed = app_view.synthetics().committed();
    let generator = generators.entry(prefix.to_owned()).or_insert(0);
    loop {
        let id = *generator;
        *generator += 1;
        let ty = naming::create_external_type(kind, prefix, &id.to_string(), factory);
        if !app_view.app().contains_type(ty) || committed.contains_type(ty) {
            invariant!(
                naming::verify_not_internal_synthetic(factory.binary_name(ty)),
                "internal name {} escaped finalization",
                factory.descriptor(ty)
            );
            return Ok(ty);
        }
        if !app_view.options().testing.allow_conflicting_synthetic_types {
            return Err(SynthesisError::ConflictingExternalType {
                ty: factory.descriptor(ty).to_owned(),
            });
        }
        tracing::debug!(ty = factory.descriptor(ty), "skipping conflicting synthetic name");
    }
}

fn build_lens_and_program(
    app_view: &AppView,
    method_groups: &NamedGroups,
    class_groups: &NamedGroups,
    main_dex: &mut MainDexInfo,
) -> Result<FinalProgram, SynthesisError> {
    let factory = app_view.factory();
    let annotate = app_view.options().should_annotate_synthetics();
    let mut lens_builder = FinalizationLensBuilder::new();
    let mut new_classes: Vec<Arc<DexClass>> = Vec::new();
    let mut replaced: FxHashSet<TypeId> = FxHashSet::default();
    let mut deduplicated: Vec<Arc<DexClass>> = Vec::new();

    for (final_type, group) in method_groups {
        let representative = group.representative();
        let mut class = create_external_method_class(*final_type, representative, factory)?;
        if annotate {
            class = add_marker_to_class(&class, representative.kind(), representative.context(), factory);
        }
        let Some(final_method) = class.methods.first().map(|method| method.reference) else {
            return Err(missing_representative(*final_type, factory));
        };
        for member in group.members() {
            replaced.insert(member.holder_type());
            if let Some(method) = member.method_ref() {
                if method != final_method {
                    lens_builder.move_synthetic_method(method, final_method);
                }
            }
        }
        new_classes.push(Arc::new(class));
    }

    for (final_type, group) in class_groups {
        let representative = group.representative();
        let class = if annotate {
            Arc::new(add_marker_to_class(
                representative.holder(),
                representative.kind(),
                representative.context(),
                factory,
            ))
        } else {
            Arc::clone(representative.holder())
        };
        new_classes.push(class);
        for (index, member) in group.members().iter().enumerate() {
            let member_type = member.holder_type();
            replaced.insert(member_type);
            if member_type != *final_type {
                lens_builder.move_synthetic_class(member_type, *final_type);
            }
            if index > 0 {
                deduplicated.push(Arc::clone(member.holder()));
            }
        }
    }

    let app = app_view.app();
    new_classes.extend(
        app.program_classes_sorted(factory)
            .into_iter()
            .filter(|class| !replaced.contains(&class.ty))
            .cloned(),
    );

    let mut fixer = TreeFixer::new(factory, lens_builder);
    let fixed = fixer.fixup_classes(&new_classes);
    // Only the member moves recorded while fixing are kept.
    fixer.fixup_classes(&deduplicated);
    let lens_builder = fixer.into_mapping();

    let mut application = app.builder().replace_program_classes(fixed).build();
    let mut committed = CommittedSyntheticsBuilder::default();
    let mut app_builder = application.builder();
    for (final_type, group) in class_groups {
        let class = finish_final_class(&application, *final_type, group, main_dex, factory)?;
        let representative = group.representative();
        committed.add_reference(SyntheticReference::class(
            representative.kind(),
            representative.context().clone(),
            *final_type,
        ));
        if representative.kind().is_global() {
            let contexts = app_view
                .synthetics()
                .committed()
                .global_contexts(representative.holder_type(), factory);
            committed.add_global_contexts(*final_type, contexts);
        }
        app_builder.add_program_class(class);
    }
    for (final_type, group) in method_groups {
        let class = finish_final_class(&application, *final_type, group, main_dex, factory)?;
        let Some(method) = class.methods.first().map(|method| method.reference) else {
            return Err(missing_representative(*final_type, factory));
        };
        let representative = group.representative();
        committed.add_reference(SyntheticReference::method(
            representative.kind(),
            representative.context().clone(),
            method,
        ));
        app_builder.add_program_class(class);
    }
    application = app_builder.build();

    let previous = app_view.synthetics().committed();
    for reference in previous.classes().values().flatten() {
        if reference.is_classpath() {
            committed.add_reference(reference.clone());
        }
    }
    Ok((application, committed.build(), lens_builder.build()))
}

/// Fresh holder for a method group: a copy of the representative method
/// under the final type.
fn create_external_method_class(
    final_type: TypeId,
    representative: &SyntheticDefinition,
    factory: &ItemFactory,
) -> Result<DexClass, SynthesisError> {
    let Some(definition) = representative.method_def() else {
        return Err(SynthesisError::InvalidSynthetic {
            ty: factory.descriptor(representative.holder_type()).to_owned(),
            kind: representative.kind().to_string(),
        });
    };
    let mut method = SyntheticMethodBuilder::for_synthetic_method(factory, final_type);
    method
        .set_proto(definition.reference.proto)
        .set_access(definition.access);
    if let Some(code) = &definition.code {
        method.set_code(code.clone());
    }
    for annotation in &definition.annotations {
        method.add_annotation(annotation.clone());
    }
    let mut class = SyntheticClassBuilder::new(
        factory,
        final_type,
        ClassKind::Program,
        representative.holder().origin.clone(),
    );
    class.add_method_def(method.build());
    let class = class.build();
    invariant!(
        class.methods.len() == 1
            && factory.name_str(class.methods[0].reference.name) == INTERNAL_SYNTHETIC_METHOD_NAME,
        "external method class {} is malformed",
        factory.descriptor(final_type)
    );
    Ok(class)
}

/// The fixed-up final class with main-dex and provenance taken from every
/// member of its group.
fn finish_final_class(
    application: &Application,
    final_type: TypeId,
    group: &EquivalenceGroup,
    main_dex: &mut MainDexInfo,
    factory: &ItemFactory,
) -> Result<Arc<DexClass>, SynthesisError> {
    let Some(class) = application.program_definition_for(final_type) else {
        return Err(missing_representative(final_type, factory));
    };
    let mut synthesized_from = class.synthesized_from.clone();
    for member in group.members() {
        let context = member.context();
        context.add_if_derived_from_main_dex(final_type, main_dex);
        if main_dex.is_main_dex(member.holder_type()) {
            main_dex.add(final_type);
        }
        let context_type = context.synthesizing_context_type();
        if context_type != final_type && application.program_definition_for(context_type).is_some() {
            synthesized_from.push(context_type);
        }
    }
    synthesized_from.sort_by(|a, b| factory.cmp_types(*a, *b));
    synthesized_from.dedup();
    if synthesized_from == class.synthesized_from {
        return Ok(Arc::clone(class));
    }
    let mut class = (**class).clone();
    class.synthesized_from = synthesized_from;
    Ok(Arc::new(class))
}

fn missing_representative(ty: TypeId, factory: &ItemFactory) -> SynthesisError {
    SynthesisError::MissingRepresentative {
        ty: factory.descriptor(ty).to_owned(),
    }
}
