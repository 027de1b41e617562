//! Finalization: deduplication, naming, pruning and reference rewiring.

use crate::common::{
    call, class_named, class_with_run, commit_with, create_bridge, create_lambda, input_class,
    instantiate, int_to_int, invoked_methods, processing, program_names, util_class, view, void_proto,
};
use kiln_ir::{
    AccessFlags, ClassToFeatureSplitMap, Code, DexClass, FeatureSplit, Instr, LensDelta, PrunedItems,
    SharedFactory, TypeId,
};
use kiln_synthesis::naming::verify_not_internal_synthetic;
use kiln_synthesis::{finalize, AppView, MethodProcessingContext, SynthesisOptions, SyntheticKind};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn three_equal_bridges_become_one() {
    let factory = SharedFactory::new();
    let (util, op) = util_class(&factory, "p/Util");
    let callers = ["p/C", "p/A", "p/B"];
    let mut classes: Vec<_> = callers.iter().map(|name| input_class(&factory, name)).collect();
    classes.push(util);
    let mut view = view(factory, classes, SynthesisOptions::release());
    let wave = view.create_processor_context();

    let bridges: Vec<_> = callers
        .iter()
        .map(|name| {
            let mut processing = processing(&view, wave, name);
            (*name, create_bridge(&view, &mut processing, op).reference)
        })
        .collect();
    let rewired: Vec<_> = bridges
        .iter()
        .map(|(name, bridge)| class_with_run(view.factory(), name, call(*bridge)))
        .collect();
    commit_with(&mut view, rewired);

    finalize(&mut view).unwrap();

    assert_eq!(
        program_names(&view),
        vec!["p/A", "p/A$$Bridge0", "p/B", "p/C", "p/Util"]
    );
    let factory = view.factory();
    let final_type = factory.type_for_binary_name("p/A$$Bridge0");
    let final_bridge = factory.create_method(final_type, "m", int_to_int(factory));
    for (name, original) in &bridges {
        assert_eq!(invoked_methods(&class_named(&view, name)), vec![final_bridge], "{name}");
        assert_eq!(view.lens().lookup_method(*original, factory), final_bridge);
        assert!(!view.app().contains_type(original.holder));
    }
    assert_eq!(invoked_methods(&class_named(&view, "p/A$$Bridge0")), vec![op]);
    assert_eq!(view.synthetics().committed().len(), 1);
}

#[test]
fn equal_lambdas_share_one_class() {
    let factory = SharedFactory::new();
    let contexts = ["a/A", "b/B", "c/C"];
    let classes: Vec<_> = contexts.iter().map(|name| input_class(&factory, name)).collect();
    let mut view = view(factory, classes, SynthesisOptions::release());
    let wave = view.create_processor_context();

    let lambdas: Vec<_> = contexts
        .iter()
        .zip([7, 7, 8])
        .map(|(name, value)| {
            let mut processing = processing(&view, wave, name);
            (*name, create_lambda(&view, &mut processing, value))
        })
        .collect();
    let users: Vec<_> = lambdas
        .iter()
        .map(|(name, lambda)| class_with_run(view.factory(), name, instantiate(lambda.ty)))
        .collect();
    commit_with(&mut view, users);

    finalize(&mut view).unwrap();

    assert_eq!(
        program_names(&view),
        vec!["a/A", "a/A$$Lambda0", "b/B", "c/C", "c/C$$Lambda0"]
    );
    let factory = view.factory();
    let shared = factory.type_for_binary_name("a/A$$Lambda0");
    let own = factory.type_for_binary_name("c/C$$Lambda0");
    let instantiated = |name: &str| {
        let class = class_named(&view, name);
        match class.methods[0].code.as_ref().unwrap().instructions[0] {
            Instr::NewInstance { ty, .. } => ty,
            ref other => panic!("unexpected {other:?}"),
        }
    };
    assert_eq!(instantiated("a/A"), shared);
    assert_eq!(instantiated("b/B"), shared);
    assert_eq!(instantiated("c/C"), own);

    let merged = &lambdas[1].1;
    assert_eq!(view.lens().lookup_type(merged.ty), shared);
    let get = merged.methods[0].reference;
    assert_eq!(view.lens().lookup_method(get, factory).holder, shared);

    let shared_class = class_named(&view, "a/A$$Lambda0");
    assert_eq!(shared_class.methods[0].reference.holder, shared);
    assert_eq!(
        shared_class.synthesized_from,
        vec![factory.type_for_binary_name("a/A"), factory.type_for_binary_name("b/B")]
    );
    assert_eq!(view.synthetics().committed().len(), 2);
    assert!(view.synthetics().is_synthetic_lambda(shared));
}

#[test]
fn feature_splits_never_merge() {
    let factory = SharedFactory::new();
    let classes = vec![input_class(&factory, "a/A"), input_class(&factory, "b/B")];
    let camera = FeatureSplit::Feature(factory.intern_name("camera"));
    let mut features = ClassToFeatureSplitMap::new();
    features.insert(factory.type_for_binary_name("b/B"), camera);
    let mut view = view(factory, classes, SynthesisOptions::release()).with_features(features);
    let wave = view.create_processor_context();

    for name in ["a/A", "b/B"] {
        let mut processing = processing(&view, wave, name);
        create_lambda(&view, &mut processing, 7);
    }
    finalize(&mut view).unwrap();

    assert_eq!(
        program_names(&view),
        vec!["a/A", "a/A$$Lambda0", "b/B", "b/B$$Lambda0"]
    );
    let factory = view.factory();
    let synthetics = view.synthetics();
    assert_eq!(
        synthetics.contextual_feature_split(factory.type_for_binary_name("b/B$$Lambda0"), factory),
        Some(camera)
    );
    assert_eq!(
        synthetics.contextual_feature_split(factory.type_for_binary_name("a/A$$Lambda0"), factory),
        Some(FeatureSplit::Base)
    );
}

#[test]
fn one_class_survives_per_group() {
    let factory = SharedFactory::new();
    let mut view = view(factory.clone(), [input_class(&factory, "a/A")], SynthesisOptions::release());
    let wave = view.create_processor_context();
    let mut processing = processing(&view, wave, "a/A");
    let originals: Vec<_> = [1, 2, 1, 3, 2, 1]
        .into_iter()
        .map(|value| create_lambda(&view, &mut processing, value).ty)
        .collect();

    finalize(&mut view).unwrap();

    assert_eq!(
        program_names(&view),
        vec!["a/A", "a/A$$Lambda0", "a/A$$Lambda1", "a/A$$Lambda2"]
    );
    for name in program_names(&view) {
        assert!(verify_not_internal_synthetic(name), "{name}");
    }
    assert_eq!(view.synthetics().committed().len(), 3);
    for original in originals {
        let final_type = view.lens().lookup_type(original);
        assert!(view.synthetics().is_committed_synthetic(final_type));
        assert!(!view.app().contains_type(original));
    }
}

#[test]
fn synthetics_of_a_removed_context_are_pruned() {
    let factory = SharedFactory::new();
    let classes = vec![input_class(&factory, "a/Dead"), input_class(&factory, "b/Live")];
    let record = factory.type_for_binary_name("java/lang/Record");
    let mut view = view(factory, classes, SynthesisOptions::release());
    let wave = view.create_processor_context();

    let dead_lambda = create_lambda(&view, &mut processing(&view, wave, "a/Dead"), 1);
    create_lambda(&view, &mut processing(&view, wave, "b/Live"), 2);
    let factory = view.factory();
    for context in ["a/Dead", "b/Live"] {
        view.synthetics()
            .ensure_global_class(
                SyntheticKind::RecordTag,
                record,
                [factory.type_for_binary_name(context)],
                &view,
                |_| {},
                |_| {},
            )
            .unwrap();
    }
    view.commit();

    let dead = view.factory().type_for_binary_name("a/Dead");
    let pruned_app = {
        let mut builder = view.app().builder();
        builder.remove_program_class(dead).remove_program_class(dead_lambda.ty);
        builder.build()
    };
    let pruned = PrunedItems::builder()
        .set_pruned_app(pruned_app)
        .add_removed_class(dead)
        .add_removed_class(dead_lambda.ty)
        .build();
    view.prune_items(&pruned);

    finalize(&mut view).unwrap();

    assert_eq!(
        program_names(&view),
        vec!["b/Live", "b/Live$$Lambda0", "java/lang/Record"]
    );
    let factory = view.factory();
    assert_eq!(
        view.synthetics().committed().global_contexts(record, factory),
        vec![factory.type_for_binary_name("b/Live")]
    );
}

#[test]
fn synthetic_outliving_its_context_keeps_its_prefix() {
    let factory = SharedFactory::new();
    let classes = vec![input_class(&factory, "a/Gone"), input_class(&factory, "b/B")];
    let mut view = view(factory, classes, SynthesisOptions::release());
    let wave = view.create_processor_context();
    create_lambda(&view, &mut processing(&view, wave, "a/Gone"), 1);
    view.commit();

    let gone = view.factory().type_for_binary_name("a/Gone");
    let pruned_app = {
        let mut builder = view.app().builder();
        builder.remove_program_class(gone);
        builder.build()
    };
    let pruned = PrunedItems::builder()
        .set_pruned_app(pruned_app)
        .add_removed_class(gone)
        .build();
    view.prune_items(&pruned);

    finalize(&mut view).unwrap();

    assert_eq!(program_names(&view), vec!["a/Gone$$Lambda0", "b/B"]);
    assert!(class_named(&view, "a/Gone$$Lambda0").synthesized_from.is_empty());
}

/// Lambda whose `copy()V` instantiates the lambda itself.
fn create_self_referencing_lambda(view: &AppView, processing: &mut MethodProcessingContext) -> Arc<DexClass> {
    let unique = processing.create_unique_context();
    let proto = void_proto(view.factory());
    view.synthetics()
        .create_class(SyntheticKind::Lambda, &unique, view, |class| {
            let ty = class.ty();
            class.add_method("copy", |method| {
                method
                    .set_proto(proto)
                    .set_access(AccessFlags::PUBLIC)
                    .set_code(Code::new(
                        1,
                        vec![Instr::NewInstance { dest: 0, ty }, Instr::Return { reg: None }],
                    ));
            });
        })
        .unwrap()
}

/// `class` under the name `to`, with its code left as it was.
fn moved(class: &DexClass, to: TypeId) -> Arc<DexClass> {
    let mut moved = class.clone();
    moved.ty = to;
    for method in &mut moved.methods {
        method.reference.holder = to;
    }
    Arc::new(moved)
}

#[test]
fn renamed_self_referencing_lambdas_still_merge() {
    let factory = SharedFactory::new();
    let classes = vec![input_class(&factory, "a/A"), input_class(&factory, "b/B")];
    let mut view = view(factory, classes, SynthesisOptions::release());
    let wave = view.create_processor_context();
    let lambdas: Vec<_> = ["a/A", "b/B"]
        .into_iter()
        .map(|name| create_self_referencing_lambda(&view, &mut processing(&view, wave, name)))
        .collect();
    view.commit();

    // Each lambda moves while its body still names the type it had before.
    let mut delta = LensDelta::builder();
    let mut renamed = Vec::new();
    let app = {
        let factory = view.factory();
        let mut builder = view.app().builder();
        for lambda in &lambdas {
            let to = factory.type_for_binary_name(&format!("{}r", factory.binary_name(lambda.ty)));
            delta.move_type(lambda.ty, to);
            builder.remove_program_class(lambda.ty).add_program_class(moved(lambda, to));
            renamed.push(to);
        }
        builder.build()
    };
    view.commit_rewritten_with_lens(app, delta.build());
    assert!(renamed.iter().all(|ty| view.synthetics().is_committed_synthetic(*ty)));

    finalize(&mut view).unwrap();

    assert_eq!(program_names(&view), vec!["a/A", "a/A$$Lambda0", "b/B"]);
    let shared = view.factory().type_for_binary_name("a/A$$Lambda0");
    for ty in renamed.iter().chain(lambdas.iter().map(|lambda| &lambda.ty)) {
        assert_eq!(view.lens().lookup_type(*ty), shared);
    }
    assert_eq!(view.synthetics().committed().len(), 1);
}
