//! Intermediate output carries markers so a later compilation can tell its
//! synthetics apart from input classes.

use crate::common::{
    class_named, class_with_run, commit_with, create_lambda, input_class, instantiate, processing,
    program_names, view,
};
use kiln_ir::{DexClass, Instr, SharedFactory};
use kiln_synthesis::marker::has_marker;
use kiln_synthesis::{finalize, AppView, SynthesisOptions};
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// Intermediate compilation of `a/A` and `b/B`, each using an equal lambda.
fn compile_intermediate() -> (SharedFactory, Vec<Arc<DexClass>>) {
    let factory = SharedFactory::new();
    let classes = vec![input_class(&factory, "a/A"), input_class(&factory, "b/B")];
    let mut view = view(factory.clone(), classes, SynthesisOptions::intermediate());
    let wave = view.create_processor_context();
    let users: Vec<_> = ["a/A", "b/B"]
        .into_iter()
        .map(|name| {
            let lambda = create_lambda(&view, &mut processing(&view, wave, name), 3);
            class_with_run(view.factory(), name, instantiate(lambda.ty))
        })
        .collect();
    commit_with(&mut view, users);
    finalize(&mut view).unwrap();
    (factory, view.app().program_classes().cloned().collect())
}

fn release_view(factory: SharedFactory, classes: Vec<Arc<DexClass>>) -> AppView {
    let mut view = view(factory, classes, SynthesisOptions::release());
    view.collect_synthetic_inputs().unwrap();
    view
}

#[test]
fn intermediate_output_is_marked() {
    let (factory, classes) = compile_intermediate();
    let mut names: Vec<_> = classes
        .iter()
        .map(|class| (factory.binary_name(class.ty), has_marker(class, &factory)))
        .collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            ("a/A", false),
            ("a/A$$Lambda0", true),
            ("b/B", false),
            ("b/B$$Lambda0", true),
        ]
    );
}

#[test]
fn marked_classes_are_read_back_as_synthetic_inputs() {
    let (factory, classes) = compile_intermediate();
    let view = release_view(factory, classes);

    let factory = view.factory();
    let lambda = factory.type_for_binary_name("a/A$$Lambda0");
    let synthetics = view.synthetics();
    assert!(synthetics.is_synthetic_input(lambda));
    assert!(synthetics.is_subject_to_keep_rules(lambda));
    assert!(synthetics.committed().verify_containment());
    assert_eq!(
        synthetics.synthesizing_context_types(lambda, factory),
        vec![factory.type_for_binary_name("a/A")]
    );
    assert!(!has_marker(&class_named(&view, "a/A$$Lambda0"), factory));
    assert!(!synthetics.is_synthetic_input(factory.type_for_binary_name("a/A")));
}

#[test]
fn release_merges_synthetic_inputs() {
    let (factory, classes) = compile_intermediate();
    let mut view = release_view(factory, classes);
    finalize(&mut view).unwrap();

    assert_eq!(program_names(&view), vec!["a/A", "a/A$$Lambda0", "b/B"]);
    let factory = view.factory();
    let kept = factory.type_for_binary_name("a/A$$Lambda0");
    let merged = factory.type_for_binary_name("b/B$$Lambda0");
    assert_eq!(view.lens().lookup_type(merged), kept);
    assert_eq!(
        class_named(&view, "a/A$$Lambda0").synthesized_from,
        vec![factory.type_for_binary_name("a/A"), factory.type_for_binary_name("b/B")]
    );
    for user in ["a/A", "b/B"] {
        let code = class_named(&view, user).methods[0].code.clone().unwrap();
        assert!(
            matches!(code.instructions[0], Instr::NewInstance { ty, .. } if ty == kept),
            "{user}"
        );
    }
    assert!(!has_marker(&class_named(&view, "a/A$$Lambda0"), factory));
}

#[test]
fn intermediate_inputs_keep_their_names_in_intermediate_mode() {
    let (factory, classes) = compile_intermediate();
    let mut view = view(factory, classes, SynthesisOptions::intermediate());
    view.collect_synthetic_inputs().unwrap();
    finalize(&mut view).unwrap();

    assert_eq!(
        program_names(&view),
        vec!["a/A", "a/A$$Lambda0", "b/B", "b/B$$Lambda0"]
    );
    assert!(view.lens().is_identity());
    assert!(has_marker(&class_named(&view, "b/B$$Lambda0"), view.factory()));
}
