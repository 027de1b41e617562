//! Commit snapshots across passes, and the phase lifecycle.

use crate::common::{
    class_named, class_with_run, commit_with, create_lambda, input_class, instantiate, processing,
    program_names, view, void_proto,
};
use kiln_ir::{AccessFlags, Code, Instr, LensDelta, SharedFactory};
use kiln_synthesis::{finalize, SynthesisError, SynthesisOptions, SynthesisPhase, SyntheticKind};
use pretty_assertions::assert_eq;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn every_commit_contains_its_synthetics() {
    let factory = SharedFactory::new();
    let mut view = view(factory.clone(), [input_class(&factory, "a/A")], SynthesisOptions::release());

    let mut processing = processing(&view, view.create_processor_context(), "a/A");
    let first = create_lambda(&view, &mut processing, 1);
    assert!(view.synthetics().is_pending_synthetic(first.ty));
    let commit = view.commit();
    assert_eq!(commit.next_synthetic_id(), 1);
    assert!(commit.committed().verify_containment());
    assert!(view.synthetics().is_committed_synthetic(first.ty));
    assert!(!view.synthetics().is_pending_synthetic(first.ty));

    let second = create_lambda(&view, &mut processing, 2);
    let user = class_with_run(view.factory(), "a/A", instantiate(second.ty));
    let commit = commit_with(&mut view, [user]);
    assert_eq!(commit.next_synthetic_id(), 2);
    assert!(commit.committed().verify_containment());
    assert!(commit.committed().contains_type(first.ty));
    assert!(commit.committed().contains_type(second.ty));
    assert_eq!(commit.committed().len(), 2);
}

#[test]
fn renamed_contexts_follow_the_lens() {
    let factory = SharedFactory::new();
    let mut view = view(factory.clone(), [input_class(&factory, "a/A")], SynthesisOptions::release());
    let lambda = create_lambda(&view, &mut processing(&view, view.create_processor_context(), "a/A"), 1);
    view.commit();

    let factory = view.factory();
    let a = factory.type_for_binary_name("a/A");
    let r = factory.type_for_binary_name("r/A");
    let moved_name = factory.binary_name(lambda.ty).replacen("a/A", "r/A", 1);
    let moved = factory.type_for_binary_name(&moved_name);
    let mut delta = LensDelta::builder();
    delta.move_type(a, r);
    delta.move_type(lambda.ty, moved);
    view.rewrite_with_lens(delta.build());

    let factory = view.factory();
    assert!(view.synthetics().is_committed_synthetic(moved));
    assert_eq!(view.synthetics().synthesizing_context_types(moved, factory), vec![r]);

    finalize(&mut view).unwrap();
    assert_eq!(program_names(&view), vec!["r/A", "r/A$$Lambda0"]);
    assert_eq!(
        class_named(&view, "r/A$$Lambda0").synthesized_from,
        vec![view.factory().type_for_binary_name("r/A")]
    );
}

#[test]
fn merged_synthetics_are_no_longer_synthetic() {
    let factory = SharedFactory::new();
    let classes = vec![input_class(&factory, "a/A"), input_class(&factory, "b/B")];
    let mut view = view(factory, classes, SynthesisOptions::release());
    let wave = view.create_processor_context();
    let first = create_lambda(&view, &mut processing(&view, wave, "a/A"), 1);
    let second = create_lambda(&view, &mut processing(&view, wave, "b/B"), 2);
    view.commit();

    let factory = view.factory();
    let merged = factory.type_for_binary_name("m/Merged");
    let mut delta = LensDelta::builder();
    delta.move_type(first.ty, merged);
    delta.move_type(second.ty, merged);
    let app = {
        let mut builder = view.app().builder();
        builder
            .remove_program_class(first.ty)
            .remove_program_class(second.ty)
            .add_program_class(input_class(factory, "m/Merged"));
        builder.build()
    };
    view.commit_rewritten_with_lens(app, delta.build());

    assert!(view.synthetics().committed().is_empty());
    assert!(!view.synthetics().is_synthetic_class(merged));
    finalize(&mut view).unwrap();
    assert_eq!(program_names(&view), vec!["a/A", "b/B", "m/Merged"]);
}

#[test]
fn later_waves_add_new_synthetics_for_the_same_method() {
    let factory = SharedFactory::new();
    let mut view = view(factory.clone(), [input_class(&factory, "a/A")], SynthesisOptions::release());
    let first = create_lambda(&view, &mut processing(&view, view.create_processor_context(), "a/A"), 1);
    view.commit();

    let second = create_lambda(&view, &mut processing(&view, view.create_processor_context(), "a/A"), 2);
    assert_ne!(first.ty, second.ty);
    let commit = view.commit();
    assert_eq!(commit.committed().len(), 2);
    assert!(commit.committed().contains_type(first.ty));
    assert!(commit.committed().contains_type(second.ty));

    finalize(&mut view).unwrap();
    assert_eq!(
        program_names(&view),
        vec!["a/A", "a/A$$Lambda0", "a/A$$Lambda1"]
    );
}

#[test]
fn renamed_synthetic_keeps_its_context() {
    let factory = SharedFactory::new();
    let mut view = view(factory.clone(), [input_class(&factory, "a/A")], SynthesisOptions::release());
    let lambda = create_lambda(&view, &mut processing(&view, view.create_processor_context(), "a/A"), 1);
    view.commit();

    let factory = view.factory();
    let moved = factory.type_for_binary_name(&format!("{}r", factory.binary_name(lambda.ty)));
    let mut delta = LensDelta::builder();
    delta.move_type(lambda.ty, moved);
    view.rewrite_with_lens(delta.build());

    let factory = view.factory();
    let synthetics = view.synthetics();
    assert!(synthetics.is_committed_synthetic(moved));
    assert!(!synthetics.is_committed_synthetic(lambda.ty));
    assert_eq!(
        synthetics.synthesizing_context_types(moved, factory),
        vec![factory.type_for_binary_name("a/A")]
    );

    finalize(&mut view).unwrap();
    assert_eq!(program_names(&view), vec!["a/A", "a/A$$Lambda0"]);
    let shared = view.factory().type_for_binary_name("a/A$$Lambda0");
    assert_eq!(view.lens().lookup_type(lambda.ty), shared);
}

#[test]
fn concurrent_requests_create_one_fixed_class() {
    let factory = SharedFactory::new();
    let view = view(factory.clone(), [input_class(&factory, "a/I")], SynthesisOptions::release());
    let interface = class_named(&view, "a/I");
    let created = AtomicUsize::new(0);

    let holders: Vec<_> = (0..32)
        .into_par_iter()
        .map(|_| {
            view.synthetics()
                .ensure_fixed_class(SyntheticKind::CompanionClass, &interface, &view, |_| {}, |_| {
                    created.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
        })
        .collect();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(holders.iter().all(|holder| Arc::ptr_eq(holder, &holders[0])));
    assert_eq!(view.factory().binary_name(holders[0].ty), "a/I$-CC");
}

#[test]
fn concurrent_members_all_land_in_the_fixed_class() {
    let factory = SharedFactory::new();
    let view = view(factory.clone(), [input_class(&factory, "a/I")], SynthesisOptions::release());
    let interface = class_named(&view, "a/I");
    let proto = void_proto(view.factory());

    (0..16).into_par_iter().for_each(|index| {
        view.synthetics()
            .ensure_fixed_class_method(
                &format!("m{index}"),
                proto,
                SyntheticKind::CompanionClass,
                &interface,
                &view,
                |_| {},
                |method| {
                    method
                        .set_access(AccessFlags::synthetic_method())
                        .set_code(Code::new(0, vec![Instr::Return { reg: None }]));
                },
            )
            .unwrap();
    });

    let companion = view.factory().type_for_binary_name("a/I$-CC");
    let holder = view.synthetics().pending().holder(companion).unwrap();
    let mut names: Vec<_> = holder
        .methods
        .iter()
        .map(|method| view.factory().name_str(method.reference.name))
        .collect();
    names.sort_unstable();
    let mut expected: Vec<_> = (0..16).map(|index| format!("m{index}")).collect();
    expected.sort_unstable();
    assert_eq!(names, expected);
}

#[test]
fn finalization_ends_the_lifecycle() {
    let factory = SharedFactory::new();
    let mut view = view(factory.clone(), [input_class(&factory, "a/A")], SynthesisOptions::release());
    assert_eq!(view.synthetics().phase(), SynthesisPhase::Active);
    create_lambda(&view, &mut processing(&view, view.create_processor_context(), "a/A"), 1);
    finalize(&mut view).unwrap();
    assert_eq!(view.synthetics().phase(), SynthesisPhase::Finalized);

    let mut processing = processing(&view, view.create_processor_context(), "a/A");
    let unique = processing.create_unique_context();
    let error = view
        .synthetics()
        .create_class(SyntheticKind::Lambda, &unique, &view, |_| {})
        .unwrap_err();
    assert_eq!(
        error,
        SynthesisError::CreationAfterFinalization {
            kind: SyntheticKind::Lambda.to_string(),
            phase: "finalized".to_owned(),
        }
    );
    assert_eq!(finalize(&mut view), Err(SynthesisError::AlreadyFinalized));
}
