//! Output is a function of the program, never of creation order or threads.

use crate::common::{
    call, class_with_run, commit_with, create_bridge, create_lambda, input_class, instantiate,
    processing, render, util_class, view,
};
use kiln_ir::{DexClass, MethodRef, SharedFactory, TypeId};
use kiln_synthesis::{finalize, AppView, ProcessorContext, SynthesisOptions};
use pretty_assertions::assert_eq;
use rayon::prelude::*;
use std::sync::Arc;

const CONTEXTS: [&str; 6] = ["q/A", "p/F", "p/B", "q/E", "p/D", "p/C"];

/// One lambda and one bridge per context. Lambda bodies repeat every third
/// context, bridges are all equal.
fn create_for(
    view: &AppView,
    wave: ProcessorContext,
    name: &str,
    index: usize,
    op: MethodRef,
) -> (TypeId, MethodRef) {
    let mut processing = processing(view, wave, name);
    let value = i64::try_from(index % 3).unwrap();
    let lambda = create_lambda(view, &mut processing, value);
    let bridge = create_bridge(view, &mut processing, op);
    (lambda.ty, bridge.reference)
}

fn program(parallel: bool) -> (Vec<String>, Vec<String>) {
    let factory = SharedFactory::new();
    let (util, op) = util_class(&factory, "p/Util");
    let mut classes: Vec<Arc<DexClass>> =
        CONTEXTS.iter().map(|name| input_class(&factory, name)).collect();
    classes.push(util);
    let mut view = view(factory, classes, SynthesisOptions::release());
    let wave = view.create_processor_context();

    let created: Vec<(TypeId, MethodRef)> = if parallel {
        let mut created: Vec<_> = CONTEXTS
            .par_iter()
            .enumerate()
            .rev()
            .map(|(index, name)| (index, create_for(&view, wave, name, index, op)))
            .collect();
        created.sort_by_key(|(index, _)| *index);
        created.into_iter().map(|(_, item)| item).collect()
    } else {
        CONTEXTS
            .iter()
            .enumerate()
            .map(|(index, name)| create_for(&view, wave, name, index, op))
            .collect()
    };

    let users: Vec<_> = CONTEXTS
        .iter()
        .zip(&created)
        .map(|(name, (lambda, bridge))| {
            let mut body = instantiate(*lambda);
            body.pop();
            body.extend(call(*bridge));
            class_with_run(view.factory(), name, body)
        })
        .collect();
    commit_with(&mut view, users);
    finalize(&mut view).unwrap();

    let factory = view.factory();
    let mut mapping: Vec<_> = created
        .iter()
        .flat_map(|(lambda, bridge)| {
            [
                format!(
                    "{} -> {}",
                    factory.descriptor(*lambda),
                    factory.descriptor(view.lens().lookup_type(*lambda))
                ),
                format!(
                    "{} -> {}",
                    factory.method_to_string(*bridge),
                    factory.method_to_string(view.lens().lookup_method(*bridge, factory))
                ),
            ]
        })
        .collect();
    mapping.sort_unstable();
    (render(&view), mapping)
}

#[test]
fn parallel_creation_matches_sequential() {
    let (sequential_program, sequential_mapping) = program(false);
    let (parallel_program, parallel_mapping) = program(true);
    assert_eq!(sequential_program, parallel_program);
    assert_eq!(sequential_mapping, parallel_mapping);
}

#[test]
fn repeated_runs_are_identical() {
    let first = program(true);
    for _ in 0..4 {
        assert_eq!(program(true), first);
    }
}

#[test]
fn groups_are_named_by_their_smallest_context() {
    let (rendered, _) = program(false);
    let classes: Vec<_> = rendered
        .iter()
        .map(String::as_str)
        .filter(|line| line.starts_with("class "))
        .collect();
    assert_eq!(
        classes,
        vec![
            "class Lp/B;",
            "class Lp/B$$Bridge0;",
            "class Lp/B$$Lambda1;",
            "class Lp/C;",
            "class Lp/D;",
            "class Lp/D$$Lambda0;",
            "class Lp/F;",
            "class Lp/Util;",
            "class Lq/A;",
            "class Lq/A$$Lambda0;",
            "class Lq/E;",
        ]
    );
}
