#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use kiln_ir::{ItemFactory, RewriteLens};
use std::sync::Arc;

#[test]
fn empty_builder_builds_nothing() {
    assert!(FinalizationLensBuilder::new().build().is_none());
}

#[test]
fn method_moves_also_move_the_holder() {
    let factory = ItemFactory::new();
    let proto = factory.intern_proto(factory.void_type(), &[]);
    let from_type = factory.type_for_binary_name("a/A$$InternalSyntheticBridge$1$0");
    let to_type = factory.type_for_binary_name("a/A$$Bridge0");
    let from = factory.create_method(from_type, "m", proto);
    let to = factory.create_method(to_type, "m", proto);

    let mut builder = FinalizationLensBuilder::new();
    builder.move_synthetic_method(from, to);
    assert_eq!(builder.map_type(from_type), to_type);
    assert_eq!(builder.map_method(from), Some(to));

    let delta = builder.build();
    let lens = RewriteLens::identity().with_delta(Arc::new(delta.unwrap()));
    assert_eq!(lens.lookup_type(from_type), to_type);
    assert_eq!(lens.lookup_method(from, &factory), to);
    assert_eq!(lens.original_method_signatures(to), vec![from]);
}

#[test]
fn fixer_changes_are_recorded() {
    let factory = ItemFactory::new();
    let a = factory.type_for_binary_name("a/A$$InternalSyntheticLambda$1$0");
    let b = factory.type_for_binary_name("a/A$$Lambda0");
    let mut builder = FinalizationLensBuilder::new();
    builder.move_synthetic_class(a, b);
    let field_a = factory.create_field(a, "f", factory.int_type());
    let field_b = factory.create_field(b, "f", factory.int_type());
    builder.record_field_change(field_a, field_b);
    let lens = RewriteLens::identity().with_delta(Arc::new(builder.build().unwrap()));
    assert_eq!(lens.lookup_field(field_a), field_b);
    assert!(lens.is_simple_renaming(a, b));
}
