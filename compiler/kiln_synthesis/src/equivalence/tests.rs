use super::*;
use crate::{SynthesizingContext, SyntheticKind};
use kiln_ir::{AccessFlags, ClassKind, DexClass, Origin};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn lambda(factory: &ItemFactory, binary_name: &str) -> SyntheticDefinition {
    let ty = factory.type_for_binary_name(binary_name);
    let mut class = DexClass::new(ty, ClassKind::Program, Origin::unknown());
    class.access = AccessFlags::synthetic_class();
    SyntheticDefinition::class(
        SyntheticKind::Lambda,
        SynthesizingContext::from_type(ty),
        Arc::new(class),
    )
}

fn names(factory: &ItemFactory, group: &EquivalenceGroup) -> Vec<&'static str> {
    group
        .members()
        .iter()
        .map(|member| factory.binary_name(member.holder().ty))
        .collect()
}

#[test]
fn representative_is_the_smallest_reference() {
    let factory = ItemFactory::new();
    let members = vec![
        lambda(&factory, "c/C$$InternalSyntheticLambda$1$0"),
        lambda(&factory, "a/A$$InternalSyntheticLambda$1$0"),
        lambda(&factory, "b/B$$InternalSyntheticLambda$1$0"),
    ];
    let group = EquivalenceGroup::new(members, &factory);
    assert_eq!(group.len(), 3);
    assert!(!group.is_empty());
    assert_eq!(
        factory.binary_name(group.representative().holder().ty),
        "a/A$$InternalSyntheticLambda$1$0"
    );
}

#[test]
fn representative_does_not_depend_on_member_order() {
    let factory = ItemFactory::new();
    let build = |order: [&str; 3]| {
        let members = order.iter().map(|name| lambda(&factory, name)).collect();
        EquivalenceGroup::new(members, &factory)
    };
    let forward = build(["a/A$$X", "b/B$$X", "c/C$$X"]);
    let backward = build(["c/C$$X", "b/B$$X", "a/A$$X"]);
    assert_eq!(
        forward.representative().holder().ty,
        backward.representative().holder().ty
    );
    assert_eq!(names(&factory, &forward)[0], "a/A$$X");
    assert_eq!(names(&factory, &backward)[0], "a/A$$X");
}

#[test]
fn groups_order_by_their_context() {
    let factory = ItemFactory::new();
    let first = EquivalenceGroup::new(vec![lambda(&factory, "a/A$$X")], &factory);
    let second = EquivalenceGroup::new(vec![lambda(&factory, "b/B$$X")], &factory);
    let lens = RewriteLens::identity();
    assert_eq!(
        first.compare_including_context(&second, &lens, &factory),
        Ordering::Less
    );
    assert_eq!(
        second.compare_including_context(&first, &lens, &factory),
        Ordering::Greater
    );
}
