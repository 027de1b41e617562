use super::*;
use crate::{ClassKind, InvokeKind, Origin};
use smallvec::smallvec;

fn helper(factory: &ItemFactory, holder: TypeId, callee: MethodRef, constant: i64) -> MethodDef {
    let int = factory.int_type();
    MethodDef {
        reference: factory.create_method(holder, "m", factory.intern_proto(int, &[int])),
        access: AccessFlags::synthetic_method(),
        code: Some(Code::new(
            2,
            vec![
                Instr::ConstInt {
                    dest: 1,
                    value: constant,
                },
                Instr::Invoke {
                    kind: InvokeKind::Static,
                    method: callee,
                    args: smallvec![0, 1],
                },
                Instr::MoveResult { dest: 0 },
                Instr::Return { reg: Some(0) },
            ],
        )),
        annotations: Vec::new(),
    }
}

struct Fixture {
    factory: ItemFactory,
    a: TypeId,
    b: TypeId,
    callee: MethodRef,
}

fn fixture() -> Fixture {
    let factory = ItemFactory::new();
    let a = factory.type_for_binary_name("p/A$$InternalSyntheticBackport$0");
    let b = factory.type_for_binary_name("p/B$$InternalSyntheticBackport$0");
    let target = factory.type_for_binary_name("java/lang/Math");
    let int = factory.int_type();
    let callee = factory.create_method(target, "abs", factory.intern_proto(int, &[int, int]));
    Fixture {
        factory,
        a,
        b,
        callee,
    }
}

fn hash_with(factory: &ItemFactory, map: RepresentativeMap<'_>, method: &MethodDef) -> u64 {
    let mut hasher = StructuralHasher::new(factory, map);
    hasher.hash_method_def(method);
    hasher.finish()
}

#[test]
fn same_body_same_hash_under_holder_map() {
    let f = fixture();
    let void = f.factory.void_type();
    let (a, b) = (f.a, f.b);
    let map = move |ty: TypeId| if ty == a || ty == b { void } else { ty };
    let m1 = helper(&f.factory, f.a, f.callee, 7);
    let m2 = helper(&f.factory, f.b, f.callee, 7);
    assert_eq!(hash_with(&f.factory, &map, &m1), hash_with(&f.factory, &map, &m2));
}

#[test]
fn different_holder_different_hash_without_map() {
    let f = fixture();
    let identity = |ty: TypeId| ty;
    let m1 = helper(&f.factory, f.a, f.callee, 7);
    let m2 = helper(&f.factory, f.b, f.callee, 7);
    assert_ne!(
        hash_with(&f.factory, &identity, &m1),
        hash_with(&f.factory, &identity, &m2)
    );
}

#[test]
fn different_value_different_hash() {
    let f = fixture();
    let identity = |ty: TypeId| ty;
    let m1 = helper(&f.factory, f.a, f.callee, 7);
    let m2 = helper(&f.factory, f.a, f.callee, 8);
    assert_ne!(
        hash_with(&f.factory, &identity, &m1),
        hash_with(&f.factory, &identity, &m2)
    );
}

#[test]
fn hash_is_independent_of_interning_order() {
    let first = ItemFactory::new();
    let second = ItemFactory::new();
    // Intern unrelated text first so handles differ between factories.
    second.intern_name("padding-0");
    second.intern_type("Lunrelated/Type;");

    let hash_in = |factory: &ItemFactory| {
        let holder = factory.type_for_binary_name("p/A");
        let target = factory.type_for_binary_name("java/lang/Math");
        let int = factory.int_type();
        let callee = factory.create_method(target, "abs", factory.intern_proto(int, &[int, int]));
        let identity = |ty: TypeId| ty;
        hash_with(factory, &identity, &helper(factory, holder, callee, 3))
    };
    assert_eq!(hash_in(&first), hash_in(&second));
}

#[test]
fn comparator_maps_other_holder_onto_this() {
    let f = fixture();
    let (a, b) = (f.a, f.b);
    let m1 = helper(&f.factory, f.a, f.callee, 7);
    let m2 = helper(&f.factory, f.b, f.callee, 7);

    let map = move |ty: TypeId| if ty == b { a } else { ty };
    let comparator = StructuralComparator::new(&f.factory, &map);
    assert_eq!(comparator.cmp_method_def(&m1, &m2), Ordering::Equal);

    let identity = |ty: TypeId| ty;
    let strict = StructuralComparator::new(&f.factory, &identity);
    assert_eq!(strict.cmp_method_def(&m1, &m2), Ordering::Less);
}

#[test]
fn comparator_orders_by_constant() {
    let f = fixture();
    let identity = |ty: TypeId| ty;
    let comparator = StructuralComparator::new(&f.factory, &identity);
    let low = helper(&f.factory, f.a, f.callee, 1);
    let high = helper(&f.factory, f.a, f.callee, 2);
    assert_eq!(comparator.cmp_method_def(&low, &high), Ordering::Less);
    assert_eq!(comparator.cmp_method_def(&high, &low), Ordering::Greater);
}

#[test]
fn class_hash_ignores_origin() {
    let f = fixture();
    let identity = |ty: TypeId| ty;
    let mut c1 = DexClass::new(f.a, ClassKind::Program, Origin::new("one.jar"));
    let mut c2 = DexClass::new(f.a, ClassKind::Program, Origin::new("two.jar"));
    c1.methods.push(helper(&f.factory, f.a, f.callee, 1));
    c2.methods.push(helper(&f.factory, f.a, f.callee, 1));

    let mut h1 = StructuralHasher::new(&f.factory, &identity);
    h1.hash_class(&c1);
    let mut h2 = StructuralHasher::new(&f.factory, &identity);
    h2.hash_class(&c2);
    assert_eq!(h1.finish(), h2.finish());
    assert_eq!(
        StructuralComparator::new(&f.factory, &identity).cmp_class(&c1, &c2),
        Ordering::Equal
    );
}
