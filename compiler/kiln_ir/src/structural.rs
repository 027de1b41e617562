//! Structural hashing and comparison of definitions.
//!
//! Both walks see types through a representative map, so that two
//! definitions which only differ in the names of interchangeable types hash
//! and compare equal. Types are hashed by descriptor text, never by handle,
//! which keeps hashes stable across runs.
//!
//! # Strategy
//!
//! For each node:
//! 1. Hash `discriminant(kind)`, identifying the variant
//! 2. Hash data fields (registers, constants, flags)
//! 3. Hash referenced types, names and members by their text

use crate::{
    AccessFlags, Annotation, AnnotationValue, Code, DexClass, FieldDef, FieldRef, Instr,
    ItemFactory, MethodDef, MethodRef, Name, ProtoId, TypeId,
};
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::mem;

/// Maps each type to the representative it is hashed and compared as.
pub type RepresentativeMap<'a> = &'a dyn Fn(TypeId) -> TypeId;

pub struct StructuralHasher<'a> {
    factory: &'a ItemFactory,
    map: RepresentativeMap<'a>,
    state: FxHasher,
}

impl<'a> StructuralHasher<'a> {
    pub fn new(factory: &'a ItemFactory, map: RepresentativeMap<'a>) -> Self {
        StructuralHasher {
            factory,
            map,
            state: FxHasher::default(),
        }
    }

    pub fn finish(&self) -> u64 {
        self.state.finish()
    }

    pub fn write_str(&mut self, s: &str) {
        s.hash(&mut self.state);
    }

    pub fn write_u32(&mut self, value: u32) {
        value.hash(&mut self.state);
    }

    pub fn hash_type(&mut self, ty: TypeId) {
        let mapped = (self.map)(ty);
        self.write_str(self.factory.descriptor(mapped));
    }

    pub fn hash_optional_type(&mut self, ty: Option<TypeId>) {
        match ty {
            Some(ty) => self.hash_type(ty),
            // Sentinel for "no type"
            None => u32::MAX.hash(&mut self.state),
        }
    }

    pub fn hash_name(&mut self, name: Name) {
        self.write_str(self.factory.name_str(name));
    }

    pub fn hash_proto(&mut self, proto: ProtoId) {
        let proto = self.factory.proto(proto);
        self.hash_type(proto.ret);
        proto.params.len().hash(&mut self.state);
        for param in &proto.params {
            self.hash_type(*param);
        }
    }

    pub fn hash_method_ref(&mut self, method: MethodRef) {
        self.hash_type(method.holder);
        self.hash_name(method.name);
        self.hash_proto(method.proto);
    }

    pub fn hash_field_ref(&mut self, field: FieldRef) {
        self.hash_type(field.holder);
        self.hash_name(field.name);
        self.hash_type(field.ty);
    }

    fn hash_access(&mut self, access: AccessFlags) {
        access.bits().hash(&mut self.state);
    }

    pub fn hash_code(&mut self, code: Option<&Code>) {
        let Some(code) = code else {
            u32::MAX.hash(&mut self.state);
            return;
        };
        code.registers.hash(&mut self.state);
        code.instructions.len().hash(&mut self.state);
        for instr in &code.instructions {
            self.hash_instr(instr);
        }
        // Debug locals do not affect behavior.
    }

    fn hash_instr(&mut self, instr: &Instr) {
        mem::discriminant(instr).hash(&mut self.state);
        match instr {
            Instr::ConstInt { dest, value } => {
                dest.hash(&mut self.state);
                value.hash(&mut self.state);
            }
            Instr::ConstString { dest, value } => {
                dest.hash(&mut self.state);
                self.hash_name(*value);
            }
            Instr::ConstClass { dest, ty }
            | Instr::NewInstance { dest, ty }
            | Instr::CheckCast { reg: dest, ty } => {
                dest.hash(&mut self.state);
                self.hash_type(*ty);
            }
            Instr::Move { dest, src } => {
                dest.hash(&mut self.state);
                src.hash(&mut self.state);
            }
            Instr::Binop {
                op,
                dest,
                left,
                right,
            } => {
                mem::discriminant(op).hash(&mut self.state);
                (dest, left, right).hash(&mut self.state);
            }
            Instr::Invoke { kind, method, args } => {
                mem::discriminant(kind).hash(&mut self.state);
                args.hash(&mut self.state);
                self.hash_method_ref(*method);
            }
            Instr::MoveResult { dest } | Instr::Throw { reg: dest } => {
                dest.hash(&mut self.state);
            }
            Instr::StaticGet { dest, field } | Instr::StaticPut { src: dest, field } => {
                dest.hash(&mut self.state);
                self.hash_field_ref(*field);
            }
            Instr::InstanceGet {
                dest,
                object,
                field,
            }
            | Instr::InstancePut {
                src: dest,
                object,
                field,
            } => {
                (dest, object).hash(&mut self.state);
                self.hash_field_ref(*field);
            }
            Instr::InstanceOf { dest, reg, ty } => {
                (dest, reg).hash(&mut self.state);
                self.hash_type(*ty);
            }
            Instr::Return { reg } => reg.hash(&mut self.state),
        }
    }

    pub fn hash_annotations(&mut self, annotations: &[Annotation]) {
        annotations.len().hash(&mut self.state);
        for annotation in annotations {
            self.hash_type(annotation.ty);
            mem::discriminant(&annotation.visibility).hash(&mut self.state);
            annotation.elements.len().hash(&mut self.state);
            for element in &annotation.elements {
                self.hash_name(element.name);
                self.hash_annotation_value(&element.value);
            }
        }
    }

    fn hash_annotation_value(&mut self, value: &AnnotationValue) {
        mem::discriminant(value).hash(&mut self.state);
        match value {
            AnnotationValue::Int(v) => v.hash(&mut self.state),
            AnnotationValue::String(name) => self.hash_name(*name),
            AnnotationValue::Type(ty) => self.hash_type(*ty),
            AnnotationValue::Field(field) => self.hash_field_ref(*field),
            AnnotationValue::Method(method) => self.hash_method_ref(*method),
            AnnotationValue::Array(values) => {
                values.len().hash(&mut self.state);
                for value in values {
                    self.hash_annotation_value(value);
                }
            }
        }
    }

    pub fn hash_field_def(&mut self, field: &FieldDef) {
        self.hash_field_ref(field.reference);
        self.hash_access(field.access);
        self.hash_annotations(&field.annotations);
    }

    pub fn hash_method_def(&mut self, method: &MethodDef) {
        self.hash_method_ref(method.reference);
        self.hash_access(method.access);
        self.hash_code(method.code.as_ref());
        self.hash_annotations(&method.annotations);
    }

    /// Hash a class body. Origin and provenance are not part of the structure.
    pub fn hash_class(&mut self, class: &DexClass) {
        self.hash_type(class.ty);
        self.hash_access(class.access);
        self.hash_optional_type(class.super_type);
        class.interfaces.len().hash(&mut self.state);
        for interface in &class.interfaces {
            self.hash_type(*interface);
        }
        class.fields.len().hash(&mut self.state);
        for field in &class.fields {
            self.hash_field_def(field);
        }
        class.methods.len().hash(&mut self.state);
        for method in &class.methods {
            self.hash_method_def(method);
        }
        self.hash_annotations(&class.annotations);
    }
}

pub struct StructuralComparator<'a> {
    factory: &'a ItemFactory,
    map: RepresentativeMap<'a>,
}

fn instr_tag(instr: &Instr) -> u8 {
    match instr {
        Instr::ConstInt { .. } => 0,
        Instr::ConstString { .. } => 1,
        Instr::ConstClass { .. } => 2,
        Instr::Move { .. } => 3,
        Instr::Binop { .. } => 4,
        Instr::Invoke { .. } => 5,
        Instr::MoveResult { .. } => 6,
        Instr::StaticGet { .. } => 7,
        Instr::StaticPut { .. } => 8,
        Instr::InstanceGet { .. } => 9,
        Instr::InstancePut { .. } => 10,
        Instr::NewInstance { .. } => 11,
        Instr::CheckCast { .. } => 12,
        Instr::InstanceOf { .. } => 13,
        Instr::Return { .. } => 14,
        Instr::Throw { .. } => 15,
    }
}

fn value_tag(value: &AnnotationValue) -> u8 {
    match value {
        AnnotationValue::Int(_) => 0,
        AnnotationValue::String(_) => 1,
        AnnotationValue::Type(_) => 2,
        AnnotationValue::Field(_) => 3,
        AnnotationValue::Method(_) => 4,
        AnnotationValue::Array(_) => 5,
    }
}

/// Compare two lists element-wise, then by length.
fn cmp_lists<T>(a: &[T], b: &[T], mut cmp: impl FnMut(&T, &T) -> Ordering) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = cmp(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

impl<'a> StructuralComparator<'a> {
    pub fn new(factory: &'a ItemFactory, map: RepresentativeMap<'a>) -> Self {
        StructuralComparator { factory, map }
    }

    pub fn cmp_type(&self, a: TypeId, b: TypeId) -> Ordering {
        self.factory.cmp_types((self.map)(a), (self.map)(b))
    }

    pub fn cmp_optional_type(&self, a: Option<TypeId>, b: Option<TypeId>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => self.cmp_type(a, b),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        }
    }

    pub fn cmp_proto(&self, a: ProtoId, b: ProtoId) -> Ordering {
        let (a, b) = (self.factory.proto(a), self.factory.proto(b));
        self.cmp_type(a.ret, b.ret)
            .then_with(|| cmp_lists(&a.params, &b.params, |x, y| self.cmp_type(*x, *y)))
    }

    pub fn cmp_method_ref(&self, a: MethodRef, b: MethodRef) -> Ordering {
        self.cmp_type(a.holder, b.holder)
            .then_with(|| self.factory.cmp_names(a.name, b.name))
            .then_with(|| self.cmp_proto(a.proto, b.proto))
    }

    pub fn cmp_field_ref(&self, a: FieldRef, b: FieldRef) -> Ordering {
        self.cmp_type(a.holder, b.holder)
            .then_with(|| self.factory.cmp_names(a.name, b.name))
            .then_with(|| self.cmp_type(a.ty, b.ty))
    }

    pub fn cmp_code(&self, a: Option<&Code>, b: Option<&Code>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.registers.cmp(&b.registers).then_with(|| {
                cmp_lists(&a.instructions, &b.instructions, |x, y| self.cmp_instr(x, y))
            }),
        }
    }

    fn cmp_instr(&self, a: &Instr, b: &Instr) -> Ordering {
        match (a, b) {
            (
                Instr::ConstInt { dest, value },
                Instr::ConstInt {
                    dest: dest2,
                    value: value2,
                },
            ) => dest.cmp(dest2).then(value.cmp(value2)),
            (
                Instr::ConstString { dest, value },
                Instr::ConstString {
                    dest: dest2,
                    value: value2,
                },
            ) => dest
                .cmp(dest2)
                .then_with(|| self.factory.cmp_names(*value, *value2)),
            (Instr::ConstClass { dest, ty }, Instr::ConstClass { dest: dest2, ty: ty2 })
            | (Instr::NewInstance { dest, ty }, Instr::NewInstance { dest: dest2, ty: ty2 })
            | (
                Instr::CheckCast { reg: dest, ty },
                Instr::CheckCast {
                    reg: dest2,
                    ty: ty2,
                },
            ) => dest.cmp(dest2).then_with(|| self.cmp_type(*ty, *ty2)),
            (Instr::Move { dest, src }, Instr::Move { dest: dest2, src: src2 }) => {
                (dest, src).cmp(&(dest2, src2))
            }
            (
                Instr::Binop {
                    op,
                    dest,
                    left,
                    right,
                },
                Instr::Binop {
                    op: op2,
                    dest: dest2,
                    left: left2,
                    right: right2,
                },
            ) => (*op as u8)
                .cmp(&(*op2 as u8))
                .then((dest, left, right).cmp(&(dest2, left2, right2))),
            (
                Instr::Invoke { kind, method, args },
                Instr::Invoke {
                    kind: kind2,
                    method: method2,
                    args: args2,
                },
            ) => (*kind as u8)
                .cmp(&(*kind2 as u8))
                .then_with(|| args.as_slice().cmp(args2.as_slice()))
                .then_with(|| self.cmp_method_ref(*method, *method2)),
            (Instr::MoveResult { dest }, Instr::MoveResult { dest: dest2 })
            | (Instr::Throw { reg: dest }, Instr::Throw { reg: dest2 }) => dest.cmp(dest2),
            (Instr::StaticGet { dest, field }, Instr::StaticGet { dest: dest2, field: field2 })
            | (
                Instr::StaticPut { src: dest, field },
                Instr::StaticPut {
                    src: dest2,
                    field: field2,
                },
            ) => dest
                .cmp(dest2)
                .then_with(|| self.cmp_field_ref(*field, *field2)),
            (
                Instr::InstanceGet {
                    dest,
                    object,
                    field,
                },
                Instr::InstanceGet {
                    dest: dest2,
                    object: object2,
                    field: field2,
                },
            )
            | (
                Instr::InstancePut {
                    src: dest,
                    object,
                    field,
                },
                Instr::InstancePut {
                    src: dest2,
                    object: object2,
                    field: field2,
                },
            ) => (dest, object)
                .cmp(&(dest2, object2))
                .then_with(|| self.cmp_field_ref(*field, *field2)),
            (
                Instr::InstanceOf { dest, reg, ty },
                Instr::InstanceOf {
                    dest: dest2,
                    reg: reg2,
                    ty: ty2,
                },
            ) => (dest, reg)
                .cmp(&(dest2, reg2))
                .then_with(|| self.cmp_type(*ty, *ty2)),
            (Instr::Return { reg }, Instr::Return { reg: reg2 }) => reg.cmp(reg2),
            _ => instr_tag(a).cmp(&instr_tag(b)),
        }
    }

    pub fn cmp_annotations(&self, a: &[Annotation], b: &[Annotation]) -> Ordering {
        cmp_lists(a, b, |x, y| {
            self.cmp_type(x.ty, y.ty)
                .then((x.visibility as u8).cmp(&(y.visibility as u8)))
                .then_with(|| {
                    cmp_lists(&x.elements, &y.elements, |e1, e2| {
                        self.factory
                            .cmp_names(e1.name, e2.name)
                            .then_with(|| self.cmp_annotation_value(&e1.value, &e2.value))
                    })
                })
        })
    }

    fn cmp_annotation_value(&self, a: &AnnotationValue, b: &AnnotationValue) -> Ordering {
        match (a, b) {
            (AnnotationValue::Int(x), AnnotationValue::Int(y)) => x.cmp(y),
            (AnnotationValue::String(x), AnnotationValue::String(y)) => {
                self.factory.cmp_names(*x, *y)
            }
            (AnnotationValue::Type(x), AnnotationValue::Type(y)) => self.cmp_type(*x, *y),
            (AnnotationValue::Field(x), AnnotationValue::Field(y)) => self.cmp_field_ref(*x, *y),
            (AnnotationValue::Method(x), AnnotationValue::Method(y)) => {
                self.cmp_method_ref(*x, *y)
            }
            (AnnotationValue::Array(x), AnnotationValue::Array(y)) => {
                cmp_lists(x, y, |v1, v2| self.cmp_annotation_value(v1, v2))
            }
            _ => value_tag(a).cmp(&value_tag(b)),
        }
    }

    pub fn cmp_field_def(&self, a: &FieldDef, b: &FieldDef) -> Ordering {
        self.cmp_field_ref(a.reference, b.reference)
            .then(a.access.bits().cmp(&b.access.bits()))
            .then_with(|| self.cmp_annotations(&a.annotations, &b.annotations))
    }

    pub fn cmp_method_def(&self, a: &MethodDef, b: &MethodDef) -> Ordering {
        self.cmp_method_ref(a.reference, b.reference)
            .then(a.access.bits().cmp(&b.access.bits()))
            .then_with(|| self.cmp_code(a.code.as_ref(), b.code.as_ref()))
            .then_with(|| self.cmp_annotations(&a.annotations, &b.annotations))
    }

    pub fn cmp_class(&self, a: &DexClass, b: &DexClass) -> Ordering {
        self.cmp_type(a.ty, b.ty)
            .then(a.access.bits().cmp(&b.access.bits()))
            .then_with(|| self.cmp_optional_type(a.super_type, b.super_type))
            .then_with(|| cmp_lists(&a.interfaces, &b.interfaces, |x, y| self.cmp_type(*x, *y)))
            .then_with(|| cmp_lists(&a.fields, &b.fields, |x, y| self.cmp_field_def(x, y)))
            .then_with(|| cmp_lists(&a.methods, &b.methods, |x, y| self.cmp_method_def(x, y)))
            .then_with(|| self.cmp_annotations(&a.annotations, &b.annotations))
    }
}

#[cfg(test)]
mod tests;
