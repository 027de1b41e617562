//! Tree fixer: rewrites every reference inside class definitions.
//!
//! The fixer is driven by a [`FixupMapping`], which decides where types,
//! fields and methods go and is told about every definition whose own
//! reference changed.

use crate::{
    Annotation, AnnotationElement, AnnotationValue, Application, Code, DebugLocal, DexClass,
    FieldDef, FieldRef, Instr, ItemFactory, MethodDef, MethodRef, ProtoId, RewriteLens, TypeId,
};
use std::sync::Arc;

pub trait FixupMapping {
    fn map_type(&self, ty: TypeId) -> TypeId;

    /// Explicit method mapping; `None` falls back to rewriting holder and proto.
    fn map_method(&self, method: MethodRef) -> Option<MethodRef> {
        let _ = method;
        None
    }

    /// Explicit field mapping; `None` falls back to rewriting holder and type.
    fn map_field(&self, field: FieldRef) -> Option<FieldRef> {
        let _ = field;
        None
    }

    fn record_class_change(&mut self, from: TypeId, to: TypeId) {
        let _ = (from, to);
    }

    fn record_field_change(&mut self, from: FieldRef, to: FieldRef) {
        let _ = (from, to);
    }

    fn record_method_change(&mut self, from: MethodRef, to: MethodRef) {
        let _ = (from, to);
    }
}

pub struct TreeFixer<'f, M> {
    factory: &'f ItemFactory,
    mapping: M,
}

impl<'f, M: FixupMapping> TreeFixer<'f, M> {
    pub fn new(factory: &'f ItemFactory, mapping: M) -> Self {
        TreeFixer { factory, mapping }
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    pub fn into_mapping(self) -> M {
        self.mapping
    }

    pub fn fixup_classes<'c>(
        &mut self,
        classes: impl IntoIterator<Item = &'c Arc<DexClass>>,
    ) -> Vec<Arc<DexClass>> {
        classes
            .into_iter()
            .map(|class| self.fixup_class(class))
            .collect()
    }

    /// Rewrite one class; unchanged classes are returned as-is.
    pub fn fixup_class(&mut self, class: &Arc<DexClass>) -> Arc<DexClass> {
        let ty = self.fixup_type(class.ty);
        let fields = class
            .fields
            .iter()
            .map(|field| self.fixup_field_def(field))
            .collect();
        let methods = class
            .methods
            .iter()
            .map(|method| self.fixup_method_def(method))
            .collect();
        let fixed = DexClass {
            ty,
            kind: class.kind,
            origin: class.origin.clone(),
            access: class.access,
            super_type: class.super_type.map(|ty| self.fixup_type(ty)),
            interfaces: class.interfaces.iter().map(|ty| self.fixup_type(*ty)).collect(),
            fields,
            methods,
            annotations: self.fixup_annotations(&class.annotations),
            synthesized_from: class.synthesized_from.clone(),
        };
        if ty != class.ty {
            self.mapping.record_class_change(class.ty, ty);
        }
        if fixed == **class {
            Arc::clone(class)
        } else {
            Arc::new(fixed)
        }
    }

    fn fixup_field_def(&mut self, field: &FieldDef) -> FieldDef {
        let reference = self.fixup_field_reference(field.reference);
        if reference != field.reference {
            self.mapping.record_field_change(field.reference, reference);
        }
        FieldDef {
            reference,
            access: field.access,
            annotations: self.fixup_annotations(&field.annotations),
        }
    }

    fn fixup_method_def(&mut self, method: &MethodDef) -> MethodDef {
        let reference = self.fixup_method_reference(method.reference);
        if reference != method.reference {
            self.mapping.record_method_change(method.reference, reference);
        }
        MethodDef {
            reference,
            access: method.access,
            code: method.code.as_ref().map(|code| self.fixup_code(code)),
            annotations: self.fixup_annotations(&method.annotations),
        }
    }

    /// Map a type, looking through array dimensions.
    pub fn fixup_type(&self, ty: TypeId) -> TypeId {
        let descriptor = self.factory.descriptor(ty);
        let depth = descriptor.bytes().take_while(|b| *b == b'[').count();
        if depth == 0 {
            return self.mapping.map_type(ty);
        }
        let element = self.factory.intern_type(&descriptor[depth..]);
        let mapped = self.mapping.map_type(element);
        if mapped == element {
            return ty;
        }
        let mut array = "[".repeat(depth);
        array.push_str(self.factory.descriptor(mapped));
        self.factory.intern_type(&array)
    }

    pub fn fixup_proto(&self, proto: ProtoId) -> ProtoId {
        self.factory.map_proto(proto, |ty| self.fixup_type(ty))
    }

    pub fn fixup_method_reference(&self, method: MethodRef) -> MethodRef {
        self.mapping.map_method(method).unwrap_or_else(|| MethodRef {
            holder: self.fixup_type(method.holder),
            name: method.name,
            proto: self.fixup_proto(method.proto),
        })
    }

    pub fn fixup_field_reference(&self, field: FieldRef) -> FieldRef {
        self.mapping.map_field(field).unwrap_or_else(|| FieldRef {
            holder: self.fixup_type(field.holder),
            name: field.name,
            ty: self.fixup_type(field.ty),
        })
    }

    fn fixup_code(&self, code: &Code) -> Code {
        Code {
            registers: code.registers,
            instructions: code
                .instructions
                .iter()
                .map(|instr| self.fixup_instr(instr))
                .collect(),
            debug_locals: code
                .debug_locals
                .iter()
                .map(|local| DebugLocal {
                    register: local.register,
                    name: local.name,
                    ty: self.fixup_type(local.ty),
                })
                .collect(),
        }
    }

    fn fixup_instr(&self, instr: &Instr) -> Instr {
        match instr {
            Instr::ConstClass { dest, ty } => Instr::ConstClass {
                dest: *dest,
                ty: self.fixup_type(*ty),
            },
            Instr::Invoke { kind, method, args } => Instr::Invoke {
                kind: *kind,
                method: self.fixup_method_reference(*method),
                args: args.clone(),
            },
            Instr::StaticGet { dest, field } => Instr::StaticGet {
                dest: *dest,
                field: self.fixup_field_reference(*field),
            },
            Instr::StaticPut { src, field } => Instr::StaticPut {
                src: *src,
                field: self.fixup_field_reference(*field),
            },
            Instr::InstanceGet { dest, object, field } => Instr::InstanceGet {
                dest: *dest,
                object: *object,
                field: self.fixup_field_reference(*field),
            },
            Instr::InstancePut { src, object, field } => Instr::InstancePut {
                src: *src,
                object: *object,
                field: self.fixup_field_reference(*field),
            },
            Instr::NewInstance { dest, ty } => Instr::NewInstance {
                dest: *dest,
                ty: self.fixup_type(*ty),
            },
            Instr::CheckCast { reg, ty } => Instr::CheckCast {
                reg: *reg,
                ty: self.fixup_type(*ty),
            },
            Instr::InstanceOf { dest, reg, ty } => Instr::InstanceOf {
                dest: *dest,
                reg: *reg,
                ty: self.fixup_type(*ty),
            },
            Instr::ConstInt { .. }
            | Instr::ConstString { .. }
            | Instr::Move { .. }
            | Instr::Binop { .. }
            | Instr::MoveResult { .. }
            | Instr::Return { .. }
            | Instr::Throw { .. } => instr.clone(),
        }
    }

    fn fixup_annotations(&self, annotations: &[Annotation]) -> Vec<Annotation> {
        annotations
            .iter()
            .map(|annotation| Annotation {
                ty: self.fixup_type(annotation.ty),
                visibility: annotation.visibility,
                elements: annotation
                    .elements
                    .iter()
                    .map(|element| AnnotationElement {
                        name: element.name,
                        value: self.fixup_annotation_value(&element.value),
                    })
                    .collect(),
            })
            .collect()
    }

    fn fixup_annotation_value(&self, value: &AnnotationValue) -> AnnotationValue {
        match value {
            AnnotationValue::Type(ty) => AnnotationValue::Type(self.fixup_type(*ty)),
            AnnotationValue::Field(field) => {
                AnnotationValue::Field(self.fixup_field_reference(*field))
            }
            AnnotationValue::Method(method) => {
                AnnotationValue::Method(self.fixup_method_reference(*method))
            }
            AnnotationValue::Array(values) => AnnotationValue::Array(
                values
                    .iter()
                    .map(|value| self.fixup_annotation_value(value))
                    .collect(),
            ),
            AnnotationValue::Int(_) | AnnotationValue::String(_) => value.clone(),
        }
    }
}

/// Mapping that follows a rewrite lens.
pub struct LensMapping<'a> {
    lens: &'a RewriteLens,
    factory: &'a ItemFactory,
}

impl<'a> LensMapping<'a> {
    pub fn new(lens: &'a RewriteLens, factory: &'a ItemFactory) -> Self {
        LensMapping { lens, factory }
    }
}

impl FixupMapping for LensMapping<'_> {
    fn map_type(&self, ty: TypeId) -> TypeId {
        self.lens.lookup_type(ty)
    }

    fn map_method(&self, method: MethodRef) -> Option<MethodRef> {
        let mapped = self.lens.lookup_method(method, self.factory);
        (mapped != method).then_some(mapped)
    }

    fn map_field(&self, field: FieldRef) -> Option<FieldRef> {
        let mapped = self.lens.lookup_field(field);
        (mapped != field).then_some(mapped)
    }
}

/// Apply `lens` to every program class of `app`.
pub fn rewrite_application(app: &Application, lens: &RewriteLens, factory: &ItemFactory) -> Application {
    if lens.is_identity() {
        return app.clone();
    }
    let mut fixer = TreeFixer::new(factory, LensMapping::new(lens, factory));
    let classes = fixer.fixup_classes(app.program_classes());
    app.builder().replace_program_classes(classes).build()
}
