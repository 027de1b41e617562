//! Scaffolds handed to producers of synthetic items.
//!
//! Producers only fill in members and bodies. Holder type, class kind and
//! the synthetic access flags are set by the registry.

use crate::naming::INTERNAL_SYNTHETIC_METHOD_NAME;
use kiln_ir::{
    AccessFlags, Annotation, ClassKind, Code, DexClass, FieldDef, ItemFactory, MethodDef,
    MethodRef, Origin, ProtoId, TypeId,
};

pub struct SyntheticClassBuilder<'f> {
    factory: &'f ItemFactory,
    class: DexClass,
}

impl<'f> SyntheticClassBuilder<'f> {
    pub(crate) fn new(factory: &'f ItemFactory, ty: TypeId, kind: ClassKind, origin: Origin) -> Self {
        let mut class = DexClass::new(ty, kind, origin);
        class.access = AccessFlags::synthetic_class();
        class.super_type = Some(factory.object_type());
        SyntheticClassBuilder { factory, class }
    }

    pub fn factory(&self) -> &'f ItemFactory {
        self.factory
    }

    pub fn ty(&self) -> TypeId {
        self.class.ty
    }

    pub fn set_access(&mut self, access: AccessFlags) -> &mut Self {
        self.class.access = access;
        self
    }

    pub fn set_super_type(&mut self, super_type: TypeId) -> &mut Self {
        self.class.super_type = Some(super_type);
        self
    }

    pub fn add_interface(&mut self, interface: TypeId) -> &mut Self {
        self.class.interfaces.push(interface);
        self
    }

    pub fn add_field(&mut self, name: &str, ty: TypeId, access: AccessFlags) -> &mut Self {
        let reference = self.factory.create_field(self.class.ty, name, ty);
        self.class.fields.push(FieldDef {
            reference,
            access,
            annotations: Vec::new(),
        });
        self
    }

    /// Add a method named `name`; the callback fills in the rest.
    pub fn add_method(
        &mut self,
        name: &str,
        build: impl FnOnce(&mut SyntheticMethodBuilder<'f>),
    ) -> &mut Self {
        let mut builder = SyntheticMethodBuilder::new(self.factory, self.class.ty, name);
        build(&mut builder);
        self.class.methods.push(builder.build());
        self
    }

    pub fn add_annotation(&mut self, annotation: Annotation) -> &mut Self {
        self.class.annotations.push(annotation);
        self
    }

    pub(crate) fn add_method_def(&mut self, method: MethodDef) -> &mut Self {
        self.class.methods.push(method);
        self
    }

    /// Members are sorted by signature so build order never shows.
    pub(crate) fn build(self) -> DexClass {
        let factory = self.factory;
        let mut class = self.class;
        class
            .methods
            .sort_by(|a, b| factory.cmp_methods(a.reference, b.reference));
        class
            .fields
            .sort_by(|a, b| factory.cmp_fields(a.reference, b.reference));
        class
    }
}

pub struct SyntheticMethodBuilder<'f> {
    factory: &'f ItemFactory,
    holder: TypeId,
    name: String,
    proto: ProtoId,
    access: AccessFlags,
    code: Option<Code>,
    annotations: Vec<Annotation>,
}

impl<'f> SyntheticMethodBuilder<'f> {
    pub(crate) fn new(factory: &'f ItemFactory, holder: TypeId, name: &str) -> Self {
        SyntheticMethodBuilder {
            factory,
            holder,
            name: name.to_owned(),
            proto: factory.intern_proto(factory.void_type(), &[]),
            access: AccessFlags::synthetic_method(),
            code: None,
            annotations: Vec::new(),
        }
    }

    /// Builder for the single method of a method synthetic.
    pub(crate) fn for_synthetic_method(factory: &'f ItemFactory, holder: TypeId) -> Self {
        Self::new(factory, holder, INTERNAL_SYNTHETIC_METHOD_NAME)
    }

    pub fn factory(&self) -> &'f ItemFactory {
        self.factory
    }

    pub fn holder(&self) -> TypeId {
        self.holder
    }

    /// Reference the method will have once built.
    pub fn reference(&self) -> MethodRef {
        self.factory.create_method(self.holder, &self.name, self.proto)
    }

    pub fn set_proto(&mut self, proto: ProtoId) -> &mut Self {
        self.proto = proto;
        self
    }

    pub fn set_access(&mut self, access: AccessFlags) -> &mut Self {
        self.access = access;
        self
    }

    pub fn set_code(&mut self, code: Code) -> &mut Self {
        self.code = Some(code);
        self
    }

    pub fn add_annotation(&mut self, annotation: Annotation) -> &mut Self {
        self.annotations.push(annotation);
        self
    }

    pub(crate) fn build(self) -> MethodDef {
        MethodDef {
            reference: self.reference(),
            access: self.access,
            code: self.code,
            annotations: self.annotations,
        }
    }
}
