//! Item factory: interned types, prototypes and member references.
//!
//! Every reference the compiler hands around is a small `Copy` handle into
//! the factory. Handles compare by identity; anything that must be stable
//! across runs orders by descriptor text through the `cmp_*` methods.

use crate::{Name, StringInterner};
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Interned type, identified by its descriptor (`Lcom/example/Foo;`, `I`, ...).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct TypeId(Name);

impl TypeId {
    #[inline]
    pub const fn name(self) -> Name {
        self.0
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0.raw()
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.raw())
    }
}

/// Interned method prototype.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct ProtoId(u32);

impl ProtoId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Return type and parameter types of a method.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Proto {
    pub ret: TypeId,
    pub params: SmallVec<[TypeId; 4]>,
}

/// Reference to a method: holder, name and prototype.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MethodRef {
    pub holder: TypeId,
    pub name: Name,
    pub proto: ProtoId,
}

impl MethodRef {
    #[must_use]
    pub fn with_holder(self, holder: TypeId) -> Self {
        MethodRef { holder, ..self }
    }

    #[must_use]
    pub fn with_name(self, name: Name) -> Self {
        MethodRef { name, ..self }
    }
}

/// Reference to a field: holder, name and field type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldRef {
    pub holder: TypeId,
    pub name: Name,
    pub ty: TypeId,
}

impl FieldRef {
    #[must_use]
    pub fn with_holder(self, holder: TypeId) -> Self {
        FieldRef { holder, ..self }
    }
}

/// Whether `descriptor` is a well-formed type descriptor.
pub fn is_valid_type_descriptor(descriptor: &str) -> bool {
    match descriptor.as_bytes() {
        [b'V' | b'Z' | b'B' | b'S' | b'C' | b'I' | b'J' | b'F' | b'D'] => true,
        [b'[', ..] => is_valid_type_descriptor(&descriptor[1..]),
        [b'L', inner @ .., b';'] => {
            !inner.is_empty() && !inner.contains(&b';') && !inner.contains(&b'.')
        }
        _ => false,
    }
}

/// Interns types, prototypes and names for one compilation.
pub struct ItemFactory {
    strings: StringInterner,
    protos: DashMap<Proto, ProtoId, FxBuildHasher>,
    proto_table: RwLock<Vec<Proto>>,
    void_type: TypeId,
    int_type: TypeId,
    object_type: TypeId,
    string_type: TypeId,
}

impl ItemFactory {
    pub fn new() -> Self {
        let strings = StringInterner::new();
        let void_type = TypeId(strings.intern("V"));
        let int_type = TypeId(strings.intern("I"));
        let object_type = TypeId(strings.intern("Ljava/lang/Object;"));
        let string_type = TypeId(strings.intern("Ljava/lang/String;"));
        ItemFactory {
            strings,
            protos: DashMap::with_hasher(FxBuildHasher),
            proto_table: RwLock::new(Vec::new()),
            void_type,
            int_type,
            object_type,
            string_type,
        }
    }

    pub fn void_type(&self) -> TypeId {
        self.void_type
    }

    pub fn int_type(&self) -> TypeId {
        self.int_type
    }

    pub fn object_type(&self) -> TypeId {
        self.object_type
    }

    pub fn string_type(&self) -> TypeId {
        self.string_type
    }

    // Names

    pub fn intern_name(&self, name: &str) -> Name {
        self.strings.intern(name)
    }

    pub fn name_str(&self, name: Name) -> &'static str {
        self.strings.lookup(name)
    }

    // Types

    /// Intern a type from its descriptor.
    pub fn intern_type(&self, descriptor: &str) -> TypeId {
        debug_assert!(
            is_valid_type_descriptor(descriptor),
            "malformed type descriptor `{descriptor}`"
        );
        TypeId(self.strings.intern(descriptor))
    }

    /// Intern a class type from its binary name (`com/example/Foo`).
    pub fn type_for_binary_name(&self, binary_name: &str) -> TypeId {
        self.intern_type(&format!("L{binary_name};"))
    }

    /// Look up a type without interning it.
    pub fn lookup_type(&self, descriptor: &str) -> Option<TypeId> {
        self.strings.get(descriptor).map(TypeId)
    }

    pub fn descriptor(&self, ty: TypeId) -> &'static str {
        self.strings.lookup(ty.0)
    }

    /// Binary name of a class type; other types yield their descriptor.
    pub fn binary_name(&self, ty: TypeId) -> &'static str {
        let descriptor = self.descriptor(ty);
        descriptor
            .strip_prefix('L')
            .and_then(|inner| inner.strip_suffix(';'))
            .unwrap_or(descriptor)
    }

    pub fn is_class_type(&self, ty: TypeId) -> bool {
        self.descriptor(ty).starts_with('L')
    }

    // Prototypes

    pub fn intern_proto(&self, ret: TypeId, params: &[TypeId]) -> ProtoId {
        let key = Proto {
            ret,
            params: SmallVec::from_slice(params),
        };
        let existing = self.protos.get(&key).map(|id| *id);
        if let Some(id) = existing {
            return id;
        }
        let stored = key.clone();
        *self.protos.entry(key).or_insert_with(|| {
            let mut table = self.proto_table.write();
            #[expect(
                clippy::cast_possible_truncation,
                reason = "prototype count stays far below u32::MAX"
            )]
            let id = ProtoId(table.len() as u32);
            table.push(stored);
            id
        })
    }

    pub fn proto(&self, id: ProtoId) -> Proto {
        self.proto_table.read()[id.0 as usize].clone()
    }

    /// Rewrite every type of a prototype, re-interning the result.
    pub fn map_proto(&self, id: ProtoId, mut map: impl FnMut(TypeId) -> TypeId) -> ProtoId {
        let proto = self.proto(id);
        let ret = map(proto.ret);
        let params: SmallVec<[TypeId; 4]> = proto.params.iter().map(|p| map(*p)).collect();
        if ret == proto.ret && params == proto.params {
            return id;
        }
        self.intern_proto(ret, &params)
    }

    pub fn proto_descriptor(&self, id: ProtoId) -> String {
        let proto = self.proto(id);
        let mut out = String::from("(");
        for param in &proto.params {
            out.push_str(self.descriptor(*param));
        }
        out.push(')');
        out.push_str(self.descriptor(proto.ret));
        out
    }

    // Members

    pub fn create_method(&self, holder: TypeId, name: &str, proto: ProtoId) -> MethodRef {
        MethodRef {
            holder,
            name: self.intern_name(name),
            proto,
        }
    }

    pub fn create_field(&self, holder: TypeId, name: &str, ty: TypeId) -> FieldRef {
        FieldRef {
            holder,
            name: self.intern_name(name),
            ty,
        }
    }

    pub fn method_to_string(&self, method: MethodRef) -> String {
        format!(
            "{}->{}{}",
            self.descriptor(method.holder),
            self.name_str(method.name),
            self.proto_descriptor(method.proto)
        )
    }

    pub fn field_to_string(&self, field: FieldRef) -> String {
        format!(
            "{}->{}:{}",
            self.descriptor(field.holder),
            self.name_str(field.name),
            self.descriptor(field.ty)
        )
    }

    // Deterministic ordering

    pub fn cmp_types(&self, a: TypeId, b: TypeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.descriptor(a).cmp(self.descriptor(b))
    }

    pub fn cmp_names(&self, a: Name, b: Name) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        self.name_str(a).cmp(self.name_str(b))
    }

    pub fn cmp_protos(&self, a: ProtoId, b: ProtoId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let (a, b) = (self.proto(a), self.proto(b));
        self.cmp_types(a.ret, b.ret)
            .then_with(|| self.cmp_type_lists(&a.params, &b.params))
    }

    pub fn cmp_type_lists(&self, a: &[TypeId], b: &[TypeId]) -> Ordering {
        for (x, y) in a.iter().zip(b) {
            let ord = self.cmp_types(*x, *y);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.len().cmp(&b.len())
    }

    pub fn cmp_methods(&self, a: MethodRef, b: MethodRef) -> Ordering {
        self.cmp_types(a.holder, b.holder)
            .then_with(|| self.cmp_names(a.name, b.name))
            .then_with(|| self.cmp_protos(a.proto, b.proto))
    }

    pub fn cmp_fields(&self, a: FieldRef, b: FieldRef) -> Ordering {
        self.cmp_types(a.holder, b.holder)
            .then_with(|| self.cmp_names(a.name, b.name))
            .then_with(|| self.cmp_types(a.ty, b.ty))
    }
}

impl Default for ItemFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe shared factory.
#[derive(Clone)]
pub struct SharedFactory(Arc<ItemFactory>);

impl SharedFactory {
    pub fn new() -> Self {
        SharedFactory(Arc::new(ItemFactory::new()))
    }
}

impl Default for SharedFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SharedFactory {
    type Target = ItemFactory;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
