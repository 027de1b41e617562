//! Program model: class definitions, members, code and annotations.
//!
//! Definitions are immutable once built and shared through `Arc`, so an
//! application snapshot can be handed to worker threads without copying.
//! Passes that change a class build a new definition and swap it in through
//! an [`ApplicationBuilder`](crate::ApplicationBuilder).

use crate::{AccessFlags, FieldRef, MethodRef, Name, TypeId};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Where a definition came from (input archive, file, or a synthesizer).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Origin(Option<Arc<str>>);

impl Origin {
    pub fn new(description: &str) -> Self {
        Origin(Some(Arc::from(description)))
    }

    pub const fn unknown() -> Self {
        Origin(None)
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_none()
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(description) => f.write_str(description),
            None => f.write_str("<unknown>"),
        }
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Origin({self})")
    }
}

/// Whether a class is compiled (program) or only referenced (classpath).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Program,
    Classpath,
}

/// Register index.
pub type Reg = u16;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Static,
    Virtual,
    Direct,
    Interface,
    Super,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

/// Register-based instruction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Instr {
    ConstInt { dest: Reg, value: i64 },
    ConstString { dest: Reg, value: Name },
    ConstClass { dest: Reg, ty: TypeId },
    Move { dest: Reg, src: Reg },
    Binop { op: BinOp, dest: Reg, left: Reg, right: Reg },
    Invoke { kind: InvokeKind, method: MethodRef, args: SmallVec<[Reg; 4]> },
    MoveResult { dest: Reg },
    StaticGet { dest: Reg, field: FieldRef },
    StaticPut { src: Reg, field: FieldRef },
    InstanceGet { dest: Reg, object: Reg, field: FieldRef },
    InstancePut { src: Reg, object: Reg, field: FieldRef },
    NewInstance { dest: Reg, ty: TypeId },
    CheckCast { reg: Reg, ty: TypeId },
    InstanceOf { dest: Reg, reg: Reg, ty: TypeId },
    Return { reg: Option<Reg> },
    Throw { reg: Reg },
}

/// Named local variable, kept for debugging only.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DebugLocal {
    pub register: Reg,
    pub name: Name,
    pub ty: TypeId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Code {
    pub registers: Reg,
    pub instructions: Vec<Instr>,
    pub debug_locals: Vec<DebugLocal>,
}

impl Code {
    pub fn new(registers: Reg, instructions: Vec<Instr>) -> Self {
        Code {
            registers,
            instructions,
            debug_locals: Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationVisibility {
    /// Only visible to the compiler; dropped from final output.
    Build,
    Runtime,
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationValue {
    Int(i64),
    String(Name),
    Type(TypeId),
    Field(FieldRef),
    Method(MethodRef),
    Array(Vec<AnnotationValue>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotationElement {
    pub name: Name,
    pub value: AnnotationValue,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub ty: TypeId,
    pub visibility: AnnotationVisibility,
    pub elements: Vec<AnnotationElement>,
}

impl Annotation {
    pub fn element(&self, name: Name) -> Option<&AnnotationValue> {
        self.elements
            .iter()
            .find(|element| element.name == name)
            .map(|element| &element.value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDef {
    pub reference: FieldRef,
    pub access: AccessFlags,
    pub annotations: Vec<Annotation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDef {
    pub reference: MethodRef,
    pub access: AccessFlags,
    pub code: Option<Code>,
    pub annotations: Vec<Annotation>,
}

/// Class definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DexClass {
    pub ty: TypeId,
    pub kind: ClassKind,
    pub origin: Origin,
    pub access: AccessFlags,
    pub super_type: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub annotations: Vec<Annotation>,
    /// Input classes this class was synthesized from.
    pub synthesized_from: Vec<TypeId>,
}

impl DexClass {
    /// Empty public class with no supertype.
    pub fn new(ty: TypeId, kind: ClassKind, origin: Origin) -> Self {
        DexClass {
            ty,
            kind,
            origin,
            access: AccessFlags::PUBLIC,
            super_type: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            synthesized_from: Vec::new(),
        }
    }

    pub fn is_program_class(&self) -> bool {
        self.kind == ClassKind::Program
    }

    pub fn is_classpath_class(&self) -> bool {
        self.kind == ClassKind::Classpath
    }

    pub fn find_method(&self, method: MethodRef) -> Option<&MethodDef> {
        self.methods.iter().find(|def| def.reference == method)
    }

    pub fn find_method_by_name(&self, name: Name) -> impl Iterator<Item = &MethodDef> {
        self.methods.iter().filter(move |def| def.reference.name == name)
    }

    pub fn find_field(&self, field: FieldRef) -> Option<&FieldDef> {
        self.fields.iter().find(|def| def.reference == field)
    }
}

/// A method together with its program holder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramMethod {
    pub holder: Arc<DexClass>,
    pub reference: MethodRef,
}

impl ProgramMethod {
    pub fn new(holder: Arc<DexClass>, reference: MethodRef) -> Self {
        debug_assert_eq!(holder.ty, reference.holder);
        ProgramMethod { holder, reference }
    }

    pub fn definition(&self) -> Option<&MethodDef> {
        self.holder.find_method(self.reference)
    }
}
