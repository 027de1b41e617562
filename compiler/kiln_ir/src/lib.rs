//! Kiln IR - program model shared by the whole-program passes.
//!
//! This crate contains:
//! - Names and the sharded string interner
//! - The item factory: interned types, prototypes and member references
//! - Class definitions with their members, code and annotations
//! - Application snapshots, pruning results and main-dex bookkeeping
//! - Rewrite lenses and the tree fixer that applies them
//! - Structural hashing and comparison under a type representative map
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: descriptors and names become `Copy` handles
//! - **Immutable Snapshots**: definitions are shared behind `Arc` and
//!   replaced, never mutated in place
//! - **Text Ordering**: anything observable orders by descriptor text,
//!   never by handle value

mod access;
mod application;
mod factory;
mod feature;
mod fixup;
mod interner;
mod lens;
mod name;
mod program;
mod structural;

pub use access::AccessFlags;
pub use application::{
    Application, ApplicationBuilder, DefinitionLookup, MainDexInfo, PrunedItems,
    PrunedItemsBuilder,
};
pub use factory::{
    is_valid_type_descriptor, FieldRef, ItemFactory, MethodRef, Proto, ProtoId, SharedFactory,
    TypeId,
};
pub use feature::{ClassToFeatureSplitMap, FeatureSplit};
pub use fixup::{rewrite_application, FixupMapping, LensMapping, TreeFixer};
pub use interner::{InternError, StringInterner};
pub use lens::{LensDelta, LensDeltaBuilder, RewriteLens};
pub use name::Name;
pub use program::{
    Annotation, AnnotationElement, AnnotationValue, AnnotationVisibility, BinOp, ClassKind, Code,
    DebugLocal, DexClass, FieldDef, InvokeKind, Instr, MethodDef, Origin, ProgramMethod, Reg,
};
pub use structural::{RepresentativeMap, StructuralComparator, StructuralHasher};
