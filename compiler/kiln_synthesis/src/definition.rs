//! Synthetic definitions: the generated classes themselves.
//!
//! A definition owns its holder class and knows how to hash and compare
//! itself structurally. References ([`SyntheticReference`]) are the
//! lightweight handles persisted between commits.

use crate::{invariant, naming, SynthesisError, SynthesizingContext, SyntheticKind, SyntheticReference};
use kiln_ir::{
    ClassKind, DexClass, ItemFactory, MethodDef, MethodRef, RepresentativeMap, RewriteLens,
    StructuralComparator, StructuralHasher, TypeId,
};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

/// Outcome of rewriting a value under a lens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rewritten<T> {
    /// Nothing the value refers to was renamed.
    Unchanged,
    Changed(T),
    /// The item was changed beyond a renaming and is now an ordinary item.
    NoLongerSynthetic,
}

impl<T: Clone> Rewritten<T> {
    /// The rewritten value, borrowing `original` when unchanged.
    pub fn resolve(self, original: &T) -> Option<Cow<'_, T>> {
        match self {
            Rewritten::Unchanged => Some(Cow::Borrowed(original)),
            Rewritten::Changed(value) => Some(Cow::Owned(value)),
            Rewritten::NoLongerSynthetic => None,
        }
    }
}

pub trait Rewritable: Sized {
    fn rewrite_with(&self, lens: &RewriteLens, factory: &ItemFactory) -> Rewritten<Self>;
}

impl Rewritable for SynthesizingContext {
    fn rewrite_with(&self, lens: &RewriteLens, _factory: &ItemFactory) -> Rewritten<Self> {
        self.rewrite(lens)
    }
}

pub trait HasHolder {
    fn holder_type(&self) -> TypeId;

    fn holder_kind(&self) -> ClassKind;

    fn is_program(&self) -> bool {
        self.holder_kind() == ClassKind::Program
    }

    fn is_classpath(&self) -> bool {
        self.holder_kind() == ClassKind::Classpath
    }
}

/// What a synthetic item is: one method of its holder, or the whole holder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SyntheticItem {
    Method(MethodRef),
    Class,
}

#[derive(Clone, Debug)]
pub struct SyntheticDefinition {
    kind: SyntheticKind,
    context: SynthesizingContext,
    holder: Arc<DexClass>,
    item: SyntheticItem,
}

impl SyntheticDefinition {
    pub fn method(
        kind: SyntheticKind,
        context: SynthesizingContext,
        holder: Arc<DexClass>,
        method: MethodRef,
    ) -> Self {
        invariant!(kind.is_single_method(), "{kind} is not a method kind");
        invariant!(
            holder.ty == method.holder,
            "method synthetic outside its holder"
        );
        SyntheticDefinition {
            kind,
            context,
            holder,
            item: SyntheticItem::Method(method),
        }
    }

    pub fn class(kind: SyntheticKind, context: SynthesizingContext, holder: Arc<DexClass>) -> Self {
        invariant!(!kind.is_single_method(), "{kind} is a method kind");
        SyntheticDefinition {
            kind,
            context,
            holder,
            item: SyntheticItem::Class,
        }
    }

    pub fn kind(&self) -> SyntheticKind {
        self.kind
    }

    pub fn context(&self) -> &SynthesizingContext {
        &self.context
    }

    pub fn holder(&self) -> &Arc<DexClass> {
        &self.holder
    }

    pub fn item(&self) -> SyntheticItem {
        self.item
    }

    pub fn method_ref(&self) -> Option<MethodRef> {
        match self.item {
            SyntheticItem::Method(method) => Some(method),
            SyntheticItem::Class => None,
        }
    }

    pub fn method_def(&self) -> Option<&MethodDef> {
        self.method_ref()
            .and_then(|method| self.holder.find_method(method))
    }

    /// Same item with an updated holder definition.
    #[must_use]
    pub fn with_holder(&self, holder: Arc<DexClass>) -> Self {
        invariant!(holder.ty == self.holder.ty, "holder type changed");
        SyntheticDefinition {
            kind: self.kind,
            context: self.context.clone(),
            holder,
            item: self.item,
        }
    }

    pub fn to_reference(&self) -> SyntheticReference {
        match (self.item, self.holder.kind) {
            (SyntheticItem::Method(method), _) => {
                SyntheticReference::method(self.kind, self.context.clone(), method)
            }
            (SyntheticItem::Class, ClassKind::Program) => {
                SyntheticReference::class(self.kind, self.context.clone(), self.holder.ty)
            }
            (SyntheticItem::Class, ClassKind::Classpath) => {
                SyntheticReference::classpath_class(self.kind, self.context.clone(), self.holder.ty)
            }
        }
    }

    /// Whether the holder still has the shape synthesized items are built with.
    pub fn is_valid(&self) -> bool {
        match self.item {
            SyntheticItem::Method(method) => {
                let access = self.holder.access;
                let holder_ok = access.is_public()
                    && access.is_final()
                    && access.is_synthetic()
                    && self.holder.methods.len() == 1;
                holder_ok
                    && self.holder.find_method(method).is_some_and(|def| {
                        def.access.is_public() && def.access.is_static() && def.access.is_synthetic()
                    })
            }
            SyntheticItem::Class => {
                self.holder.is_classpath_class()
                    || (self.holder.access.is_public() && self.holder.access.is_synthetic())
            }
        }
    }

    pub fn check_valid(&self, factory: &ItemFactory) -> Result<(), SynthesisError> {
        if self.is_valid() {
            return Ok(());
        }
        Err(SynthesisError::InvalidSynthetic {
            ty: factory.descriptor(self.holder.ty).to_owned(),
            kind: self.kind.to_string(),
        })
    }

    pub fn prefix_for_external_synthetic_type(
        &self,
        factory: &ItemFactory,
    ) -> Result<String, SynthesisError> {
        let binary_name = factory.binary_name(self.holder.ty);
        naming::prefix_for_external_synthetic_type(self.kind, binary_name)
            .map(str::to_owned)
            .ok_or_else(|| SynthesisError::MalformedSyntheticName {
                ty: factory.descriptor(self.holder.ty).to_owned(),
            })
    }

    /// Structural hash under `map`.
    pub fn compute_hash(
        &self,
        map: RepresentativeMap<'_>,
        intermediate: bool,
        factory: &ItemFactory,
    ) -> u64 {
        let mut hasher = StructuralHasher::new(factory, map);
        if intermediate {
            hasher.write_str(factory.descriptor(self.context.synthesizing_input_context(true)));
        }
        hasher.write_u32(self.kind.id());
        hasher.write_str(self.context.feature_split().as_str(factory));
        if self.kind.is_fixed_suffix() || !self.kind.is_shareable() {
            hasher.write_str(factory.descriptor(self.holder.ty));
        }
        match self.item {
            SyntheticItem::Method(_) => match self.method_def() {
                Some(def) => hasher.hash_method_def(def),
                None => hasher.write_u32(u32::MAX),
            },
            SyntheticItem::Class => hasher.hash_class(&self.holder),
        }
        hasher.finish()
    }

    /// Structural ordering with `other`'s holder seen as this holder.
    pub fn compare_to(
        &self,
        other: &SyntheticDefinition,
        include_context: bool,
        lens: &RewriteLens,
        factory: &ItemFactory,
    ) -> Ordering {
        let ord = self.kind.id().cmp(&other.kind.id());
        if ord != Ordering::Equal {
            return ord;
        }
        // Unshareable items are only ever equal to themselves.
        if self.kind.is_fixed_suffix() || !self.kind.is_shareable() {
            return factory.cmp_types(self.holder.ty, other.holder.ty);
        }
        if include_context {
            let ord = self.context.compare(&other.context, factory);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        let ord = self
            .context
            .feature_split()
            .compare(other.context.feature_split(), factory);
        if ord != Ordering::Equal {
            return ord;
        }

        let this_type = self.holder.ty;
        let other_type = other.holder.ty;
        let (this_original, other_original) = if lens.is_identity() {
            (this_type, other_type)
        } else {
            (lens.original_type(this_type), lens.original_type(other_type))
        };
        let map = move |ty: TypeId| {
            if ty == other_type || ty == this_original || ty == other_original {
                this_type
            } else {
                ty
            }
        };
        let comparator = StructuralComparator::new(factory, &map);
        match (self.item, other.item) {
            (SyntheticItem::Method(a), SyntheticItem::Method(b)) => {
                match (self.holder.find_method(a), other.holder.find_method(b)) {
                    (Some(x), Some(y)) => comparator.cmp_method_def(x, y),
                    _ => comparator.cmp_method_ref(a, b),
                }
            }
            (SyntheticItem::Class, SyntheticItem::Class) => {
                comparator.cmp_class(&self.holder, &other.holder)
            }
            (SyntheticItem::Method(_), SyntheticItem::Class) => Ordering::Less,
            (SyntheticItem::Class, SyntheticItem::Method(_)) => Ordering::Greater,
        }
    }

    pub fn is_equivalent_to(
        &self,
        other: &SyntheticDefinition,
        include_context: bool,
        lens: &RewriteLens,
        factory: &ItemFactory,
    ) -> bool {
        self.compare_to(other, include_context, lens, factory) == Ordering::Equal
    }
}

impl HasHolder for SyntheticDefinition {
    fn holder_type(&self) -> TypeId {
        self.holder.ty
    }

    fn holder_kind(&self) -> ClassKind {
        self.holder.kind
    }
}
