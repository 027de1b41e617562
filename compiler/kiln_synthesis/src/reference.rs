//! Synthetic references: the persisted handle to a committed item.

use crate::{HasHolder, Rewritable, Rewritten, SyntheticDefinition, SyntheticItem, SynthesizingContext, SyntheticKind};
use kiln_ir::{ClassKind, DefinitionLookup, ItemFactory, MethodRef, RewriteLens, TypeId};
use std::cmp::Ordering;

/// Handle to a synthetic item, resolved against an application on demand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SyntheticReference {
    kind: SyntheticKind,
    context: SynthesizingContext,
    holder: TypeId,
    holder_kind: ClassKind,
    item: SyntheticItem,
}

impl SyntheticReference {
    pub fn method(kind: SyntheticKind, context: SynthesizingContext, method: MethodRef) -> Self {
        SyntheticReference {
            kind,
            context,
            holder: method.holder,
            holder_kind: ClassKind::Program,
            item: SyntheticItem::Method(method),
        }
    }

    pub fn class(kind: SyntheticKind, context: SynthesizingContext, ty: TypeId) -> Self {
        SyntheticReference {
            kind,
            context,
            holder: ty,
            holder_kind: ClassKind::Program,
            item: SyntheticItem::Class,
        }
    }

    pub fn classpath_class(kind: SyntheticKind, context: SynthesizingContext, ty: TypeId) -> Self {
        SyntheticReference {
            kind,
            context,
            holder: ty,
            holder_kind: ClassKind::Classpath,
            item: SyntheticItem::Class,
        }
    }

    pub fn kind(&self) -> SyntheticKind {
        self.kind
    }

    pub fn context(&self) -> &SynthesizingContext {
        &self.context
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

    /// Canonical order: holder descriptor, then member.
    pub fn compare(&self, other: &SyntheticReference, factory: &ItemFactory) -> Ordering {
        factory
            .cmp_types(self.holder, other.holder)
            .then_with(|| match (self.item, other.item) {
                (SyntheticItem::Method(a), SyntheticItem::Method(b)) => factory.cmp_methods(a, b),
                (SyntheticItem::Class, SyntheticItem::Class) => Ordering::Equal,
                (SyntheticItem::Method(_), SyntheticItem::Class) => Ordering::Less,
                (SyntheticItem::Class, SyntheticItem::Method(_)) => Ordering::Greater,
            })
    }

    /// Resolve to a definition; `None` once the holder or method is gone.
    pub fn lookup_definition(&self, lookup: &dyn DefinitionLookup) -> Option<SyntheticDefinition> {
        let holder = lookup.definition_for(self.holder)?;
        if holder.kind != self.holder_kind {
            return None;
        }
        match self.item {
            SyntheticItem::Method(method) => {
                holder.find_method(method)?;
                Some(SyntheticDefinition::method(
                    self.kind,
                    self.context.clone(),
                    holder,
                    method,
                ))
            }
            SyntheticItem::Class => Some(SyntheticDefinition::class(
                self.kind,
                self.context.clone(),
                holder,
            )),
        }
    }
}

impl HasHolder for SyntheticReference {
    fn holder_type(&self) -> TypeId {
        self.holder
    }

    fn holder_kind(&self) -> ClassKind {
        self.holder_kind
    }
}

impl Rewritable for SyntheticReference {
    /// A holder that moved without being a plain one-to-one renaming was
    /// claimed by another pass, so the item stops being synthetic.
    fn rewrite_with(&self, lens: &RewriteLens, factory: &ItemFactory) -> Rewritten<Self> {
        let context = self.context.rewrite(lens);
        let (holder, item) = match self.item {
            SyntheticItem::Method(method) => {
                let rewritten = lens.lookup_method(method, factory);
                (rewritten.holder, SyntheticItem::Method(rewritten))
            }
            SyntheticItem::Class => (lens.lookup_type(self.holder), SyntheticItem::Class),
        };
        if holder == self.holder && item == self.item && matches!(context, Rewritten::Unchanged) {
            return Rewritten::Unchanged;
        }
        if holder != self.holder && !lens.is_simple_renaming(self.holder, holder) {
            return Rewritten::NoLongerSynthetic;
        }
        let context = match context {
            Rewritten::Changed(context) => context,
            Rewritten::Unchanged | Rewritten::NoLongerSynthetic => self.context.clone(),
        };
        Rewritten::Changed(SyntheticReference {
            kind: self.kind,
            context,
            holder,
            holder_kind: self.holder_kind,
            item,
        })
    }
}
