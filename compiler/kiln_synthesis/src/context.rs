//! Synthesizing contexts.
//!
//! A context records why a synthetic exists: the non-synthetic class it was
//! derived from, the input class that was being compiled, and the feature
//! split both live in. Contexts drive hygienic naming and break ties when
//! ordering equivalent items.

use crate::Rewritten;
use kiln_ir::{FeatureSplit, ItemFactory, MainDexInfo, Origin, RewriteLens, TypeId};
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SynthesizingContext {
    synthesizing_context_type: TypeId,
    input_context_type: TypeId,
    input_context_origin: Origin,
    feature_split: FeatureSplit,
}

impl SynthesizingContext {
    /// Context for a synthetic derived directly from an input class.
    pub fn from_non_synthetic_input_context(
        context_type: TypeId,
        origin: Origin,
        feature_split: FeatureSplit,
    ) -> Self {
        SynthesizingContext {
            synthesizing_context_type: context_type,
            input_context_type: context_type,
            input_context_origin: origin,
            feature_split,
        }
    }

    /// Context known only by type, in the base split.
    pub fn from_type(ty: TypeId) -> Self {
        Self::from_non_synthetic_input_context(ty, Origin::unknown(), FeatureSplit::Base)
    }

    /// Context of a synthetic read back from an intermediate artifact: the
    /// recorded synthesizing context, with the input class itself as input.
    pub fn from_synthetic_input_context(
        synthesizing_context_type: TypeId,
        input_type: TypeId,
        input_origin: Origin,
        feature_split: FeatureSplit,
    ) -> Self {
        SynthesizingContext {
            synthesizing_context_type,
            input_context_type: input_type,
            input_context_origin: input_origin,
            feature_split,
        }
    }

    pub fn synthesizing_context_type(&self) -> TypeId {
        self.synthesizing_context_type
    }

    pub fn input_context_type(&self) -> TypeId {
        self.input_context_type
    }

    pub fn input_context_origin(&self) -> &Origin {
        &self.input_context_origin
    }

    pub fn feature_split(&self) -> FeatureSplit {
        self.feature_split
    }

    /// Type whose name prefixes internal names.
    ///
    /// In intermediate mode every input is named after itself so that
    /// separately compiled inputs cannot collide.
    pub fn synthesizing_input_context(&self, intermediate: bool) -> TypeId {
        if intermediate {
            self.input_context_type
        } else {
            self.synthesizing_context_type
        }
    }

    pub fn compare(&self, other: &SynthesizingContext, factory: &ItemFactory) -> Ordering {
        factory
            .cmp_types(self.synthesizing_context_type, other.synthesizing_context_type)
            .then_with(|| factory.cmp_types(self.input_context_type, other.input_context_type))
    }

    /// Mark `ty` as main-dex when this context is.
    pub fn add_if_derived_from_main_dex(&self, ty: TypeId, main_dex: &mut MainDexInfo) {
        if main_dex.is_main_dex(self.input_context_type)
            || main_dex.is_main_dex(self.synthesizing_context_type)
        {
            main_dex.add(ty);
        }
    }

    /// Rewrite both context types. A context never stops being one.
    pub fn rewrite(&self, lens: &RewriteLens) -> Rewritten<SynthesizingContext> {
        let synthesizing_context_type = lens.lookup_type(self.synthesizing_context_type);
        let input_context_type = lens.lookup_type(self.input_context_type);
        if synthesizing_context_type == self.synthesizing_context_type
            && input_context_type == self.input_context_type
        {
            return Rewritten::Unchanged;
        }
        Rewritten::Changed(SynthesizingContext {
            synthesizing_context_type,
            input_context_type,
            input_context_origin: self.input_context_origin.clone(),
            feature_split: self.feature_split,
        })
    }
}
