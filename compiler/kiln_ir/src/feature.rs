//! Feature splits: independently loadable partitions of the output.

use crate::{ItemFactory, Name, TypeId};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FeatureSplit {
    #[default]
    Base,
    Feature(Name),
}

impl FeatureSplit {
    pub fn is_base(self) -> bool {
        matches!(self, FeatureSplit::Base)
    }

    /// Base sorts first, features sort by name.
    pub fn compare(self, other: FeatureSplit, factory: &ItemFactory) -> Ordering {
        match (self, other) {
            (FeatureSplit::Base, FeatureSplit::Base) => Ordering::Equal,
            (FeatureSplit::Base, FeatureSplit::Feature(_)) => Ordering::Less,
            (FeatureSplit::Feature(_), FeatureSplit::Base) => Ordering::Greater,
            (FeatureSplit::Feature(a), FeatureSplit::Feature(b)) => factory.cmp_names(a, b),
        }
    }

    /// Stable text used for hashing; empty for the base split.
    pub fn as_str(self, factory: &ItemFactory) -> &'static str {
        match self {
            FeatureSplit::Base => "",
            FeatureSplit::Feature(name) => factory.name_str(name),
        }
    }
}

/// Maps program classes to the feature split they are placed in.
///
/// Classes without an entry belong to the base split.
#[derive(Clone, Debug, Default)]
pub struct ClassToFeatureSplitMap {
    map: FxHashMap<TypeId, FeatureSplit>,
}

impl ClassToFeatureSplitMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn insert(&mut self, ty: TypeId, feature: FeatureSplit) {
        if feature.is_base() {
            self.map.remove(&ty);
        } else {
            self.map.insert(ty, feature);
        }
    }

    pub fn feature_split_for(&self, ty: TypeId) -> FeatureSplit {
        self.map.get(&ty).copied().unwrap_or_default()
    }

    pub fn is_in_same_feature(&self, a: TypeId, b: TypeId) -> bool {
        self.feature_split_for(a) == self.feature_split_for(b)
    }
}
