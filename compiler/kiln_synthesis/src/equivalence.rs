//! Equivalence groups of interchangeable synthetics.

use crate::{invariant, SyntheticDefinition};
use kiln_ir::{ItemFactory, RewriteLens};
use std::cmp::Ordering;

/// Members that collapse to one item. The representative is `members[0]`.
#[derive(Clone, Debug)]
pub struct EquivalenceGroup {
    members: Vec<SyntheticDefinition>,
}

impl EquivalenceGroup {
    /// Group `members`, moving the smallest reference to the front.
    pub fn new(mut members: Vec<SyntheticDefinition>, factory: &ItemFactory) -> Self {
        invariant!(!members.is_empty(), "empty equivalence group");
        let representative = find_deterministic_representative(&members, factory);
        let representative = members.remove(representative);
        members.insert(0, representative);
        EquivalenceGroup { members }
    }

    pub fn representative(&self) -> &SyntheticDefinition {
        &self.members[0]
    }

    pub fn members(&self) -> &[SyntheticDefinition] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn compare_including_context(
        &self,
        other: &EquivalenceGroup,
        lens: &RewriteLens,
        factory: &ItemFactory,
    ) -> Ordering {
        self.representative()
            .compare_to(other.representative(), true, lens, factory)
    }
}

/// Index of the member with the smallest reference.
///
/// Independent of member order, so thread scheduling in earlier phases
/// cannot change which holder survives.
fn find_deterministic_representative(members: &[SyntheticDefinition], factory: &ItemFactory) -> usize {
    let mut smallest = 0;
    for (index, member) in members.iter().enumerate().skip(1) {
        let candidate = member.to_reference();
        if candidate.compare(&members[smallest].to_reference(), factory) == Ordering::Less {
            smallest = index;
        }
    }
    smallest
}

#[cfg(test)]
mod tests;
