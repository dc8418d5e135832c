// bubbles/transitions.rs
// Groups correlated bubble ids into transitions: the connected components
// of the bipartite old/new overlap graph. Each transition is one event
// (creation, removal, rename, merge, split or a mix of the last two).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One group of old bubbles turning into a group of new bubbles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BubbleTransition {
    pub old_ids: BTreeSet<usize>,
    pub new_ids: BTreeSet<usize>,
}

impl BubbleTransition {
    pub fn is_empty(&self) -> bool {
        self.old_ids.is_empty() && self.new_ids.is_empty()
    }
}

impl fmt::Display for BubbleTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |ids: &BTreeSet<usize>| {
            ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
        };
        write!(f, "{{{}}} -> {{{}}}", join(&self.old_ids), join(&self.new_ids))
    }
}

/// Partition the overlap graph into transitions.
///
/// Starting from every untreated new id, a double-ended breadth-first
/// search alternates between the two sides of the graph until the component
/// is exhausted. Old bubbles overlapping no new bubble at all come last, as
/// one removal transition `{old} -> {}` each.
///
/// `old_to_all_new` must hold an entry for every live old bubble; an old id
/// delivered by the correlator but missing here is a corrupted tag field.
pub fn compute_bubble_transitions(
    new_to_all_old: &[SmallVec<[usize; 2]>],
    old_to_all_new: &BTreeMap<usize, Vec<usize>>,
) -> Vec<BubbleTransition> {
    let mut checked = vec![false; new_to_all_old.len()];
    let mut transitions = Vec::new();
    for start in 0..new_to_all_old.len() {
        if checked[start] {
            continue;
        }
        let mut transition = BubbleTransition::default();
        let mut new_candidates = BTreeSet::from([start]);
        let mut old_candidates: BTreeSet<usize> = BTreeSet::new();
        while !(new_candidates.is_empty() && old_candidates.is_empty()) {
            if let Some(new_id) = new_candidates.pop_first() {
                if !checked[new_id] {
                    checked[new_id] = true;
                    transition.new_ids.insert(new_id);
                    for &old_id in &new_to_all_old[new_id] {
                        if !transition.old_ids.contains(&old_id) {
                            old_candidates.insert(old_id);
                        }
                    }
                }
            } else if let Some(old_id) = old_candidates.pop_first() {
                if transition.old_ids.insert(old_id) {
                    let overlaps = old_to_all_new
                        .get(&old_id)
                        .unwrap_or_else(|| panic!("old bubble {} correlated but not live", old_id));
                    for &new_id in overlaps {
                        if !checked[new_id] {
                            new_candidates.insert(new_id);
                        }
                    }
                }
            }
        }
        if !transition.is_empty() {
            transitions.push(transition);
        }
    }
    for (&old_id, overlaps) in old_to_all_new {
        if overlaps.is_empty() {
            let mut transition = BubbleTransition::default();
            transition.old_ids.insert(old_id);
            transitions.push(transition);
        }
    }
    transitions
}
