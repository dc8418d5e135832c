// bubbles/correlate.rs
// Correlates the bubble tags of two successive iterations. One reduction
// round finds, for every new bubble, the smallest not-yet-reported old tag
// overlapping it; repeating until a round comes back empty enumerates all
// overlapping old bubbles in ascending order. The number of productive
// rounds equals the largest merge multiplicity of the iteration.

use smallvec::SmallVec;

use crate::grid::reduce::{all_reduce, min_merge};
use crate::grid::{BlockLayout, ScalarField2};
use crate::profile_scope;

/// Result of correlating old against new tags.
pub struct Correlation {
    /// For every new bubble id, the ascending list of old bubble ids whose
    /// area overlaps it. Empty for bubbles created from nothing.
    pub new_to_all_old: Vec<SmallVec<[usize; 2]>>,
    /// Productive reduction rounds until the fixed point.
    pub rounds: usize,
}

/// Every block scans its cells in every round; the per-block buffers are
/// merged with an element-wise MIN, and the merged vector is handed back to
/// all blocks as the next round's threshold. Slots already at the fixed
/// point ride along at `i32::MAX`, which no real tag exceeds.
pub fn correlate_tags(
    layout: &BlockLayout,
    old_tags: &ScalarField2<i32>,
    new_tags: &ScalarField2<i32>,
    num_new: usize,
) -> Correlation {
    profile_scope!("correlate");
    let mut new_to_all_old: Vec<SmallVec<[usize; 2]>> = vec![SmallVec::new(); num_new];
    // Below any real tag, so the first round reports the smallest overlap.
    let mut prev = vec![-1i32; num_new];
    let mut rounds = 0usize;
    loop {
        let reduced = all_reduce(
            layout,
            || vec![i32::MAX; num_new],
            |_, b| {
                let mut cur = vec![i32::MAX; num_new];
                for (x, y) in b.cells() {
                    let new = new_tags.get(x, y);
                    if new < 0 {
                        continue;
                    }
                    let slot = new as usize;
                    assert!(slot < num_new, "tag {} exceeds the bubble count {}", new, num_new);
                    let old = old_tags.get(x, y);
                    // Untagged old cells carry -1 and never pass this test.
                    if old > prev[slot] && old < cur[slot] {
                        cur[slot] = old;
                    }
                }
                cur
            },
            min_merge,
        );
        let mut discovered = false;
        for (slot, &tag) in reduced.iter().enumerate() {
            if tag != i32::MAX {
                new_to_all_old[slot].push(tag as usize);
                discovered = true;
            }
        }
        if !discovered {
            break;
        }
        rounds += 1;
        // The merged vector becomes the next threshold wholesale; finished
        // slots stay saturated and stop matching.
        prev = reduced;
    }
    Correlation { new_to_all_old, rounds }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags_from(layout: &BlockLayout, values: &[&[i32]]) -> ScalarField2<i32> {
        let mut f = ScalarField2::new(layout.nx(), layout.ny(), -1);
        for (row, line) in values.iter().rev().enumerate() {
            for (col, &v) in line.iter().enumerate() {
                f.set(col as i32, row as i32, v);
            }
        }
        f
    }

    #[test]
    fn one_to_one_overlap_takes_one_round() {
        let layout = BlockLayout::new(4, 2, 2, 1);
        let old = tags_from(&layout, &[&[-1, 7, 7, -1], &[-1, 7, -1, -1]]);
        let new = tags_from(&layout, &[&[-1, 0, 0, -1], &[-1, 0, 0, -1]]);
        let c = correlate_tags(&layout, &old, &new, 1);
        assert_eq!(c.rounds, 1, "a single overlap is found in one productive round");
        assert_eq!(c.new_to_all_old[0].as_slice(), &[7]);
    }

    #[test]
    fn three_way_merge_across_two_blocks_takes_three_rounds() {
        // Old bubbles 3, 5 and 9 all overlap the single new bubble 0, with
        // their cells spread over both blocks.
        let layout = BlockLayout::new(6, 2, 2, 1);
        let old = tags_from(&layout, &[&[3, 3, 5, 5, 9, 9], &[3, 9, 5, 3, 9, 5]]);
        let new = tags_from(&layout, &[&[0, 0, 0, 0, 0, 0], &[0, 0, 0, 0, 0, 0]]);
        let c = correlate_tags(&layout, &old, &new, 1);
        assert_eq!(c.rounds, 3, "one round per overlapping old bubble");
        assert_eq!(c.new_to_all_old[0].as_slice(), &[3, 5, 9], "olds reported in ascending order");
    }

    #[test]
    fn fresh_bubble_has_no_old_overlap() {
        let layout = BlockLayout::single(4, 2);
        let old = tags_from(&layout, &[&[-1, -1, -1, -1], &[-1, -1, -1, -1]]);
        let new = tags_from(&layout, &[&[-1, 0, -1, 1], &[-1, 0, -1, 1]]);
        let c = correlate_tags(&layout, &old, &new, 2);
        assert_eq!(c.rounds, 0, "no overlap means the first round already comes back empty");
        assert!(c.new_to_all_old[0].is_empty());
        assert!(c.new_to_all_old[1].is_empty());
    }

    #[test]
    fn split_maps_both_halves_to_the_same_old() {
        let layout = BlockLayout::new(6, 1, 3, 1);
        let old = tags_from(&layout, &[&[4, 4, 4, 4, 4, 4]]);
        let new = tags_from(&layout, &[&[0, 0, -1, -1, 1, 1]]);
        let c = correlate_tags(&layout, &old, &new, 2);
        assert_eq!(c.rounds, 1);
        assert_eq!(c.new_to_all_old[0].as_slice(), &[4]);
        assert_eq!(c.new_to_all_old[1].as_slice(), &[4]);
    }

    #[test]
    fn mixed_transition_keeps_slots_independent() {
        // New 0 overlaps olds {2, 6}; new 1 overlaps only {6}; new 2 is
        // fresh. Termination needs max-multiplicity + 1 = 3 scan rounds but
        // only 2 are productive.
        let layout = BlockLayout::new(8, 1, 2, 1);
        let old = tags_from(&layout, &[&[2, 2, 6, 6, 6, -1, -1, -1]]);
        let new = tags_from(&layout, &[&[0, 0, 0, 1, 1, 2, 2, -1]]);
        let c = correlate_tags(&layout, &old, &new, 3);
        assert_eq!(c.rounds, 2);
        assert_eq!(c.new_to_all_old[0].as_slice(), &[2, 6]);
        assert_eq!(c.new_to_all_old[1].as_slice(), &[6]);
        assert!(c.new_to_all_old[2].is_empty());
    }
}
