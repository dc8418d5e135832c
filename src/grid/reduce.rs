// grid/reduce.rs
// Collective reductions over the block partition. Each block computes a
// local partial in parallel and the partials are merged pairwise; this is
// the single-process stand-in for a cross-partition all-reduce, so every
// block participates in every call.

use rayon::prelude::*;

use super::layout::{BlockLayout, Box2};

/// Run `local` once per block and merge the partials with `combine`.
/// `identity` must be a neutral element of `combine`.
pub fn all_reduce<R, L, C, I>(layout: &BlockLayout, identity: I, local: L, combine: C) -> R
where
    R: Send,
    L: Fn(usize, Box2) -> R + Sync,
    C: Fn(R, R) -> R + Sync + Send,
    I: Fn() -> R + Sync + Send,
{
    layout
        .blocks()
        .par_iter()
        .enumerate()
        .map(|(i, b)| local(i, *b))
        .reduce(identity, combine)
}

/// Element-wise minimum of two equally sized vectors, used to merge
/// per-block correspondence buffers.
pub fn min_merge(mut a: Vec<i32>, b: Vec<i32>) -> Vec<i32> {
    debug_assert_eq!(a.len(), b.len(), "reduction partials must agree in length");
    for (x, y) in a.iter_mut().zip(b) {
        *x = (*x).min(y);
    }
    a
}

/// Element-wise sum of two equally sized vectors.
pub fn sum_merge(mut a: Vec<f64>, b: Vec<f64>) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len(), "reduction partials must agree in length");
    for (x, y) in a.iter_mut().zip(b) {
        *x += y;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_reduce_visits_every_block_once() {
        let layout = BlockLayout::new(8, 8, 2, 2);
        let count = all_reduce(&layout, || 0usize, |_, b| b.num_cells(), |a, b| a + b);
        assert_eq!(count, 64, "partial cell counts sum to the domain size");
    }

    #[test]
    fn min_merge_is_element_wise() {
        let a = vec![5, -1, i32::MAX];
        let b = vec![3, 7, 2];
        assert_eq!(min_merge(a, b), vec![3, -1, 2]);
    }

    #[test]
    fn sum_merge_is_element_wise() {
        let a = vec![1.0, 2.0];
        let b = vec![0.5, -2.0];
        assert_eq!(sum_merge(a, b), vec![1.5, 0.0]);
    }
}
