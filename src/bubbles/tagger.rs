// bubbles/tagger.rs
// Connected-component tagging of gas regions. Each block labels its cells
// independently; a union-find over the block seams then reconciles labels
// into one contiguous id space, and a sum reduction measures every bubble.

use std::collections::VecDeque;

use ultraviolet::DVec2;

use crate::free_surface::Flag;
use crate::grid::reduce::{all_reduce, sum_merge};
use crate::grid::{BlockLayout, Box2, ScalarField2};
use crate::profile_scope;

/// One iteration's tagged bubbles: a tag field holding contiguous ids from 0
/// (-1 outside any bubble) plus the measured volume and centroid per id.
pub struct BubbleMatch {
    pub tags: ScalarField2<i32>,
    pub volumes: Vec<f64>,
    pub centers: Vec<DVec2>,
}

impl BubbleMatch {
    pub fn num_bubbles(&self) -> usize {
        self.volumes.len()
    }

    /// Tag and measure all bubble regions of the current fields.
    ///
    /// With `match_empty` set, a bubble is a 4-connected region of gas cells
    /// plus the interface cells around it, and an interface cell contributes
    /// its gas fraction `1 - vf`. With it unset the roles of gas and fluid
    /// swap, which tags liquid droplets instead.
    pub fn execute(
        layout: &BlockLayout,
        flag: &ScalarField2<Flag>,
        volume_fraction: &ScalarField2<f64>,
        match_empty: bool,
    ) -> Self {
        profile_scope!("bubble_tagging");
        let (tags, num_bubbles) = tag_regions(layout, flag, match_empty);
        let (volumes, centers) =
            analyze_regions(layout, flag, volume_fraction, &tags, num_bubbles, match_empty);
        BubbleMatch { tags, volumes, centers }
    }
}

#[inline]
fn fillable(f: Flag, match_empty: bool) -> bool {
    match f {
        Flag::Interface => true,
        Flag::Empty => match_empty,
        Flag::Fluid => !match_empty,
        Flag::Wall => false,
    }
}

/// Label the fillable regions with contiguous ids starting at 0.
fn tag_regions(
    layout: &BlockLayout,
    flag: &ScalarField2<Flag>,
    match_empty: bool,
) -> (ScalarField2<i32>, usize) {
    // Local pass: every block labels its own cells by BFS, blind to the
    // rest of the domain.
    let block_tags = all_reduce(
        layout,
        Vec::new,
        |index, b| vec![(index, tag_block(b, flag, match_empty))],
        |mut a, mut b| {
            a.append(&mut b);
            a
        },
    );

    // Offset local labels into one provisional id space and write them into
    // the shared field.
    let mut tags = ScalarField2::new(layout.nx(), layout.ny(), -1i32);
    let mut offsets = vec![0usize; layout.num_blocks()];
    let mut total = 0usize;
    for (index, local) in &block_tags {
        offsets[*index] = total;
        total += local.count;
    }
    for (index, local) in &block_tags {
        let b = layout.blocks()[*index];
        let base = offsets[*index] as i32;
        let w = b.width();
        for (x, y) in b.cells() {
            let li = ((y - b.y0) * w + (x - b.x0)) as usize;
            if local.labels[li] >= 0 {
                tags.set(x, y, local.labels[li] + base);
            }
        }
    }

    // Seam pass: adjacent tagged cells in neighboring blocks belong to the
    // same bubble. Union them and pack the roots from 0.
    let mut uf = UnionFind::new(total);
    for b in layout.blocks() {
        let x_seam = b.x1;
        if x_seam < layout.nx() as i32 {
            for y in b.y0..b.y1 {
                let (a, c) = (tags.get(x_seam - 1, y), tags.get(x_seam, y));
                if a >= 0 && c >= 0 {
                    uf.union(a as usize, c as usize);
                }
            }
        }
        let y_seam = b.y1;
        if y_seam < layout.ny() as i32 {
            for x in b.x0..b.x1 {
                let (a, c) = (tags.get(x, y_seam - 1), tags.get(x, y_seam));
                if a >= 0 && c >= 0 {
                    uf.union(a as usize, c as usize);
                }
            }
        }
    }
    let (packed, num_bubbles) = uf.pack();
    for t in tags.data_mut() {
        if *t >= 0 {
            *t = packed[*t as usize];
        }
    }
    (tags, num_bubbles)
}

struct BlockTags {
    labels: Vec<i32>,
    count: usize,
}

/// 4-connected BFS labeling inside one block.
fn tag_block(b: Box2, flag: &ScalarField2<Flag>, match_empty: bool) -> BlockTags {
    let w = b.width();
    let mut labels = vec![-1i32; b.num_cells()];
    let mut count = 0usize;
    let mut queue = VecDeque::new();
    let local = |x: i32, y: i32| ((y - b.y0) * w + (x - b.x0)) as usize;
    for (x, y) in b.cells() {
        if labels[local(x, y)] >= 0 || !fillable(flag.get(x, y), match_empty) {
            continue;
        }
        let id = count as i32;
        count += 1;
        labels[local(x, y)] = id;
        queue.push_back((x, y));
        while let Some((cx, cy)) = queue.pop_front() {
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (ax, ay) = (cx + dx, cy + dy);
                if !b.contains(ax, ay) || labels[local(ax, ay)] >= 0 {
                    continue;
                }
                if fillable(flag.get(ax, ay), match_empty) {
                    labels[local(ax, ay)] = id;
                    queue.push_back((ax, ay));
                }
            }
        }
    }
    BlockTags { labels, count }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Link so the root is always the smallest member, which makes the
    /// packed ids independent of union order.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = (ra.min(rb), ra.max(rb));
            self.parent[hi] = lo;
        }
    }

    /// Map every provisional id to a dense id, numbered by first appearance.
    fn pack(&mut self) -> (Vec<i32>, usize) {
        let n = self.parent.len();
        let mut packed = vec![-1i32; n];
        let mut next = 0i32;
        for i in 0..n {
            let root = self.find(i);
            if packed[root] < 0 {
                packed[root] = next;
                next += 1;
            }
            packed[i] = packed[root];
        }
        (packed, next as usize)
    }
}

/// Sum volume and centroid contributions per bubble across all blocks.
///
/// A pure target cell (gas for `match_empty`) counts fully; an interface
/// cell counts its gas (or liquid) fraction. A tagged cell of any other
/// state means the tagger and the flag field disagree, which is fatal.
fn analyze_regions(
    layout: &BlockLayout,
    flag: &ScalarField2<Flag>,
    volume_fraction: &ScalarField2<f64>,
    tags: &ScalarField2<i32>,
    num_bubbles: usize,
    match_empty: bool,
) -> (Vec<f64>, Vec<DVec2>) {
    let (volumes, weighted) = all_reduce(
        layout,
        || (vec![0.0f64; num_bubbles], vec![DVec2::zero(); num_bubbles]),
        |_, b| {
            let mut vol = vec![0.0f64; num_bubbles];
            let mut ctr = vec![DVec2::zero(); num_bubbles];
            for (x, y) in b.cells() {
                let tag = tags.get(x, y);
                if tag < 0 {
                    continue;
                }
                let slot = tag as usize;
                let pos = DVec2::new(x as f64, y as f64);
                match flag.get(x, y) {
                    Flag::Interface => {
                        let vf = volume_fraction.get(x, y);
                        let fill = if match_empty { 1.0 - vf } else { vf };
                        vol[slot] += fill;
                        ctr[slot] += pos * fill;
                    }
                    f if fillable(f, match_empty) => {
                        vol[slot] += 1.0;
                        ctr[slot] += pos;
                    }
                    f => panic!("cell ({}, {}) tagged {} but flagged {:?}", x, y, tag, f),
                }
            }
            (vol, ctr)
        },
        |(va, mut ca), (vb, cb)| {
            for (x, y) in ca.iter_mut().zip(cb) {
                *x += y;
            }
            (sum_merge(va, vb), ca)
        },
    );
    let centers = weighted
        .iter()
        .zip(&volumes)
        .map(|(&c, &v)| if v > 0.0 { c / v } else { DVec2::zero() })
        .collect();
    (volumes, centers)
}
