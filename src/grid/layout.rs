// grid/layout.rs
// Half-open cell boxes and the regular tiling of the domain into blocks.

use serde::{Deserialize, Serialize};

/// Axis-aligned box of lattice cells, half-open on both axes:
/// a cell (x, y) lies inside when x0 <= x < x1 and y0 <= y < y1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Box2 {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Box2 {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        debug_assert!(x0 <= x1 && y0 <= y1);
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn num_cells(&self) -> usize {
        (self.width() as usize) * (self.height() as usize)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// All cells of the box in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> {
        let (x0, x1) = (self.x0, self.x1);
        (self.y0..self.y1).flat_map(move |y| (x0..x1).map(move |x| (x, y)))
    }
}

/// Regular tiling of an nx-by-ny domain into blocks_x * blocks_y blocks.
/// Each block is one unit of parallel work and stands in for one partition
/// of a distributed run; remainder cells go to the low-index blocks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockLayout {
    nx: usize,
    ny: usize,
    blocks: Vec<Box2>,
}

impl BlockLayout {
    pub fn new(nx: usize, ny: usize, blocks_x: usize, blocks_y: usize) -> Self {
        assert!(nx > 0 && ny > 0, "domain must be non-empty");
        assert!(
            blocks_x >= 1 && blocks_y >= 1 && blocks_x <= nx && blocks_y <= ny,
            "block grid must be between 1x1 and one block per cell"
        );
        let cols = split_axis(nx, blocks_x);
        let rows = split_axis(ny, blocks_y);
        let mut blocks = Vec::with_capacity(blocks_x * blocks_y);
        for &(y0, y1) in &rows {
            for &(x0, x1) in &cols {
                blocks.push(Box2::new(x0, y0, x1, y1));
            }
        }
        Self { nx, ny, blocks }
    }

    /// Whole domain as one block.
    pub fn single(nx: usize, ny: usize) -> Self {
        Self::new(nx, ny, 1, 1)
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn domain(&self) -> Box2 {
        Box2::new(0, 0, self.nx as i32, self.ny as i32)
    }

    pub fn blocks(&self) -> &[Box2] {
        &self.blocks
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}

/// Split n cells into k contiguous half-open ranges of near-equal length.
fn split_axis(n: usize, k: usize) -> Vec<(i32, i32)> {
    let base = n / k;
    let rem = n % k;
    let mut ranges = Vec::with_capacity(k);
    let mut start = 0usize;
    for i in 0..k {
        let len = base + usize::from(i < rem);
        ranges.push((start as i32, (start + len) as i32));
        start += len;
    }
    ranges
}
